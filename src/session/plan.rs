//! Plans and steps produced by the planner

use crate::event::{PlanEventData, StepEventData, StepStatus};
use serde::{Deserialize, Serialize};

/// One step of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: u32,
    pub description: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanStep {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: StepStatus::Pending,
            result: None,
            error: None,
        }
    }

    /// Render as a step-event payload
    pub fn to_event(&self) -> StepEventData {
        StepEventData {
            timestamp: chrono::Utc::now().timestamp_millis(),
            status: self.status,
            id: self.id.to_string(),
            description: self.description.clone(),
            result: self.result.clone(),
            tool_ids: Vec::new(),
        }
    }
}

/// A plan: a goal decomposed into ordered steps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Index of the first pending step, if any
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
    }

    /// Whether every step reached a terminal status
    pub fn is_finished(&self) -> bool {
        self.next_pending().is_none()
    }

    /// Render as a plan-event payload
    pub fn to_event(&self, status: &str) -> PlanEventData {
        PlanEventData {
            id: self.id.clone(),
            title: self.title.clone(),
            goal: self.goal.clone(),
            steps: self.steps.iter().map(PlanStep::to_event).collect(),
            message: self.message.clone(),
            status: status.to_string(),
            result: None,
            error: None,
        }
    }

    /// Step summaries with result detail stripped, for re-planning prompts
    pub fn outline(&self) -> Vec<PlanStep> {
        self.steps
            .iter()
            .map(|s| PlanStep {
                id: s.id,
                description: s.description.clone(),
                status: s.status,
                result: None,
                error: None,
            })
            .collect()
    }
}
