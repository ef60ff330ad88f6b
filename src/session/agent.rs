//! Agent session: the plan-act loop
//!
//! A session owns one conversation, one event emitter, and one run of the
//! loop at a time: plan, execute the next pending step through tools,
//! re-plan from the observation, and conclude. Every externally visible
//! effect goes through the emitter so the attached transport sees a totally
//! ordered event stream ending in exactly one `DONE` or `error`.

use crate::event::{
    EventEmitter, MessageEventData, SseEvent, StepStatus, ToolEventData,
};
use crate::llm::{repair_arguments, ChatMemory, ChatMessage, LlmClient, Role};
use crate::modal::{ModalResolution, ModalState, ModalTracker, TabId};
use crate::session::parser::{
    parse_plan, parse_step_descriptions, parse_thinking, parse_tool_calls, ToolCall,
};
use crate::session::plan::Plan;
use crate::session::planner::{Executor, Planner};
use crate::tool::ToolRegistry;
use crate::worker::{ToolDescriptor, WorkerClient};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Lifecycle of a session's current task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

enum PlanOutcome {
    /// Structured plan parsed from the model's response
    Planned(Plan),
    /// The model answered in prose; no loop to run
    Direct,
    /// No usable response at all
    Fault,
}

/// One agent conversation bound to an event transport.
///
/// All mutability is interior so the registry can hand out `Arc<AgentSession>`
/// and run the loop on a spawned task while other endpoints inspect status
/// or report modal state.
pub struct AgentSession {
    id: String,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    worker: Option<Arc<dyn WorkerClient>>,
    emitter: EventEmitter,
    planner: Planner,
    executor: Executor,
    memory: Mutex<ChatMemory>,
    status: RwLock<TaskStatus>,
    modals: Mutex<ModalTracker>,
    cancelled: AtomicBool,
    max_loop: u32,
}

impl AgentSession {
    pub fn new(
        id: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        worker: Option<Arc<dyn WorkerClient>>,
        emitter: EventEmitter,
        max_loop: u32,
    ) -> Self {
        Self {
            id: id.into(),
            llm,
            tools,
            worker,
            emitter,
            planner: Planner::new(),
            executor: Executor::new(),
            memory: Mutex::new(ChatMemory::new()),
            status: RwLock::new(TaskStatus::Pending),
            modals: Mutex::new(ModalTracker::new()),
            cancelled: AtomicBool::new(false),
            max_loop,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: TaskStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Event emitter attached to this session's transport
    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    /// Request the loop to stop after the current step
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Record a modal reported by the sandbox; duplicates collapse
    pub fn report_modal(&self, state: ModalState) {
        self.modals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .report(state);
    }

    /// Apply a resolution to an outstanding modal; false when none matches
    pub fn resolve_modal(&self, state: &ModalState, resolution: &ModalResolution) -> bool {
        self.modals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .resolve(state, resolution)
    }

    /// Discard modals belonging to a closed tab
    pub fn modal_tab_closed(&self, tab: &TabId) {
        self.modals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tab_closed(tab);
    }

    pub fn outstanding_modals(&self) -> usize {
        self.modals.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn remember(&self, message: ChatMessage) {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .add(message);
    }

    fn history_snapshot(&self) -> Vec<ChatMessage> {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history()
            .to_vec()
    }

    /// Blank out stored tool outputs to keep the context window bounded
    pub fn compact_memory(&self) {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .compact();
    }

    /// Run the plan-act loop for one user request.
    ///
    /// Terminal: emits exactly one `DONE` (or one `error` followed by
    /// nothing) and leaves the status at `Completed` or `Failed`. Emission
    /// after the transport detaches is a silent drop.
    pub async fn run(&self, input: &str) {
        self.set_status(TaskStatus::Running);
        self.remember(ChatMessage::new(Role::User, input));

        let worker_tools = self.load_worker_tools().await;
        let tools_info = self.describe_tools(&worker_tools);

        let mut plan = match self.plan(input).await {
            PlanOutcome::Planned(plan) => plan,
            PlanOutcome::Direct => {
                // The model answered directly instead of planning; relay as-is.
                self.set_status(TaskStatus::Completed);
                self.emitter.emit(SseEvent::done());
                return;
            }
            PlanOutcome::Fault => {
                self.set_status(TaskStatus::Failed);
                self.emitter
                    .emit(SseEvent::error("No usable response from the model"));
                return;
            }
        };

        self.emitter.emit(SseEvent::title(&plan.title));
        self.emitter.emit(SseEvent::plan(&plan.to_event("created")));

        let mut iterations = 0u32;
        while let Some(index) = plan.next_pending() {
            if self.is_cancelled() {
                tracing::info!(session = %self.id, "Run cancelled");
                break;
            }
            if iterations >= self.max_loop {
                tracing::warn!(session = %self.id, max_loop = self.max_loop, "Loop bound reached");
                break;
            }
            iterations += 1;

            self.run_step(&mut plan, index, &tools_info, &worker_tools)
                .await;

            let latest = plan.steps[index]
                .result
                .clone()
                .or_else(|| plan.steps[index].error.clone())
                .unwrap_or_default();
            self.replan(&mut plan, &latest).await;
            self.emitter.emit(SseEvent::plan(&plan.to_event("updated")));
        }

        let conclusion = self.conclude().await;
        self.remember(ChatMessage::new(Role::Assistant, conclusion.clone()));
        self.emitter
            .emit(SseEvent::message(&MessageEventData::content(conclusion)));

        let failed = plan.steps.iter().any(|s| s.status == StepStatus::Failed);
        self.set_status(if failed {
            TaskStatus::Failed
        } else {
            TaskStatus::Completed
        });
        self.emitter.emit(SseEvent::done());
    }

    /// Produce the final summary, streaming deltas when the endpoint offers
    /// a stream and falling back to one blocking round-trip when it does not
    async fn conclude(&self) -> String {
        let messages = self.executor.conclusion_messages(&self.history_snapshot());

        if let Some(mut stream) = self.llm.stream_chat(&messages, &[]).await {
            let mut full = String::new();
            while let Some(deltas) = stream.next_deltas().await {
                for delta in deltas {
                    full.push_str(&delta);
                    self.emitter
                        .emit(SseEvent::message(&MessageEventData::delta(delta)));
                }
            }
            if !full.is_empty() {
                return full;
            }
        }

        self.executor
            .conclude(self.llm.as_ref(), &self.history_snapshot())
            .await
            .unwrap_or_else(|| "Task finished.".to_string())
    }

    async fn plan(&self, input: &str) -> PlanOutcome {
        let content = match self
            .planner
            .create_plan(self.llm.as_ref(), &self.history_snapshot(), input)
            .await
        {
            Some(content) => content,
            None => return PlanOutcome::Fault,
        };
        self.remember(ChatMessage::new(Role::Assistant, content.clone()));

        match parse_plan(&content) {
            Some(plan) => PlanOutcome::Planned(plan),
            None => {
                // No structured plan; surface whatever the model said.
                self.emitter
                    .emit(SseEvent::message(&MessageEventData::content(content)));
                PlanOutcome::Direct
            }
        }
    }

    async fn run_step(
        &self,
        plan: &mut Plan,
        index: usize,
        tools_info: &str,
        worker_tools: &HashMap<String, ToolDescriptor>,
    ) {
        plan.steps[index].status = StepStatus::Running;
        self.emitter
            .emit(SseEvent::step(&plan.steps[index].to_event()));

        let completed = plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .map(|s| format!("{}. {}", s.id, s.description))
            .collect::<Vec<_>>()
            .join("\n");

        let description = plan.steps[index].description.clone();
        let response = self
            .executor
            .execute_step(
                self.llm.as_ref(),
                &plan.goal,
                &description,
                &completed,
                tools_info,
            )
            .await;

        let Some(response) = response else {
            plan.steps[index].status = StepStatus::Failed;
            plan.steps[index].error = Some("No response from model".to_string());
            self.emitter
                .emit(SseEvent::step(&plan.steps[index].to_event()));
            return;
        };
        self.remember(ChatMessage::new(Role::Assistant, response.clone()));

        if let Some(thinking) = parse_thinking(&response) {
            self.emitter.emit(SseEvent::message(&MessageEventData {
                timestamp: chrono::Utc::now().timestamp_millis(),
                reasoning_content: Some(thinking),
                ..Default::default()
            }));
        }

        let calls = parse_tool_calls(&response);
        let mut observations = Vec::new();
        if calls.is_empty() {
            // The model answered the step in prose.
            observations.push(response);
        }
        for call in calls {
            let observation = self.dispatch_tool(&call, worker_tools).await;
            observations.push(observation);
        }

        plan.steps[index].status = StepStatus::Completed;
        plan.steps[index].result = Some(observations.join("\n"));
        self.emitter
            .emit(SseEvent::step(&plan.steps[index].to_event()));
    }

    /// Decode arguments and route the call to a local tool or the worker.
    ///
    /// Failures come back as observation text, never as loop errors; the
    /// model sees what went wrong and can retry differently.
    async fn dispatch_tool(
        &self,
        call: &ToolCall,
        worker_tools: &HashMap<String, ToolDescriptor>,
    ) -> String {
        let schema_fields: Vec<String> = worker_tools
            .get(&call.name)
            .map(|d| d.field_names())
            .unwrap_or_default();
        let field_refs: Vec<&str> = schema_fields.iter().map(String::as_str).collect();

        let args = match repair_arguments(&call.arguments, &field_refs) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(session = %self.id, tool = %call.name, error = %e, "Undecodable tool arguments");
                return format!("error: arguments for {} could not be decoded: {}", call.name, e);
            }
        };

        let provider = self
            .worker
            .as_ref()
            .filter(|_| worker_tools.contains_key(&call.name))
            .map(|w| w.name().to_string())
            .unwrap_or_else(|| "local".to_string());
        self.emitter.emit(SseEvent::tool(&ToolEventData::new(
            provider.clone(),
            call.name.clone(),
            args.clone().into_iter().collect(),
        )));

        let observation = self.invoke_tool(call, args.clone(), worker_tools).await;

        // Memory keeps the structured invocation record so compaction can
        // blank the payload later.
        let mut recorded_args: HashMap<String, serde_json::Value> = args.into_iter().collect();
        recorded_args.insert(
            "result".to_string(),
            serde_json::Value::String(observation.clone()),
        );
        let record = ToolEventData::new(provider, call.name.clone(), recorded_args);
        if let Ok(content) = serde_json::to_string(&record) {
            self.remember(ChatMessage::with_event_type(
                Role::User,
                crate::event::SseEventType::Tool,
                content,
            ));
        }

        observation
    }

    async fn invoke_tool(
        &self,
        call: &ToolCall,
        args: serde_json::Map<String, serde_json::Value>,
        worker_tools: &HashMap<String, ToolDescriptor>,
    ) -> String {
        if let Some(tool) = self.tools.get(&call.name) {
            // Local tools take free-form input; use the `input` field when
            // present, otherwise the whole argument object as JSON.
            let input = match args.get("input").and_then(|v| v.as_str()) {
                Some(text) => text.to_string(),
                None => serde_json::Value::Object(args).to_string(),
            };
            return match tool.run(&input, &HashMap::new()).await {
                Ok(result) => result,
                Err(e) => format!("error: {}", e),
            };
        }

        if let Some(worker) = &self.worker {
            if worker_tools.contains_key(&call.name) {
                return match worker
                    .call_tool(&call.name, serde_json::Value::Object(args))
                    .await
                {
                    Ok(result) => result,
                    Err(e) => format!("error: {}", e),
                };
            }
        }

        format!("error: unknown tool {}", call.name)
    }

    async fn replan(&self, plan: &mut Plan, latest_result: &str) {
        // The latest result rides in the prompt; stored tool payloads can go.
        self.compact_memory();
        let Some(content) = self
            .planner
            .update_plan(self.llm.as_ref(), &self.history_snapshot(), plan, latest_result)
            .await
        else {
            return;
        };
        self.remember(ChatMessage::new(Role::Assistant, content.clone()));

        let mut next_id = plan.steps.iter().map(|s| s.id).max().unwrap_or(0);
        for description in parse_step_descriptions(&content) {
            next_id += 1;
            plan.steps
                .push(crate::session::plan::PlanStep::new(next_id, description));
        }
    }

    async fn load_worker_tools(&self) -> HashMap<String, ToolDescriptor> {
        let Some(worker) = &self.worker else {
            return HashMap::new();
        };
        match worker.list_tools().await {
            Ok(descriptors) => descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Worker tool listing failed");
                HashMap::new()
            }
        }
    }

    fn describe_tools(&self, worker_tools: &HashMap<String, ToolDescriptor>) -> String {
        let mut lines: Vec<String> = self
            .tools
            .all()
            .iter()
            .map(|t| format!("- {}: {}", t.name(), t.description()))
            .collect();
        lines.extend(
            worker_tools
                .values()
                .map(|d| format!("- {}: {}", d.name, d.description)),
        );
        lines.sort();
        lines.join("\n")
    }
}
