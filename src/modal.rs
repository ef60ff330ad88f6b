//! Modal-state protocol for the browser-automation worker
//!
//! When the remote automation backend hits a blocking UI state — a native
//! dialog awaiting dismissal or a file chooser awaiting a path — it reports
//! it here as a [`ModalState`] bound to the originating tab. The
//! orchestrator treats states opaquely except for dispatching the matching
//! [`ModalResolution`] back through the same tab reference.
//!
//! Identity is structural on (kind, description, tab), so "is this
//! previously observed state still outstanding" needs no persistent handle.

use serde::{Deserialize, Serialize};

/// Logical browser tab identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub String);

impl TabId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant of a modal state, with the worker's wire values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalStateKind {
    #[serde(rename = "dialog")]
    Dialog,
    #[serde(rename = "fileChooser")]
    FileChooser,
}

/// A blocking browser state reported by the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModalState {
    /// An in-flight confirmation/alert awaiting resolution
    #[serde(rename = "dialog")]
    Dialog {
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tab: Option<TabId>,
    },
    /// A pending file-selection prompt
    #[serde(rename = "fileChooser")]
    FileChooser {
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tab: Option<TabId>,
    },
}

impl ModalState {
    pub fn dialog(description: impl Into<String>, tab: Option<TabId>) -> Self {
        ModalState::Dialog {
            description: description.into(),
            tab,
        }
    }

    pub fn file_chooser(description: impl Into<String>, tab: Option<TabId>) -> Self {
        ModalState::FileChooser {
            description: description.into(),
            tab,
        }
    }

    pub fn kind(&self) -> ModalStateKind {
        match self {
            ModalState::Dialog { .. } => ModalStateKind::Dialog,
            ModalState::FileChooser { .. } => ModalStateKind::FileChooser,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ModalState::Dialog { description, .. } => description,
            ModalState::FileChooser { description, .. } => description,
        }
    }

    pub fn tab(&self) -> Option<&TabId> {
        match self {
            ModalState::Dialog { tab, .. } => tab.as_ref(),
            ModalState::FileChooser { tab, .. } => tab.as_ref(),
        }
    }
}

/// Resolution operation dispatched back through the reporting tab
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ModalResolution {
    /// Dismiss or accept a dialog, optionally answering a prompt
    Dialog {
        accept: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_text: Option<String>,
    },
    /// Supply paths to a file chooser
    FileChooser { paths: Vec<String> },
}

impl ModalResolution {
    /// Whether this resolution can settle the given state
    pub fn resolves(&self, state: &ModalState) -> bool {
        matches!(
            (self, state.kind()),
            (ModalResolution::Dialog { .. }, ModalStateKind::Dialog)
                | (ModalResolution::FileChooser { .. }, ModalStateKind::FileChooser)
        )
    }
}

/// Outstanding modal states for one worker connection.
///
/// The worker reports states as they appear; the orchestrator records them,
/// clears one when its resolution is dispatched, and drops every state
/// bound to a tab when that tab closes.
#[derive(Debug, Default)]
pub struct ModalTracker {
    outstanding: Vec<ModalState>,
}

impl ModalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly reported state; duplicates collapse structurally
    pub fn report(&mut self, state: ModalState) {
        if !self.outstanding.contains(&state) {
            self.outstanding.push(state);
        }
    }

    /// Whether a previously observed state is still outstanding
    pub fn is_outstanding(&self, state: &ModalState) -> bool {
        self.outstanding.contains(state)
    }

    /// Settle one state, returning false when it was not outstanding or the
    /// resolution does not match its kind
    pub fn resolve(&mut self, state: &ModalState, resolution: &ModalResolution) -> bool {
        if !resolution.resolves(state) {
            return false;
        }
        let before = self.outstanding.len();
        self.outstanding.retain(|s| s != state);
        before != self.outstanding.len()
    }

    /// A closed tab invalidates every state bound to it
    pub fn tab_closed(&mut self, tab: &TabId) {
        self.outstanding.retain(|s| s.tab() != Some(tab));
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let tab = TabId::new("tab-1");
        let a = ModalState::dialog("Leave site?", Some(tab.clone()));
        let b = ModalState::dialog("Leave site?", Some(tab.clone()));
        let c = ModalState::dialog("Leave site?", Some(TabId::new("tab-2")));
        let d = ModalState::file_chooser("Leave site?", Some(tab));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_wire_tags() {
        let state = ModalState::file_chooser("pick a file", None);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"type\":\"fileChooser\""));

        let back: ModalState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ModalStateKind::FileChooser);
    }

    #[test]
    fn test_resolution_must_match_kind() {
        let dialog = ModalState::dialog("confirm", None);
        let accept = ModalResolution::Dialog {
            accept: true,
            prompt_text: None,
        };
        let upload = ModalResolution::FileChooser {
            paths: vec!["/tmp/a.png".to_string()],
        };

        assert!(accept.resolves(&dialog));
        assert!(!upload.resolves(&dialog));
    }

    #[test]
    fn test_tracker_resolve_by_structure() {
        let mut tracker = ModalTracker::new();
        let tab = TabId::new("tab-1");
        tracker.report(ModalState::dialog("confirm", Some(tab.clone())));
        // Duplicate report collapses
        tracker.report(ModalState::dialog("confirm", Some(tab.clone())));
        assert_eq!(tracker.len(), 1);

        // A structurally equal value stands in for the original
        let probe = ModalState::dialog("confirm", Some(tab));
        assert!(tracker.is_outstanding(&probe));
        assert!(tracker.resolve(
            &probe,
            &ModalResolution::Dialog {
                accept: false,
                prompt_text: None
            }
        ));
        assert!(tracker.is_empty());
        // Resolving again reports not-outstanding
        assert!(!tracker.resolve(
            &probe,
            &ModalResolution::Dialog {
                accept: false,
                prompt_text: None
            }
        ));
    }

    #[test]
    fn test_tab_close_invalidates_bound_states() {
        let mut tracker = ModalTracker::new();
        let tab = TabId::new("tab-1");
        tracker.report(ModalState::dialog("confirm", Some(tab.clone())));
        tracker.report(ModalState::file_chooser("pick", Some(tab.clone())));
        tracker.report(ModalState::dialog("global", None));

        tracker.tab_closed(&tab);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_outstanding(&ModalState::dialog("global", None)));
    }
}
