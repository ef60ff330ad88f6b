//! Per-session ordered event transport
//!
//! One emitter/receiver pair per attached frontend. Events are delivered in
//! the order the session loop produces them; no reordering buffer exists.
//! Emitting after the receiver is gone is a silent drop, which is how
//! in-flight work finishing after session removal sheds its terminal event.

use crate::event::SseEvent;
use tokio::sync::mpsc;

/// Sending half attached to a session loop
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<SseEvent>,
}

/// Receiving half attached to a frontend transport
pub type EventReceiver = mpsc::UnboundedReceiver<SseEvent>;

impl EventEmitter {
    /// Create a connected emitter/receiver pair
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push one event to the attached transport.
    ///
    /// Returns false when the transport has gone away; the event is dropped.
    pub fn emit(&self, event: SseEvent) -> bool {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("Dropping event for detached transport: {}", e.0.event.as_str());
            return false;
        }
        true
    }

    /// Whether the receiving side is still attached
    pub fn is_attached(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{SseEventType, StepEventData, StepStatus};

    #[tokio::test]
    async fn test_events_preserve_emission_order() {
        let (emitter, mut rx) = EventEmitter::channel();

        emitter.emit(SseEvent::plan(&Default::default()));
        emitter.emit(SseEvent::step(
            &StepEventData::new("1", "a").with_status(StepStatus::Running),
        ));
        emitter.emit(SseEvent::step(
            &StepEventData::new("1", "a").with_status(StepStatus::Completed),
        ));
        emitter.emit(SseEvent::done());

        let observed: Vec<SseEventType> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|e| e.event)
        .collect();

        assert_eq!(
            observed,
            vec![
                SseEventType::Plan,
                SseEventType::Step,
                SseEventType::Step,
                SseEventType::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_silent() {
        let (emitter, rx) = EventEmitter::channel();
        drop(rx);
        assert!(!emitter.is_attached());
        assert!(!emitter.emit(SseEvent::done()));
    }
}
