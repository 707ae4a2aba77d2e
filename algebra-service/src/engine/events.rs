// Resolution Events
// Progress reporting and event types for expression resolution

use crate::engine::tree::Operator;

use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for resolution progress events
pub type ProgressSender = mpsc::UnboundedSender<ResolutionEvent>;

/// Receiver for resolution progress events
pub type ProgressReceiver = mpsc::UnboundedReceiver<ResolutionEvent>;

/// Create a new progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted while a tree is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionEvent {
    /// Resolution of a tree started
    ResolutionStarted { total_operations: usize },

    /// A binary step or unary operation started
    NodeStarted {
        operator: Operator,
        rows: usize,
        columns: usize,
    },

    /// A row batch was handed to the worker pool
    BatchSubmitted { operator: Operator, tasks: usize },

    /// A binary step or unary operation produced its matrix
    NodeCompleted {
        operator: Operator,
        rows: usize,
        columns: usize,
        duration: Duration,
    },

    /// Resolution finished
    ResolutionCompleted { success: bool, duration: Duration },

    /// Resolution failed
    Error { message: String },
}

impl ResolutionEvent {
    pub fn resolution_started(total_operations: usize) -> Self {
        Self::ResolutionStarted { total_operations }
    }

    pub fn node_started(operator: Operator, (rows, columns): (usize, usize)) -> Self {
        Self::NodeStarted {
            operator,
            rows,
            columns,
        }
    }

    pub fn batch_submitted(operator: Operator, tasks: usize) -> Self {
        Self::BatchSubmitted { operator, tasks }
    }

    pub fn node_completed(
        operator: Operator,
        (rows, columns): (usize, usize),
        duration: Duration,
    ) -> Self {
        Self::NodeCompleted {
            operator,
            rows,
            columns,
            duration,
        }
    }

    pub fn resolution_completed(success: bool, duration: Duration) -> Self {
        Self::ResolutionCompleted { success, duration }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Helper trait for sending events, ignoring errors (fire-and-forget)
pub trait EventSender {
    fn send_event(&self, event: ResolutionEvent);
}

impl EventSender for ProgressSender {
    fn send_event(&self, event: ResolutionEvent) {
        let _ = self.send(event);
    }
}

impl EventSender for Option<ProgressSender> {
    fn send_event(&self, event: ResolutionEvent) {
        if let Some(sender) = self {
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_channel() {
        let (tx, mut rx) = progress_channel();

        tx.send_event(ResolutionEvent::resolution_started(3));
        tx.send_event(ResolutionEvent::batch_submitted(Operator::Add, 2));

        let first = rx.recv().await.unwrap();
        assert_eq!(first, ResolutionEvent::ResolutionStarted { total_operations: 3 });

        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            ResolutionEvent::BatchSubmitted {
                operator: Operator::Add,
                tasks: 2
            }
        ));
    }

    #[test]
    fn test_event_construction() {
        let event =
            ResolutionEvent::node_completed(Operator::Multiply, (2, 3), Duration::from_millis(4));

        if let ResolutionEvent::NodeCompleted {
            operator,
            rows,
            columns,
            duration,
        } = event
        {
            assert_eq!(operator, Operator::Multiply);
            assert_eq!((rows, columns), (2, 3));
            assert_eq!(duration, Duration::from_millis(4));
        } else {
            panic!("wrong event type");
        }
    }

    #[test]
    fn test_optional_sender() {
        let sender: Option<ProgressSender> = None;
        // Should not panic
        sender.send_event(ResolutionEvent::error("test"));
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (tx, rx) = progress_channel();
        drop(rx);
        tx.send_event(ResolutionEvent::resolution_completed(true, Duration::ZERO));
    }
}
