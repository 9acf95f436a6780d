//! Retry decisions for the outbound action queue.

use crate::store::QueueItem;
use crate::transport::TransportError;

/// Failed deliveries after which an action is dropped.
pub const MAX_ATTEMPTS: u32 = 3;

/// What to do with a queue item after one delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueDecision {
    /// Delivered; delete it.
    Remove,
    /// Failed; store this copy (attempts incremented) and retry next flush.
    Requeue(QueueItem),
    /// Failed for the last time; delete this copy without retrying.
    Drop(QueueItem),
}

/// Decide the fate of `item` given the outcome of sending it.
pub fn queue_decision(item: &QueueItem, outcome: &Result<(), TransportError>) -> QueueDecision {
    match outcome {
        Ok(()) => QueueDecision::Remove,
        Err(_) => {
            let next = item.with_failed_attempt();
            if next.attempts >= MAX_ATTEMPTS {
                QueueDecision::Drop(next)
            } else {
                QueueDecision::Requeue(next)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ActionKind;
    use chrono::Utc;

    fn item(attempts: u32) -> QueueItem {
        QueueItem {
            id: 1,
            kind: ActionKind::StatusChange,
            payload: serde_json::json!({"ride_id": 42, "status": "completed"}),
            created_at: Utc::now(),
            attempts,
        }
    }

    fn failure() -> Result<(), TransportError> {
        Err(TransportError::Http("offline".to_string()))
    }

    #[test]
    fn test_success_removes() {
        assert_eq!(queue_decision(&item(2), &Ok(())), QueueDecision::Remove);
    }

    #[test]
    fn test_dropped_after_exactly_three_failures() {
        let mut current = item(0);
        let mut decisions = Vec::new();
        for _ in 0..3 {
            let decision = queue_decision(&current, &failure());
            if let QueueDecision::Requeue(next) = &decision {
                current = next.clone();
            }
            decisions.push(decision);
        }

        assert!(matches!(&decisions[0], QueueDecision::Requeue(i) if i.attempts == 1));
        assert!(matches!(&decisions[1], QueueDecision::Requeue(i) if i.attempts == 2));
        assert!(matches!(&decisions[2], QueueDecision::Drop(i) if i.attempts == 3));
    }

    #[test]
    fn test_decision_does_not_mutate_input() {
        let original = item(1);
        let _ = queue_decision(&original, &failure());
        assert_eq!(original.attempts, 1);
    }
}
