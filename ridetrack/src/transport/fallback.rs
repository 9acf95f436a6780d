//! Primary/secondary transport composition.

use tracing::debug;

use super::{Transport, TransportError};
use crate::position::{PositionSample, RideId};
use crate::store::QueueItem;

/// Uses `primary` when it is available and falls back to `secondary` when
/// it is not or when its call fails.
///
/// Delivery semantics are the same either way: the call succeeds only if
/// one of the two delivered the records.
pub struct FallbackTransport<P, F> {
    primary: P,
    secondary: F,
}

impl<P: Transport, F: Transport> FallbackTransport<P, F> {
    pub fn new(primary: P, secondary: F) -> Self {
        Self { primary, secondary }
    }
}

impl<P: Transport, F: Transport> Transport for FallbackTransport<P, F> {
    fn name(&self) -> &'static str {
        if self.primary.is_available() {
            self.primary.name()
        } else {
            self.secondary.name()
        }
    }

    fn is_available(&self) -> bool {
        self.primary.is_available() || self.secondary.is_available()
    }

    async fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> Result<(), TransportError> {
        if self.primary.is_available() {
            match self.primary.send_positions(ride_id, batch).await {
                Ok(()) => return Ok(()),
                Err(e) => debug!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %e,
                    "Primary transport failed, falling back"
                ),
            }
        }
        self.secondary.send_positions(ride_id, batch).await
    }

    async fn send_action(&self, item: &QueueItem) -> Result<(), TransportError> {
        if self.primary.is_available() {
            match self.primary.send_action(item).await {
                Ok(()) => return Ok(()),
                Err(e) => debug!(
                    primary = self.primary.name(),
                    error = %e,
                    "Primary transport could not deliver action, falling back"
                ),
            }
        }
        self.secondary.send_action(item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::GeoFix;
    use crate::transport::mock::MockTransport;
    use chrono::Utc;
    use std::sync::Arc;

    fn batch() -> Vec<PositionSample> {
        vec![GeoFix::new(1.0, 2.0, 5.0, Utc::now()).into_sample(RideId(1))]
    }

    fn pair() -> (Arc<MockTransport>, Arc<MockTransport>) {
        (
            Arc::new(MockTransport::new("primary")),
            Arc::new(MockTransport::new("secondary")),
        )
    }

    #[tokio::test]
    async fn test_prefers_available_primary() {
        let (primary, secondary) = pair();
        let transport = FallbackTransport::new(Arc::clone(&primary), Arc::clone(&secondary));

        transport.send_positions(RideId(1), &batch()).await.unwrap();

        assert_eq!(primary.batches().len(), 1);
        assert!(secondary.batches().is_empty());
        assert_eq!(transport.name(), "primary");
    }

    #[tokio::test]
    async fn test_skips_unavailable_primary() {
        let (primary, secondary) = pair();
        primary.set_available(false);
        let transport = FallbackTransport::new(Arc::clone(&primary), Arc::clone(&secondary));

        transport.send_positions(RideId(1), &batch()).await.unwrap();

        assert_eq!(primary.position_calls(), 0);
        assert_eq!(secondary.batches().len(), 1);
        assert_eq!(transport.name(), "secondary");
    }

    #[tokio::test]
    async fn test_falls_back_on_primary_error() {
        let (primary, secondary) = pair();
        primary.fail_positions(true);
        primary.fail_actions(true);
        let transport = FallbackTransport::new(Arc::clone(&primary), Arc::clone(&secondary));

        transport.send_positions(RideId(1), &batch()).await.unwrap();
        let item = crate::store::QueueItem {
            id: 9,
            kind: crate::store::ActionKind::StatusChange,
            payload: serde_json::json!({}),
            created_at: Utc::now(),
            attempts: 0,
        };
        transport.send_action(&item).await.unwrap();

        assert_eq!(secondary.batches().len(), 1);
        assert_eq!(secondary.actions(), vec![item]);
    }

    #[tokio::test]
    async fn test_both_failing_reports_secondary_error() {
        let (primary, secondary) = pair();
        primary.fail_positions(true);
        secondary.fail_positions(true);
        let transport = FallbackTransport::new(primary, secondary);

        assert!(transport.send_positions(RideId(1), &batch()).await.is_err());
    }
}
