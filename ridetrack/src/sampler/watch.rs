//! Handle for a continuous position watch.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::SamplerError;
use crate::position::GeoFix;

/// Buffered updates between a sampler task and its consumer.
const WATCH_CAPACITY: usize = 32;

/// One update delivered by a watch.
pub type WatchUpdate = Result<GeoFix, SamplerError>;

/// Consumer side of a continuous watch.
///
/// Updates arrive in the order the source produced them. [`Watch::stop`]
/// takes effect immediately: the producing task observes the cancellation
/// and no further updates are delivered. Dropping the handle also stops it.
pub struct Watch {
    rx: mpsc::Receiver<WatchUpdate>,
    cancel: CancellationToken,
}

/// Producer side of a watch, held by the sampler task.
pub struct WatchFeed {
    tx: mpsc::Sender<WatchUpdate>,
    cancel: CancellationToken,
}

impl Watch {
    /// Create a connected watch/feed pair.
    pub fn channel() -> (WatchFeed, Watch) {
        let (tx, rx) = mpsc::channel(WATCH_CAPACITY);
        let cancel = CancellationToken::new();
        (
            WatchFeed {
                tx,
                cancel: cancel.clone(),
            },
            Watch { rx, cancel },
        )
    }

    /// Next update, or `None` once the watch is stopped or the source ended.
    pub async fn next(&mut self) -> Option<WatchUpdate> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            update = self.rx.recv() => update,
        }
    }

    /// Stop watching. Synchronous; safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token that stops this watch when cancelled.
    ///
    /// Lets an owner stop the watch while another task holds the handle.
    pub fn stopper(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl WatchFeed {
    /// Deliver an update. Returns false once the consumer is gone or stopped.
    pub async fn send(&self, update: WatchUpdate) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(update) => sent.is_ok(),
        }
    }

    /// Resolves when the consumer stops the watch.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_updates_arrive_in_order() {
        let (feed, mut watch) = Watch::channel();
        for i in 0..3 {
            assert!(feed.send(Ok(GeoFix::new(i as f64, 0.0, 5.0, Utc::now()))).await);
        }
        drop(feed);

        let mut lats = Vec::new();
        while let Some(update) = watch.next().await {
            lats.push(update.unwrap().lat);
        }
        assert_eq!(lats, vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_stop_ends_delivery() {
        let (feed, mut watch) = Watch::channel();
        assert!(feed.send(Ok(GeoFix::new(1.0, 1.0, 5.0, Utc::now()))).await);

        watch.stop();

        assert!(watch.next().await.is_none());
        assert!(!feed.send(Ok(GeoFix::new(2.0, 2.0, 5.0, Utc::now()))).await);
        assert!(feed.is_stopped());
    }

    #[tokio::test]
    async fn test_drop_stops_feed() {
        let (feed, watch) = Watch::channel();
        drop(watch);
        assert!(feed.is_stopped());
    }
}
