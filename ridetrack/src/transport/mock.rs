//! Scriptable in-memory transport for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Transport, TransportError};
use crate::position::{PositionSample, RideId};
use crate::store::QueueItem;

pub(crate) struct MockTransport {
    name: &'static str,
    available: AtomicBool,
    fail_positions: AtomicBool,
    fail_actions: AtomicBool,
    /// Position calls that succeed before every later one fails.
    succeed_limit: Mutex<Option<usize>>,
    position_calls: AtomicUsize,
    batches: Mutex<Vec<(RideId, Vec<PositionSample>)>>,
    actions: Mutex<Vec<QueueItem>>,
}

impl MockTransport {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            available: AtomicBool::new(true),
            fail_positions: AtomicBool::new(false),
            fail_actions: AtomicBool::new(false),
            succeed_limit: Mutex::new(None),
            position_calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn fail_positions(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_actions(&self, fail: bool) {
        self.fail_actions.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_positions_after(&self, successes: usize) {
        *self.succeed_limit.lock() = Some(successes);
    }

    pub(crate) fn batches(&self) -> Vec<(RideId, Vec<PositionSample>)> {
        self.batches.lock().clone()
    }

    pub(crate) fn actions(&self) -> Vec<QueueItem> {
        self.actions.lock().clone()
    }

    pub(crate) fn position_calls(&self) -> usize {
        self.position_calls.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> Result<(), TransportError> {
        let call = self.position_calls.fetch_add(1, Ordering::SeqCst);
        let over_limit = self.succeed_limit.lock().is_some_and(|limit| call >= limit);
        if self.fail_positions.load(Ordering::SeqCst) || over_limit {
            return Err(TransportError::Http("mock failure".to_string()));
        }
        self.batches.lock().push((ride_id, batch.to_vec()));
        Ok(())
    }

    async fn send_action(&self, item: &QueueItem) -> Result<(), TransportError> {
        if self.fail_actions.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("mock rejection".to_string()));
        }
        self.actions.lock().push(item.clone());
        Ok(())
    }
}
