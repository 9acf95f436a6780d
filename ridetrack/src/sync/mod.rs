//! Batched delivery of stored records.
//!
//! The [`SyncEngine`] turns the local store into network calls:
//!
//! 1. Pending positions are grouped per ride and chunked ([`plan_batches`]).
//! 2. Each batch is one [`Transport`](crate::transport::Transport) call; only
//!    a successful call marks its records Synced.
//! 3. Queued actions are tried once per flush and retried or dropped by
//!    [`queue_decision`].

mod batch;
mod engine;
mod queue;

pub use batch::{plan_batches, Batch};
pub use engine::{FlushReport, SyncConfig, SyncEngine};
pub use queue::{queue_decision, QueueDecision, MAX_ATTEMPTS};
