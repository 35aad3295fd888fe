//! Resumable progress: which identifiers each queue (worksheet) has finished
//!
//! A checkpoint is an append-only durable set keyed by queue name. Queues are
//! fully independent. Delivery is at-least-once: a crash between a finished
//! lookup and `mark_done` means that record is processed again next run.
//!
//! Two processes sharing one checkpoint file are not supported; appends from
//! both would interleave and neither would see the other's progress.

mod file;

pub use file::FileCheckpointStore;

use crate::errors::CheckpointError;
use std::collections::HashSet;

/// Implementations may block on disk I/O; async callers run `mark_done` on
/// the blocking pool.
pub trait CheckpointStore: Send + Sync {
    /// Every identifier recorded for `queue` so far
    fn load(&self, queue: &str) -> Result<HashSet<String>, CheckpointError>;

    /// Durably record `identifier` for `queue`
    ///
    /// Returns false when the identifier was already recorded (nothing is
    /// appended twice).
    fn mark_done(&self, queue: &str, identifier: &str) -> Result<bool, CheckpointError>;
}
