//! Persisted progress of resumable operations
//!
//! At most one record exists per operation kind. Orchestrators save a record before their
//! first mutation and clear it once they complete or abort.

use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};

/// Storage backend for operation progress
pub trait ProgressStore {
    fn load(&self, kind: OperationKind) -> anyhow::Result<Option<OperationProgress>>;

    fn save(&self, progress: &OperationProgress) -> anyhow::Result<()>;

    fn clear(&self, kind: OperationKind) -> anyhow::Result<()>;

    /// The operation currently in progress, if any
    fn active(&self) -> anyhow::Result<Option<OperationKind>> {
        for kind in OperationKind::ALL {
            if self.load(kind)?.is_some() {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }
}
