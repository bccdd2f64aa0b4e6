//! Resumable operation state
//!
//! - `operation_progress`: the persisted queue of a multi-step operation
//! - `listener`: cooperative progress reporting and cancellation

pub mod listener;
pub mod operation_progress;
