//! User-facing operations
//!
//! Each operation is a struct configured builder-style and executed through
//! [`Operation::run`](crate::commands::Operation::run).
//!
//! ## Operations
//!
//! - `commit`: record the staged tree on the current branch
//! - `add`: stage working tree changes
//! - `branch`: create, delete or list branches
//! - `merge`: three-way merge of one or more commits into HEAD
//! - `rebase`: replay the current branch onto another base
//! - `cherry_pick`: replay individual commits onto HEAD
//! - `revert`: apply the inverse of commits onto HEAD
//! - `reset`: move HEAD and reset the index and working tree
//! - `checkout`: switch branches or restore paths
//!
//! Merge, rebase, cherry-pick and revert may stop on conflicts. Their `Resume*` counterparts
//! continue, skip or abort the stopped operation.

pub mod add;
pub mod branch;
pub mod checkout;
pub mod cherry_pick;
pub mod commit;
pub mod merge;
pub mod rebase;
pub mod reset;
pub mod revert;

use crate::artifacts::progress::listener::{ProgressListener, SilentListener};

/// What to do with an operation stopped on conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Commit the resolved step and go on
    Continue,
    /// Drop the conflicting step and go on
    Skip,
    /// Return to the state before the operation started
    Abort,
}

pub(crate) fn silent() -> Box<dyn ProgressListener> {
    Box::new(SilentListener)
}
