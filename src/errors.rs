//! Error taxonomy of the orchestrators
//!
//! Collaborator failures stay `anyhow::Error` and travel unchanged inside
//! [`OperationError::Storage`]. Everything else is an expected outcome callers branch on:
//! violated preconditions (nothing was mutated), conflicts (progress was persisted and the
//! operation can be continued, skipped or aborted) and no-ops.

use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::operation_progress::OperationKind;
use thiserror::Error;

/// Conflict reports list at most this many paths
pub const MAX_REPORTED_PATHS: usize = 25;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Resulting tree equals its parent's, or the branch is already merged
    #[error("{0}")]
    NothingToCommit(String),

    #[error("operation cancelled")]
    Cancelled,

    /// A ref changed between the operation's snapshot and its update
    #[error("ref {name} was updated concurrently")]
    RefUpdateRejected { name: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl OperationError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, OperationError::Conflict(_))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, OperationError::Precondition(_))
    }

    /// Conflicts carried by a conflict error; empty for every other kind
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            OperationError::Conflict(conflict) => conflict.conflicts(),
            _ => &[],
        }
    }
}

/// Why an operation refused to start
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("HEAD does not point to a commit")]
    NoHead,

    #[error("HEAD is detached; a branch is required")]
    DetachedHead,

    #[error("branch {0} has no commits yet")]
    UnbornBranch(String),

    #[error("working tree has {0} unstaged change(s)")]
    DirtyWorkingTree(usize),

    #[error("index has {0} staged change(s)")]
    DirtyIndex(usize),

    #[error("cannot proceed with {0} unresolved conflict(s)")]
    UnresolvedConflicts(usize),

    #[error("a {0} is already in progress")]
    AlreadyInProgress(OperationKind),

    #[error("no {0} in progress")]
    NotInProgress(OperationKind),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("unknown revision: {0}")]
    UnresolvedReference(String),

    #[error("no common ancestor between {0} and {1}")]
    NoCommonAncestor(String, String),

    #[error("Cannot fast-forward {0}")]
    CannotFastForward(String),

    /// Checkout over unresolved paths; carries the full report
    #[error("{0}")]
    UnmergedPaths(String),

    #[error("octopus merge cannot be executed because conflicts were found in {0}")]
    OctopusConflicts(String),

    #[error("no identity configured: set user.name and user.email")]
    MissingIdentity,
}

/// Conflicts left behind by a merge, rebase, cherry-pick or revert
#[derive(Debug, Error)]
#[error("{report}")]
pub struct ConflictError {
    kind: OperationKind,
    commit: Option<ObjectId>,
    conflicts: Vec<Conflict>,
    report: String,
}

impl ConflictError {
    /// Build the error and its report: `header`, then one line per conflicting path
    pub fn new(
        kind: OperationKind,
        commit: Option<ObjectId>,
        header: &str,
        conflicts: Vec<Conflict>,
    ) -> Self {
        let mut lines = vec![header.to_string()];
        lines.extend(
            conflicts
                .iter()
                .take(MAX_REPORTED_PATHS)
                .map(|conflict| format!("CONFLICT: conflict in {}", conflict.path())),
        );
        if conflicts.len() > MAX_REPORTED_PATHS {
            lines.push(format!("and {} more.", conflicts.len() - MAX_REPORTED_PATHS));
        }

        ConflictError {
            kind,
            commit,
            conflicts,
            report: lines.join("\n"),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The commit whose application conflicted
    pub fn commit(&self) -> Option<&ObjectId> {
        self.commit.as_ref()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn report(&self) -> &str {
        &self.report
    }
}
