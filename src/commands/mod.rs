//! Repository operations
//!
//! This module contains every operation that mutates a repository, organized into two
//! categories:
//!
//! - `plumbing`: Building blocks shared by the operations (commit replay, history walks,
//!   batched application of classifier events)
//! - `porcelain`: User-facing operations (commit, add, branch, merge, rebase, cherry-pick,
//!   revert, reset, checkout)
//!
//! Each porcelain operation is a plain struct configured builder-style and executed with
//! [`Operation::run`] against an explicit `&Repository`.

pub mod plumbing;
pub mod porcelain;

use crate::areas::repository::Repository;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::objects::commit::Person;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::refs::HEAD;
use crate::artifacts::refs::reference::RefTarget;
use crate::errors::{OperationError, PreconditionError};

/// Classifier events buffered before they are written out
pub const BATCH_SIZE: usize = 1000;

/// Something that runs against a repository and yields `Output` or a typed error
pub trait Operation {
    type Output;

    fn run(self, repository: &Repository) -> Result<Self::Output, OperationError>;
}

/// HEAD as read once when an operation starts
///
/// Every later ref update is a compare-and-set against the value captured here, so a HEAD
/// moved by someone else in the meantime makes the update fail instead of being clobbered.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadSnapshot {
    /// Full name of the branch HEAD is attached to; `None` when detached
    branch: Option<String>,
    /// Value of the ref that moves on commit (the branch, or HEAD itself when detached)
    target: Option<RefTarget>,
    commit_id: Option<ObjectId>,
}

impl HeadSnapshot {
    pub fn capture(repository: &Repository) -> anyhow::Result<Self> {
        let refs = repository.refs();
        let branch = refs.current_branch()?;
        let target = match &branch {
            Some(branch) => refs.get(branch)?,
            None => refs.get(HEAD)?,
        };
        let commit_id = target
            .as_ref()
            .and_then(RefTarget::object_id)
            .filter(|commit_id| !commit_id.is_null())
            .cloned();

        Ok(HeadSnapshot {
            branch,
            target,
            commit_id,
        })
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    pub fn commit_id(&self) -> Option<&ObjectId> {
        self.commit_id.as_ref()
    }

    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    pub fn require_branch(&self) -> Result<&str, PreconditionError> {
        self.branch().ok_or(PreconditionError::DetachedHead)
    }

    pub fn require_commit(&self) -> Result<&ObjectId, PreconditionError> {
        self.commit_id().ok_or(PreconditionError::NoHead)
    }

    /// Root tree of the HEAD commit; empty when the branch has no commits
    pub fn tree_id(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match &self.commit_id {
            Some(commit_id) => repository.database().commit_tree_id(commit_id),
            None => Ok(Tree::empty_id()),
        }
    }

    fn ref_name(&self) -> &str {
        self.branch.as_deref().unwrap_or(HEAD)
    }

    /// Move the branch (or detached HEAD) to `commit_id`
    pub fn advance(
        &mut self,
        repository: &Repository,
        commit_id: &ObjectId,
    ) -> Result<(), OperationError> {
        let name = self.ref_name().to_string();
        let new = RefTarget::Direct(commit_id.clone());

        if !repository
            .refs()
            .compare_and_set(&name, self.target.as_ref(), &new)?
        {
            return Err(OperationError::RefUpdateRejected { name });
        }

        self.target = Some(new);
        self.commit_id = Some(commit_id.clone());
        Ok(())
    }
}

/// Working tree, index and ledger must all be clean
pub(crate) fn ensure_clean(repository: &Repository) -> Result<(), OperationError> {
    let unstaged = repository
        .working_tree()
        .count_unstaged(PathFilter::all())?;
    if unstaged > 0 {
        return Err(PreconditionError::DirtyWorkingTree(unstaged).into());
    }

    let staged = repository.staging_area().count_staged(PathFilter::all())?;
    if staged > 0 {
        return Err(PreconditionError::DirtyIndex(staged).into());
    }

    ensure_no_conflicts(repository)
}

pub(crate) fn ensure_no_conflicts(repository: &Repository) -> Result<(), OperationError> {
    let conflicts = repository.conflicts().count()?;
    if conflicts > 0 {
        return Err(PreconditionError::UnresolvedConflicts(conflicts).into());
    }
    Ok(())
}

/// No merge, rebase, cherry-pick or revert may be in progress
pub(crate) fn ensure_idle(repository: &Repository) -> Result<(), OperationError> {
    if let Some(kind) = repository.progress().active()? {
        return Err(PreconditionError::AlreadyInProgress(kind).into());
    }
    Ok(())
}

/// Commit a revision expression designates
pub(crate) fn resolve_commit(
    repository: &Repository,
    revision: &str,
) -> Result<ObjectId, OperationError> {
    repository
        .resolve_revision(revision)?
        .ok_or_else(|| PreconditionError::UnresolvedReference(revision.to_string()).into())
}

/// Identity for new commits, required to be configured
pub(crate) fn identity(repository: &Repository) -> Result<Person, OperationError> {
    repository
        .config()
        .identity()?
        .ok_or_else(|| PreconditionError::MissingIdentity.into())
}

/// Point both the staging area and the working tree at `tree_id`
pub(crate) fn update_trees(repository: &Repository, tree_id: &ObjectId) -> anyhow::Result<()> {
    repository.staging_area().update_head(tree_id)?;
    repository.working_tree().update_head(tree_id)
}

pub(crate) fn check_cancelled(listener: &dyn ProgressListener) -> Result<(), OperationError> {
    if listener.is_cancelled() {
        return Err(OperationError::Cancelled);
    }
    Ok(())
}

/// Bind a marker ref such as `ORIG_HEAD` to `commit_id`, whatever it held before
pub(crate) fn set_marker(
    repository: &Repository,
    name: &str,
    commit_id: &ObjectId,
) -> anyhow::Result<()> {
    repository
        .refs()
        .force_set(name, &RefTarget::Direct(commit_id.clone()))
}

pub(crate) fn clear_markers(repository: &Repository, names: &[&str]) -> anyhow::Result<()> {
    for name in names {
        repository.refs().delete(name, None)?;
    }
    Ok(())
}
