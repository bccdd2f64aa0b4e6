use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Commit, Person};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::{HEAD, ORIG_HEAD};
use crate::commands::plumbing::sequencer::{self, Replay, Sequencer, parent_tree};
use crate::commands::porcelain::{Resume, silent};
use crate::commands::{
    HeadSnapshot, Operation, ensure_clean, ensure_idle, identity, resolve_commit, set_marker,
};
use crate::errors::{OperationError, PreconditionError};

struct RevertReplay {
    identity: Person,
    no_commit: bool,
}

impl Replay for RevertReplay {
    fn kind(&self) -> OperationKind {
        OperationKind::Revert
    }

    /// The inverse change: from the commit back to its parent
    fn trees(
        &self,
        repository: &Repository,
        commit: &Commit,
    ) -> anyhow::Result<(ObjectId, ObjectId)> {
        Ok((commit.tree_id().clone(), parent_tree(repository, commit)?))
    }

    fn build_commit(
        &self,
        _repository: &Repository,
        step_id: &ObjectId,
        commit: &Commit,
        parent: Option<ObjectId>,
        tree_id: ObjectId,
    ) -> Result<Commit, OperationError> {
        Ok(Commit::new(
            parent.into_iter().collect(),
            tree_id,
            self.identity.clone(),
            self.identity.clone(),
            revert_message(step_id, commit),
        ))
    }

    fn conflict_header(&self, step_id: &ObjectId, commit: &Commit) -> String {
        format!(
            "error: could not revert {} {}",
            step_id.to_short_oid(),
            commit.short_message()
        )
    }

    fn creates_commits(&self) -> bool {
        !self.no_commit
    }
}

fn revert_message(commit_id: &ObjectId, commit: &Commit) -> String {
    format!("Revert '{}'\nThis reverts {}", commit.short_message(), commit_id)
}

/// Undo the changes of existing commits with new commits on top of HEAD
///
/// Commits are reverted in the order given, so the newest should come first. With `no_commit`
/// the inverse changes accumulate in the index instead.
pub struct Revert {
    commits: Vec<String>,
    no_commit: bool,
    listener: Box<dyn ProgressListener>,
}

impl Revert {
    pub fn new(commits: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Revert {
            commits: commits.into_iter().map(Into::into).collect(),
            no_commit: false,
            listener: silent(),
        }
    }

    pub fn no_commit(mut self, no_commit: bool) -> Self {
        self.no_commit = no_commit;
        self
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for Revert {
    /// Revert commits created, in order; empty with `no_commit`
    type Output = Vec<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Vec<ObjectId>, OperationError> {
        if self.commits.is_empty() {
            return Err(
                PreconditionError::InvalidArgument("no commits to revert".to_string()).into(),
            );
        }

        let head = HeadSnapshot::capture(repository)?;
        let head_id = head.require_commit()?.clone();
        ensure_clean(repository)?;
        ensure_idle(repository)?;

        let mut queue = Vec::with_capacity(self.commits.len());
        for revision in &self.commits {
            let commit_id = resolve_commit(repository, revision)?;
            if repository.database().commit(&commit_id)?.is_merge() {
                return Err(PreconditionError::InvalidArgument(format!(
                    "commit {} is a merge; reverting merges is not supported",
                    commit_id.to_short_oid()
                ))
                .into());
            }
            queue.push(commit_id);
        }

        let replay = RevertReplay {
            identity: identity(repository)?,
            no_commit: self.no_commit,
        };
        let branch = head.branch().unwrap_or(HEAD).to_string();
        let progress = OperationProgress::new(OperationKind::Revert, branch, queue);
        let reverter = Sequencer::new(repository, replay, self.listener.as_ref())?;

        set_marker(repository, ORIG_HEAD, &head_id)?;
        reverter.start(progress)
    }
}

/// Continue, skip or abort a stopped revert
///
/// `no_commit` must match the value the revert was started with.
pub struct ResumeRevert {
    action: Resume,
    no_commit: bool,
    listener: Box<dyn ProgressListener>,
}

impl ResumeRevert {
    pub fn new(action: Resume) -> Self {
        ResumeRevert {
            action,
            no_commit: false,
            listener: silent(),
        }
    }

    pub fn no_commit(mut self, no_commit: bool) -> Self {
        self.no_commit = no_commit;
        self
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for ResumeRevert {
    type Output = Vec<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Vec<ObjectId>, OperationError> {
        if self.action == Resume::Abort {
            sequencer::abort(repository, OperationKind::Revert)?;
            return Ok(Vec::new());
        }

        let replay = RevertReplay {
            identity: identity(repository)?,
            no_commit: self.no_commit,
        };
        Sequencer::new(repository, replay, self.listener.as_ref())?
            .resume(self.action == Resume::Skip)
    }
}
