use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Commit, Person};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::{CHERRY_PICK_HEAD, HEAD, ORIG_HEAD};
use crate::commands::plumbing::sequencer::{self, Replay, Sequencer, parent_tree};
use crate::commands::porcelain::{Resume, silent};
use crate::commands::{
    HeadSnapshot, Operation, ensure_clean, ensure_idle, identity, resolve_commit, set_marker,
};
use crate::errors::{OperationError, PreconditionError};

struct CherryPickReplay {
    committer: Person,
}

impl Replay for CherryPickReplay {
    fn kind(&self) -> OperationKind {
        OperationKind::CherryPick
    }

    fn trees(
        &self,
        repository: &Repository,
        commit: &Commit,
    ) -> anyhow::Result<(ObjectId, ObjectId)> {
        Ok((parent_tree(repository, commit)?, commit.tree_id().clone()))
    }

    fn build_commit(
        &self,
        _repository: &Repository,
        _step_id: &ObjectId,
        commit: &Commit,
        parent: Option<ObjectId>,
        tree_id: ObjectId,
    ) -> Result<Commit, OperationError> {
        Ok(commit.rewritten(
            parent.into_iter().collect(),
            tree_id,
            self.committer.clone(),
        ))
    }

    fn on_conflict(&self, repository: &Repository, step_id: &ObjectId) -> anyhow::Result<()> {
        set_marker(repository, CHERRY_PICK_HEAD, step_id)
    }
}

/// Apply the changes of existing commits onto HEAD, one new commit each
///
/// Authors and messages are kept; the configured identity becomes the committer.
pub struct CherryPick {
    commits: Vec<String>,
    listener: Box<dyn ProgressListener>,
}

impl CherryPick {
    pub fn new(commits: impl IntoIterator<Item = impl Into<String>>) -> Self {
        CherryPick {
            commits: commits.into_iter().map(Into::into).collect(),
            listener: silent(),
        }
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for CherryPick {
    /// Commits created, in order
    type Output = Vec<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Vec<ObjectId>, OperationError> {
        if self.commits.is_empty() {
            return Err(
                PreconditionError::InvalidArgument("no commits to cherry-pick".to_string()).into(),
            );
        }

        let head = HeadSnapshot::capture(repository)?;
        let head_id = head.require_commit()?.clone();
        ensure_clean(repository)?;
        ensure_idle(repository)?;

        let queue = self
            .commits
            .iter()
            .map(|revision| resolve_commit(repository, revision))
            .collect::<Result<Vec<_>, _>>()?;
        let replay = CherryPickReplay {
            committer: identity(repository)?,
        };

        let branch = head.branch().unwrap_or(HEAD).to_string();
        let progress = OperationProgress::new(OperationKind::CherryPick, branch, queue);
        let picker = Sequencer::new(repository, replay, self.listener.as_ref())?;

        set_marker(repository, ORIG_HEAD, &head_id)?;
        let created = picker.start(progress)?;
        if created.is_empty() && self.commits.len() == 1 {
            return Err(OperationError::NothingToCommit(format!(
                "cherry-pick of {} is empty",
                self.commits[0]
            )));
        }

        Ok(created)
    }
}

/// Continue, skip or abort a stopped cherry-pick
pub struct ResumeCherryPick {
    action: Resume,
    listener: Box<dyn ProgressListener>,
}

impl ResumeCherryPick {
    pub fn new(action: Resume) -> Self {
        ResumeCherryPick {
            action,
            listener: silent(),
        }
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for ResumeCherryPick {
    type Output = Vec<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Vec<ObjectId>, OperationError> {
        if self.action == Resume::Abort {
            sequencer::abort(repository, OperationKind::CherryPick)?;
            return Ok(Vec::new());
        }

        let replay = CherryPickReplay {
            committer: identity(repository)?,
        };
        Sequencer::new(repository, replay, self.listener.as_ref())?
            .resume(self.action == Resume::Skip)
    }
}
