use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Commit, Person};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::ORIG_HEAD;
use crate::commands::plumbing::rev_list::RevList;
use crate::commands::plumbing::sequencer::{self, Replay, Sequencer, parent_tree};
use crate::commands::porcelain::{Resume, silent};
use crate::commands::{
    HeadSnapshot, Operation, ensure_clean, ensure_idle, identity, resolve_commit, set_marker,
    update_trees,
};
use crate::errors::{OperationError, PreconditionError};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// The branch only moved forward to the new base
    FastForward(ObjectId),
    /// Nothing to replay
    UpToDate,
    /// Commits created on top of the new base, in order
    Rebased(Vec<ObjectId>),
}

struct RebaseReplay {
    committer: Person,
}

impl Replay for RebaseReplay {
    fn kind(&self) -> OperationKind {
        OperationKind::Rebase
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
}

/// Replay the commits of the current branch onto another base
///
/// The commits replayed are those reachable from HEAD but not from the common ancestor of HEAD
/// and `upstream`, parents first. Merge commits are dropped: what they brought in is either
/// already upstream or replayed with its own commits. The rest land on `onto`, which defaults
/// to `upstream`. With a squash message they are first folded into a single commit.
pub struct Rebase {
    upstream: String,
    onto: Option<String>,
    squash_message: Option<String>,
    listener: Box<dyn ProgressListener>,
}

impl Rebase {
    pub fn new(upstream: impl Into<String>) -> Self {
        Rebase {
            upstream: upstream.into(),
            onto: None,
            squash_message: None,
            listener: silent(),
        }
    }

    pub fn onto(mut self, revision: impl Into<String>) -> Self {
        self.onto = Some(revision.into());
        self
    }

    pub fn squash(mut self, message: impl Into<String>) -> Self {
        self.squash_message = Some(message.into());
        self
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for Rebase {
    type Output = RebaseOutcome;

    fn run(self, repository: &Repository) -> Result<RebaseOutcome, OperationError> {
        let mut head = HeadSnapshot::capture(repository)?;
        let branch = head.require_branch()?.to_string();
        ensure_clean(repository)?;
        ensure_idle(repository)?;

        let upstream_id = resolve_commit(repository, &self.upstream)?;
        let onto_id = match &self.onto {
            Some(onto) => resolve_commit(repository, onto)?,
            None => upstream_id.clone(),
        };

        let Some(head_id) = head.commit_id().cloned() else {
            return fast_forward(repository, &mut head, &onto_id);
        };
        let ancestor_id = repository
            .ancestry()
            .find_best_common_ancestor(&head_id, &upstream_id)?
            .ok_or_else(|| {
                PreconditionError::NoCommonAncestor(
                    head_id.to_short_oid(),
                    upstream_id.to_short_oid(),
                )
            })?;

        if ancestor_id == head_id {
            return fast_forward(repository, &mut head, &onto_id);
        }
        if ancestor_id == upstream_id && upstream_id == onto_id {
            info!(branch, "current branch is up to date");
            return Ok(RebaseOutcome::UpToDate);
        }

        let committer = identity(repository)?;
        let queue = RevList::new(repository, head_id.clone())
            .no_merges()
            .range_from(Some(&ancestor_id))?;

        let progress = match &self.squash_message {
            Some(message) => {
                let squash = squash_commit(repository, &queue, &ancestor_id, &head_id, &committer, message)?;
                let squash_id = squash.object_id()?;
                OperationProgress::squashed(OperationKind::Rebase, branch.clone(), squash_id, squash)
            }
            None => OperationProgress::new(OperationKind::Rebase, branch.clone(), queue),
        }
        .with_onto(Some(onto_id.clone()));

        info!(
            branch,
            onto = %onto_id.to_short_oid(),
            steps = progress.queue().len(),
            "rebasing"
        );
        set_marker(repository, ORIG_HEAD, &head_id)?;
        repository.progress().save(&progress)?;

        head.advance(repository, &onto_id)?;
        update_trees(repository, &repository.database().commit_tree_id(&onto_id)?)?;

        let replay = RebaseReplay { committer };
        let created = Sequencer::new(repository, replay, self.listener.as_ref())?.start(progress)?;
        Ok(RebaseOutcome::Rebased(created))
    }
}

fn fast_forward(
    repository: &Repository,
    head: &mut HeadSnapshot,
    onto_id: &ObjectId,
) -> Result<RebaseOutcome, OperationError> {
    head.advance(repository, onto_id)?;
    update_trees(repository, &repository.database().commit_tree_id(onto_id)?)?;

    info!(commit = %onto_id.to_short_oid(), "fast-forwarded");
    Ok(RebaseOutcome::FastForward(onto_id.clone()))
}

/// One commit holding every change of `queue`, authored like its newest commit
fn squash_commit(
    repository: &Repository,
    queue: &[ObjectId],
    ancestor_id: &ObjectId,
    head_id: &ObjectId,
    committer: &Person,
    message: &str,
) -> anyhow::Result<Commit> {
    let author = match queue.last() {
        Some(first) => repository.database().commit(first)?.author().clone(),
        None => committer.clone(),
    };

    Ok(Commit::new(
        vec![ancestor_id.clone()],
        repository.database().commit_tree_id(head_id)?,
        author,
        committer.clone(),
        message.to_string(),
    ))
}

/// Continue, skip or abort a stopped rebase
pub struct ResumeRebase {
    action: Resume,
    listener: Box<dyn ProgressListener>,
}

impl ResumeRebase {
    pub fn new(action: Resume) -> Self {
        ResumeRebase {
            action,
            listener: silent(),
        }
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for ResumeRebase {
    /// Commits created while resuming
    type Output = Vec<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Vec<ObjectId>, OperationError> {
        if self.action == Resume::Abort {
            sequencer::abort(repository, OperationKind::Rebase)?;
            return Ok(Vec::new());
        }

        let progress = repository
            .progress()
            .load(OperationKind::Rebase)?
            .ok_or(PreconditionError::NotInProgress(OperationKind::Rebase))?;
        rewind_to_onto(repository, &progress)?;

        let replay = RebaseReplay {
            committer: identity(repository)?,
        };
        Sequencer::new(repository, replay, self.listener.as_ref())?
            .resume(self.action == Resume::Skip)
    }
}

/// Move the branch onto the new base if the rebase stopped before doing so
///
/// The record is saved before the rewind; a branch still at `ORIG_HEAD` with no step applied
/// never reached `onto`.
fn rewind_to_onto(
    repository: &Repository,
    progress: &OperationProgress,
) -> Result<(), OperationError> {
    let Some(onto_id) = progress.onto() else {
        return Ok(());
    };
    let mut head = HeadSnapshot::capture(repository)?;
    let orig_head = repository.refs().read_id(ORIG_HEAD)?;

    if progress.cursor() > 0
        || progress.is_conflicted()
        || orig_head.is_none()
        || head.commit_id() != orig_head.as_ref()
        || head.commit_id() == Some(onto_id)
    {
        return Ok(());
    }

    warn!(
        branch = progress.branch(),
        onto = %onto_id.to_short_oid(),
        "rewinding interrupted rebase"
    );
    head.advance(repository, onto_id)?;
    update_trees(repository, &repository.database().commit_tree_id(onto_id)?)?;
    Ok(())
}
