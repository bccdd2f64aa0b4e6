use crate::areas::repository::Repository;
use crate::artifacts::merge::merge_event::{MergeScenarioReport, report};
use crate::artifacts::merge::scenario::MergeScenario;
use crate::artifacts::objects::commit::{Commit, Person};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::{MERGE_HEAD, ORIG_HEAD};
use crate::commands::plumbing::batching::BatchingConsumer;
use crate::commands::plumbing::sequencer;
use crate::commands::porcelain::commit::CommitStaged;
use crate::commands::porcelain::{Resume, silent};
use crate::commands::{
    HeadSnapshot, Operation, check_cancelled, clear_markers, ensure_clean, ensure_idle, identity,
    resolve_commit, set_marker, update_trees,
};
use crate::errors::{ConflictError, OperationError, PreconditionError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// HEAD moved to the merged commit; no commit was created
    FastForward(ObjectId),
    /// The merge commit created
    Merged(ObjectId),
    /// Merge result left in the index (`no_commit`); commit it to conclude
    Staged(ObjectId),
}

/// Three-way merge of one or more commits into the current branch
///
/// With several commits (an octopus merge) every pair is first classified without touching
/// the repository and the merge is refused if any pair conflicts.
pub struct Merge {
    commits: Vec<String>,
    ours: bool,
    theirs: bool,
    no_commit: bool,
    no_ff: bool,
    ff_only: bool,
    message: Option<String>,
    author: Option<Person>,
    listener: Box<dyn ProgressListener>,
}

impl Merge {
    pub fn new(commits: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Merge {
            commits: commits.into_iter().map(Into::into).collect(),
            ours: false,
            theirs: false,
            no_commit: false,
            no_ff: false,
            ff_only: false,
            message: None,
            author: None,
            listener: silent(),
        }
    }

    /// Keep the current tree, recording the merge only in history
    pub fn ours(mut self) -> Self {
        self.ours = true;
        self
    }

    /// Take the merged commit's tree wholesale
    pub fn theirs(mut self) -> Self {
        self.theirs = true;
        self
    }

    pub fn no_commit(mut self) -> Self {
        self.no_commit = true;
        self
    }

    /// Create a merge commit even when a fast-forward is possible
    pub fn no_ff(mut self) -> Self {
        self.no_ff = true;
        self
    }

    /// Refuse anything but a fast-forward
    pub fn ff_only(mut self) -> Self {
        self.ff_only = true;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn author(mut self, author: Person) -> Self {
        self.author = Some(author);
        self
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    fn validate(&self) -> Result<(), PreconditionError> {
        if self.commits.is_empty() {
            return Err(PreconditionError::InvalidArgument(
                "no commits specified to merge".to_string(),
            ));
        }
        if self.ours && self.theirs {
            return Err(PreconditionError::InvalidArgument(
                "cannot use both ours and theirs".to_string(),
            ));
        }
        if self.no_ff && self.ff_only {
            return Err(PreconditionError::InvalidArgument(
                "cannot use both no-ff and ff-only".to_string(),
            ));
        }
        Ok(())
    }
}

impl Operation for Merge {
    type Output = MergeOutcome;

    fn run(self, repository: &Repository) -> Result<MergeOutcome, OperationError> {
        self.validate()?;
        let mut head = HeadSnapshot::capture(repository)?;
        let branch = head.require_branch()?.to_string();
        ensure_clean(repository)?;
        ensure_idle(repository)?;

        let commit_ids = self
            .commits
            .iter()
            .map(|revision| resolve_commit(repository, revision))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(head_id) = head.commit_id().cloned() else {
            // nothing to merge into: take the first commit as is
            return fast_forward(repository, &mut head, &commit_ids[0]);
        };

        // (commit, common ancestor) for every commit not merged already
        let mut pending = Vec::with_capacity(commit_ids.len());
        for commit_id in &commit_ids {
            let ancestor_id = repository
                .ancestry()
                .find_best_common_ancestor(&head_id, commit_id)?
                .ok_or_else(|| {
                    PreconditionError::NoCommonAncestor(
                        head_id.to_short_oid(),
                        commit_id.to_short_oid(),
                    )
                })?;

            if &ancestor_id == commit_id {
                debug!(commit = %commit_id.to_short_oid(), "already merged");
                continue;
            }
            pending.push((commit_id.clone(), ancestor_id));
        }

        if pending.is_empty() {
            return Err(OperationError::NothingToCommit(
                "The branch has already been merged.".to_string(),
            ));
        }

        if let [(commit_id, ancestor_id)] = pending.as_slice()
            && *ancestor_id == head_id
            && !self.no_ff
        {
            return fast_forward(repository, &mut head, commit_id);
        }
        if self.ff_only {
            return Err(PreconditionError::CannotFastForward(
                pending
                    .iter()
                    .map(|(commit_id, _)| commit_id.to_short_oid())
                    .collect::<Vec<_>>()
                    .join(", "),
            )
            .into());
        }

        if pending.len() > 1 {
            check_octopus(repository, &head_id, &pending)?;
        }
        let committer = if self.no_commit {
            None
        } else {
            Some(identity(repository)?)
        };

        let merged = pending
            .iter()
            .map(|(commit_id, _)| commit_id.clone())
            .collect::<Vec<_>>();
        let message = match &self.message {
            Some(message) => message.clone(),
            None => default_message(repository, &self.commits, &commit_ids, &merged)?,
        };

        info!(
            branch,
            commits = ?merged.iter().map(ObjectId::to_short_oid).collect::<Vec<_>>(),
            "merging"
        );
        set_marker(repository, ORIG_HEAD, &head_id)?;
        set_marker(repository, MERGE_HEAD, &merged[0])?;
        let mut progress = OperationProgress::new(OperationKind::Merge, branch, merged.clone())
            .with_message(Some(message.clone()));
        repository.progress().save(&progress)?;

        let tree_id = match self.merge_trees(repository, &head, &pending, &mut progress) {
            Ok(tree_id) => tree_id,
            Err(OperationError::Cancelled) => {
                cancel(repository, &head)?;
                return Err(OperationError::Cancelled);
            }
            Err(err) => return Err(err),
        };
        update_trees(repository, &tree_id)?;

        let Some(committer) = committer else {
            info!(tree = %tree_id, "merge staged");
            return Ok(MergeOutcome::Staged(tree_id));
        };

        let parents = std::iter::once(head_id).chain(merged).collect();
        let author = self.author.unwrap_or_else(|| committer.clone());
        let commit_id = repository.put_commit(Commit::new(parents, tree_id, author, committer, message))?;
        head.advance(repository, &commit_id)?;

        clear_markers(repository, &[MERGE_HEAD, ORIG_HEAD])?;
        repository.progress().clear(OperationKind::Merge)?;

        info!(commit = %commit_id.to_short_oid(), "merge committed");
        Ok(MergeOutcome::Merged(commit_id))
    }
}

impl Merge {
    /// Merged tree of HEAD and every pending commit
    fn merge_trees(
        &self,
        repository: &Repository,
        head: &HeadSnapshot,
        pending: &[(ObjectId, ObjectId)],
        progress: &mut OperationProgress,
    ) -> Result<ObjectId, OperationError> {
        let database = repository.database();
        let mut tree_id = head.tree_id(repository)?;

        for (commit_id, ancestor_id) in pending {
            check_cancelled(self.listener.as_ref())?;
            let theirs_tree = database.commit_tree_id(commit_id)?;

            if self.ours {
                continue;
            }
            if self.theirs {
                tree_id = theirs_tree;
                continue;
            }

            let ancestor_tree = database.commit_tree_id(ancestor_id)?;
            let events = MergeScenario::new(database, &ancestor_tree, &tree_id, &theirs_tree);
            let mut consumer = BatchingConsumer::new(repository, tree_id.clone(), self.listener.as_ref());
            if let Err(err) = report(events, &mut consumer) {
                if consumer.is_cancelled() {
                    return Err(OperationError::Cancelled);
                }
                return Err(err.into());
            }

            if consumer.has_conflicts() {
                update_trees(repository, consumer.tree_id())?;
                progress.set_conflicted(true);
                repository.progress().save(progress)?;

                warn!(
                    commit = %commit_id.to_short_oid(),
                    conflicts = consumer.conflict_count(),
                    "conflicts recorded"
                );
                return Err(ConflictError::new(
                    OperationKind::Merge,
                    Some(commit_id.clone()),
                    &format!(
                        "Automatic merge of {} failed; fix conflicts and then commit the result.",
                        commit_id.to_short_oid()
                    ),
                    repository.conflicts().all()?,
                )
                .into());
            }

            debug!(commit = %commit_id.to_short_oid(), tree = %consumer.tree_id(), "merged tree");
            tree_id = consumer.tree_id().clone();
        }

        Ok(tree_id)
    }
}

fn fast_forward(
    repository: &Repository,
    head: &mut HeadSnapshot,
    commit_id: &ObjectId,
) -> Result<MergeOutcome, OperationError> {
    head.advance(repository, commit_id)?;
    update_trees(repository, &repository.database().commit_tree_id(commit_id)?)?;

    info!(commit = %commit_id.to_short_oid(), "fast-forward");
    Ok(MergeOutcome::FastForward(commit_id.clone()))
}

/// Classify every pair among HEAD and the pending commits, refusing on any conflict
fn check_octopus(
    repository: &Repository,
    head_id: &ObjectId,
    pending: &[(ObjectId, ObjectId)],
) -> Result<(), OperationError> {
    let database = repository.database();
    let mut sides = vec![head_id.clone()];
    sides.extend(pending.iter().map(|(commit_id, _)| commit_id.clone()));

    let mut conflicting = Vec::new();
    for (index, ours) in sides.iter().enumerate() {
        for theirs in &sides[index + 1..] {
            let Some(ancestor_id) = repository
                .ancestry()
                .find_best_common_ancestor(ours, theirs)?
            else {
                return Err(PreconditionError::NoCommonAncestor(
                    ours.to_short_oid(),
                    theirs.to_short_oid(),
                )
                .into());
            };

            let mut scenario = MergeScenarioReport::default();
            report(
                MergeScenario::new(
                    database,
                    &database.commit_tree_id(&ancestor_id)?,
                    &database.commit_tree_id(ours)?,
                    &database.commit_tree_id(theirs)?,
                ),
                &mut scenario,
            )?;

            if scenario.has_conflicts() {
                conflicting.extend(
                    scenario
                        .conflicts()
                        .iter()
                        .map(|conflict| conflict.path().to_string()),
                );
            }
        }
    }

    if conflicting.is_empty() {
        return Ok(());
    }
    conflicting.sort();
    conflicting.dedup();
    Err(PreconditionError::OctopusConflicts(conflicting.join(", ")).into())
}

/// `Merge branch <name>` for branch names, `Merge commit '<id>'` otherwise
fn default_message(
    repository: &Repository,
    revisions: &[String],
    commit_ids: &[ObjectId],
    merged: &[ObjectId],
) -> anyhow::Result<String> {
    let mut lines = Vec::new();

    for (revision, commit_id) in revisions.iter().zip(commit_ids) {
        if !merged.contains(commit_id) {
            continue;
        }
        match repository.refs().find(revision)? {
            Some(reference) if reference.is_branch() || reference.is_remote() => {
                lines.push(format!("Merge branch {}", reference.short_name()))
            }
            _ => lines.push(format!("Merge commit '{commit_id}'")),
        }
    }

    Ok(lines.join("\n"))
}

/// Drop everything a cancelled merge left behind; HEAD has not moved yet
fn cancel(repository: &Repository, head: &HeadSnapshot) -> Result<(), OperationError> {
    warn!("merge cancelled");
    repository.conflicts().clear()?;
    repository.progress().clear(OperationKind::Merge)?;
    clear_markers(repository, &[MERGE_HEAD, ORIG_HEAD])?;
    update_trees(repository, &head.tree_id(repository)?)?;
    Ok(())
}

/// Conclude or abort a merge stopped on conflicts or by `no_commit`
#[derive(Debug, Clone)]
pub struct ResumeMerge {
    action: Resume,
    message: Option<String>,
}

impl ResumeMerge {
    pub fn new(action: Resume) -> Self {
        ResumeMerge {
            action,
            message: None,
        }
    }

    /// Message to use instead of the saved one
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Operation for ResumeMerge {
    /// The merge commit, when one was created
    type Output = Option<ObjectId>;

    fn run(self, repository: &Repository) -> Result<Option<ObjectId>, OperationError> {
        match self.action {
            Resume::Abort => {
                sequencer::abort(repository, OperationKind::Merge)?;
                Ok(None)
            }
            Resume::Skip => Err(PreconditionError::InvalidArgument(
                "a merge cannot be skipped".to_string(),
            )
            .into()),
            Resume::Continue => {
                if repository.progress().load(OperationKind::Merge)?.is_none() {
                    return Err(PreconditionError::NotInProgress(OperationKind::Merge).into());
                }

                let commit = match self.message {
                    Some(message) => CommitStaged::new().message(message),
                    None => CommitStaged::new(),
                };
                commit.run(repository).map(Some)
            }
        }
    }
}
