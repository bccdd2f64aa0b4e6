//! Resumable commit replay
//!
//! Rebase, cherry-pick and revert all walk a queue of commits and apply each one's changes
//! onto HEAD with the single-sided apply report. The `Sequencer` owns that loop and the
//! persisted `OperationProgress`; a `Replay` supplies what differs per operation: which trees
//! are diffed, how the resulting commit is built and how a conflict is announced.
//!
//! ## Progress
//!
//! Progress is saved before the first step and after every step. A conflicting step stays
//! current with `conflicted` set; `continue` commits the staged resolution for it and `skip`
//! drops it. A step found current but not conflicted (the process stopped mid-step) is
//! applied again from scratch, which is harmless: changes already on HEAD apply as no-ops.

use crate::areas::repository::Repository;
use crate::artifacts::merge::commit_apply::CommitApplyReport;
use crate::artifacts::merge::merge_event::report;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::listener::ProgressListener;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::reference::RefTarget;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::refs::{CHERRY_PICK_HEAD, MERGE_HEAD, ORIG_HEAD};
use crate::commands::plumbing::batching::BatchingConsumer;
use crate::commands::{
    HeadSnapshot, check_cancelled, clear_markers, ensure_no_conflicts, update_trees,
};
use crate::errors::{ConflictError, OperationError, PreconditionError};
use tracing::{debug, info, warn};

/// What one kind of replaying operation does with each commit
pub trait Replay {
    fn kind(&self) -> OperationKind;

    /// Trees whose difference is applied onto HEAD, as `(from, to)`
    fn trees(&self, repository: &Repository, commit: &Commit)
    -> anyhow::Result<(ObjectId, ObjectId)>;

    /// Commit recording an applied step on top of `parent`
    fn build_commit(
        &self,
        repository: &Repository,
        step_id: &ObjectId,
        commit: &Commit,
        parent: Option<ObjectId>,
        tree_id: ObjectId,
    ) -> Result<Commit, OperationError>;

    /// First line of the conflict report
    fn conflict_header(&self, step_id: &ObjectId, commit: &Commit) -> String {
        format!(
            "error: could not apply {} {}",
            step_id.to_short_oid(),
            commit.short_message()
        )
    }

    /// Whether applied steps become commits; otherwise they accumulate in the index
    fn creates_commits(&self) -> bool {
        true
    }

    /// Invoked before a conflicting step is reported
    fn on_conflict(&self, _repository: &Repository, _step_id: &ObjectId) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct Sequencer<'r, R: Replay> {
    repository: &'r Repository,
    replay: R,
    listener: &'r dyn ProgressListener,
    head: HeadSnapshot,
    /// Tree the next step applies onto
    tree_id: ObjectId,
    created: Vec<ObjectId>,
}

impl<'r, R: Replay> Sequencer<'r, R> {
    pub fn new(
        repository: &'r Repository,
        replay: R,
        listener: &'r dyn ProgressListener,
    ) -> anyhow::Result<Self> {
        let head = HeadSnapshot::capture(repository)?;
        let tree_id = if replay.creates_commits() {
            head.tree_id(repository)?
        } else {
            repository.staging_area().tree()?
        };

        Ok(Sequencer {
            repository,
            replay,
            listener,
            head,
            tree_id,
            created: Vec::new(),
        })
    }

    /// Persist `progress` and replay its whole queue
    ///
    /// Returns the commits created, in order.
    pub fn start(mut self, mut progress: OperationProgress) -> Result<Vec<ObjectId>, OperationError> {
        info!(
            kind = %progress.kind(),
            branch = progress.branch(),
            steps = progress.queue().len(),
            "starting"
        );
        self.repository.progress().save(&progress)?;

        self.run(&mut progress)?;
        self.finish()
    }

    /// Resume a stopped operation, committing (`skip == false`) or dropping its current step
    pub fn resume(mut self, skip: bool) -> Result<Vec<ObjectId>, OperationError> {
        let kind = self.replay.kind();
        let mut progress = self
            .repository
            .progress()
            .load(kind)?
            .ok_or(PreconditionError::NotInProgress(kind))?;

        if skip {
            self.skip_current(&mut progress)?;
        } else if progress.is_conflicted() {
            self.continue_current(&mut progress)?;
        }

        self.run(&mut progress)?;
        self.finish()
    }

    fn step_commit(&self, progress: &OperationProgress, step_id: &ObjectId) -> anyhow::Result<Commit> {
        if let Some(squash) = progress.squash()
            && squash.object_id()? == *step_id
        {
            return Ok(squash.clone());
        }
        self.repository.database().commit(step_id)
    }

    fn run(&mut self, progress: &mut OperationProgress) -> Result<(), OperationError> {
        let total = progress.queue().len();

        while let Some(step_id) = progress.current().cloned() {
            check_cancelled(self.listener)?;

            let commit = self.step_commit(progress, &step_id)?;
            self.apply(progress, &step_id, &commit)?;

            progress.advance();
            self.repository.progress().save(progress)?;
            self.listener.progress(progress.cursor(), Some(total));
        }

        Ok(())
    }

    fn apply(
        &mut self,
        progress: &mut OperationProgress,
        step_id: &ObjectId,
        commit: &Commit,
    ) -> Result<(), OperationError> {
        let (from_tree, to_tree) = self.replay.trees(self.repository, commit)?;
        let events = CommitApplyReport::new(
            self.repository.database(),
            &from_tree,
            &to_tree,
            &self.tree_id,
        );

        let mut consumer = BatchingConsumer::new(self.repository, self.tree_id.clone(), self.listener);
        if let Err(err) = report(events, &mut consumer) {
            if consumer.is_cancelled() {
                // the ledger was empty when the step started
                self.repository.conflicts().clear()?;
                return Err(OperationError::Cancelled);
            }
            return Err(err.into());
        }

        if consumer.has_conflicts() {
            update_trees(self.repository, consumer.tree_id())?;
            progress.set_conflicted(true);
            self.repository.progress().save(progress)?;
            self.replay.on_conflict(self.repository, step_id)?;

            warn!(
                kind = %self.replay.kind(),
                step = %step_id,
                conflicts = consumer.conflict_count(),
                "conflicts recorded"
            );
            return Err(ConflictError::new(
                self.replay.kind(),
                Some(step_id.clone()),
                &self.replay.conflict_header(step_id, commit),
                self.repository.conflicts().all()?,
            )
            .into());
        }

        self.record(step_id, commit, consumer.tree_id().clone())
    }

    /// Make `tree_id` the outcome of a step: a new commit, or the staged tree
    fn record(
        &mut self,
        step_id: &ObjectId,
        commit: &Commit,
        tree_id: ObjectId,
    ) -> Result<(), OperationError> {
        if tree_id == self.tree_id {
            debug!(step = %step_id, "step is empty");
            update_trees(self.repository, &tree_id)?;
            return Ok(());
        }

        if self.replay.creates_commits() {
            let new_commit = self.replay.build_commit(
                self.repository,
                step_id,
                commit,
                self.head.commit_id().cloned(),
                tree_id.clone(),
            )?;
            let new_id = self.repository.put_commit(new_commit)?;
            self.head.advance(self.repository, &new_id)?;
            debug!(step = %step_id, commit = %new_id, "step applied");
            self.created.push(new_id);
        } else {
            debug!(step = %step_id, tree = %tree_id, "step staged");
        }

        update_trees(self.repository, &tree_id)?;
        self.tree_id = tree_id;
        Ok(())
    }

    fn continue_current(&mut self, progress: &mut OperationProgress) -> Result<(), OperationError> {
        ensure_no_conflicts(self.repository)?;
        let Some(step_id) = progress.current().cloned() else {
            return Ok(());
        };
        info!(kind = %self.replay.kind(), step = %step_id, "continuing");

        let commit = self.step_commit(progress, &step_id)?;
        let staged = self.repository.staging_area().tree()?;
        self.record(&step_id, &commit, staged)?;
        clear_markers(self.repository, &[CHERRY_PICK_HEAD])?;

        progress.advance();
        self.repository.progress().save(progress)?;
        Ok(())
    }

    fn skip_current(&mut self, progress: &mut OperationProgress) -> Result<(), OperationError> {
        info!(kind = %self.replay.kind(), step = ?progress.current(), "skipping");

        self.repository.conflicts().clear()?;
        update_trees(self.repository, &self.tree_id)?;
        clear_markers(self.repository, &[CHERRY_PICK_HEAD])?;

        progress.advance();
        self.repository.progress().save(progress)?;
        Ok(())
    }

    fn finish(self) -> Result<Vec<ObjectId>, OperationError> {
        self.repository.progress().clear(self.replay.kind())?;
        clear_markers(self.repository, &[ORIG_HEAD, CHERRY_PICK_HEAD])?;
        info!(
            kind = %self.replay.kind(),
            commits = self.created.len(),
            "finished"
        );

        Ok(self.created)
    }
}

/// Restore the branch, index and working tree saved in `ORIG_HEAD` and drop all progress
///
/// Shared by every resumable operation, merge included.
pub fn abort(repository: &Repository, kind: OperationKind) -> Result<(), OperationError> {
    let progress = repository
        .progress()
        .load(kind)?
        .ok_or(PreconditionError::NotInProgress(kind))?;
    info!(kind = %kind, branch = progress.branch(), "aborting");

    if let Some(orig_head) = repository.refs().read_id(ORIG_HEAD)? {
        let name = progress.branch();
        let current = repository.refs().get(name)?;
        if !repository.refs().compare_and_set(
            name,
            current.as_ref(),
            &RefTarget::Direct(orig_head.clone()),
        )? {
            return Err(OperationError::RefUpdateRejected {
                name: name.to_string(),
            });
        }
        update_trees(
            repository,
            &repository.database().commit_tree_id(&orig_head)?,
        )?;
    }

    repository.conflicts().clear()?;
    repository.progress().clear(kind)?;
    clear_markers(repository, &[ORIG_HEAD, MERGE_HEAD, CHERRY_PICK_HEAD])?;
    Ok(())
}

/// Root tree of a commit's first parent; empty for a root commit
pub fn parent_tree(repository: &Repository, commit: &Commit) -> anyhow::Result<ObjectId> {
    match commit.parent() {
        Some(parent_id) => repository.database().commit_tree_id(parent_id),
        None => Ok(Tree::empty_id()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::Person;
    use crate::artifacts::objects::feature::FeatureRecord;
    use crate::artifacts::objects::tree::Node;
    use crate::artifacts::objects::tree_builder::TreeBuilder;
    use crate::artifacts::objects::value::Value;
    use crate::artifacts::progress::listener::SilentListener;
    use crate::artifacts::refs::DEFAULT_BRANCH;
    use pretty_assertions::assert_eq;
    use rstest::*;

    struct Pick;

    impl Replay for Pick {
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
            Ok(commit.rewritten(parent.into_iter().collect(), tree_id, person()))
        }
    }

    fn person() -> Person {
        Person::new("Ada".to_string(), "ada@example.com".to_string())
    }

    fn write_tree(repository: &Repository, owners: &[(&str, &str)]) -> ObjectId {
        let database = repository.database();
        let mut builder = TreeBuilder::empty(database);
        for (path, owner) in owners {
            let feature = FeatureRecord::new(vec![
                Value::from(*owner),
                Value::Geometry("POINT (1 1)".to_string()),
            ]);
            let envelope = feature.envelope();
            let feature_id = database.put(feature).unwrap();
            builder
                .put(path, Node::feature(String::new(), feature_id, None, envelope))
                .unwrap();
        }
        builder.write().unwrap()
    }

    fn commit(
        repository: &Repository,
        parent: Option<&ObjectId>,
        owners: &[(&str, &str)],
        message: &str,
    ) -> ObjectId {
        let tree_id = write_tree(repository, owners);
        repository
            .put_commit(Commit::new(
                parent.into_iter().cloned().collect(),
                tree_id,
                person(),
                person(),
                message.to_string(),
            ))
            .unwrap()
    }

    fn checkout(repository: &Repository, commit_id: &ObjectId) {
        repository
            .refs()
            .force_set(DEFAULT_BRANCH, &RefTarget::Direct(commit_id.clone()))
            .unwrap();
        let tree_id = repository.database().commit_tree_id(commit_id).unwrap();
        update_trees(repository, &tree_id).unwrap();
    }

    fn head_tree(repository: &Repository) -> ObjectId {
        let head = repository.refs().read_id(DEFAULT_BRANCH).unwrap().unwrap();
        repository.database().commit_tree_id(&head).unwrap()
    }

    fn progress(queue: Vec<ObjectId>) -> OperationProgress {
        OperationProgress::new(OperationKind::CherryPick, DEFAULT_BRANCH.to_string(), queue)
    }

    #[fixture]
    fn repository() -> Repository {
        Repository::in_memory().unwrap()
    }

    #[rstest]
    fn queue_is_replayed_onto_head(repository: Repository) {
        let base = commit(&repository, None, &[("parcels/1", "alice")], "Add parcel 1");
        let first = commit(
            &repository,
            Some(&base),
            &[("parcels/1", "alice"), ("parcels/2", "bob")],
            "Add parcel 2",
        );
        let second = commit(
            &repository,
            Some(&first),
            &[("parcels/1", "alice"), ("parcels/2", "bob"), ("parcels/3", "carol")],
            "Add parcel 3",
        );
        let main = commit(&repository, Some(&base), &[("parcels/1", "dave")], "Sell parcel 1");
        checkout(&repository, &main);

        let created = Sequencer::new(&repository, Pick, &SilentListener)
            .unwrap()
            .start(progress(vec![first, second]))
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(repository.database().commit(&created[0]).unwrap().parent(), Some(&main));
        assert_eq!(repository.refs().read_id(DEFAULT_BRANCH).unwrap(), Some(created[1].clone()));
        assert_eq!(
            head_tree(&repository),
            write_tree(
                &repository,
                &[("parcels/1", "dave"), ("parcels/2", "bob"), ("parcels/3", "carol")]
            )
        );
        assert!(repository.progress().load(OperationKind::CherryPick).unwrap().is_none());
    }

    #[rstest]
    fn conflicting_step_stays_current_until_skipped(repository: Repository) {
        let base = commit(&repository, None, &[("parcels/1", "alice")], "Add parcel 1");
        let first = commit(&repository, Some(&base), &[("parcels/1", "bob")], "Sell parcel 1");
        let second = commit(
            &repository,
            Some(&first),
            &[("parcels/1", "bob"), ("parcels/3", "carol")],
            "Add parcel 3",
        );
        let main = commit(&repository, Some(&base), &[("parcels/1", "dave")], "Resell parcel 1");
        checkout(&repository, &main);

        let result = Sequencer::new(&repository, Pick, &SilentListener)
            .unwrap()
            .start(progress(vec![first.clone(), second]));

        assert!(matches!(result, Err(OperationError::Conflict(_))));
        let stopped = repository
            .progress()
            .load(OperationKind::CherryPick)
            .unwrap()
            .unwrap();
        assert_eq!(stopped.current(), Some(&first));
        assert!(stopped.is_conflicted());
        assert_eq!(repository.conflicts().all().unwrap().len(), 1);

        let created = Sequencer::new(&repository, Pick, &SilentListener)
            .unwrap()
            .resume(true)
            .unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(repository.database().commit(&created[0]).unwrap().parent(), Some(&main));
        assert_eq!(
            head_tree(&repository),
            write_tree(&repository, &[("parcels/1", "dave"), ("parcels/3", "carol")])
        );
        assert!(repository.conflicts().all().unwrap().is_empty());
        assert!(repository.progress().load(OperationKind::CherryPick).unwrap().is_none());
    }
}
