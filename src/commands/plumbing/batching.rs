//! Batched application of classifier events
//!
//! Scenarios over large trees produce more events than should be held at once. The
//! `BatchingConsumer` buffers them and every `BATCH_SIZE` events writes the buffered changes
//! into a tree rooted at the target snapshot and the buffered conflicts into the ledger.

use crate::areas::repository::Repository;
use crate::artifacts::core::split_path;
use crate::artifacts::diff::diff_entry::DiffEntry;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::merge::merge_event::{MergeScenarioConsumer, MergedFeature};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Node;
use crate::artifacts::objects::tree_builder::TreeBuilder;
use crate::artifacts::progress::listener::ProgressListener;
use crate::commands::BATCH_SIZE;

enum Change {
    Entry(DiffEntry),
    Merged(MergedFeature),
}

pub struct BatchingConsumer<'r> {
    repository: &'r Repository,
    listener: &'r dyn ProgressListener,
    tree_id: ObjectId,
    changes: Vec<Change>,
    conflicts: Vec<Conflict>,
    conflicted: usize,
    applied: usize,
    cancelled: bool,
    finished: bool,
}

impl<'r> BatchingConsumer<'r> {
    /// Consumer applying changes onto the tree `tree_id`
    pub fn new(
        repository: &'r Repository,
        tree_id: ObjectId,
        listener: &'r dyn ProgressListener,
    ) -> Self {
        BatchingConsumer {
            repository,
            listener,
            tree_id,
            changes: Vec::new(),
            conflicts: Vec::new(),
            conflicted: 0,
            applied: 0,
            cancelled: false,
            finished: false,
        }
    }

    /// Root of the tree with every flushed change applied
    pub fn tree_id(&self) -> &ObjectId {
        &self.tree_id
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicted
    }

    pub fn has_conflicts(&self) -> bool {
        self.conflicted > 0
    }

    /// Whether the listener stopped the run; nothing after the last flush was applied
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn buffered(&self) -> usize {
        self.changes.len() + self.conflicts.len()
    }

    fn flush_if_full(&mut self) -> anyhow::Result<()> {
        if self.buffered() >= BATCH_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        if self.listener.is_cancelled() {
            self.cancelled = true;
            anyhow::bail!("operation cancelled");
        }

        self.repository.conflicts().add_all(&self.conflicts)?;
        self.conflicted += self.conflicts.len();
        self.conflicts.clear();

        if !self.changes.is_empty() {
            let database = self.repository.database();
            let mut builder = TreeBuilder::new(database, &self.tree_id)?;

            for change in self.changes.drain(..) {
                match change {
                    Change::Entry(entry) => builder.apply(&entry)?,
                    Change::Merged(merged) => {
                        let (_, name) = split_path(merged.path());
                        let envelope = merged.feature().envelope();
                        let feature_id = database.put(merged.feature().clone())?;
                        let node = Node::feature(
                            name.to_string(),
                            feature_id,
                            merged.metadata_id().cloned(),
                            envelope,
                        );
                        builder.put(merged.path(), node)?;
                    }
                }
                self.applied += 1;
            }

            self.tree_id = builder.write()?;
        }

        self.listener.progress(self.applied + self.conflicted, None);
        Ok(())
    }
}

impl MergeScenarioConsumer for BatchingConsumer<'_> {
    fn conflicted(&mut self, conflict: Conflict) -> anyhow::Result<()> {
        self.conflicts.push(conflict);
        self.flush_if_full()
    }

    fn unconflicted(&mut self, entry: DiffEntry) -> anyhow::Result<()> {
        self.changes.push(Change::Entry(entry));
        self.flush_if_full()
    }

    fn merged(&mut self, merged: MergedFeature) -> anyhow::Result<()> {
        self.changes.push(Change::Merged(merged));
        self.flush_if_full()
    }

    fn finished(&mut self) -> anyhow::Result<()> {
        self.flush()?;
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::diff::diff_entry::NodeRef;
    use crate::artifacts::diff::path_filter::PathFilter;
    use crate::artifacts::objects::feature::FeatureRecord;
    use crate::artifacts::objects::tree::Tree;
    use crate::artifacts::objects::value::Value;
    use crate::artifacts::progress::listener::{CancellationToken, SilentListener};
    use pretty_assertions::assert_eq;

    fn added(repository: &Repository, index: usize) -> DiffEntry {
        let feature = FeatureRecord::new(vec![Value::from(index as i64)]);
        let feature_id = repository.database().put(feature).unwrap();
        let node = Node::feature(index.to_string(), feature_id, None, None);

        DiffEntry::new(None, Some(NodeRef::new("parcels".to_string(), node, None)))
    }

    #[test]
    fn large_scenarios_flush_in_batches() {
        let repository = Repository::in_memory().unwrap();
        let listener = CancellationToken::new();
        let mut consumer = BatchingConsumer::new(&repository, Tree::empty_id(), &listener);

        for index in 0..BATCH_SIZE + 10 {
            consumer.unconflicted(added(&repository, index)).unwrap();
        }
        assert_eq!(listener.completed(), BATCH_SIZE);

        consumer
            .conflicted(Conflict::new(
                "parcels/0".to_string(),
                ObjectId::null(),
                ObjectId::hash_of(b"ours"),
                ObjectId::hash_of(b"theirs"),
            ))
            .unwrap();
        consumer.finished().unwrap();

        assert!(consumer.is_finished());
        assert_eq!(consumer.conflict_count(), 1);
        assert_eq!(repository.conflicts().count().unwrap(), 1);
        let tree = repository.database().tree(consumer.tree_id()).unwrap();
        let parcels = tree.get("parcels").unwrap();
        assert_eq!(
            repository
                .database()
                .tree_diff(&Tree::empty_id(), consumer.tree_id())
                .with_filter(PathFilter::new(["parcels"]))
                .iter()
                .count(),
            BATCH_SIZE + 10
        );
        assert!(parcels.is_tree());
    }

    #[test]
    fn cancellation_stops_at_the_next_flush() {
        let repository = Repository::in_memory().unwrap();
        let listener = CancellationToken::new();
        let mut consumer = BatchingConsumer::new(&repository, Tree::empty_id(), &listener);
        consumer.unconflicted(added(&repository, 1)).unwrap();

        listener.cancel();

        assert!(consumer.finished().is_err());
        assert!(consumer.is_cancelled());
        assert_eq!(consumer.tree_id(), &Tree::empty_id());
    }

    #[test]
    fn empty_scenario_keeps_the_tree() {
        let repository = Repository::in_memory().unwrap();
        let mut consumer = BatchingConsumer::new(&repository, Tree::empty_id(), &SilentListener);

        consumer.finished().unwrap();

        assert_eq!(consumer.tree_id(), &Tree::empty_id());
        assert!(!consumer.has_conflicts());
    }
}
