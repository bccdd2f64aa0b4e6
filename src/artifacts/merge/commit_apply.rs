//! Replay of one commit's changes onto another tree
//!
//! Cherry-pick, rebase and revert do not merge two histories: they take the changes of a
//! single commit, `diff(from, to)`, and check each one against the node currently found at
//! the same path in the HEAD tree. Conflicts record the commit's old version as ancestor,
//! HEAD's version as ours and the commit's new version as theirs.

use crate::areas::database::ObjectDatabase;
use crate::artifacts::diff::diff_entry::{DiffEntry, NodeRef};
use crate::artifacts::diff::tree_diff::DiffCursor;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::merge::feature_merge::apply_feature_change;
use crate::artifacts::merge::merge_event::{MergeEvent, MergedFeature};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;

pub struct CommitApplyReport<'d> {
    database: &'d ObjectDatabase,
    head_tree: ObjectId,
    changes: DiffCursor<'d>,
    finished: bool,
}

fn same_version(left: &NodeRef, right: &NodeRef) -> bool {
    left.object_id() == right.object_id()
        && left.metadata_id() == right.metadata_id()
        && left.is_tree() == right.is_tree()
}

impl<'d> CommitApplyReport<'d> {
    /// Report how `diff(from_tree, to_tree)` applies onto `head_tree`
    pub fn new(
        database: &'d ObjectDatabase,
        from_tree: &ObjectId,
        to_tree: &ObjectId,
        head_tree: &ObjectId,
    ) -> Self {
        let changes = database.tree_diff(from_tree, to_tree).report_trees(true);

        CommitApplyReport {
            database,
            head_tree: head_tree.clone(),
            changes: DiffCursor::new(changes.iter()),
            finished: false,
        }
    }

    fn next_event(&mut self) -> anyhow::Result<Option<MergeEvent>> {
        while let Some(entry) = self.changes.pop()? {
            let path = entry.path();
            let head = self.database.find_node(&self.head_tree, &path)?;

            let event = match (entry.old_ref(), entry.new_ref()) {
                (None, Some(new)) => self.added(&entry, new, head)?,
                (Some(old), None) => self.removed(&entry, old, head)?,
                (Some(old), Some(new)) if new.is_tree() => self.modified_tree(&entry, old, new, head)?,
                (Some(old), Some(new)) => self.modified_feature(&entry, old, new, head)?,
                (None, None) => None,
            };

            if let Some(event) = event {
                return Ok(Some(event));
            }
        }

        Ok(None)
    }

    fn skip_children(&mut self, entry: &DiffEntry) -> anyhow::Result<()> {
        if entry.is_tree() {
            self.changes.skip_under(&entry.path())?;
        }
        Ok(())
    }

    fn added(
        &mut self,
        entry: &DiffEntry,
        new: &NodeRef,
        head: Option<NodeRef>,
    ) -> anyhow::Result<Option<MergeEvent>> {
        let Some(head) = head else {
            self.skip_children(entry)?;
            return Ok(Some(MergeEvent::Unconflicted(entry.clone())));
        };

        if same_version(&head, new) {
            self.skip_children(entry)?;
            return Ok(None);
        }
        if head.is_tree() && new.is_tree() && head.metadata_id() == new.metadata_id() {
            return Ok(None);
        }

        self.skip_children(entry)?;
        Ok(Some(conflict(
            entry,
            ObjectId::null(),
            head.object_id().clone(),
            new.object_id().clone(),
        )))
    }

    fn removed(
        &mut self,
        entry: &DiffEntry,
        old: &NodeRef,
        head: Option<NodeRef>,
    ) -> anyhow::Result<Option<MergeEvent>> {
        let Some(head) = head else {
            self.skip_children(entry)?;
            return Ok(None);
        };

        if same_version(&head, old) {
            self.skip_children(entry)?;
            return Ok(Some(MergeEvent::Unconflicted(entry.clone())));
        }
        if head.is_tree() && old.is_tree() {
            return Ok(None);
        }

        self.skip_children(entry)?;
        Ok(Some(conflict(
            entry,
            old.object_id().clone(),
            head.object_id().clone(),
            ObjectId::null(),
        )))
    }

    fn modified_tree(
        &mut self,
        entry: &DiffEntry,
        old: &NodeRef,
        new: &NodeRef,
        head: Option<NodeRef>,
    ) -> anyhow::Result<Option<MergeEvent>> {
        let Some(head) = head else {
            // children come through as additions
            return Ok(None);
        };

        if same_version(&head, old) {
            self.skip_children(entry)?;
            return Ok(Some(MergeEvent::Unconflicted(entry.clone())));
        }
        if same_version(&head, new) {
            self.skip_children(entry)?;
            return Ok(None);
        }
        if head.is_tree() && old.object_id() != new.object_id() {
            return Ok(None);
        }

        self.skip_children(entry)?;
        Ok(Some(conflict(
            entry,
            old.object_id().clone(),
            head.object_id().clone(),
            new.object_id().clone(),
        )))
    }

    fn modified_feature(
        &mut self,
        entry: &DiffEntry,
        old: &NodeRef,
        new: &NodeRef,
        head: Option<NodeRef>,
    ) -> anyhow::Result<Option<MergeEvent>> {
        let Some(head) = head else {
            return Ok(Some(MergeEvent::Unconflicted(entry.clone())));
        };

        if same_version(&head, new) {
            return Ok(None);
        }
        if same_version(&head, old) {
            return Ok(Some(MergeEvent::Unconflicted(entry.clone())));
        }

        let head_conflict = conflict(
            entry,
            old.object_id().clone(),
            head.object_id().clone(),
            new.object_id().clone(),
        );
        if head.is_tree()
            || head.metadata_id() != old.metadata_id()
            || old.metadata_id() != new.metadata_id()
        {
            return Ok(Some(head_conflict));
        }

        let old_feature = self.database.feature(old.object_id())?;
        let new_feature = self.database.feature(new.object_id())?;
        let head_feature = self.database.feature(head.object_id())?;

        let Some(applied) = apply_feature_change(&old_feature, &new_feature, &head_feature) else {
            return Ok(Some(head_conflict));
        };
        if &applied.object_id()? == head.object_id() {
            return Ok(None);
        }

        Ok(Some(MergeEvent::Merged(MergedFeature::new(
            entry.path(),
            applied,
            head.node().metadata_id().cloned(),
        ))))
    }
}

fn conflict(entry: &DiffEntry, ancestor: ObjectId, ours: ObjectId, theirs: ObjectId) -> MergeEvent {
    MergeEvent::Conflicted(Conflict::new(entry.path(), ancestor, ours, theirs))
}

impl Iterator for CommitApplyReport<'_> {
    type Item = anyhow::Result<MergeEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                Some(Ok(MergeEvent::Finished))
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::diff::diff_entry::ChangeType;
    use crate::artifacts::objects::feature::FeatureRecord;
    use crate::artifacts::objects::tree::Node;
    use crate::artifacts::objects::tree_builder::TreeBuilder;
    use crate::artifacts::objects::value::Value;
    use crate::storage::memory::MemoryObjectStore;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn parcel(owner: &str, x: u32) -> FeatureRecord {
        FeatureRecord::new(vec![
            Value::from(owner),
            Value::Geometry(format!("POINT ({x} 0)")),
        ])
    }

    fn write_tree(database: &ObjectDatabase, features: &[(&str, FeatureRecord)]) -> ObjectId {
        let mut builder = TreeBuilder::empty(database);
        for (path, feature) in features {
            let envelope = feature.envelope();
            let feature_id = database.put(feature.clone()).unwrap();
            builder
                .put(path, Node::feature(String::new(), feature_id, None, envelope))
                .unwrap();
        }
        builder.write().unwrap()
    }

    fn events(
        database: &ObjectDatabase,
        from: &ObjectId,
        to: &ObjectId,
        head: &ObjectId,
    ) -> Vec<MergeEvent> {
        CommitApplyReport::new(database, from, to, head)
            .collect::<anyhow::Result<Vec<_>>>()
            .unwrap()
    }

    #[fixture]
    fn database() -> ObjectDatabase {
        ObjectDatabase::new(Box::new(MemoryObjectStore::default()))
    }

    #[rstest]
    fn addition_missing_from_head_applies(database: ObjectDatabase) {
        let from = write_tree(&database, &[("parcels/1", parcel("alice", 1))]);
        let to = write_tree(
            &database,
            &[("parcels/1", parcel("alice", 1)), ("parcels/2", parcel("bob", 2))],
        );
        let head = write_tree(
            &database,
            &[("parcels/1", parcel("alice", 1)), ("parcels/3", parcel("carol", 3))],
        );

        let events = events(&database, &from, &to, &head);

        assert_eq!(events.len(), 2);
        let MergeEvent::Unconflicted(entry) = &events[0] else {
            panic!("expected an unconflicted change, got {:?}", events[0]);
        };
        assert_eq!(entry.path(), "parcels/2");
        assert_eq!(entry.change_type(), ChangeType::Added);
        assert_eq!(events[1], MergeEvent::Finished);
    }

    #[rstest]
    fn change_already_on_head_is_skipped(database: ObjectDatabase) {
        let from = write_tree(&database, &[("parcels/1", parcel("alice", 1))]);
        let to = write_tree(&database, &[("parcels/1", parcel("dave", 1))]);

        assert_eq!(events(&database, &from, &to, &to), vec![MergeEvent::Finished]);
    }

    #[rstest]
    fn removal_of_a_feature_head_changed_conflicts(database: ObjectDatabase) {
        let kept = ("parcels/2", parcel("bob", 2));
        let from = write_tree(&database, &[("parcels/1", parcel("alice", 1)), kept.clone()]);
        let to = write_tree(&database, &[kept.clone()]);
        let head = write_tree(&database, &[("parcels/1", parcel("erin", 1)), kept]);

        let events = events(&database, &from, &to, &head);

        assert_eq!(
            events,
            vec![
                MergeEvent::Conflicted(Conflict::new(
                    "parcels/1".to_string(),
                    parcel("alice", 1).object_id().unwrap(),
                    parcel("erin", 1).object_id().unwrap(),
                    ObjectId::null(),
                )),
                MergeEvent::Finished,
            ]
        );
    }

    #[rstest]
    fn disjoint_attribute_change_merges_into_head(database: ObjectDatabase) {
        let from = write_tree(&database, &[("parcels/1", parcel("alice", 1))]);
        let to = write_tree(&database, &[("parcels/1", parcel("dave", 1))]);
        let head = write_tree(&database, &[("parcels/1", parcel("alice", 7))]);

        let events = events(&database, &from, &to, &head);

        assert_eq!(
            events,
            vec![
                MergeEvent::Merged(MergedFeature::new(
                    "parcels/1".to_string(),
                    parcel("dave", 7),
                    None,
                )),
                MergeEvent::Finished,
            ]
        );
    }

    #[rstest]
    fn overlapping_attribute_change_conflicts(database: ObjectDatabase) {
        let from = write_tree(&database, &[("parcels/1", parcel("alice", 1))]);
        let to = write_tree(&database, &[("parcels/1", parcel("dave", 1))]);
        let head = write_tree(&database, &[("parcels/1", parcel("frank", 1))]);

        let events = events(&database, &from, &to, &head);

        assert!(matches!(
            &events[0],
            MergeEvent::Conflicted(conflict) if conflict.path() == "parcels/1"
        ));
        assert_eq!(events.len(), 2);
    }
}
