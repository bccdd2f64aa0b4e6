//! Three-way merge scenario classifier
//!
//! Walks `diff(ancestor, ours)` and `diff(ancestor, theirs)` side by side in path order and
//! classifies every changed path:
//!
//! - Changed on one side only: unconflicted, the single-sided change wins
//! - Changed on both sides to the same result: unconflicted
//! - Feature modified on both sides with compatible attribute changes: merged
//! - Anything else changed on both sides: conflicted
//!
//! Both diffs report trees, so a sub-tree touched by one side only is emitted once as a whole
//! and its descendants are skipped.

use crate::areas::database::ObjectDatabase;
use crate::artifacts::core::path_cmp;
use crate::artifacts::diff::diff_entry::{ChangeType, DiffEntry};
use crate::artifacts::diff::tree_diff::DiffCursor;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::merge::feature_merge::{FeatureMerge, merge_features};
use crate::artifacts::merge::merge_event::{MergeEvent, MergedFeature};
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use std::cmp::Ordering;

pub struct MergeScenario<'d> {
    database: &'d ObjectDatabase,
    ours: DiffCursor<'d>,
    theirs: DiffCursor<'d>,
    finished: bool,
}

impl<'d> MergeScenario<'d> {
    pub fn new(
        database: &'d ObjectDatabase,
        ancestor_tree: &ObjectId,
        ours_tree: &ObjectId,
        theirs_tree: &ObjectId,
    ) -> Self {
        let ours = database.tree_diff(ancestor_tree, ours_tree).report_trees(true);
        let theirs = database.tree_diff(ancestor_tree, theirs_tree).report_trees(true);

        MergeScenario {
            database,
            ours: DiffCursor::new(ours.iter()),
            theirs: DiffCursor::new(theirs.iter()),
            finished: false,
        }
    }

    fn next_event(&mut self) -> anyhow::Result<Option<MergeEvent>> {
        loop {
            let ours_path = self.ours.peek()?.map(DiffEntry::path);
            let theirs_path = self.theirs.peek()?.map(DiffEntry::path);

            let order = match (&ours_path, &theirs_path) {
                (None, None) => return Ok(None),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(ours), Some(theirs)) => path_cmp(ours, theirs),
            };

            let event = match order {
                Ordering::Less => Self::single_sided(&mut self.ours)?,
                Ordering::Greater => Self::single_sided(&mut self.theirs)?,
                Ordering::Equal => self.both_sided()?,
            };

            if let Some(event) = event {
                return Ok(Some(event));
            }
        }
    }

    fn single_sided(cursor: &mut DiffCursor<'_>) -> anyhow::Result<Option<MergeEvent>> {
        let Some(entry) = cursor.pop()? else {
            return Ok(None);
        };
        if entry.is_tree() {
            cursor.skip_under(&entry.path())?;
        }

        Ok(Some(MergeEvent::Unconflicted(entry)))
    }

    fn skip_both_under(&mut self, path: &str) -> anyhow::Result<()> {
        self.ours.skip_under(path)?;
        self.theirs.skip_under(path)
    }

    fn both_sided(&mut self) -> anyhow::Result<Option<MergeEvent>> {
        let (Some(ours), Some(theirs)) = (self.ours.pop()?, self.theirs.pop()?) else {
            return Ok(None);
        };
        let path = ours.path();

        if ours.change_type() != theirs.change_type() {
            if ours.is_tree() || theirs.is_tree() {
                self.skip_both_under(&path)?;
            }
            return Ok(Some(conflict(&ours, &theirs)));
        }

        if ours.change_type() == ChangeType::Removed {
            if theirs.is_tree() {
                self.skip_both_under(&path)?;
            }
            return Ok(Some(MergeEvent::Unconflicted(theirs)));
        }

        let (Some(ours_new), Some(theirs_new)) = (ours.new_ref(), theirs.new_ref()) else {
            return Ok(Some(conflict(&ours, &theirs)));
        };

        if ours_new.object_id() == theirs_new.object_id()
            && ours_new.metadata_id() == theirs_new.metadata_id()
            && ours_new.is_tree() == theirs_new.is_tree()
        {
            if theirs.is_tree() {
                self.skip_both_under(&path)?;
            }
            return Ok(Some(MergeEvent::Unconflicted(theirs)));
        }

        if ours_new.is_tree() != theirs_new.is_tree() {
            self.skip_both_under(&path)?;
            return Ok(Some(conflict(&ours, &theirs)));
        }

        if ours_new.is_tree() {
            // same default schema: the children decide
            if ours_new.metadata_id() == theirs_new.metadata_id() {
                return Ok(None);
            }
            return Ok(Some(conflict(&ours, &theirs)));
        }

        if ours.change_type() == ChangeType::Added {
            return Ok(Some(conflict(&ours, &theirs)));
        }

        self.merge_modified_features(ours, theirs).map(Some)
    }

    fn merge_modified_features(
        &self,
        ours: DiffEntry,
        theirs: DiffEntry,
    ) -> anyhow::Result<MergeEvent> {
        let (Some(ancestor), Some(ours_new), Some(theirs_new)) =
            (ours.old_ref(), ours.new_ref(), theirs.new_ref())
        else {
            return Ok(conflict(&ours, &theirs));
        };

        let ancestor_schema = ancestor.metadata_id();
        if ours_new.metadata_id() != theirs_new.metadata_id()
            || ours_new.metadata_id() != ancestor_schema
        {
            return Ok(conflict(&ours, &theirs));
        }

        let ancestor_feature = self.database.feature(ancestor.object_id())?;
        let ours_feature = self.database.feature(ours_new.object_id())?;
        let theirs_feature = self.database.feature(theirs_new.object_id())?;

        let merged = match merge_features(&ancestor_feature, &ours_feature, &theirs_feature) {
            FeatureMerge::Merged(merged) => merged,
            FeatureMerge::Conflict => return Ok(conflict(&ours, &theirs)),
        };

        let merged_id = merged.object_id()?;
        if &merged_id == theirs_new.object_id() {
            return Ok(MergeEvent::Unconflicted(theirs));
        }
        if &merged_id == ours_new.object_id() {
            return Ok(MergeEvent::Unconflicted(ours));
        }

        Ok(MergeEvent::Merged(MergedFeature::new(
            ours.path(),
            merged,
            ours_new.node().metadata_id().cloned(),
        )))
    }
}

fn conflict(ours: &DiffEntry, theirs: &DiffEntry) -> MergeEvent {
    MergeEvent::Conflicted(Conflict::new(
        ours.path(),
        ours.old_object_id(),
        ours.new_object_id(),
        theirs.new_object_id(),
    ))
}

impl Iterator for MergeScenario<'_> {
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
