//! Staging area
//!
//! The pending snapshot between the working tree and the next commit, referenced by
//! `STAGE_HEAD`. Staging applies diff entries onto it through a `TreeBuilder`, so a staged
//! tree entry replaces its whole sub-tree in one step.

use crate::areas::repository::Repository;
use crate::artifacts::diff::diff_entry::DiffEntry;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::objects::tree_builder::TreeBuilder;
use crate::artifacts::refs::STAGE_HEAD;
use crate::artifacts::refs::reference::RefTarget;

pub struct StagingArea<'r> {
    repository: &'r Repository,
}

impl<'r> StagingArea<'r> {
    pub fn new(repository: &'r Repository) -> Self {
        StagingArea { repository }
    }

    pub fn tree(&self) -> anyhow::Result<ObjectId> {
        Ok(self
            .repository
            .refs()
            .read_id(STAGE_HEAD)?
            .unwrap_or_else(Tree::empty_id))
    }

    pub fn update_head(&self, tree_id: &ObjectId) -> anyhow::Result<()> {
        self.repository
            .refs()
            .force_set(STAGE_HEAD, &RefTarget::Direct(tree_id.clone()))
    }

    /// Apply diff entries onto the staged tree, returning the new root
    pub fn stage(&self, entries: impl IntoIterator<Item = DiffEntry>) -> anyhow::Result<ObjectId> {
        let mut builder = TreeBuilder::new(self.repository.database(), &self.tree()?)?;
        for entry in entries {
            builder.apply(&entry)?;
        }

        let tree_id = builder.write()?;
        self.update_head(&tree_id)?;
        Ok(tree_id)
    }

    /// Changes staged for the next commit: `diff(HEAD tree, STAGE_HEAD)`
    pub fn get_staged(&self, filter: PathFilter) -> anyhow::Result<TreeDiff<'r>> {
        let head_tree = self.repository.head_tree()?;

        Ok(self
            .repository
            .database()
            .tree_diff(&head_tree, &self.tree()?)
            .with_filter(filter))
    }

    pub fn count_staged(&self, filter: PathFilter) -> anyhow::Result<usize> {
        self.get_staged(filter)?
            .iter()
            .try_fold(0, |count, entry| entry.map(|_| count + 1))
    }

    /// Whether nothing is staged beyond the HEAD commit
    pub fn is_clean(&self) -> anyhow::Result<bool> {
        Ok(self.tree()? == self.repository.head_tree()?)
    }
}
