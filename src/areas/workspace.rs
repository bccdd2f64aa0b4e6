//! Working tree
//!
//! The working tree is a root tree like any other, referenced by `WORK_HEAD`. Imports and
//! edits land here first; `add` moves its differences into the staging area.

use crate::areas::repository::Repository;
use crate::artifacts::core::split_path;
use crate::artifacts::diff::diff_entry::{DiffEntry, NodeRef};
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::feature::FeatureRecord;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::schema::SchemaRecord;
use crate::artifacts::objects::tree::{Node, Tree};
use crate::artifacts::objects::tree_builder::TreeBuilder;
use crate::artifacts::refs::WORK_HEAD;
use crate::artifacts::refs::reference::RefTarget;

pub struct WorkingTree<'r> {
    repository: &'r Repository,
}

impl<'r> WorkingTree<'r> {
    pub fn new(repository: &'r Repository) -> Self {
        WorkingTree { repository }
    }

    /// Root tree of the working tree; empty when nothing was ever written
    pub fn tree(&self) -> anyhow::Result<ObjectId> {
        Ok(self
            .repository
            .refs()
            .read_id(WORK_HEAD)?
            .unwrap_or_else(Tree::empty_id))
    }

    pub fn update_head(&self, tree_id: &ObjectId) -> anyhow::Result<()> {
        self.repository
            .refs()
            .force_set(WORK_HEAD, &RefTarget::Direct(tree_id.clone()))
    }

    /// Apply diff entries onto the working tree, returning the new root
    pub fn stage(&self, entries: impl IntoIterator<Item = DiffEntry>) -> anyhow::Result<ObjectId> {
        let database = self.repository.database();
        let mut builder = TreeBuilder::new(database, &self.tree()?)?;
        for entry in entries {
            builder.apply(&entry)?;
        }

        let tree_id = builder.write()?;
        self.update_head(&tree_id)?;
        Ok(tree_id)
    }

    pub fn find(&self, path: &str) -> anyhow::Result<Option<NodeRef>> {
        self.repository.database().find_node(&self.tree()?, path)
    }

    /// Write a feature at `path`, creating parent trees as needed
    pub fn insert(
        &self,
        path: &str,
        feature: FeatureRecord,
        metadata_id: Option<ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let database = self.repository.database();
        let (_, name) = split_path(path);
        let envelope = feature.envelope();
        let feature_id = database.put(feature)?;
        let node = Node::feature(name.to_string(), feature_id.clone(), metadata_id, envelope);

        let mut builder = TreeBuilder::new(database, &self.tree()?)?;
        builder.put(path, node)?;
        self.update_head(&builder.write()?)?;

        Ok(feature_id)
    }

    /// Create the feature type tree at `path`, or change the default schema of an existing one
    pub fn create_type_tree(&self, path: &str, schema: SchemaRecord) -> anyhow::Result<ObjectId> {
        let database = self.repository.database();
        let schema_id = database.put(schema)?;
        let (_, name) = split_path(path);

        let node = match self.find(path)? {
            Some(existing) if existing.is_tree() => {
                existing.node().with_metadata_id(Some(schema_id.clone()))
            }
            _ => Node::tree(name.to_string(), Tree::empty_id(), Some(schema_id.clone())),
        };

        let mut builder = TreeBuilder::new(database, &self.tree()?)?;
        builder.put(path, node)?;
        self.update_head(&builder.write()?)?;

        Ok(schema_id)
    }

    /// Remove whatever is at `path`; returns whether something was removed
    pub fn delete(&self, path: &str) -> anyhow::Result<bool> {
        let mut builder = TreeBuilder::new(self.repository.database(), &self.tree()?)?;
        if !builder.remove(path)? {
            return Ok(false);
        }

        self.update_head(&builder.write()?)?;
        Ok(true)
    }

    /// Changes not yet staged: `diff(STAGE_HEAD, WORK_HEAD)`
    pub fn get_unstaged(&self, filter: PathFilter) -> anyhow::Result<TreeDiff<'r>> {
        let stage_tree = self.repository.staging_area().tree()?;

        Ok(self
            .repository
            .database()
            .tree_diff(&stage_tree, &self.tree()?)
            .with_filter(filter))
    }

    pub fn count_unstaged(&self, filter: PathFilter) -> anyhow::Result<usize> {
        self.get_unstaged(filter)?
            .iter()
            .try_fold(0, |count, entry| entry.map(|_| count + 1))
    }

    /// Whether the working tree matches the staging area
    pub fn is_clean(&self) -> anyhow::Result<bool> {
        Ok(self.tree()? == self.repository.staging_area().tree()?)
    }
}
