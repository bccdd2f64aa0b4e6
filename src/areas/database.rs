//! Object database
//!
//! `ObjectStore` is the contract a storage backend implements: raw get/put of immutable
//! objects keyed by id. `ObjectDatabase` layers typed access on top of it (commits, trees,
//! features, schemas), path lookups inside a root tree and tree diffing.

use crate::artifacts::core::{child_path, components};
use crate::artifacts::diff::diff_entry::NodeRef;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::feature::FeatureRecord;
use crate::artifacts::objects::object::RevObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::schema::SchemaRecord;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;

/// Storage backend for immutable objects
pub trait ObjectStore {
    fn get(&self, id: &ObjectId) -> anyhow::Result<Option<RevObject>>;

    /// Store an object, returning its id; storing an existing object is a no-op
    fn put(&self, object: &RevObject) -> anyhow::Result<ObjectId>;

    fn exists(&self, id: &ObjectId) -> anyhow::Result<bool>;

    fn get_all(&self, ids: &[ObjectId]) -> anyhow::Result<Vec<RevObject>> {
        ids.iter()
            .map(|id| {
                self.get(id)?
                    .with_context(|| format!("object {id} not found"))
            })
            .collect()
    }

    fn put_all(&self, objects: &[RevObject]) -> anyhow::Result<Vec<ObjectId>> {
        objects.iter().map(|object| self.put(object)).collect()
    }
}

pub struct ObjectDatabase {
    store: Box<dyn ObjectStore>,
}

impl ObjectDatabase {
    pub fn new(store: Box<dyn ObjectStore>) -> Self {
        ObjectDatabase { store }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn put(&self, object: impl Into<RevObject>) -> anyhow::Result<ObjectId> {
        self.store.put(&object.into())
    }

    pub fn exists(&self, id: &ObjectId) -> anyhow::Result<bool> {
        Ok(*id == Tree::empty_id() || self.store.exists(id)?)
    }

    pub fn find(&self, id: &ObjectId) -> anyhow::Result<Option<RevObject>> {
        if *id == Tree::empty_id() {
            return Ok(Some(RevObject::Tree(Tree::empty())));
        }
        self.store.get(id)
    }

    fn load(&self, id: &ObjectId) -> anyhow::Result<RevObject> {
        self.find(id)?
            .with_context(|| format!("object {id} not found"))
    }

    pub fn find_commit(&self, id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        match self.find(id)? {
            Some(RevObject::Commit(commit)) => Ok(Some(commit)),
            Some(_) => anyhow::bail!("object {id} is not a commit"),
            None => Ok(None),
        }
    }

    pub fn commit(&self, id: &ObjectId) -> anyhow::Result<Commit> {
        self.find_commit(id)?
            .with_context(|| format!("commit {id} not found"))
    }

    pub fn tree(&self, id: &ObjectId) -> anyhow::Result<Tree> {
        match self.load(id)? {
            RevObject::Tree(tree) => Ok(tree),
            _ => anyhow::bail!("object {id} is not a tree"),
        }
    }

    pub fn feature(&self, id: &ObjectId) -> anyhow::Result<FeatureRecord> {
        match self.load(id)? {
            RevObject::Feature(feature) => Ok(feature),
            _ => anyhow::bail!("object {id} is not a feature"),
        }
    }

    pub fn schema(&self, id: &ObjectId) -> anyhow::Result<SchemaRecord> {
        match self.load(id)? {
            RevObject::Schema(schema) => Ok(schema),
            _ => anyhow::bail!("object {id} is not a schema"),
        }
    }

    /// Root tree of a commit; the null id stands for the empty history
    pub fn commit_tree_id(&self, commit_id: &ObjectId) -> anyhow::Result<ObjectId> {
        if commit_id.is_null() {
            return Ok(Tree::empty_id());
        }
        Ok(self.commit(commit_id)?.tree_id().clone())
    }

    /// Locate the node at `path` below `root_id`, resolving its inherited schema
    pub fn find_node(&self, root_id: &ObjectId, path: &str) -> anyhow::Result<Option<NodeRef>> {
        let mut tree = self.tree(root_id)?;
        let mut parent_path = String::new();
        let mut default_metadata: Option<ObjectId> = None;
        let mut parts = components(path).peekable();

        while let Some(name) = parts.next() {
            let Some(node) = tree.get(name).cloned() else {
                return Ok(None);
            };
            let metadata_id = node.metadata_id().cloned().or(default_metadata.clone());

            if parts.peek().is_none() {
                return Ok(Some(NodeRef::new(parent_path, node, metadata_id)));
            }
            if !node.is_tree() {
                return Ok(None);
            }

            tree = self.tree(node.object_id())?;
            parent_path = child_path(&parent_path, name);
            default_metadata = metadata_id;
        }

        Ok(None)
    }

    /// Lazy path-ordered comparison of two trees
    pub fn tree_diff(&self, old_tree: &ObjectId, new_tree: &ObjectId) -> TreeDiff<'_> {
        TreeDiff::new(self, old_tree.clone(), new_tree.clone())
    }
}
