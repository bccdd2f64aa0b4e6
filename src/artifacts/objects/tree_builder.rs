//! Copy-on-write tree editing
//!
//! A `TreeBuilder` starts from a root tree, records `put`/`remove` edits by path and writes
//! only the modified sub-trees back, bottom-up. Sub-trees that are never touched are never
//! loaded.

use crate::areas::database::ObjectDatabase;
use crate::artifacts::core::components;
use crate::artifacts::diff::diff_entry::DiffEntry;
use crate::artifacts::objects::envelope::Envelope;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Node, Tree};
use anyhow::Context;
use std::collections::BTreeMap;

/// Pending nodes of one tree plus the edits of the sub-trees below it
#[derive(Debug, Default)]
struct TreeEdit {
    nodes: BTreeMap<String, Node>,
    children: BTreeMap<String, TreeEdit>,
}

impl TreeEdit {
    fn load(database: &ObjectDatabase, tree_id: &ObjectId) -> anyhow::Result<Self> {
        let nodes = database
            .tree(tree_id)?
            .into_nodes()
            .into_iter()
            .map(|node| (node.name().to_string(), node))
            .collect();

        Ok(TreeEdit {
            nodes,
            children: BTreeMap::new(),
        })
    }

    fn write(self, database: &ObjectDatabase) -> anyhow::Result<(ObjectId, Option<Envelope>)> {
        let TreeEdit {
            mut nodes,
            children,
        } = self;

        for (name, child) in children {
            let (tree_id, envelope) = child.write(database)?;
            if let Some(node) = nodes.get_mut(&name) {
                *node = node.with_object_id(tree_id, envelope);
            }
        }

        let tree = Tree::new(nodes.into_values());
        let envelope = tree.envelope();
        let tree_id = database.put(tree)?;

        Ok((tree_id, envelope))
    }
}

pub struct TreeBuilder<'d> {
    database: &'d ObjectDatabase,
    root: TreeEdit,
}

impl<'d> TreeBuilder<'d> {
    pub fn new(database: &'d ObjectDatabase, root_id: &ObjectId) -> anyhow::Result<Self> {
        Ok(TreeBuilder {
            database,
            root: TreeEdit::load(database, root_id)?,
        })
    }

    pub fn empty(database: &'d ObjectDatabase) -> Self {
        TreeBuilder {
            database,
            root: TreeEdit::default(),
        }
    }

    /// Place `node` at `path`, creating missing intermediate trees
    ///
    /// A tree node replaces the whole sub-tree at that path, edits pending below it included.
    pub fn put(&mut self, path: &str, node: Node) -> anyhow::Result<()> {
        let parts = components(path).collect::<Vec<_>>();
        let Some((name, parents)) = parts.split_last() else {
            anyhow::bail!("Cannot put a node at the root of a tree");
        };

        let edit = Self::descend(self.database, &mut self.root, parents, true)?
            .with_context(|| format!("Cannot create parent trees of {path}"))?;
        edit.children.remove(*name);
        edit.nodes.insert(name.to_string(), node.renamed(name.to_string()));

        Ok(())
    }

    /// Remove the node at `path`; returns whether something was there
    pub fn remove(&mut self, path: &str) -> anyhow::Result<bool> {
        let parts = components(path).collect::<Vec<_>>();
        let Some((name, parents)) = parts.split_last() else {
            anyhow::bail!("Cannot remove the root of a tree");
        };

        let Some(edit) = Self::descend(self.database, &mut self.root, parents, false)? else {
            return Ok(false);
        };
        edit.children.remove(*name);

        Ok(edit.nodes.remove(*name).is_some())
    }

    /// Make the tree match the new side of a diff entry
    pub fn apply(&mut self, entry: &DiffEntry) -> anyhow::Result<()> {
        match entry.new_ref() {
            Some(new) => self.put(&entry.path(), new.node().clone()),
            None => self.remove(&entry.path()).map(|_| ()),
        }
    }

    /// Write every modified tree, returning the id of the new root
    pub fn write(self) -> anyhow::Result<ObjectId> {
        let (root_id, _) = self.root.write(self.database)?;
        Ok(root_id)
    }

    fn descend<'e>(
        database: &ObjectDatabase,
        mut edit: &'e mut TreeEdit,
        parts: &[&str],
        create: bool,
    ) -> anyhow::Result<Option<&'e mut TreeEdit>> {
        for part in parts {
            if !edit.children.contains_key(*part) {
                let existing = edit
                    .nodes
                    .get(*part)
                    .filter(|node| node.is_tree())
                    .map(|node| node.object_id().clone());

                let child = match existing {
                    Some(tree_id) => TreeEdit::load(database, &tree_id)?,
                    None if create => {
                        edit.nodes.insert(
                            part.to_string(),
                            Node::tree(part.to_string(), Tree::empty_id(), None),
                        );
                        TreeEdit::default()
                    }
                    None => return Ok(None),
                };
                edit.children.insert(part.to_string(), child);
            }

            edit = edit
                .children
                .get_mut(*part)
                .with_context(|| format!("Tree edit for {part} vanished"))?;
        }

        Ok(Some(edit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::feature::FeatureRecord;
    use crate::artifacts::objects::value::Value;
    use crate::storage::memory::MemoryObjectStore;
    use pretty_assertions::assert_eq;

    fn database() -> ObjectDatabase {
        ObjectDatabase::new(Box::new(MemoryObjectStore::default()))
    }

    fn feature_node(database: &ObjectDatabase, name: &str, owner: &str) -> Node {
        let feature = FeatureRecord::new(vec![
            Value::from(owner),
            Value::Geometry("POINT (1 2)".to_string()),
        ]);
        let envelope = feature.envelope();
        let feature_id = database.put(feature).unwrap();
        Node::feature(name.to_string(), feature_id, None, envelope)
    }

    #[test]
    fn put_creates_intermediate_trees() {
        let database = database();
        let mut builder = TreeBuilder::empty(&database);
        let node = feature_node(&database, "ignored", "alice");

        builder.put("layer/parcels/42", node.clone()).unwrap();
        let root_id = builder.write().unwrap();

        let found = database.find_node(&root_id, "layer/parcels/42").unwrap().unwrap();
        assert_eq!(found.object_id(), node.object_id());
        assert_eq!(found.name(), "42");

        let layer = database.find_node(&root_id, "layer").unwrap().unwrap();
        assert!(layer.is_tree());
        assert_eq!(
            layer.node().envelope().copied(),
            Some(Envelope::from_point(1.0, 2.0))
        );
    }

    #[test]
    fn untouched_siblings_keep_their_ids() {
        let database = database();
        let mut builder = TreeBuilder::empty(&database);
        builder
            .put("roads/1", feature_node(&database, "1", "alice"))
            .unwrap();
        builder
            .put("rivers/1", feature_node(&database, "1", "bob"))
            .unwrap();
        let first_root = builder.write().unwrap();

        let mut builder = TreeBuilder::new(&database, &first_root).unwrap();
        builder
            .put("roads/2", feature_node(&database, "2", "carol"))
            .unwrap();
        let second_root = builder.write().unwrap();

        let rivers_before = database.find_node(&first_root, "rivers").unwrap().unwrap();
        let rivers_after = database.find_node(&second_root, "rivers").unwrap().unwrap();
        assert_eq!(rivers_before.object_id(), rivers_after.object_id());
        assert!(database.find_node(&second_root, "roads/1").unwrap().is_some());
    }

    #[test]
    fn removing_every_node_restores_the_original_root() {
        let database = database();
        let mut builder = TreeBuilder::empty(&database);
        builder
            .put("roads/1", feature_node(&database, "1", "alice"))
            .unwrap();
        let base = builder.write().unwrap();

        let mut builder = TreeBuilder::new(&database, &base).unwrap();
        builder
            .put("roads/2", feature_node(&database, "2", "bob"))
            .unwrap();
        assert!(builder.remove("roads/2").unwrap());
        assert!(!builder.remove("lakes/9").unwrap());

        assert_eq!(builder.write().unwrap(), base);
    }

    #[test]
    fn putting_a_tree_node_replaces_pending_edits_below_it() {
        let database = database();
        let mut builder = TreeBuilder::empty(&database);
        builder
            .put("roads/1", feature_node(&database, "1", "alice"))
            .unwrap();
        builder
            .put("roads", Node::tree("roads".to_string(), Tree::empty_id(), None))
            .unwrap();
        let root_id = builder.write().unwrap();

        assert!(database.find_node(&root_id, "roads/1").unwrap().is_none());
        assert!(database.find_node(&root_id, "roads").unwrap().is_some());
    }
}
