//! Lazy tree differencer
//!
//! Compares two root trees and yields one `DiffEntry` per changed path, depth first, in
//! component-wise path order. Sub-trees with identical ids are never loaded, so unchanged
//! regions of a large hierarchy cost nothing.
//!
//! ## Modes
//!
//! - Default: only feature changes are reported
//! - `report_trees(true)`: a changed tree is reported as well, right before its children
//! - `with_filter(..)`: only paths under the filter prefixes are reported or descended into
//!
//! A `TreeDiff` is a description, not a cursor: every call to `iter()` walks again from the
//! roots and yields the same sequence.

use crate::areas::database::ObjectDatabase;
use crate::artifacts::core::is_under;
use crate::artifacts::diff::diff_entry::{DiffEntry, NodeRef};
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Node;

pub struct TreeDiff<'d> {
    database: &'d ObjectDatabase,
    old_root: ObjectId,
    new_root: ObjectId,
    filter: PathFilter,
    report_trees: bool,
}

impl<'d> TreeDiff<'d> {
    pub fn new(database: &'d ObjectDatabase, old_root: ObjectId, new_root: ObjectId) -> Self {
        TreeDiff {
            database,
            old_root,
            new_root,
            filter: PathFilter::all(),
            report_trees: false,
        }
    }

    pub fn with_filter(self, filter: PathFilter) -> Self {
        Self { filter, ..self }
    }

    pub fn report_trees(self, report_trees: bool) -> Self {
        Self {
            report_trees,
            ..self
        }
    }

    pub fn iter(&self) -> TreeDiffIter<'d> {
        TreeDiffIter {
            database: self.database,
            filter: self.filter.clone(),
            report_trees: self.report_trees,
            roots: Some((self.old_root.clone(), self.new_root.clone())),
            stack: Vec::new(),
        }
    }
}

impl<'d> IntoIterator for TreeDiff<'d> {
    type Item = anyhow::Result<DiffEntry>;
    type IntoIter = TreeDiffIter<'d>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pair of sibling node lists being merged by name
struct Frame {
    parent_path: String,
    old_nodes: Vec<Node>,
    new_nodes: Vec<Node>,
    old_metadata: Option<ObjectId>,
    new_metadata: Option<ObjectId>,
    old_index: usize,
    new_index: usize,
}

impl Frame {
    fn new(
        parent_path: String,
        old_nodes: Vec<Node>,
        new_nodes: Vec<Node>,
        old_metadata: Option<ObjectId>,
        new_metadata: Option<ObjectId>,
    ) -> Self {
        Frame {
            parent_path,
            old_nodes,
            new_nodes,
            old_metadata,
            new_metadata,
            old_index: 0,
            new_index: 0,
        }
    }

    /// Next sibling pair in name order, advancing the cursors
    fn advance(&mut self) -> Option<(Option<Node>, Option<Node>)> {
        let old = self.old_nodes.get(self.old_index);
        let new = self.new_nodes.get(self.new_index);

        let step = match (old, new) {
            (None, None) => return None,
            (Some(old), None) => (Some(old.clone()), None),
            (None, Some(new)) => (None, Some(new.clone())),
            (Some(old), Some(new)) => match old.name().cmp(new.name()) {
                std::cmp::Ordering::Less => (Some(old.clone()), None),
                std::cmp::Ordering::Greater => (None, Some(new.clone())),
                std::cmp::Ordering::Equal => (Some(old.clone()), Some(new.clone())),
            },
        };

        if step.0.is_some() {
            self.old_index += 1;
        }
        if step.1.is_some() {
            self.new_index += 1;
        }
        Some(step)
    }
}

pub struct TreeDiffIter<'d> {
    database: &'d ObjectDatabase,
    filter: PathFilter,
    report_trees: bool,
    roots: Option<(ObjectId, ObjectId)>,
    stack: Vec<Frame>,
}

impl TreeDiffIter<'_> {
    fn start(&mut self, old_root: ObjectId, new_root: ObjectId) -> anyhow::Result<()> {
        if old_root == new_root {
            return Ok(());
        }

        let old_nodes = self.database.tree(&old_root)?.into_nodes();
        let new_nodes = self.database.tree(&new_root)?.into_nodes();
        self.stack
            .push(Frame::new(String::new(), old_nodes, new_nodes, None, None));

        Ok(())
    }

    fn subtree_nodes(&self, node: Option<&Node>) -> anyhow::Result<Vec<Node>> {
        match node {
            Some(node) if node.is_tree() => Ok(self.database.tree(node.object_id())?.into_nodes()),
            _ => Ok(Vec::new()),
        }
    }

    /// Turn one sibling pair into at most one entry, queueing sub-trees to descend into
    fn visit(
        &mut self,
        parent_path: String,
        inherited: (Option<ObjectId>, Option<ObjectId>),
        old: Option<Node>,
        new: Option<Node>,
    ) -> anyhow::Result<Option<DiffEntry>> {
        if let (Some(old_node), Some(new_node)) = (&old, &new) {
            if old_node.object_id() == new_node.object_id()
                && old_node.metadata_id() == new_node.metadata_id()
                && old_node.kind() == new_node.kind()
            {
                return Ok(None);
            }

            if old_node.kind() != new_node.kind() {
                // reported as a removal followed by an addition at the same path
                let (old_metadata, new_metadata) = inherited;
                self.stack.push(Frame::new(
                    parent_path.clone(),
                    Vec::new(),
                    vec![new_node.clone()],
                    old_metadata.clone(),
                    new_metadata.clone(),
                ));
                self.stack.push(Frame::new(
                    parent_path,
                    vec![old_node.clone()],
                    Vec::new(),
                    old_metadata,
                    new_metadata,
                ));
                return Ok(None);
            }
        }

        let (old_inherited, new_inherited) = inherited;
        let old_ref = old.map(|node| {
            let metadata = node.metadata_id().cloned().or(old_inherited);
            NodeRef::new(parent_path.clone(), node, metadata)
        });
        let new_ref = new.map(|node| {
            let metadata = node.metadata_id().cloned().or(new_inherited);
            NodeRef::new(parent_path.clone(), node, metadata)
        });

        let entry = DiffEntry::new(old_ref, new_ref);
        let path = entry.path();

        if entry.is_tree() {
            let same_contents = entry.old_object_id() == entry.new_object_id();
            if !same_contents && self.filter.may_contain(&path) {
                let old_nodes = self.subtree_nodes(entry.old_ref().map(NodeRef::node))?;
                let new_nodes = self.subtree_nodes(entry.new_ref().map(NodeRef::node))?;
                self.stack.push(Frame::new(
                    path.clone(),
                    old_nodes,
                    new_nodes,
                    entry.old_ref().and_then(|node| node.metadata_id().cloned()),
                    entry.new_ref().and_then(|node| node.metadata_id().cloned()),
                ));
            }

            if self.report_trees && self.filter.matches(&path) {
                return Ok(Some(entry));
            }
            return Ok(None);
        }

        if self.filter.matches(&path) {
            Ok(Some(entry))
        } else {
            Ok(None)
        }
    }
}

impl Iterator for TreeDiffIter<'_> {
    type Item = anyhow::Result<DiffEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((old_root, new_root)) = self.roots.take()
            && let Err(error) = self.start(old_root, new_root)
        {
            self.stack.clear();
            return Some(Err(error));
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some((old, new)) = frame.advance() else {
                self.stack.pop();
                continue;
            };
            let parent_path = frame.parent_path.clone();
            let inherited = (frame.old_metadata.clone(), frame.new_metadata.clone());

            match self.visit(parent_path, inherited, old, new) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(error) => {
                    self.stack.clear();
                    return Some(Err(error));
                }
            }
        }
    }
}

/// Pull cursor over a diff with one entry of lookahead
pub struct DiffCursor<'d> {
    entries: TreeDiffIter<'d>,
    head: Option<DiffEntry>,
}

impl<'d> DiffCursor<'d> {
    pub fn new(entries: TreeDiffIter<'d>) -> Self {
        DiffCursor {
            entries,
            head: None,
        }
    }

    pub fn peek(&mut self) -> anyhow::Result<Option<&DiffEntry>> {
        if self.head.is_none() {
            self.head = self.entries.next().transpose()?;
        }
        Ok(self.head.as_ref())
    }

    pub fn pop(&mut self) -> anyhow::Result<Option<DiffEntry>> {
        self.peek()?;
        Ok(self.head.take())
    }

    /// Drop the entries strictly below `path`
    pub fn skip_under(&mut self, path: &str) -> anyhow::Result<()> {
        while let Some(entry) = self.peek()? {
            let entry_path = entry.path();
            if entry_path == path || !is_under(&entry_path, path) {
                break;
            }
            self.head = None;
        }
        Ok(())
    }
}
