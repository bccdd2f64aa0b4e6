use crate::artifacts::core::child_path;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Node;
use derive_new::new;

/// A node located in a tree, with the schema it resolves to
#[derive(Debug, Clone, PartialEq, new)]
pub struct NodeRef {
    parent_path: String,
    node: Node,
    /// Node's own schema id, or the default inherited from the enclosing tree
    metadata_id: Option<ObjectId>,
}

impl NodeRef {
    pub fn path(&self) -> String {
        child_path(&self.parent_path, self.node.name())
    }

    pub fn parent_path(&self) -> &str {
        &self.parent_path
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn object_id(&self) -> &ObjectId {
        self.node.object_id()
    }

    pub fn metadata_id(&self) -> Option<&ObjectId> {
        self.metadata_id.as_ref()
    }

    pub fn is_tree(&self) -> bool {
        self.node.is_tree()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    pub fn status_char(&self) -> char {
        match self {
            ChangeType::Added => 'A',
            ChangeType::Modified => 'M',
            ChangeType::Removed => 'D',
        }
    }
}

/// One changed path between two trees; `None` on a side means absent there
#[derive(Debug, Clone, PartialEq, new)]
pub struct DiffEntry {
    old: Option<NodeRef>,
    new: Option<NodeRef>,
}

impl DiffEntry {
    pub fn change_type(&self) -> ChangeType {
        match (&self.old, &self.new) {
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Removed,
            _ => ChangeType::Modified,
        }
    }

    pub fn path(&self) -> String {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(NodeRef::path)
            .unwrap_or_default()
    }

    pub fn old_ref(&self) -> Option<&NodeRef> {
        self.old.as_ref()
    }

    pub fn new_ref(&self) -> Option<&NodeRef> {
        self.new.as_ref()
    }

    pub fn old_object_id(&self) -> ObjectId {
        self.old
            .as_ref()
            .map(|node| node.object_id().clone())
            .unwrap_or_else(ObjectId::null)
    }

    pub fn new_object_id(&self) -> ObjectId {
        self.new
            .as_ref()
            .map(|node| node.object_id().clone())
            .unwrap_or_else(ObjectId::null)
    }

    /// Whether the entry is about a tree rather than a feature
    pub fn is_tree(&self) -> bool {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .is_some_and(NodeRef::is_tree)
    }

    /// The same change applied backwards
    pub fn reversed(&self) -> Self {
        Self {
            old: self.new.clone(),
            new: self.old.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_ref(name: &str, seed: &str) -> NodeRef {
        NodeRef::new(
            "layer".to_string(),
            Node::feature(name.to_string(), ObjectId::hash_of(seed.as_bytes()), None, None),
            None,
        )
    }

    #[test]
    fn change_type_follows_present_sides() {
        let added = DiffEntry::new(None, Some(node_ref("1", "a")));
        let modified = DiffEntry::new(Some(node_ref("1", "a")), Some(node_ref("1", "b")));

        assert_eq!(added.change_type(), ChangeType::Added);
        assert_eq!(added.reversed().change_type(), ChangeType::Removed);
        assert_eq!(modified.change_type(), ChangeType::Modified);
        assert_eq!(added.path(), "layer/1");
        assert!(added.old_object_id().is_null());
    }
}
