//! Tree objects
//!
//! Trees are sorted sets of named nodes. A node points either at a sub-tree or at a feature
//! record and may carry the id of a schema: on a tree node it is the default schema of the
//! features below it, on a feature node it overrides that default.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<nodes>`
//! Each node: `<kind> <name>\0<20-byte-id><flags>[<20-byte-metadata-id>][<envelope>]`
//!
//! `kind` is `t` or `f`; `flags` bit 0 marks a metadata id, bit 1 an envelope.

use crate::artifacts::objects::envelope::Envelope;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};

const HAS_METADATA: u8 = 0b01;
const HAS_ENVELOPE: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Tree,
    Feature,
}

impl NodeKind {
    fn as_byte(&self) -> u8 {
        match self {
            NodeKind::Tree => b't',
            NodeKind::Feature => b'f',
        }
    }

    fn from_byte(byte: u8) -> anyhow::Result<Self> {
        match byte {
            b't' => Ok(NodeKind::Tree),
            b'f' => Ok(NodeKind::Feature),
            _ => anyhow::bail!("Invalid tree node kind: {}", byte as char),
        }
    }
}

/// A named entry of a tree
#[derive(Debug, Clone, PartialEq, new)]
pub struct Node {
    name: String,
    object_id: ObjectId,
    metadata_id: Option<ObjectId>,
    kind: NodeKind,
    envelope: Option<Envelope>,
}

impl Node {
    pub fn tree(name: String, object_id: ObjectId, metadata_id: Option<ObjectId>) -> Self {
        Self::new(name, object_id, metadata_id, NodeKind::Tree, None)
    }

    pub fn feature(
        name: String,
        object_id: ObjectId,
        metadata_id: Option<ObjectId>,
        envelope: Option<Envelope>,
    ) -> Self {
        Self::new(name, object_id, metadata_id, NodeKind::Feature, envelope)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_id(&self) -> &ObjectId {
        &self.object_id
    }

    pub fn metadata_id(&self) -> Option<&ObjectId> {
        self.metadata_id.as_ref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_tree(&self) -> bool {
        self.kind == NodeKind::Tree
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    pub fn renamed(&self, name: String) -> Self {
        Self { name, ..self.clone() }
    }

    pub fn with_object_id(&self, object_id: ObjectId, envelope: Option<Envelope>) -> Self {
        Self {
            object_id,
            envelope,
            ..self.clone()
        }
    }

    pub fn with_metadata_id(&self, metadata_id: Option<ObjectId>) -> Self {
        Self {
            metadata_id,
            ..self.clone()
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        writer.write_all(&[self.kind.as_byte(), b' '])?;
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(&[0])?;
        self.object_id.write_h40_to(writer)?;

        let mut flags = 0;
        if self.metadata_id.is_some() {
            flags |= HAS_METADATA;
        }
        if self.envelope.is_some() {
            flags |= HAS_ENVELOPE;
        }
        writer.write_all(&[flags])?;

        if let Some(metadata_id) = &self.metadata_id {
            metadata_id.write_h40_to(writer)?;
        }
        if let Some(envelope) = &self.envelope {
            envelope.write_to(writer)?;
        }

        Ok(())
    }

    fn read_from(reader: &mut impl BufRead) -> anyhow::Result<Option<Self>> {
        let mut header = Vec::new();
        if reader.read_until(b' ', &mut header)? == 0 {
            return Ok(None);
        }
        let kind = NodeKind::from_byte(*header.first().context("Invalid tree node header")?)?;

        let mut name = Vec::new();
        reader.read_until(b'\0', &mut name)?;
        name.pop();
        let name = String::from_utf8(name)?;

        let object_id = ObjectId::read_h40_from(reader)?;

        let mut flags = [0; 1];
        reader.read_exact(&mut flags)?;
        let metadata_id = if flags[0] & HAS_METADATA != 0 {
            Some(ObjectId::read_h40_from(reader)?)
        } else {
            None
        };
        let envelope = if flags[0] & HAS_ENVELOPE != 0 {
            Some(Envelope::read_from(reader)?)
        } else {
            None
        };

        Ok(Some(Self::new(name, object_id, metadata_id, kind, envelope)))
    }
}

/// Sorted, name-unique set of nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree; nodes are sorted by name and later duplicates win
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|node| (node.name.clone(), node))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        Self { nodes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Id of the tree without nodes
    pub fn empty_id() -> ObjectId {
        ObjectId::hash_of(b"tree 0\0")
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes
            .binary_search_by(|node| node.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.nodes[index])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Union of the envelopes of every node
    pub fn envelope(&self) -> Option<Envelope> {
        self.nodes
            .iter()
            .filter_map(Node::envelope)
            .copied()
            .reduce(|acc, envelope| acc.expand(&envelope))
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();
        for node in &self.nodes {
            node.write_to(&mut content)?;
        }

        frame(self.object_type(), &content)
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut nodes = Vec::new();
        while let Some(node) = Node::read_from(&mut reader)? {
            nodes.push(node);
        }

        Ok(Self { nodes })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }
}
