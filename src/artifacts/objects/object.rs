use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::feature::FeatureRecord;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::schema::SchemaRecord;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use anyhow::Result;
use bytes::Bytes;
use std::io::{BufRead, Cursor, Write};

/// Canonical encoding, framed with the `<type> <size>\0` header
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Decoding of the payload that follows the header
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    fn object_id(&self) -> Result<ObjectId> {
        Ok(ObjectId::hash_of(&self.serialize()?))
    }
}

/// Prepend the object header to an encoded payload
pub fn frame(object_type: ObjectType, content: &[u8]) -> Result<Bytes> {
    let mut object_bytes = Vec::with_capacity(content.len() + 16);
    let header = format!("{} {}\0", object_type.as_str(), content.len());
    object_bytes.write_all(header.as_bytes())?;
    object_bytes.write_all(content)?;

    Ok(Bytes::from(object_bytes))
}

/// Any immutable object the repository stores
#[derive(Debug, Clone, PartialEq)]
pub enum RevObject {
    Tree(Tree),
    Feature(FeatureRecord),
    Schema(SchemaRecord),
    Commit(Commit),
    Tag(Tag),
}

impl RevObject {
    /// Decode a framed object, dispatching on its header
    pub fn parse(content: Bytes) -> Result<Self> {
        let mut object_reader = Cursor::new(content);
        let object_type = ObjectType::parse_object_type(&mut object_reader)?;

        let object = match object_type {
            ObjectType::Tree => RevObject::Tree(Tree::deserialize(object_reader)?),
            ObjectType::Feature => RevObject::Feature(FeatureRecord::deserialize(object_reader)?),
            ObjectType::Schema => RevObject::Schema(SchemaRecord::deserialize(object_reader)?),
            ObjectType::Commit => RevObject::Commit(Commit::deserialize(object_reader)?),
            ObjectType::Tag => RevObject::Tag(Tag::deserialize(object_reader)?),
        };

        Ok(object)
    }
}

impl Packable for RevObject {
    fn serialize(&self) -> Result<Bytes> {
        match self {
            RevObject::Tree(tree) => tree.serialize(),
            RevObject::Feature(feature) => feature.serialize(),
            RevObject::Schema(schema) => schema.serialize(),
            RevObject::Commit(commit) => commit.serialize(),
            RevObject::Tag(tag) => tag.serialize(),
        }
    }
}

impl Object for RevObject {
    fn object_type(&self) -> ObjectType {
        match self {
            RevObject::Tree(_) => ObjectType::Tree,
            RevObject::Feature(_) => ObjectType::Feature,
            RevObject::Schema(_) => ObjectType::Schema,
            RevObject::Commit(_) => ObjectType::Commit,
            RevObject::Tag(_) => ObjectType::Tag,
        }
    }
}

impl From<Tree> for RevObject {
    fn from(tree: Tree) -> Self {
        RevObject::Tree(tree)
    }
}

impl From<FeatureRecord> for RevObject {
    fn from(feature: FeatureRecord) -> Self {
        RevObject::Feature(feature)
    }
}

impl From<SchemaRecord> for RevObject {
    fn from(schema: SchemaRecord) -> Self {
        RevObject::Schema(schema)
    }
}

impl From<Commit> for RevObject {
    fn from(commit: Commit) -> Self {
        RevObject::Commit(commit)
    }
}

impl From<Tag> for RevObject {
    fn from(tag: Tag) -> Self {
        RevObject::Tag(tag)
    }
}
