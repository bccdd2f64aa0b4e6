//! Feature-type schemas
//!
//! ## Format
//!
//! ```text
//! schema <size>\0
//! <type name>
//! <attribute name>\t<field type>
//! ...
//! ```

use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::value::FieldType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct AttributeDescriptor {
    name: String,
    field_type: FieldType,
}

impl AttributeDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct SchemaRecord {
    name: String,
    attributes: Vec<AttributeDescriptor>,
}

impl SchemaRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    pub fn index_of(&self, attribute: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|descriptor| descriptor.name == attribute)
    }
}

impl Packable for SchemaRecord {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut lines = vec![self.name.clone()];
        lines.extend(
            self.attributes
                .iter()
                .map(|descriptor| format!("{}\t{}", descriptor.name, descriptor.field_type)),
        );

        frame(self.object_type(), lines.join("\n").as_bytes())
    }
}

impl Unpackable for SchemaRecord {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut lines = reader.lines();
        let name = lines
            .next()
            .context("Invalid schema object: missing type name")??;

        let attributes = lines
            .map(|line| {
                let line = line?;
                let (name, field_type) = line
                    .split_once('\t')
                    .with_context(|| format!("Invalid schema attribute line: {line}"))?;
                Ok(AttributeDescriptor::new(
                    name.to_string(),
                    FieldType::try_from(field_type)?,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { name, attributes })
    }
}

impl Object for SchemaRecord {
    fn object_type(&self) -> ObjectType {
        ObjectType::Schema
    }
}
