//! Feature records
//!
//! A feature is an ordered list of attribute values laid out according to a schema that is
//! referenced from the tree node pointing at it, never from the feature itself. Two features
//! with the same values therefore share an id even under different schemas.
//!
//! ## Format
//!
//! ```text
//! feature <size>\0
//! <u32 attribute count><tagged value>*
//! ```

use crate::artifacts::objects::envelope::Envelope;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::value::Value;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct FeatureRecord {
    values: Vec<Value>,
}

impl FeatureRecord {
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of this feature with one attribute replaced
    pub fn with_value(&self, index: usize, value: Value) -> Self {
        let mut values = self.values.clone();
        if let Some(slot) = values.get_mut(index) {
            *slot = value;
        }
        Self { values }
    }

    /// Bounding box of every geometry attribute
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_coordinates(self.values.iter().flat_map(Value::coordinates))
    }
}

impl Packable for FeatureRecord {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();
        content.write_u32::<NetworkEndian>(u32::try_from(self.values.len())?)?;
        for value in &self.values {
            value.write_to(&mut content)?;
        }

        frame(self.object_type(), &content)
    }
}

impl Unpackable for FeatureRecord {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let count = reader.read_u32::<NetworkEndian>()?;
        let values = (0..count)
            .map(|_| Value::read_from(&mut reader))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { values })
    }
}

impl Object for FeatureRecord {
    fn object_type(&self) -> ObjectType {
        ObjectType::Feature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object::RevObject;
    use pretty_assertions::assert_eq;

    fn parcel() -> FeatureRecord {
        FeatureRecord::new(vec![
            Value::from("alice"),
            Value::Integer(42),
            Value::Geometry("POINT (3 4)".to_string()),
        ])
    }

    #[test]
    fn feature_decodes_through_rev_object() {
        let feature = parcel();

        let decoded = RevObject::parse(feature.serialize().unwrap()).unwrap();

        assert_eq!(decoded, RevObject::Feature(feature));
    }

    #[test]
    fn changing_a_value_changes_the_id() {
        let feature = parcel();
        let renamed = feature.with_value(0, Value::from("bob"));

        assert_ne!(feature.object_id().unwrap(), renamed.object_id().unwrap());
        assert_eq!(renamed.value(1), Some(&Value::Integer(42)));
    }

    #[test]
    fn envelope_comes_from_geometry_attributes() {
        assert_eq!(parcel().envelope(), Some(Envelope::from_point(3.0, 4.0)));
        assert_eq!(FeatureRecord::new(vec![Value::Null]).envelope(), None);
    }
}
