//! Attribute values and declared attribute types
//!
//! Values are encoded as a one-byte tag followed by a big-endian payload. Doubles compare by bit
//! pattern so that a value always equals itself, which keeps feature equality consistent with
//! content hashing.

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Boolean,
    Integer,
    Double,
    String,
    Geometry,
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Geometry => "geometry",
        }
    }
}

impl TryFrom<&str> for FieldType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "boolean" => Ok(FieldType::Boolean),
            "integer" => Ok(FieldType::Integer),
            "double" => Ok(FieldType::Double),
            "string" => Ok(FieldType::String),
            "geometry" => Ok(FieldType::Geometry),
            _ => anyhow::bail!("Invalid field type: {value}"),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single attribute value; geometries are carried as WKT text
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Geometry(String),
}

const NULL_TAG: u8 = 0;
const BOOLEAN_TAG: u8 = 1;
const INTEGER_TAG: u8 = 2;
const DOUBLE_TAG: u8 = 3;
const STRING_TAG: u8 = 4;
const GEOMETRY_TAG: u8 = 5;

impl Value {
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(FieldType::Boolean),
            Value::Integer(_) => Some(FieldType::Integer),
            Value::Double(_) => Some(FieldType::Double),
            Value::String(_) => Some(FieldType::String),
            Value::Geometry(_) => Some(FieldType::Geometry),
        }
    }

    /// Coordinate pairs found in a geometry's WKT text
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        let Value::Geometry(wkt) = self else {
            return Vec::new();
        };

        let ordinates = wkt
            .split(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == 'e' || c == 'E'))
            .filter_map(|token| token.parse::<f64>().ok())
            .collect::<Vec<_>>();

        ordinates
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        match self {
            Value::Null => writer.write_u8(NULL_TAG)?,
            Value::Boolean(value) => {
                writer.write_u8(BOOLEAN_TAG)?;
                writer.write_u8(u8::from(*value))?;
            }
            Value::Integer(value) => {
                writer.write_u8(INTEGER_TAG)?;
                writer.write_i64::<NetworkEndian>(*value)?;
            }
            Value::Double(value) => {
                writer.write_u8(DOUBLE_TAG)?;
                writer.write_f64::<NetworkEndian>(*value)?;
            }
            Value::String(value) => {
                writer.write_u8(STRING_TAG)?;
                Self::write_text(writer, value)?;
            }
            Value::Geometry(value) => {
                writer.write_u8(GEOMETRY_TAG)?;
                Self::write_text(writer, value)?;
            }
        }

        Ok(())
    }

    pub fn read_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let value = match reader.read_u8()? {
            NULL_TAG => Value::Null,
            BOOLEAN_TAG => Value::Boolean(reader.read_u8()? != 0),
            INTEGER_TAG => Value::Integer(reader.read_i64::<NetworkEndian>()?),
            DOUBLE_TAG => Value::Double(reader.read_f64::<NetworkEndian>()?),
            STRING_TAG => Value::String(Self::read_text(reader)?),
            GEOMETRY_TAG => Value::Geometry(Self::read_text(reader)?),
            tag => anyhow::bail!("Invalid value tag: {tag}"),
        };

        Ok(value)
    }

    fn write_text<W: io::Write>(writer: &mut W, text: &str) -> anyhow::Result<()> {
        writer.write_u32::<NetworkEndian>(u32::try_from(text.len())?)?;
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn read_text<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<String> {
        let length = reader.read_u32::<NetworkEndian>()? as usize;
        let mut text = Vec::with_capacity(length);
        reader.take(length as u64).read_to_end(&mut text)?;
        if text.len() != length {
            anyhow::bail!("Truncated text value");
        }

        Ok(String::from_utf8(text)?)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Geometry(a), Value::Geometry(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Null)]
    #[case(Value::Boolean(true))]
    #[case(Value::Integer(-42))]
    #[case(Value::Double(3.25))]
    #[case(Value::String("owner".to_string()))]
    #[case(Value::Geometry("POINT (1 2)".to_string()))]
    fn values_decode_to_what_was_encoded(#[case] value: Value) {
        let mut buffer = Vec::new();
        value.write_to(&mut buffer).unwrap();

        assert_eq!(Value::read_from(&mut buffer.as_slice()).unwrap(), value);
    }

    #[test]
    fn nan_doubles_equal_themselves() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    }

    #[test]
    fn geometry_coordinates_are_paired() {
        let polygon = Value::Geometry("POLYGON ((0 0, 10 0, 10 -5.5, 0 0))".to_string());

        assert_eq!(
            polygon.coordinates(),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, -5.5), (0.0, 0.0)]
        );
        assert!(Value::from("x").coordinates().is_empty());
    }
}
