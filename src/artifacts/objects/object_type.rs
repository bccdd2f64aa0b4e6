use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Tree,
    Feature,
    Schema,
    Commit,
    Tag,
}

const OBJECT_TYPES: phf::Map<&'static str, ObjectType> = phf::phf_map! {
    "tree" => ObjectType::Tree,
    "feature" => ObjectType::Feature,
    "schema" => ObjectType::Schema,
    "commit" => ObjectType::Commit,
    "tag" => ObjectType::Tag,
};

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Tree => "tree",
            ObjectType::Feature => "feature",
            ObjectType::Schema => "schema",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Consume the `<type> <size>\0` header and return the type
    pub fn parse_object_type(data_reader: &mut impl BufRead) -> anyhow::Result<ObjectType> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;

        let object_type = String::from_utf8(object_type)?;
        let object_type = object_type.trim();

        // skip the size part
        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;

        ObjectType::try_from(object_type)
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        OBJECT_TYPES
            .get(value)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Invalid object type: {value}"))
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
