use crate::artifacts::objects::commit::Person;
use crate::artifacts::objects::object::{Object, Packable, Unpackable, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use derive_new::new;
use std::io::BufRead;

/// Annotated tag pointing at a commit
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Tag {
    name: String,
    commit_id: ObjectId,
    tagger: Person,
    message: String,
}

impl Tag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commit_id(&self) -> &ObjectId {
        &self.commit_id
    }

    pub fn tagger(&self) -> &Person {
        &self.tagger
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packable for Tag {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let content = [
            format!("object {}", self.commit_id),
            format!("tag {}", self.name),
            format!("tagger {}", self.tagger.display()),
            String::new(),
            self.message.clone(),
        ]
        .join("\n");

        frame(self.object_type(), content.as_bytes())
    }
}

impl Unpackable for Tag {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let content = reader
            .bytes()
            .collect::<Result<Vec<u8>, std::io::Error>>()?;
        let content = String::from_utf8(content)?;
        let (header, message) = content
            .split_once("\n\n")
            .context("Invalid tag object: missing message separator")?;
        let mut lines = header.lines();

        let commit_id = lines
            .next()
            .and_then(|line| line.strip_prefix("object "))
            .context("Invalid tag object: invalid object line")?;
        let name = lines
            .next()
            .and_then(|line| line.strip_prefix("tag "))
            .context("Invalid tag object: invalid tag line")?;
        let tagger = lines
            .next()
            .and_then(|line| line.strip_prefix("tagger "))
            .context("Invalid tag object: invalid tagger line")?;

        Ok(Self::new(
            name.to_string(),
            ObjectId::try_parse(commit_id.to_string())?,
            Person::try_from(tagger)?,
            message.to_string(),
        ))
    }
}

impl Object for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object::RevObject;

    #[test]
    fn tag_decodes_through_rev_object() {
        let tagger = Person::try_from("Bob <bob@example.com> 1700000000 +0000").unwrap();
        let tag = Tag::new(
            "v1.0".to_string(),
            ObjectId::hash_of(b"release"),
            tagger,
            "first survey".to_string(),
        );

        let decoded = RevObject::parse(tag.serialize().unwrap()).unwrap();

        assert_eq!(decoded, RevObject::Tag(tag));
    }
}
