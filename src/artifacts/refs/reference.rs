use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::{HEADS_PREFIX, REFS_PREFIX, REMOTES_PREFIX, TAGS_PREFIX};
use derive_new::new;

const SYMREF_PREFIX: &str = "ref: ";

/// What a ref points to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefTarget {
    Direct(ObjectId),
    /// Name of another ref
    Symbolic(String),
}

impl RefTarget {
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            RefTarget::Direct(object_id) => Some(object_id),
            RefTarget::Symbolic(_) => None,
        }
    }

    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            RefTarget::Direct(_) => None,
            RefTarget::Symbolic(name) => Some(name),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, RefTarget::Symbolic(_))
    }

    /// Stored form: the hex id, or `ref: <name>` for symbolic refs
    pub fn to_line(&self) -> String {
        match self {
            RefTarget::Direct(object_id) => object_id.to_string(),
            RefTarget::Symbolic(name) => format!("{SYMREF_PREFIX}{name}"),
        }
    }

    pub fn try_parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        match line.strip_prefix(SYMREF_PREFIX) {
            Some(name) => Ok(RefTarget::Symbolic(name.trim().to_string())),
            None => Ok(RefTarget::Direct(ObjectId::try_parse(line.to_string())?)),
        }
    }
}

impl From<ObjectId> for RefTarget {
    fn from(object_id: ObjectId) -> Self {
        RefTarget::Direct(object_id)
    }
}

/// A named ref with its target
#[derive(Debug, Clone, PartialEq, Eq, Hash, new)]
pub struct Ref {
    name: String,
    target: RefTarget,
}

impl Ref {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }

    pub fn object_id(&self) -> Option<&ObjectId> {
        self.target.object_id()
    }

    pub fn is_branch(&self) -> bool {
        self.name.starts_with(HEADS_PREFIX)
    }

    pub fn is_remote(&self) -> bool {
        self.name.starts_with(REMOTES_PREFIX)
    }

    /// Name without its namespace prefix, e.g. `master` for `refs/heads/master`
    pub fn short_name(&self) -> &str {
        [HEADS_PREFIX, TAGS_PREFIX, REMOTES_PREFIX, REFS_PREFIX]
            .iter()
            .find_map(|prefix| self.name.strip_prefix(prefix))
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn targets_parse_from_their_stored_form() {
        let direct = RefTarget::Direct(ObjectId::hash_of(b"commit"));
        let symbolic = RefTarget::Symbolic("refs/heads/master".to_string());

        assert_eq!(RefTarget::try_parse(&direct.to_line()).unwrap(), direct);
        assert_eq!(RefTarget::try_parse("ref: refs/heads/master\n").unwrap(), symbolic);
        assert!(RefTarget::try_parse("not a ref").is_err());
    }

    #[test]
    fn short_names_strip_the_namespace() {
        let target = RefTarget::Direct(ObjectId::null());

        assert_eq!(Ref::new("refs/heads/roads".to_string(), target.clone()).short_name(), "roads");
        assert_eq!(
            Ref::new("refs/remotes/origin/roads".to_string(), target.clone()).short_name(),
            "origin/roads"
        );
        assert_eq!(Ref::new("HEAD".to_string(), target).short_name(), "HEAD");
    }
}
