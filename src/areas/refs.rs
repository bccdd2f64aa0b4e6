//! References (branches, HEAD, tags, operation markers)
//!
//! References are mutable names bound either directly to an object id or symbolically to
//! another reference, e.g. HEAD -> refs/heads/master.
//!
//! ## Compare-and-set
//!
//! Backends never overwrite blindly: every write states the value it expects to replace and
//! fails (returns `false`) when the stored value differs. `Refs` layers name resolution on
//! top of a `RefStore`: symbolic chains, short names and branch listing.

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::reference::{Ref, RefTarget};
use crate::artifacts::refs::{HEAD, HEADS_PREFIX, MAX_SYMREF_DEPTH, SHORT_NAME_PREFIXES};
use crate::artifacts::objects::OBJECT_ID_LENGTH;

/// Storage backend for references
pub trait RefStore {
    fn get(&self, name: &str) -> anyhow::Result<Option<RefTarget>>;

    /// Bind `name` to `new` if it currently holds `expected` (`None`: must not exist)
    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&RefTarget>,
        new: &RefTarget,
    ) -> anyhow::Result<bool>;

    /// Delete `name` if it currently holds `expected` (`None`: whatever it holds)
    fn delete(&self, name: &str, expected: Option<&RefTarget>) -> anyhow::Result<bool>;

    /// Every ref whose name starts with `prefix`, sorted by name
    fn list(&self, prefix: &str) -> anyhow::Result<Vec<Ref>>;
}

pub struct Refs {
    store: Box<dyn RefStore>,
}

impl Refs {
    pub fn new(store: Box<dyn RefStore>) -> Self {
        Refs { store }
    }

    pub fn store(&self) -> &dyn RefStore {
        self.store.as_ref()
    }

    /// Raw value of a ref, without following symbolic targets
    pub fn get(&self, name: &str) -> anyhow::Result<Option<RefTarget>> {
        self.store.get(name)
    }

    pub fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&RefTarget>,
        new: &RefTarget,
    ) -> anyhow::Result<bool> {
        self.store.compare_and_set(name, expected, new)
    }

    /// Overwrite a ref with whatever value it holds right now
    pub fn force_set(&self, name: &str, new: &RefTarget) -> anyhow::Result<()> {
        let current = self.store.get(name)?;
        if !self.store.compare_and_set(name, current.as_ref(), new)? {
            anyhow::bail!("ref {name} changed while it was being updated");
        }
        Ok(())
    }

    pub fn delete(&self, name: &str, expected: Option<&RefTarget>) -> anyhow::Result<bool> {
        self.store.delete(name, expected)
    }

    /// Follow a symbolic chain from `name` to the ref holding an id
    ///
    /// Returns `None` when the chain ends at a ref that does not exist, which is how an
    /// unborn branch looks from HEAD.
    pub fn resolve(&self, name: &str) -> anyhow::Result<Option<Ref>> {
        let mut current = name.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match self.store.get(&current)? {
                Some(RefTarget::Symbolic(target)) => current = target,
                Some(target) => return Ok(Some(Ref::new(current, target))),
                None => return Ok(None),
            }
        }

        anyhow::bail!("symbolic ref chain from {name} is too deep")
    }

    /// Final ref name reached from `name`, whether or not it exists yet
    pub fn resolve_name(&self, name: &str) -> anyhow::Result<String> {
        let mut current = name.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match self.store.get(&current)? {
                Some(RefTarget::Symbolic(target)) => current = target,
                _ => return Ok(current),
            }
        }

        anyhow::bail!("symbolic ref chain from {name} is too deep")
    }

    /// Object id `name` resolves to; `None` for missing refs and unborn branches
    pub fn read_id(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        Ok(self
            .resolve(name)?
            .and_then(|reference| reference.object_id().cloned())
            .filter(|object_id| !object_id.is_null()))
    }

    /// Look a short name up in the usual namespaces
    ///
    /// Tries the name as given, then under `refs/`, `refs/heads/`, `refs/tags/` and
    /// `refs/remotes/`.
    pub fn find(&self, short_name: &str) -> anyhow::Result<Option<Ref>> {
        for prefix in SHORT_NAME_PREFIXES {
            let name = format!("{prefix}{short_name}");
            if self.store.get(&name)?.is_some() {
                return Ok(self.resolve(&name)?.map(|resolved| Ref::new(name, resolved.target().clone())));
            }
        }

        Ok(None)
    }

    /// Branch HEAD is attached to, as a full ref name; `None` when detached
    pub fn current_branch(&self) -> anyhow::Result<Option<String>> {
        let mut current = HEAD.to_string();

        for _ in 0..MAX_SYMREF_DEPTH {
            match self.store.get(&current)? {
                Some(RefTarget::Symbolic(target)) => current = target,
                _ if current.starts_with(HEADS_PREFIX) => return Ok(Some(current)),
                _ => return Ok(None),
            }
        }

        anyhow::bail!("HEAD symbolic chain is too deep")
    }

    pub fn head_id(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_id(HEAD)
    }

    pub fn list(&self, prefix: &str) -> anyhow::Result<Vec<Ref>> {
        self.store.list(prefix)
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<Ref>> {
        self.store.list(HEADS_PREFIX)
    }

    /// Whether `name` looks like a full object id rather than a ref name
    pub fn looks_like_object_id(name: &str) -> bool {
        name.len() == OBJECT_ID_LENGTH && name.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryRefStore;
    use pretty_assertions::assert_eq;

    fn refs() -> Refs {
        Refs::new(Box::new(MemoryRefStore::default()))
    }

    #[test]
    fn head_follows_the_current_branch() {
        let refs = refs();
        let commit_id = ObjectId::hash_of(b"commit");
        refs.force_set(HEAD, &RefTarget::Symbolic("refs/heads/master".to_string()))
            .unwrap();

        assert_eq!(refs.head_id().unwrap(), None);
        assert_eq!(refs.current_branch().unwrap(), Some("refs/heads/master".to_string()));
        assert_eq!(refs.resolve_name(HEAD).unwrap(), "refs/heads/master");

        refs.force_set("refs/heads/master", &RefTarget::Direct(commit_id.clone()))
            .unwrap();

        assert_eq!(refs.head_id().unwrap(), Some(commit_id));
    }

    #[test]
    fn detached_head_has_no_branch() {
        let refs = refs();
        refs.force_set(HEAD, &RefTarget::Direct(ObjectId::hash_of(b"commit")))
            .unwrap();

        assert_eq!(refs.current_branch().unwrap(), None);
    }

    #[test]
    fn short_names_resolve_in_namespace_order() {
        let refs = refs();
        let branch = ObjectId::hash_of(b"branch");
        let tag = ObjectId::hash_of(b"tag");
        refs.force_set("refs/heads/v1", &RefTarget::Direct(branch.clone()))
            .unwrap();
        refs.force_set("refs/tags/v1", &RefTarget::Direct(tag.clone()))
            .unwrap();
        refs.force_set("refs/remotes/origin/roads", &RefTarget::Direct(tag.clone()))
            .unwrap();

        let found = refs.find("v1").unwrap().unwrap();
        assert_eq!(found.name(), "refs/heads/v1");
        assert_eq!(found.object_id(), Some(&branch));
        assert_eq!(
            refs.find("origin/roads").unwrap().unwrap().name(),
            "refs/remotes/origin/roads"
        );
        assert_eq!(refs.find("missing").unwrap(), None);
    }

    #[test]
    fn symbolic_cycles_are_reported() {
        let refs = refs();
        refs.force_set("A", &RefTarget::Symbolic("B".to_string())).unwrap();
        refs.force_set("B", &RefTarget::Symbolic("A".to_string())).unwrap();

        assert!(refs.resolve("A").is_err());
    }
}
