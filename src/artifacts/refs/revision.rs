use crate::areas::refs::Refs;
use crate::areas::repository::Repository;
use crate::artifacts::objects::object::RevObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::branch_name::BranchName;
use crate::artifacts::refs::{ANCESTOR_REGEX, PARENT_REGEX, REF_ALIASES};
use anyhow::Context;

/// Revision expression identifying a commit
///
/// Supports multiple formats:
/// - Ref names, short or full: `master`, `refs/heads/roads`, `v1.0`, `origin/master`, `HEAD`
/// - Aliases: `@` (resolves to `HEAD`)
/// - Full object ids: 40 hexadecimal characters, tried when no ref has that name
/// - Parent notation: `<revision>^` (e.g., `master^`, `HEAD^`)
/// - Ancestor notation: `<revision>~<n>` (e.g., `master~3`)
///
/// Tags are peeled to the commit they point at.
#[derive(Debug, Clone)]
pub enum Revision {
    /// A ref name, or potentially an object id (decided during resolution)
    Ref(BranchName),
    /// The Nth first-parent ancestor of a revision (e.g., HEAD~3)
    Ancestor(Box<Revision>, usize),
    /// The first parent of a revision (e.g., HEAD^)
    Parent(Box<Revision>),
}

impl Revision {
    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        match self {
            Revision::Ref(name) => Self::resolve_name(name.as_ref(), repository),
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_name(name: &str, repository: &Repository) -> anyhow::Result<Option<ObjectId>> {
        if let Some(reference) = repository.refs().find(name)? {
            return match reference.object_id() {
                Some(oid) if !oid.is_null() => Self::peel(oid.clone(), repository).map(Some),
                _ => Ok(None),
            };
        }

        if !Refs::looks_like_object_id(name) {
            return Ok(None);
        }

        let oid = ObjectId::try_parse(name.to_string())?;
        match repository.database().find(&oid)? {
            Some(RevObject::Commit(_)) => Ok(Some(oid)),
            Some(RevObject::Tag(tag)) => Ok(Some(tag.commit_id().clone())),
            Some(_) => anyhow::bail!("object {} is not a commit", oid.to_short_oid()),
            None => Ok(None),
        }
    }

    /// Follow an annotated tag to its commit; commits pass through unchanged
    fn peel(oid: ObjectId, repository: &Repository) -> anyhow::Result<ObjectId> {
        match repository.database().find(&oid)? {
            Some(RevObject::Tag(tag)) => Ok(tag.commit_id().clone()),
            _ => Ok(oid),
        }
    }

    fn resolve_commit_parent(
        oid: Option<ObjectId>,
        repository: &Repository,
    ) -> anyhow::Result<Option<ObjectId>> {
        if let Some(oid) = oid {
            let commit = repository
                .database()
                .find_commit(&oid)?
                .with_context(|| format!("object {oid} is not a commit"))?;

            Ok(commit.parent().cloned())
        } else {
            Ok(None)
        }
    }

    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Parent(Box::new(base_revision)))
        } else if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;

            Ok(Revision::Ancestor(Box::new(base_revision), generations))
        } else {
            let resolved_name = *REF_ALIASES.get(revision).unwrap_or(&revision);
            let branch_name = BranchName::try_parse(resolved_name.to_string())?;
            Ok(Revision::Ref(branch_name))
        }
    }
}
