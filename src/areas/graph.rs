//! Commit graph edges
//!
//! Parent and child edges recorded as commits are stored, so ancestry queries do not need to
//! decode whole commits. A commit the graph does not know is reported as `None`; callers fall
//! back to the object database or treat it as the edge of a shallow history.

use crate::artifacts::objects::object_id::ObjectId;

/// Storage backend for commit graph edges
pub trait GraphStore {
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>>;

    fn children(&self, commit_id: &ObjectId) -> anyhow::Result<Vec<ObjectId>>;

    fn put(&self, commit_id: &ObjectId, parents: &[ObjectId]) -> anyhow::Result<()>;
}
