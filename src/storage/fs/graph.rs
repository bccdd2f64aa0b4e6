use crate::areas::graph::GraphStore;
use crate::artifacts::objects::object_id::ObjectId;
use std::path::{Path, PathBuf};

const PARENTS_EXTENSION: &str = "parents";
const CHILDREN_EXTENSION: &str = "children";

/// Two files per commit under `ab/cdef...`: `.parents` and `.children`, one id per line
///
/// A `.parents` file exists for every commit put, empty for a root commit. A `.children`
/// file may exist for a commit the graph has not seen yet.
#[derive(Debug)]
pub struct FsGraphStore {
    path: Box<Path>,
}

impl FsGraphStore {
    pub fn new(path: Box<Path>) -> Self {
        FsGraphStore { path }
    }

    fn edge_path(&self, commit_id: &ObjectId, extension: &str) -> PathBuf {
        self.path.join(commit_id.to_path()).with_extension(extension)
    }

    fn read_ids(path: &Path) -> anyhow::Result<Option<Vec<ObjectId>>> {
        let Some(content) = super::read_optional(path)? else {
            return Ok(None);
        };

        content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| ObjectId::try_parse(line.to_string()))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Some)
    }

    fn write_ids(path: &Path, ids: &[ObjectId]) -> anyhow::Result<()> {
        let content = ids.iter().map(|id| format!("{id}\n")).collect::<String>();
        super::write_atomic(path, content.as_bytes())
    }
}

impl GraphStore for FsGraphStore {
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>> {
        Self::read_ids(&self.edge_path(commit_id, PARENTS_EXTENSION))
    }

    fn children(&self, commit_id: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
        Ok(Self::read_ids(&self.edge_path(commit_id, CHILDREN_EXTENSION))?.unwrap_or_default())
    }

    fn put(&self, commit_id: &ObjectId, parents: &[ObjectId]) -> anyhow::Result<()> {
        for parent in parents {
            let path = self.edge_path(parent, CHILDREN_EXTENSION);
            let mut children = Self::read_ids(&path)?.unwrap_or_default();
            if !children.contains(commit_id) {
                children.push(commit_id.clone());
                Self::write_ids(&path, &children)?;
            }
        }

        // written last: a known commit has all its child edges recorded
        Self::write_ids(&self.edge_path(commit_id, PARENTS_EXTENSION), parents)
    }
}
