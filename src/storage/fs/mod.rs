//! File-system collaborators
//!
//! Layout below the repository directory:
//!
//! - `objects/ab/cdef...`: zlib-compressed framed objects
//! - `HEAD`, `ORIG_HEAD`, `refs/heads/...`: one ref per file, either a hex id or `ref: <name>`
//! - `conflicts/<namespace>`: one tab-separated conflict per line
//! - `config`: `key=value` lines
//! - `graph/ab/cdef....parents`, `.children`: commit graph edges, one id per line
//! - `rebase-apply/`, `revert/`, `cherry-pick/`, `merge/`: operation progress

mod config;
mod conflicts;
mod graph;
mod objects;
mod progress;
mod refs;

pub use config::FsConfigStore;
pub use conflicts::FsConflictStore;
pub use graph::FsGraphStore;
pub use objects::FsObjectStore;
pub use progress::FsProgressStore;
pub use refs::FsRefStore;

use anyhow::Context;
use fake::rand;
use std::io::Write;
use std::path::Path;

/// Write `content` next to `path` under a temporary name, then rename it into place
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Unable to create directory {}", dir.display()))?;

    let temp_path = dir.join(format!("tmp-{}", rand::random::<u32>()));
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Unable to open file {}", temp_path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Unable to write file {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Unable to rename file to {}", path.display()))
}

/// Contents of a text file, or `None` when it does not exist
pub(crate) fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Unable to read file {}", path.display())),
    }
}
