use crate::areas::repository::Repository;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::operation_progress::OperationKind;
use crate::artifacts::refs::{CHERRY_PICK_HEAD, MERGE_HEAD};
use crate::commands::{HeadSnapshot, Operation, clear_markers, resolve_commit, update_trees};
use crate::errors::{OperationError, PreconditionError};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    /// Move the branch only
    Soft,
    /// Move the branch and reset the index
    #[default]
    Mixed,
    /// Move the branch and reset both the index and the working tree
    Hard,
}

/// Move HEAD to a commit, or restore staged paths from it
///
/// A full reset also clears merge and cherry-pick state along with the conflict ledger.
#[derive(Debug, Clone, Default)]
pub struct Reset {
    target: Option<String>,
    mode: ResetMode,
    paths: Vec<String>,
}

impl Reset {
    pub fn new(mode: ResetMode) -> Self {
        Reset {
            mode,
            ..Self::default()
        }
    }

    /// Commit to reset to; HEAD when not given
    pub fn target(mut self, revision: impl Into<String>) -> Self {
        self.target = Some(revision.into());
        self
    }

    /// Only reset these index paths, leaving HEAD alone
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }
}

impl Operation for Reset {
    /// The commit reset to
    type Output = ObjectId;

    fn run(self, repository: &Repository) -> Result<ObjectId, OperationError> {
        let mut head = HeadSnapshot::capture(repository)?;
        let target_id = match &self.target {
            Some(revision) => resolve_commit(repository, revision)?,
            None => head.require_commit()?.clone(),
        };
        let target_tree = repository.database().commit_tree_id(&target_id)?;

        if !self.paths.is_empty() {
            if self.mode != ResetMode::Mixed {
                return Err(PreconditionError::InvalidArgument(
                    "only mixed resets can be limited to paths".to_string(),
                )
                .into());
            }
            return self.reset_paths(repository, target_id, &target_tree);
        }

        head.advance(repository, &target_id)?;
        match self.mode {
            ResetMode::Soft => {}
            ResetMode::Mixed => repository.staging_area().update_head(&target_tree)?,
            ResetMode::Hard => update_trees(repository, &target_tree)?,
        }

        clear_markers(repository, &[MERGE_HEAD, CHERRY_PICK_HEAD])?;
        repository.conflicts().clear()?;
        repository.progress().clear(OperationKind::Merge)?;
        repository.progress().clear(OperationKind::CherryPick)?;

        info!(mode = ?self.mode, commit = %target_id.to_short_oid(), "reset HEAD");
        Ok(target_id)
    }
}

impl Reset {
    fn reset_paths(
        &self,
        repository: &Repository,
        target_id: ObjectId,
        target_tree: &ObjectId,
    ) -> Result<ObjectId, OperationError> {
        let staging_area = repository.staging_area();
        let entries = repository
            .database()
            .tree_diff(&staging_area.tree()?, target_tree)
            .with_filter(PathFilter::new(&self.paths))
            .report_trees(true)
            .iter()
            .collect::<anyhow::Result<Vec<_>>>()?;

        let restored = entries.iter().filter(|entry| !entry.is_tree()).count();
        staging_area.stage(entries)?;

        info!(restored, paths = ?self.paths, commit = %target_id.to_short_oid(), "reset paths");
        Ok(target_id)
    }
}
