use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::{Commit, Person};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::operation_progress::OperationKind;
use crate::artifacts::refs::{MERGE_HEAD, ORIG_HEAD};
use crate::commands::{HeadSnapshot, Operation, clear_markers, ensure_no_conflicts, identity};
use crate::errors::{OperationError, PreconditionError};
use tracing::info;

/// Record the staged tree as a new commit on top of HEAD
///
/// While a merge is in progress the merged commits become additional parents and the saved
/// merge message is used when none is given.
#[derive(Debug, Clone, Default)]
pub struct CommitStaged {
    message: Option<String>,
    author: Option<Person>,
    allow_empty: bool,
}

impl CommitStaged {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Author other than the configured identity
    pub fn author(mut self, author: Person) -> Self {
        self.author = Some(author);
        self
    }

    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
}

impl Operation for CommitStaged {
    type Output = ObjectId;

    fn run(self, repository: &Repository) -> Result<ObjectId, OperationError> {
        ensure_no_conflicts(repository)?;
        let mut head = HeadSnapshot::capture(repository)?;

        let merge = repository.progress().load(OperationKind::Merge)?;
        let merged = match &merge {
            Some(progress) => progress.queue().to_vec(),
            None => repository.refs().read_id(MERGE_HEAD)?.into_iter().collect(),
        };

        let tree_id = repository.staging_area().tree()?;
        if merged.is_empty() && !self.allow_empty && tree_id == head.tree_id(repository)? {
            return Err(OperationError::NothingToCommit(
                "nothing to commit, working tree clean".to_string(),
            ));
        }

        let message = self
            .message
            .or_else(|| {
                merge
                    .as_ref()
                    .and_then(|progress| progress.message().map(str::to_string))
            })
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .ok_or_else(|| {
                PreconditionError::InvalidArgument("a commit message is required".to_string())
            })?;
        let committer = identity(repository)?;
        let author = self.author.unwrap_or_else(|| committer.clone());

        let parents = head
            .commit_id()
            .cloned()
            .into_iter()
            .chain(merged.iter().cloned())
            .collect::<Vec<_>>();
        let is_root = parents.is_empty();

        let commit = Commit::new(parents, tree_id, author, committer, message);
        let subject = commit.short_message();
        let commit_id = repository.put_commit(commit)?;
        head.advance(repository, &commit_id)?;

        if !merged.is_empty() {
            clear_markers(repository, &[MERGE_HEAD, ORIG_HEAD])?;
            repository.progress().clear(OperationKind::Merge)?;
        }

        info!(
            commit = %commit_id.to_short_oid(),
            root = is_root,
            parents = merged.len() + usize::from(!is_root),
            "{subject}"
        );
        Ok(commit_id)
    }
}
