use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::branch_name::BranchName;
use crate::artifacts::refs::reference::{Ref, RefTarget};
use crate::commands::{HeadSnapshot, Operation, resolve_commit};
use crate::errors::{OperationError, PreconditionError};
use tracing::info;

fn parse_name(name: &str) -> Result<BranchName, PreconditionError> {
    BranchName::try_parse(name.to_string())
        .map_err(|err| PreconditionError::InvalidArgument(err.to_string()))
}

/// Create a branch at HEAD or at a start point
#[derive(Debug, Clone)]
pub struct CreateBranch {
    name: String,
    start_point: Option<String>,
}

impl CreateBranch {
    pub fn new(name: impl Into<String>) -> Self {
        CreateBranch {
            name: name.into(),
            start_point: None,
        }
    }

    pub fn start_point(mut self, revision: impl Into<String>) -> Self {
        self.start_point = Some(revision.into());
        self
    }
}

impl Operation for CreateBranch {
    type Output = Ref;

    fn run(self, repository: &Repository) -> Result<Ref, OperationError> {
        let branch = parse_name(&self.name)?;

        let commit_id = match &self.start_point {
            Some(revision) => resolve_commit(repository, revision)?,
            None => HeadSnapshot::capture(repository)?.require_commit()?.clone(),
        };

        let ref_name = branch.to_ref_name();
        let target = RefTarget::Direct(commit_id.clone());
        if !repository
            .refs()
            .compare_and_set(&ref_name, None, &target)?
        {
            return Err(PreconditionError::InvalidArgument(format!(
                "a branch named '{}' already exists",
                branch.as_ref()
            ))
            .into());
        }

        info!(branch = ref_name, commit = %commit_id.to_short_oid(), "created branch");
        Ok(Ref::new(ref_name, target))
    }
}

/// Delete a branch other than the current one
#[derive(Debug, Clone)]
pub struct DeleteBranch {
    name: String,
}

impl DeleteBranch {
    pub fn new(name: impl Into<String>) -> Self {
        DeleteBranch { name: name.into() }
    }
}

impl Operation for DeleteBranch {
    /// Commit the branch pointed to
    type Output = ObjectId;

    fn run(self, repository: &Repository) -> Result<ObjectId, OperationError> {
        let ref_name = parse_name(&self.name)?.to_ref_name();

        if repository.refs().current_branch()?.as_deref() == Some(ref_name.as_str()) {
            return Err(PreconditionError::InvalidArgument(format!(
                "cannot delete the branch '{}' which you are currently on",
                self.name
            ))
            .into());
        }

        let target = repository
            .refs()
            .get(&ref_name)?
            .ok_or_else(|| PreconditionError::UnresolvedReference(self.name.clone()))?;
        let commit_id = target
            .object_id()
            .cloned()
            .ok_or_else(|| PreconditionError::InvalidArgument(format!("{ref_name} is symbolic")))?;

        if !repository.refs().delete(&ref_name, Some(&target))? {
            return Err(OperationError::RefUpdateRejected { name: ref_name });
        }

        info!(branch = ref_name, commit = %commit_id.to_short_oid(), "deleted branch");
        Ok(commit_id)
    }
}

/// Every local branch, sorted by name
#[derive(Debug, Clone, Default)]
pub struct ListBranches;

impl Operation for ListBranches {
    type Output = Vec<Ref>;

    fn run(self, repository: &Repository) -> Result<Vec<Ref>, OperationError> {
        Ok(repository.refs().list_branches()?)
    }
}
