use crate::areas::repository::Repository;
use crate::artifacts::core::split_path;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::objects::object::{Object, RevObject};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Node;
use crate::artifacts::objects::tree_builder::TreeBuilder;
use crate::artifacts::refs::HEAD;
use crate::artifacts::refs::branch_name::BranchName;
use crate::artifacts::refs::reference::RefTarget;
use crate::commands::{Operation, resolve_commit, update_trees};
use crate::errors::{MAX_REPORTED_PATHS, OperationError, PreconditionError};
use anyhow::Context;
use tracing::{info, warn};

const RESOLVE_INDEX_FIRST: &str = "You need to resolve your index first.";

/// Where HEAD ended up, or what was restored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Paths restored into the working tree
    Paths { tree_id: ObjectId, restored: usize },
    /// HEAD attached to a local branch; `created` when it was made from a remote branch
    Branch {
        name: String,
        commit_id: ObjectId,
        created: bool,
    },
    Detached { commit_id: ObjectId },
}

/// Switch HEAD to a branch, tag or commit, or restore paths in the working tree
///
/// Refuses to run over unresolved conflicts unless `force` is set or, for paths, one side of
/// the conflict is picked with `ours`/`theirs`.
#[derive(Debug, Clone, Default)]
pub struct Checkout {
    target: Option<String>,
    paths: Vec<String>,
    ours: bool,
    theirs: bool,
    force: bool,
}

impl Checkout {
    /// Check out a branch, tag or commit
    pub fn new(target: impl Into<String>) -> Self {
        Checkout {
            target: Some(target.into()),
            ..Self::default()
        }
    }

    /// Restore paths from the index, or from `source` when given
    pub fn paths(
        paths: impl IntoIterator<Item = impl Into<String>>,
        source: Option<String>,
    ) -> Self {
        Checkout {
            target: source,
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Resolve conflicted paths to our version
    pub fn ours(mut self) -> Self {
        self.ours = true;
        self
    }

    /// Resolve conflicted paths to their version
    pub fn theirs(mut self) -> Self {
        self.theirs = true;
        self
    }

    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    fn validate(&self) -> Result<(), PreconditionError> {
        if self.ours && self.theirs {
            return Err(PreconditionError::InvalidArgument(
                "ours and theirs are mutually exclusive".to_string(),
            ));
        }
        if (self.ours || self.theirs) && self.paths.is_empty() {
            return Err(PreconditionError::InvalidArgument(
                "ours and theirs only apply to paths".to_string(),
            ));
        }
        if self.paths.is_empty() && self.target.is_none() {
            return Err(PreconditionError::InvalidArgument(
                "no branch, commit or paths given".to_string(),
            ));
        }
        Ok(())
    }
}

impl Operation for Checkout {
    type Output = CheckoutOutcome;

    fn run(self, repository: &Repository) -> Result<CheckoutOutcome, OperationError> {
        self.validate()?;

        if self.paths.is_empty() {
            self.checkout_head(repository)
        } else {
            self.checkout_paths(repository)
        }
    }
}

impl Checkout {
    fn checkout_paths(self, repository: &Repository) -> Result<CheckoutOutcome, OperationError> {
        let filter = PathFilter::new(&self.paths);
        let conflicts = repository.conflicts().list(&filter)?;
        let pick_side = self.ours || self.theirs;

        if !conflicts.is_empty() && !pick_side && !self.force {
            return Err(PreconditionError::UnmergedPaths(needs_merge_report(&conflicts, None)).into());
        }

        let source_tree = match &self.target {
            Some(revision) => {
                let commit_id = resolve_commit(repository, revision)?;
                repository.database().commit_tree_id(&commit_id)?
            }
            None => repository.staging_area().tree()?,
        };

        let database = repository.database();
        let working_tree = repository.working_tree();
        let work_tree = working_tree.tree()?;
        let mut builder = TreeBuilder::new(database, &work_tree)?;
        let mut restored = 0;

        let diff = database
            .tree_diff(&work_tree, &source_tree)
            .with_filter(filter)
            .report_trees(true);
        for entry in diff.iter() {
            let entry = entry?;
            if pick_side && conflicts.iter().any(|conflict| conflict.path() == entry.path()) {
                continue;
            }
            if !entry.is_tree() {
                restored += 1;
            }
            builder.apply(&entry)?;
        }

        if pick_side {
            for conflict in &conflicts {
                let side = if self.ours {
                    conflict.ours()
                } else {
                    conflict.theirs()
                };

                if side.is_null() {
                    builder.remove(conflict.path())?;
                } else {
                    let node = conflict_node(repository, &work_tree, conflict.path(), side)?;
                    builder.put(conflict.path(), node)?;
                }
                restored += 1;
            }
        }

        let tree_id = builder.write()?;
        working_tree.update_head(&tree_id)?;

        info!(restored, paths = ?self.paths, "restored paths");
        Ok(CheckoutOutcome::Paths { tree_id, restored })
    }

    fn checkout_head(self, repository: &Repository) -> Result<CheckoutOutcome, OperationError> {
        let Some(target) = self.target.as_deref() else {
            return Err(PreconditionError::InvalidArgument("no branch or commit given".to_string()).into());
        };
        let refs = repository.refs();
        let head = refs.get(HEAD)?;

        if !self.force {
            let conflicts = repository.conflicts().all()?;
            if !conflicts.is_empty() {
                return Err(PreconditionError::UnmergedPaths(needs_merge_report(
                    &conflicts,
                    Some(RESOLVE_INDEX_FIRST),
                ))
                .into());
            }

            let unstaged = repository.working_tree().count_unstaged(PathFilter::all())?;
            if unstaged > 0 {
                return Err(PreconditionError::DirtyWorkingTree(unstaged).into());
            }
            let staged = repository.staging_area().count_staged(PathFilter::all())?;
            if staged > 0 {
                return Err(PreconditionError::DirtyIndex(staged).into());
            }
        }

        let (new_head, commit_id, outcome) = match refs.find(target)? {
            Some(reference) if reference.is_branch() || reference.is_remote() => {
                let commit_id = reference
                    .object_id()
                    .cloned()
                    .ok_or_else(|| PreconditionError::UnresolvedReference(target.to_string()))?;
                let (name, created) = if reference.is_remote() {
                    (track_remote_branch(repository, reference.name(), &commit_id)?, true)
                } else {
                    (reference.name().to_string(), false)
                };

                let outcome = CheckoutOutcome::Branch {
                    name: name.clone(),
                    commit_id: commit_id.clone(),
                    created,
                };
                (RefTarget::Symbolic(name), commit_id, outcome)
            }
            _ => {
                let commit_id = resolve_commit(repository, target)?;
                let outcome = CheckoutOutcome::Detached {
                    commit_id: commit_id.clone(),
                };
                (RefTarget::Direct(commit_id.clone()), commit_id, outcome)
            }
        };

        if !refs.compare_and_set(HEAD, head.as_ref(), &new_head)? {
            return Err(OperationError::RefUpdateRejected {
                name: HEAD.to_string(),
            });
        }
        update_trees(repository, &repository.database().commit_tree_id(&commit_id)?)?;
        if self.force {
            repository.conflicts().clear()?;
        }

        if new_head.is_symbolic() {
            info!(target, commit = %commit_id.to_short_oid(), "switched HEAD");
        } else {
            warn!(commit = %commit_id.to_short_oid(), "HEAD is now detached");
        }
        Ok(outcome)
    }
}

/// `error: <path> needs merge.` per conflict, capped, followed by an optional footer
fn needs_merge_report(conflicts: &[Conflict], footer: Option<&str>) -> String {
    let mut lines = conflicts
        .iter()
        .take(MAX_REPORTED_PATHS)
        .map(|conflict| format!("error: {} needs merge.", conflict.path()))
        .collect::<Vec<_>>();
    if conflicts.len() > MAX_REPORTED_PATHS {
        lines.push(format!("and {} more.", conflicts.len() - MAX_REPORTED_PATHS));
    }
    lines.extend(footer.map(str::to_string));

    lines.join("\n")
}

/// Create the local branch for a remote-tracking ref and record the tracking config
fn track_remote_branch(
    repository: &Repository,
    remote_ref: &str,
    commit_id: &ObjectId,
) -> Result<String, OperationError> {
    let (remote, branch) = BranchName::try_parse_remote(remote_ref)
        .map_err(|err| PreconditionError::InvalidArgument(err.to_string()))?;
    let local = branch.to_ref_name();

    if !repository
        .refs()
        .compare_and_set(&local, None, &RefTarget::Direct(commit_id.clone()))?
    {
        return Err(PreconditionError::InvalidArgument(format!(
            "a branch named '{}' already exists",
            branch.as_ref()
        ))
        .into());
    }
    repository
        .config()
        .set_tracking(branch.as_ref(), &remote, &local)?;

    info!(branch = local, remote, "created tracking branch");
    Ok(local)
}

/// Node placing object `object_id` at `path`, keeping the metadata of the node it replaces
fn conflict_node(
    repository: &Repository,
    work_tree: &ObjectId,
    path: &str,
    object_id: &ObjectId,
) -> anyhow::Result<Node> {
    let database = repository.database();
    let (_, name) = split_path(path);

    let existing = match database.find_node(work_tree, path)? {
        Some(node) => Some(node),
        None => database.find_node(&repository.head_tree()?, path)?,
    };
    let metadata_id = existing.and_then(|node| node.node().metadata_id().cloned());

    match database
        .find(object_id)?
        .with_context(|| format!("conflicting version {object_id} of {path} is missing"))?
    {
        RevObject::Feature(feature) => Ok(Node::feature(
            name.to_string(),
            object_id.clone(),
            metadata_id,
            feature.envelope(),
        )),
        RevObject::Tree(_) => Ok(Node::tree(name.to_string(), object_id.clone(), metadata_id)),
        other => anyhow::bail!("{path} cannot hold a {}", other.object_type()),
    }
}
