use crate::areas::config::{Config, ConfigStore};
use crate::areas::conflicts::{ConflictLedger, ConflictStore};
use crate::areas::database::{ObjectDatabase, ObjectStore};
use crate::areas::graph::GraphStore;
use crate::areas::index::StagingArea;
use crate::areas::progress::ProgressStore;
use crate::areas::refs::{RefStore, Refs};
use crate::areas::workspace::WorkingTree;
use crate::artifacts::merge::bca_finder::{BCAFinder, ParentLookup};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::RevObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::Tree;
use crate::artifacts::refs::reference::RefTarget;
use crate::artifacts::refs::revision::Revision;
use crate::artifacts::refs::{DEFAULT_BRANCH, HEAD, STAGE_HEAD, WORK_HEAD};
use crate::storage::fs::{
    FsConfigStore, FsConflictStore, FsGraphStore, FsObjectStore, FsProgressStore, FsRefStore,
};
use crate::storage::memory::{
    MemoryConfigStore, MemoryConflictStore, MemoryGraphStore, MemoryObjectStore,
    MemoryProgressStore, MemoryRefStore,
};
use std::path::Path;

/// Name of the directory holding a file-backed repository
pub const REPOSITORY_DIR: &str = ".geobit";

/// Handle over every collaborator of one repository
///
/// Operations take `&Repository`; there is no other shared or global state.
pub struct Repository {
    database: ObjectDatabase,
    refs: Refs,
    conflicts: ConflictLedger,
    config: Config,
    graph: Box<dyn GraphStore>,
    progress: Box<dyn ProgressStore>,
}

impl Repository {
    pub fn new(
        objects: Box<dyn ObjectStore>,
        refs: Box<dyn RefStore>,
        conflicts: Box<dyn ConflictStore>,
        config: Box<dyn ConfigStore>,
        graph: Box<dyn GraphStore>,
        progress: Box<dyn ProgressStore>,
    ) -> Self {
        Repository {
            database: ObjectDatabase::new(objects),
            refs: Refs::new(refs),
            conflicts: ConflictLedger::new(conflicts),
            config: Config::new(config),
            graph,
            progress,
        }
    }

    /// Fresh repository held entirely in memory
    pub fn in_memory() -> anyhow::Result<Self> {
        let repository = Repository::new(
            Box::new(MemoryObjectStore::default()),
            Box::new(MemoryRefStore::default()),
            Box::new(MemoryConflictStore::default()),
            Box::new(MemoryConfigStore::default()),
            Box::new(MemoryGraphStore::default()),
            Box::new(MemoryProgressStore::default()),
        );
        repository.initialize()?;

        Ok(repository)
    }

    /// Open the repository under `path`, creating it when missing
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let root = path.join(REPOSITORY_DIR);
        let repository = Repository::new(
            Box::new(FsObjectStore::new(root.join("objects").into_boxed_path())),
            Box::new(FsRefStore::new(root.clone().into_boxed_path())),
            Box::new(FsConflictStore::new(root.join("conflicts").into_boxed_path())),
            Box::new(FsConfigStore::new(root.join("config").into_boxed_path())),
            Box::new(FsGraphStore::new(root.join("graph").into_boxed_path())),
            Box::new(FsProgressStore::new(root.into_boxed_path())),
        );
        repository.initialize()?;

        Ok(repository)
    }

    /// Point HEAD at the default branch and empty the trees, unless already done
    fn initialize(&self) -> anyhow::Result<()> {
        let empty = RefTarget::Direct(Tree::empty_id());

        self.refs.compare_and_set(
            HEAD,
            None,
            &RefTarget::Symbolic(DEFAULT_BRANCH.to_string()),
        )?;
        self.refs.compare_and_set(WORK_HEAD, None, &empty)?;
        self.refs.compare_and_set(STAGE_HEAD, None, &empty)?;

        Ok(())
    }

    pub fn database(&self) -> &ObjectDatabase {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn conflicts(&self) -> &ConflictLedger {
        &self.conflicts
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &dyn GraphStore {
        self.graph.as_ref()
    }

    pub fn progress(&self) -> &dyn ProgressStore {
        self.progress.as_ref()
    }

    pub fn working_tree(&self) -> WorkingTree<'_> {
        WorkingTree::new(self)
    }

    pub fn staging_area(&self) -> StagingArea<'_> {
        StagingArea::new(self)
    }

    pub fn ancestry(&self) -> BCAFinder<'_, Self> {
        BCAFinder::new(self)
    }

    /// Store a commit and record its graph edges
    pub fn put_commit(&self, commit: Commit) -> anyhow::Result<ObjectId> {
        let parents = commit.parents().to_vec();
        let commit_id = self.database.put(RevObject::Commit(commit))?;
        self.graph.put(&commit_id, &parents)?;

        Ok(commit_id)
    }

    /// Root tree of the commit HEAD resolves to; empty on an unborn branch
    pub fn head_tree(&self) -> anyhow::Result<ObjectId> {
        match self.refs.head_id()? {
            Some(head_id) => self.database.commit_tree_id(&head_id),
            None => Ok(Tree::empty_id()),
        }
    }

    /// Commit a revision expression designates
    ///
    /// Accepts ref names (short or full), full commit ids, tags, and `^`/`~n` suffixes.
    pub fn resolve_revision(&self, revision: &str) -> anyhow::Result<Option<ObjectId>> {
        Revision::try_parse(revision)?.resolve(self)
    }
}

impl ParentLookup for Repository {
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>> {
        if let Some(parents) = self.graph.parents(commit_id)? {
            return Ok(Some(parents));
        }

        Ok(self
            .database
            .find_commit(commit_id)?
            .map(|commit| commit.parents().to_vec()))
    }
}
