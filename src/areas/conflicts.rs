//! Conflict ledger
//!
//! Records the paths a merge, rebase, cherry-pick or revert could not reconcile. At most one
//! conflict exists per path and namespace; adding a conflict for a path replaces the previous
//! one. Conflicts are removed as the user stages resolutions.

use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::merge::conflict::Conflict;

/// Storage backend for conflicts
///
/// `namespace` separates independent ledgers; `None` is the repository's own.
pub trait ConflictStore {
    fn add(&self, namespace: Option<&str>, conflicts: &[Conflict]) -> anyhow::Result<()>;

    fn remove(&self, namespace: Option<&str>, paths: &[String]) -> anyhow::Result<()>;

    fn remove_all(&self, namespace: Option<&str>) -> anyhow::Result<()>;

    /// Conflicts under the filter, sorted by path
    fn list(&self, namespace: Option<&str>, filter: &PathFilter) -> anyhow::Result<Vec<Conflict>>;

    fn count(&self, namespace: Option<&str>) -> anyhow::Result<usize>;
}

pub struct ConflictLedger {
    store: Box<dyn ConflictStore>,
}

impl ConflictLedger {
    pub fn new(store: Box<dyn ConflictStore>) -> Self {
        ConflictLedger { store }
    }

    pub fn store(&self) -> &dyn ConflictStore {
        self.store.as_ref()
    }

    pub fn add_all(&self, conflicts: &[Conflict]) -> anyhow::Result<()> {
        if conflicts.is_empty() {
            return Ok(());
        }
        self.store.add(None, conflicts)
    }

    pub fn remove(&self, paths: &[String]) -> anyhow::Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        self.store.remove(None, paths)
    }

    /// Drop the conflicts of every path under the filter
    pub fn remove_matching(&self, filter: &PathFilter) -> anyhow::Result<()> {
        let paths = self
            .store
            .list(None, filter)?
            .into_iter()
            .map(|conflict| conflict.path().to_string())
            .collect::<Vec<_>>();
        self.remove(&paths)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.store.remove_all(None)
    }

    pub fn list(&self, filter: &PathFilter) -> anyhow::Result<Vec<Conflict>> {
        self.store.list(None, filter)
    }

    pub fn all(&self) -> anyhow::Result<Vec<Conflict>> {
        self.store.list(None, &PathFilter::all())
    }

    pub fn get(&self, path: &str) -> anyhow::Result<Option<Conflict>> {
        Ok(self
            .store
            .list(None, &PathFilter::new([path]))?
            .into_iter()
            .find(|conflict| conflict.path() == path))
    }

    pub fn count(&self) -> anyhow::Result<usize> {
        self.store.count(None)
    }

    pub fn has_conflicts(&self) -> anyhow::Result<bool> {
        Ok(self.count()? > 0)
    }
}
