use crate::areas::conflicts::ConflictStore;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::merge::conflict::Conflict;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_NAMESPACE: &str = "default";

/// One file per namespace, one tab-separated conflict per line, sorted by path
#[derive(Debug)]
pub struct FsConflictStore {
    path: Box<Path>,
}

impl FsConflictStore {
    pub fn new(path: Box<Path>) -> Self {
        FsConflictStore { path }
    }

    fn ledger_path(&self, namespace: Option<&str>) -> anyhow::Result<PathBuf> {
        let name = namespace.unwrap_or(DEFAULT_NAMESPACE);
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            anyhow::bail!("invalid conflict namespace: {name}");
        }

        Ok(self.path.join(name))
    }

    fn read(&self, namespace: Option<&str>) -> anyhow::Result<BTreeMap<String, Conflict>> {
        let Some(content) = super::read_optional(&self.ledger_path(namespace)?)? else {
            return Ok(BTreeMap::new());
        };

        content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let conflict = Conflict::try_parse(line)?;
                Ok((conflict.path().to_string(), conflict))
            })
            .collect()
    }

    fn write(
        &self,
        namespace: Option<&str>,
        ledger: &BTreeMap<String, Conflict>,
    ) -> anyhow::Result<()> {
        let path = self.ledger_path(namespace)?;
        if ledger.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            return Ok(());
        }

        let content = ledger
            .values()
            .map(|conflict| format!("{}\n", conflict.to_line()))
            .collect::<String>();
        super::write_atomic(&path, content.as_bytes())
    }
}

impl ConflictStore for FsConflictStore {
    fn add(&self, namespace: Option<&str>, conflicts: &[Conflict]) -> anyhow::Result<()> {
        let mut ledger = self.read(namespace)?;
        for conflict in conflicts {
            ledger.insert(conflict.path().to_string(), conflict.clone());
        }
        self.write(namespace, &ledger)
    }

    fn remove(&self, namespace: Option<&str>, paths: &[String]) -> anyhow::Result<()> {
        let mut ledger = self.read(namespace)?;
        let before = ledger.len();
        for path in paths {
            ledger.remove(path);
        }

        if ledger.len() == before {
            return Ok(());
        }
        self.write(namespace, &ledger)
    }

    fn remove_all(&self, namespace: Option<&str>) -> anyhow::Result<()> {
        self.write(namespace, &BTreeMap::new())
    }

    fn list(&self, namespace: Option<&str>, filter: &PathFilter) -> anyhow::Result<Vec<Conflict>> {
        Ok(self
            .read(namespace)?
            .into_values()
            .filter(|conflict| filter.matches(conflict.path()))
            .collect())
    }

    fn count(&self, namespace: Option<&str>) -> anyhow::Result<usize> {
        Ok(self.read(namespace)?.len())
    }
}
