//! In-memory collaborators
//!
//! Every store keeps its state behind a `RefCell`; a repository has one logical writer at a
//! time, so interior mutability is enough. Used by tests and by embedders that bring their
//! own persistence.

use crate::areas::config::ConfigStore;
use crate::areas::conflicts::ConflictStore;
use crate::areas::database::ObjectStore;
use crate::areas::graph::GraphStore;
use crate::areas::progress::ProgressStore;
use crate::areas::refs::RefStore;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::objects::object::{Object, RevObject};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use crate::artifacts::refs::reference::{Ref, RefTarget};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RefCell<HashMap<ObjectId, RevObject>>,
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, id: &ObjectId) -> anyhow::Result<Option<RevObject>> {
        Ok(self.objects.borrow().get(id).cloned())
    }

    fn put(&self, object: &RevObject) -> anyhow::Result<ObjectId> {
        let object_id = object.object_id()?;
        self.objects
            .borrow_mut()
            .entry(object_id.clone())
            .or_insert_with(|| object.clone());

        Ok(object_id)
    }

    fn exists(&self, id: &ObjectId) -> anyhow::Result<bool> {
        Ok(self.objects.borrow().contains_key(id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryRefStore {
    refs: RefCell<BTreeMap<String, RefTarget>>,
}

impl RefStore for MemoryRefStore {
    fn get(&self, name: &str) -> anyhow::Result<Option<RefTarget>> {
        Ok(self.refs.borrow().get(name).cloned())
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&RefTarget>,
        new: &RefTarget,
    ) -> anyhow::Result<bool> {
        let mut refs = self.refs.borrow_mut();
        if refs.get(name) != expected {
            return Ok(false);
        }

        refs.insert(name.to_string(), new.clone());
        Ok(true)
    }

    fn delete(&self, name: &str, expected: Option<&RefTarget>) -> anyhow::Result<bool> {
        let mut refs = self.refs.borrow_mut();
        match (refs.get(name), expected) {
            (None, _) => Ok(false),
            (Some(current), Some(expected)) if current != expected => Ok(false),
            _ => Ok(refs.remove(name).is_some()),
        }
    }

    fn list(&self, prefix: &str) -> anyhow::Result<Vec<Ref>> {
        Ok(self
            .refs
            .borrow()
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(name, target)| Ref::new(name.clone(), target.clone()))
            .collect())
    }
}

/// Conflicts keyed by namespace, then by path
#[derive(Debug, Default)]
pub struct MemoryConflictStore {
    namespaces: RefCell<HashMap<Option<String>, BTreeMap<String, Conflict>>>,
}

impl ConflictStore for MemoryConflictStore {
    fn add(&self, namespace: Option<&str>, conflicts: &[Conflict]) -> anyhow::Result<()> {
        let mut namespaces = self.namespaces.borrow_mut();
        let ledger = namespaces.entry(namespace.map(str::to_string)).or_default();
        for conflict in conflicts {
            ledger.insert(conflict.path().to_string(), conflict.clone());
        }

        Ok(())
    }

    fn remove(&self, namespace: Option<&str>, paths: &[String]) -> anyhow::Result<()> {
        if let Some(ledger) = self
            .namespaces
            .borrow_mut()
            .get_mut(&namespace.map(str::to_string))
        {
            for path in paths {
                ledger.remove(path);
            }
        }

        Ok(())
    }

    fn remove_all(&self, namespace: Option<&str>) -> anyhow::Result<()> {
        self.namespaces
            .borrow_mut()
            .remove(&namespace.map(str::to_string));
        Ok(())
    }

    fn list(&self, namespace: Option<&str>, filter: &PathFilter) -> anyhow::Result<Vec<Conflict>> {
        let namespaces = self.namespaces.borrow();
        let Some(ledger) = namespaces.get(&namespace.map(str::to_string)) else {
            return Ok(Vec::new());
        };

        Ok(ledger
            .values()
            .filter(|conflict| filter.matches(conflict.path()))
            .cloned()
            .collect())
    }

    fn count(&self, namespace: Option<&str>) -> anyhow::Result<usize> {
        Ok(self
            .namespaces
            .borrow()
            .get(&namespace.map(str::to_string))
            .map_or(0, BTreeMap::len))
    }
}

#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn unset(&self, key: &str) -> anyhow::Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    parents: RefCell<HashMap<ObjectId, Vec<ObjectId>>>,
    children: RefCell<HashMap<ObjectId, Vec<ObjectId>>>,
}

impl GraphStore for MemoryGraphStore {
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>> {
        Ok(self.parents.borrow().get(commit_id).cloned())
    }

    fn children(&self, commit_id: &ObjectId) -> anyhow::Result<Vec<ObjectId>> {
        Ok(self
            .children
            .borrow()
            .get(commit_id)
            .cloned()
            .unwrap_or_default())
    }

    fn put(&self, commit_id: &ObjectId, parents: &[ObjectId]) -> anyhow::Result<()> {
        let mut children = self.children.borrow_mut();
        for parent in parents {
            let siblings = children.entry(parent.clone()).or_default();
            if !siblings.contains(commit_id) {
                siblings.push(commit_id.clone());
            }
        }

        self.parents
            .borrow_mut()
            .insert(commit_id.clone(), parents.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    records: RefCell<HashMap<OperationKind, OperationProgress>>,
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, kind: OperationKind) -> anyhow::Result<Option<OperationProgress>> {
        Ok(self.records.borrow().get(&kind).cloned())
    }

    fn save(&self, progress: &OperationProgress) -> anyhow::Result<()> {
        self.records
            .borrow_mut()
            .insert(progress.kind(), progress.clone());
        Ok(())
    }

    fn clear(&self, kind: OperationKind) -> anyhow::Result<()> {
        self.records.borrow_mut().remove(&kind);
        Ok(())
    }
}
