//! Classification events
//!
//! Scenario classifiers are pull iterators of `MergeEvent`s ending with exactly one
//! `Finished`. Callers that prefer callbacks drive a `MergeScenarioConsumer` with `report`.

use crate::artifacts::diff::diff_entry::DiffEntry;
use crate::artifacts::merge::conflict::Conflict;
use crate::artifacts::objects::feature::FeatureRecord;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;

/// A feature synthesized from two compatible sets of attribute changes
#[derive(Debug, Clone, PartialEq, new)]
pub struct MergedFeature {
    path: String,
    feature: FeatureRecord,
    metadata_id: Option<ObjectId>,
}

impl MergedFeature {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn feature(&self) -> &FeatureRecord {
        &self.feature
    }

    pub fn metadata_id(&self) -> Option<&ObjectId> {
        self.metadata_id.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeEvent {
    /// A change that applies cleanly onto the target tree
    Unconflicted(DiffEntry),
    Conflicted(Conflict),
    Merged(MergedFeature),
    Finished,
}

pub trait MergeScenarioConsumer {
    fn conflicted(&mut self, conflict: Conflict) -> anyhow::Result<()>;

    fn unconflicted(&mut self, entry: DiffEntry) -> anyhow::Result<()>;

    fn merged(&mut self, merged: MergedFeature) -> anyhow::Result<()>;

    fn finished(&mut self) -> anyhow::Result<()>;
}

/// Push every event of a scenario into a consumer
pub fn report(
    events: impl IntoIterator<Item = anyhow::Result<MergeEvent>>,
    consumer: &mut impl MergeScenarioConsumer,
) -> anyhow::Result<()> {
    for event in events {
        match event? {
            MergeEvent::Unconflicted(entry) => consumer.unconflicted(entry)?,
            MergeEvent::Conflicted(conflict) => consumer.conflicted(conflict)?,
            MergeEvent::Merged(merged) => consumer.merged(merged)?,
            MergeEvent::Finished => consumer.finished()?,
        }
    }

    Ok(())
}

/// Consumer that only tallies a scenario, keeping its conflicts
#[derive(Debug, Default)]
pub struct MergeScenarioReport {
    conflicts: Vec<Conflict>,
    unconflicted: usize,
    merged: usize,
    finished: bool,
}

impl MergeScenarioReport {
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn unconflicted(&self) -> usize {
        self.unconflicted
    }

    pub fn merged(&self) -> usize {
        self.merged
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

impl MergeScenarioConsumer for MergeScenarioReport {
    fn conflicted(&mut self, conflict: Conflict) -> anyhow::Result<()> {
        self.conflicts.push(conflict);
        Ok(())
    }

    fn unconflicted(&mut self, _entry: DiffEntry) -> anyhow::Result<()> {
        self.unconflicted += 1;
        Ok(())
    }

    fn merged(&mut self, _merged: MergedFeature) -> anyhow::Result<()> {
        self.merged += 1;
        Ok(())
    }

    fn finished(&mut self) -> anyhow::Result<()> {
        if self.finished {
            anyhow::bail!("merge scenario finished twice");
        }
        self.finished = true;
        Ok(())
    }
}
