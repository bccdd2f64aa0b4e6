use crate::areas::progress::ProgressStore;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::progress::operation_progress::{OperationKind, OperationProgress};
use anyhow::Context;
use std::io::Cursor;
use std::path::{Path, PathBuf};

const NEXT_FILE: &str = "next";
const BRANCH_FILE: &str = "branch";
const SQUASH_FILE: &str = "squash";
const CONFLICTED_FILE: &str = "conflicted";
const MESSAGE_FILE: &str = "message";
const ONTO_FILE: &str = "onto";
const SQUASH_ID_PREFIX: &str = "id\t";

/// Numbered-file progress layout
///
/// Each operation kind owns a directory (`rebase-apply/`, `revert/`, ...) holding one file per
/// step named by its 1-based ordinal with the commit id as content, `next` with the ordinal of
/// the step to process, `branch` with the ref being rewritten and, when present, `squash`,
/// `conflicted`, `message` and `onto`.
///
/// Saving rewrites the files of an existing record one by one and never removes `branch`, so a
/// record interrupted halfway through a save still loads: at worst with the previous cursor.
#[derive(Debug)]
pub struct FsProgressStore {
    path: Box<Path>,
}

impl FsProgressStore {
    pub fn new(path: Box<Path>) -> Self {
        FsProgressStore { path }
    }

    fn operation_path(&self, kind: OperationKind) -> PathBuf {
        self.path.join(kind.directory())
    }

    fn read_file(dir: &Path, name: &str) -> anyhow::Result<Option<String>> {
        super::read_optional(&dir.join(name))
    }

    fn read_queue(dir: &Path) -> anyhow::Result<Vec<ObjectId>> {
        let mut queue = Vec::new();
        while let Some(content) = Self::read_file(dir, &(queue.len() + 1).to_string())? {
            queue.push(ObjectId::try_parse(content.trim().to_string())?);
        }
        Ok(queue)
    }

    fn parse_squash(content: &str) -> anyhow::Result<Commit> {
        let (id_line, commit_text) = content
            .split_once('\n')
            .context("Invalid squash file: missing commit")?;
        let squash_id = id_line
            .strip_prefix(SQUASH_ID_PREFIX)
            .context("Invalid squash file: missing id line")?;
        let squash_id = ObjectId::try_parse(squash_id.trim().to_string())?;

        let commit = Commit::deserialize(Cursor::new(commit_text.as_bytes()))?;
        if commit.object_id()? != squash_id {
            anyhow::bail!("Invalid squash file: commit does not match id {squash_id}");
        }

        Ok(commit)
    }

    fn remove_file(dir: &Path, name: &str) -> anyhow::Result<()> {
        let path = dir.join(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("Unable to remove {}", path.display())),
        }
    }

    fn write_or_remove(dir: &Path, name: &str, content: Option<String>) -> anyhow::Result<()> {
        match content {
            Some(content) => super::write_atomic(&dir.join(name), content.as_bytes()),
            None => Self::remove_file(dir, name),
        }
    }

    fn format_squash(commit: &Commit) -> anyhow::Result<String> {
        Ok(format!(
            "{SQUASH_ID_PREFIX}{}\n{}",
            commit.object_id()?,
            commit.display()
        ))
    }
}

impl ProgressStore for FsProgressStore {
    fn load(&self, kind: OperationKind) -> anyhow::Result<Option<OperationProgress>> {
        let dir = self.operation_path(kind);
        let Some(branch) = Self::read_file(&dir, BRANCH_FILE)? else {
            return Ok(None);
        };

        let next: usize = Self::read_file(&dir, NEXT_FILE)?
            .with_context(|| format!("Missing {NEXT_FILE} file in {}", dir.display()))?
            .trim()
            .parse()
            .with_context(|| format!("Invalid {NEXT_FILE} file in {}", dir.display()))?;
        let squash = Self::read_file(&dir, SQUASH_FILE)?
            .map(|content| Self::parse_squash(&content))
            .transpose()?;
        let onto = Self::read_file(&dir, ONTO_FILE)?
            .map(|content| ObjectId::try_parse(content.trim().to_string()))
            .transpose()?;

        Ok(Some(OperationProgress::restore(
            kind,
            branch.trim().to_string(),
            Self::read_queue(&dir)?,
            next.saturating_sub(1),
            squash,
            dir.join(CONFLICTED_FILE).exists(),
            Self::read_file(&dir, MESSAGE_FILE)?,
        )
        .with_onto(onto)))
    }

    fn save(&self, progress: &OperationProgress) -> anyhow::Result<()> {
        let dir = self.operation_path(progress.kind());

        // step files never change once written
        for (index, commit_id) in progress.queue().iter().enumerate() {
            super::write_atomic(
                &dir.join((index + 1).to_string()),
                format!("{commit_id}\n").as_bytes(),
            )?;
        }
        let mut stale = progress.queue().len() + 1;
        while dir.join(stale.to_string()).exists() {
            Self::remove_file(&dir, &stale.to_string())?;
            stale += 1;
        }

        let squash = progress.squash().map(Self::format_squash).transpose()?;
        Self::write_or_remove(&dir, SQUASH_FILE, squash)?;
        Self::write_or_remove(&dir, MESSAGE_FILE, progress.message().map(str::to_string))?;
        Self::write_or_remove(&dir, ONTO_FILE, progress.onto().map(|id| format!("{id}\n")))?;

        // `conflicted` never outlives its step: dropped before `next` moves, set after
        if !progress.is_conflicted() {
            Self::remove_file(&dir, CONFLICTED_FILE)?;
        }
        super::write_atomic(
            &dir.join(NEXT_FILE),
            format!("{}\n", progress.cursor() + 1).as_bytes(),
        )?;
        if progress.is_conflicted() {
            super::write_atomic(&dir.join(CONFLICTED_FILE), b"")?;
        }

        // written last: `branch` marks the record as complete
        super::write_atomic(
            &dir.join(BRANCH_FILE),
            format!("{}\n", progress.branch()).as_bytes(),
        )
    }

    fn clear(&self, kind: OperationKind) -> anyhow::Result<()> {
        let dir = self.operation_path(kind);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Unable to remove {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::Person;
    use crate::artifacts::objects::tree::Tree;
    use assert_fs::TempDir;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn squash_commit() -> Commit {
        let timestamp = chrono::FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap();
        let person = Person::new_with_timestamp(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            timestamp,
        );
        Commit::new(
            vec![ObjectId::hash_of(b"base")],
            Tree::empty_id(),
            person.clone(),
            person,
            "squashed roads\n\nthree commits".to_string(),
        )
    }

    #[test]
    fn numbered_files_round_trip_the_cursor() {
        let dir = TempDir::new().unwrap();
        let store = FsProgressStore::new(dir.path().into());
        let steps = vec![ObjectId::hash_of(b"one"), ObjectId::hash_of(b"two")];
        let mut progress =
            OperationProgress::new(OperationKind::Rebase, "refs/heads/roads".to_string(), steps);
        progress.advance();
        progress.set_conflicted(true);

        store.save(&progress).unwrap();

        let rebase_dir = dir.path().join("rebase-apply");
        assert_eq!(std::fs::read_to_string(rebase_dir.join("next")).unwrap(), "2\n");
        assert_eq!(
            std::fs::read_to_string(rebase_dir.join("1")).unwrap(),
            format!("{}\n", ObjectId::hash_of(b"one"))
        );
        assert_eq!(store.load(OperationKind::Rebase).unwrap(), Some(progress));
        assert_eq!(store.active().unwrap(), Some(OperationKind::Rebase));

        store.clear(OperationKind::Rebase).unwrap();
        assert_eq!(store.load(OperationKind::Rebase).unwrap(), None);
    }

    #[test]
    fn resaving_updates_the_record_in_place() {
        let dir = TempDir::new().unwrap();
        let store = FsProgressStore::new(dir.path().into());
        let steps = vec![ObjectId::hash_of(b"one"), ObjectId::hash_of(b"two")];
        let onto = ObjectId::hash_of(b"upstream");
        let mut progress =
            OperationProgress::new(OperationKind::Rebase, "refs/heads/roads".to_string(), steps)
                .with_onto(Some(onto.clone()));
        progress.set_conflicted(true);
        store.save(&progress).unwrap();

        let rebase_dir = dir.path().join("rebase-apply");
        std::fs::write(rebase_dir.join("applying"), b"").unwrap();
        progress.advance();
        store.save(&progress).unwrap();

        assert!(rebase_dir.join("applying").exists());
        assert!(!rebase_dir.join("conflicted").exists());
        assert_eq!(std::fs::read_to_string(rebase_dir.join("next")).unwrap(), "2\n");
        let loaded = store.load(OperationKind::Rebase).unwrap().unwrap();
        assert_eq!(loaded.onto(), Some(&onto));
        assert_eq!(loaded, progress);
    }

    #[test]
    fn squash_payload_is_kept_with_its_id() {
        let dir = TempDir::new().unwrap();
        let store = FsProgressStore::new(dir.path().into());
        let squash = squash_commit();
        let progress = OperationProgress::squashed(
            OperationKind::Rebase,
            "refs/heads/roads".to_string(),
            squash.object_id().unwrap(),
            squash,
        )
        .with_message(Some("squashed roads".to_string()));

        store.save(&progress).unwrap();

        assert_eq!(store.load(OperationKind::Rebase).unwrap(), Some(progress));
    }
}
