use crate::areas::refs::RefStore;
use crate::artifacts::refs::reference::{Ref, RefTarget};
use anyhow::Context;
use file_guard::Lock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One ref per file below the repository directory
///
/// Updates take an exclusive lock on the ref file, compare its content with the expected
/// value and rewrite it while still holding the lock.
#[derive(Debug)]
pub struct FsRefStore {
    path: Box<Path>,
}

impl FsRefStore {
    pub fn new(path: Box<Path>) -> Self {
        FsRefStore { path }
    }

    fn ref_path(&self, name: &str) -> anyhow::Result<PathBuf> {
        if name.is_empty()
            || name
                .split('/')
                .any(|part| part.is_empty() || part == "." || part == "..")
        {
            anyhow::bail!("invalid ref name: {name}");
        }

        Ok(self.path.join(name))
    }

    /// Top-level refs are upper-case names such as `HEAD` or `ORIG_HEAD`
    fn is_top_level_ref(name: &str) -> bool {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
    }

    fn parse_content(content: &str) -> anyhow::Result<Option<RefTarget>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        RefTarget::try_parse(content).map(Some)
    }

    fn read(&self, name: &str, path: &Path) -> anyhow::Result<Option<Ref>> {
        let Some(content) = super::read_optional(path)? else {
            return Ok(None);
        };

        Ok(Self::parse_content(&content)
            .with_context(|| format!("corrupt ref {name}"))?
            .map(|target| Ref::new(name.to_string(), target)))
    }
}

impl RefStore for FsRefStore {
    fn get(&self, name: &str) -> anyhow::Result<Option<RefTarget>> {
        let path = self.ref_path(name)?;
        Ok(self.read(name, &path)?.map(|reference| reference.target().clone()))
    }

    fn compare_and_set(
        &self,
        name: &str,
        expected: Option<&RefTarget>,
        new: &RefTarget,
    ) -> anyhow::Result<bool> {
        let path = self.ref_path(name)?;
        std::fs::create_dir_all(
            path.parent()
                .with_context(|| format!("invalid ref path {}", path.display()))?,
        )?;

        let mut ref_file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        let file = &mut **lock;

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        let current = Self::parse_content(&content)?;

        if current.as_ref() != expected {
            // opening created an empty file for a ref that does not exist
            if current.is_none() {
                std::fs::remove_file(&path)?;
            }
            return Ok(false);
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(format!("{}\n", new.to_line()).as_bytes())?;

        Ok(true)
    }

    fn delete(&self, name: &str, expected: Option<&RefTarget>) -> anyhow::Result<bool> {
        let path = self.ref_path(name)?;
        let mut ref_file = match std::fs::OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to open ref file at {:?}", path));
            }
        };
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;

        let mut content = String::new();
        (&mut **lock).read_to_string(&mut content)?;
        let current = Self::parse_content(&content)?;

        match (current, expected) {
            (None, _) => Ok(false),
            (Some(current), Some(expected)) if &current != expected => Ok(false),
            _ => {
                std::fs::remove_file(&path)
                    .with_context(|| format!("failed to delete ref file at {:?}", path))?;
                Ok(true)
            }
        }
    }

    fn list(&self, prefix: &str) -> anyhow::Result<Vec<Ref>> {
        let mut refs = Vec::new();
        if !self.path.exists() {
            return Ok(refs);
        }

        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type()?.is_file()
                && Self::is_top_level_ref(&name)
                && name.starts_with(prefix)
            {
                refs.extend(self.read(&name, &entry.path())?);
            }
        }

        let refs_dir = self.path.join("refs");
        if refs_dir.exists() {
            for entry in WalkDir::new(&refs_dir) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }

                let name = entry
                    .path()
                    .strip_prefix(&self.path)?
                    .components()
                    .map(|component| component.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if name.starts_with(prefix) {
                    refs.extend(self.read(&name, entry.path())?);
                }
            }
        }

        refs.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(refs)
    }
}
