use crate::areas::config::ConfigStore;
use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;

/// `key=value` lines, rewritten whole on every change
#[derive(Debug)]
pub struct FsConfigStore {
    path: Box<Path>,
}

impl FsConfigStore {
    pub fn new(path: Box<Path>) -> Self {
        FsConfigStore { path }
    }

    fn read(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let Some(content) = super::read_optional(&self.path)? else {
            return Ok(BTreeMap::new());
        };

        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let (key, value) = line
                    .split_once('=')
                    .with_context(|| format!("invalid config line: {line}"))?;
                Ok((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let content = entries
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect::<String>();
        super::write_atomic(&self.path, content.as_bytes())
    }
}

impl ConfigStore for FsConfigStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if key.contains('=') || key.contains('\n') || value.contains('\n') {
            anyhow::bail!("invalid config entry: {key}");
        }

        let mut entries = self.read()?;
        entries.insert(key.to_string(), value.to_string());
        self.write(&entries)
    }

    fn unset(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }
}
