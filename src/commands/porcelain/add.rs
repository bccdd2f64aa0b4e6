use crate::areas::repository::Repository;
use crate::artifacts::diff::path_filter::PathFilter;
use crate::artifacts::progress::listener::ProgressListener;
use crate::commands::porcelain::silent;
use crate::commands::{BATCH_SIZE, Operation, check_cancelled};
use crate::errors::OperationError;
use tracing::{debug, info};

/// Stage working tree changes and mark the staged paths as resolved
pub struct Add {
    paths: Vec<String>,
    listener: Box<dyn ProgressListener>,
}

impl Default for Add {
    fn default() -> Self {
        Add {
            paths: Vec::new(),
            listener: silent(),
        }
    }
}

impl Add {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict staging to `path` and below; without paths everything is staged
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn listener(mut self, listener: impl ProgressListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }
}

impl Operation for Add {
    /// Number of features staged
    type Output = usize;

    fn run(self, repository: &Repository) -> Result<usize, OperationError> {
        let filter = PathFilter::new(&self.paths);
        let unstaged = repository
            .working_tree()
            .get_unstaged(filter.clone())?
            .report_trees(true);

        let staging_area = repository.staging_area();
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut staged = 0;

        for entry in unstaged.iter() {
            let entry = entry?;
            if !entry.is_tree() {
                staged += 1;
            }
            batch.push(entry);

            if batch.len() >= BATCH_SIZE {
                check_cancelled(self.listener.as_ref())?;
                staging_area.stage(batch.drain(..))?;
                self.listener.progress(staged, None);
                debug!(staged, "staged batch");
            }
        }
        if !batch.is_empty() {
            staging_area.stage(batch)?;
        }

        if filter.is_unrestricted() {
            repository.conflicts().clear()?;
        } else {
            repository.conflicts().remove_matching(&filter)?;
        }

        info!(staged, paths = ?self.paths, "staged changes");
        Ok(staged)
    }
}
