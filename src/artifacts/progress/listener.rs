use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Observer of a long-running operation, polled between units of work
pub trait ProgressListener {
    /// Whether the caller asked the operation to stop
    fn is_cancelled(&self) -> bool {
        false
    }

    /// `completed` units of work done out of `total`, when known
    fn progress(&self, _completed: usize, _total: Option<usize>) {}
}

/// Listener that never cancels and ignores progress
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentListener;

impl ProgressListener for SilentListener {}

/// Shareable cancellation flag that also records the last reported progress
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    completed: Arc<AtomicUsize>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl ProgressListener for CancellationToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn progress(&self, completed: usize, _total: Option<usize>) {
        self.completed.store(completed, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_cancellation_flag() {
        let token = CancellationToken::new();
        let observer = token.clone();

        assert!(!observer.is_cancelled());
        token.cancel();
        token.progress(3, Some(5));

        assert!(observer.is_cancelled());
        assert_eq!(observer.completed(), 3);
        assert!(!SilentListener.is_cancelled());
    }
}
