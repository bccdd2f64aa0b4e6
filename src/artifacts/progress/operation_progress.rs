use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

/// Multi-step operations that can stop on conflicts and resume later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Merge,
    Rebase,
    CherryPick,
    Revert,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Merge,
        OperationKind::Rebase,
        OperationKind::CherryPick,
        OperationKind::Revert,
    ];

    /// Directory holding the persisted progress of this kind
    pub fn directory(&self) -> &'static str {
        match self {
            OperationKind::Merge => "merge",
            OperationKind::Rebase => "rebase-apply",
            OperationKind::CherryPick => "cherry-pick",
            OperationKind::Revert => "revert",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Merge => "merge",
            OperationKind::Rebase => "rebase",
            OperationKind::CherryPick => "cherry-pick",
            OperationKind::Revert => "revert",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted state of a multi-step operation
///
/// `queue` lists every commit to process and `cursor` the index of the next one. A squash
/// replaces the queue with a single step: the synthetic commit kept in `squash`. `onto` is the
/// commit a rebase replays onto.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationProgress {
    kind: OperationKind,
    branch: String,
    queue: Vec<ObjectId>,
    cursor: usize,
    squash: Option<Commit>,
    conflicted: bool,
    message: Option<String>,
    onto: Option<ObjectId>,
}

impl OperationProgress {
    pub fn new(kind: OperationKind, branch: String, queue: Vec<ObjectId>) -> Self {
        OperationProgress {
            kind,
            branch,
            queue,
            cursor: 0,
            squash: None,
            conflicted: false,
            message: None,
            onto: None,
        }
    }

    /// Progress restored from storage
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        kind: OperationKind,
        branch: String,
        queue: Vec<ObjectId>,
        cursor: usize,
        squash: Option<Commit>,
        conflicted: bool,
        message: Option<String>,
    ) -> Self {
        OperationProgress {
            kind,
            branch,
            queue,
            cursor,
            squash,
            conflicted,
            message,
            onto: None,
        }
    }

    /// One-step progress applying a squashed commit
    pub fn squashed(
        kind: OperationKind,
        branch: String,
        squash_id: ObjectId,
        squash: Commit,
    ) -> Self {
        OperationProgress {
            squash: Some(squash),
            ..Self::new(kind, branch, vec![squash_id])
        }
    }

    pub fn with_message(self, message: Option<String>) -> Self {
        Self { message, ..self }
    }

    pub fn with_onto(self, onto: Option<ObjectId>) -> Self {
        Self { onto, ..self }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Branch ref name being rewritten
    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn queue(&self) -> &[ObjectId] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The step to process next
    pub fn current(&self) -> Option<&ObjectId> {
        self.queue.get(self.cursor)
    }

    pub fn pending(&self) -> &[ObjectId] {
        self.queue.get(self.cursor..).unwrap_or_default()
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.queue.len());
        self.conflicted = false;
    }

    pub fn squash(&self) -> Option<&Commit> {
        self.squash.as_ref()
    }

    pub fn is_conflicted(&self) -> bool {
        self.conflicted
    }

    pub fn set_conflicted(&mut self, conflicted: bool) {
        self.conflicted = conflicted;
    }

    /// Message saved for the commit that will conclude the operation
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn onto(&self) -> Option<&ObjectId> {
        self.onto.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_walks_the_queue_once() {
        let first = ObjectId::hash_of(b"first");
        let second = ObjectId::hash_of(b"second");
        let mut progress = OperationProgress::new(
            OperationKind::Rebase,
            "refs/heads/roads".to_string(),
            vec![first.clone(), second.clone()],
        );

        assert_eq!(progress.current(), Some(&first));
        progress.set_conflicted(true);
        progress.advance();

        assert!(!progress.is_conflicted());
        assert_eq!(progress.pending(), &[second]);
        progress.advance();
        progress.advance();

        assert!(progress.is_done());
        assert_eq!(progress.current(), None);
        assert!(progress.pending().is_empty());
    }
}
