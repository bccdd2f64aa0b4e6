//! Common ancestor resolver for merge operations
//!
//! Finds the nearest commit shared by two histories, the base of every three-way merge.
//!
//! ## Algorithm Overview
//!
//! Two breadth-first frontiers start at the left and right commits and are expanded in
//! lock-step, always the shallower one first (ties go to the left side):
//!
//! - Every commit popped from a frontier is marked as visited from that side
//! - A commit newly visited by one side that the other side already visited is a candidate;
//!   it is not expanded any further, and its parents queued by the other side are dropped since
//!   everything above a candidate is a worse candidate
//! - Parents the graph does not know about (the edge of a shallow history) end that path
//!   silently
//!
//! Once both frontiers are exhausted, candidates that are ancestors of another candidate are
//! discarded. The remaining ones are best common ancestors, reported in discovery order.
//!
//! ## Debug Logging
//!
//! Per-commit tracing of the walk is compiled in with the `debug_merge` feature flag:
//!
//! ```toml
//! [features]
//! debug_merge = []
//! ```

use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Macro for walk tracing that is only compiled with the debug_merge feature flag
///
/// # Usage
/// ```rust,ignore
/// debug_log!("Processing commit {}", commit_id);
/// ```
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "debug_merge")]
        {
            tracing::trace!($($arg)*);
        }
    };
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash)]
    struct VisitState: u8 {
        const NONE = 0b000;
        const VISITED_FROM_LEFT = 0b001;
        const VISITED_FROM_RIGHT = 0b010;
        const VISITED_FROM_BOTH = Self::VISITED_FROM_LEFT.bits() | Self::VISITED_FROM_RIGHT.bits();
        const CANDIDATE = 0b100;
    }
}

impl fmt::Debug for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.contains(VisitState::VISITED_FROM_LEFT) {
            flags.push("LEFT");
        }
        if self.contains(VisitState::VISITED_FROM_RIGHT) {
            flags.push("RIGHT");
        }
        if self.contains(VisitState::CANDIDATE) {
            flags.push("CANDIDATE");
        }
        if flags.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", flags.join("|"))
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Parent edges of the commit graph
pub trait ParentLookup {
    /// Parents of a commit, or `None` when the commit lies beyond the known history
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>>;
}

impl<F> ParentLookup for F
where
    F: Fn(&ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>>,
{
    fn parents(&self, commit_id: &ObjectId) -> anyhow::Result<Option<Vec<ObjectId>>> {
        self(commit_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn flag(&self) -> VisitState {
        match self {
            Side::Left => VisitState::VISITED_FROM_LEFT,
            Side::Right => VisitState::VISITED_FROM_RIGHT,
        }
    }

    fn other(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Breadth-first frontier of one side, each entry tagged with its depth
type Frontier = VecDeque<(ObjectId, usize)>;

/// Best common ancestor finder over any parent lookup
pub struct BCAFinder<'g, G: ParentLookup + ?Sized> {
    graph: &'g G,
}

impl<'g, G: ParentLookup + ?Sized> BCAFinder<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// The best common ancestor of two commits, if their histories meet
    ///
    /// When several best common ancestors exist (criss-cross merges) the first one discovered
    /// is returned.
    pub fn find_best_common_ancestor(
        &self,
        left: &ObjectId,
        right: &ObjectId,
    ) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.find_common_ancestors(left, right)?.into_iter().next())
    }

    /// All best common ancestors of two commits, in discovery order
    pub fn find_common_ancestors(
        &self,
        left: &ObjectId,
        right: &ObjectId,
    ) -> anyhow::Result<Vec<ObjectId>> {
        if left == right {
            return Ok(vec![left.clone()]);
        }

        let mut states = HashMap::<ObjectId, VisitState>::new();
        let mut candidates = Vec::<ObjectId>::new();
        let mut left_frontier = Frontier::from([(left.clone(), 0)]);
        let mut right_frontier = Frontier::from([(right.clone(), 0)]);

        while let Some(side) = Self::next_side(&left_frontier, &right_frontier) {
            let (frontier, other_frontier) = match side {
                Side::Left => (&mut left_frontier, &mut right_frontier),
                Side::Right => (&mut right_frontier, &mut left_frontier),
            };
            let Some((commit_id, depth)) = frontier.pop_front() else {
                continue;
            };

            let state = states.get(&commit_id).copied().unwrap_or(VisitState::NONE);
            if state.contains(side.flag()) {
                continue;
            }
            let state = state | side.flag();

            debug_log!("Visiting commit {} at depth {}: state={}", commit_id, depth, state);

            let parents = self.graph.parents(&commit_id)?;

            if state.contains(side.other().flag()) {
                states.insert(commit_id.clone(), state | VisitState::CANDIDATE);
                if let Some(parents) = &parents {
                    other_frontier.retain(|(queued, _)| !parents.contains(queued));
                }
                debug_log!("Found candidate common ancestor {}", commit_id);
                candidates.push(commit_id);
                continue;
            }

            states.insert(commit_id, state);
            for parent_id in parents.unwrap_or_default() {
                frontier.push_back((parent_id, depth + 1));
            }
        }

        debug_log!(
            "Final visit states: {}",
            states
                .iter()
                .map(|(oid, state)| format!("{}: {}", oid, state))
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.filter_redundant(candidates, &states)
    }

    /// Whether `candidate` is `descendant` itself or one of its ancestors
    pub fn is_ancestor(&self, candidate: &ObjectId, descendant: &ObjectId) -> anyhow::Result<bool> {
        self.reaches(descendant, candidate, None)
    }

    fn next_side(left: &Frontier, right: &Frontier) -> Option<Side> {
        match (left.front(), right.front()) {
            (None, None) => None,
            (Some(_), None) => Some(Side::Left),
            (None, Some(_)) => Some(Side::Right),
            (Some((_, left_depth)), Some((_, right_depth))) => {
                if left_depth <= right_depth {
                    Some(Side::Left)
                } else {
                    Some(Side::Right)
                }
            }
        }
    }

    /// Drop candidates reachable from another candidate through visited commits
    fn filter_redundant(
        &self,
        candidates: Vec<ObjectId>,
        states: &HashMap<ObjectId, VisitState>,
    ) -> anyhow::Result<Vec<ObjectId>> {
        if candidates.len() < 2 {
            return Ok(candidates);
        }

        let mut redundant = HashSet::<ObjectId>::new();
        for candidate in &candidates {
            for other in &candidates {
                if other == candidate || redundant.contains(other) {
                    continue;
                }
                if self.reaches(other, candidate, Some(states))? {
                    debug_log!("Candidate {} is an ancestor of {}", candidate, other);
                    redundant.insert(candidate.clone());
                    break;
                }
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| !redundant.contains(candidate))
            .collect())
    }

    /// Breadth-first search from `start` for `target`, optionally confined to visited commits
    fn reaches(
        &self,
        start: &ObjectId,
        target: &ObjectId,
        confined_to: Option<&HashMap<ObjectId, VisitState>>,
    ) -> anyhow::Result<bool> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start.clone()]);

        while let Some(current) = queue.pop_front() {
            if &current == target {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }

            for parent_id in self.graph.parents(&current)?.unwrap_or_default() {
                let allowed = confined_to.is_none_or(|states| states.contains_key(&parent_id));
                if allowed || &parent_id == target {
                    queue.push_back(parent_id);
                }
            }
        }

        Ok(false)
    }
}
