//! Merge algorithms and conflict detection
//!
//! - `bca_finder`: best common ancestor of two commits
//! - `scenario`: three-way classification of two diffs against their ancestor
//! - `commit_apply`: single-sided replay of one commit's changes onto HEAD
//! - `feature_merge`: attribute-level merging of feature records
//! - `merge_event`: the event stream both classifiers produce
//! - `conflict`: the unresolved paths they report

pub mod bca_finder;
pub mod commit_apply;
pub mod conflict;
pub mod feature_merge;
pub mod merge_event;
pub mod scenario;
