//! Tree comparison
//!
//! - `diff_entry`: one changed path, with the nodes on both sides
//! - `path_filter`: prefix restriction shared by diffs and lookups
//! - `tree_diff`: lazy, path-ordered differencer between two root trees

pub mod diff_entry;
pub mod path_filter;
pub mod tree_diff;
