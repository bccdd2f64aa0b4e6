//! Domain values and algorithms
//!
//! - `core`: path helpers shared by every module
//! - `objects`: immutable objects (trees, features, schemas, commits, tags)
//! - `refs`: reference names, targets and revision expressions
//! - `diff`: tree differencing
//! - `merge`: ancestor resolution, merge classification and conflicts
//! - `progress`: resumable operation state and cancellation

pub mod core;
pub mod diff;
pub mod merge;
pub mod objects;
pub mod progress;
pub mod refs;
