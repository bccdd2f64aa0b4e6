//! Concrete collaborators
//!
//! - `memory`: every store held in process memory
//! - `fs`: stores persisted below a repository directory

pub mod fs;
pub mod memory;
