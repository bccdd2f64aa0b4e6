//! Repository collaborators
//!
//! This module contains the contracts storage backends implement and the handle tying them
//! together:
//!
//! - `database`: Object store contract and typed object access
//! - `refs`: Reference store contract with compare-and-set updates and name resolution
//! - `conflicts`: Conflict ledger of unresolved paths
//! - `config`: Flat key/value configuration and commit identity
//! - `graph`: Commit parent/child edges for ancestry queries
//! - `progress`: Persisted progress of resumable operations
//! - `workspace`: Working tree rooted at `WORK_HEAD`
//! - `index`: Staging area rooted at `STAGE_HEAD`
//! - `repository`: Handle passed to every operation

pub mod config;
pub mod conflicts;
pub mod database;
pub mod graph;
pub mod index;
pub mod progress;
pub mod refs;
pub mod repository;
pub mod workspace;
