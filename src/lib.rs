//! Version control for geospatial feature data
//!
//! Repositories hold immutable objects (feature records, schemas, trees of features, commits
//! and tags) addressed by content hash, plus mutable references naming commits. On top of
//! them the crate provides three-way merges that reconcile attribute-level edits, rebase,
//! cherry-pick and revert with resumable progress, reset and checkout.
//!
//! - `artifacts`: object model and pure algorithms (diff, ancestor search, merge classification)
//! - `areas`: the repository handle and the collaborator contracts it is assembled from
//! - `storage`: in-memory and on-disk collaborator implementations
//! - `commands`: the operations, each run against an explicit `&Repository`
//! - `errors`: the typed outcomes operations report
//!
//! ```no_run
//! use geobit::areas::repository::Repository;
//! use geobit::commands::Operation;
//! use geobit::commands::porcelain::merge::Merge;
//!
//! # fn main() -> anyhow::Result<()> {
//! let repository = Repository::open(std::path::Path::new("parcels"))?;
//! match Merge::new(["roads"]).run(&repository) {
//!     Ok(outcome) => println!("{outcome:?}"),
//!     Err(err) if err.is_conflict() => eprintln!("{err}"),
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
pub mod storage;

pub use areas::repository::Repository;
pub use commands::Operation;
pub use errors::{ConflictError, OperationError, PreconditionError};
