//! Immutable, content-addressed objects
//!
//! Every stored record is identified by the SHA-1 hash of its canonical encoding:
//!
//! - **Tree**: sorted nodes pointing at sub-trees or features, with schema and envelope
//! - **Feature**: ordered attribute values
//! - **Schema**: ordered attribute descriptors of a feature type
//! - **Commit**: snapshot with parents, identities and message
//! - **Tag**: annotated pointer to a commit
//!
//! All objects share the frame `<type> <size>\0<content>`.

pub mod commit;
pub mod envelope;
pub mod feature;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod schema;
pub mod tag;
pub mod tree;
pub mod tree_builder;
pub mod value;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of abbreviated ids in messages
pub const SHORT_OBJECT_ID_LENGTH: usize = 8;
