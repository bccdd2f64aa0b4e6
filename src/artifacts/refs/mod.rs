//! Reference names and values
//!
//! - `branch_name`: validated branch names
//! - `reference`: what a ref points to, directly or symbolically
//! - `revision`: revision expressions such as `master~2` or `HEAD^`

pub mod branch_name;
pub mod reference;
pub mod revision;

pub const HEAD: &str = "HEAD";
/// Root tree of the working tree
pub const WORK_HEAD: &str = "WORK_HEAD";
/// Root tree of the staging area
pub const STAGE_HEAD: &str = "STAGE_HEAD";
/// HEAD before a merge, rebase, cherry-pick or revert started
pub const ORIG_HEAD: &str = "ORIG_HEAD";
pub const MERGE_HEAD: &str = "MERGE_HEAD";
pub const CHERRY_PICK_HEAD: &str = "CHERRY_PICK_HEAD";

pub const REFS_PREFIX: &str = "refs/";
pub const HEADS_PREFIX: &str = "refs/heads/";
pub const TAGS_PREFIX: &str = "refs/tags/";
pub const REMOTES_PREFIX: &str = "refs/remotes/";

pub const DEFAULT_BRANCH: &str = "refs/heads/master";

/// Symbolic chains longer than this are treated as broken
pub const MAX_SYMREF_DEPTH: usize = 10;

/// Prefixes tried, in order, when resolving a short ref name
pub const SHORT_NAME_PREFIXES: [&str; 5] = ["", REFS_PREFIX, HEADS_PREFIX, TAGS_PREFIX, REMOTES_PREFIX];

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";
pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};
