//! Building blocks shared by the porcelain operations
//!
//! - `batching`: buffered application of classifier events to a tree and the conflict ledger
//! - `rev_list`: first-parent history walks
//! - `sequencer`: resumable replay of a commit queue (rebase, cherry-pick, revert)

pub mod batching;
pub mod rev_list;
pub mod sequencer;
