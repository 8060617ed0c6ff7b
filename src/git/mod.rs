//! Version-control gate for release workflows.
//!
//! A release may only start from a clean working tree; this module answers
//! whether the tree is clean and which paths are not.

mod cli_adapter;
mod operations;

pub use cli_adapter::GitCli;
pub use operations::{ChangeState, PendingChange, WorkingTreeGate, parse_porcelain};
