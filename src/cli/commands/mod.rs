//! CLI command implementations
//!
//! Each command is implemented in its own module.

pub mod backport;
pub mod rebase;
