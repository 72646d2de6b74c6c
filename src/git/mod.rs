//! git
//!
//! Version-control access.
//!
//! # Modules
//!
//! - [`interface`] - The single doorway to all repository queries
//!
//! # Design
//!
//! No other module may import `git2` directly. Everything groom needs from
//! version control - work-tree discovery, tracked-file listing, changed-file
//! listing, fork points - flows through [`Git`], which normalizes errors
//! into typed categories.

pub mod interface;

pub use interface::{Changeset, Git, GitDiffDelta, GitError};
