//! collect
//!
//! Candidate-file enumeration.
//!
//! Two strategies feed the dispatcher:
//! - the version-control listing (tracked files, straight from the
//!   [`crate::git`] doorway), used by default;
//! - the compilation-database walk in [`compiledb`], which follows each
//!   translation unit's preprocessor dependencies to pick up headers, used
//!   by the analyzer when a database is supplied.

pub mod compiledb;

pub use compiledb::{
    collect_from_database, CollectError, CompileCommand, CompilerDeps, DependencyProvider,
};
