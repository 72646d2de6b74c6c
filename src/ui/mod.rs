//! ui
//!
//! User-facing output utilities.
//!
//! # Design
//!
//! All terminal output goes through this module so that verbosity and the
//! quiet flag are honored consistently. Diagnostic messages flow through the
//! `log` facade; the command echo (the exact invocations handed to external
//! tools) is printed to stdout separately so that `--quiet` can silence it
//! without touching diagnostics.

pub mod output;

pub use output::{echo_command, render_command, Verbosity};
