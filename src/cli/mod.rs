//! cli
//!
//! Command-line interface layer for groom.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Initialize diagnostic logging from the verbosity flags
//! - Delegate to command handlers
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::engine`] for execution; it never spawns tools itself.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::io::Write as _;
use std::process::ExitCode;

use anyhow::Result;

use crate::engine::Context;
use crate::ui::Verbosity;

/// Environment variable forcing informational output, as some CI setups
/// cannot pass flags through.
pub const VERBOSE_ENV: &str = "GROOM_VERBOSE";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`. The returned exit
/// code is success only when every tool invocation succeeded.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let mut occurrences = cli.verbose;
    if occurrences == 0 && std::env::var_os(VERBOSE_ENV).is_some() {
        occurrences = 1;
    }
    let verbosity = Verbosity::from_occurrences(occurrences);
    init_logging(verbosity);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        quiet: cli.quiet,
    };

    let failures = commands::dispatch(cli.command, &ctx)?;
    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Route diagnostics through env_logger with a bare `level: message` format.
fn init_logging(verbosity: Verbosity) {
    let _ = env_logger::Builder::new()
        .filter_level(verbosity.level_filter())
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}",
                record.level().to_string().to_lowercase(),
                record.args()
            )
        })
        .try_init();
}
