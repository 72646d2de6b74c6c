//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `-v` / `--verbose`: More output; additive, up to two times
//! - `--quiet` / `-q`: Do not echo executed commands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// groom - apply code formatters and static analyzers consistently
#[derive(Parser, Debug)]
#[command(name = "groom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if groom was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Give more output; option is additive, and can be used up to 2 times
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Do not write the executed commands to standard output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Format the codebase with the configured formatters
    #[command(
        name = "format",
        long_about = "Format the codebase with the configured formatters.\n\n\
            Each enabled formatter (clang-format, cmake-format, black, ...) receives \
            the tracked files its include/exclude patterns accept and rewrites them \
            in place. Pass --dry-run to only report files that would change.",
        after_help = "\
EXAMPLES:
    # Format everything the configuration covers
    groom format

    # Only C++ sources, reporting instead of rewriting
    groom format --lang c++ --dry-run

    # Only what changed relative to the staging area
    groom format --applies-on staging

    # A specific directory
    groom format src/"
    )]
    Format {
        /// Only process the given comma-separated languages
        #[arg(long, value_name = "LANGS")]
        lang: Option<String>,

        /// Do not update the files, simply report formatting issues
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Restrict to a changeset: working, staging, since-rev:<rev>,
        /// since-ref:<ref>, base-branch, or all
        #[arg(long, value_name = "MODE")]
        applies_on: Option<String>,

        /// Files or directories. Default is the entire codebase.
        #[arg(value_name = "SRC")]
        sources: Vec<PathBuf>,
    },

    /// Run the configured static analyzers
    #[command(
        name = "static-analysis",
        long_about = "Run the configured static analyzers.\n\n\
            Analyzers only report; they never modify files. clang-tidy wants a \
            compilation database - point it at one with -p (or the \
            compile_commands_file key of its configuration section). When a \
            database is given, analysis covers the translation units it lists \
            plus the headers they include.",
        after_help = "\
EXAMPLES:
    # Analyze everything
    groom static-analysis

    # C++ analysis driven by a compilation database
    groom static-analysis --lang c++ -p build/compile_commands.json"
    )]
    StaticAnalysis {
        /// Only process the given comma-separated languages
        #[arg(long, value_name = "LANGS")]
        lang: Option<String>,

        /// A Clang compile command database
        #[arg(short = 'p', value_name = "build-path")]
        compile_commands: Option<PathBuf>,

        /// Restrict to a changeset: working, staging, since-rev:<rev>,
        /// since-ref:<ref>, base-branch, or all
        #[arg(long, value_name = "MODE")]
        applies_on: Option<String>,

        /// Files or directories. Default is the entire codebase.
        #[arg(value_name = "SRC")]
        sources: Vec<PathBuf>,
    },

    /// Run the clang-tidy analyzer over C++ sources
    #[command(
        name = "clang-tidy",
        long_about = "Run the clang-tidy analyzer over C++ sources.\n\n\
            A focused alias for the C++ slice of static-analysis."
    )]
    ClangTidy {
        /// A Clang compile command database
        #[arg(short = 'p', value_name = "build-path")]
        compile_commands: Option<PathBuf>,

        /// Restrict to a changeset: working, staging, since-rev:<rev>,
        /// since-ref:<ref>, base-branch, or all
        #[arg(long, value_name = "MODE")]
        applies_on: Option<String>,

        /// Files or directories. Default is the entire codebase.
        #[arg(value_name = "SRC")]
        sources: Vec<PathBuf>,
    },

    /// Generate shell completion scripts
    Completion {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells completion scripts can be generated for.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
