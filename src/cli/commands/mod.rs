//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Builds a [`TaskRequest`] and hands it to the engine
//! 3. Returns the failure count for the exit status
//!
//! Handlers never spawn tools directly.

mod analysis;
mod completion;
mod format;

pub use analysis::{clang_tidy, static_analysis};
pub use completion::completion;
pub use format::format;

use anyhow::Result;

use crate::cli::args::Command;
use crate::engine::Context;
use crate::git::Changeset;
use crate::tools::descriptor::Language;

/// Dispatch a command to its handler; returns the number of failed jobs.
pub fn dispatch(command: Command, ctx: &Context) -> Result<usize> {
    match command {
        Command::Format {
            lang,
            dry_run,
            applies_on,
            sources,
        } => format(ctx, lang.as_deref(), dry_run, applies_on.as_deref(), sources),
        Command::StaticAnalysis {
            lang,
            compile_commands,
            applies_on,
            sources,
        } => static_analysis(
            ctx,
            lang.as_deref(),
            compile_commands,
            applies_on.as_deref(),
            sources,
        ),
        Command::ClangTidy {
            compile_commands,
            applies_on,
            sources,
        } => clang_tidy(ctx, compile_commands, applies_on.as_deref(), sources),
        Command::Completion { shell } => {
            completion(shell)?;
            Ok(0)
        }
    }
}

/// Parse a comma-separated `--lang` value.
pub(crate) fn parse_languages(value: Option<&str>) -> Result<Option<Vec<Language>>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let mut languages = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let language = item
            .parse::<Language>()
            .map_err(|message| anyhow::anyhow!(message))?;
        if !languages.contains(&language) {
            languages.push(language);
        }
    }
    Ok(Some(languages))
}

/// Parse an `--applies-on` value.
pub(crate) fn parse_changeset(value: Option<&str>) -> Result<Option<Changeset>> {
    value
        .map(|v| v.parse::<Changeset>())
        .transpose()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_split_and_dedupe() {
        let parsed = parse_languages(Some("c++, cmake, C++")).unwrap().unwrap();
        assert_eq!(parsed, vec![Language::Cpp, Language::CMake]);
    }

    #[test]
    fn unknown_language_is_an_error() {
        assert!(parse_languages(Some("fortran")).is_err());
    }

    #[test]
    fn absent_lang_means_no_filter() {
        assert!(parse_languages(None).unwrap().is_none());
    }
}
