//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Verbosity is a ladder driven by the repeatable `-v` flag: warnings only by
//! default, informational messages at `-v`, debug at `-vv`. The executed
//! command echo is independent of the ladder and controlled by `--quiet`.

use std::ffi::OsStr;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Default - warnings and errors only
    Warn,
    /// `-v` - also report informational messages
    Info,
    /// `-vv` - full debug output
    Debug,
}

impl Verbosity {
    /// Create verbosity from the number of `-v` occurrences.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Warn,
            1 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }

    /// The `log` level filter corresponding to this verbosity.
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Render a command line for display, shell-quoting arguments that need it.
pub fn render_command<I, S>(command: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let words: Vec<String> = command
        .into_iter()
        .map(|arg| {
            let arg = arg.as_ref().to_string_lossy();
            shlex::try_quote(&arg)
                .map(|quoted| quoted.into_owned())
                .unwrap_or_else(|_| arg.into_owned())
        })
        .collect();
    words.join(" ")
}

/// Echo an executed command to stdout (silenced by `--quiet`).
pub fn echo_command<I, S>(command: I, quiet: bool)
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let rendered = render_command(command);
    if !quiet {
        println!("{}", rendered);
    }
    log::debug!("exec: {}", rendered);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_ladder() {
        assert_eq!(Verbosity::from_occurrences(0), Verbosity::Warn);
        assert_eq!(Verbosity::from_occurrences(1), Verbosity::Info);
        assert_eq!(Verbosity::from_occurrences(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_occurrences(7), Verbosity::Debug);
    }

    #[test]
    fn render_quotes_arguments_with_spaces() {
        let cmd = ["clang-format", "-i", "a file.cpp"];
        assert_eq!(render_command(cmd), "clang-format -i 'a file.cpp'");
    }

    #[test]
    fn render_passes_plain_arguments_through() {
        let cmd = ["git", "ls-files"];
        assert_eq!(render_command(cmd), "git ls-files");
    }
}
