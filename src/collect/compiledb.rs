//! collect::compiledb
//!
//! Compilation-database driven file collection.
//!
//! # Behavior
//!
//! The database is a JSON array of `{directory, file, command}` entries.
//! For each entry the absolute source path is resolved; if it has not been
//! seen and passes the filter, it is yielded, followed by the headers its
//! compiler invocation pulls in (obtained by re-running the command with a
//! dependency-only flag). A global seen-set guarantees no path is yielded
//! twice even when several entries reference the same sources.
//!
//! Header derivation sits behind [`DependencyProvider`] so collection is
//! testable without a compiler. An entry whose derivation fails is logged
//! and skipped; the source file itself is still yielded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use thiserror::Error;

use crate::core::filter::FileFilter;
use crate::ui::output;

/// Errors from compilation-database collection.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The database file does not exist.
    #[error(
        "could not find file {path}; please make sure the \
         CMAKE_EXPORT_COMPILE_COMMANDS CMake variable is on"
    )]
    MissingDatabase {
        /// The missing database path
        path: PathBuf,
    },

    /// The database could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        /// The database path
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// The database is not valid JSON of the expected shape.
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// The database path
        path: PathBuf,
        /// The parser's complaint
        message: String,
    },

    /// Dependency derivation failed for one entry.
    #[error("failed to derive dependencies of '{file}': {message}")]
    Dependency {
        /// The translation unit
        file: PathBuf,
        /// What went wrong
        message: String,
    },
}

/// One compilation-database entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompileCommand {
    /// Working directory of the compiler invocation.
    pub directory: PathBuf,
    /// Source file, possibly relative to `directory`.
    pub file: PathBuf,
    /// The full compiler command line.
    pub command: String,
}

impl CompileCommand {
    /// The absolute, symlink-resolved source path.
    pub fn source_path(&self) -> PathBuf {
        let joined = self.directory.join(&self.file);
        joined.canonicalize().unwrap_or(joined)
    }
}

/// Derives the headers a translation unit includes.
pub trait DependencyProvider {
    /// Headers pulled in by the entry's compiler invocation.
    fn included_headers(&self, entry: &CompileCommand) -> Result<Vec<PathBuf>, CollectError>;
}

/// Parse make-style dependency output: the first line names the object
/// file and is skipped; continuation backslashes are stripped; every
/// remaining whitespace-separated token is a header path.
pub fn parse_dependency_output(output: &str) -> Vec<String> {
    let mut headers = Vec::new();
    for line in output.lines().skip(1) {
        let line = line.strip_suffix('\\').unwrap_or(line);
        for token in line.split_whitespace() {
            headers.push(token.to_string());
        }
    }
    headers
}

/// Strip a `-o <file>` pair from an argument list, tolerating its absence.
fn strip_output_argument(args: &mut Vec<String>) {
    if let Some(pos) = args.iter().position(|a| a == "-o") {
        args.remove(pos);
        if pos < args.len() {
            args.remove(pos);
        }
    }
}

/// The real provider: re-invoke the compiler with `-M`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerDeps;

impl DependencyProvider for CompilerDeps {
    fn included_headers(&self, entry: &CompileCommand) -> Result<Vec<PathBuf>, CollectError> {
        let mut args = shlex::split(&entry.command).ok_or_else(|| CollectError::Dependency {
            file: entry.file.clone(),
            message: "unparsable compile command".to_string(),
        })?;
        if args.is_empty() {
            return Err(CollectError::Dependency {
                file: entry.file.clone(),
                message: "empty compile command".to_string(),
            });
        }
        strip_output_argument(&mut args);
        args.insert(1, "-M".to_string());

        log::debug!("{}", output::render_command(&args));
        let program = args[0].clone();
        let result = Command::new(&program)
            .args(&args[1..])
            .current_dir(&entry.directory)
            .output()
            .map_err(|source| CollectError::Dependency {
                file: entry.file.clone(),
                message: format!("failed to run '{}': {}", program, source),
            })?;
        if !result.status.success() {
            return Err(CollectError::Dependency {
                file: entry.file.clone(),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&result.stdout);
        Ok(parse_dependency_output(&stdout)
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }
}

/// Collect source files and their headers from a compilation database.
///
/// Yield order follows the database: each unseen, filter-accepted source
/// immediately followed by its unseen, filter-accepted headers.
///
/// # Errors
///
/// [`CollectError::MissingDatabase`] when `database` does not exist; read
/// and parse failures otherwise. Per-entry dependency failures are logged
/// as warnings and skipped.
pub fn collect_from_database(
    database: &Path,
    filter: &FileFilter,
    provider: &dyn DependencyProvider,
) -> Result<Vec<PathBuf>, CollectError> {
    if !database.exists() {
        return Err(CollectError::MissingDatabase {
            path: database.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(database).map_err(|source| CollectError::Read {
        path: database.to_path_buf(),
        source,
    })?;
    let entries: Vec<CompileCommand> =
        serde_json::from_str(&text).map_err(|err| CollectError::Parse {
            path: database.to_path_buf(),
            message: err.to_string(),
        })?;

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut collected = Vec::new();
    for entry in &entries {
        let source = entry.source_path();
        if seen.contains(&source) || filter.rejects(&source.to_string_lossy()) {
            continue;
        }
        collected.push(source.clone());
        seen.insert(source);

        let headers = match provider.included_headers(entry) {
            Ok(headers) => headers,
            Err(err) => {
                log::warn!("{}", err);
                continue;
            }
        };
        for header in headers {
            if seen.contains(&header) || filter.rejects(&header.to_string_lossy()) {
                continue;
            }
            collected.push(header.clone());
            seen.insert(header);
        }
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubDeps(Vec<Vec<&'static str>>);

    impl DependencyProvider for StubDeps {
        fn included_headers(&self, entry: &CompileCommand) -> Result<Vec<PathBuf>, CollectError> {
            let index: usize = entry
                .command
                .split_whitespace()
                .last()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0);
            Ok(self.0[index].iter().map(PathBuf::from).collect())
        }
    }

    fn write_db(dir: &Path, entries: &[(&str, usize)]) -> PathBuf {
        let db = dir.join("compile_commands.json");
        let body: Vec<serde_json::Value> = entries
            .iter()
            .map(|(file, index)| {
                serde_json::json!({
                    "directory": dir.to_string_lossy(),
                    "file": file,
                    "command": format!("cc -c {} {}", file, index),
                })
            })
            .collect();
        std::fs::write(&db, serde_json::to_string(&body).unwrap()).unwrap();
        db
    }

    fn cpp_filter() -> FileFilter {
        FileFilter::from_patterns::<&str>(&[], &[r".*\.(cpp|h)$"]).unwrap()
    }

    #[test]
    fn missing_database_is_reported_with_its_path() {
        let err = collect_from_database(
            Path::new("/nowhere/compile_commands.json"),
            &cpp_filter(),
            &StubDeps(vec![]),
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/nowhere/compile_commands.json"));
        assert!(message.contains("CMAKE_EXPORT_COMPILE_COMMANDS"));
    }

    #[test]
    fn sources_come_before_their_headers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.cpp"), "").unwrap();
        let db = write_db(dir.path(), &[("a.cpp", 0)]);
        let provider = StubDeps(vec![vec!["/inc/a.h", "/inc/b.h"]]);

        let files = collect_from_database(&db, &cpp_filter(), &provider).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a.cpp"));
        assert_eq!(files[1], PathBuf::from("/inc/a.h"));
        assert_eq!(files[2], PathBuf::from("/inc/b.h"));
    }

    #[test]
    fn duplicate_references_yield_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.cpp"), "").unwrap();
        std::fs::write(dir.path().join("b.cpp"), "").unwrap();
        let db = write_db(dir.path(), &[("a.cpp", 0), ("b.cpp", 0), ("a.cpp", 0)]);
        let provider = StubDeps(vec![vec!["/inc/shared.h"]]);

        let files = collect_from_database(&db, &cpp_filter(), &provider).unwrap();
        let shared: Vec<_> = files
            .iter()
            .filter(|p| p.ends_with("shared.h"))
            .collect();
        assert_eq!(shared.len(), 1);
        let a_entries: Vec<_> = files.iter().filter(|p| p.ends_with("a.cpp")).collect();
        assert_eq!(a_entries.len(), 1);
    }

    #[test]
    fn filtered_sources_are_skipped_entirely() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let db = write_db(dir.path(), &[("a.txt", 0)]);
        let provider = StubDeps(vec![vec!["/inc/a.h"]]);

        let files = collect_from_database(&db, &cpp_filter(), &provider).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn dependency_output_parsing() {
        let output = "a.o: a.cpp \\\n /inc/a.h \\\n /inc/b.h\n";
        assert_eq!(
            parse_dependency_output(output),
            vec!["/inc/a.h".to_string(), "/inc/b.h".to_string()]
        );
    }

    #[test]
    fn output_argument_stripping() {
        let mut args: Vec<String> = ["cc", "-c", "a.cpp", "-o", "a.o"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        strip_output_argument(&mut args);
        assert_eq!(args, vec!["cc", "-c", "a.cpp"]);

        let mut untouched: Vec<String> =
            ["cc", "-c", "a.cpp"].iter().map(|s| s.to_string()).collect();
        strip_output_argument(&mut untouched);
        assert_eq!(untouched, vec!["cc", "-c", "a.cpp"]);
    }
}
