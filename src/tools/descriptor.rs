//! tools::descriptor
//!
//! Static metadata for every wrapped tool.
//!
//! # Design
//!
//! A [`ToolDescriptor`] is the single source of truth for what a tool can
//! do: which tasks it provides for which languages, how its executable is
//! named and versioned, how many files one invocation may receive, and how
//! its configuration file is generated. The dispatcher never hard-codes a
//! tool-to-language association; it always goes through the registry.
//!
//! Descriptors are plain statics - created once, never mutated.

use std::fmt;
use std::str::FromStr;

use crate::core::config::merge::Transformers;

/// Pattern extracting a version number from a tool's version banner.
pub const DEFAULT_VERSION_PATTERN: &str = r"([0-9]+\.[0-9]+(?:\.[0-9]+)?[ab]?)";

/// A task groom can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Rewrite files into canonical formatting.
    Format,
    /// Report issues without modifying anything.
    StaticAnalysis,
    /// The clang-tidy analyzer on its own.
    ClangTidy,
}

impl Task {
    /// The task's command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Task::Format => "format",
            Task::StaticAnalysis => "static-analysis",
            Task::ClangTidy => "clang-tidy",
        }
    }

    /// One-line description used in help output and warnings.
    pub fn description(self) -> &'static str {
        match self {
            Task::Format => "Code formatter utility",
            Task::StaticAnalysis => "Code static analyzer",
            Task::ClangTidy => "C++ code static analyzer",
        }
    }

    /// Whether tools running this task may rewrite files in place.
    pub fn modifies_files(self) -> bool {
        matches!(self, Task::Format)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A language a task can be filtered down to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Cpp,
    CMake,
    Python,
}

impl Language {
    /// Lower-case name as used by `--lang`.
    pub fn name(self) -> &'static str {
        match self {
            Language::Cpp => "c++",
            Language::CMake => "cmake",
            Language::Python => "python",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "c++" | "cpp" => Ok(Language::Cpp),
            "cmake" => Ok(Language::CMake),
            "python" => Ok(Language::Python),
            other => Err(format!("unknown language: '{}'", other)),
        }
    }
}

/// How a tool relates to the Python package index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipPackage {
    /// Not installable with pip.
    No,
    /// Installable; the package shares the tool's name.
    SameName,
    /// Installable under a different (or extended) package name.
    Named(&'static str),
}

impl PipPackage {
    /// The pip package name for a tool, if the tool is pip-installable.
    pub fn package_for(self, tool_name: &str) -> Option<String> {
        match self {
            PipPackage::No => None,
            PipPackage::SameName => Some(tool_name.to_string()),
            PipPackage::Named(name) => Some(name.to_string()),
        }
    }
}

/// Invocation-shape capabilities of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether directories can be passed directly instead of file lists.
    pub accepts_directories: bool,
    /// Maximum number of files per command line.
    pub max_files_per_invocation: usize,
    /// Relationship to the Python package index.
    pub pip_package: PipPackage,
}

/// One task a tool provides, with its per-task options.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    /// The task.
    pub task: Task,
    /// Languages the tool covers for this task.
    pub languages: &'static [Language],
    /// Options performing the task for real.
    pub options: &'static [&'static str],
    /// Options for a report-only pass; `None` when the task cannot dry-run.
    pub dry_run_options: Option<&'static [&'static str]>,
}

/// Static description of one wrapped tool.
pub struct ToolDescriptor {
    /// Configuration key, e.g. `ClangFormat`.
    pub id: &'static str,
    /// Executable base name, e.g. `clang-format`.
    pub name: &'static str,
    /// Pattern matching versioned executable names (`clang-format-14`).
    pub name_pattern: Option<&'static str>,
    /// Pattern rejecting look-alike executables (`clang-format-diff`).
    pub name_exclude_pattern: Option<&'static str>,
    /// Arguments that make the tool print its version.
    pub version_args: &'static [&'static str],
    /// Pattern extracting the version number from that output.
    pub version_pattern: &'static str,
    /// Invocation-shape capabilities.
    pub capabilities: Capabilities,
    /// Tasks the tool provides.
    pub tasks: &'static [TaskSpec],
    /// Name of the generated configuration file at the repository root.
    pub config_file: Option<&'static str>,
    /// Name of the user-maintained delta file merged into the generated one.
    pub custom_config_file: Option<&'static str>,
    /// Per-key transformers applied when merging the delta.
    pub config_transformers: Transformers<'static>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl ToolDescriptor {
    /// The spec for a task, if the tool provides it.
    pub fn task(&self, task: Task) -> Option<&'static TaskSpec> {
        self.tasks.iter().find(|spec| spec.task == task)
    }

    /// Whether the tool provides a task at all.
    pub fn provides(&self, task: Task) -> bool {
        self.task(task).is_some()
    }

    /// Environment variable overriding this tool's executable:
    /// the name upper-cased with non-alphanumerics replaced by `_`.
    pub fn env_var(&self) -> String {
        self.name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// File name of the versioned default config (`clang-format-14`).
    pub fn versioned_default_config(&self, major: u64) -> String {
        format!("{}-{}", self.name, major)
    }

    /// File name of the unversioned default config: the generated config
    /// name with its leading dot stripped.
    pub fn fallback_default_config(&self) -> Option<String> {
        self.config_file
            .map(|name| name.trim_start_matches('.').to_string())
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// All known tools, in dispatch order.
pub fn registry() -> &'static [ToolDescriptor] {
    static REGISTRY: &[ToolDescriptor] = &[
        ToolDescriptor {
            id: "ClangFormat",
            name: "clang-format",
            name_pattern: Some(r"clang-format-[-a-z0-9.]+$"),
            name_exclude_pattern: Some(r".*-diff(\.[a-z]+)?$"),
            version_args: &["--version"],
            version_pattern: DEFAULT_VERSION_PATTERN,
            capabilities: Capabilities {
                accepts_directories: false,
                max_files_per_invocation: 30,
                pip_package: PipPackage::SameName,
            },
            tasks: &[TaskSpec {
                task: Task::Format,
                languages: &[Language::Cpp],
                options: &["-i"],
                dry_run_options: Some(&["--dry-run", "--ferror-limit", "1", "--Werror"]),
            }],
            config_file: Some(".clang-format"),
            custom_config_file: Some(".clang-format.changes"),
            config_transformers: &[],
        },
        ToolDescriptor {
            id: "CMakeFormat",
            name: "cmake-format",
            name_pattern: None,
            name_exclude_pattern: None,
            version_args: &["--version"],
            version_pattern: DEFAULT_VERSION_PATTERN,
            capabilities: Capabilities {
                accepts_directories: false,
                max_files_per_invocation: 30,
                pip_package: PipPackage::Named("cmake-format[YAML]"),
            },
            tasks: &[TaskSpec {
                task: Task::Format,
                languages: &[Language::CMake],
                options: &["-i"],
                dry_run_options: Some(&["--check"]),
            }],
            config_file: Some(".cmake-format.yaml"),
            custom_config_file: Some(".cmake-format.changes.yaml"),
            config_transformers: &[],
        },
        ToolDescriptor {
            id: "ClangTidy",
            name: "clang-tidy",
            name_pattern: Some(r"clang-tidy-[-a-z0-9.]+$"),
            name_exclude_pattern: Some(r".*-diff(\.[a-z]+)?$"),
            version_args: &["--version"],
            version_pattern: DEFAULT_VERSION_PATTERN,
            capabilities: Capabilities {
                accepts_directories: false,
                max_files_per_invocation: 30,
                pip_package: PipPackage::No,
            },
            tasks: &[
                TaskSpec {
                    task: Task::StaticAnalysis,
                    languages: &[Language::Cpp],
                    options: &[],
                    dry_run_options: None,
                },
                TaskSpec {
                    task: Task::ClangTidy,
                    languages: &[Language::Cpp],
                    options: &[],
                    dry_run_options: None,
                },
            ],
            config_file: Some(".clang-tidy"),
            custom_config_file: Some(".clang-tidy.changes.yaml"),
            config_transformers: &[("Checks", crate::tools::clang_tidy::merge_checks_values)],
        },
        ToolDescriptor {
            id: "Flake8",
            name: "flake8",
            name_pattern: None,
            name_exclude_pattern: None,
            version_args: &["--version"],
            version_pattern: DEFAULT_VERSION_PATTERN,
            capabilities: Capabilities {
                accepts_directories: true,
                max_files_per_invocation: 30,
                pip_package: PipPackage::SameName,
            },
            tasks: &[TaskSpec {
                task: Task::StaticAnalysis,
                languages: &[Language::Python],
                options: &[],
                dry_run_options: None,
            }],
            config_file: None,
            custom_config_file: None,
            config_transformers: &[],
        },
        ToolDescriptor {
            id: "Black",
            name: "black",
            name_pattern: None,
            name_exclude_pattern: None,
            version_args: &["--version"],
            version_pattern: DEFAULT_VERSION_PATTERN,
            capabilities: Capabilities {
                accepts_directories: true,
                max_files_per_invocation: 30,
                pip_package: PipPackage::SameName,
            },
            tasks: &[TaskSpec {
                task: Task::Format,
                languages: &[Language::Python],
                options: &[],
                dry_run_options: Some(&["--check"]),
            }],
            config_file: None,
            custom_config_file: None,
            config_transformers: &[],
        },
    ];
    REGISTRY
}

/// Look a descriptor up by its configuration key.
pub fn find(id: &str) -> Option<&'static ToolDescriptor> {
    registry().iter().find(|desc| desc.id == id)
}

/// Every language some registered tool covers for a task.
pub fn supported_languages(task: Task) -> Vec<Language> {
    let mut languages: Vec<Language> = registry()
        .iter()
        .filter_map(|desc| desc.task(task))
        .flat_map(|spec| spec.languages.iter().copied())
        .collect();
    languages.sort();
    languages.dedup();
    languages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_uppercases_and_replaces() {
        let desc = find("ClangFormat").unwrap();
        assert_eq!(desc.env_var(), "CLANG_FORMAT");
    }

    #[test]
    fn task_lookup_follows_registry() {
        let clang_tidy = find("ClangTidy").unwrap();
        assert!(clang_tidy.provides(Task::StaticAnalysis));
        assert!(clang_tidy.provides(Task::ClangTidy));
        assert!(!clang_tidy.provides(Task::Format));
    }

    #[test]
    fn format_languages_span_registered_formatters() {
        let langs = supported_languages(Task::Format);
        assert_eq!(langs, vec![Language::Cpp, Language::CMake, Language::Python]);
    }

    #[test]
    fn clang_tidy_task_is_cpp_only() {
        assert_eq!(supported_languages(Task::ClangTidy), vec![Language::Cpp]);
    }

    #[test]
    fn versioned_config_names() {
        let desc = find("ClangFormat").unwrap();
        assert_eq!(desc.versioned_default_config(14), "clang-format-14");
        assert_eq!(desc.fallback_default_config().unwrap(), "clang-format");
    }

    #[test]
    fn language_parsing_is_case_insensitive() {
        assert_eq!("C++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("CMake".parse::<Language>().unwrap(), Language::CMake);
        assert!("rust".parse::<Language>().is_err());
    }
}
