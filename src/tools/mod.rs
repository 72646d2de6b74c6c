//! tools
//!
//! The tool abstraction: static descriptors, executable resolution, and
//! per-tool configuration preparation.
//!
//! # Architecture
//!
//! [`descriptor`] holds the immutable registry of known tools. The
//! [`Tool`] trait is the seam the dispatcher works against: a generic
//! [`ExecutableTool`] covers every ordinary command-line tool, and
//! [`clang_tidy::ClangTidy`] specializes option building for the analyzer.
//! [`resolver`] finds an executable satisfying the configured version
//! requirement, provisioning the isolated package environment when the
//! ambient system has none.
//!
//! # Lifecycle
//!
//! Tools are built from merged configuration, `configure`d once per run
//! (idempotent), have their generated config files prepared, and are then
//! handed files by the dispatcher in batches.

pub mod clang_tidy;
pub mod descriptor;
pub mod resolver;

pub use descriptor::{Language, Task, ToolDescriptor};
pub use resolver::{Resolved, ResolveError};

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use semver::VersionReq;
use thiserror::Error;

use crate::core::config::merge::{merge_yaml_files, MergeOutcome};
use crate::core::config::{ConfigError, ToolSettings};
use crate::core::filter::FileFilter;
use crate::core::paths::Paths;
use crate::git::Git;
use crate::pyenv::PackageEnv;

/// Errors from tool preparation and option building.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A task was requested from a tool that does not provide it.
    #[error("{tool}: does not provide task '{task}'")]
    UnsupportedTask {
        /// The tool
        tool: String,
        /// The requested task
        task: Task,
    },

    /// `--dry-run` was requested but the task defines no report-only mode.
    #[error("{tool}: error: dry-run: unsupported option")]
    DryRunUnsupported {
        /// The tool
        tool: String,
    },

    /// The tool was asked to run before being bound to an executable.
    #[error("{tool}: configure must be called before running")]
    NotConfigured {
        /// The tool
        tool: String,
    },

    /// No default configuration file exists for the detected version.
    #[error("could not find appropriate config file for {tool} {version}")]
    NoDefaultConfig {
        /// The tool
        tool: String,
        /// The detected version
        version: String,
    },

    /// Configuration file I/O or merge failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Per-invocation extras carried from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Report issues without rewriting files.
    pub dry_run: bool,
    /// Compilation database handed to analyzers.
    pub compile_commands: Option<PathBuf>,
}

/// Shared state for configuring tools: path conventions, the repository
/// doorway, and the lazily-created package environment.
///
/// The environment handle is created at most once per run and shared by
/// every tool that needs provisioning.
pub struct ToolContext<'a> {
    /// Path conventions.
    pub paths: &'a Paths,
    /// Repository doorway.
    pub git: &'a Git,
    env: OnceCell<PackageEnv>,
}

impl<'a> ToolContext<'a> {
    /// Build a context.
    pub fn new(paths: &'a Paths, git: &'a Git) -> Self {
        Self {
            paths,
            git,
            env: OnceCell::new(),
        }
    }

    /// The isolated package environment handle (directory may not exist
    /// yet; provisioning happens on demand).
    pub fn package_env(&self) -> &PackageEnv {
        self.env
            .get_or_init(|| PackageEnv::new(self.paths.package_env_dir()))
    }
}

/// The seam the dispatcher works against.
pub trait Tool: Send + Sync {
    /// Static metadata.
    fn descriptor(&self) -> &'static ToolDescriptor;

    /// Merged user settings.
    fn settings(&self) -> &ToolSettings;

    /// The tool's include/exclude file filter.
    fn filter(&self) -> &FileFilter;

    /// The resolved executable, once [`Tool::configure`] has run.
    fn resolved(&self) -> Option<&Resolved>;

    /// Bind the tool to a concrete executable and version. Idempotent.
    fn configure(&mut self, ctx: &ToolContext<'_>) -> Result<(), ResolveError>;

    /// Command-line options for one task invocation.
    fn task_options(&self, task: Task, run: &RunOptions) -> Result<Vec<String>, ToolError>;

    /// The executable base name.
    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Whether this tool processes the given file.
    fn accepts_file(&self, path: &str) -> bool {
        self.filter().accepts(path)
    }
}

/// Generic wrapper for an ordinary command-line tool.
#[derive(Debug)]
pub struct ExecutableTool {
    descriptor: &'static ToolDescriptor,
    settings: ToolSettings,
    filter: FileFilter,
    version_req: Option<VersionReq>,
    resolved: Option<Resolved>,
}

impl ExecutableTool {
    /// Build from merged user settings, compiling filters and the version
    /// requirement up front so configuration errors surface before any
    /// tool runs.
    pub fn from_config(
        descriptor: &'static ToolDescriptor,
        settings: ToolSettings,
    ) -> Result<Self, ConfigError> {
        let filter = FileFilter::from_patterns(
            &settings.exclude_patterns(),
            &settings.include_patterns(),
        )
        .map_err(|source| ConfigError::Pattern {
            tool: descriptor.id.to_string(),
            source,
        })?;
        let version_req = settings
            .version
            .as_deref()
            .map(VersionReq::parse)
            .transpose()
            .map_err(|source| ConfigError::VersionReq {
                tool: descriptor.id.to_string(),
                requirement: settings.version.clone().unwrap_or_default(),
                source,
            })?;
        Ok(Self {
            descriptor,
            settings,
            filter,
            version_req,
            resolved: None,
        })
    }
}

impl Tool for ExecutableTool {
    fn descriptor(&self) -> &'static ToolDescriptor {
        self.descriptor
    }

    fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    fn filter(&self) -> &FileFilter {
        &self.filter
    }

    fn resolved(&self) -> Option<&Resolved> {
        self.resolved.as_ref()
    }

    fn configure(&mut self, ctx: &ToolContext<'_>) -> Result<(), ResolveError> {
        if self.resolved.is_some() {
            return Ok(());
        }
        let resolved = resolver::resolve(
            self.descriptor,
            self.settings.path.as_deref(),
            self.version_req.as_ref(),
            self.settings.version.as_deref(),
            &self.settings.requirements,
            ctx.package_env(),
        )?;
        self.resolved = Some(resolved);
        Ok(())
    }

    fn task_options(&self, task: Task, run: &RunOptions) -> Result<Vec<String>, ToolError> {
        let spec = self
            .descriptor
            .task(task)
            .ok_or_else(|| ToolError::UnsupportedTask {
                tool: self.descriptor.name.to_string(),
                task,
            })?;
        let options = if run.dry_run {
            spec.dry_run_options
                .ok_or_else(|| ToolError::DryRunUnsupported {
                    tool: self.descriptor.name.to_string(),
                })?
        } else {
            spec.options
        };
        Ok(options.iter().map(|s| s.to_string()).collect())
    }
}

/// Build the tool for a registry entry, picking the right specialization.
pub fn build(
    descriptor: &'static ToolDescriptor,
    settings: ToolSettings,
) -> Result<Box<dyn Tool>, ConfigError> {
    match descriptor.id {
        "ClangTidy" => Ok(Box::new(clang_tidy::ClangTidy::from_config(
            descriptor, settings,
        )?)),
        _ => Ok(Box::new(ExecutableTool::from_config(descriptor, settings)?)),
    }
}

/// Pick the default configuration file matching the tool's version:
/// `<name>-<major>` walking the major version downward, then the
/// unversioned file name.
fn default_config_file(
    descriptor: &ToolDescriptor,
    resolved: Option<&Resolved>,
    paths: &Paths,
) -> Result<PathBuf, ToolError> {
    if let Some(resolved) = resolved {
        let mut major = resolved.version.major as i64;
        while major >= 0 {
            let candidate =
                paths.default_tool_config(&descriptor.versioned_default_config(major as u64));
            if candidate.exists() {
                return Ok(candidate);
            }
            major -= 1;
        }
    }
    if let Some(name) = descriptor.fallback_default_config() {
        let candidate = paths.default_tool_config(&name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ToolError::NoDefaultConfig {
        tool: descriptor.name.to_string(),
        version: resolved
            .map(|r| r.version.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

fn file_mtime(path: &Path) -> Result<std::time::SystemTime, ConfigError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Set up the tool's configuration file at the repository root.
///
/// A config file already tracked by version control is left untouched -
/// that escape hatch lets a project hand-maintain its own copy. Otherwise
/// the versioned default is merged with the project's delta file (when one
/// exists) or copied outright, in both cases only when stale.
pub fn prepare_config(tool: &dyn Tool, ctx: &ToolContext<'_>) -> Result<(), ToolError> {
    let descriptor = tool.descriptor();
    let Some(config_name) = descriptor.config_file else {
        return Ok(());
    };
    let config_path = ctx.paths.generated_config(config_name);
    if ctx.git.is_tracked(Path::new(config_name)) && config_path.exists() {
        log::info!("{} config is tracked by git, nothing to do.", descriptor);
        return Ok(());
    }

    let default_file = default_config_file(descriptor, tool.resolved(), ctx.paths)?;

    let custom = descriptor
        .custom_config_file
        .map(|name| ctx.paths.generated_config(name))
        .filter(|path| path.exists());
    if let Some(custom) = custom {
        log::info!("merging custom {} changes", descriptor);
        let outcome = merge_yaml_files(
            &[&default_file, &custom],
            &config_path,
            descriptor.config_transformers,
        )?;
        if outcome == MergeOutcome::Abandoned {
            log::error!(
                "{}: configuration merge abandoned; {} left untouched",
                descriptor,
                config_path.display()
            );
        }
        return Ok(());
    }

    let stale = !config_path.exists() || file_mtime(&config_path)? < file_mtime(&default_file)?;
    if stale {
        log::info!(
            "copying default config {} to {}",
            default_file.display(),
            ctx.paths.repo_root.display()
        );
        std::fs::copy(&default_file, &config_path).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
    } else {
        log::info!("{} config is up to date with the default config", descriptor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::descriptor::find;

    #[test]
    fn generic_tool_builds_filter_from_settings() {
        let desc = find("ClangFormat").unwrap();
        let settings: ToolSettings = serde_yaml::from_str(
            "include:\n  match: '.*\\.cpp$'\nexclude:\n  match: 'third_party/.*'\n",
        )
        .unwrap();
        let tool = ExecutableTool::from_config(desc, settings).unwrap();
        assert!(tool.accepts_file("src/main.cpp"));
        assert!(!tool.accepts_file("third_party/x.cpp"));
        assert!(!tool.accepts_file("README.md"));
    }

    #[test]
    fn bad_include_pattern_is_a_config_error() {
        let desc = find("ClangFormat").unwrap();
        let settings: ToolSettings =
            serde_yaml::from_str("include:\n  match: '(unclosed'\n").unwrap();
        let err = ExecutableTool::from_config(desc, settings).unwrap_err();
        assert!(matches!(err, ConfigError::Pattern { .. }));
    }

    #[test]
    fn bad_version_requirement_is_a_config_error() {
        let desc = find("ClangFormat").unwrap();
        let settings: ToolSettings = serde_yaml::from_str("version: 'not a req'\n").unwrap();
        let err = ExecutableTool::from_config(desc, settings).unwrap_err();
        assert!(matches!(err, ConfigError::VersionReq { .. }));
    }

    #[test]
    fn dry_run_without_support_errors() {
        let desc = find("Flake8").unwrap();
        let tool = ExecutableTool::from_config(desc, Default::default()).unwrap();
        let run = RunOptions {
            dry_run: true,
            compile_commands: None,
        };
        // flake8 provides static-analysis only, and that task has no
        // report-only option set of its own.
        let err = tool.task_options(Task::StaticAnalysis, &run).unwrap_err();
        assert!(matches!(err, ToolError::DryRunUnsupported { .. }));
    }

    #[test]
    fn format_options_switch_on_dry_run() {
        let desc = find("ClangFormat").unwrap();
        let tool = ExecutableTool::from_config(desc, Default::default()).unwrap();
        let normal = tool
            .task_options(Task::Format, &RunOptions::default())
            .unwrap();
        assert_eq!(normal, vec!["-i".to_string()]);
        let dry = tool
            .task_options(
                Task::Format,
                &RunOptions {
                    dry_run: true,
                    compile_commands: None,
                },
            )
            .unwrap();
        assert_eq!(dry, vec!["--dry-run", "--ferror-limit", "1", "--Werror"]);
    }
}
