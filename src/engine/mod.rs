//! engine
//!
//! Task dispatch: the coordinator turning a task request into tool
//! invocations.
//!
//! # Lifecycle
//!
//! Every task follows the same lifecycle:
//!
//! 1. **Select**: pick the tools whose descriptor provides the task for a
//!    requested language (the descriptor registry is the single source of
//!    truth; nothing here hard-codes tool-to-language pairs)
//! 2. **Configure**: resolve each tool's executable and prepare its
//!    generated configuration file (idempotent, cached per run)
//! 3. **Collect**: enumerate candidate files - explicit arguments, the
//!    tracked-file listing, or a compilation-database walk - optionally
//!    narrowed to a changeset
//! 4. **Partition**: each tool keeps the candidates its include/exclude
//!    filter accepts
//! 5. **Run**: invoke the tool in bounded batches, counting failures
//!
//! Failures never abort the loop; the aggregate count becomes the process
//! exit status.

pub mod runner;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::collect::{collect_from_database, CollectError, CompilerDeps};
use crate::core::config::{ConfigError, ProjectConfig};
use crate::core::paths::{Paths, USER_CONFIG_FILE};
use crate::git::{Changeset, Git, GitError};
use crate::tools::descriptor::{registry, supported_languages, Language, Task};
use crate::tools::{build, prepare_config, ResolveError, RunOptions, Tool, ToolContext, ToolError};

/// Execution context for a task invocation, built from global CLI flags.
///
/// Diagnostic verbosity is not carried here; it configures the global
/// logger once at startup.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Run as if started in this directory.
    pub cwd: Option<PathBuf>,
    /// Silence the command echo.
    pub quiet: bool,
}

/// Errors aborting a task before or between tool invocations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Configuration loading or merging failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A repository query failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A tool's executable could not be resolved.
    #[error("{tool}: {source}")]
    Resolve {
        /// The tool that failed to resolve
        tool: String,
        /// The underlying resolution error
        source: ResolveError,
    },

    /// Tool preparation or option building failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Candidate collection failed.
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// The working directory could not be determined.
    #[error("failed to determine working directory: {0}")]
    Cwd(std::io::Error),
}

/// A task invocation, assembled by the CLI layer.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// The task to run.
    pub task: Task,
    /// Language filter; `None` means every language the task supports.
    pub languages: Option<Vec<Language>>,
    /// Explicit file or directory arguments; empty means the whole codebase.
    pub sources: Vec<PathBuf>,
    /// Per-invocation extras (dry-run, compilation database).
    pub run: RunOptions,
    /// Optional changeset narrowing the candidates to modified files.
    pub changeset: Option<Changeset>,
}

impl TaskRequest {
    /// A request covering the whole codebase with default options.
    pub fn new(task: Task) -> Self {
        Self {
            task,
            languages: None,
            sources: Vec::new(),
            run: RunOptions::default(),
            changeset: None,
        }
    }
}

/// An opened project: repository doorway, path conventions, and the tools
/// the merged configuration enables.
pub struct Project {
    paths: Paths,
    git: Git,
    cwd: PathBuf,
    tools: Vec<Box<dyn Tool>>,
}

impl Project {
    /// Discover the repository around the working directory and load the
    /// merged configuration.
    pub fn open(ctx: &Context) -> Result<Self, TaskError> {
        let cwd = match &ctx.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(TaskError::Cwd)?,
        };
        let git = Git::open(&cwd)?;
        let paths = Paths::new(git.root().to_path_buf());
        let config = ProjectConfig::load(&paths, &cwd)?;
        let tools = Self::build_tools(&config)?;
        Ok(Self {
            paths,
            git,
            cwd,
            tools,
        })
    }

    fn build_tools(config: &ProjectConfig) -> Result<Vec<Box<dyn Tool>>, ConfigError> {
        let mut tools = Vec::new();
        for descriptor in registry() {
            if let Some(settings) = config.tools.get(descriptor.id) {
                tools.push(build(descriptor, settings.clone())?);
            }
        }
        for name in config.tools.keys() {
            if !registry().iter().any(|d| d.id == name) {
                log::warn!("configuration names unknown tool '{}'", name);
            }
        }
        Ok(tools)
    }

    /// Indices of the tools providing `task` for the requested languages.
    fn select_tools(&self, task: Task, languages: Option<&[Language]>) -> Vec<usize> {
        let requested: Vec<Language> = match languages {
            Some(list) => list.to_vec(),
            None => supported_languages(task),
        };
        self.tools
            .iter()
            .enumerate()
            .filter(|(_, tool)| {
                tool.descriptor()
                    .task(task)
                    .is_some_and(|spec| spec.languages.iter().any(|l| requested.contains(l)))
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Execute a task; returns the number of failed jobs.
    pub fn run_task(&mut self, ctx: &Context, req: &TaskRequest) -> Result<usize, TaskError> {
        let selected = self.select_tools(req.task, req.languages.as_deref());
        if selected.is_empty() {
            log::warn!(
                "no tool enabled for task {}; consider editing file {} at the root of your project",
                req.task,
                USER_CONFIG_FILE
            );
            return Ok(0);
        }

        let tool_ctx = ToolContext::new(&self.paths, &self.git);
        for &index in &selected {
            let name = self.tools[index].name().to_string();
            self.tools[index]
                .configure(&tool_ctx)
                .map_err(|source| TaskError::Resolve { tool: name, source })?;
            prepare_config(self.tools[index].as_ref(), &tool_ctx)?;
        }

        let (dirs, files) = self.split_sources(&req.sources);
        let all_accept_dirs = selected.iter().all(|&i| {
            self.tools[i].descriptor().capabilities.accepts_directories
        });
        let listing_needed = req.sources.is_empty() || (!dirs.is_empty() && !all_accept_dirs);
        let listing: Vec<PathBuf> = if listing_needed {
            self.git.tracked_files(&dirs)?
        } else {
            Vec::new()
        };

        let changed = self.changed_set(req.changeset.as_ref())?;

        let mut failures = 0;
        for &index in &selected {
            let tool = &self.tools[index];
            let accepted = self.candidates_for(
                tool.as_ref(),
                req,
                &dirs,
                &files,
                &listing,
                changed.as_ref(),
            )?;
            failures += runner::run_tool(
                tool.as_ref(),
                req.task,
                &accepted,
                &req.run,
                self.git.root(),
                ctx.quiet,
            )?;
        }

        if failures != 0 {
            log::error!("{} jobs failed", failures);
        }
        Ok(failures)
    }

    /// Partition explicit sources into directories and files, absolutized
    /// against the working directory.
    fn split_sources(&self, sources: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for source in sources {
            let absolute = if source.is_absolute() {
                source.clone()
            } else {
                self.cwd.join(source)
            };
            if absolute.is_dir() {
                dirs.push(absolute);
            } else {
                files.push(absolute);
            }
        }
        (dirs, files)
    }

    /// The set of changed files, when a changeset is requested.
    fn changed_set(
        &self,
        changeset: Option<&Changeset>,
    ) -> Result<Option<BTreeSet<PathBuf>>, TaskError> {
        let Some(changeset) = changeset else {
            return Ok(None);
        };
        let Some(delta) = self.git.delta_for(changeset)? else {
            return Ok(None);
        };
        log::info!("narrowing candidates to {}", delta);
        Ok(Some(self.git.changed_files(&delta)?))
    }

    /// Build one tool's accepted candidate list.
    fn candidates_for(
        &self,
        tool: &dyn Tool,
        req: &TaskRequest,
        dirs: &[PathBuf],
        files: &[PathBuf],
        listing: &[PathBuf],
        changed: Option<&BTreeSet<PathBuf>>,
    ) -> Result<Vec<String>, TaskError> {
        // Analyzer runs pointed at a compilation database collect from it,
        // headers included, already filtered per tool.
        if let (Some(database), false) = (&req.run.compile_commands, req.task.modifies_files()) {
            let collected = collect_from_database(database, tool.filter(), &CompilerDeps)?;
            let narrowed = self.narrow(collected, changed);
            return Ok(narrowed
                .into_iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect());
        }

        let accepts_dirs = tool.descriptor().capabilities.accepts_directories;
        let mut candidates: Vec<PathBuf> = files.to_vec();
        if req.sources.is_empty() || (!dirs.is_empty() && !accepts_dirs) {
            candidates.extend(listing.iter().cloned());
        }

        let mut accepted: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| tool.accepts_file(&path.to_string_lossy()))
            .collect();
        accepted = self.narrow(accepted, changed);

        let mut args: Vec<String> = accepted
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        // Directory arguments are handed through verbatim to tools that
        // take them; the include/exclude filter applies to files only.
        if accepts_dirs {
            args.extend(dirs.iter().map(|d| d.to_string_lossy().into_owned()));
        }
        Ok(args)
    }

    /// Keep only candidates inside the changed set, comparing resolved
    /// absolute paths.
    fn narrow(&self, candidates: Vec<PathBuf>, changed: Option<&BTreeSet<PathBuf>>) -> Vec<PathBuf> {
        let Some(changed) = changed else {
            return candidates;
        };
        let resolved_changed: BTreeSet<PathBuf> = changed
            .iter()
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
            .collect();
        candidates
            .into_iter()
            .filter(|candidate| {
                let absolute = if candidate.is_absolute() {
                    candidate.clone()
                } else {
                    self.git.root().join(candidate)
                };
                let resolved = absolute.canonicalize().unwrap_or(absolute);
                resolved_changed.contains(&resolved)
            })
            .collect()
    }

    /// The repository root this project operates on.
    pub fn root(&self) -> &Path {
        self.git.root()
    }

    /// The tools the merged configuration enables, in registry order.
    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }
}
