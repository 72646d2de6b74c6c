//! static-analysis commands - Report issues without modifying files

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{parse_changeset, parse_languages};
use crate::engine::{Context, Project, TaskRequest};
use crate::tools::descriptor::Task;
use crate::tools::RunOptions;

/// Run the static-analysis task.
pub fn static_analysis(
    ctx: &Context,
    lang: Option<&str>,
    compile_commands: Option<PathBuf>,
    applies_on: Option<&str>,
    sources: Vec<PathBuf>,
) -> Result<usize> {
    run_analysis(
        ctx,
        Task::StaticAnalysis,
        parse_languages(lang)?,
        compile_commands,
        applies_on,
        sources,
    )
}

/// Run the clang-tidy task (the C++ slice of static analysis).
pub fn clang_tidy(
    ctx: &Context,
    compile_commands: Option<PathBuf>,
    applies_on: Option<&str>,
    sources: Vec<PathBuf>,
) -> Result<usize> {
    run_analysis(
        ctx,
        Task::ClangTidy,
        None,
        compile_commands,
        applies_on,
        sources,
    )
}

fn run_analysis(
    ctx: &Context,
    task: Task,
    languages: Option<Vec<crate::tools::descriptor::Language>>,
    compile_commands: Option<PathBuf>,
    applies_on: Option<&str>,
    sources: Vec<PathBuf>,
) -> Result<usize> {
    let request = TaskRequest {
        task,
        languages,
        sources,
        run: RunOptions {
            dry_run: false,
            compile_commands,
        },
        changeset: parse_changeset(applies_on)?,
    };
    let mut project = Project::open(ctx).context("Failed to open project")?;
    project
        .run_task(ctx, &request)
        .with_context(|| format!("{} task failed", task))
}
