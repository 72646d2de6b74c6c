//! format command - Rewrite files into canonical formatting

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::{parse_changeset, parse_languages};
use crate::engine::{Context, Project, TaskRequest};
use crate::tools::descriptor::Task;
use crate::tools::RunOptions;

/// Run the format task.
///
/// # Arguments
///
/// * `lang` - Comma-separated language filter
/// * `dry_run` - Report issues instead of rewriting files
/// * `applies_on` - Optional changeset narrowing
/// * `sources` - Explicit files or directories; empty means the codebase
pub fn format(
    ctx: &Context,
    lang: Option<&str>,
    dry_run: bool,
    applies_on: Option<&str>,
    sources: Vec<PathBuf>,
) -> Result<usize> {
    let request = TaskRequest {
        task: Task::Format,
        languages: parse_languages(lang)?,
        sources,
        run: RunOptions {
            dry_run,
            compile_commands: None,
        },
        changeset: parse_changeset(applies_on)?,
    };
    let mut project = Project::open(ctx).context("Failed to open project")?;
    project
        .run_task(ctx, &request)
        .context("format task failed")
}
