//! engine::runner
//!
//! Execution of tool invocations over file sets.
//!
//! # Scheduling
//!
//! Formatting runs sequentially in batches capped at the tool's declared
//! maximum files per invocation. Analysis runs one file per invocation,
//! distributed over a bounded worker pool (available parallelism minus a
//! small reserve, minimum one worker); results are consumed as they
//! complete, in no particular order.
//!
//! Every invocation is echoed to stdout unless `--quiet`; a non-zero exit
//! counts as one failure and never aborts the remaining batches.

use std::path::Path;
use std::process::{Command, Stdio};

use rayon::prelude::*;

use crate::tools::descriptor::Task;
use crate::tools::{RunOptions, Tool, ToolError};
use crate::ui::output;

/// Size of the analysis worker pool.
pub fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Run a tool's task over its accepted candidates; returns the failure count.
///
/// # Errors
///
/// Option building can fail ([`ToolError::DryRunUnsupported`] and friends);
/// execution failures are counted, not raised.
pub fn run_tool(
    tool: &dyn Tool,
    task: Task,
    candidates: &[String],
    run: &RunOptions,
    root: &Path,
    quiet: bool,
) -> Result<usize, ToolError> {
    if candidates.is_empty() {
        return Ok(0);
    }
    let resolved = tool.resolved().ok_or_else(|| ToolError::NotConfigured {
        tool: tool.name().to_string(),
    })?;
    let exe = resolved.path.clone();
    let task_options = tool.task_options(task, run)?;
    let user_options = tool.settings().options();
    let languages = tool
        .descriptor()
        .task(task)
        .map(|spec| {
            spec.languages
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default();

    let invoke = |files: &[String]| -> bool {
        run_one(
            &exe,
            &user_options,
            &task_options,
            files,
            root,
            quiet,
            &languages,
        )
    };

    if task.modifies_files() {
        let max = tool
            .descriptor()
            .capabilities
            .max_files_per_invocation
            .max(1);
        let mut failures = 0;
        for chunk in candidates.chunks(max) {
            if !invoke(chunk) {
                failures += 1;
            }
        }
        Ok(failures)
    } else {
        let failures = match rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count())
            .build()
        {
            Ok(pool) => pool.install(|| {
                candidates
                    .par_iter()
                    .filter(|file| !invoke(std::slice::from_ref(*file)))
                    .count()
            }),
            Err(err) => {
                log::warn!("worker pool unavailable ({}), running sequentially", err);
                candidates
                    .iter()
                    .filter(|file| !invoke(std::slice::from_ref(*file)))
                    .count()
            }
        };
        Ok(failures)
    }
}

/// Spawn a single invocation. Returns `true` on success.
fn run_one(
    exe: &Path,
    user_options: &[String],
    task_options: &[String],
    files: &[String],
    root: &Path,
    quiet: bool,
    languages: &str,
) -> bool {
    let mut display = vec![exe.to_string_lossy().into_owned()];
    display.extend(user_options.iter().cloned());
    display.extend(task_options.iter().cloned());
    display.extend(files.iter().cloned());
    output::echo_command(&display, quiet);

    let mut command = Command::new(exe);
    command
        .args(user_options)
        .args(task_options)
        .args(files)
        .current_dir(root);
    // Tool output is only shown from -v upward; the summary line below
    // names the offending files either way.
    if !log::log_enabled!(log::Level::Info) {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    match command.status() {
        Ok(status) if status.success() => true,
        Ok(_) => {
            log::error!("{} | task failed on: {}", languages, files.join(" "));
            false
        }
        Err(err) => {
            log::error!("failed to run {}: {}", exe.display(), err);
            false
        }
    }
}
