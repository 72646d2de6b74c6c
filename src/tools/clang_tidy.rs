//! tools::clang_tidy
//!
//! clang-tidy specialization.
//!
//! clang-tidy differs from the generic executable wrapper in two ways:
//! its invocation wants a compilation database (`-p <build-path>`) instead
//! of fixed per-task options, and its generated configuration carries a
//! `Checks` key that must be merged with negation-aware rule semantics
//! rather than replaced.

use serde_yaml::Value;

use crate::core::config::{ConfigError, ToolSettings};
use crate::core::filter::FileFilter;
use crate::core::rules::merge_rule_lists;
use crate::tools::descriptor::{Task, ToolDescriptor};
use crate::tools::resolver::{Resolved, ResolveError};
use crate::tools::{ExecutableTool, RunOptions, Tool, ToolContext, ToolError};

/// `Checks` transformer for the generated-config merge: combine the
/// comma-separated rule lists instead of replacing the base value.
pub fn merge_checks_values(old: Option<&Value>, new: &Value) -> Value {
    match new.as_str() {
        Some(delta) => {
            let base = old.and_then(Value::as_str);
            Value::from(merge_rule_lists(base, delta))
        }
        None => new.clone(),
    }
}

/// The clang-tidy tool.
#[derive(Debug)]
pub struct ClangTidy {
    inner: ExecutableTool,
}

impl ClangTidy {
    /// Build from merged user settings.
    pub fn from_config(
        descriptor: &'static ToolDescriptor,
        settings: ToolSettings,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: ExecutableTool::from_config(descriptor, settings)?,
        })
    }
}

impl Tool for ClangTidy {
    fn descriptor(&self) -> &'static ToolDescriptor {
        self.inner.descriptor()
    }

    fn settings(&self) -> &ToolSettings {
        self.inner.settings()
    }

    fn filter(&self) -> &FileFilter {
        self.inner.filter()
    }

    fn resolved(&self) -> Option<&Resolved> {
        self.inner.resolved()
    }

    fn configure(&mut self, ctx: &ToolContext<'_>) -> Result<(), ResolveError> {
        self.inner.configure(ctx)
    }

    /// clang-tidy takes no fixed per-task options; it is pointed at a
    /// compilation database from the command line or the user config.
    fn task_options(&self, _task: Task, run: &RunOptions) -> Result<Vec<String>, ToolError> {
        let database = run
            .compile_commands
            .clone()
            .or_else(|| self.settings().compile_commands_file.clone());
        match database {
            Some(path) => Ok(vec!["-p".to_string(), path.to_string_lossy().into_owned()]),
            None => Ok(Vec::new()),
        }
    }
}
