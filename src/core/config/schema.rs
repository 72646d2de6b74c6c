//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Layout
//!
//! Both the project defaults file (`groom.yaml`) and the user override file
//! (`.groom.yaml`) share one shape: a `tools` mapping keyed by tool
//! identifier. A `global` pseudo-entry supplies defaults that are overlaid
//! onto every other entry after merging.
//!
//! # Example
//!
//! ```yaml
//! tools:
//!   global:
//!     version: ">=0"
//!   ClangFormat:
//!     version: ">=13, <17"
//!     include:
//!       match:
//!         - .*\.cpp$
//!         - .*\.hp?p?$
//!     exclude:
//!       match: third_party/.*
//!   ClangTidy:
//!     compile_commands_file: build/compile_commands.json
//!   Flake8:
//!     enable: false
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Key of the pseudo-tool section holding defaults for every tool.
pub const GLOBAL_SECTION: &str = "global";

/// A value that may be written as a single item or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A bare scalar
    One(T),
    /// A proper list
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Normalize to a list.
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item.clone()],
            OneOrMany::Many(items) => items.clone(),
        }
    }
}

/// An include or exclude section: a list of anchored regular expressions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MatchSection {
    /// The patterns; a single string is accepted and treated as a one-item list.
    #[serde(rename = "match")]
    pub patterns: Option<OneOrMany<String>>,
}

impl MatchSection {
    /// Normalized pattern list.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }
}

/// Per-tool settings, after defaults and user overrides are merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    /// Explicit executable path; skips the search entirely.
    pub path: Option<PathBuf>,

    /// Version requirement the resolved executable must satisfy.
    pub version: Option<String>,

    /// Extra command-line options prepended to every invocation.
    pub option: Option<OneOrMany<String>>,

    /// Patterns selecting the files this tool processes.
    pub include: Option<MatchSection>,

    /// Patterns rejecting files before the include list is consulted.
    pub exclude: Option<MatchSection>,

    /// Additional Python package requirements installed into the
    /// isolated environment before the tool runs.
    pub requirements: Vec<String>,

    /// Whether the tool participates at all. Defaults to enabled.
    pub enable: Option<bool>,

    /// Default compilation database handed to analyzers that take one.
    pub compile_commands_file: Option<PathBuf>,
}

impl ToolSettings {
    /// Whether the tool is enabled.
    pub fn enabled(&self) -> bool {
        self.enable.unwrap_or(true)
    }

    /// Normalized extra options.
    pub fn options(&self) -> Vec<String> {
        self.option.as_ref().map(OneOrMany::to_vec).unwrap_or_default()
    }

    /// Normalized include patterns.
    pub fn include_patterns(&self) -> Vec<String> {
        self.include.as_ref().map(MatchSection::patterns).unwrap_or_default()
    }

    /// Normalized exclude patterns.
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.exclude.as_ref().map(MatchSection::patterns).unwrap_or_default()
    }
}

/// The merged configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Settings per tool identifier (the `global` section has already been
    /// folded in by the loader).
    pub tools: BTreeMap<String, ToolSettings>,
}
