//! core::config
//!
//! Configuration loading and merging.
//!
//! # Overview
//!
//! groom reads two configuration files:
//! - **Project defaults**: `groom.yaml` inside the defaults directory
//! - **User overrides**: `.groom.yaml` at the repository root (or the
//!   nearest ancestor of the working directory)
//!
//! # Merge pipeline
//!
//! 1. Load both files as YAML mappings (a non-mapping top level is a hard
//!    configuration error).
//! 2. Recursively overlay the user document onto the defaults. Mappings
//!    merge key-wise; equal values pass; same-type scalars are replaced by
//!    the override; a type mismatch aborts with the dotted key path.
//! 3. Fold the `tools.global` section onto every tool entry (tool-specific
//!    keys win).
//! 4. Deserialize into [`ProjectConfig`] and drop disabled tools.
//!
//! # Example
//!
//! ```no_run
//! use groom::core::config::ProjectConfig;
//! use groom::core::paths::Paths;
//! use std::path::Path;
//!
//! let paths = Paths::new("/path/to/repo".into());
//! let config = ProjectConfig::load(&paths, Path::new(".")).unwrap();
//! for name in config.tools.keys() {
//!     println!("configured tool: {}", name);
//! }
//! ```

pub mod merge;
pub mod schema;

pub use schema::{MatchSection, OneOrMany, ProjectConfig, ToolSettings, GLOBAL_SECTION};

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::core::filter::FilterError;
use crate::core::paths::Paths;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("while reading '{path}': expected a mapping at the top level but got {found}")]
    TopLevel { path: PathBuf, found: &'static str },

    #[error("conflicting override at '{key_path}': cannot replace {expected} with {found}")]
    Conflict {
        key_path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("tool '{tool}': {source}")]
    Pattern {
        tool: String,
        #[source]
        source: FilterError,
    },

    #[error("tool '{tool}': invalid version requirement '{requirement}': {source}")]
    VersionReq {
        tool: String,
        requirement: String,
        source: semver::Error,
    },

    #[error("failed to write file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Describe a YAML value's type for error messages.
fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Load a YAML file whose top level must be a mapping.
fn load_mapping(path: &Path) -> Result<Mapping, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        other => Err(ConfigError::TopLevel {
            path: path.to_path_buf(),
            found: value_kind(&other),
        }),
    }
}

/// Recursively overlay `over` onto `base`, failing on type conflicts.
fn overlay(base: &mut Mapping, over: &Mapping, key_path: &mut Vec<String>) -> Result<(), ConfigError> {
    for (key, over_value) in over {
        let key_text = match key {
            Value::String(s) => s.clone(),
            other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
        };
        if !base.contains_key(key) {
            base.insert(key.clone(), over_value.clone());
            continue;
        }
        let Some(base_value) = base.get_mut(key) else {
            continue;
        };
        if *base_value == *over_value {
            continue;
        }
        match (base_value, over_value) {
            (Value::Mapping(base_map), Value::Mapping(over_map)) => {
                key_path.push(key_text);
                overlay(base_map, over_map, key_path)?;
                key_path.pop();
            }
            // a null entry is a placeholder, not a type
            (slot @ Value::Null, value) => {
                *slot = value.clone();
            }
            (base_value, over_value)
                if std::mem::discriminant(&*base_value) == std::mem::discriminant(over_value) =>
            {
                *base_value = over_value.clone();
            }
            (base_value, over_value) => {
                key_path.push(key_text);
                return Err(ConfigError::Conflict {
                    key_path: key_path.join("."),
                    expected: value_kind(base_value),
                    found: value_kind(over_value),
                });
            }
        }
    }
    Ok(())
}

/// Fold the `tools.global` section onto every tool entry.
///
/// A bare `Tool:` entry (null body) is first normalized to an empty mapping.
/// Tool-specific keys win; the overlay is shallow, matching the way a user
/// reads the file (a tool's `include` section replaces the global one, it is
/// not spliced into it).
fn fold_global_section(doc: &mut Mapping) {
    let tools_key = Value::String("tools".into());
    let Some(Value::Mapping(tools)) = doc.get_mut(&tools_key) else {
        return;
    };
    for (_, entry) in tools.iter_mut() {
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
    }
    let global_key = Value::String(GLOBAL_SECTION.into());
    let Some(global) = tools.remove(&global_key) else {
        return;
    };
    let Value::Mapping(global) = global else {
        return;
    };
    for (_, entry) in tools.iter_mut() {
        if let Value::Mapping(tool_map) = entry {
            for (key, value) in &global {
                if !tool_map.contains_key(key) {
                    tool_map.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

impl ProjectConfig {
    /// Load and merge the project defaults and the user override file.
    ///
    /// # Errors
    ///
    /// Any I/O, parse, top-level-shape, or overlay conflict aborts the load;
    /// configuration problems must surface before any tool runs.
    pub fn load(paths: &Paths, cwd: &Path) -> Result<Self, ConfigError> {
        let default_path = paths.default_config_file();
        let mut doc = load_mapping(&default_path)?;
        log::debug!("loaded defaults from {}", default_path.display());

        if let Some(user_path) = paths.user_config_file(cwd) {
            log::debug!("merging user overrides from {}", user_path.display());
            let user = load_mapping(&user_path)?;
            overlay(&mut doc, &user, &mut Vec::new())?;
        }

        fold_global_section(&mut doc);
        Self::from_document(doc, &default_path)
    }

    /// Build a config from an already-merged YAML document.
    fn from_document(doc: Mapping, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: ProjectConfig = serde_yaml::from_value(Value::Mapping(doc))
            .map_err(|err| ConfigError::Parse {
                path: origin.to_path_buf(),
                message: err.to_string(),
            })?;
        config.tools.retain(|_, settings| settings.enabled());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Mapping {
        match serde_yaml::from_str::<Value>(yaml).unwrap() {
            Value::Mapping(map) => map,
            _ => panic!("test document must be a mapping"),
        }
    }

    #[test]
    fn overlay_replaces_same_type_scalars() {
        let mut base = doc("a: 1\nb: keep\n");
        let over = doc("a: 2\n");
        overlay(&mut base, &over, &mut Vec::new()).unwrap();
        assert_eq!(base.get(&Value::from("a")), Some(&Value::from(2)));
        assert_eq!(base.get(&Value::from("b")), Some(&Value::from("keep")));
    }

    #[test]
    fn overlay_recurses_into_mappings() {
        let mut base = doc("tools:\n  X:\n    version: '1'\n    enable: true\n");
        let over = doc("tools:\n  X:\n    version: '2'\n");
        overlay(&mut base, &over, &mut Vec::new()).unwrap();
        let text = serde_yaml::to_string(&Value::Mapping(base)).unwrap();
        assert!(text.contains("version: '2'"));
        assert!(text.contains("enable: true"));
    }

    #[test]
    fn overlay_type_conflict_names_key_path() {
        let mut base = doc("tools:\n  X:\n    option: [a]\n");
        let over = doc("tools:\n  X:\n    option: true\n");
        let err = overlay(&mut base, &over, &mut Vec::new()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tools.X.option"), "got: {message}");
    }

    #[test]
    fn global_section_fills_gaps_without_overriding() {
        let mut document = doc(concat!(
            "tools:\n",
            "  global:\n",
            "    version: '>=1'\n",
            "  X:\n",
            "    version: '>=2'\n",
            "  Y: null\n",
        ));
        fold_global_section(&mut document);
        let config =
            ProjectConfig::from_document(document, Path::new("groom.yaml")).unwrap();
        assert_eq!(config.tools["X"].version.as_deref(), Some(">=2"));
        assert_eq!(config.tools["Y"].version.as_deref(), Some(">=1"));
        assert!(!config.tools.contains_key(GLOBAL_SECTION));
    }

    #[test]
    fn disabled_tools_are_dropped() {
        let document = doc("tools:\n  X:\n    enable: false\n  Y: {}\n");
        let config =
            ProjectConfig::from_document(document, Path::new("groom.yaml")).unwrap();
        assert!(!config.tools.contains_key("X"));
        assert!(config.tools.contains_key("Y"));
    }

    #[test]
    fn load_rejects_non_mapping_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join(".groom");
        std::fs::create_dir_all(&defaults).unwrap();
        std::fs::write(defaults.join("groom.yaml"), "- just\n- a\n- list\n").unwrap();
        let paths = Paths::with_defaults_dir(dir.path().to_path_buf(), defaults);
        let err = ProjectConfig::load(&paths, dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TopLevel { .. }));
    }

    #[test]
    fn load_merges_user_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = dir.path().join(".groom");
        std::fs::create_dir_all(&defaults).unwrap();
        std::fs::write(
            defaults.join("groom.yaml"),
            "tools:\n  X:\n    version: '>=1'\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(".groom.yaml"),
            "tools:\n  X:\n    enable: false\n",
        )
        .unwrap();
        let paths = Paths::with_defaults_dir(dir.path().to_path_buf(), defaults);
        let config = ProjectConfig::load(&paths, dir.path()).unwrap();
        assert!(config.tools.is_empty());
    }
}
