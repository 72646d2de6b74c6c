//! core::paths
//!
//! Centralized path routing for everything groom reads or writes.
//!
//! # Layout
//!
//! All locations are computed relative to the repository root:
//! - `.groom/` - project defaults directory (`groom.yaml` plus the per-tool
//!   default configuration files it references); overridable with the
//!   `GROOM_HOME` environment variable
//! - `.groom.yaml` - optional user override file, also discovered by walking
//!   up from the working directory
//! - `.groom-venv/` - the isolated Python package environment
//! - generated per-tool configuration files (`.clang-format`, ...) land
//!   directly at the root
//!
//! **Hard rule:** no code outside this module may join these names onto a
//! path itself; everything routes through [`Paths`].

use std::path::{Path, PathBuf};

/// Name of the project defaults directory at the repository root.
pub const DEFAULTS_DIR: &str = ".groom";

/// Name of the default configuration file inside the defaults directory.
pub const CONFIG_FILE: &str = "groom.yaml";

/// Name of the user override configuration file.
pub const USER_CONFIG_FILE: &str = ".groom.yaml";

/// Name of the isolated package environment directory.
pub const PACKAGE_ENV_DIR: &str = ".groom-venv";

/// Environment variable overriding the defaults directory.
pub const HOME_ENV: &str = "GROOM_HOME";

/// Centralized path routing.
///
/// # Invariants
///
/// - `repo_root` is the work-tree root reported by version control
/// - `defaults_dir` is resolved once at construction; the `GROOM_HOME`
///   override is process-wide configuration and never re-read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Root of the repository work tree.
    pub repo_root: PathBuf,

    /// Directory holding `groom.yaml` and the default tool config files.
    pub defaults_dir: PathBuf,
}

impl Paths {
    /// Create paths for a repository root, honoring `GROOM_HOME`.
    pub fn new(repo_root: PathBuf) -> Self {
        let defaults_dir = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| repo_root.join(DEFAULTS_DIR));
        Self {
            repo_root,
            defaults_dir,
        }
    }

    /// Create paths with an explicit defaults directory (test seam).
    pub fn with_defaults_dir(repo_root: PathBuf, defaults_dir: PathBuf) -> Self {
        Self {
            repo_root,
            defaults_dir,
        }
    }

    /// The project default configuration file.
    pub fn default_config_file(&self) -> PathBuf {
        self.defaults_dir.join(CONFIG_FILE)
    }

    /// Locate the user override file: preferred location is the repository
    /// root; otherwise the nearest ancestor of `cwd` holding one.
    pub fn user_config_file(&self, cwd: &Path) -> Option<PathBuf> {
        let expected = self.repo_root.join(USER_CONFIG_FILE);
        if expected.exists() {
            return Some(expected);
        }
        let mut dir = Some(cwd);
        while let Some(d) = dir {
            let candidate = d.join(USER_CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            dir = d.parent();
        }
        None
    }

    /// Directory of the isolated package environment.
    pub fn package_env_dir(&self) -> PathBuf {
        self.repo_root.join(PACKAGE_ENV_DIR)
    }

    /// A generated tool configuration file at the repository root.
    pub fn generated_config(&self, file_name: &str) -> PathBuf {
        self.repo_root.join(file_name)
    }

    /// A default tool configuration file inside the defaults directory.
    pub fn default_tool_config(&self, file_name: &str) -> PathBuf {
        self.defaults_dir.join(file_name)
    }
}
