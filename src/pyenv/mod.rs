//! pyenv
//!
//! Isolated Python package environment.
//!
//! # Overview
//!
//! Several of the wrapped tools (clang-format, cmake-format, flake8, black)
//! are installable as Python packages. When the ambient system lacks a
//! version satisfying a tool's requirement, groom provisions a private
//! virtual environment next to the repository and installs the package
//! there, then resolves executables out of its `bin/` directory.
//!
//! The environment is disposable: deleting the directory is always safe.
//!
//! # Bootstrap sequence
//!
//! 1. `python3 -m venv <dir>` if the directory is absent
//! 2. `python -m pip --version`, falling back to `python -m ensurepip
//!    --default-pip` when pip is missing
//! 3. `pip install <requirement>` for whatever the resolver asks for

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::ui::output;

/// Errors from package-environment operations.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Creating the virtual environment failed.
    #[error("failed to create package environment at '{path}': {message}")]
    Create {
        /// The environment directory
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// pip could not be bootstrapped inside the environment.
    #[error("pip unavailable in package environment '{path}'")]
    PipUnavailable {
        /// The environment directory
        path: PathBuf,
    },

    /// A package installation returned a non-zero status.
    #[error("failed to install '{requirement}' into package environment")]
    Install {
        /// The requirement that failed
        requirement: String,
    },

    /// A subprocess could not be spawned at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

/// A pip requirement: a package name plus an optional version specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipRequirement {
    /// The package name, e.g. `clang-format` or `cmake-format[YAML]`.
    pub package: String,
    /// Raw version specifier, e.g. `>=13, <17`.
    pub spec: Option<String>,
}

impl PipRequirement {
    /// Build a requirement.
    pub fn new(package: impl Into<String>, spec: Option<String>) -> Self {
        Self {
            package: package.into(),
            spec,
        }
    }
}

impl std::fmt::Display for PipRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.spec {
            // pip rejects spaces inside a specifier
            Some(spec) => write!(f, "{}{}", self.package, spec.replace(' ', "")),
            None => write!(f, "{}", self.package),
        }
    }
}

/// Handle to the isolated environment directory.
#[derive(Debug, Clone)]
pub struct PackageEnv {
    root: PathBuf,
}

impl PackageEnv {
    /// Wrap an environment directory (which may not exist yet).
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The environment directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `bin/` directory holding installed executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// The environment's Python interpreter.
    pub fn python(&self) -> PathBuf {
        self.bin_dir().join("python")
    }

    /// The environment's pip executable.
    pub fn pip(&self) -> PathBuf {
        self.bin_dir().join("pip")
    }

    /// Whether the environment has been created.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Whether `path` points inside this environment's `bin/` directory.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.bin_dir())
    }

    /// Create the environment if it does not exist yet.
    ///
    /// # Errors
    ///
    /// [`EnvError::Create`] when `python3 -m venv` fails,
    /// [`EnvError::PipUnavailable`] when pip cannot be bootstrapped.
    pub fn ensure(&self) -> Result<(), EnvError> {
        if self.exists() {
            return Ok(());
        }
        log::debug!("creating package environment {}", self.root.display());
        let root = self.root.to_string_lossy();
        let output = run_captured("python3", &["-m", "venv", root.as_ref()])?;
        if !output.status.success() {
            return Err(EnvError::Create {
                path: self.root.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        self.ensure_pip()?;
        self.pip_install_raw("pip", true)?;
        Ok(())
    }

    /// Make sure `python -m pip` works inside the environment.
    fn ensure_pip(&self) -> Result<(), EnvError> {
        if self.py_call(&["-m", "pip", "--version"])? {
            return Ok(());
        }
        self.py_call(&["-m", "ensurepip", "--default-pip"])?;
        if self.py_call(&["-m", "pip", "--version"])? {
            return Ok(());
        }
        Err(EnvError::PipUnavailable {
            path: self.root.clone(),
        })
    }

    fn py_call(&self, args: &[&str]) -> Result<bool, EnvError> {
        let python = self.python();
        let mut display = vec![python.to_string_lossy().into_owned()];
        display.extend(args.iter().map(|a| a.to_string()));
        log::debug!("{}", output::render_command(&display));
        let status = Command::new(&python)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| EnvError::Spawn {
                program: python.to_string_lossy().into_owned(),
                source,
            })?;
        Ok(status.success())
    }

    /// Install a requirement into the environment, creating it on demand.
    pub fn install(&self, requirement: &PipRequirement) -> Result<(), EnvError> {
        self.ensure()?;
        self.pip_install_raw(&requirement.to_string(), false)
    }

    fn pip_install_raw(&self, spec: &str, upgrade: bool) -> Result<(), EnvError> {
        let pip = self.pip();
        let mut args: Vec<&str> = vec!["install"];
        if !log::log_enabled!(log::Level::Debug) {
            args.push("-q");
        }
        if upgrade {
            args.push("--upgrade");
        }
        args.push(spec);

        let mut display = vec![pip.to_string_lossy().into_owned()];
        display.extend(args.iter().map(|a| a.to_string()));
        log::info!("{}", output::render_command(&display));
        let status = Command::new(&pip)
            .args(&args)
            .status()
            .map_err(|source| EnvError::Spawn {
                program: pip.to_string_lossy().into_owned(),
                source,
            })?;
        if !status.success() {
            return Err(EnvError::Install {
                requirement: spec.to_string(),
            });
        }
        Ok(())
    }

    /// The installed version of a package, straight from `pip show`.
    ///
    /// Returns `None` when the package is not installed. Extras markers in
    /// the package name (`pkg[extra]`) are stripped before querying.
    pub fn installed_version(&self, package: &str) -> Result<Option<String>, EnvError> {
        let name = package.split('[').next().unwrap_or(package);
        let pip = self.pip();
        let output = run_captured(
            &pip.to_string_lossy(),
            &["show", name],
        )?;
        if !output.status.success() {
            return Ok(None);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .find_map(|line| line.strip_prefix("Version:"))
            .map(|v| v.trim().to_string()))
    }
}

fn run_captured(program: &str, args: &[&str]) -> Result<std::process::Output, EnvError> {
    log::debug!(
        "{}",
        output::render_command(std::iter::once(program).chain(args.iter().copied()))
    );
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| EnvError::Spawn {
            program: program.to_string(),
            source,
        })
}
