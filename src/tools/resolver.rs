//! tools::resolver
//!
//! Locating an executable that satisfies a version requirement.
//!
//! # Search order
//!
//! 1. A per-tool environment variable (`CLANG_FORMAT`, `CMAKE_FORMAT`, ...)
//!    naming an absolute path short-circuits the search; a bare name
//!    replaces the name being searched for.
//! 2. An explicit `path` in the user configuration skips the search and
//!    only detects the version.
//! 3. Otherwise every directory on `PATH` is scanned for entries matching
//!    the tool's base name or its versioned-name pattern (minus the
//!    exclusion pattern), keeping only entries with the execute bit set.
//! 4. Candidates are version-detected and filtered by the requirement; the
//!    highest satisfying version wins.
//! 5. When nothing satisfies and the tool is pip-installable - or the user
//!    configuration demands extra packages - the isolated environment is
//!    provisioned and the search retries inside its `bin/` directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use semver::{Version, VersionReq};
use thiserror::Error;

use crate::pyenv::{EnvError, PackageEnv, PipRequirement};
use crate::tools::descriptor::ToolDescriptor;
use crate::ui::output;

/// Errors from executable resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No candidate satisfied the requirement, even after provisioning.
    #[error("could not find a version of {tool} matching requirement '{requirement}'{}",
            format_candidates(.candidates))]
    NotFound {
        /// The tool being resolved
        tool: String,
        /// The requirement that was not met
        requirement: String,
        /// Rejected candidates with their detected versions
        candidates: Vec<(PathBuf, Option<Version>)>,
    },

    /// An executable's version banner did not contain a version.
    #[error("could not extract version of program {path} from output: '{output}'")]
    VersionUndetected {
        /// The probed executable
        path: PathBuf,
        /// What the executable printed instead
        output: String,
    },

    /// An executable could not be spawned at all.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that failed to start
        program: String,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Provisioning the package environment failed.
    #[error(transparent)]
    Env(#[from] EnvError),
}

fn format_candidates(candidates: &[(PathBuf, Option<Version>)]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let mut text = String::from("\ncandidates are:");
    for (path, version) in candidates {
        let version = version
            .as_ref()
            .map(Version::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        text.push_str(&format!("\n  {}: {}", version, path.display()));
    }
    text
}

/// A resolved executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Absolute path to the executable.
    pub path: PathBuf,
    /// Its detected version.
    pub version: Version,
}

/// Normalize a raw version string into a semantic version.
///
/// Tool banners are looser than semver: components may be missing
/// (`14.0`) and pre-release letters are glued on (`0.6.13a`, `1.7b`).
/// Missing components are padded with zero and trailing letters dropped.
pub fn normalize_version(raw: &str) -> Option<Version> {
    let mut parts = [0u64; 3];
    let mut count = 0;
    for (i, component) in raw.split('.').enumerate() {
        if i >= 3 {
            break;
        }
        let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
        parts[i] = digits.parse().ok()?;
        count = i + 1;
    }
    if count == 0 {
        return None;
    }
    Some(Version::new(parts[0], parts[1], parts[2]))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Directories searched for executables: `PATH`, split.
pub fn search_dirs() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// The value of the tool's executable-override environment variable.
fn env_override(descriptor: &ToolDescriptor) -> Option<String> {
    std::env::var(descriptor.env_var()).ok().filter(|v| !v.is_empty())
}

/// All executables in `dirs` matching the tool's names.
///
/// An entry qualifies when its file name equals the searched name, or
/// matches the descriptor's versioned-name pattern without matching the
/// exclusion pattern - and the execute permission bit is set either way.
pub fn find_executables(descriptor: &ToolDescriptor, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let name = match env_override(descriptor) {
        Some(value) => {
            let as_path = PathBuf::from(&value);
            if as_path.is_absolute() {
                return vec![as_path];
            }
            value
        }
        None => descriptor.name.to_string(),
    };

    let pattern = descriptor
        .name_pattern
        .and_then(|p| Regex::new(&format!("^(?:{})", p)).ok());
    let exclude = descriptor
        .name_exclude_pattern
        .and_then(|p| Regex::new(&format!("^(?:{})", p)).ok());

    let mut found = Vec::new();
    for dir in dirs {
        let exact = dir.join(&name);
        if is_executable(&exact) && !found.contains(&exact) {
            found.push(exact);
        }
        let Some(pattern) = pattern.as_ref() else {
            continue;
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut variants: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                let file_name = entry.file_name();
                let file_name = file_name.to_string_lossy();
                pattern.is_match(&file_name)
                    && !exclude.as_ref().is_some_and(|re| re.is_match(&file_name))
            })
            .map(|entry| entry.path())
            .filter(|path| is_executable(path))
            .collect();
        variants.sort();
        for variant in variants {
            if !found.contains(&variant) {
                found.push(variant);
            }
        }
    }
    found
}

/// Detect the version of a candidate executable.
///
/// A pip-installed candidate living inside our private environment is
/// version-queried through the package metadata instead of spawning it.
pub fn detect_version(
    descriptor: &ToolDescriptor,
    path: &Path,
    env: Option<&PackageEnv>,
) -> Result<Version, ResolveError> {
    if let Some(env) = env {
        let package = descriptor.capabilities.pip_package.package_for(descriptor.name);
        if let Some(package) = package {
            if env.contains(path) {
                if let Some(raw) = env.installed_version(&package)? {
                    if let Some(version) = normalize_version(&raw) {
                        return Ok(version);
                    }
                }
            }
        }
    }

    let mut display = vec![path.to_string_lossy().into_owned()];
    display.extend(descriptor.version_args.iter().map(|a| a.to_string()));
    log::debug!("{}", output::render_command(&display));

    let probed = Command::new(path)
        .args(descriptor.version_args)
        .output()
        .map_err(|source| ResolveError::Spawn {
            program: path.to_string_lossy().into_owned(),
            source,
        })?;
    let mut text = String::from_utf8_lossy(&probed.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&probed.stderr));

    let extracted = Regex::new(descriptor.version_pattern)
        .ok()
        .and_then(|re| re.captures(&text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| normalize_version(m.as_str()));
    extracted.ok_or_else(|| ResolveError::VersionUndetected {
        path: path.to_path_buf(),
        output: text.trim().to_string(),
    })
}

/// Pick the best candidate in `dirs` satisfying `requirement`.
///
/// Candidates whose version cannot be detected are skipped with a warning.
fn best_in_dirs(
    descriptor: &ToolDescriptor,
    requirement: Option<&VersionReq>,
    dirs: &[PathBuf],
    env: Option<&PackageEnv>,
    rejected: &mut Vec<(PathBuf, Option<Version>)>,
) -> Option<Resolved> {
    let mut satisfying: Vec<Resolved> = Vec::new();
    for path in find_executables(descriptor, dirs) {
        let version = match detect_version(descriptor, &path, env) {
            Ok(version) => version,
            Err(err) => {
                log::warn!("skipping candidate {}: {}", path.display(), err);
                rejected.push((path, None));
                continue;
            }
        };
        if requirement.is_none_or(|req| req.matches(&version)) {
            satisfying.push(Resolved { path, version });
        } else {
            rejected.push((path, Some(version)));
        }
    }
    satisfying.sort_by(|a, b| a.version.cmp(&b.version));
    satisfying.pop()
}

/// Resolve a tool to a concrete executable and version.
///
/// `requirement` comes from the user configuration; `extra_requirements`
/// are additional pip specs that must be present in the isolated
/// environment before the tool runs.
pub fn resolve(
    descriptor: &ToolDescriptor,
    explicit_path: Option<&Path>,
    requirement: Option<&VersionReq>,
    requirement_text: Option<&str>,
    extra_requirements: &[String],
    env: &PackageEnv,
) -> Result<Resolved, ResolveError> {
    let resolved = if let Some(path) = explicit_path {
        let version = detect_version(descriptor, path, Some(env))?;
        Resolved {
            path: path.to_path_buf(),
            version,
        }
    } else {
        let mut rejected = Vec::new();
        // Extra package requirements force the private environment so the
        // tool and its plugins end up importable together.
        let ambient = if extra_requirements.is_empty() {
            best_in_dirs(descriptor, requirement, &search_dirs(), Some(env), &mut rejected)
        } else {
            None
        };
        let resolved = match ambient {
            Some(resolved) => Some(resolved),
            None => {
                let package = descriptor
                    .capabilities
                    .pip_package
                    .package_for(descriptor.name);
                match package {
                    Some(package) => {
                        env.install(&PipRequirement::new(
                            package,
                            requirement_text.map(str::to_string),
                        ))?;
                        best_in_dirs(
                            descriptor,
                            requirement,
                            &[env.bin_dir()],
                            Some(env),
                            &mut rejected,
                        )
                    }
                    None => None,
                }
            }
        };
        resolved.ok_or_else(|| ResolveError::NotFound {
            tool: descriptor.name.to_string(),
            requirement: requirement_text.unwrap_or("*").to_string(),
            candidates: rejected,
        })?
    };

    for spec in extra_requirements {
        env.install(&PipRequirement::new(spec.clone(), None))?;
    }

    log::info!(
        "{}: found {} ({}) matching requirement {}",
        descriptor.name,
        resolved.path.display(),
        resolved.version,
        requirement_text.unwrap_or("*"),
    );
    Ok(resolved)
}
