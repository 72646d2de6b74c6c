//! git::interface
//!
//! Repository queries via git2.
//!
//! This module is the **single doorway** to version control. groom only ever
//! reads from a repository: the tracked-file listing that seeds task file
//! sets, the tracked check that lets a project hand-maintain a generated
//! config file, and diff deltas for incremental runs. All of it is here,
//! with errors normalized into typed categories.
//!
//! # Example
//!
//! ```ignore
//! use groom::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for file in git.tracked_files(&[])? {
//!     println!("{}", file.display());
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Errors from repository queries.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested revision or reference does not exist.
    #[error("revision not found: {revision}")]
    RevisionNotFound {
        /// The revision that was not found
        revision: String,
    },

    /// A changeset mode string was not understood.
    #[error("unknown changeset mode: '{value}'")]
    UnknownChangeset {
        /// The value given on the command line
        value: String,
    },

    /// An environment variable required by a changeset mode is missing.
    #[error("expecting environment variable {variable}; {hint}")]
    MissingEnv {
        /// The missing variable name
        variable: String,
        /// Where the variable normally comes from
        hint: String,
    },

    /// Any other libgit2 failure.
    #[error("git error: {0}")]
    Backend(#[from] git2::Error),
}

/// A changeset boundary selected with `--applies-on`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Changeset {
    /// The whole tracked tree (no narrowing).
    All,
    /// Unstaged modifications in the working tree.
    Working,
    /// Changes sitting in the staging area.
    Staging,
    /// Everything since the given revision.
    SinceRev(String),
    /// Everything since the fork point from the given reference.
    SinceRef(String),
    /// Everything since the fork point from the branch named by the
    /// `CHANGE_BRANCH` environment variable (CI integration).
    BaseBranch,
}

impl FromStr for Changeset {
    type Err = GitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.to_ascii_lowercase();
        // mode prefixes are case-insensitive; revision names are not
        if lowered.starts_with("since-rev:") {
            return Ok(Changeset::SinceRev(value["since-rev:".len()..].to_string()));
        }
        if lowered.starts_with("since-ref:") {
            return Ok(Changeset::SinceRef(value["since-ref:".len()..].to_string()));
        }
        match lowered.as_str() {
            "all" => Ok(Changeset::All),
            "working" => Ok(Changeset::Working),
            "staging" => Ok(Changeset::Staging),
            "base-branch" => Ok(Changeset::BaseBranch),
            _ => Err(GitError::UnknownChangeset {
                value: value.to_string(),
            }),
        }
    }
}

/// A concrete diff interval: working tree, staging area, or a revision range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitDiffDelta {
    /// Older side of the range, if any.
    pub from: Option<String>,
    /// Newer side of the range, if any.
    pub to: Option<String>,
    /// Whether the staging area is diffed instead of the working tree.
    pub staged: bool,
}

impl fmt::Display for GitDiffDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.from, &self.to) {
            (None, None) if self.staged => write!(f, "git staging area"),
            (None, None) => write!(f, "git working area"),
            (from, to) => write!(
                f,
                "{}:{}",
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
        }
    }
}

/// The repository doorway.
pub struct Git {
    repo: git2::Repository,
    root: PathBuf,
}

impl fmt::Debug for Git {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Git").field("root", &self.root).finish()
    }
}

impl Git {
    /// Discover and open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// [`GitError::NotARepo`] if no repository contains `path`;
    /// [`GitError::BareRepo`] for repositories without a work tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let root = repo
            .workdir()
            .ok_or(GitError::BareRepo)?
            .to_path_buf();
        Ok(Self { repo, root })
    }

    /// Root of the work tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository-relative paths of all tracked files, optionally
    /// restricted to the given subdirectories (absolute or relative).
    ///
    /// Paths stay relative so include/exclude patterns written against the
    /// tree layout (`src/.*`) match the same strings a listing would show.
    pub fn tracked_files(&self, subdirs: &[PathBuf]) -> Result<Vec<PathBuf>, GitError> {
        let prefixes: Vec<PathBuf> = subdirs
            .iter()
            .map(|dir| self.relativize(dir))
            .collect();
        let index = self.repo.index()?;
        let mut files = Vec::new();
        for entry in index.iter() {
            let rel = PathBuf::from(String::from_utf8_lossy(&entry.path).into_owned());
            if prefixes.is_empty() || prefixes.iter().any(|p| rel.starts_with(p)) {
                files.push(rel);
            }
        }
        Ok(files)
    }

    /// Whether a file is tracked. Accepts absolute or repository-relative
    /// paths; untracked and out-of-tree paths both answer `false`.
    pub fn is_tracked(&self, file: &Path) -> bool {
        let rel = self.relativize(file);
        self.repo
            .index()
            .map(|index| index.get_path(&rel, 0).is_some())
            .unwrap_or(false)
    }

    /// The merge base between a reference and `HEAD`, as a revision string.
    pub fn fork_point(&self, refname: &str) -> Result<String, GitError> {
        let their = self
            .repo
            .revparse_single(refname)
            .map_err(|_| GitError::RevisionNotFound {
                revision: refname.to_string(),
            })?
            .peel(git2::ObjectType::Commit)?
            .id();
        let head = self.repo.head()?.peel_to_commit()?.id();
        let base = self.repo.merge_base(their, head)?;
        Ok(base.to_string())
    }

    /// Turn a changeset mode into a concrete diff delta.
    ///
    /// Returns `None` for [`Changeset::All`], which performs no narrowing.
    pub fn delta_for(&self, changeset: &Changeset) -> Result<Option<GitDiffDelta>, GitError> {
        let delta = match changeset {
            Changeset::All => return Ok(None),
            Changeset::Working => GitDiffDelta {
                from: None,
                to: None,
                staged: false,
            },
            Changeset::Staging => GitDiffDelta {
                from: None,
                to: None,
                staged: true,
            },
            Changeset::SinceRev(rev) => GitDiffDelta {
                from: Some(rev.clone()),
                to: Some("HEAD".to_string()),
                staged: false,
            },
            Changeset::SinceRef(refname) => GitDiffDelta {
                from: Some(self.fork_point(refname)?),
                to: Some("HEAD".to_string()),
                staged: false,
            },
            Changeset::BaseBranch => {
                let branch =
                    std::env::var("CHANGE_BRANCH").map_err(|_| GitError::MissingEnv {
                        variable: "CHANGE_BRANCH".to_string(),
                        hint: "this changeset mode is meant to run within a CI pipeline"
                            .to_string(),
                    })?;
                GitDiffDelta {
                    from: Some(self.fork_point(&branch)?),
                    to: Some("HEAD".to_string()),
                    staged: false,
                }
            }
        };
        Ok(Some(delta))
    }

    /// Absolute paths of files added or modified within the delta.
    pub fn changed_files(&self, delta: &GitDiffDelta) -> Result<BTreeSet<PathBuf>, GitError> {
        let diff = match (&delta.from, &delta.to) {
            (None, None) if delta.staged => {
                let tree = self.repo.head()?.peel_to_tree()?;
                self.repo
                    .diff_tree_to_index(Some(&tree), None, None)?
            }
            (None, None) => self.repo.diff_index_to_workdir(None, None)?,
            (Some(from), Some(to)) => {
                let from_tree = self.resolve_tree(from)?;
                let to_tree = self.resolve_tree(to)?;
                self.repo
                    .diff_tree_to_tree(Some(&from_tree), Some(&to_tree), None)?
            }
            (Some(from), None) => {
                let from_tree = self.resolve_tree(from)?;
                self.repo
                    .diff_tree_to_workdir_with_index(Some(&from_tree), None)?
            }
            (None, Some(to)) => {
                let to_tree = self.resolve_tree(to)?;
                self.repo
                    .diff_tree_to_workdir_with_index(Some(&to_tree), None)?
            }
        };

        let mut changed = BTreeSet::new();
        for entry in diff.deltas() {
            match entry.status() {
                git2::Delta::Added | git2::Delta::Modified => {
                    if let Some(path) = entry.new_file().path() {
                        changed.insert(self.root.join(path));
                    }
                }
                _ => {}
            }
        }
        Ok(changed)
    }

    fn resolve_tree(&self, revision: &str) -> Result<git2::Tree<'_>, GitError> {
        let object = self
            .repo
            .revparse_single(revision)
            .map_err(|_| GitError::RevisionNotFound {
                revision: revision.to_string(),
            })?;
        object
            .peel(git2::ObjectType::Tree)?
            .into_tree()
            .map_err(|_| GitError::RevisionNotFound {
                revision: revision.to_string(),
            })
    }

    /// Normalize a path to be relative to the repository root, resolving
    /// symlinks when a direct prefix strip does not apply.
    fn relativize(&self, path: &Path) -> PathBuf {
        if !path.is_absolute() {
            return path.to_path_buf();
        }
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return rel.to_path_buf();
        }
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        canonical
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changeset_parsing() {
        assert_eq!("all".parse::<Changeset>().unwrap(), Changeset::All);
        assert_eq!("Working".parse::<Changeset>().unwrap(), Changeset::Working);
        assert_eq!("staging".parse::<Changeset>().unwrap(), Changeset::Staging);
        assert_eq!(
            "since-rev:abc123".parse::<Changeset>().unwrap(),
            Changeset::SinceRev("abc123".to_string())
        );
        assert_eq!(
            "since-ref:main".parse::<Changeset>().unwrap(),
            Changeset::SinceRef("main".to_string())
        );
        assert!(matches!(
            "sideways".parse::<Changeset>(),
            Err(GitError::UnknownChangeset { .. })
        ));
    }

    #[test]
    fn delta_display() {
        let working = GitDiffDelta {
            from: None,
            to: None,
            staged: false,
        };
        assert_eq!(working.to_string(), "git working area");
        let staged = GitDiffDelta {
            from: None,
            to: None,
            staged: true,
        };
        assert_eq!(staged.to_string(), "git staging area");
        let range = GitDiffDelta {
            from: Some("abc".to_string()),
            to: Some("HEAD".to_string()),
            staged: false,
        };
        assert_eq!(range.to_string(), "abc:HEAD");
    }
}
