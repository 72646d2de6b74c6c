//! core::filter
//!
//! Include/exclude file filtering.
//!
//! # Semantics
//!
//! Evaluation order is significant: exclude patterns are checked first and
//! any match rejects the path. Only then are include patterns consulted; a
//! path is accepted if any include pattern matches it. A path matching no
//! include pattern - including the case of an empty include list - is
//! rejected. Patterns are anchored at the start of the path.

use regex::Regex;
use thiserror::Error;

/// Error building a filter from textual patterns.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A pattern failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    BadPattern {
        /// The offending pattern text
        pattern: String,
        /// The underlying regex error
        source: regex::Error,
    },
}

/// Compile a pattern anchored at the start of the candidate path.
pub fn compile_anchored(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("^(?:{})", pattern)).map_err(|source| FilterError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// A file filter built from ordered exclude and include pattern lists.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    excludes: Vec<Regex>,
    includes: Vec<Regex>,
}

impl FileFilter {
    /// Build a filter from textual patterns.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::BadPattern`] for the first pattern that does
    /// not compile.
    pub fn from_patterns<S: AsRef<str>>(
        excludes: &[S],
        includes: &[S],
    ) -> Result<Self, FilterError> {
        let excludes = excludes
            .iter()
            .map(|p| compile_anchored(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let includes = includes
            .iter()
            .map(|p| compile_anchored(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { excludes, includes })
    }

    /// Build a filter from already-compiled patterns.
    pub fn new(excludes: Vec<Regex>, includes: Vec<Regex>) -> Self {
        Self { excludes, includes }
    }

    /// Whether the filter accepts the given path.
    pub fn accepts(&self, path: &str) -> bool {
        if self.excludes.iter().any(|re| re.is_match(path)) {
            return false;
        }
        self.includes.iter().any(|re| re.is_match(path))
    }

    /// Inverse of [`FileFilter::accepts`]; reads better at call sites that
    /// enumerate rejections.
    pub fn rejects(&self, path: &str) -> bool {
        !self.accepts(path)
    }

    /// True when the filter has neither include nor exclude patterns.
    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty() && self.includes.is_empty()
    }
}
