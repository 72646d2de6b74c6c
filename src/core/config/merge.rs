//! core::config::merge
//!
//! Merging of generated tool configuration files.
//!
//! # Behavior
//!
//! Inputs are merged in order into a single YAML mapping written to the
//! output path. Regeneration is skipped when the output is at least as new
//! as every input; this is a freshness optimization, not a correctness
//! requirement, so concurrent runs at worst regenerate redundantly.
//!
//! Top-level keys are normally replaced by later inputs. A key with a
//! registered transformer is combined instead - static-analysis check lists
//! need the negation-aware merge from [`crate::core::rules`] rather than
//! plain replacement.
//!
//! A non-mapping input is reported and abandons the merge without writing;
//! the caller decides whether that is fatal.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::ConfigError;

/// Combines an accumulated value with a later input's value for one key.
pub type Transformer = fn(Option<&Value>, &Value) -> Value;

/// A per-key transformer table.
pub type Transformers<'a> = &'a [(&'a str, Transformer)];

/// Result of a merge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The output file was (re)written.
    Written,
    /// The output was newer than every input; nothing to do.
    UpToDate,
    /// An input was structurally invalid; reported, output untouched.
    Abandoned,
}

fn modified(path: &Path) -> Result<std::time::SystemTime, ConfigError> {
    let meta = std::fs::metadata(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    meta.modified().map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// True when `output` needs regeneration from `inputs`.
fn outdated(output: &Path, inputs: &[&Path]) -> Result<bool, ConfigError> {
    if !output.exists() {
        return Ok(true);
    }
    let out_time = modified(output)?;
    for input in inputs {
        if modified(input)? > out_time {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Merge YAML `inputs` (in order) into `output`.
///
/// # Errors
///
/// I/O failures reading inputs or writing the output are returned as
/// [`ConfigError`]. Structural problems (non-mapping input) are logged and
/// reported through [`MergeOutcome::Abandoned`] instead.
pub fn merge_yaml_files(
    inputs: &[&Path],
    output: &Path,
    transformers: Transformers<'_>,
) -> Result<MergeOutcome, ConfigError> {
    if !outdated(output, inputs)? {
        log::info!("file {} is up to date, nothing to do.", output.display());
        return Ok(MergeOutcome::UpToDate);
    }

    let mut data = Mapping::new();
    let mut succeeded = true;
    for input in inputs {
        let text = std::fs::read_to_string(input).map_err(|source| ConfigError::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let value: Value = serde_yaml::from_str(&text).map_err(|err| ConfigError::Parse {
            path: input.to_path_buf(),
            message: err.to_string(),
        })?;
        let Value::Mapping(content) = value else {
            log::error!(
                "while reading YAML file {}: expected a mapping but got {}",
                input.display(),
                super::value_kind(&value)
            );
            succeeded = false;
            continue;
        };
        for (key, value) in content {
            let transformer = key
                .as_str()
                .and_then(|name| transformers.iter().find(|(k, _)| *k == name))
                .map(|(_, f)| *f);
            match transformer {
                Some(combine) => {
                    let combined = combine(data.get(&key), &value);
                    data.insert(key, combined);
                }
                None => {
                    data.insert(key, value);
                }
            }
        }
    }

    if !succeeded {
        return Ok(MergeOutcome::Abandoned);
    }

    log::info!("writing file {}", output.display());
    let rendered = serde_yaml::to_string(&Value::Mapping(data)).map_err(|err| {
        ConfigError::Parse {
            path: output.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    std::fs::write(output, rendered).map_err(|source| ConfigError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(MergeOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Backdate a file's mtime so freshness comparisons don't need sleeps.
    fn touch_older(path: &Path, seconds: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(seconds);
        file.set_times(fs::FileTimes::new().set_modified(past)).unwrap();
    }

    #[test]
    fn merges_and_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let delta = dir.path().join("delta.yaml");
        let out = dir.path().join("out.yaml");
        fs::write(&base, "A: 1\nB: x\n").unwrap();
        fs::write(&delta, "B: y\nC: 2\n").unwrap();

        let outcome = merge_yaml_files(&[&base, &delta], &out, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::Written);
        let merged: Mapping =
            serde_yaml::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(merged.get(&Value::from("A")), Some(&Value::from(1)));
        assert_eq!(merged.get(&Value::from("B")), Some(&Value::from("y")));
        assert_eq!(merged.get(&Value::from("C")), Some(&Value::from(2)));
    }

    #[test]
    fn fresh_output_skips_regeneration() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let out = dir.path().join("out.yaml");
        fs::write(&base, "A: 1\n").unwrap();
        fs::write(&out, "A: 999\n").unwrap();
        touch_older(&base, 60);

        let outcome = merge_yaml_files(&[&base], &out, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::UpToDate);
        assert_eq!(fs::read_to_string(&out).unwrap(), "A: 999\n");
    }

    #[test]
    fn stale_output_regenerates() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let out = dir.path().join("out.yaml");
        fs::write(&out, "A: 999\n").unwrap();
        fs::write(&base, "A: 1\n").unwrap();
        touch_older(&out, 60);

        let outcome = merge_yaml_files(&[&base], &out, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::Written);
        assert!(fs::read_to_string(&out).unwrap().contains("A: 1"));
    }

    #[test]
    fn non_mapping_input_abandons_merge() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let out = dir.path().join("out.yaml");
        fs::write(&base, "- not\n- a\n- mapping\n").unwrap();

        let outcome = merge_yaml_files(&[&base], &out, &[]).unwrap();
        assert_eq!(outcome, MergeOutcome::Abandoned);
        assert!(!out.exists());
    }

    #[test]
    fn transformer_combines_key_values() {
        fn join(old: Option<&Value>, new: &Value) -> Value {
            match (old.and_then(Value::as_str), new.as_str()) {
                (Some(a), Some(b)) => Value::from(format!("{a}+{b}")),
                _ => new.clone(),
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let delta = dir.path().join("delta.yaml");
        let out = dir.path().join("out.yaml");
        fs::write(&base, "K: a\n").unwrap();
        fs::write(&delta, "K: b\n").unwrap();

        merge_yaml_files(&[&base, &delta], &out, &[("K", join)]).unwrap();
        let merged: Mapping =
            serde_yaml::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(merged.get(&Value::from("K")), Some(&Value::from("a+b")));
    }
}
