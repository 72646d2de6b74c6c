//! core::rules
//!
//! Merging of comma-separated rule lists.
//!
//! Static-analysis configuration carries its enabled checks as an ordered,
//! comma-separated list where a `-` prefix negates earlier entries and `*`
//! wildcards match rule families (e.g. `"bugprone-*,-bugprone-easily-swappable-parameters"`).
//! Merging a delta list onto a base list must remove every base entry the
//! delta overrides before appending the delta entry, so the combined list
//! stays free of dead entries.

use regex::Regex;

/// `fnmatch`-style wildcard match: `*` matches any run of characters and
/// `?` matches a single character; everything else is literal. The pattern
/// must cover the whole text.
pub fn wildcard_match(text: &str, pattern: &str) -> bool {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(&ch.to_string())),
        }
    }
    regex.push('$');
    // The pattern alphabet above cannot produce an invalid expression.
    Regex::new(&regex).map(|re| re.is_match(text)).unwrap_or(false)
}

/// Merge two comma-separated rule lists.
///
/// For each delta entry, in order:
/// - a negation `-name` removes every base entry matching `name` as a
///   wildcard pattern, and every base negation matching `-name` itself
///   (collapsing redundant negations);
/// - a positive `name` removes every base negation `-name` that would have
///   suppressed it, and every base entry `name` already covers;
/// - the delta entry is then appended.
///
/// A `None` base yields the delta unchanged.
pub fn merge_rule_lists(base: Option<&str>, delta: &str) -> String {
    let Some(base) = base else {
        return delta.to_string();
    };

    let mut merged: Vec<String> = base.split(',').map(|s| s.trim().to_string()).collect();

    for entry in delta.split(',').map(str::trim) {
        if let Some(name) = entry.strip_prefix('-') {
            merged.retain(|rule| !wildcard_match(rule, name));
            merged.retain(|rule| !wildcard_match(rule, entry));
        } else {
            let negated = format!("-{}", entry);
            merged.retain(|rule| !wildcard_match(rule, &negated));
            merged.retain(|rule| !wildcard_match(rule, entry));
        }
        merged.push(entry.to_string());
    }

    merged.join(",")
}
