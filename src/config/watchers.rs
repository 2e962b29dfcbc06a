//! Watcher resolution: which users asked to hear about the modified paths.
//!
//! Patterns are regular expressions matched case-insensitively against each
//! modified top-level path, anchored at the start (a match elsewhere in the
//! path does not count). The literal pattern `"/"` matches only the `"/"`
//! pseudo-path that stands for files at the repository root.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

use super::BotConfig;

/// Compiles a watcher/check path pattern.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// True if `pattern` matches any of `paths` under the anchored,
/// case-insensitive rules above.
pub(crate) fn pattern_matches(
    pattern: &str,
    paths: &BTreeSet<String>,
) -> Result<bool, regex::Error> {
    let re = compile_pattern(pattern)?;
    Ok(paths.iter().any(|path| {
        let path = path.trim();
        (path == "/" && pattern == "/") || matches_at_start(&re, path)
    }))
}

fn matches_at_start(re: &Regex, path: &str) -> bool {
    re.find(path).is_some_and(|m| m.start() == 0)
}

impl BotConfig {
    /// Users watching any of the modified paths.
    ///
    /// A malformed pattern disables that one entry, with a warning; it never
    /// fails the pass.
    pub fn watchers_for(&self, modified_paths: &BTreeSet<String>) -> BTreeSet<String> {
        let mut watching = BTreeSet::new();
        for (user, patterns) in &self.watchers {
            for pattern in patterns {
                match pattern_matches(pattern, modified_paths) {
                    Ok(true) => {
                        watching.insert(user.clone());
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            user = %user,
                            pattern = %pattern,
                            error = %e,
                            "skipping malformed watcher pattern"
                        );
                    }
                }
            }
        }
        watching
    }
}
