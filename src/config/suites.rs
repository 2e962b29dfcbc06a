//! Check-suite queries: required checks for a change, wire-context
//! translation, stall thresholds.

use std::collections::BTreeSet;

use chrono::Duration;

use super::{BotConfig, watchers};
use crate::types::{BUILD_CHECK, CheckName};

/// Marker substring in label names standing for an unrecognized check.
/// Labels containing it are left out of label reconciliation.
pub const UNRECOGNISED_MARKER: &str = "unrecognised";

/// Substring identifying the sentinel status context that records which base
/// commit the build test last ran against.
pub const BUILD_REFERENCE_CONTEXT_MARKER: &str = "buildtest/last";

/// True if a wire context is the build-reference sentinel rather than an
/// ordinary check status.
pub fn is_build_reference_context(context: &str) -> bool {
    context.contains(BUILD_REFERENCE_CONTEXT_MARKER)
}

impl BotConfig {
    /// All configured check names.
    pub fn known_checks(&self) -> BTreeSet<CheckName> {
        self.checks
            .keys()
            .map(|name| CheckName::from(name.as_str()))
            .collect()
    }

    /// True if `name` is a configured check.
    pub fn is_known_check(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// The wire context a check reports under.
    pub fn check_alias(&self, name: &CheckName) -> Option<&str> {
        self.checks.get(name.as_str()).map(|s| s.context.as_str())
    }

    /// Reverse translation from a wire context to a configured check name.
    /// Returns `None` for contexts no suite claims.
    pub fn check_name_from_alias(&self, context: &str) -> Option<CheckName> {
        self.checks
            .iter()
            .find(|(_, suite)| suite.context == context)
            .map(|(name, _)| CheckName::from(name.as_str()))
    }

    /// The sentinel context under which the build reference is recorded,
    /// derived from the build check's own context.
    pub fn build_reference_context(&self) -> Option<String> {
        self.checks
            .get(BUILD_CHECK)
            .map(|suite| format!("{}/last", suite.context))
    }

    /// How long a triggered run may sit unresolved before it counts as stalled.
    pub fn stall_threshold(&self, name: &CheckName) -> Duration {
        let minutes = self
            .checks
            .get(name.as_str())
            .map(|suite| suite.stall_minutes)
            .unwrap_or(super::default_stall_minutes());
        Duration::minutes(minutes)
    }

    /// The checks required for a change touching `modified_paths`.
    ///
    /// A suite with no path patterns is required on every PR; otherwise it is
    /// required when any modified top-level path matches one of its patterns.
    /// Patterns were validated at load time, so compilation cannot fail here.
    pub fn required_checks(&self, modified_paths: &BTreeSet<String>) -> BTreeSet<CheckName> {
        let mut required = BTreeSet::new();
        for (name, suite) in &self.checks {
            let wanted = suite.paths.is_empty()
                || suite.paths.iter().any(|pattern| {
                    watchers::pattern_matches(pattern, modified_paths).unwrap_or(false)
                });
            if wanted {
                required.insert(CheckName::from(name.as_str()));
            }
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn paths(entries: &[&str]) -> BTreeSet<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn known_checks_lists_configured_names() {
        let config = test_config();
        let known = config.known_checks();
        assert_eq!(known.len(), 2);
        assert!(known.contains("build"));
        assert!(known.contains("lint"));
    }

    #[test]
    fn alias_roundtrip() {
        let config = test_config();
        let build = CheckName::new("build");
        let context = config.check_alias(&build).unwrap();
        assert_eq!(context, "acme-ci/buildtest");
        assert_eq!(config.check_name_from_alias(context), Some(build));
    }

    #[test]
    fn unknown_context_translates_to_none() {
        let config = test_config();
        assert_eq!(config.check_name_from_alias("someone-elses/ci"), None);
    }

    #[test]
    fn sentinel_context_detection() {
        let config = test_config();
        let sentinel = config.build_reference_context().unwrap();
        assert_eq!(sentinel, "acme-ci/buildtest/last");
        assert!(is_build_reference_context(&sentinel));
        assert!(!is_build_reference_context("acme-ci/buildtest"));
    }

    #[test]
    fn stall_threshold_per_check_with_default() {
        let config = test_config();
        assert_eq!(
            config.stall_threshold(&CheckName::new("build")),
            Duration::minutes(240)
        );
        assert_eq!(
            config.stall_threshold(&CheckName::new("lint")),
            Duration::minutes(60)
        );
        assert_eq!(
            config.stall_threshold(&CheckName::new("never-configured")),
            Duration::minutes(180)
        );
    }

    #[test]
    fn pathless_check_always_required() {
        let config = test_config();
        let required = config.required_checks(&paths(&["docs/"]));
        assert!(required.contains("build"));
        assert!(!required.contains("lint"));
    }

    #[test]
    fn path_scoped_check_required_on_match() {
        let config = test_config();
        let required = config.required_checks(&paths(&["Offline/", "docs/"]));
        assert!(required.contains("build"));
        assert!(required.contains("lint"));
    }

    #[test]
    fn no_paths_still_requires_pathless_checks() {
        let config = test_config();
        let required = config.required_checks(&BTreeSet::new());
        assert!(required.contains("build"));
        assert!(!required.contains("lint"));
    }
}
