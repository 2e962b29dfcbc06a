//! Bot configuration, loaded once at startup from a TOML file.
//!
//! The config names the bot identity, the repository it shepherds, the check
//! suites it knows how to trigger, label translation tables, per-branch
//! authorization lists, and the watcher table. Everything downstream borrows
//! an immutable `BotConfig`.

pub mod suites;
pub mod watchers;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CheckState, RawState, RepoId};

pub use suites::UNRECOGNISED_MARKER;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub bot: BotIdentity,
    pub repo: RepoSection,
    #[serde(default)]
    pub trigger: TriggerSection,
    #[serde(default)]
    pub checks: BTreeMap<String, CheckSuite>,
    #[serde(default)]
    pub labels: LabelSection,
    #[serde(default)]
    pub auth: AuthSection,
    /// user -> path patterns the user wants change notifications for.
    #[serde(default)]
    pub watchers: BTreeMap<String, Vec<String>>,
}

/// Who the bot is on the hosting platform.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    /// The bot's login. Comments by this user are the bot's own, and
    /// `@{username}` in a comment addresses the bot.
    pub username: String,
    /// Organization whose members are trusted to have tests run automatically.
    pub org: String,
}

/// The repository this instance shepherds.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSection {
    pub owner: String,
    pub name: String,
}

impl RepoSection {
    pub fn id(&self) -> RepoId {
        RepoId::new(&self.owner, &self.name)
    }
}

/// Build-trigger behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSection {
    /// Trigger the required tests when a trusted author opens a new PR.
    #[serde(default = "default_true")]
    pub auto_trigger_on_open: bool,
    /// Directory receiving trigger properties files for the build executor.
    #[serde(default = "default_properties_dir")]
    pub properties_dir: PathBuf,
}

impl Default for TriggerSection {
    fn default() -> Self {
        TriggerSection {
            auto_trigger_on_open: true,
            properties_dir: default_properties_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_properties_dir() -> PathBuf {
    PathBuf::from("triggers")
}

/// One configured check suite.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuite {
    /// The wire context string this check reports under.
    pub context: String,
    /// Minutes a triggered run may sit in pending/running before it counts
    /// as stalled.
    #[serde(default = "default_stall_minutes")]
    pub stall_minutes: i64,
    /// Path patterns (anchored, case-insensitive regexes over modified
    /// top-level paths) that make this check required. Empty means the check
    /// is required on every PR.
    #[serde(default)]
    pub paths: Vec<String>,
}

fn default_stall_minutes() -> i64 {
    180
}

/// Label translation tables.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelSection {
    /// Raw wire state -> display state.
    #[serde(default = "default_state_labels")]
    pub states: BTreeMap<String, String>,
    /// Label-name substring -> hex color, for repairing placeholder-colored
    /// labels.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl Default for LabelSection {
    fn default() -> Self {
        LabelSection {
            states: default_state_labels(),
            colors: BTreeMap::new(),
        }
    }
}

fn default_state_labels() -> BTreeMap<String, String> {
    let mut states = BTreeMap::new();
    states.insert("success".to_string(), "finished".to_string());
    states.insert("failure".to_string(), "failed".to_string());
    states
}

/// Per-branch authorization lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    /// Base branch -> authorized users/teams. The `"*"` entry applies to
    /// every branch.
    #[serde(default)]
    pub branches: BTreeMap<String, BranchAuth>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchAuth {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

impl BotConfig {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<BotConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BotConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants the serde layer cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.username.trim().is_empty() {
            return Err(ConfigError::Invalid("bot.username is empty".to_string()));
        }
        if self.bot.org.trim().is_empty() {
            return Err(ConfigError::Invalid("bot.org is empty".to_string()));
        }
        if self.repo.owner.trim().is_empty() || self.repo.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "repo.owner and repo.name must be set".to_string(),
            ));
        }

        let mut seen_contexts = BTreeMap::new();
        for (name, suite) in &self.checks {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("empty check name".to_string()));
            }
            if suite.context.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "check '{}' has an empty context",
                    name
                )));
            }
            if suite.stall_minutes <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "check '{}' has non-positive stall_minutes",
                    name
                )));
            }
            if let Some(previous) = seen_contexts.insert(suite.context.clone(), name.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "checks '{}' and '{}' share context '{}'",
                    previous, name, suite.context
                )));
            }
            for pattern in &suite.paths {
                watchers::compile_pattern(pattern).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "check '{}' has a malformed path pattern '{}': {}",
                        name, pattern, e
                    ))
                })?;
            }
        }

        // The build check's sentinel context is derived as `{context}/last` and
        // recognized by the `buildtest/last` substring, so the context must end
        // with `buildtest` for the record to survive a round trip.
        if let Some(build) = self.checks.get(crate::types::BUILD_CHECK) {
            if !build.context.ends_with("buildtest") {
                return Err(ConfigError::Invalid(format!(
                    "the build check's context must end with 'buildtest', got '{}'",
                    build.context
                )));
            }
        }

        for (raw, display) in &self.labels.states {
            if RawState::parse(raw).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "labels.states key '{}' is not a raw state",
                    raw
                )));
            }
            if CheckState::parse(display).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "labels.states value '{}' is not a check state",
                    display
                )));
            }
        }

        Ok(())
    }

    /// Translates a raw wire state into its display state.
    pub fn display_state(&self, raw: RawState) -> CheckState {
        self.labels
            .states
            .get(raw.as_api_str())
            .and_then(|s| CheckState::parse(s))
            .unwrap_or_else(|| CheckState::from_raw(raw))
    }

    /// The repair color for a placeholder-colored label, if any configured
    /// substring matches the label name.
    pub fn label_color_for(&self, label_name: &str) -> Option<&str> {
        self.labels
            .colors
            .iter()
            .find(|(substring, _)| label_name.contains(substring.as_str()))
            .map(|(_, color)| color.as_str())
    }

    /// Users and teams authorized to invoke tests on PRs targeting `branch`.
    ///
    /// Merges the branch-specific entry with the `"*"` entry.
    pub fn authorized_for_branch(&self, branch: &str) -> BranchAuth {
        let mut merged = BranchAuth::default();
        for key in ["*", branch] {
            if let Some(entry) = self.auth.branches.get(key) {
                merged.users.extend(entry.users.iter().cloned());
                merged.teams.extend(entry.teams.iter().cloned());
            }
        }
        merged
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> BotConfig {
    let toml_src = r#"
        [bot]
        username = "check-shepherd"
        org = "acme"

        [repo]
        owner = "acme"
        name = "widget"

        [trigger]
        auto_trigger_on_open = true
        properties_dir = "triggers"

        [checks.build]
        context = "acme-ci/buildtest"
        stall_minutes = 240

        [checks.lint]
        context = "acme-ci/lint"
        stall_minutes = 60
        paths = ["Offline/"]

        [labels.colors]
        finished = "2cbe4e"
        failed = "d73a4a"
        running = "dbab09"

        [auth.branches.main]
        users = ["hcasler"]
        teams = ["ci-admins"]

        [auth.branches."*"]
        users = ["release-bot"]

        [watchers]
        alice = ["Offline/"]
        bob = ["/"]
    "#;
    let config: BotConfig = toml::from_str(toml_src).unwrap();
    config.validate().unwrap();
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckState;

    #[test]
    fn sample_config_parses_and_validates() {
        let config = test_config();
        assert_eq!(config.bot.username, "check-shepherd");
        assert_eq!(config.repo.id(), RepoId::new("acme", "widget"));
        assert!(config.trigger.auto_trigger_on_open);
        assert_eq!(config.checks.len(), 2);
    }

    #[test]
    fn default_state_table_maps_success_and_failure() {
        let config = test_config();
        assert_eq!(config.display_state(RawState::Success), CheckState::Finished);
        assert_eq!(config.display_state(RawState::Failure), CheckState::Failed);
        assert_eq!(config.display_state(RawState::Pending), CheckState::Pending);
        assert_eq!(config.display_state(RawState::Error), CheckState::Error);
    }

    #[test]
    fn label_color_matches_by_substring() {
        let config = test_config();
        assert_eq!(config.label_color_for("build finished"), Some("2cbe4e"));
        assert_eq!(config.label_color_for("lint failed"), Some("d73a4a"));
        assert_eq!(config.label_color_for("something else"), None);
    }

    #[test]
    fn branch_auth_merges_wildcard() {
        let config = test_config();
        let auth = config.authorized_for_branch("main");
        assert!(auth.users.contains(&"hcasler".to_string()));
        assert!(auth.users.contains(&"release-bot".to_string()));
        assert_eq!(auth.teams, vec!["ci-admins".to_string()]);

        let other = config.authorized_for_branch("develop");
        assert_eq!(other.users, vec!["release-bot".to_string()]);
        assert!(other.teams.is_empty());
    }

    #[test]
    fn build_context_must_end_with_buildtest() {
        let mut config = test_config();
        config
            .checks
            .get_mut("build")
            .unwrap()
            .context = "acme-ci/compile".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buildtest"));
    }

    #[test]
    fn duplicate_contexts_rejected() {
        let mut config = test_config();
        config.checks.get_mut("lint").unwrap().context = "acme-ci/buildtest".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_check_path_pattern_rejected() {
        let mut config = test_config();
        config.checks.get_mut("lint").unwrap().paths = vec!["[".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_state_label_rejected() {
        let mut config = test_config();
        config
            .labels
            .states
            .insert("success".to_string(), "nonsense".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_sections_get_defaults() {
        let minimal = r#"
            [bot]
            username = "check-shepherd"
            org = "acme"

            [repo]
            owner = "acme"
            name = "widget"
        "#;
        let config: BotConfig = toml::from_str(minimal).unwrap();
        config.validate().unwrap();
        assert!(config.trigger.auto_trigger_on_open);
        assert_eq!(config.labels.states.get("success").unwrap(), "finished");
        assert!(config.checks.is_empty());
        assert!(config.watchers.is_empty());
    }
}
