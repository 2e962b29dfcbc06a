//! Check-domain types: names, wire states, display states, observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The check that merges the PR head into the base branch and compiles it.
///
/// This check gets special treatment: a sentinel status records which base
/// commit it last ran against, and a base-branch move invalidates its result.
pub const BUILD_CHECK: &str = "build";

/// A named check/test (e.g. "build").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckName(pub String);

impl CheckName {
    pub fn new(s: impl Into<String>) -> Self {
        CheckName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_build(&self) -> bool {
        self.0 == BUILD_CHECK
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckName {
    fn from(s: &str) -> Self {
        CheckName(s.to_string())
    }
}

impl From<String> for CheckName {
    fn from(s: String) -> Self {
        CheckName(s)
    }
}

impl Borrow<str> for CheckName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A raw commit-status state as the hosting API reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawState {
    Pending,
    Success,
    Failure,
    Error,
}

impl RawState {
    /// The wire string accepted and produced by the status API.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            RawState::Pending => "pending",
            RawState::Success => "success",
            RawState::Failure => "failure",
            RawState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<RawState> {
        match s {
            "pending" => Some(RawState::Pending),
            "success" => Some(RawState::Success),
            "failure" => Some(RawState::Failure),
            "error" => Some(RawState::Error),
            _ => None,
        }
    }
}

impl fmt::Display for RawState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_api_str())
    }
}

/// The display state of a check, as shown in labels and used by trigger decisions.
///
/// Raw wire states pass through the configurable `[labels.states]` table
/// (defaults map `success` to `finished` and `failure` to `failed`), and
/// `Running`/`Stalled` are derived from status description text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Pending,
    Running,
    Stalled,
    Success,
    Failure,
    Finished,
    Failed,
    Error,
}

impl CheckState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckState::Pending => "pending",
            CheckState::Running => "running",
            CheckState::Stalled => "stalled",
            CheckState::Success => "success",
            CheckState::Failure => "failure",
            CheckState::Finished => "finished",
            CheckState::Failed => "failed",
            CheckState::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<CheckState> {
        match s {
            "pending" => Some(CheckState::Pending),
            "running" => Some(CheckState::Running),
            "stalled" => Some(CheckState::Stalled),
            "success" => Some(CheckState::Success),
            "failure" => Some(CheckState::Failure),
            "finished" => Some(CheckState::Finished),
            "failed" => Some(CheckState::Failed),
            "error" => Some(CheckState::Error),
            _ => None,
        }
    }

    /// The untranslated display of a raw wire state.
    pub fn from_raw(raw: RawState) -> CheckState {
        match raw {
            RawState::Pending => CheckState::Pending,
            RawState::Success => CheckState::Success,
            RawState::Failure => CheckState::Failure,
            RawState::Error => CheckState::Error,
        }
    }

    /// True for states a command may not re-trigger past: the check ran to
    /// completion and a fresh run needs nothing reset first.
    ///
    /// Untranslated `failure` is deliberately absent: only the translated
    /// `failed` form counts, matching the trigger dedup rule.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckState::Failed | CheckState::Error | CheckState::Success | CheckState::Finished
        )
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One commit-status record observed on the PR's head commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckObservation {
    /// The wire context string (e.g. "acme-ci/buildtest").
    pub context: String,
    pub raw_state: RawState,
    pub description: String,
    pub target_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
