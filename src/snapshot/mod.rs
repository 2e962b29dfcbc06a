//! Per-pass PR snapshots.
//!
//! A [`PrSnapshot`] is built fresh on every reconciliation pass from live
//! platform reads and never persisted: all cross-pass memory lives in the
//! commit-status history and comment history. The snapshot itself is
//! immutable once built; the engine works on an owned copy of its
//! [`CheckLedger`].

mod builder;
mod comments;
mod timeline;

pub use builder::{SnapshotInputs, build_snapshot};
pub use comments::{CommentClassification, classify_comments};
pub use timeline::{StatusTimeline, TimelineSummary};

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::commands::CommentCommand;
use crate::types::{CheckName, CheckState, LabelInfo, PrNumber, Sha};

/// The per-check working state threaded through the decision stages.
///
/// `triggered` is monotonic within the timeline; only the engine's stall and
/// base-change resets ever clear it. `status_exists` records whether an
/// external status object already reflects the current decision, so pending
/// re-emissions can be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckLedger {
    pub statuses: BTreeMap<CheckName, CheckState>,
    pub triggered: BTreeMap<CheckName, bool>,
    pub status_exists: BTreeMap<CheckName, bool>,
}

impl CheckLedger {
    pub fn state(&self, name: &CheckName) -> Option<CheckState> {
        self.statuses.get(name).copied()
    }

    pub fn is_triggered(&self, name: &CheckName) -> bool {
        self.triggered.get(name).copied().unwrap_or(false)
    }

    pub fn has_status_object(&self, name: &CheckName) -> bool {
        self.status_exists.get(name).copied().unwrap_or(false)
    }

    /// Resets a check to `state` with the trigger flag cleared and no
    /// external status object, forcing re-emission.
    pub fn reset(&mut self, name: &CheckName, state: CheckState) {
        self.statuses.insert(name.clone(), state);
        self.triggered.insert(name.clone(), false);
        self.status_exists.insert(name.clone(), false);
    }

    /// Marks a check as freshly queued: pending and triggered. Whether an
    /// external status object exists is left alone; the queued check emits
    /// its own statuses regardless.
    pub fn mark_queued(&mut self, name: &CheckName) {
        self.statuses.insert(name.clone(), CheckState::Pending);
        self.triggered.insert(name.clone(), true);
    }
}

/// Everything the engine needs to know about one PR, gathered once.
#[derive(Debug, Clone)]
pub struct PrSnapshot {
    pub number: PrNumber,
    pub author: String,
    /// The author is a member of the configured organization.
    pub trusted_author: bool,
    /// Users whose comments may trigger tests (per-branch config, expanded
    /// team members, and the author when trusted).
    pub authorized_users: BTreeSet<String>,
    /// Team slugs from the per-branch config, for the greeting.
    pub authorized_teams: BTreeSet<String>,
    /// Modified top-level paths ("/" stands for files at the repo root).
    pub modified_folders: BTreeSet<String>,
    pub watchers: BTreeSet<String>,
    pub required_checks: BTreeSet<CheckName>,
    pub base_ref: String,
    /// Current tip of the base branch.
    pub base_head_sha: Sha,
    pub head_sha: Sha,
    pub head_committer: String,
    /// The base SHA (possibly shortened) the build test last ran against,
    /// recovered from the sentinel status description.
    pub build_reference_sha: Option<String>,
    /// The base branch tip no longer matches the recorded build reference.
    pub base_head_changed: bool,
    pub ledger: CheckLedger,
    /// Latest observation time per check, for stall arithmetic.
    pub last_update: BTreeMap<CheckName, DateTime<Utc>>,
    /// Target URLs captured from running observations, for stall notices.
    pub info_urls: BTreeMap<CheckName, String>,
    /// Checks whose wire context configuration recognizes.
    pub legit_checks: BTreeSet<CheckName>,
    /// The bot has never commented on this PR before.
    pub new_pr: bool,
    /// Bodies of the bot's own prior comments, for duplicate suppression.
    pub previous_bot_comments: Vec<String>,
    /// Parsed commands from kept comments, in comment creation order.
    pub commands: Vec<CommentCommand>,
    /// Human-readable amount by which the head commit is dated in the
    /// future, when it is.
    pub future_commit: Option<String>,
    pub current_labels: Vec<LabelInfo>,
}
