//! Pull request and comment types as fetched from the hosting platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CommentId, PrNumber, Sha};

/// The state of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrState {
    /// The PR is open and subject to reconciliation.
    Open,

    /// The PR was merged at the given time. A recent merge sets off a
    /// cascade over sibling PRs with the same base branch.
    Merged { merged_at: DateTime<Utc> },

    /// The PR was closed without merging.
    Closed,
}

impl PrState {
    pub fn is_open(&self) -> bool {
        matches!(self, PrState::Open)
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, PrState::Merged { .. })
    }

    /// When the PR merged, if it did.
    pub fn merged_at(&self) -> Option<DateTime<Utc>> {
        match self {
            PrState::Merged { merged_at } => Some(*merged_at),
            _ => None,
        }
    }
}

/// A pull request as fetched at the start of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: PrNumber,
    /// Login of the PR author.
    pub author: String,
    pub head_sha: Sha,
    /// The base branch name (e.g. "main").
    pub base_ref: String,
    pub state: PrState,
    /// Number of files the PR changes. Zero-file PRs are skipped.
    pub changed_files: u64,
}

/// The head commit of a PR, as reported by the commit API.
///
/// The committer timestamp drives future-commit detection; the login feeds
/// the future-commit notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadCommit {
    pub sha: Sha,
    pub committer: String,
    pub committed_at: DateTime<Utc>,
}

/// One comment on the PR's issue thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: CommentId,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A label currently on the PR, with its display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub name: String,
    /// Hex color without the leading `#`. GitHub assigns `ededed` to labels
    /// created implicitly, which the engine repairs.
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn merged_state_carries_timestamp() {
        let merged_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let state = PrState::Merged { merged_at };
        assert!(state.is_merged());
        assert!(!state.is_open());
        assert_eq!(state.merged_at(), Some(merged_at));
    }

    #[test]
    fn open_and_closed_have_no_merge_time() {
        assert_eq!(PrState::Open.merged_at(), None);
        assert_eq!(PrState::Closed.merged_at(), None);
        assert!(PrState::Open.is_open());
        assert!(!PrState::Closed.is_open());
    }

    #[test]
    fn pr_state_serde_tags() {
        let json = serde_json::to_string(&PrState::Open).unwrap();
        assert_eq!(json, r#"{"status":"open"}"#);
        let parsed: PrState = serde_json::from_str(r#"{"status":"closed"}"#).unwrap();
        assert_eq!(parsed, PrState::Closed);
    }
}
