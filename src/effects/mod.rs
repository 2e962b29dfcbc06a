//! Effects-as-data for the mutations a reconciliation pass decides on.
//!
//! The engine is pure: it returns a list of [`Effect`] values describing the
//! statuses, labels, comments, reactions, and trigger artifacts it wants,
//! without executing anything. This enables:
//! - Pure core logic that returns effects as data
//! - Testability via mock interpreters
//! - Logging/tracing of intended operations
//!
//! The octocrab-backed interpreter lives in [`crate::github`].

pub mod interpreter;

pub use interpreter::EffectInterpreter;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::{CheckName, CommentId, PrNumber, RawState, Sha};

/// One mutation the engine wants executed.
///
/// Effects are scoped to the repository the interpreter was constructed
/// with; PR-level effects carry their PR number so one batch can span
/// several pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect_type", rename_all = "snake_case")]
pub enum Effect {
    /// Create a commit status on `sha`.
    CreateStatus {
        sha: Sha,
        state: RawState,
        context: String,
        description: String,
        target_url: Option<String>,
    },

    /// React to a comment, acknowledging its command.
    AddReaction {
        comment_id: CommentId,
        reaction: Reaction,
    },

    /// Replace the PR's full label set.
    SetLabels {
        pr: PrNumber,
        labels: BTreeSet<String>,
    },

    /// Repair the color of a label created with the platform placeholder.
    EditLabelColor { label: String, color: String },

    /// Post a comment on the PR's issue thread.
    PostComment { pr: PrNumber, body: String },

    /// Hand a test run to the build executor.
    EnqueueTest {
        pr: PrNumber,
        check: CheckName,
        head_sha: Sha,
        base_sha: Sha,
        extra_env: BTreeMap<String, String>,
    },
}

/// A comment reaction, as the reactions API names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    PlusOne,
    MinusOne,
    Laugh,
    Confused,
    Heart,
    Hooray,
    Rocket,
    Eyes,
}

impl Reaction {
    /// The wire name the reactions API expects.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Reaction::PlusOne => "+1",
            Reaction::MinusOne => "-1",
            Reaction::Laugh => "laugh",
            Reaction::Confused => "confused",
            Reaction::Heart => "heart",
            Reaction::Hooray => "hooray",
            Reaction::Rocket => "rocket",
            Reaction::Eyes => "eyes",
        }
    }
}
