//! Command types for comments addressed at the bot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{CheckName, CommentId};

/// The outcome of parsing one comment that mentions the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParsedCommand {
    /// A well-formed trigger request: `@bot run build, lint env KEY=VALUE`.
    Trigger {
        tests: Vec<CheckName>,
        /// Extra environment overrides for the triggered run.
        extra_env: BTreeMap<String, String>,
    },

    /// The bot was mentioned but nothing after the mention parses as a
    /// command. Acknowledged with a `confused` reaction.
    NoCommand,

    /// The command named an unrecognized check or carried a malformed
    /// environment override. Acknowledged with a `-1` reaction.
    InvalidInput { reason: String },

    /// A structural grammar failure (trigger word with an empty check list,
    /// `env` keyword with no pairs). Logged, no reaction.
    GenericFail { reason: String },
}

/// One qualifying comment paired with its parse outcome, in comment
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentCommand {
    pub comment_id: CommentId,
    pub command: ParsedCommand,
}
