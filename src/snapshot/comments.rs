//! Comment classification: which comments the bot has already handled, and
//! which are live candidates for command parsing.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{CommentId, IssueComment};

/// What the classifier distilled from one PR's comment history.
#[derive(Debug, Clone, Default)]
pub struct CommentClassification {
    /// The bot has never commented here before.
    pub new_pr: bool,
    /// Creation time of the bot's most recent comment.
    pub last_time_seen: Option<DateTime<Utc>>,
    /// Bodies of every bot-authored comment, for duplicate suppression.
    pub previous_bot_comments: Vec<String>,
    /// Comments still worth parsing for commands, in creation order.
    pub kept: Vec<IssueComment>,
}

/// Partitions a PR's comments into the bot's own history and live command
/// candidates.
///
/// A non-bot comment is kept only if its author is authorized, it is not
/// older than the head commit, not older than the bot's last comment, and
/// the bot has not already reacted to it (a reaction marks it handled by a
/// previous pass).
pub fn classify_comments(
    comments: &[IssueComment],
    bot_username: &str,
    authorized_users: &BTreeSet<String>,
    head_committed_at: DateTime<Utc>,
    bot_reacted: &BTreeSet<CommentId>,
) -> CommentClassification {
    let mut classification = CommentClassification::default();

    for comment in comments {
        if comment.author == bot_username {
            let newest_so_far = classification
                .last_time_seen
                .is_none_or(|seen| comment.created_at > seen);
            if newest_so_far {
                classification.last_time_seen = Some(comment.created_at);
            }
            classification.previous_bot_comments.push(comment.body.clone());
        }
    }
    classification.new_pr = classification.last_time_seen.is_none();

    for comment in comments {
        if comment.author == bot_username {
            continue;
        }
        if comment.created_at < head_committed_at {
            debug!(comment = %comment.id, "ignoring comment older than the head commit");
            continue;
        }
        if let Some(seen) = classification.last_time_seen {
            if comment.created_at < seen {
                debug!(comment = %comment.id, "ignoring comment the bot already responded past");
                continue;
            }
        }
        if !authorized_users.contains(&comment.author) {
            debug!(
                comment = %comment.id,
                author = %comment.author,
                "ignoring comment from unauthorized user"
            );
            continue;
        }
        if bot_reacted.contains(&comment.id) {
            debug!(comment = %comment.id, "ignoring comment already acknowledged by reaction");
            continue;
        }
        classification.kept.push(comment.clone());
    }

    classification
}
