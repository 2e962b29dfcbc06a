//! Pure aggregation of fetched inputs into a [`PrSnapshot`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::commands::{CommentCommand, parse_comment};
use crate::config::BotConfig;
use crate::snapshot::{PrSnapshot, StatusTimeline, classify_comments};
use crate::types::{CheckObservation, CommentId, HeadCommit, IssueComment, LabelInfo, PullRequest, Sha};

/// A committer clock may drift; only a head commit dated further than this
/// into the future draws a notice.
const FUTURE_COMMIT_WINDOW: Duration = Duration::seconds(120);

/// Everything the fetch layer gathered about one PR.
#[derive(Debug, Clone)]
pub struct SnapshotInputs {
    pub pull: PullRequest,
    pub head_commit: HeadCommit,
    /// Current tip of the PR's base branch.
    pub base_head_sha: Sha,
    /// Status observations on the head commit, newest first.
    pub statuses: Vec<CheckObservation>,
    /// Issue comments in creation order.
    pub comments: Vec<IssueComment>,
    /// Comments the bot has already reacted to.
    pub bot_reacted: BTreeSet<CommentId>,
    /// Per-branch authorized users with team members already expanded.
    pub authorized_users: BTreeSet<String>,
    pub authorized_teams: BTreeSet<String>,
    /// The author is a member of the configured organization.
    pub trusted_author: bool,
    /// Modified top-level paths ("/" stands for files at the repo root).
    pub modified_paths: BTreeSet<String>,
    pub current_labels: Vec<LabelInfo>,
    pub now: DateTime<Utc>,
}

/// Builds the immutable snapshot the engine decides over.
pub fn build_snapshot(config: &BotConfig, inputs: SnapshotInputs) -> PrSnapshot {
    let mut authorized_users = inputs.authorized_users;
    if inputs.trusted_author {
        authorized_users.insert(inputs.pull.author.clone());
    }

    let watchers = config.watchers_for(&inputs.modified_paths);
    let required_checks = config.required_checks(&inputs.modified_paths);

    let mut timeline = StatusTimeline::new(config, &inputs.base_head_sha);
    for obs in &inputs.statuses {
        timeline.record(obs);
    }
    let timeline = timeline.finish();

    let classification = classify_comments(
        &inputs.comments,
        &config.bot.username,
        &authorized_users,
        inputs.head_commit.committed_at,
        &inputs.bot_reacted,
    );

    let known_checks = config.known_checks();
    let mut commands = Vec::new();
    for comment in &classification.kept {
        let Some(command) = parse_comment(&comment.body, &config.bot.username, &known_checks)
        else {
            continue;
        };
        debug!(comment = %comment.id, ?command, "parsed bot command");
        commands.push(CommentCommand {
            comment_id: comment.id,
            command,
        });
    }

    let future_commit = future_commit_delta(inputs.head_commit.committed_at, inputs.now);

    PrSnapshot {
        number: inputs.pull.number,
        author: inputs.pull.author,
        trusted_author: inputs.trusted_author,
        authorized_users,
        authorized_teams: inputs.authorized_teams,
        modified_folders: inputs.modified_paths,
        watchers,
        required_checks,
        base_ref: inputs.pull.base_ref,
        base_head_sha: inputs.base_head_sha,
        head_sha: inputs.head_commit.sha,
        head_committer: inputs.head_commit.committer,
        build_reference_sha: timeline.build_reference_sha,
        base_head_changed: timeline.base_head_changed,
        ledger: timeline.ledger,
        last_update: timeline.last_update,
        info_urls: timeline.info_urls,
        legit_checks: timeline.legit_checks,
        new_pr: classification.new_pr,
        previous_bot_comments: classification.previous_bot_comments,
        commands,
        future_commit,
        current_labels: inputs.current_labels,
    }
}

/// A human-readable delta when the commit is dated beyond the allowed window
/// in the future.
fn future_commit_delta(committed_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    let ahead = committed_at - now;
    (ahead > FUTURE_COMMIT_WINDOW).then(|| human_delta(ahead))
}

fn human_delta(delta: Duration) -> String {
    let total = delta.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut parts = Vec::new();
    for (amount, unit) in [(hours, "hour"), (minutes, "minute"), (seconds, "second")] {
        if amount > 0 {
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{} {}{}", amount, unit, plural));
        }
    }
    if parts.is_empty() {
        "0 seconds".to_string()
    } else {
        parts.join(" ")
    }
}
