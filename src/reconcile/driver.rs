//! The batch driver: fetch, snapshot, decide, execute, repeat.
//!
//! Each pass over a PR is independent: it fetches everything fresh, builds a
//! snapshot, runs the engine, and executes the returned effects in order. A
//! failing pass is logged and counted; the rest of the batch continues.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::effects::EffectInterpreter;
use crate::engine::ReconciliationEngine;
use crate::github::{fetch, GitHubApiError, GitHubInterpreter, InterpretError, OctocrabClient};
use crate::snapshot::{SnapshotInputs, build_snapshot};
use crate::trigger::TriggerSink;
use crate::types::{CommentId, PrNumber, PrState, PullRequest};

use super::queue::{WorkItem, WorkQueue};

/// A merge this recent sets off a cascade over its open siblings.
const MERGE_CASCADE_WINDOW: Duration = Duration::seconds(120);

/// A reconciliation pass over one PR failed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("fetch failed")]
    Fetch(#[from] GitHubApiError),

    #[error("effect execution failed")]
    Effect(#[from] InterpretError),
}

/// What a whole batch did.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reconciled: Vec<PrNumber>,
    pub skipped: Vec<PrNumber>,
    pub failed: Vec<PrNumber>,
}

impl BatchSummary {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

enum PassOutcome {
    Reconciled,
    Skipped,
}

/// Drives reconciliation passes over a queue of PRs.
pub struct BatchDriver<'a> {
    config: &'a BotConfig,
    client: OctocrabClient,
    interpreter: GitHubInterpreter,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a BotConfig, client: OctocrabClient) -> Self {
        let trigger = TriggerSink::new(
            config.trigger.properties_dir.clone(),
            config.repo.id(),
        );
        let interpreter = GitHubInterpreter::new(client.clone(), trigger);
        BatchDriver {
            config,
            client,
            interpreter,
        }
    }

    /// Reconciles every open PR once.
    pub async fn run_all(&self) -> Result<BatchSummary, ReconcileError> {
        let open = fetch::list_open_pulls(&self.client, None).await?;
        info!(count = open.len(), "reconciling all open PRs");
        let mut queue = WorkQueue::new();
        for pull in open {
            queue.push(pull.number, 0);
        }
        Ok(self.drain(queue).await)
    }

    /// Reconciles the named PRs once.
    pub async fn run(&self, prs: &[PrNumber]) -> BatchSummary {
        let mut queue = WorkQueue::new();
        for &pr in prs {
            queue.push(pr, 0);
        }
        self.drain(queue).await
    }

    async fn drain(&self, mut queue: WorkQueue) -> BatchSummary {
        let mut summary = BatchSummary::default();
        while let Some(item) = queue.pop() {
            match self.reconcile_one(item, &mut queue).await {
                Ok(PassOutcome::Reconciled) => summary.reconciled.push(item.pr),
                Ok(PassOutcome::Skipped) => summary.skipped.push(item.pr),
                Err(e) => {
                    error!(pr = %item.pr, error = %e, "reconciliation pass failed");
                    summary.failed.push(item.pr);
                }
            }
        }
        summary
    }

    async fn reconcile_one(
        &self,
        item: WorkItem,
        queue: &mut WorkQueue,
    ) -> Result<PassOutcome, ReconcileError> {
        let now = Utc::now();
        let pull = fetch::get_pull(&self.client, item.pr).await?;

        match &pull.state {
            PrState::Merged { merged_at } => {
                if merged_recently(*merged_at, now) {
                    self.enqueue_siblings(&pull, item, queue).await?;
                } else {
                    info!(pr = %item.pr, "PR already merged, nothing to reconcile");
                }
                return Ok(PassOutcome::Skipped);
            }
            PrState::Closed => {
                info!(pr = %item.pr, "PR is closed, skipping");
                return Ok(PassOutcome::Skipped);
            }
            PrState::Open => {}
        }

        if pull.changed_files == 0 {
            warn!(pr = %item.pr, "PR changes no files, skipping");
            return Ok(PassOutcome::Skipped);
        }

        let inputs = self.gather(&pull, now).await?;
        let snapshot = build_snapshot(self.config, inputs);
        let outcome = ReconciliationEngine::new(self.config).reconcile(&snapshot, now);
        info!(
            pr = %item.pr,
            effects = outcome.effects.len(),
            triggered = outcome.triggered.len(),
            "pass decided"
        );

        for effect in outcome.effects {
            self.interpreter.interpret(effect).await?;
        }
        Ok(PassOutcome::Reconciled)
    }

    /// A fresh merge moved the base branch under every open sibling; enqueue
    /// them one cascade level deeper.
    async fn enqueue_siblings(
        &self,
        merged: &PullRequest,
        item: WorkItem,
        queue: &mut WorkQueue,
    ) -> Result<(), ReconcileError> {
        let siblings = fetch::list_open_pulls(&self.client, Some(&merged.base_ref)).await?;
        info!(
            pr = %item.pr,
            base = %merged.base_ref,
            siblings = siblings.len(),
            "PR merged recently, cascading over open siblings"
        );
        for sibling in siblings {
            if sibling.number != merged.number {
                queue.push(sibling.number, item.depth + 1);
            }
        }
        Ok(())
    }

    /// Fetches everything a snapshot needs for one open PR.
    async fn gather(
        &self,
        pull: &PullRequest,
        now: DateTime<Utc>,
    ) -> Result<SnapshotInputs, ReconcileError> {
        let base_head_sha = fetch::get_branch_head(&self.client, &pull.base_ref).await?;
        let head_commit = fetch::get_head_commit(&self.client, &pull.head_sha).await?;
        let statuses = fetch::list_statuses(&self.client, &pull.head_sha).await?;
        let comments = fetch::list_comments(&self.client, pull.number).await?;
        let current_labels = fetch::list_labels(&self.client, pull.number).await?;
        let modified_paths = fetch::list_modified_folders(&self.client, pull.number).await?;

        let trusted_author =
            fetch::is_org_member(&self.client, &self.config.bot.org, &pull.author).await?;

        let branch_auth = self.config.authorized_for_branch(&pull.base_ref);
        let authorized_teams: BTreeSet<String> = branch_auth.teams.iter().cloned().collect();
        let mut authorized_users: BTreeSet<String> = branch_auth.users.into_iter().collect();
        for team in &branch_auth.teams {
            match fetch::list_team_members(&self.client, &self.config.bot.org, team).await {
                Ok(members) => authorized_users.extend(members),
                // Membership expansion degrades to the configured user list.
                Err(e) => {
                    warn!(team = %team, error = %e, "failed to expand team members");
                }
            }
        }

        let bot_reacted = self
            .bot_reacted_comments(&comments, head_commit.committed_at)
            .await?;

        Ok(SnapshotInputs {
            pull: pull.clone(),
            head_commit,
            base_head_sha,
            statuses,
            comments,
            bot_reacted,
            authorized_users,
            authorized_teams,
            trusted_author,
            modified_paths,
            current_labels,
            now,
        })
    }

    /// Comments the bot has already reacted to. Only plausibly live comments
    /// (non-bot, not older than the head commit) are worth a reactions call.
    async fn bot_reacted_comments(
        &self,
        comments: &[crate::types::IssueComment],
        head_committed_at: DateTime<Utc>,
    ) -> Result<BTreeSet<CommentId>, ReconcileError> {
        let bot = &self.config.bot.username;
        let mut reacted = BTreeSet::new();
        for comment in comments {
            if comment.author == *bot || comment.created_at < head_committed_at {
                continue;
            }
            let reactors = fetch::list_comment_reactions(&self.client, comment.id).await?;
            if reactors.iter().any(|login| login == bot) {
                debug!(comment = %comment.id, "bot already reacted");
                reacted.insert(comment.id);
            }
        }
        Ok(reacted)
    }
}

/// True if the merge happened within the cascade window.
fn merged_recently(merged_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - merged_at <= MERGE_CASCADE_WINDOW
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn merge_window_is_two_minutes_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(merged_recently(now - Duration::seconds(30), now));
        assert!(merged_recently(now - Duration::seconds(120), now));
        assert!(!merged_recently(now - Duration::seconds(121), now));
    }

    #[test]
    fn future_merge_timestamp_still_counts_as_recent() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert!(merged_recently(now + Duration::seconds(5), now));
    }
}
