//! Stage 7: notification composition.
//!
//! At most one of greeting / tests-triggered / already-triggered is posted,
//! checked in that priority order. Stall, base-change, and future-commit
//! notices are independent. Every body is suppressed if the bot has already
//! posted the identical text on this PR.

use tracing::debug;

use crate::config::BotConfig;
use crate::effects::Effect;
use crate::messages;
use crate::snapshot::PrSnapshot;
use crate::types::CheckName;

pub(crate) struct NotificationInputs<'a> {
    pub snapshot: &'a PrSnapshot,
    pub triggered: &'a [CheckName],
    pub already_triggered: &'a [CheckName],
    pub stalled: &'a [CheckName],
    /// Pre-rendered `- name ([more info](url))` lines for the stall notice.
    pub stall_info: &'a str,
    pub notify_base_changed: bool,
    /// No external status object currently announces the build check.
    pub build_status_missing: bool,
}

pub(crate) fn compose(
    config: &BotConfig,
    inputs: &NotificationInputs<'_>,
    effects: &mut Vec<Effect>,
) {
    let snapshot = inputs.snapshot;

    let triggered_notice = if inputs.triggered.is_empty() {
        String::new()
    } else {
        messages::tests_triggered(
            snapshot.head_sha.as_str(),
            inputs.triggered,
            inputs.already_triggered,
        )
    };

    if snapshot.new_pr {
        let body = messages::salutation(&messages::Salutation {
            author: &snapshot.author,
            base_branch: &snapshot.base_ref,
            changed_folders: &snapshot.modified_folders,
            tests_required: &snapshot.required_checks,
            watchers: &snapshot.watchers,
            authorized_teams: &snapshot.authorized_teams,
            org: &config.bot.org,
            trusted_author: snapshot.trusted_author,
            triggered_notice: &triggered_notice,
        });
        post(snapshot, body, effects);
    } else if !inputs.triggered.is_empty() {
        post(snapshot, triggered_notice, effects);
    } else if !inputs.already_triggered.is_empty() {
        let body = messages::tests_already_triggered(
            snapshot.head_sha.as_str(),
            inputs.already_triggered,
        );
        post(snapshot, body, effects);
    }

    if !inputs.stalled.is_empty() {
        let body = messages::job_stall(inputs.stalled, inputs.stall_info);
        post(snapshot, body, effects);
    }

    if inputs.notify_base_changed && inputs.triggered.is_empty() {
        let body =
            messages::base_branch_changed(&snapshot.base_ref, snapshot.base_head_sha.short());
        post(snapshot, body, effects);
    }

    if inputs.build_status_missing {
        if let Some(delta) = &snapshot.future_commit {
            let body = messages::future_commit(&snapshot.head_committer, delta);
            post(snapshot, body, effects);
        }
    }
}

/// Queues a comment unless the bot has already posted the same text here.
fn post(snapshot: &PrSnapshot, body: String, effects: &mut Vec<Effect>) {
    let duplicate = snapshot
        .previous_bot_comments
        .iter()
        .any(|previous| previous.trim() == body.trim());
    if duplicate {
        debug!(pr = %snapshot.number, "suppressing duplicate comment");
        return;
    }
    effects.push(Effect::PostComment {
        pr: snapshot.number,
        body,
    });
}
