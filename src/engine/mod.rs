//! The reconciliation engine: snapshot in, effects out.
//!
//! The engine is pure and infallible. It works on an owned copy of the
//! snapshot's [`CheckLedger`] and applies its decision stages in a fixed
//! order: base-change reset, stall detection, orphaned-build reset, comment
//! commands, auto-trigger, status/label materialization, notifications.
//! Convergence relies on that order plus the timeline's newest-wins rule:
//! running the engine twice with no intervening external change yields no
//! effects the second time.

mod notify;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::commands::ParsedCommand;
use crate::config::suites::UNRECOGNISED_MARKER;
use crate::config::BotConfig;
use crate::effects::{Effect, Reaction};
use crate::messages::{DESC_NOT_TRIGGERED, DESC_STALLED, DESC_TRIGGERED, build_reference_description};
use crate::snapshot::{CheckLedger, PrSnapshot};
use crate::types::{BUILD_CHECK, CheckName, CheckState, RawState};

use notify::NotificationInputs;

/// The color the platform assigns to labels created implicitly.
const PLACEHOLDER_LABEL_COLOR: &str = "ededed";

/// What one reconciliation pass decided.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Side effects, in execution order.
    pub effects: Vec<Effect>,
    /// Checks queued for triggering this pass, in decision order.
    pub triggered: Vec<CheckName>,
    /// Checks requested but already running, so not re-triggered.
    pub already_triggered: Vec<CheckName>,
    /// Checks that newly stalled this pass.
    pub stalled: Vec<CheckName>,
    /// The final label set the PR should carry.
    pub labels: BTreeSet<String>,
}

/// Maps one [`PrSnapshot`] to the side effects it warrants.
pub struct ReconciliationEngine<'a> {
    config: &'a BotConfig,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(config: &'a BotConfig) -> Self {
        ReconciliationEngine { config }
    }

    pub fn reconcile(&self, snapshot: &PrSnapshot, now: DateTime<Utc>) -> ReconcileOutcome {
        let build = CheckName::new(BUILD_CHECK);
        let mut ledger = snapshot.ledger.clone();
        let mut effects = Vec::new();

        let notify_base_changed = self.reset_on_base_change(snapshot, &mut ledger, &build);
        let (stalled, stall_info) = self.detect_stalls(snapshot, &mut ledger, now);
        self.reset_orphaned_build(snapshot, &mut ledger, &build);
        let (queued, already_triggered) =
            self.process_commands(snapshot, &mut ledger, &mut effects);
        let queued = self.auto_trigger(snapshot, &mut ledger, queued);
        let labels = self.materialize(snapshot, &ledger, &queued, &mut effects);

        let triggered: Vec<CheckName> = queued.iter().map(|(check, _)| check.clone()).collect();
        notify::compose(
            self.config,
            &NotificationInputs {
                snapshot,
                triggered: &triggered,
                already_triggered: &already_triggered,
                stalled: &stalled,
                stall_info: &stall_info,
                notify_base_changed,
                build_status_missing: !ledger.has_status_object(&build),
            },
            &mut effects,
        );

        ReconcileOutcome {
            effects,
            triggered,
            already_triggered,
            stalled,
            labels,
        }
    }

    /// Stage 1: a moved (or never recorded) base branch invalidates a
    /// completed build result. New PRs have nothing to invalidate.
    fn reset_on_base_change(
        &self,
        snapshot: &PrSnapshot,
        ledger: &mut CheckLedger,
        build: &CheckName,
    ) -> bool {
        let reference_unusable =
            snapshot.build_reference_sha.is_none() || snapshot.base_head_changed;
        let resettable = ledger
            .state(build)
            .is_some_and(|state| state != CheckState::Pending);
        if reference_unusable && !snapshot.new_pr && resettable {
            info!(
                pr = %snapshot.number,
                "base branch moved since the last build test, resetting the build status"
            );
            ledger.reset(build, CheckState::Pending);
            return true;
        }
        if snapshot.base_head_changed {
            debug!(
                pr = %snapshot.number,
                "build status absent or already pending, not notifying about the base move"
            );
        }
        false
    }

    /// Stage 2: a triggered check left in running/pending past its threshold
    /// has stalled and may be re-triggered.
    fn detect_stalls(
        &self,
        snapshot: &PrSnapshot,
        ledger: &mut CheckLedger,
        now: DateTime<Utc>,
    ) -> (Vec<CheckName>, String) {
        let mut stalled = Vec::new();
        let mut stall_info = String::new();
        for name in &snapshot.legit_checks {
            let running = matches!(
                ledger.state(name),
                Some(CheckState::Running | CheckState::Pending)
            );
            if !running || !ledger.is_triggered(name) {
                continue;
            }
            let Some(&last) = snapshot.last_update.get(name) else {
                continue;
            };
            if now - last > self.config.stall_threshold(name) {
                info!(pr = %snapshot.number, check = %name, "triggered job has stalled");
                ledger.reset(name, CheckState::Stalled);
                if let Some(url) = snapshot.info_urls.get(name) {
                    stall_info.push_str(&format!("\n- {} ([more info]({}))", name, url));
                }
                stalled.push(name.clone());
            }
        }
        (stalled, stall_info)
    }

    /// Stage 3: a completed build with no recorded base reference cannot be
    /// trusted as up to date.
    fn reset_orphaned_build(
        &self,
        snapshot: &PrSnapshot,
        ledger: &mut CheckLedger,
        build: &CheckName,
    ) {
        if !snapshot.legit_checks.contains(build) || snapshot.build_reference_sha.is_some() {
            return;
        }
        let completed = matches!(
            ledger.state(build),
            Some(
                CheckState::Success
                    | CheckState::Finished
                    | CheckState::Error
                    | CheckState::Failure
            )
        );
        if completed {
            info!(
                pr = %snapshot.number,
                "build completed but no base reference was recorded, resetting to pending"
            );
            ledger.reset(build, CheckState::Pending);
        }
    }

    /// Stage 4: comment commands, in creation order. Each comment gets at
    /// most one reaction.
    fn process_commands(
        &self,
        snapshot: &PrSnapshot,
        ledger: &mut CheckLedger,
        effects: &mut Vec<Effect>,
    ) -> (Queued, Vec<CheckName>) {
        let mut queued: Queued = Vec::new();
        let mut already_triggered = Vec::new();

        for command in &snapshot.commands {
            let reaction = match &command.command {
                ParsedCommand::InvalidInput { reason } => {
                    info!(
                        pr = %snapshot.number,
                        comment = %command.comment_id,
                        reason = %reason,
                        "rejecting command with invalid input"
                    );
                    Some(Reaction::MinusOne)
                }
                ParsedCommand::NoCommand => Some(Reaction::Confused),
                ParsedCommand::GenericFail { reason } => {
                    info!(
                        pr = %snapshot.number,
                        comment = %command.comment_id,
                        reason = %reason,
                        "ignoring malformed command"
                    );
                    None
                }
                ParsedCommand::Trigger { tests, extra_env } => {
                    let mut reaction = None;
                    for test in tests {
                        let terminal = ledger.state(test).is_some_and(|s| s.is_terminal());
                        if ledger.is_triggered(test) && !terminal {
                            info!(
                                pr = %snapshot.number,
                                check = %test,
                                "already triggered for this ref, not triggering again"
                            );
                            already_triggered.push(test.clone());
                            reaction = Some(Reaction::Confused);
                            continue;
                        }
                        ledger.mark_queued(test);
                        if !queued.iter().any(|(name, _)| name == test) {
                            queued.push((test.clone(), extra_env.clone()));
                        }
                        reaction = Some(Reaction::PlusOne);
                    }
                    reaction
                }
            };
            if let Some(reaction) = reaction {
                effects.push(Effect::AddReaction {
                    comment_id: command.comment_id,
                    reaction,
                });
            }
        }
        (queued, already_triggered)
    }

    /// Stage 5: trusted authors get their required checks triggered the
    /// first time the bot sees the PR.
    fn auto_trigger(
        &self,
        snapshot: &PrSnapshot,
        ledger: &mut CheckLedger,
        mut queued: Queued,
    ) -> Queued {
        let eligible = snapshot.trusted_author
            && snapshot.new_pr
            && self.config.trigger.auto_trigger_on_open;
        if !eligible {
            return queued;
        }
        for check in &snapshot.required_checks {
            ledger.mark_queued(check);
            if !queued.iter().any(|(name, _)| name == check) {
                queued.push((check.clone(), BTreeMap::new()));
            }
        }
        queued
    }

    /// Stage 6: statuses, trigger artifacts, and the label set.
    fn materialize(
        &self,
        snapshot: &PrSnapshot,
        ledger: &CheckLedger,
        queued: &Queued,
        effects: &mut Vec<Effect>,
    ) -> BTreeSet<String> {
        let mut labels = BTreeSet::new();

        for (check, &state) in &ledger.statuses {
            let in_queue = queued.iter().find(|(name, _)| name == check);
            if snapshot.legit_checks.contains(check) || in_queue.is_some() {
                labels.insert(format!("{} {}", check, state));
            }

            if let Some((_, extra_env)) = in_queue {
                effects.push(Effect::EnqueueTest {
                    pr: snapshot.number,
                    check: check.clone(),
                    head_sha: snapshot.head_sha.clone(),
                    base_sha: snapshot.base_head_sha.clone(),
                    extra_env: extra_env.clone(),
                });
                if check.is_build() {
                    // The sentinel records which base commit this run merges
                    // into, for the next pass's staleness check.
                    if let Some(context) = self.config.build_reference_context() {
                        effects.push(Effect::CreateStatus {
                            sha: snapshot.head_sha.clone(),
                            state: RawState::Success,
                            context,
                            description: build_reference_description(
                                snapshot.base_head_sha.short(),
                            ),
                            target_url: None,
                        });
                    }
                }
                if let Some(context) = self.config.check_alias(check) {
                    effects.push(Effect::CreateStatus {
                        sha: snapshot.head_sha.clone(),
                        state: RawState::Pending,
                        context: context.to_string(),
                        description: DESC_TRIGGERED.to_string(),
                        target_url: None,
                    });
                }
            } else if state == CheckState::Pending && ledger.has_status_object(check) {
                debug!(check = %check, "existing pending status is up to date");
            } else if state == CheckState::Stalled && !ledger.has_status_object(check) {
                if let Some(context) = self.config.check_alias(check) {
                    effects.push(Effect::CreateStatus {
                        sha: snapshot.head_sha.clone(),
                        state: RawState::Error,
                        context: context.to_string(),
                        description: DESC_STALLED.to_string(),
                        target_url: None,
                    });
                }
            } else if state == CheckState::Pending
                && !ledger.is_triggered(check)
                && !ledger.has_status_object(check)
            {
                if let Some(context) = self.config.check_alias(check) {
                    effects.push(Effect::CreateStatus {
                        sha: snapshot.head_sha.clone(),
                        state: RawState::Pending,
                        context: context.to_string(),
                        description: DESC_NOT_TRIGGERED.to_string(),
                        target_url: None,
                    });
                }
            }
            // Anything else is the executor's to update, not ours.
        }

        let current: BTreeSet<String> = snapshot
            .current_labels
            .iter()
            .filter(|label| !label.name.contains(UNRECOGNISED_MARKER))
            .map(|label| label.name.clone())
            .collect();
        if labels != current {
            debug!(pr = %snapshot.number, ?labels, "label set has changed");
            effects.push(Effect::SetLabels {
                pr: snapshot.number,
                labels: labels.clone(),
            });
        }

        for label in &snapshot.current_labels {
            if label.color == PLACEHOLDER_LABEL_COLOR {
                if let Some(color) = self.config.label_color_for(&label.name) {
                    effects.push(Effect::EditLabelColor {
                        label: label.name.clone(),
                        color: color.to_string(),
                    });
                }
            }
        }

        labels
    }
}

type Queued = Vec<(CheckName, BTreeMap<String, String>)>;
