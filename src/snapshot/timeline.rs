//! Newest-wins accumulation of commit-status observations.
//!
//! Observations arrive newest-first from the platform; the timeline keeps
//! only the latest per check and silently drops anything stale, so feeding
//! it duplicate or out-of-order records leaves the same result as feeding
//! only the newest.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::BotConfig;
use crate::config::suites::is_build_reference_context;
use crate::messages::BUILD_REFERENCE_PREFIX;
use crate::snapshot::CheckLedger;
use crate::types::{CheckName, CheckObservation, CheckState, RawState, Sha};

/// What the timeline distilled from one commit's status history.
#[derive(Debug, Clone, Default)]
pub struct TimelineSummary {
    pub ledger: CheckLedger,
    pub last_update: BTreeMap<CheckName, DateTime<Utc>>,
    pub info_urls: BTreeMap<CheckName, String>,
    pub legit_checks: BTreeSet<CheckName>,
    /// The (possibly shortened) base SHA the build test last ran against.
    pub build_reference_sha: Option<String>,
    /// The base branch tip no longer starts with the recorded reference.
    pub base_head_changed: bool,
}

/// Accumulates status observations for one head commit.
pub struct StatusTimeline<'a> {
    config: &'a BotConfig,
    base_head_sha: &'a Sha,
    ledger: CheckLedger,
    last_update: BTreeMap<CheckName, DateTime<Utc>>,
    info_urls: BTreeMap<CheckName, String>,
    legit_checks: BTreeSet<CheckName>,
    build_reference: Option<(String, DateTime<Utc>)>,
}

impl<'a> StatusTimeline<'a> {
    pub fn new(config: &'a BotConfig, base_head_sha: &'a Sha) -> Self {
        StatusTimeline {
            config,
            base_head_sha,
            ledger: CheckLedger::default(),
            last_update: BTreeMap::new(),
            info_urls: BTreeMap::new(),
            legit_checks: BTreeSet::new(),
            build_reference: None,
        }
    }

    /// Records one observation, dropping it if it is stale for its check.
    pub fn record(&mut self, obs: &CheckObservation) {
        if is_build_reference_context(&obs.context) {
            self.record_build_reference(obs);
            return;
        }

        let Some(name) = self.config.check_name_from_alias(&obs.context) else {
            debug!(context = %obs.context, "dropping status with unrecognized context");
            return;
        };

        if let Some(&seen) = self.last_update.get(&name) {
            if obs.updated_at <= seen {
                debug!(check = %name, "dropping stale status observation");
                return;
            }
        }

        let mut state = self.config.display_state(obs.raw_state);
        if obs.description.contains("stalled") {
            state = CheckState::Stalled;
        } else if obs.description.contains("running") {
            state = CheckState::Running;
            if let Some(url) = &obs.target_url {
                self.info_urls.insert(name.clone(), url.clone());
            }
        }

        // One-way: nothing in this component ever clears the trigger flag.
        let trigger_evidence = obs.description.contains("has been triggered")
            || obs.description.contains("running")
            || matches!(obs.raw_state, RawState::Success | RawState::Failure);
        if trigger_evidence {
            self.ledger.triggered.insert(name.clone(), true);
        } else {
            self.ledger.triggered.entry(name.clone()).or_insert(false);
        }

        self.legit_checks.insert(name.clone());
        self.ledger.status_exists.insert(name.clone(), true);
        self.ledger.statuses.insert(name.clone(), state);
        self.last_update.insert(name, obs.updated_at);
    }

    /// The sentinel context carries the base SHA of the last build trigger
    /// in its description rather than an ordinary check state.
    fn record_build_reference(&mut self, obs: &CheckObservation) {
        if let Some((_, seen)) = &self.build_reference {
            if obs.updated_at <= *seen {
                debug!("dropping stale build-reference observation");
                return;
            }
        }
        let sha_text = obs
            .description
            .strip_prefix(BUILD_REFERENCE_PREFIX)
            .unwrap_or(&obs.description)
            .trim()
            .to_string();
        self.build_reference = Some((sha_text, obs.updated_at));
    }

    pub fn finish(self) -> TimelineSummary {
        let build_reference_sha = self.build_reference.map(|(sha, _)| sha);
        let base_head_changed = build_reference_sha
            .as_deref()
            .is_some_and(|reference| !self.base_head_sha.has_prefix(reference));
        TimelineSummary {
            ledger: self.ledger,
            last_update: self.last_update,
            info_urls: self.info_urls,
            legit_checks: self.legit_checks,
            build_reference_sha,
            base_head_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::messages::build_reference_description;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn obs(context: &str, raw: RawState, description: &str, minutes: i64) -> CheckObservation {
        CheckObservation {
            context: context.to_string(),
            raw_state: raw,
            description: description.to_string(),
            target_url: None,
            updated_at: at(minutes),
        }
    }

    fn base_sha() -> Sha {
        Sha::new("0a1b2c3d4e5f60718293a4b5c6d7e8f901234567")
    }

    fn summarize(observations: &[CheckObservation]) -> TimelineSummary {
        let config = test_config();
        let base = base_sha();
        let mut timeline = StatusTimeline::new(&config, &base);
        for o in observations {
            timeline.record(o);
        }
        timeline.finish()
    }

    #[test]
    fn latest_observation_wins() {
        let build = CheckName::new("build");
        let summary = summarize(&[
            // newest first, as the platform lists them
            obs("acme-ci/buildtest", RawState::Success, "ok", 10),
            obs("acme-ci/buildtest", RawState::Pending, "queued", 5),
        ]);
        assert_eq!(summary.ledger.state(&build), Some(CheckState::Finished));
        assert_eq!(summary.last_update.get(&build), Some(&at(10)));
    }

    #[test]
    fn stale_observation_is_a_no_op() {
        let fresh_only = summarize(&[obs("acme-ci/lint", RawState::Failure, "boom", 10)]);
        let with_stale = summarize(&[
            obs("acme-ci/lint", RawState::Failure, "boom", 10),
            obs("acme-ci/lint", RawState::Pending, "queued", 10),
            obs("acme-ci/lint", RawState::Pending, "queued", 3),
        ]);
        assert_eq!(fresh_only.ledger, with_stale.ledger);
        assert_eq!(fresh_only.last_update, with_stale.last_update);
    }

    #[test]
    fn unrecognized_context_dropped() {
        let summary = summarize(&[obs("someone-elses/ci", RawState::Success, "ok", 1)]);
        assert!(summary.ledger.statuses.is_empty());
        assert!(summary.legit_checks.is_empty());
    }

    #[test]
    fn running_description_overrides_mapped_state_and_keeps_url() {
        let mut o = obs("acme-ci/buildtest", RawState::Pending, "running", 1);
        o.target_url = Some("https://ci.example/42".to_string());
        let summary = summarize(&[o]);
        let build = CheckName::new("build");
        assert_eq!(summary.ledger.state(&build), Some(CheckState::Running));
        assert!(summary.ledger.is_triggered(&build));
        assert_eq!(
            summary.info_urls.get(&build).map(String::as_str),
            Some("https://ci.example/42")
        );
    }

    #[test]
    fn stalled_description_overrides_mapped_state() {
        let summary = summarize(&[obs(
            "acme-ci/buildtest",
            RawState::Error,
            "The job has stalled on Jenkins. It can be re-triggered.",
            1,
        )]);
        let build = CheckName::new("build");
        assert_eq!(summary.ledger.state(&build), Some(CheckState::Stalled));
        // Stalled descriptions alone are not trigger evidence
        assert!(!summary.ledger.is_triggered(&build));
    }

    #[test]
    fn triggered_description_sets_the_flag() {
        let summary = summarize(&[obs(
            "acme-ci/buildtest",
            RawState::Pending,
            "The test has been triggered in Jenkins",
            1,
        )]);
        let build = CheckName::new("build");
        assert_eq!(summary.ledger.state(&build), Some(CheckState::Pending));
        assert!(summary.ledger.is_triggered(&build));
        assert!(summary.ledger.has_status_object(&build));
    }

    #[test]
    fn stale_evidence_does_not_change_the_flag() {
        // The older success is dropped outright, so only the newest
        // observation decides the trigger flag.
        let summary = summarize(&[
            obs("acme-ci/buildtest", RawState::Pending, "queued", 5),
            obs("acme-ci/buildtest", RawState::Success, "ok", 2),
        ]);
        assert!(!summary.ledger.is_triggered(&CheckName::new("build")));
        assert_eq!(
            summary.ledger.state(&CheckName::new("build")),
            Some(CheckState::Pending)
        );
    }

    #[test]
    fn sentinel_matching_base_head_means_unchanged() {
        let base = base_sha();
        let summary = summarize(&[obs(
            "acme-ci/buildtest/last",
            RawState::Success,
            &build_reference_description(base.short()),
            1,
        )]);
        assert_eq!(summary.build_reference_sha.as_deref(), Some(base.short()));
        assert!(!summary.base_head_changed);
        // The sentinel never populates the generic state map
        assert!(summary.ledger.statuses.is_empty());
    }

    #[test]
    fn sentinel_mismatch_flags_base_head_change() {
        let summary = summarize(&[obs(
            "acme-ci/buildtest/last",
            RawState::Success,
            &build_reference_description("deadbee"),
            1,
        )]);
        assert_eq!(summary.build_reference_sha.as_deref(), Some("deadbee"));
        assert!(summary.base_head_changed);
    }

    #[test]
    fn newest_sentinel_wins() {
        let base = base_sha();
        let summary = summarize(&[
            obs(
                "acme-ci/buildtest/last",
                RawState::Success,
                &build_reference_description(base.short()),
                9,
            ),
            obs(
                "acme-ci/buildtest/last",
                RawState::Success,
                &build_reference_description("deadbee"),
                4,
            ),
        ]);
        assert_eq!(summary.build_reference_sha.as_deref(), Some(base.short()));
        assert!(!summary.base_head_changed);
    }

    #[test]
    fn no_sentinel_means_no_reference_and_no_change_flag() {
        let summary = summarize(&[obs("acme-ci/buildtest", RawState::Pending, "queued", 1)]);
        assert_eq!(summary.build_reference_sha, None);
        assert!(!summary.base_head_changed);
    }

    proptest! {
        /// Recording two observations out of timestamp order leaves the
        /// timeline equal to recording only the later one.
        #[test]
        fn out_of_order_equals_later_only(
            later_min in 1i64..1000,
            earlier_offset in 1i64..1000,
            raw_a in prop_oneof![
                Just(RawState::Pending),
                Just(RawState::Success),
                Just(RawState::Failure),
                Just(RawState::Error)
            ],
            raw_b in prop_oneof![
                Just(RawState::Pending),
                Just(RawState::Success),
                Just(RawState::Failure),
                Just(RawState::Error)
            ],
            desc in "[a-z ]{0,20}",
        ) {
            let later = obs("acme-ci/lint", raw_a, "latest", later_min);
            let earlier = obs("acme-ci/lint", raw_b, &desc, later_min - earlier_offset);

            let only_later = summarize(std::slice::from_ref(&later));
            let both = summarize(&[later, earlier]);

            prop_assert_eq!(only_later.ledger.statuses, both.ledger.statuses);
            prop_assert_eq!(only_later.last_update, both.last_update);
        }

        /// Arbitrary description text never panics the recorder.
        #[test]
        fn arbitrary_descriptions_never_panic(desc: String) {
            let _ = summarize(&[obs("acme-ci/buildtest", RawState::Pending, &desc, 1)]);
            let _ = summarize(&[obs("acme-ci/buildtest/last", RawState::Success, &desc, 1)]);
        }
    }
}
