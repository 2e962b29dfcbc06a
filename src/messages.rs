//! User-visible text: status descriptions and comment bodies.
//!
//! Everything the bot writes to a pull request is assembled here, so the
//! engine and its tests can compare exact strings.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::CheckName;

/// Description of a pending status nobody has triggered yet.
pub const DESC_NOT_TRIGGERED: &str = "This test has not been triggered yet.";

/// Description of a pending status for a freshly triggered test.
pub const DESC_TRIGGERED: &str = "The test has been triggered in Jenkins";

/// Description of the error status announcing a stall.
pub const DESC_STALLED: &str = "The job has stalled on Jenkins. It can be re-triggered.";

/// Prefix of the sentinel status description carrying the base-branch SHA
/// the build test last ran against.
pub const BUILD_REFERENCE_PREFIX: &str = "Last test triggered against ";

/// Sentinel description: `"Last test triggered against {sha}"`.
pub fn build_reference_description(base_sha_short: &str) -> String {
    format!("{}{}", BUILD_REFERENCE_PREFIX, base_sha_short)
}

/// The notice listing users watching the modified packages, or an empty
/// string when nobody watches them.
pub fn watcher_notice(watchers: &BTreeSet<String>) -> String {
    if watchers.is_empty() {
        return String::new();
    }
    let mentions: Vec<String> = watchers.iter().map(|w| format!("@{}", w)).collect();
    format!(
        "The following users requested to be notified about changes to these packages:\n{}",
        mentions.join(", ")
    )
}

/// Greeting posted the first time the bot sees a PR.
#[derive(Debug, Clone)]
pub struct Salutation<'a> {
    pub author: &'a str,
    pub base_branch: &'a str,
    pub changed_folders: &'a BTreeSet<String>,
    pub tests_required: &'a BTreeSet<CheckName>,
    pub watchers: &'a BTreeSet<String>,
    pub authorized_teams: &'a BTreeSet<String>,
    pub org: &'a str,
    pub trusted_author: bool,
    /// Pre-rendered `tests_triggered` confirmation, empty if nothing was queued.
    pub triggered_notice: &'a str,
}

pub fn salutation(s: &Salutation<'_>) -> String {
    let folders: Vec<String> = s
        .changed_folders
        .iter()
        .map(|f| format!("- {}", f))
        .collect();
    let tests: Vec<&str> = s.tests_required.iter().map(|t| t.as_str()).collect();
    let teams: Vec<String> = s
        .authorized_teams
        .iter()
        .map(|t| format!("@{}/{}", s.org, t))
        .collect();

    let mut lines = vec![
        format!("Hi @{},", s.author),
        String::new(),
        "You have proposed changes to the files in these packages:".to_string(),
    ];
    lines.extend(folders);
    lines.push(String::new());
    lines.push(format!(
        "which require the following tests against `{}`: {}.",
        s.base_branch,
        tests.join(", ")
    ));

    let watcher_text = watcher_notice(s.watchers);
    if !watcher_text.is_empty() {
        lines.push(String::new());
        lines.push(watcher_text);
    }

    if !s.trusted_author {
        lines.push(String::new());
        lines.push(AUTHOR_NOT_MEMBER.to_string());
    }

    if !s.triggered_notice.is_empty() {
        lines.push(String::new());
        lines.push(s.triggered_notice.to_string());
    }

    lines.push(String::new());
    lines.push(format!(
        "Tests can be triggered manually by members of these teams: {}.",
        teams.join(", ")
    ));

    lines.join("\n")
}

const AUTHOR_NOT_MEMBER: &str = "Since you are not a member of the organization, \
an authorized user will need to trigger the tests on your behalf.";

/// Confirmation that tests were queued this pass.
pub fn tests_triggered(
    head_sha: &str,
    triggered: &[CheckName],
    already_triggered: &[CheckName],
) -> String {
    let names: Vec<&str> = triggered.iter().map(|t| t.as_str()).collect();
    let already_notice = if already_triggered.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = already_triggered.iter().map(|t| t.as_str()).collect();
        format!(" (already triggered: {})", names.join(","))
    };
    format!(
        ":hourglass: The following tests have been triggered for {}: {}{}",
        head_sha,
        names.join(", "),
        already_notice
    )
}

/// Notice that every requested test was already running.
pub fn tests_already_triggered(head_sha: &str, tests: &[CheckName]) -> String {
    let names: Vec<&str> = tests.iter().map(|t| t.as_str()).collect();
    format!(
        "These tests have already been triggered for {}: {}",
        head_sha,
        names.join(", ")
    )
}

/// Notice that triggered jobs have gone quiet past their stall threshold.
///
/// `info` carries one `- name ([more info](url))` line per job with a known
/// info URL, or an empty string.
pub fn job_stall(stalled: &[CheckName], info: &str) -> String {
    let names: Vec<&str> = stalled.iter().map(|t| t.as_str()).collect();
    let mut lines = vec![
        format!(
            ":zzz: These jobs appear to have stalled: {}.",
            names.join(", ")
        ),
        "They can be re-triggered with a comment.".to_string(),
    ];
    if !info.is_empty() {
        lines.push(info.trim_start_matches('\n').to_string());
    }
    lines.join("\n")
}

/// Notice that the base branch tip moved since the last build test.
pub fn base_branch_changed(base_ref: &str, base_sha: &str) -> String {
    format!(
        ":recycle: The head of `{}` has moved to {} since the build test last ran. \
The build status has been reset; the test should be run again.",
        base_ref, base_sha
    )
}

/// Notice that the head commit claims a timestamp in the future.
pub fn future_commit(committer: &str, delta: &str) -> String {
    format!(
        ":memo: The latest commit by @{} is timestamped {} in the future. \
Please check that the date and time is set correctly when creating new commits.",
        committer, delta
    )
}

/// Renders extra environment overrides for logs: `KEY=VALUE` pairs sorted by key.
pub fn render_env(env: &BTreeMap<String, String>) -> String {
    env.iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(names: &[&str]) -> Vec<CheckName> {
        names.iter().map(|n| CheckName::new(*n)).collect()
    }

    #[test]
    fn watcher_notice_empty_when_no_watchers() {
        assert_eq!(watcher_notice(&BTreeSet::new()), "");
    }

    #[test]
    fn watcher_notice_mentions_each_watcher() {
        let watchers: BTreeSet<String> = ["alice", "bob"].iter().map(|s| s.to_string()).collect();
        let text = watcher_notice(&watchers);
        assert!(text.contains("@alice, @bob"));
    }

    #[test]
    fn triggered_message_lists_tests_and_dedups() {
        let msg = tests_triggered("abc1234", &checks(&["build", "lint"]), &checks(&["unit"]));
        assert!(msg.contains("abc1234"));
        assert!(msg.contains("build, lint"));
        assert!(msg.contains("(already triggered: unit)"));
    }

    #[test]
    fn triggered_message_omits_empty_dedup_notice() {
        let msg = tests_triggered("abc1234", &checks(&["build"]), &[]);
        assert!(!msg.contains("already triggered"));
    }

    #[test]
    fn salutation_mentions_author_folders_and_tests() {
        let folders: BTreeSet<String> = ["Offline/".to_string()].into_iter().collect();
        let required: BTreeSet<CheckName> = [CheckName::new("build")].into_iter().collect();
        let teams: BTreeSet<String> = ["ci-admins".to_string()].into_iter().collect();
        let text = salutation(&Salutation {
            author: "hcasler",
            base_branch: "main",
            changed_folders: &folders,
            tests_required: &required,
            watchers: &BTreeSet::new(),
            authorized_teams: &teams,
            org: "acme",
            trusted_author: true,
            triggered_notice: "",
        });
        assert!(text.contains("@hcasler"));
        assert!(text.contains("- Offline/"));
        assert!(text.contains("`main`"));
        assert!(text.contains("build"));
        assert!(text.contains("@acme/ci-admins"));
        assert!(!text.contains("not a member"));
    }

    #[test]
    fn salutation_warns_untrusted_author() {
        let text = salutation(&Salutation {
            author: "drive-by",
            base_branch: "main",
            changed_folders: &BTreeSet::new(),
            tests_required: &BTreeSet::new(),
            watchers: &BTreeSet::new(),
            authorized_teams: &BTreeSet::new(),
            org: "acme",
            trusted_author: false,
            triggered_notice: "",
        });
        assert!(text.contains("not a member of the organization"));
    }

    #[test]
    fn stall_message_carries_info_links() {
        let info = "\n- build ([more info](https://ci.example/42))";
        let msg = job_stall(&checks(&["build"]), info);
        assert!(msg.contains("build"));
        assert!(msg.contains("[more info](https://ci.example/42)"));
    }

    #[test]
    fn build_reference_description_roundtrip() {
        let desc = build_reference_description("0a1b2c3");
        assert_eq!(desc.strip_prefix(BUILD_REFERENCE_PREFIX), Some("0a1b2c3"));
    }
}
