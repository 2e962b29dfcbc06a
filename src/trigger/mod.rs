//! Build-trigger sink: hands test runs to the executor as properties files.
//!
//! The executor polls a directory for Jenkins-style `KEY=VALUE` properties
//! files. Writing one is fire-and-forget; the run's progress comes back later
//! as ordinary commit-status observations.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::types::{CheckName, PrNumber, RepoId, Sha};

/// A properties-file write failure. These fail the PR's pass; a later pass
/// retries the trigger because the queued status never materialized.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("failed to create trigger directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write trigger file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes trigger properties files into a configured directory.
#[derive(Debug, Clone)]
pub struct TriggerSink {
    dir: PathBuf,
    repo: RepoId,
}

impl TriggerSink {
    pub fn new(dir: impl Into<PathBuf>, repo: RepoId) -> Self {
        TriggerSink {
            dir: dir.into(),
            repo,
        }
    }

    /// Queues one test run. Returns the path of the file written.
    pub fn enqueue_test(
        &self,
        pr: PrNumber,
        check: &CheckName,
        head_sha: &Sha,
        base_sha: &Sha,
        extra_env: &BTreeMap<String, String>,
    ) -> Result<PathBuf, TriggerError> {
        fs::create_dir_all(&self.dir).map_err(|source| TriggerError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.properties_path(pr, check);
        let contents = render_properties(&self.repo, pr, check, head_sha, base_sha, extra_env);
        fs::write(&path, contents).map_err(|source| TriggerError::Write {
            path: path.clone(),
            source,
        })?;
        info!(pr = %pr, check = %check, path = %path.display(), "wrote trigger file");
        Ok(path)
    }

    fn properties_path(&self, pr: PrNumber, check: &CheckName) -> PathBuf {
        self.dir
            .join(format!("trigger_{}_pr{}.properties", check, pr.0))
    }
}

/// Renders the `KEY=VALUE` body. Extra environment overrides come last,
/// sorted by key, so the fixed keys always win on duplicate names.
fn render_properties(
    repo: &RepoId,
    pr: PrNumber,
    check: &CheckName,
    head_sha: &Sha,
    base_sha: &Sha,
    extra_env: &BTreeMap<String, String>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "REPOSITORY={}", repo.full_name());
    let _ = writeln!(out, "PULL_REQUEST={}", pr.0);
    let _ = writeln!(out, "COMMIT_SHA={}", head_sha);
    let _ = writeln!(out, "MASTER_COMMIT_SHA={}", base_sha);
    let _ = writeln!(out, "TEST_NAME={}", check);
    for (key, value) in extra_env {
        let _ = writeln!(out, "{}={}", key, value);
    }
    out
}
