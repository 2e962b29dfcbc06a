//! Executes engine effects against the GitHub API and the trigger sink.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::effects::{Effect, EffectInterpreter, Reaction};
use crate::trigger::{TriggerError, TriggerSink};
use crate::types::{CommentId, PrNumber, RawState, Sha};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

/// An effect that could not be executed.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("GitHub API call failed")]
    Api(#[from] GitHubApiError),

    #[error("build trigger failed")]
    Trigger(#[from] TriggerError),
}

/// The live interpreter: statuses, reactions, labels, and comments go to the
/// API; test runs go to the properties-file sink.
#[derive(Debug)]
pub struct GitHubInterpreter {
    client: OctocrabClient,
    trigger: TriggerSink,
}

impl GitHubInterpreter {
    pub fn new(client: OctocrabClient, trigger: TriggerSink) -> Self {
        GitHubInterpreter { client, trigger }
    }
}

impl EffectInterpreter for GitHubInterpreter {
    type Error = InterpretError;

    async fn interpret(&self, effect: Effect) -> Result<(), InterpretError> {
        debug!(?effect, "executing effect");
        match effect {
            Effect::CreateStatus {
                sha,
                state,
                context,
                description,
                target_url,
            } => create_status(&self.client, &sha, state, &context, &description, target_url).await,
            Effect::AddReaction {
                comment_id,
                reaction,
            } => add_reaction(&self.client, comment_id, reaction).await,
            Effect::SetLabels { pr, labels } => {
                set_labels(&self.client, pr, labels.into_iter().collect()).await
            }
            Effect::EditLabelColor { label, color } => {
                edit_label_color(&self.client, &label, &color).await
            }
            Effect::PostComment { pr, body } => post_comment(&self.client, pr, body).await,
            Effect::EnqueueTest {
                pr,
                check,
                head_sha,
                base_sha,
                extra_env,
            } => {
                self.trigger
                    .enqueue_test(pr, &check, &head_sha, &base_sha, &extra_env)?;
                Ok(())
            }
        }
    }
}

async fn create_status(
    client: &OctocrabClient,
    sha: &Sha,
    state: RawState,
    context: &str,
    description: &str,
    target_url: Option<String>,
) -> Result<(), InterpretError> {
    let url = format!(
        "/repos/{}/{}/statuses/{}",
        client.owner(),
        client.repo_name(),
        sha
    );

    #[derive(Serialize)]
    struct StatusRequest<'a> {
        state: &'static str,
        context: &'a str,
        description: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_url: Option<String>,
    }

    let request = StatusRequest {
        state: state.as_api_str(),
        context,
        description,
        target_url,
    };

    let _: serde_json::Value = client
        .inner()
        .post(&url, Some(&request))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(())
}

async fn add_reaction(
    client: &OctocrabClient,
    comment_id: CommentId,
    reaction: Reaction,
) -> Result<(), InterpretError> {
    let url = format!(
        "/repos/{}/{}/issues/comments/{}/reactions",
        client.owner(),
        client.repo_name(),
        comment_id.0
    );

    #[derive(Serialize)]
    struct ReactionRequest {
        content: &'static str,
    }

    let _: serde_json::Value = client
        .inner()
        .post(
            &url,
            Some(&ReactionRequest {
                content: reaction.as_api_str(),
            }),
        )
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(())
}

async fn set_labels(
    client: &OctocrabClient,
    pr: PrNumber,
    labels: Vec<String>,
) -> Result<(), InterpretError> {
    let url = format!(
        "/repos/{}/{}/issues/{}/labels",
        client.owner(),
        client.repo_name(),
        pr.0
    );

    #[derive(Serialize)]
    struct LabelsRequest {
        labels: Vec<String>,
    }

    let _: serde_json::Value = client
        .inner()
        .put(&url, Some(&LabelsRequest { labels }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(())
}

/// Repairs a placeholder-colored label. Failures here are cosmetic and only
/// logged; the pass continues.
async fn edit_label_color(
    client: &OctocrabClient,
    label: &str,
    color: &str,
) -> Result<(), InterpretError> {
    // Label names may contain '/' and spaces.
    let encoded = urlencoding::encode(label);
    let url = format!(
        "/repos/{}/{}/labels/{}",
        client.owner(),
        client.repo_name(),
        encoded
    );

    #[derive(Serialize)]
    struct LabelPatch<'a> {
        color: &'a str,
    }

    let result: Result<serde_json::Value, _> =
        client.inner().patch(&url, Some(&LabelPatch { color })).await;

    if let Err(e) = result {
        warn!(label = %label, error = %e, "failed to repair label color");
    }
    Ok(())
}

async fn post_comment(
    client: &OctocrabClient,
    pr: PrNumber,
    body: String,
) -> Result<(), InterpretError> {
    client
        .inner()
        .issues(client.owner(), client.repo_name())
        .create_comment(pr.0, body)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(())
}
