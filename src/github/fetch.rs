//! Typed read helpers over the GitHub API.
//!
//! Everything a reconciliation pass reads comes through here: the PR itself,
//! the base branch head, the head commit, commit statuses, issue comments,
//! reactions, labels, changed files, and org/team membership. Paginated
//! endpoints are drained at 100 items per page. Endpoints octocrab has no
//! typed builder for use raw REST with local serde DTOs.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::types::{
    CheckObservation, CommentId, HeadCommit, IssueComment, LabelInfo, PrNumber, PrState,
    PullRequest, RawState, Sha,
};

use super::client::OctocrabClient;
use super::error::{GitHubApiError, indicates_missing};

#[derive(Debug, Deserialize)]
struct UserRef {
    login: String,
}

/// Fetches one pull request.
pub async fn get_pull(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<PullRequest, GitHubApiError> {
    let pull = client
        .inner()
        .pulls(client.owner(), client.repo_name())
        .get(pr.0)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    let state = match pull.merged_at {
        Some(merged_at) => PrState::Merged { merged_at },
        None => {
            if pull.state == Some(octocrab::models::IssueState::Closed) {
                PrState::Closed
            } else {
                PrState::Open
            }
        }
    };

    Ok(PullRequest {
        number: pr,
        author: pull
            .user
            .map(|user| user.login)
            .unwrap_or_else(|| "ghost".to_string()),
        head_sha: Sha::new(pull.head.sha),
        base_ref: pull.base.ref_field,
        state,
        changed_files: pull.changed_files.unwrap_or(0),
    })
}

/// An open PR as the list endpoint reports it. The list payload omits the
/// changed-file count, so full details go through [`get_pull`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPull {
    pub number: PrNumber,
    pub base_ref: String,
}

/// Lists open PRs, optionally restricted to one base branch.
pub async fn list_open_pulls(
    client: &OctocrabClient,
    base: Option<&str>,
) -> Result<Vec<OpenPull>, GitHubApiError> {
    let mut page = 1u32;
    let mut all = Vec::new();
    let pulls = client.inner().pulls(client.owner(), client.repo_name());

    loop {
        let mut request = pulls
            .list()
            .state(octocrab::params::State::Open)
            .per_page(100)
            .page(page);
        if let Some(base) = base {
            request = request.base(base);
        }
        let items = request
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?
            .items;
        let is_last_page = items.len() < 100;

        for pull in items {
            all.push(OpenPull {
                number: PrNumber(pull.number),
                base_ref: pull.base.ref_field,
            });
        }

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(all)
}

/// Fetches the tip commit SHA of a branch.
pub async fn get_branch_head(
    client: &OctocrabClient,
    branch: &str,
) -> Result<Sha, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct BranchResponse {
        commit: BranchCommit,
    }

    #[derive(Debug, Deserialize)]
    struct BranchCommit {
        sha: String,
    }

    // Branch names may contain '/', which must not split the path.
    let encoded = urlencoding::encode(branch);
    let url = format!(
        "/repos/{}/{}/branches/{}",
        client.owner(),
        client.repo_name(),
        encoded
    );

    let response: BranchResponse = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;
    Ok(Sha::new(response.commit.sha))
}

/// Fetches the head commit's committer identity and timestamp.
pub async fn get_head_commit(
    client: &OctocrabClient,
    sha: &Sha,
) -> Result<HeadCommit, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct CommitResponse {
        sha: String,
        committer: Option<UserRef>,
        commit: GitCommit,
    }

    #[derive(Debug, Deserialize)]
    struct GitCommit {
        committer: Option<GitActor>,
    }

    #[derive(Debug, Deserialize)]
    struct GitActor {
        name: Option<String>,
        date: Option<DateTime<Utc>>,
    }

    let url = format!(
        "/repos/{}/{}/commits/{}",
        client.owner(),
        client.repo_name(),
        sha
    );

    let response: CommitResponse = client
        .inner()
        .get(&url, None::<&()>)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    let git_committer = response.commit.committer;
    let committer = response
        .committer
        .map(|user| user.login)
        .or_else(|| git_committer.as_ref().and_then(|actor| actor.name.clone()))
        .unwrap_or_else(|| "unknown".to_string());
    let committed_at = git_committer
        .and_then(|actor| actor.date)
        .ok_or_else(|| {
            GitHubApiError::permanent_without_source(format!(
                "commit {} has no committer date",
                sha
            ))
        })?;

    Ok(HeadCommit {
        sha: Sha::new(response.sha),
        committer,
        committed_at,
    })
}

/// Lists the commit statuses on a SHA, newest first as the API returns them.
///
/// Statuses with a state string the wire contract doesn't name are skipped
/// with a warning.
pub async fn list_statuses(
    client: &OctocrabClient,
    sha: &Sha,
) -> Result<Vec<CheckObservation>, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct StatusResponse {
        state: String,
        context: Option<String>,
        description: Option<String>,
        target_url: Option<String>,
        updated_at: DateTime<Utc>,
    }

    let mut page = 1u32;
    let mut all = Vec::new();

    loop {
        let url = format!(
            "/repos/{}/{}/commits/{}/statuses?per_page=100&page={}",
            client.owner(),
            client.repo_name(),
            sha,
            page
        );
        let items: Vec<StatusResponse> = client
            .inner()
            .get(&url, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        let is_last_page = items.len() < 100;

        for status in items {
            let Some(raw_state) = RawState::parse(&status.state) else {
                warn!(state = %status.state, "skipping status with unknown state");
                continue;
            };
            all.push(CheckObservation {
                context: status.context.unwrap_or_else(|| "default".to_string()),
                raw_state,
                description: status.description.unwrap_or_default(),
                target_url: status.target_url,
                updated_at: status.updated_at,
            });
        }

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(all)
}

/// Lists the comments on a PR's issue thread, oldest first.
pub async fn list_comments(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<Vec<IssueComment>, GitHubApiError> {
    let mut page = 1u32;
    let mut all = Vec::new();

    loop {
        let items = client
            .inner()
            .issues(client.owner(), client.repo_name())
            .list_comments(pr.0)
            .per_page(100)
            .page(page)
            .send()
            .await
            .map_err(GitHubApiError::from_octocrab)?
            .items;
        let is_last_page = items.len() < 100;

        for comment in items {
            all.push(IssueComment {
                id: CommentId(comment.id.into_inner()),
                author: comment.user.login,
                body: comment.body.unwrap_or_default(),
                created_at: comment.created_at,
            });
        }

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(all)
}

/// Lists the logins that reacted to a comment.
pub async fn list_comment_reactions(
    client: &OctocrabClient,
    comment_id: CommentId,
) -> Result<Vec<String>, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct ReactionResponse {
        user: Option<UserRef>,
    }

    let mut page = 1u32;
    let mut all = Vec::new();

    loop {
        let url = format!(
            "/repos/{}/{}/issues/comments/{}/reactions?per_page=100&page={}",
            client.owner(),
            client.repo_name(),
            comment_id.0,
            page
        );
        let items: Vec<ReactionResponse> = client
            .inner()
            .get(&url, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        let is_last_page = items.len() < 100;

        all.extend(items.into_iter().filter_map(|r| r.user.map(|u| u.login)));

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(all)
}

/// Lists the labels currently on a PR, with their colors.
pub async fn list_labels(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<Vec<LabelInfo>, GitHubApiError> {
    let issue = client
        .inner()
        .issues(client.owner(), client.repo_name())
        .get(pr.0)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(issue
        .labels
        .into_iter()
        .map(|label| LabelInfo {
            name: label.name,
            color: label.color,
        })
        .collect())
}

/// Lists the top-level folders a PR modifies. Files at the repository root
/// are folded into the `"/"` entry.
pub async fn list_modified_folders(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<BTreeSet<String>, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct FileResponse {
        filename: String,
    }

    let mut page = 1u32;
    let mut folders = BTreeSet::new();

    loop {
        let url = format!(
            "/repos/{}/{}/pulls/{}/files?per_page=100&page={}",
            client.owner(),
            client.repo_name(),
            pr.0,
            page
        );
        let items: Vec<FileResponse> = client
            .inner()
            .get(&url, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        let is_last_page = items.len() < 100;

        for file in &items {
            folders.insert(top_level_folder(&file.filename));
        }

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(folders)
}

/// The top-level folder of a changed path, `"/"` for root-level files.
fn top_level_folder(filename: &str) -> String {
    match filename.split_once('/') {
        Some((top, _)) => format!("{}/", top),
        None => "/".to_string(),
    }
}

/// True if `login` is a member of `org`.
///
/// A 404/403 response means "not a member" (or a token that cannot see the
/// membership) rather than a failed pass.
pub async fn is_org_member(
    client: &OctocrabClient,
    org: &str,
    login: &str,
) -> Result<bool, GitHubApiError> {
    #[derive(Debug, Deserialize)]
    struct MembershipResponse {
        state: String,
    }

    let url = format!("/orgs/{}/memberships/{}", org, urlencoding::encode(login));
    let result: Result<MembershipResponse, _> = client.inner().get(&url, None::<&()>).await;

    match result {
        Ok(membership) => Ok(membership.state == "active"),
        Err(e) => {
            if indicates_missing(&e.to_string()) {
                Ok(false)
            } else {
                Err(GitHubApiError::from_octocrab(e))
            }
        }
    }
}

/// Lists the member logins of an org team.
pub async fn list_team_members(
    client: &OctocrabClient,
    org: &str,
    team: &str,
) -> Result<Vec<String>, GitHubApiError> {
    let mut page = 1u32;
    let mut all = Vec::new();

    loop {
        let url = format!(
            "/orgs/{}/teams/{}/members?per_page=100&page={}",
            org,
            urlencoding::encode(team),
            page
        );
        let items: Vec<UserRef> = client
            .inner()
            .get(&url, None::<&()>)
            .await
            .map_err(GitHubApiError::from_octocrab)?;
        let is_last_page = items.len() < 100;

        all.extend(items.into_iter().map(|user| user.login));

        if is_last_page {
            break;
        }
        page += 1;
    }

    Ok(all)
}
