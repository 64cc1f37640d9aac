//! Commit-and-publish: one commit if the artifact changed, then push.

use crate::config::{CommitConfig, RepositoryConfig};
use crate::error::{Result, UpdaterError};
use crate::git::Git;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// Sha of the commit created by this run, if any.
    pub commit: Option<String>,
    pub pushed: bool,
}

/// Commit `artifact` when it differs from HEAD, then push unconditionally.
///
/// "Nothing changed" is decided by asking git for the path's status before
/// committing, so a failing commit is always an error. An artifact matched by
/// an ignore rule is rejected, since its changes never show up in status. A push failure is an
/// error even when a commit was just made.
pub fn commit_and_publish(
    git: &Git,
    artifact: &str,
    commit: &CommitConfig,
    repo: &RepositoryConfig,
) -> Result<PublishOutcome> {
    if git.is_ignored(artifact)? {
        return Err(UpdaterError::CommitFailed(format!(
            "{artifact} is ignored by git and can never be committed"
        )));
    }

    let sha = if git.has_changes(artifact)? {
        git.add(artifact)?;
        let sha = git.commit(&commit.identity(), &commit.message, artifact)?;
        tracing::info!(%sha, path = artifact, "committed artifact");
        Some(sha)
    } else {
        tracing::info!(path = artifact, "No changes to commit");
        None
    };

    git.push(repo.remote.as_deref(), repo.branch.as_deref())?;
    tracing::info!("pushed to upstream");

    Ok(PublishOutcome {
        commit: sha,
        pushed: true,
    })
}
