//! Working-copy acquisition.

use crate::config::RepositoryConfig;
use crate::error::{Result, UpdaterError};
use crate::git::Git;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A checkout the pipeline runs against.
///
/// An `Ephemeral` copy owns its temporary directory; dropping the value
/// deletes the clone.
#[derive(Debug)]
pub enum WorkingCopy {
    Existing { path: PathBuf },
    Ephemeral { _dir: TempDir, path: PathBuf },
}

/// Serializable description of a working copy, used in run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkingCopyInfo {
    Existing { path: String },
    Ephemeral { url: String },
}

impl WorkingCopy {
    pub fn path(&self) -> &Path {
        match self {
            WorkingCopy::Existing { path } => path,
            WorkingCopy::Ephemeral { path, .. } => path,
        }
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, WorkingCopy::Ephemeral { .. })
    }
}

/// Acquire the working copy for one run.
///
/// With `repository.url` set a fresh clone is made. Otherwise `root` must
/// already be a git working tree; `artifact` is reset to its committed
/// content and the branch is fast-forwarded to its remote, so every run
/// starts from the current remote revision.
pub fn acquire(
    root: &Path,
    repo: &RepositoryConfig,
    artifact: &str,
) -> Result<(WorkingCopy, Git)> {
    match &repo.url {
        Some(url) => {
            let dir = tempfile::Builder::new()
                .prefix("proxyup-")
                .tempdir()
                .map_err(|e| UpdaterError::Checkout(format!("cannot create temp dir: {e}")))?;
            let path = dir.path().join("repo");
            tracing::info!(url = %url, dest = %path.display(), "cloning working copy");
            let git = Git::clone_into(url, repo.branch.as_deref(), &path)?;
            Ok((WorkingCopy::Ephemeral { _dir: dir, path }, git))
        }
        None => {
            let git = Git::new(root)?;
            if !git.is_work_tree() {
                return Err(UpdaterError::Checkout(format!(
                    "{} is not a git working tree",
                    root.display()
                )));
            }
            let refresh = || -> Result<bool> {
                git.restore(artifact)?;
                git.fast_forward(repo.remote.as_deref(), repo.branch.as_deref())
            };
            let updated = refresh().map_err(|e| {
                UpdaterError::Checkout(format!("cannot update {}: {e}", root.display()))
            })?;
            tracing::info!(path = %root.display(), updated, "using existing working copy");
            Ok((
                WorkingCopy::Existing {
                    path: root.to_path_buf(),
                },
                git,
            ))
        }
    }
}

pub fn describe(copy: &WorkingCopy, repo: &RepositoryConfig) -> WorkingCopyInfo {
    match copy {
        WorkingCopy::Existing { path } => WorkingCopyInfo::Existing {
            path: path.display().to_string(),
        },
        WorkingCopy::Ephemeral { .. } => WorkingCopyInfo::Ephemeral {
            url: repo.url.clone().unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testutil::{git, Fixture};

    const ARTIFACT: &str = "sing-box-config.json";

    #[test]
    fn existing_work_tree_is_used_in_place() {
        let fx = Fixture::new();
        let (copy, _git) =
            acquire(fx.clone.path(), &RepositoryConfig::default(), ARTIFACT).unwrap();
        assert!(!copy.is_ephemeral());
        assert_eq!(copy.path(), fx.clone.path());
    }

    #[test]
    fn existing_copy_catches_up_with_remote() {
        let fx = Fixture::new();
        fx.push_elsewhere("README.md", "moved upstream\n");
        std::fs::write(fx.clone.path().join(ARTIFACT), "partial").unwrap();

        let (copy, repo) =
            acquire(fx.clone.path(), &RepositoryConfig::default(), ARTIFACT).unwrap();
        assert!(copy.path().join("README.md").exists());
        assert_eq!(
            std::fs::read_to_string(copy.path().join(ARTIFACT)).unwrap(),
            "{}\n"
        );
        let remote_head = git(fx.remote.path(), &["rev-parse", "HEAD"]);
        assert_eq!(repo.head().unwrap(), remote_head.trim());
    }

    #[test]
    fn diverged_existing_copy_is_checkout_error() {
        let fx = Fixture::new();
        fx.push_elsewhere("README.md", "theirs\n");
        std::fs::write(fx.clone.path().join("local.txt"), "ours").unwrap();
        git(fx.clone.path(), &["add", "local.txt"]);
        git(fx.clone.path(), &["commit", "--quiet", "-m", "local only"]);

        let err =
            acquire(fx.clone.path(), &RepositoryConfig::default(), ARTIFACT).unwrap_err();
        assert!(matches!(err, UpdaterError::Checkout(_)));
    }

    #[test]
    fn non_repository_root_is_checkout_error() {
        let dir = TempDir::new().unwrap();
        let err = acquire(dir.path(), &RepositoryConfig::default(), ARTIFACT).unwrap_err();
        assert!(matches!(err, UpdaterError::Checkout(_)));
    }

    #[test]
    fn ephemeral_clone_is_removed_on_drop() {
        let fx = Fixture::new();
        let repo = RepositoryConfig {
            url: Some(fx.remote.path().display().to_string()),
            ..RepositoryConfig::default()
        };
        let unused_root = TempDir::new().unwrap();
        let (copy, git) = acquire(unused_root.path(), &repo, ARTIFACT).unwrap();
        assert!(copy.is_ephemeral());
        assert!(git.is_work_tree());
        let path = copy.path().to_path_buf();
        assert!(path.join("sing-box-config.json").exists());
        assert_eq!(
            describe(&copy, &repo),
            WorkingCopyInfo::Ephemeral {
                url: fx.remote.path().display().to_string()
            }
        );
        drop(copy);
        assert!(!path.exists());
    }
}
