//! Thin wrapper over the `git` executable.
//!
//! Every invocation runs in one working copy via `current_dir` with
//! interactive credential prompts disabled. Global git config is never read
//! for identity or written.

use crate::error::{Result, UpdaterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Author and committer identity for a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Git {
    program: PathBuf,
    dir: PathBuf,
}

impl Git {
    pub fn new(dir: &Path) -> Result<Self> {
        Ok(Self {
            program: locate_git()?,
            dir: dir.to_path_buf(),
        })
    }

    /// Clone `url` into `dest` (which must be absent or empty).
    pub fn clone_into(url: &str, branch: Option<&str>, dest: &Path) -> Result<Self> {
        let program = locate_git()?;
        let mut cmd = base_command(&program);
        cmd.args(["clone", "--quiet"]);
        if let Some(b) = branch {
            cmd.args(["--branch", b]);
        }
        cmd.arg("--").arg(url).arg(dest);
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(UpdaterError::Checkout(format!(
                "git clone {url}: {}",
                stderr_text(&output)
            )));
        }
        Ok(Self {
            program,
            dir: dest.to_path_buf(),
        })
    }

    pub fn is_work_tree(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    /// True when `path` differs from HEAD in the worktree or index, including
    /// an untracked file at that path.
    pub fn has_changes(&self, path: &str) -> Result<bool> {
        let status = self.run(&["status", "--porcelain", "--untracked-files=all", "--", path])?;
        Ok(!status.trim().is_empty())
    }

    /// True when `path` is untracked and matched by an ignore rule.
    pub fn is_ignored(&self, path: &str) -> Result<bool> {
        let output = self
            .command()
            .args(["check-ignore", "--quiet", "--", path])
            .output()?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(UpdaterError::Git {
                command: "check-ignore".to_string(),
                message: stderr_text(&output),
            }),
        }
    }

    /// Reset `path` to its committed content. A path HEAD does not track is
    /// left alone.
    pub fn restore(&self, path: &str) -> Result<()> {
        let object = format!("HEAD:{path}");
        if self.run(&["cat-file", "-e", &object]).is_err() {
            return Ok(());
        }
        self.run(&["checkout", "--quiet", "HEAD", "--", path])?;
        Ok(())
    }

    /// Fetch and fast-forward the current branch to its remote counterpart.
    ///
    /// With a `branch` the target is `<remote>/<branch>` (remote default
    /// `origin`); otherwise it is the configured upstream. Returns false when
    /// there is nothing to follow: no upstream, or the remote branch does
    /// not exist yet.
    pub fn fast_forward(&self, remote: Option<&str>, branch: Option<&str>) -> Result<bool> {
        let target = match branch {
            Some(b) => {
                let r = remote.unwrap_or("origin");
                self.run(&["fetch", "--quiet", r])?;
                format!("refs/remotes/{r}/{b}")
            }
            None => {
                let upstream =
                    self.run(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"]);
                if upstream.is_err() {
                    tracing::debug!("no upstream configured, skipping fetch");
                    return Ok(false);
                }
                self.run(&["fetch", "--quiet"])?;
                "@{u}".to_string()
            }
        };
        if self.run(&["rev-parse", "--verify", "--quiet", &target]).is_err() {
            return Ok(false);
        }
        self.run(&["merge", "--ff-only", "--quiet", &target])?;
        Ok(true)
    }

    pub fn add(&self, path: &str) -> Result<()> {
        self.run(&["add", "--", path])?;
        Ok(())
    }

    /// Commit exactly `path` with the given identity. Returns the new HEAD sha.
    pub fn commit(&self, identity: &CommitIdentity, message: &str, path: &str) -> Result<String> {
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        let output = self
            .command()
            .args([
                "-c",
                name.as_str(),
                "-c",
                email.as_str(),
                "commit",
                "--quiet",
                "-m",
                message,
                "--",
                path,
            ])
            .output()?;
        if !output.status.success() {
            return Err(UpdaterError::CommitFailed(failure_text(&output)));
        }
        self.head()
    }

    pub fn head(&self) -> Result<String> {
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(self
            .run(&["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    /// Push the current branch.
    ///
    /// With neither `remote` nor `branch`, plain `git push` targets the
    /// configured upstream. A `branch` pushes `HEAD` to that branch on
    /// `remote` (default `origin`).
    pub fn push(&self, remote: Option<&str>, branch: Option<&str>) -> Result<()> {
        let mut args: Vec<String> = vec!["push".to_string(), "--porcelain".to_string()];
        match (remote, branch) {
            (None, None) => {}
            (Some(r), None) => {
                args.push(r.to_string());
                args.push("HEAD".to_string());
            }
            (r, Some(b)) => {
                args.push(r.unwrap_or("origin").to_string());
                args.push(format!("HEAD:refs/heads/{b}"));
            }
        }
        let output = self.command().args(&args).output()?;
        if !output.status.success() {
            return Err(UpdaterError::PushFailed(failure_text(&output)));
        }
        Ok(())
    }

    fn command(&self) -> Command {
        let mut cmd = base_command(&self.program);
        cmd.current_dir(&self.dir);
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.command().args(args).output()?;
        if !output.status.success() {
            return Err(UpdaterError::Git {
                command: args.first().copied().unwrap_or_default().to_string(),
                message: stderr_text(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn locate_git() -> Result<PathBuf> {
    which::which("git").map_err(|_| UpdaterError::GitNotFound)
}

fn base_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn combined_text(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}\n{}", stdout.trim(), stderr.trim())
        .trim()
        .to_string()
}

/// Exit status followed by whatever git printed, if anything.
fn failure_text(output: &Output) -> String {
    let status = match output.status.code() {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    };
    let text = combined_text(output);
    if text.is_empty() {
        status
    } else {
        format!("{status}: {text}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
