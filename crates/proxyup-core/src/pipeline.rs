//! The run pipeline: checkout, provision, generate, publish.
//!
//! Stages run strictly in order and the first failure ends the run, so a
//! failed provision or generator never reaches git. The trigger is carried
//! into the report and logs only.

use crate::checkout::{self, WorkingCopyInfo};
use crate::config::{Config, WarnLevel};
use crate::error::{Result, UpdaterError};
use crate::generator::{self, GenerateOutcome};
use crate::paths;
use crate::provision;
use crate::publish;
use crate::schedule::Trigger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub working_copy: WorkingCopyInfo,
    pub branch: Option<String>,
    pub generator: GenerateOutcome,
    /// Sha of the commit this run pushed, if the artifact changed.
    pub committed: Option<String>,
    pub pushed: bool,
}

/// Execute one run. `root` is the project root; it doubles as the working
/// copy unless the config names a repository to clone.
pub fn run(root: &Path, config: &Config, trigger: Trigger) -> Result<RunReport> {
    let started_at = Utc::now();
    let span = tracing::info_span!("run", trigger = %trigger);
    let _enter = span.enter();
    tracing::info!("run started");

    paths::validate_artifact(&config.artifact)?;
    let warnings = config.validate();
    if Config::has_errors(&warnings) {
        let messages: Vec<String> = warnings
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        return Err(UpdaterError::InvalidConfig(messages.join("; ")));
    }

    let (copy, git) = checkout::acquire(root, &config.repository, &config.artifact)?;
    let working_copy = checkout::describe(&copy, &config.repository);
    let branch = git.current_branch().ok();
    tracing::info!(
        path = %copy.path().display(),
        ephemeral = copy.is_ephemeral(),
        branch = branch.as_deref().unwrap_or("?"),
        "working copy ready"
    );

    provision::provision(&config.provision, copy.path())?;

    let artifact = paths::artifact_path(copy.path(), &config.artifact);
    let generated = generator::invoke(&config.generator, copy.path(), &artifact)?;
    tracing::info!(outcome = ?generated, "generator finished");

    let published =
        publish::commit_and_publish(&git, &config.artifact, &config.commit, &config.repository)?;

    let report = RunReport {
        trigger,
        started_at,
        finished_at: Utc::now(),
        working_copy,
        branch,
        generator: generated,
        committed: published.commit,
        pushed: published.pushed,
    };
    tracing::info!(committed = report.committed.is_some(), "run finished");
    Ok(report)
}
