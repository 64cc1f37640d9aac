//! Environment provisioning: runtime check and dependency-install steps.

use crate::config::{ProvisionConfig, RuntimeRequirement};
use crate::error::{Result, UpdaterError};
use crate::process::{display_argv, run_captured};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)*").unwrap())
}

/// Run every provisioning stage in order. The first failure aborts.
pub fn provision(cfg: &ProvisionConfig, working_copy: &Path) -> Result<()> {
    if let Some(runtime) = &cfg.runtime {
        let version = check_runtime(runtime, working_copy)?;
        tracing::info!(program = %runtime.program, %version, "runtime available");
    }

    for step in &cfg.steps {
        let label = display_argv(step);
        tracing::info!(step = %label, "running provisioning step");
        let out = run_captured(step, working_copy)
            .map_err(|e| UpdaterError::ProvisionFailed(format!("{label}: {e}")))?;
        if !out.success {
            return Err(UpdaterError::ProvisionFailed(format!(
                "{label} ({}): {}",
                out.status_label(),
                out.output
            )));
        }
        tracing::debug!(step = %label, output = %out.output, "provisioning step finished");
    }
    Ok(())
}

/// Locate the runtime on PATH and verify its reported version. Returns the
/// version string it reported.
pub fn check_runtime(req: &RuntimeRequirement, cwd: &Path) -> Result<String> {
    let program = which::which(&req.program).map_err(|_| {
        UpdaterError::ProvisionFailed(format!("runtime '{}' not found on PATH", req.program))
    })?;

    let argv = vec![program.display().to_string(), "--version".to_string()];
    let out = run_captured(&argv, cwd)
        .map_err(|e| UpdaterError::ProvisionFailed(format!("{} --version: {e}", req.program)))?;
    if !out.success {
        return Err(UpdaterError::ProvisionFailed(format!(
            "{} --version ({}): {}",
            req.program,
            out.status_label(),
            out.output
        )));
    }

    let reported = extract_version(&out.output).ok_or_else(|| {
        UpdaterError::ProvisionFailed(format!(
            "could not read a version from '{} --version' output: {}",
            req.program, out.output
        ))
    })?;

    if let Some(required) = &req.version {
        if !version_matches(required, &reported) {
            return Err(UpdaterError::ProvisionFailed(format!(
                "{} {reported} does not satisfy version {required}",
                req.program
            )));
        }
    }
    Ok(reported)
}

/// First dotted number in a `--version` banner (`Python 3.11.4` → `3.11.4`).
pub fn extract_version(output: &str) -> Option<String> {
    version_re().find(output).map(|m| m.as_str().to_string())
}

/// Component-wise prefix match. `x` and `*` match any component; components
/// the specifier leaves out match anything.
pub fn version_matches(required: &str, version: &str) -> bool {
    let actual: Vec<&str> = version.split('.').collect();
    for (i, want) in required.trim().split('.').enumerate() {
        if want == "x" || want == "X" || want == "*" {
            continue;
        }
        match actual.get(i) {
            Some(got) if got == &want => {}
            _ => return false,
        }
    }
    true
}
