use crate::error::{Result, UpdaterError};
use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const PROXYUP_DIR: &str = ".proxyup";
pub const CONFIG_FILE: &str = ".proxyup/config.yaml";

pub const DEFAULT_ARTIFACT: &str = "sing-box-config.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve the artifact inside a working copy. The relative form is what git
/// sees; the joined form is what the generator writes.
pub fn artifact_path(working_copy: &Path, artifact: &str) -> PathBuf {
    working_copy.join(artifact)
}

// ---------------------------------------------------------------------------
// Artifact validation
// ---------------------------------------------------------------------------

/// The artifact must be a plain relative path that stays inside the working
/// copy: no root, no drive prefix, no `..`.
pub fn validate_artifact(artifact: &str) -> Result<()> {
    if artifact.trim().is_empty() {
        return Err(UpdaterError::InvalidConfig(
            "artifact path is empty".to_string(),
        ));
    }
    let path = Path::new(artifact);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(UpdaterError::InvalidConfig(format!(
                    "artifact path '{artifact}' must be relative to the repository root"
                )))
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
