use crate::output::{describe_outcome, print_json};
use anyhow::Context;
use proxyup_core::{generator, paths};
use std::path::Path;

/// Run the generator against `root` directly: no checkout, provisioning,
/// or git. `output` (relative to `root` unless absolute) replaces the
/// configured artifact path for the built-in generator.
pub fn run(
    root: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let artifact = match output {
        Some(p) => root.join(p),
        None => {
            paths::validate_artifact(&cfg.artifact)?;
            paths::artifact_path(root, &cfg.artifact)
        }
    };

    let outcome =
        generator::invoke(&cfg.generator, root, &artifact).context("generation failed")?;

    if json {
        return print_json(&serde_json::json!({
            "artifact": artifact.display().to_string(),
            "outcome": outcome,
        }));
    }
    println!("{}: {}", artifact.display(), describe_outcome(&outcome));
    Ok(())
}
