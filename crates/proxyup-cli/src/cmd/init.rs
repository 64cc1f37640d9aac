use crate::output::print_json;
use anyhow::Context;
use proxyup_core::{config::Config, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    let created = !config_path.exists();
    if created {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
    }
    let is_repo = root.join(".git").exists();

    if json {
        return print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config": config_path.display().to_string(),
            "created": created,
            "git_repository": is_repo,
        }));
    }

    println!("Initializing proxyup in: {}", root.display());
    if created {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    if !is_repo {
        println!(
            "\nnote: {} is not a git checkout; set repository.url to clone one per run",
            root.display()
        );
    }
    Ok(())
}
