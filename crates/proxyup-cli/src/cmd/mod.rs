pub mod config;
pub mod generate;
pub mod init;
pub mod run;
pub mod schedule;

use anyhow::Context;
use proxyup_core::config::Config;
use std::path::Path;

/// Load the config from `explicit` when given, else from the project root,
/// falling back to defaults when the project has no config file.
pub fn load_config(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Config> {
    match explicit {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Config::load_or_default(root).context("failed to load config"),
    }
}
