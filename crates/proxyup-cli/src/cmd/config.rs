use crate::output::print_json;
use clap::Subcommand;
use proxyup_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration, defaults included
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(
    root: &Path,
    config: Option<&Path>,
    subcmd: ConfigSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    match subcmd {
        ConfigSubcommand::Show => show(&cfg, json),
        ConfigSubcommand::Validate => validate(&cfg, json),
    }
}

fn show(cfg: &Config, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(cfg);
    }
    print!("{}", cfg.to_yaml()?);
    Ok(())
}

fn validate(cfg: &Config, json: bool) -> anyhow::Result<()> {
    let warnings = cfg.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if Config::has_errors(&warnings) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
