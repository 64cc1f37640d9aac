use crate::output::print_report;
use anyhow::Context;
use proxyup_core::{pipeline, schedule::Trigger};
use std::path::Path;

pub fn run(root: &Path, config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let report = pipeline::run(root, &cfg, Trigger::Manual).context("run failed")?;
    print_report(&report, json)
}
