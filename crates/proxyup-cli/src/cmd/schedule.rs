use crate::output::{print_json, print_report};
use anyhow::Context;
use chrono::Utc;
use proxyup_core::{pipeline, schedule::Schedule};
use std::path::Path;

pub struct ScheduleArgs {
    pub cron: Option<String>,
    pub max_runs: Option<usize>,
    pub preview: Option<usize>,
}

/// Sleep until each firing and run the pipeline, one run at a time.
///
/// A failed run is logged and the loop moves on to the next firing. With
/// `--max-runs` the command exits non-zero if any of its runs failed.
pub fn run(
    root: &Path,
    config: Option<&Path>,
    args: ScheduleArgs,
    json: bool,
) -> anyhow::Result<()> {
    let mut cfg = super::load_config(root, config)?;
    if let Some(expr) = args.cron {
        cfg.schedule.cron = expr;
    }
    let schedule = Schedule::parse(&cfg.schedule.cron).context("invalid schedule")?;

    if let Some(count) = args.preview {
        return preview(&schedule, count, json);
    }

    tracing::info!(cron = schedule.expr(), "scheduler started");
    let mut runs = 0usize;
    let mut failures = 0usize;
    while args.max_runs.map_or(true, |max| runs < max) {
        let now = Utc::now();
        let next = schedule
            .next_after(now)
            .with_context(|| format!("'{}' has no upcoming firings", schedule.expr()))?;
        tracing::info!(next = %next.to_rfc3339(), "waiting for next firing");
        std::thread::sleep((next - now).to_std().unwrap_or_default());

        runs += 1;
        match pipeline::run(root, &cfg, schedule.trigger()) {
            Ok(report) => print_report(&report, json)?,
            Err(e) => {
                failures += 1;
                tracing::error!(error = %e, run = runs, "scheduled run failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {runs} scheduled runs failed");
    }
    Ok(())
}

fn preview(schedule: &Schedule, count: usize, json: bool) -> anyhow::Result<()> {
    let firings = schedule.upcoming(Utc::now(), count);
    if json {
        let times: Vec<String> = firings.iter().map(|t| t.to_rfc3339()).collect();
        return print_json(&serde_json::json!({
            "cron": schedule.expr(),
            "upcoming": times,
        }));
    }
    println!("Upcoming firings for '{}':", schedule.expr());
    for t in firings {
        println!("  {}", t.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    Ok(())
}
