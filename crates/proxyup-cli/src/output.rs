use proxyup_core::generator::GenerateOutcome;
use proxyup_core::pipeline::RunReport;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn describe_outcome(outcome: &GenerateOutcome) -> String {
    match outcome {
        GenerateOutcome::Written { proxies } => format!("wrote {proxies} proxies"),
        GenerateOutcome::NoProxiesFetched => "no proxies fetched, artifact untouched".to_string(),
        GenerateOutcome::NoReachableProxies => {
            "no reachable proxies, artifact untouched".to_string()
        }
        GenerateOutcome::CommandSucceeded => "command succeeded".to_string(),
    }
}

/// Print a run report, as JSON or as an aligned summary.
pub fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(report);
    }
    let elapsed = report.finished_at - report.started_at;
    println!(
        "Run ({}) finished in {}ms",
        report.trigger,
        elapsed.num_milliseconds()
    );
    println!("  generator: {}", describe_outcome(&report.generator));
    match &report.committed {
        Some(sha) => println!("  commit:    {sha}"),
        None => println!("  commit:    none (no changes)"),
    }
    if let Some(branch) = &report.branch {
        println!("  branch:    {branch}");
    }
    println!("  pushed:    {}", if report.pushed { "yes" } else { "no" });
    Ok(())
}
