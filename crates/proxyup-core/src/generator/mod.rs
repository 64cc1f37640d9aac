//! Generator invocation: produce or overwrite the artifact exactly once per run.

pub mod probe;
pub mod singbox;
pub mod subscription;

use crate::config::{BuiltinSettings, GeneratorConfig};
use crate::error::{Result, UpdaterError};
use crate::process::{display_argv, run_captured};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::RuntimeFlavor;

/// What the generator did to the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerateOutcome {
    /// The built-in generator wrote this many proxy outbounds.
    Written { proxies: usize },
    /// No subscription yielded a usable entry; artifact untouched.
    NoProxiesFetched,
    /// Entries were fetched but none was reachable; artifact untouched.
    NoReachableProxies,
    /// An external command ran to success. Whether it wrote anything is
    /// for the publish step to find out.
    CommandSucceeded,
}

/// Run the configured generator in `working_copy`, writing `artifact`.
pub fn invoke(cfg: &GeneratorConfig, working_copy: &Path, artifact: &Path) -> Result<GenerateOutcome> {
    match cfg {
        GeneratorConfig::Command { argv } => run_command(argv, working_copy),
        GeneratorConfig::Builtin(settings) => generate_blocking(settings, artifact),
    }
}

fn run_command(argv: &[String], working_copy: &Path) -> Result<GenerateOutcome> {
    let label = display_argv(argv);
    tracing::info!(command = %label, "invoking generator");
    let out = run_captured(argv, working_copy).map_err(|e| UpdaterError::GeneratorFailed {
        status: "spawn failed".to_string(),
        output: format!("{label}: {e}"),
    })?;
    if !out.output.is_empty() {
        tracing::info!(output = %out.output, "generator output");
    }
    if !out.success {
        return Err(UpdaterError::GeneratorFailed {
            status: out.status_label(),
            output: out.output,
        });
    }
    Ok(GenerateOutcome::CommandSucceeded)
}

/// Run the built-in generator from synchronous code.
///
/// Inside a multi-threaded runtime the current worker is handed over with
/// `block_in_place`. A current-thread runtime cannot do that, so the work
/// moves to a scoped thread with a runtime of its own. Outside any runtime
/// one is created here.
pub fn generate_blocking(settings: &BuiltinSettings, artifact: &Path) -> Result<GenerateOutcome> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(generate(settings, artifact)))
        }
        Ok(_) => std::thread::scope(|scope| {
            scope
                .spawn(|| generate_on_own_runtime(settings, artifact))
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        }),
        Err(_) => generate_on_own_runtime(settings, artifact),
    }
}

fn generate_on_own_runtime(settings: &BuiltinSettings, artifact: &Path) -> Result<GenerateOutcome> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(generate(settings, artifact))
}

/// Fetch, probe, select, and render. The artifact is only written when at
/// least one proxy survives.
pub async fn generate(settings: &BuiltinSettings, artifact: &Path) -> Result<GenerateOutcome> {
    tracing::info!(sources = settings.subscriptions.len(), "starting proxy update cycle");
    let timeout = Duration::from_secs(settings.timeout_secs);

    let candidates = subscription::fetch_all(&settings.subscriptions, timeout).await?;
    if candidates.is_empty() {
        tracing::warn!("no proxies fetched");
        return Ok(GenerateOutcome::NoProxiesFetched);
    }

    let fetched = candidates.len();
    let survivors = probe::probe_all(candidates, timeout, settings.concurrency).await;
    tracing::info!(fetched, reachable = survivors.len(), "probing finished");

    let selection = singbox::select_best(survivors, settings.max_per_protocol);
    let Some(doc) = singbox::render(&selection) else {
        tracing::warn!("no valid proxies found");
        return Ok(GenerateOutcome::NoReachableProxies);
    };

    let proxies: usize = selection.iter().map(|(_, list)| list.len()).sum();
    let data = serde_json::to_string_pretty(&doc)?;
    crate::io::atomic_write(artifact, data.as_bytes())?;
    tracing::info!(path = %artifact.display(), proxies, "sing-box configuration updated");
    Ok(GenerateOutcome::Written { proxies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    #[test]
    fn command_generator_runs_in_working_copy() {
        let dir = TempDir::new().unwrap();
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo '{}' > sing-box-config.json".to_string(),
        ];
        let cfg = GeneratorConfig::Command { argv };
        let artifact = dir.path().join("sing-box-config.json");
        let outcome = invoke(&cfg, dir.path(), &artifact).unwrap();
        assert_eq!(outcome, GenerateOutcome::CommandSucceeded);
        assert!(artifact.exists());
    }

    #[test]
    fn command_generator_failure_carries_status() {
        let dir = TempDir::new().unwrap();
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo boom >&2; exit 4".to_string(),
        ];
        let err = invoke(
            &GeneratorConfig::Command { argv },
            dir.path(),
            &dir.path().join("out.json"),
        )
        .unwrap_err();
        match err {
            UpdaterError::GeneratorFailed { status, output } => {
                assert_eq!(status, "exit code 4");
                assert!(output.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builtin_with_no_sources_leaves_artifact_untouched() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("sing-box-config.json");
        std::fs::write(&artifact, "previous").unwrap();
        let settings = BuiltinSettings {
            subscriptions: vec![],
            ..BuiltinSettings::default()
        };
        let outcome = generate_blocking(&settings, &artifact).unwrap();
        assert_eq!(outcome, GenerateOutcome::NoProxiesFetched);
        assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "previous");
    }

    #[tokio::test]
    async fn blocking_entry_works_on_current_thread_runtime() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("sing-box-config.json");
        let settings = BuiltinSettings {
            subscriptions: vec![],
            ..BuiltinSettings::default()
        };
        let outcome = generate_blocking(&settings, &artifact).unwrap();
        assert_eq!(outcome, GenerateOutcome::NoProxiesFetched);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_entry_works_on_multi_thread_runtime() {
        let dir = TempDir::new().unwrap();
        let settings = BuiltinSettings {
            subscriptions: vec![],
            ..BuiltinSettings::default()
        };
        let outcome = generate_blocking(&settings, &dir.path().join("out.json")).unwrap();
        assert_eq!(outcome, GenerateOutcome::NoProxiesFetched);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn builtin_writes_config_for_reachable_proxy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/proxies.json")
            .with_status(200)
            .with_body(format!(
                r#"[{{"type": "trojan", "server": "127.0.0.1", "port": {port}, "password": "pw"}}]"#
            ))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("sing-box-config.json");
        let settings = BuiltinSettings {
            subscriptions: vec![format!("{}/proxies.json", server.url())],
            max_per_protocol: 3,
            timeout_secs: 2,
            concurrency: 4,
        };
        let outcome = generate(&settings, &artifact).await.unwrap();
        assert_eq!(outcome, GenerateOutcome::Written { proxies: 1 });

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&artifact).unwrap()).unwrap();
        assert_eq!(doc["outbounds"][0]["default"], "trojan-0");
        assert_eq!(doc["outbounds"][1]["password"], "pw");
        assert_eq!(doc["outbounds"][1]["port"], port);
        drop(listener);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn builtin_with_unreachable_proxies_leaves_artifact_untouched() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/http.txt")
            .with_status(200)
            .with_body(format!("127.0.0.1:{port}\n"))
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("sing-box-config.json");
        let settings = BuiltinSettings {
            subscriptions: vec![format!("{}/http.txt", server.url())],
            max_per_protocol: 3,
            timeout_secs: 2,
            concurrency: 4,
        };
        let outcome = generate(&settings, &artifact).await.unwrap();
        assert_eq!(outcome, GenerateOutcome::NoReachableProxies);
        assert!(!artifact.exists());
    }
}
