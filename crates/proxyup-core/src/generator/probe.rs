//! Reachability probing. A candidate survives only if a TCP connect to its
//! server succeeds within the timeout.

use super::subscription::Candidate;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct Probed {
    pub candidate: Candidate,
    pub latency_ms: f64,
    pub speed: f64,
    pub score: f64,
}

/// Higher is better: fast connects dominate, repeat-connect speed breaks ties.
pub fn score(latency_ms: f64, speed: f64) -> f64 {
    1000.0 / (latency_ms + 1.0) + speed
}

async fn connect(server: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((server, port))).await,
        Ok(Ok(_))
    )
}

/// Connect once for latency, then again for the speed estimate
/// (reciprocal of the second connect time in seconds, 0 if it fails).
pub async fn probe(candidate: Candidate, timeout: Duration) -> Option<Probed> {
    let start = Instant::now();
    if !connect(&candidate.server, candidate.port, timeout).await {
        tracing::debug!(address = %candidate.address(), "proxy unreachable");
        return None;
    }
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    let again = Instant::now();
    let speed = if connect(&candidate.server, candidate.port, timeout).await {
        let secs = again.elapsed().as_secs_f64();
        if secs > 0.0 {
            1.0 / secs
        } else {
            0.0
        }
    } else {
        0.0
    };

    Some(Probed {
        latency_ms,
        speed,
        score: score(latency_ms, speed),
        candidate,
    })
}

/// Probe every candidate with at most `concurrency` connects in flight.
/// Survivors keep their input order.
pub async fn probe_all(
    candidates: Vec<Candidate>,
    timeout: Duration,
    concurrency: usize,
) -> Vec<Probed> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let sem = semaphore.clone();
        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.ok()?;
            probe(candidate, timeout).await
        }));
    }

    let mut survivors = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Some(p)) => survivors.push(p),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "probe task failed"),
        }
    }
    survivors
}
