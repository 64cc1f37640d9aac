//! Subscription sources: fetching and parsing proxy candidates.

use crate::error::{Result, UpdaterError};
use serde_json::{Map, Value};
use std::time::Duration;

/// A proxy entry with the three fields every outbound needs. Everything else
/// the source provided (passwords, uuids, transports) rides along in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Protocol, lowercased.
    pub kind: String,
    pub server: String,
    pub port: u16,
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// Normalise a JSON entry. Entries without a usable type, server, or port
    /// are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let kind = obj.get("type")?.as_str()?.trim().to_lowercase();
        let server = obj.get("server")?.as_str()?.trim().to_string();
        let port = parse_port(obj.get("port")?)?;
        if kind.is_empty() || server.is_empty() {
            return None;
        }
        let extra = obj
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "type" | "server" | "port"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self {
            kind,
            server,
            port,
            extra,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

fn parse_port(value: &Value) -> Option<u16> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(n).ok().filter(|p| *p != 0)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a plain-text proxy list: one `proto://host:port` or `host:port` per
/// line, `#` comments and blank lines ignored. Bare entries are `http`.
pub fn parse_text_list(text: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_text_line(line) {
            Some(c) => out.push(c),
            None => tracing::warn!(line, "failed to parse proxy line"),
        }
    }
    out
}

fn parse_text_line(line: &str) -> Option<Candidate> {
    let (kind, rest) = match line.split_once("://") {
        Some((proto, rest)) => (proto.trim().to_lowercase(), rest),
        None => ("http".to_string(), line),
    };
    let mut parts = rest.split(':');
    let server = parts.next()?.trim();
    let port = parts.next()?.trim().parse::<u16>().ok()?;
    if parts.next().is_some() || server.is_empty() || kind.is_empty() || port == 0 {
        return None;
    }
    Some(Candidate {
        kind,
        server: server.to_string(),
        port,
        extra: Map::new(),
    })
}

/// Parse a JSON subscription body: a top-level array of entries, or an
/// object carrying an `outbounds` array. Any other shape yields nothing.
pub fn parse_json_body(body: &str) -> Result<Vec<Candidate>> {
    let value: Value = serde_json::from_str(body)?;
    let entries: &[Value] = match &value {
        Value::Array(items) => items.as_slice(),
        Value::Object(obj) => match obj.get("outbounds") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    let total = entries.len();
    let candidates: Vec<Candidate> = entries.iter().filter_map(Candidate::from_value).collect();
    if candidates.len() < total {
        tracing::debug!(
            dropped = total - candidates.len(),
            "skipped entries without type, server, or port"
        );
    }
    Ok(candidates)
}

/// Dispatch on the URL: `.txt` sources are text lists, everything else JSON.
pub fn parse_body(url: &str, body: &str) -> Result<Vec<Candidate>> {
    if url.ends_with(".txt") {
        Ok(parse_text_list(body))
    } else {
        parse_json_body(body)
    }
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

pub async fn fetch_source(client: &reqwest::Client, url: &str) -> Result<Vec<Candidate>> {
    let fetch_err = |e: reqwest::Error| UpdaterError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    };
    let body = client
        .get(url)
        .send()
        .await
        .map_err(fetch_err)?
        .error_for_status()
        .map_err(fetch_err)?
        .text()
        .await
        .map_err(fetch_err)?;
    parse_body(url, &body).map_err(|e| UpdaterError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Fetch every source in order. A failing source is logged and skipped.
pub async fn fetch_all(urls: &[String], timeout: Duration) -> Result<Vec<Candidate>> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UpdaterError::Fetch {
            url: String::new(),
            message: format!("cannot build HTTP client: {e}"),
        })?;

    let mut candidates = Vec::new();
    for url in urls {
        match fetch_source(&client, url).await {
            Ok(found) => {
                tracing::info!(%url, count = found.len(), "fetched proxies");
                candidates.extend(found);
            }
            Err(e) => tracing::error!(%url, error = %e, "failed to fetch subscription"),
        }
    }
    Ok(candidates)
}
