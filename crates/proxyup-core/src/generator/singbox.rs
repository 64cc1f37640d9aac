//! Per-protocol selection and sing-box config rendering.

use super::probe::Probed;
use serde_json::{json, Map, Value};

/// Selected proxies grouped by protocol, in order of first appearance.
pub type Selection = Vec<(String, Vec<Probed>)>;

/// Group survivors by protocol, then keep the `max_per_protocol` best by
/// score within each group.
pub fn select_best(probed: Vec<Probed>, max_per_protocol: usize) -> Selection {
    let mut groups: Selection = Vec::new();
    for p in probed {
        match groups.iter_mut().find(|(kind, _)| *kind == p.candidate.kind) {
            Some((_, list)) => list.push(p),
            None => groups.push((p.candidate.kind.clone(), vec![p])),
        }
    }
    for (_, list) in groups.iter_mut() {
        list.sort_by(|a, b| b.score.total_cmp(&a.score));
        list.truncate(max_per_protocol);
    }
    groups.retain(|(_, list)| !list.is_empty());
    groups
}

fn tag(protocol: &str, index: usize) -> String {
    format!("{protocol}-{index}")
}

fn field_or(extra: &Map<String, Value>, key: &str, default: Value) -> Value {
    extra.get(key).cloned().unwrap_or(default)
}

/// One outbound entry. Protocols sing-box needs credentials for get them
/// from the source entry, with the defaults below when absent.
fn outbound(protocol: &str, index: usize, p: &Probed) -> Value {
    let c = &p.candidate;
    let mut out = Map::new();
    out.insert("type".to_string(), json!(protocol));
    out.insert("server".to_string(), json!(c.server));
    out.insert("port".to_string(), json!(c.port));
    out.insert("tag".to_string(), json!(tag(protocol, index)));

    let extra = &c.extra;
    let fields: Vec<(&str, Value)> = match protocol {
        "hysteria2" => vec![
            ("up_mbps", json!(100)),
            ("down_mbps", json!(100)),
            ("password", json!("")),
        ],
        "shadowsocks" => vec![
            ("method", json!("2022-blake3-aes-256-gcm")),
            ("password", json!("")),
        ],
        "vmess" => vec![("uuid", json!("")), ("transport", json!({"type": "grpc"}))],
        "tuic" => vec![("uuid", json!("")), ("password", json!(""))],
        "trojan" => vec![("password", json!(""))],
        _ => Vec::new(),
    };
    for (key, default) in fields {
        out.insert(key.to_string(), field_or(extra, key, default));
    }
    Value::Object(out)
}

/// Render the full sing-box document. Returns `None` for an empty selection.
///
/// Layout: a `proxy` selector over every chosen outbound (defaulting to the
/// first hysteria2 entry when one exists), the outbounds themselves, then
/// `direct` and `block`.
pub fn render(selection: &Selection) -> Option<Value> {
    let (first_protocol, _) = selection.first()?;

    let tags: Vec<String> = selection
        .iter()
        .flat_map(|(proto, list)| (0..list.len()).map(move |i| tag(proto, i)))
        .collect();
    let default = if selection.iter().any(|(proto, _)| proto == "hysteria2") {
        tag("hysteria2", 0)
    } else {
        tag(first_protocol, 0)
    };

    let mut outbounds = vec![json!({
        "type": "selector",
        "tag": "proxy",
        "outbounds": tags,
        "default": default,
    })];
    for (proto, list) in selection {
        for (i, p) in list.iter().enumerate() {
            outbounds.push(outbound(proto, i, p));
        }
    }
    outbounds.push(json!({"type": "direct", "tag": "direct"}));
    outbounds.push(json!({"type": "block", "tag": "block"}));

    Some(json!({
        "log": {"level": "info"},
        "outbounds": outbounds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::subscription::Candidate;

    fn probed(kind: &str, server: &str, score: f64, extra: Value) -> Probed {
        Probed {
            candidate: Candidate {
                kind: kind.to_string(),
                server: server.to_string(),
                port: 443,
                extra: extra.as_object().cloned().unwrap_or_default(),
            },
            latency_ms: 1.0,
            speed: 0.0,
            score,
        }
    }

    #[test]
    fn selects_top_n_per_protocol_by_score() {
        let input = vec![
            probed("vmess", "v1", 1.0, json!({})),
            probed("trojan", "t1", 5.0, json!({})),
            probed("vmess", "v2", 9.0, json!({})),
            probed("vmess", "v3", 4.0, json!({})),
            probed("vmess", "v4", 7.0, json!({})),
        ];
        let selection = select_best(input, 3);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection[0].0, "vmess");
        let servers: Vec<&str> = selection[0]
            .1
            .iter()
            .map(|p| p.candidate.server.as_str())
            .collect();
        assert_eq!(servers, vec!["v2", "v4", "v3"]);
        assert_eq!(selection[1].0, "trojan");
    }

    #[test]
    fn zero_limit_selects_nothing() {
        let selection = select_best(vec![probed("http", "h", 1.0, json!({}))], 0);
        assert!(selection.is_empty());
        assert!(render(&selection).is_none());
    }

    #[test]
    fn selector_defaults_to_hysteria2() {
        let selection = select_best(
            vec![
                probed("trojan", "t", 1.0, json!({})),
                probed("hysteria2", "h", 1.0, json!({})),
            ],
            3,
        );
        let doc = render(&selection).unwrap();
        let selector = &doc["outbounds"][0];
        assert_eq!(selector["type"], "selector");
        assert_eq!(selector["tag"], "proxy");
        assert_eq!(selector["default"], "hysteria2-0");
        assert_eq!(selector["outbounds"], json!(["trojan-0", "hysteria2-0"]));
    }

    #[test]
    fn selector_defaults_to_first_protocol() {
        let selection = select_best(
            vec![
                probed("http", "a", 1.0, json!({})),
                probed("http", "b", 2.0, json!({})),
                probed("vmess", "c", 1.0, json!({})),
            ],
            3,
        );
        let doc = render(&selection).unwrap();
        assert_eq!(doc["outbounds"][0]["default"], "http-0");
        assert_eq!(doc["outbounds"][1]["server"], "b");
        assert_eq!(doc["outbounds"][1]["tag"], "http-0");
        assert_eq!(doc["outbounds"][2]["tag"], "http-1");
    }

    #[test]
    fn protocol_fields_and_defaults() {
        let selection = select_best(
            vec![
                probed("hysteria2", "h", 1.0, json!({"password": "secret", "up_mbps": 50})),
                probed("shadowsocks", "s", 1.0, json!({})),
                probed("vmess", "v", 1.0, json!({"uuid": "u-1"})),
                probed("tuic", "t", 1.0, json!({})),
                probed("trojan", "tr", 1.0, json!({"password": "pw", "sni": "x"})),
                probed("http", "p", 1.0, json!({"password": "ignored"})),
            ],
            3,
        );
        let doc = render(&selection).unwrap();
        let out = doc["outbounds"].as_array().unwrap();

        assert_eq!(out[1]["password"], "secret");
        assert_eq!(out[1]["up_mbps"], 50);
        assert_eq!(out[1]["down_mbps"], 100);

        assert_eq!(out[2]["method"], "2022-blake3-aes-256-gcm");
        assert_eq!(out[2]["password"], "");

        assert_eq!(out[3]["uuid"], "u-1");
        assert_eq!(out[3]["transport"], json!({"type": "grpc"}));

        assert_eq!(out[4]["uuid"], "");
        assert_eq!(out[4]["password"], "");

        assert_eq!(out[5]["password"], "pw");
        assert!(out[5].get("sni").is_none());

        assert_eq!(
            out[6],
            json!({"type": "http", "server": "p", "port": 443, "tag": "http-0"})
        );

        assert_eq!(out[7], json!({"type": "direct", "tag": "direct"}));
        assert_eq!(out[8], json!({"type": "block", "tag": "block"}));
        assert_eq!(doc["log"], json!({"level": "info"}));
    }
}
