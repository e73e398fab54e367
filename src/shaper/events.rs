//! Flattening of application-firewall request events.
//!
//! Event records vary between software versions: violation lists hold either
//! objects or bare names, and rating/blocking state lives either at the top
//! level or under `enforcementState`. Each accessor below tries the known
//! locations in order and falls back to a neutral value.

use serde::Serialize;
use serde_json::{Map, Value};

/// One row of `listSecurityEvents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub time: String,
    pub client_ip: String,
    pub method: String,
    pub uri: String,
    pub violations: String,
    pub rating: Value,
    pub blocked: bool,
}

fn text(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn violation_names(item: &Value) -> Vec<String> {
    let Some(list) = item.get("violations").and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => v
                .pointer("/violationReference/name")
                .or_else(|| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

fn rating(item: &Value) -> Value {
    item.get("violationRating")
        .or_else(|| item.pointer("/enforcementState/rating"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn blocked(item: &Value) -> bool {
    item.get("isRequestBlocked")
        .or_else(|| item.pointer("/enforcementState/isBlocked"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn summarize(item: &Value) -> EventSummary {
    EventSummary {
        id: text(item, &["id"]),
        time: text(item, &["requestDatetime", "time"]),
        client_ip: text(item, &["clientIp", "sourceIp"]),
        method: text(item, &["method"]),
        uri: text(item, &["url", "uri"]),
        violations: violation_names(item).join(", "),
        rating: rating(item),
        blocked: blocked(item),
    }
}

/// Summaries of every item in an events collection, in device order.
pub fn summarize_all(response: Option<&Value>) -> Vec<EventSummary> {
    response
        .and_then(|v| v.get("items"))
        .and_then(Value::as_array)
        .map(|items| items.iter().map(summarize).collect())
        .unwrap_or_default()
}

/// Forensic field set of a single event, including the raw request.
pub fn detail(item: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    let mut put = |key: &str, value: Value| {
        out.insert(key.to_string(), value);
    };

    put("id", text(item, &["id"]).into());
    put("time", text(item, &["requestDatetime", "time"]).into());
    put("client_ip", text(item, &["clientIp", "sourceIp"]).into());
    put("client_port", text(item, &["clientPort", "sourcePort"]).into());
    put("method", text(item, &["method"]).into());
    put("uri", text(item, &["url", "uri"]).into());
    put("host", text(item, &["host"]).into());
    put("response_code", text(item, &["responseCode"]).into());
    put(
        "policy",
        item.pointer("/requestPolicyReference/name")
            .or_else(|| item.get("policyName"))
            .cloned()
            .unwrap_or(Value::Null),
    );
    put("rating", rating(item));
    put("blocked", blocked(item).into());
    put("violations", violation_names(item).into());
    put(
        "request",
        item.pointer("/rawRequest/httpRequest")
            .or_else(|| item.get("requestString"))
            .cloned()
            .unwrap_or(Value::Null),
    );
    out
}
