//! Log extraction.
//!
//! The `sys/log/*/stats` endpoints answer in one of two shapes depending on
//! the software version:
//!
//! ```text
//! { "apiRawValues": { "apiAnonymous": "<whole log dump>" } }
//!
//! { "entries": { "<url>": { "nestedStats": { "entries": {
//!     "<url>": { "nestedStats": { "entries": {
//!         "description": { "description": "<one log line>" } } } } } } } } }
//! ```
//!
//! The raw string is preferred: it is complete and in device order.

use serde_json::{Map, Value};
use tracing::warn;

/// How much of an unrecognized response is echoed back for diagnosis.
pub const PREVIEW_CHARS: usize = 500;

/// Nesting levels searched for per-entry `description` fields.
const MAX_DEPTH: usize = 4;

/// A log response, classified by the fields it actually carries.
#[derive(Debug, Clone, PartialEq)]
pub enum LogPayload {
    /// `apiRawValues.apiAnonymous`: the full dump as one string.
    RawText(String),
    /// Lines rebuilt from the nested stats tree, in device order.
    Entries(Vec<String>),
    /// Neither shape; holds a bounded preview of what came back.
    Unrecognized(String),
}

impl LogPayload {
    pub fn classify(response: Option<&Value>) -> Self {
        let Some(value) = response else {
            return LogPayload::Entries(Vec::new());
        };

        if let Some(raw) = value
            .pointer("/apiRawValues/apiAnonymous")
            .and_then(Value::as_str)
        {
            return LogPayload::RawText(raw.to_string());
        }

        if let Some(entries) = value.get("entries").and_then(Value::as_object) {
            let mut lines = Vec::new();
            collect_descriptions(entries, 0, &mut lines);
            if !lines.is_empty() || entries.is_empty() {
                return LogPayload::Entries(lines);
            }
        }

        let preview: String = value.to_string().chars().take(PREVIEW_CHARS).collect();
        warn!("unrecognized log response shape");
        LogPayload::Unrecognized(preview)
    }

    /// Text handed back to the caller.
    pub fn render(&self) -> String {
        match self {
            LogPayload::RawText(raw) => raw.trim().to_string(),
            LogPayload::Entries(lines) if lines.is_empty() => {
                "No log entries in range.".to_string()
            }
            LogPayload::Entries(lines) => lines.join("\n"),
            LogPayload::Unrecognized(preview) => format!(
                "Unrecognized log response shape; first {PREVIEW_CHARS} characters:\n{preview}"
            ),
        }
    }
}

fn collect_descriptions(entries: &Map<String, Value>, depth: usize, out: &mut Vec<String>) {
    if depth >= MAX_DEPTH {
        return;
    }
    for entry in entries.values() {
        let Some(nested) = entry
            .pointer("/nestedStats/entries")
            .and_then(Value::as_object)
        else {
            continue;
        };
        match nested
            .get("description")
            .and_then(|d| d.get("description"))
            .and_then(Value::as_str)
        {
            Some(line) => out.push(line.to_string()),
            None => collect_descriptions(nested, depth + 1, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(text: &str) -> Value {
        json!({ "nestedStats": { "entries": { "description": { "description": text } } } })
    }

    #[test]
    fn raw_string_is_preferred() {
        let v = json!({
            "apiRawValues": { "apiAnonymous": "  Jun 1 a\nJun 1 b\n" },
            "entries": { "x": line("ignored") }
        });
        let payload = LogPayload::classify(Some(&v));
        assert_eq!(payload, LogPayload::RawText("  Jun 1 a\nJun 1 b\n".into()));
        assert_eq!(payload.render(), "Jun 1 a\nJun 1 b");
    }

    #[test]
    fn nested_entries_keep_device_order() {
        let v = json!({
            "entries": {
                "https://localhost/mgmt/tm/sys/log/ltm/stats": {
                    "nestedStats": { "entries": {
                        "https://localhost/.../10": line("first"),
                        "https://localhost/.../2": line("second"),
                        "https://localhost/.../3": line("third")
                    } }
                }
            }
        });
        let payload = LogPayload::classify(Some(&v));
        assert_eq!(
            payload,
            LogPayload::Entries(vec!["first".into(), "second".into(), "third".into()])
        );
        assert_eq!(payload.render(), "first\nsecond\nthird");
    }

    #[test]
    fn single_level_entries() {
        let v = json!({ "entries": { "0": line("only") } });
        assert_eq!(LogPayload::classify(Some(&v)).render(), "only");
    }

    #[test]
    fn empty_body_means_no_entries() {
        assert_eq!(LogPayload::classify(None).render(), "No log entries in range.");
        let v = json!({ "entries": {} });
        assert_eq!(LogPayload::classify(Some(&v)), LogPayload::Entries(vec![]));
    }

    #[test]
    fn unknown_shape_gives_bounded_preview() {
        let big = "x".repeat(2000);
        let v = json!({ "something": big });
        let payload = LogPayload::classify(Some(&v));
        match &payload {
            LogPayload::Unrecognized(p) => assert_eq!(p.chars().count(), PREVIEW_CHARS),
            other => panic!("expected Unrecognized, got {other:?}"),
        }
        assert!(payload.render().starts_with("Unrecognized log response shape"));
    }

    #[test]
    fn entries_without_descriptions_are_unrecognized() {
        let v = json!({ "entries": { "a": { "value": 1 } } });
        assert!(matches!(
            LogPayload::classify(Some(&v)),
            LogPayload::Unrecognized(_)
        ));
    }
}
