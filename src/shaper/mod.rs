//! Response shaping: pure transforms from raw device payloads to compact text.
//!
//! Nothing in here returns an error or panics on malformed input. A shape we
//! don't recognize degrades to partial output or a bounded diagnostic
//! preview, because an LLM reading the result copes with imperfect data far
//! better than with a dropped response.
//!
//! - [`logs`] - log extraction from the two response shapes the device uses
//! - [`config_dump`] - balanced-brace cleanup of `tmsh list` output
//! - [`stats`] - tabular summaries of stats and object collections
//! - [`events`] - flattening of application-firewall request events

pub mod config_dump;
pub mod events;
pub mod logs;
pub mod stats;

pub use config_dump::{clean_config, remove_block};
pub use logs::LogPayload;

/// Keep at most `budget` characters of `text`, dropping from the front.
///
/// Short input is returned unchanged. Longer input keeps its last `budget`
/// characters behind a one-line marker, so the most recent log lines
/// survive.
pub fn truncate_tail(text: &str, budget: usize) -> String {
    let total = text.chars().count();
    if total <= budget {
        return text.to_string();
    }
    let skip = total - budget;
    let start = text
        .char_indices()
        .nth(skip)
        .map_or(text.len(), |(idx, _)| idx);
    format!(
        "[truncated: showing last {budget} of {total} characters]\n{}",
        &text[start..]
    )
}

/// Pretty-print a JSON payload for a passthrough tool, or a placeholder when
/// the device sent nothing.
pub fn pretty_json(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        None => "(empty response)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_unchanged() {
        assert_eq!(truncate_tail("abc", 3), "abc");
        assert_eq!(truncate_tail("", 0), "");
        assert_eq!(truncate_tail("line\n", 100), "line\n");
    }

    #[test]
    fn long_input_keeps_tail() {
        let s = "0123456789";
        let out = truncate_tail(s, 4);
        assert!(out.ends_with("6789"));
        assert!(out.starts_with("[truncated: showing last 4 of 10 characters]\n"));
        let tail: String = out.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        assert_eq!(tail, "6789");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let out = truncate_tail("ααββγγ", 2);
        assert!(out.ends_with("γγ"));
    }

    #[test]
    fn pretty_json_placeholder() {
        assert_eq!(pretty_json(None), "(empty response)");
        assert_eq!(pretty_json(Some(&serde_json::json!({"a": 1}))), "{\n  \"a\": 1\n}");
    }
}
