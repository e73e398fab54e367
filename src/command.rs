//! Remote shell commands for the utility `bash` endpoint.
//!
//! Commands are composed only from validated fields. Each field type below
//! has a `parse` constructor enforcing a grammar that excludes quotes, `$`,
//! backticks, `;`, `|`, `&` and redirections, so nothing a caller sends can
//! leave its slot in the command line. Every command is bounded by a
//! `timeout` wrapper.

use serde_json::{json, Value};

use crate::error::ToolError;

pub const PACKET_COUNT_MIN: i64 = 1;
pub const PACKET_COUNT_MAX: i64 = 1000;
pub const PACKET_COUNT_DEFAULT: i64 = 100;

pub const CAPTURE_SECS_MIN: i64 = 1;
pub const CAPTURE_SECS_MAX: i64 = 60;
pub const CAPTURE_SECS_DEFAULT: i64 = 10;

const INTERFACE_MAX: usize = 32;
const FILTER_MAX: usize = 256;
const MODULE_WORDS_MAX: usize = 4;
const POLICY_NAME_MAX: usize = 64;

/// Upper bound for tmsh invocations (config listing, policy export).
const TMSH_TIMEOUT_SECS: u32 = 60;

/// A capture interface: `[A-Za-z0-9._:/-]{1,32}`, e.g. `0.0`, `any`, `1.1`,
/// `/Common/external`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface(String);

impl Interface {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let ok = !raw.is_empty()
            && raw.len() <= INTERFACE_MAX
            && !raw.starts_with('-')
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-'));
        if ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(ToolError::validation(format!(
                "parameter 'interface' must be 1-{INTERFACE_MAX} characters of [A-Za-z0-9._:/-], got '{raw}'"
            )))
        }
    }
}

/// A tcpdump filter expression restricted to words of `[A-Za-z0-9.:/-]`,
/// the operators `and`, `or`, `not`, and balanced parentheses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFilter(String);

impl CaptureFilter {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let reject = |why: &str| {
            Err(ToolError::validation(format!(
                "parameter 'filter' rejected: {why}"
            )))
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return reject("empty expression");
        }
        if trimmed.chars().count() > FILTER_MAX {
            return reject("longer than 256 characters");
        }

        let mut depth = 0i32;
        for c in trimmed.chars() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return reject("unbalanced parentheses");
                    }
                }
                c if c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '/' | '-') => {}
                ' ' | '\t' => {}
                other => return reject(&format!("character '{other}' is not allowed")),
            }
        }
        if depth != 0 {
            return reject("unbalanced parentheses");
        }

        let spaced = trimmed.replace('(', " ( ").replace(')', " ) ");
        let words: Vec<&str> = spaced.split_whitespace().collect();
        if words.iter().any(|w| w.starts_with('-')) {
            return reject("words may not start with '-'");
        }

        Ok(Self(words.join(" ").replace("( ", "(").replace(" )", ")")))
    }
}

/// A `tmsh list` module path: 1-4 words of `[a-z0-9-]+`, e.g. `ltm` or
/// `net vlan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmshModule(String);

impl TmshModule {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        let ok = (1..=MODULE_WORDS_MAX).contains(&words.len())
            && words.iter().all(|w| {
                !w.starts_with('-')
                    && w.chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            });
        if ok {
            Ok(Self(words.join(" ")))
        } else {
            Err(ToolError::validation(format!(
                "parameter 'module' must be 1-{MODULE_WORDS_MAX} lowercase words of [a-z0-9-], got '{raw}'"
            )))
        }
    }
}

/// An application-firewall policy name: `[A-Za-z0-9_.-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyName(String);

impl PolicyName {
    pub fn parse(raw: &str) -> Result<Self, ToolError> {
        let ok = !raw.is_empty()
            && raw.len() <= POLICY_NAME_MAX
            && !raw.starts_with(['-', '.'])
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(ToolError::validation(format!(
                "parameter 'policy_name' must be 1-{POLICY_NAME_MAX} characters of [A-Za-z0-9_.-], got '{raw}'"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_range(name: &str, value: i64, min: i64, max: i64) -> Result<u32, ToolError> {
    if (min..=max).contains(&value) {
        // min >= 1 and max <= 1000 for every caller
        Ok(value as u32)
    } else {
        Err(ToolError::validation(format!(
            "parameter '{name}' must be between {min} and {max}, got {value}"
        )))
    }
}

/// A composed command line, ready for `bash -c '...'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand(String);

impl ShellCommand {
    /// `timeout {secs} tcpdump -nn -i {iface} -c {count} ["{filter}"]`
    pub fn packet_capture(
        interface: &Interface,
        count: i64,
        secs: i64,
        filter: Option<&CaptureFilter>,
    ) -> Result<Self, ToolError> {
        let count = check_range("count", count, PACKET_COUNT_MIN, PACKET_COUNT_MAX)?;
        let secs = check_range("duration", secs, CAPTURE_SECS_MIN, CAPTURE_SECS_MAX)?;
        let mut cmd = format!("timeout {secs} tcpdump -nn -i {} -c {count}", interface.0);
        if let Some(f) = filter {
            cmd.push_str(&format!(" \"{}\"", f.0));
        }
        // tcpdump reports its summary on stderr
        cmd.push_str(" 2>&1");
        Ok(Self(cmd))
    }

    /// `timeout 60 tmsh -q list {module}`
    pub fn running_config(module: &TmshModule) -> Self {
        Self(format!("timeout {TMSH_TIMEOUT_SECS} tmsh -q list {}", module.0))
    }

    /// Save the policy as XML under `/var/tmp`, print it, remove the file.
    pub fn export_asm_policy(policy: &PolicyName) -> Self {
        let file = format!("/var/tmp/f5-mcp-{}.xml", policy.0);
        Self(format!(
            "timeout {TMSH_TIMEOUT_SECS} tmsh save asm policy {} xml-file {file} && cat {file}; rm -f {file}",
            policy.0
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Body for `POST /mgmt/tm/util/bash`.
    pub fn util_body(&self) -> Value {
        json!({
            "command": "run",
            "utilCmdArgs": format!("-c '{}'", self.0),
        })
    }
}

/// Captured stdout of a utility `bash` run (`commandResult`), or empty.
pub fn command_output(response: Option<&Value>) -> String {
    response
        .and_then(|v| v.get("commandResult"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
