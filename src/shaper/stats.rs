//! Tabular summaries of stats and object collections.
//!
//! Stats endpoints return a tree keyed by self-link URLs:
//!
//! ```text
//! { "entries": { "<selfLink>": { "nestedStats": { "entries": {
//!     "addr": { "description": "10.0.0.5" },
//!     "port": { "value": 80 },
//!     "status.availabilityState": { "description": "available" } } } } } }
//! ```
//!
//! Collection endpoints return `{ "items": [ {...}, ... ] }`. Fields the
//! device leaves out show up as `-` rather than failing the whole table.

use serde_json::Value;

const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRow {
    pub address: String,
    pub port: String,
    pub status: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolRow {
    pub pool: String,
    pub availability: String,
    pub active_members: String,
    pub current_connections: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualRow {
    pub name: String,
    pub destination: String,
    pub pool: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRow {
    pub name: String,
    pub id: String,
    pub enforcement_mode: String,
    pub active: String,
}

/// The `nestedStats.entries` objects of a stats response, in device order.
fn stat_entries(response: Option<&Value>) -> Vec<&serde_json::Map<String, Value>> {
    response
        .and_then(|v| v.get("entries"))
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .values()
                .filter_map(|e| e.pointer("/nestedStats/entries").and_then(Value::as_object))
                .collect()
        })
        .unwrap_or_default()
}

fn items(response: Option<&Value>) -> &[Value] {
    response
        .and_then(|v| v.get("items"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// A stat leaf: `description` if present, else `value`.
fn stat_field(entries: &serde_json::Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| entries.get(*k))
        .find_map(|leaf| {
            leaf.get("description")
                .or_else(|| leaf.get("value"))
                .map(scalar_text)
        })
        .unwrap_or_else(|| MISSING.to_string())
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => MISSING.to_string(),
        other => other.to_string(),
    }
}

fn item_field(item: &Value, key: &str) -> String {
    item.get(key).map_or_else(|| MISSING.to_string(), scalar_text)
}

pub fn member_rows(response: Option<&Value>) -> Vec<MemberRow> {
    stat_entries(response)
        .into_iter()
        .map(|e| {
            let availability = stat_field(e, &["status.availabilityState"]);
            MemberRow {
                address: stat_field(e, &["addr", "address"]),
                port: stat_field(e, &["port"]),
                status: if availability.eq_ignore_ascii_case("available") {
                    "up"
                } else {
                    "down"
                },
            }
        })
        .collect()
}

pub fn pool_rows(response: Option<&Value>) -> Vec<PoolRow> {
    stat_entries(response)
        .into_iter()
        .map(|e| PoolRow {
            pool: stat_field(e, &["tmName", "name"]),
            availability: stat_field(e, &["status.availabilityState"]),
            active_members: stat_field(e, &["activeMemberCnt"]),
            current_connections: stat_field(e, &["serverside.curConns"]),
        })
        .collect()
}

pub fn virtual_rows(response: Option<&Value>) -> Vec<VirtualRow> {
    items(response)
        .iter()
        .map(|item| VirtualRow {
            name: item
                .get("fullPath")
                .map_or_else(|| item_field(item, "name"), scalar_text),
            destination: item_field(item, "destination"),
            pool: item_field(item, "pool"),
            // The device sets exactly one of `enabled: true` / `disabled: true`.
            enabled: item.get("disabled").and_then(Value::as_bool) != Some(true),
        })
        .collect()
}

pub fn policy_rows(response: Option<&Value>) -> Vec<PolicyRow> {
    items(response)
        .iter()
        .map(|item| PolicyRow {
            name: item
                .get("fullPath")
                .map_or_else(|| item_field(item, "name"), scalar_text),
            id: item_field(item, "id"),
            enforcement_mode: item_field(item, "enforcementMode"),
            active: item_field(item, "active"),
        })
        .collect()
}

/// Render rows as a left-aligned, space-padded table with a header line.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, &w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}

impl MemberRow {
    pub fn cells(&self) -> Vec<String> {
        vec![self.address.clone(), self.port.clone(), self.status.to_string()]
    }
}

impl PoolRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.pool.clone(),
            self.availability.clone(),
            self.active_members.clone(),
            self.current_connections.clone(),
        ]
    }
}

impl VirtualRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.destination.clone(),
            self.pool.clone(),
            if self.enabled { "yes" } else { "no" }.to_string(),
        ]
    }
}

impl PolicyRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.id.clone(),
            self.enforcement_mode.clone(),
            self.active.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(addr: &str, port: u16, state: &str) -> Value {
        json!({ "nestedStats": { "entries": {
            "addr": { "description": addr },
            "port": { "value": port },
            "status.availabilityState": { "description": state }
        } } })
    }

    #[test]
    fn member_status_is_up_only_when_available() {
        let v = json!({ "entries": {
            "https://localhost/a": member("10.0.0.5", 80, "available"),
            "https://localhost/b": member("10.0.0.6", 80, "offline"),
            "https://localhost/c": member("10.0.0.7", 80, "unknown")
        } });
        let rows = member_rows(Some(&v));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].address, "10.0.0.5");
        assert_eq!(rows[0].port, "80");
        assert_eq!(rows[0].status, "up");
        assert_eq!(rows[1].status, "down");
        assert_eq!(rows[2].status, "down");
    }

    #[test]
    fn missing_fields_degrade() {
        let v = json!({ "entries": { "x": { "nestedStats": { "entries": {} } } } });
        let rows = member_rows(Some(&v));
        assert_eq!(rows[0].address, "-");
        assert_eq!(rows[0].status, "down");
        assert!(member_rows(None).is_empty());
        assert!(member_rows(Some(&json!("garbage"))).is_empty());
    }

    #[test]
    fn pool_rows_from_stats() {
        let v = json!({ "entries": { "https://localhost/mgmt/tm/ltm/pool/~Common~web1/stats": {
            "nestedStats": { "entries": {
                "tmName": { "description": "/Common/web1" },
                "status.availabilityState": { "description": "available" },
                "activeMemberCnt": { "value": 2 },
                "serverside.curConns": { "value": 17 }
            } }
        } } });
        let rows = pool_rows(Some(&v));
        assert_eq!(
            rows,
            vec![PoolRow {
                pool: "/Common/web1".into(),
                availability: "available".into(),
                active_members: "2".into(),
                current_connections: "17".into(),
            }]
        );
    }

    #[test]
    fn virtual_rows_from_items() {
        let v = json!({ "items": [
            { "name": "vs1", "fullPath": "/Common/vs1", "destination": "/Common/10.0.0.1:443",
              "pool": "/Common/web1", "enabled": true },
            { "name": "vs2", "destination": "/Common/10.0.0.2:80", "disabled": true }
        ] });
        let rows = virtual_rows(Some(&v));
        assert_eq!(rows[0].name, "/Common/vs1");
        assert!(rows[0].enabled);
        assert_eq!(rows[1].name, "vs2");
        assert_eq!(rows[1].pool, "-");
        assert!(!rows[1].enabled);
    }

    #[test]
    fn policy_rows_from_items() {
        let v = json!({ "items": [
            { "name": "p1", "fullPath": "/Common/p1", "id": "abc", "enforcementMode": "blocking", "active": true }
        ] });
        let rows = policy_rows(Some(&v));
        assert_eq!(rows[0].cells(), vec!["/Common/p1", "abc", "blocking", "true"]);
    }

    #[test]
    fn table_is_aligned() {
        let out = render_table(
            &["address", "port", "status"],
            &[
                vec!["10.0.0.5".into(), "80".into(), "up".into()],
                vec!["10.0.0.16".into(), "8080".into(), "down".into()],
            ],
        );
        assert_eq!(
            out,
            "address    port  status\n10.0.0.5   80    up\n10.0.0.16  8080  down"
        );
    }
}
