//! Application firewall tools: policies and request events.

use std::net::IpAddr;

use serde_json::{json, Value};

use super::{ParamSpec, ToolArgs, ToolDefinition, ToolOp};
use crate::client::{ChannelContext, DeviceApi, DeviceRequest, Namespace};
use crate::error::ToolError;
use crate::identifiers::encode_component;
use crate::shaper::events;
use crate::shaper::stats::{self, render_table};
use crate::shaper::truncate_tail;

const NS: Namespace = Namespace::AppFirewall;

const EVENT_BUDGET: usize = 20_000;

const POLICY_FIELDS: &str = "name,fullPath,id,enforcementMode,active";
const EVENT_FIELDS: &str = "id,requestDatetime,clientIp,method,url,violations,\
                            violationRating,isRequestBlocked,enforcementState";

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "listAsmPolicies",
            "List application firewall policies with enforcement mode and active state.",
            ToolOp::ListAsmPolicies,
            vec![],
        ),
        ToolDefinition::new(
            "listSecurityEvents",
            "List recent application firewall request events, newest first.",
            ToolOp::ListSecurityEvents,
            vec![
                ParamSpec::integer("top", 1, 100, "Number of events").default(json!(20)),
                ParamSpec::string("client_ip", "Only events from this client address"),
                ParamSpec::boolean("blocked_only", "Only blocked requests").default(json!(false)),
            ],
        ),
        ToolDefinition::new(
            "getSecurityEventDetail",
            "Get the full record of one request event, including the raw request.",
            ToolOp::GetSecurityEventDetail,
            vec![ParamSpec::string("event_id", "Event (support) id").required()],
        ),
    ]
}

pub(super) async fn list_policies(
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let path = format!("/policies?$select={POLICY_FIELDS}");
    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;
    let rows = stats::policy_rows(resp.as_ref());
    if rows.is_empty() {
        return Ok("No application firewall policies.".to_string());
    }
    let cells: Vec<Vec<String>> = rows.iter().map(stats::PolicyRow::cells).collect();
    Ok(format!(
        "Policies ({}):\n{}",
        rows.len(),
        render_table(&["name", "id", "enforcement_mode", "active"], &cells)
    ))
}

/// OData `$filter` for the optional event filters, already encoded.
fn event_filter(client_ip: Option<IpAddr>, blocked_only: bool) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(ip) = client_ip {
        clauses.push(format!("clientIp eq '{ip}'"));
    }
    if blocked_only {
        clauses.push("isRequestBlocked eq true".to_string());
    }
    if clauses.is_empty() {
        None
    } else {
        Some(encode_component(&clauses.join(" and ")))
    }
}

pub(super) async fn list_events(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let top = args.int("top")?;
    let client_ip = match args.opt_str("client_ip").map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<IpAddr>().map_err(|_| {
            ToolError::validation(format!(
                "parameter 'client_ip' must be an IP address, got '{raw}'"
            ))
        })?),
        None => None,
    };

    let mut path = format!(
        "/events/requests?$orderby=time%20desc&$top={top}&$select={EVENT_FIELDS}"
    );
    if let Some(filter) = event_filter(client_ip, args.flag("blocked_only")) {
        path.push_str("&$filter=");
        path.push_str(&filter);
    }

    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;
    let summaries = events::summarize_all(resp.as_ref());
    if summaries.is_empty() {
        return Ok("No security events found.".to_string());
    }
    let body = serde_json::to_string_pretty(&summaries)
        .map_err(|e| ToolError::Internal(format!("serializing events: {e}")))?;
    Ok(truncate_tail(
        &format!("Security events ({}):\n{body}", summaries.len()),
        EVENT_BUDGET,
    ))
}

pub(super) async fn event_detail(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let id = args.str("event_id")?;
    let path = format!("/events/requests/{}", encode_component(id));
    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;
    let Some(item) = resp else {
        return Ok(format!("Event '{id}' returned no data."));
    };
    let detail = Value::Object(events::detail(&item));
    let body = serde_json::to_string_pretty(&detail)
        .map_err(|e| ToolError::Internal(format!("serializing event: {e}")))?;
    Ok(truncate_tail(&body, EVENT_BUDGET))
}
