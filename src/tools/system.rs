//! System tools: time-ranged logs and read-only system views.

use super::params::check_timestamp;
use super::{ParamSpec, ToolArgs, ToolDefinition, ToolOp};
use crate::client::{ChannelContext, DeviceApi, DeviceRequest, Namespace};
use crate::error::ToolError;
use crate::identifiers;
use crate::shaper::{self, LogPayload};

const NS: Namespace = Namespace::System;

/// Budget for audit logs and the passthrough views.
pub const TEXT_BUDGET: usize = 20_000;

fn range_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::string("start_time", "Range start, e.g. 2024-06-01T10:00:00").required(),
        ParamSpec::string("end_time", "Range end, e.g. 2024-06-01T11:00:00").required(),
    ]
}

fn view_tool(
    name: &'static str,
    description: &'static str,
    path: &'static str,
    label: &'static str,
) -> ToolDefinition {
    ToolDefinition::new(name, description, ToolOp::SystemView { path, label }, vec![])
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "getLtmLogs",
            "Retrieve LTM logs within a time range.",
            ToolOp::Logs {
                source: "ltm",
                budget: None,
            },
            range_params(),
        ),
        ToolDefinition::new(
            "getAuditLogs",
            "Retrieve audit logs (configuration changes, logins) within a time range. \
             Long output keeps the most recent entries.",
            ToolOp::Logs {
                source: "audit",
                budget: Some(TEXT_BUDGET),
            },
            range_params(),
        ),
        ToolDefinition::new(
            "getSystemLogs",
            "Retrieve system logs within a time range.",
            ToolOp::Logs {
                source: "system",
                budget: None,
            },
            range_params(),
        ),
        view_tool("getCpuStat", "Get CPU statistics.", "/cpu", "CPU Stats"),
        view_tool("getTmmInfo", "Get TMM (traffic microkernel) info.", "/tmm-info", "TMM Info"),
        view_tool(
            "getConnection",
            "Get connection performance statistics.",
            "/performance/connections/stats",
            "Connection Info",
        ),
        view_tool(
            "getCertificateStat",
            "Get installed certificate information.",
            "/crypto/cert",
            "Certificate Info",
        ),
    ]
}

pub(super) async fn logs(
    source: &str,
    budget: Option<usize>,
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let start = args.str("start_time")?;
    let end = args.str("end_time")?;
    check_timestamp("start_time", start)?;
    check_timestamp("end_time", end)?;

    let path = format!(
        "/log/{source}/stats?{}",
        identifiers::log_range_query(start, end)
    );
    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;
    let text = LogPayload::classify(resp.as_ref()).render();
    Ok(match budget {
        Some(b) => shaper::truncate_tail(&text, b),
        None => text,
    })
}

pub(super) async fn view(
    path: &str,
    label: &str,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;
    let text = format!("{label}:\n{}", shaper::pretty_json(resp.as_ref()));
    Ok(shaper::truncate_tail(&text, TEXT_BUDGET))
}
