//! Local traffic tools: pools, members, virtual servers, iRules.

use std::net::IpAddr;

use serde_json::{json, Value};

use super::{ParamSpec, ToolArgs, ToolDefinition, ToolOp};
use crate::client::{ChannelContext, DeviceApi, DeviceRequest, Namespace};
use crate::error::ToolError;
use crate::identifiers::{self, DEFAULT_PARTITION};
use crate::shaper::stats::{self, render_table};

const NS: Namespace = Namespace::TrafficMgmt;

fn partition_param() -> ParamSpec {
    ParamSpec::string("partition", "Administrative partition").default(json!(DEFAULT_PARTITION))
}

fn port_param(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec::integer(name, 1, 65535, description).required()
}

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "configurePool",
            "Create a new pool with members. Members are added one by one after the pool; \
             if one fails, the remaining ones are not added and the pool is left as is.",
            ToolOp::ConfigurePool,
            vec![
                ParamSpec::string("pool_name", "Name of the pool").required(),
                ParamSpec::objects(
                    "members",
                    vec![
                        ParamSpec::string("address", "Member IP address").required(),
                        port_param("port", "Member service port"),
                    ],
                    "Pool members",
                )
                .required(),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "listAllPoolStat",
            "List all pools with availability, active members and current connections.",
            ToolOp::ListAllPoolStat,
            vec![],
        ),
        ToolDefinition::new(
            "removeMember",
            "Remove a member from a pool.",
            ToolOp::RemoveMember,
            vec![
                ParamSpec::string("pool_name", "Name of the pool").required(),
                ParamSpec::string("member_address", "Member IP address").required(),
                port_param("member_port", "Member service port"),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "deletePool",
            "Delete an entire pool.",
            ToolOp::DeletePool,
            vec![
                ParamSpec::string("pool_name", "Name of the pool").required(),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "createVirtualServer",
            "Create a virtual server (host mask, single protocol profile) and optionally bind it to a pool.",
            ToolOp::CreateVirtualServer,
            vec![
                ParamSpec::string("virtual_name", "Name of the virtual server").required(),
                ParamSpec::string("ip", "Destination IP address").required(),
                port_param("port", "Destination port"),
                ParamSpec::string("pool_name", "Default pool to attach"),
                ParamSpec::string("mask", "Destination mask").default(json!("255.255.255.255")),
                ParamSpec::one_of("protocol", &["tcp", "udp", "sctp"], "IP protocol and profile")
                    .default(json!("tcp")),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "deleteVirtualServer",
            "Delete a virtual server.",
            ToolOp::DeleteVirtualServer,
            vec![
                ParamSpec::string("virtual_name", "Name of the virtual server").required(),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "listAllVirtual",
            "List all virtual servers with destination, pool and enabled state.",
            ToolOp::ListAllVirtual,
            vec![],
        ),
        ToolDefinition::new(
            "getPoolMemberStatus",
            "Get address, port and up/down status of every member in a pool.",
            ToolOp::GetPoolMemberStatus,
            vec![
                ParamSpec::string("pool_name", "Name of the pool").required(),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "updateMemberStat",
            "Enable or disable a pool member.",
            ToolOp::UpdateMemberStat,
            vec![
                ParamSpec::string("pool_name", "Name of the pool").required(),
                ParamSpec::string("member_address", "Member IP address").required(),
                port_param("member_port", "Member service port"),
                ParamSpec::one_of("action", &["enable", "disable"], "New member state").required(),
                partition_param(),
            ],
        ),
        ToolDefinition::new(
            "addIrules",
            "Upload an iRule to the device.",
            ToolOp::AddIrules,
            vec![
                ParamSpec::string("irule_name", "Name of the iRule").required(),
                ParamSpec::string("irule_code", "TCL source of the iRule").required(),
                partition_param(),
            ],
        ),
    ]
}

pub(super) async fn configure_pool(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let pool = args.str("pool_name")?;
    let partition = args.str("partition")?;
    let members = args.objects("members");

    // Resolve every member before the first call so a bad port can't leave
    // a half-built pool behind.
    let mut resolved = Vec::with_capacity(members.len());
    for m in &members {
        resolved.push((m.str("address")?.to_string(), m.port("port")?));
    }

    device
        .send(
            ctx,
            DeviceRequest::post(NS, "/pool", json!({ "name": pool, "partition": partition })),
        )
        .await?;

    // Sequential and non-transactional: a failed add aborts the rest and
    // leaves the pool partially populated.
    let members_path = identifiers::pool_members_path(partition, pool);
    for (address, port) in &resolved {
        let body = json!({
            "partition": partition,
            "name": format!("{address}:{port}"),
            "address": address,
        });
        device
            .send(ctx, DeviceRequest::post(NS, members_path.clone(), body))
            .await?;
    }

    Ok(format!(
        "OK Pool '{pool}' created with {} members.",
        resolved.len()
    ))
}

pub(super) async fn remove_member(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let pool = args.str("pool_name")?;
    let address = args.str("member_address")?;
    let port = args.port("member_port")?;
    let partition = args.str("partition")?;

    let path = identifiers::member_path(partition, pool, address, port);
    device.send(ctx, DeviceRequest::delete(NS, path)).await?;
    Ok(format!(
        "OK Removed member {address}:{port} from pool '{pool}'."
    ))
}

pub(super) async fn delete_pool(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let pool = args.str("pool_name")?;
    let partition = args.str("partition")?;
    device
        .send(ctx, DeviceRequest::delete(NS, identifiers::pool_path(partition, pool)))
        .await?;
    Ok(format!("OK Pool '{pool}' deleted."))
}

/// `addr:port` for IPv4, `addr.port` for IPv6 (the device's convention).
fn destination(ip: IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{v4}:{port}"),
        IpAddr::V6(v6) => format!("{v6}.{port}"),
    }
}

pub(super) async fn create_virtual_server(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let name = args.str("virtual_name")?;
    let ip_raw = args.str("ip")?;
    let ip: IpAddr = ip_raw.parse().map_err(|_| {
        ToolError::validation(format!("parameter 'ip' must be an IP address, got '{ip_raw}'"))
    })?;
    let port = args.port("port")?;
    let protocol = args.str("protocol")?;

    let mut body = json!({
        "name": name,
        "partition": args.str("partition")?,
        "destination": destination(ip, port),
        "mask": args.str("mask")?,
        "ipProtocol": protocol,
        "profiles": [{ "name": protocol }],
    });
    if let Some(pool) = args.opt_str("pool_name").filter(|p| !p.is_empty()) {
        body["pool"] = Value::String(pool.to_string());
    }

    device
        .send(ctx, DeviceRequest::post(NS, "/virtual", body))
        .await?;
    Ok(format!("OK Virtual Server '{name}' created."))
}

pub(super) async fn delete_virtual_server(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let name = args.str("virtual_name")?;
    let partition = args.str("partition")?;
    device
        .send(ctx, DeviceRequest::delete(NS, identifiers::virtual_path(partition, name)))
        .await?;
    Ok(format!("OK Virtual Server '{name}' deleted."))
}

pub(super) async fn list_all_virtual(
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let resp = device.send(ctx, DeviceRequest::get(NS, "/virtual")).await?;
    let rows = stats::virtual_rows(resp.as_ref());
    if rows.is_empty() {
        return Ok("No virtual servers configured.".to_string());
    }
    let cells: Vec<Vec<String>> = rows.iter().map(stats::VirtualRow::cells).collect();
    Ok(format!(
        "Virtual servers ({}):\n{}",
        rows.len(),
        render_table(&["name", "destination", "pool", "enabled"], &cells)
    ))
}

pub(super) async fn pool_member_status(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let pool = args.str("pool_name")?;
    let partition = args.str("partition")?;
    let path = format!("{}/stats", identifiers::pool_members_path(partition, pool));
    let resp = device.send(ctx, DeviceRequest::get(NS, path)).await?;

    let rows = stats::member_rows(resp.as_ref());
    if rows.is_empty() {
        return Ok(format!("Pool '{pool}' has no members."));
    }
    let up = rows.iter().filter(|r| r.status == "up").count();
    let cells: Vec<Vec<String>> = rows.iter().map(stats::MemberRow::cells).collect();
    Ok(format!(
        "Pool '{pool}' members ({up}/{} up):\n{}",
        rows.len(),
        render_table(&["address", "port", "status"], &cells)
    ))
}

pub(super) async fn list_all_pool_stat(
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let resp = device.send(ctx, DeviceRequest::get(NS, "/pool/stats")).await?;
    let rows = stats::pool_rows(resp.as_ref());
    if rows.is_empty() {
        return Ok("No pools configured.".to_string());
    }
    let cells: Vec<Vec<String>> = rows.iter().map(stats::PoolRow::cells).collect();
    Ok(format!(
        "Pools ({}):\n{}",
        rows.len(),
        render_table(
            &["pool", "availability", "active_members", "current_connections"],
            &cells
        )
    ))
}

pub(super) async fn update_member_stat(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let pool = args.str("pool_name")?;
    let address = args.str("member_address")?;
    let port = args.port("member_port")?;
    let partition = args.str("partition")?;
    let enable = args.str("action")? == "enable";

    let body = if enable {
        json!({ "state": "user-up", "session": "user-enabled" })
    } else {
        json!({ "session": "user-disabled" })
    };
    let path = identifiers::member_path(partition, pool, address, port);
    device.send(ctx, DeviceRequest::patch(NS, path, body)).await?;

    let verb = if enable { "enabled" } else { "disabled" };
    Ok(format!("OK, member {address}:{port} {verb}."))
}

pub(super) async fn add_irule(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let name = args.str("irule_name")?;
    let body = json!({
        "name": name,
        "partition": args.str("partition")?,
        "apiAnonymous": args.str("irule_code")?,
    });
    device.send(ctx, DeviceRequest::post(NS, "/rule", body)).await?;
    Ok(format!("OK iRule '{name}' created."))
}
