//! Tool catalog and dispatch.
//!
//! Every tool is a [`ToolDefinition`]: a name, a description, an ordered list
//! of [`ParamSpec`]s and a [`ToolOp`]. The catalog is built once at startup
//! and shared read-only by every surface.
//!
//! ## Tool groups
//!
//! **Traffic management** ([`ltm`]): pools, members, virtual servers, iRules.
//!
//! **System** ([`system`]): time-ranged logs and read-only system views.
//!
//! **Shell-mediated** ([`shell`]): packet capture, running config, policy
//! export via the utility `bash` endpoint.
//!
//! **Application firewall** ([`asm`]): policies and request events.
//!
//! Every tool takes `f5_url`, `f5_username` and `f5_password`; there is no
//! ambient device configuration.

pub mod asm;
pub mod ltm;
pub mod params;
pub mod shell;
pub mod system;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{ChannelContext, DeviceApi};
use crate::error::ToolError;

pub use params::{ParamKind, ParamSpec, ToolArgs};

/// What a tool does once its arguments are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOp {
    ConfigurePool,
    RemoveMember,
    DeletePool,
    CreateVirtualServer,
    DeleteVirtualServer,
    ListAllVirtual,
    GetPoolMemberStatus,
    ListAllPoolStat,
    UpdateMemberStat,
    AddIrules,
    /// Time-ranged log retrieval from `/sys/log/{source}/stats`.
    Logs {
        source: &'static str,
        budget: Option<usize>,
    },
    /// Read-only `GET` of a system path, pretty-printed under `label`.
    SystemView {
        path: &'static str,
        label: &'static str,
    },
    CapturePackets,
    GetRunningConfig,
    ExportAsmPolicy,
    ListAsmPolicies,
    ListSecurityEvents,
    GetSecurityEventDetail,
}

impl ToolOp {
    async fn run(
        self,
        args: &ToolArgs,
        ctx: &ChannelContext,
        device: &dyn DeviceApi,
    ) -> Result<String, ToolError> {
        match self {
            ToolOp::ConfigurePool => ltm::configure_pool(args, ctx, device).await,
            ToolOp::RemoveMember => ltm::remove_member(args, ctx, device).await,
            ToolOp::DeletePool => ltm::delete_pool(args, ctx, device).await,
            ToolOp::CreateVirtualServer => ltm::create_virtual_server(args, ctx, device).await,
            ToolOp::DeleteVirtualServer => ltm::delete_virtual_server(args, ctx, device).await,
            ToolOp::ListAllVirtual => ltm::list_all_virtual(ctx, device).await,
            ToolOp::GetPoolMemberStatus => ltm::pool_member_status(args, ctx, device).await,
            ToolOp::ListAllPoolStat => ltm::list_all_pool_stat(ctx, device).await,
            ToolOp::UpdateMemberStat => ltm::update_member_stat(args, ctx, device).await,
            ToolOp::AddIrules => ltm::add_irule(args, ctx, device).await,
            ToolOp::Logs { source, budget } => {
                system::logs(source, budget, args, ctx, device).await
            }
            ToolOp::SystemView { path, label } => system::view(path, label, ctx, device).await,
            ToolOp::CapturePackets => shell::capture_packets(args, ctx, device).await,
            ToolOp::GetRunningConfig => shell::running_config(args, ctx, device).await,
            ToolOp::ExportAsmPolicy => shell::export_asm_policy(args, ctx, device).await,
            ToolOp::ListAsmPolicies => asm::list_policies(ctx, device).await,
            ToolOp::ListSecurityEvents => asm::list_events(args, ctx, device).await,
            ToolOp::GetSecurityEventDetail => asm::event_detail(args, ctx, device).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub op: ToolOp,
}

impl ToolDefinition {
    /// A tool taking the device credentials followed by `params`.
    pub fn new(
        name: &'static str,
        description: &'static str,
        op: ToolOp,
        params: Vec<ParamSpec>,
    ) -> Self {
        let mut all = credential_params();
        all.extend(params);
        Self {
            name,
            description,
            params: all,
            op,
        }
    }

    /// `{name, description, inputSchema}` as advertised by `tools/list`.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": params::object_schema(&self.params),
        })
    }
}

fn credential_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::string("f5_url", "Management URL of the BIG-IP, e.g. https://10.1.1.245")
            .required(),
        ParamSpec::string("f5_username", "iControl REST username").required(),
        ParamSpec::string("f5_password", "iControl REST password").required(),
    ]
}

/// One MCP content block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Successful tool output. Failures travel as [`ToolError`] instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub content: Vec<Content>,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content {
                kind: "text",
                text: text.into(),
            }],
        }
    }

    /// Text of the first block.
    pub fn first_text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }

    pub fn to_json(&self) -> Value {
        json!({ "content": self.content })
    }
}

/// Ordered, immutable registry of tools.
#[derive(Debug)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        let mut tools = ltm::definitions();
        tools.extend(system::definitions());
        tools.extend(shell::definitions());
        tools.extend(asm::definitions());
        Self { tools }
    }

    /// Definitions in registration order.
    pub fn list_tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn definitions_json(&self) -> Vec<Value> {
        self.tools.iter().map(ToolDefinition::to_json).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Resolve, validate and run a tool. Nothing reaches `device` unless the
    /// name is known and the arguments pass validation.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        device: &dyn DeviceApi,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args = params::validate(&tool.params, arguments)?;
        let ctx = args.channel()?;
        debug!(tool = name, device = ctx.base_url(), "invoking tool");
        let text = tool.op.run(&args, &ctx, device).await?;
        Ok(ToolResult::text(text))
    }
}
