//! Tools that run a bounded command through the utility `bash` endpoint.

use serde_json::json;

use super::{ParamSpec, ToolArgs, ToolDefinition, ToolOp};
use crate::client::{ChannelContext, DeviceApi, DeviceRequest, Namespace};
use crate::command::{
    self, CaptureFilter, Interface, PolicyName, ShellCommand, TmshModule, CAPTURE_SECS_DEFAULT,
    CAPTURE_SECS_MAX, CAPTURE_SECS_MIN, PACKET_COUNT_DEFAULT, PACKET_COUNT_MAX, PACKET_COUNT_MIN,
};
use crate::error::ToolError;
use crate::shaper::{clean_config, truncate_tail};

const CAPTURE_BUDGET: usize = 20_000;
const CONFIG_BUDGET: usize = 30_000;

pub(super) fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "capturePackets",
            "Capture packets with tcpdump on the device. Bounded by packet count and duration.",
            ToolOp::CapturePackets,
            vec![
                ParamSpec::string("interface", "Interface name, e.g. 0.0, 1.1 or a VLAN")
                    .default(json!("0.0")),
                ParamSpec::integer("count", PACKET_COUNT_MIN, PACKET_COUNT_MAX, "Packets to capture")
                    .default(json!(PACKET_COUNT_DEFAULT)),
                ParamSpec::integer("duration", CAPTURE_SECS_MIN, CAPTURE_SECS_MAX, "Seconds to capture")
                    .default(json!(CAPTURE_SECS_DEFAULT)),
                ParamSpec::string(
                    "filter",
                    "tcpdump filter, e.g. 'host 10.0.0.5 and port 443' (words, and/or/not, parentheses)",
                ),
            ],
        ),
        ToolDefinition::new(
            "getRunningConfig",
            "Dump the running configuration of a module (tmsh list), with certificates, users \
             and secrets removed.",
            ToolOp::GetRunningConfig,
            vec![ParamSpec::string("module", "tmsh module path, e.g. ltm or net vlan")
                .default(json!("ltm"))],
        ),
        ToolDefinition::new(
            "exportAsmPolicy",
            "Export an application firewall policy as XML.",
            ToolOp::ExportAsmPolicy,
            vec![ParamSpec::string("policy_name", "Policy name").required()],
        ),
    ]
}

async fn run_bash(
    cmd: &ShellCommand,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let resp = device
        .send(
            ctx,
            DeviceRequest::post(Namespace::Utility, "/bash", cmd.util_body()),
        )
        .await?;
    Ok(command::command_output(resp.as_ref()))
}

pub(super) async fn capture_packets(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let interface = Interface::parse(args.str("interface")?)?;
    let filter = args
        .opt_str("filter")
        .filter(|f| !f.trim().is_empty())
        .map(CaptureFilter::parse)
        .transpose()?;
    let cmd = ShellCommand::packet_capture(
        &interface,
        args.int("count")?,
        args.int("duration")?,
        filter.as_ref(),
    )?;

    let output = run_bash(&cmd, ctx, device).await?;
    if output.trim().is_empty() {
        return Ok("Capture finished with no output.".to_string());
    }
    Ok(truncate_tail(output.trim_end(), CAPTURE_BUDGET))
}

pub(super) async fn running_config(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let module = TmshModule::parse(args.str("module")?)?;
    let output = run_bash(&ShellCommand::running_config(&module), ctx, device).await?;
    let cleaned = clean_config(&output);
    if cleaned.is_empty() {
        return Ok("No configuration returned.".to_string());
    }
    Ok(truncate_tail(&cleaned, CONFIG_BUDGET))
}

pub(super) async fn export_asm_policy(
    args: &ToolArgs,
    ctx: &ChannelContext,
    device: &dyn DeviceApi,
) -> Result<String, ToolError> {
    let policy = PolicyName::parse(args.str("policy_name")?)?;
    let output = run_bash(&ShellCommand::export_asm_policy(&policy), ctx, device).await?;
    if output.trim().is_empty() {
        return Ok(format!("Policy '{}' export returned no data.", policy.as_str()));
    }
    Ok(truncate_tail(output.trim(), CONFIG_BUDGET))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::testing::{args, Recorder};
    use super::super::ToolCatalog;
    use crate::client::{Method, Namespace};

    #[tokio::test]
    async fn capture_uses_defaults() {
        let device = Recorder::replying(vec![Ok(Some(json!({
            "command": "run",
            "commandResult": "10:00:00.1 IP 10.0.0.5.443 > 10.0.0.9.5000: Flags [S]\n"
        })))]);
        let out = ToolCatalog::new()
            .invoke("capturePackets", &args(json!({})), &device)
            .await
            .unwrap();
        assert!(out.first_text().contains("Flags [S]"));

        let calls = device.calls();
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].namespace, Namespace::Utility);
        assert_eq!(calls[0].path, "/bash");
        assert_eq!(
            calls[0].body,
            Some(json!({
                "command": "run",
                "utilCmdArgs": "-c 'timeout 10 tcpdump -nn -i 0.0 -c 100 2>&1'"
            }))
        );
    }

    #[tokio::test]
    async fn capture_rejects_injection_before_any_call() {
        let device = Recorder::default();
        for bad in [
            json!({ "filter": "port 80; reboot" }),
            json!({ "interface": "eth0 && id" }),
            json!({ "count": 5000 }),
            json!({ "duration": 0 }),
        ] {
            let err = ToolCatalog::new()
                .invoke("capturePackets", &args(bad.clone()), &device)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "validation", "{bad}");
        }
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn running_config_is_cleaned() {
        let dump = "auth user admin {\n    encrypted-password x\n}\nltm pool /Common/web1 {\n    monitor http\n}\n";
        let device = Recorder::replying(vec![Ok(Some(json!({ "commandResult": dump })))]);
        let out = ToolCatalog::new()
            .invoke("getRunningConfig", &args(json!({ "module": "ltm" })), &device)
            .await
            .unwrap();
        assert_eq!(out.first_text(), "ltm pool /Common/web1 {\n    monitor http\n}");
        let body = device.calls()[0].body.clone().unwrap();
        assert_eq!(body["utilCmdArgs"], "-c 'timeout 60 tmsh -q list ltm'");
    }

    #[tokio::test]
    async fn policy_export_validates_name() {
        let device = Recorder::default();
        let err = ToolCatalog::new()
            .invoke("exportAsmPolicy", &args(json!({ "policy_name": "x; rm -rf /" })), &device)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(device.calls().is_empty());
    }

    #[tokio::test]
    async fn policy_export_returns_xml() {
        let device = Recorder::replying(vec![Ok(Some(json!({ "commandResult": "<policy/>\n" })))]);
        let out = ToolCatalog::new()
            .invoke("exportAsmPolicy", &args(json!({ "policyName": "web" })), &device)
            .await
            .unwrap();
        assert_eq!(out.first_text(), "<policy/>");
    }
}
