//! stdio transport: JSON-RPC 2.0 requests on stdin, one per line; replies on
//! stdout, one per line.
//!
//! Each line is handled in its own task, so a slow device call doesn't hold
//! up a `ping`. Replies go through one writer task and therefore never
//! interleave; their order follows completion, not arrival.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::mcp::{Dispatcher, StdioSurface};

/// Serve stdin/stdout until EOF.
pub async fn run_stdio(dispatcher: Dispatcher, surface: StdioSurface) {
    let reader = BufReader::new(tokio::io::stdin());
    serve_lines(dispatcher, surface, reader, tokio::io::stdout()).await;
}

/// Serve line-delimited JSON-RPC from `reader` to `writer` until EOF, then
/// wait for in-flight requests to finish.
pub async fn serve_lines<R, W>(dispatcher: Dispatcher, surface: StdioSurface, reader: R, writer: W)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(64);
    let writer_task = tokio::spawn(write_replies(rx, writer));

    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) => {
                error!("stdin read error: {e}");
                break;
            }
        };

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Some(reply) = dispatcher.serve(&surface, &line).await {
                // The writer only goes away after every sender is dropped
                let _ = tx.send(reply).await;
            }
        });
    }

    drop(tx);
    if let Err(e) = writer_task.await {
        error!("stdout writer task failed: {e}");
    }
    debug!("stdin closed");
}

async fn write_replies<W>(mut rx: mpsc::Receiver<String>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        if let Err(e) = writer.write_all(reply.as_bytes()).await {
            error!("stdout write error: {e}");
            return;
        }
        if let Err(e) = writer.flush().await {
            error!("stdout flush error: {e}");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::client::{ChannelContext, DeviceApi, DeviceRequest};
    use crate::config::ToolListing;
    use crate::error::ToolError;
    use crate::tools::ToolCatalog;

    struct Accepting;

    #[async_trait]
    impl DeviceApi for Accepting {
        async fn send(
            &self,
            _ctx: &ChannelContext,
            _request: DeviceRequest,
        ) -> Result<Option<Value>, ToolError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn one_reply_per_request_and_none_for_notifications() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            "\n",
            "garbage\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#, "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#, "\n",
        );
        let (client, server) = tokio::io::duplex(1 << 20);
        let dispatcher = Dispatcher::new(Arc::new(ToolCatalog::new()), Arc::new(Accepting));
        let surface = StdioSurface {
            listing: ToolListing::Names,
        };

        serve_lines(dispatcher, surface, input.as_bytes(), server).await;

        let mut output = String::new();
        let mut reader = BufReader::new(client);
        loop {
            let mut line = String::new();
            let n = tokio::time::timeout(
                std::time::Duration::from_secs(5),
                reader.read_line(&mut line),
            )
            .await
            .unwrap()
            .unwrap();
            if n == 0 {
                break;
            }
            output.push_str(&line);
        }

        let replies: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 4);

        let mut ids: Vec<String> = replies.iter().map(|r| r["id"].to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "null"]);

        let parse_err = replies.iter().find(|r| r["id"].is_null()).unwrap();
        assert_eq!(parse_err["error"]["code"], -32700);
        let list = replies.iter().find(|r| r["id"] == 2).unwrap();
        assert!(list["result"]["tools"][0].is_string());
    }
}
