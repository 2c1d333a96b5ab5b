//! Minimal MCP client session over newline-delimited JSON-RPC.

use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn server command '{command}': {reason}")]
    Spawn { command: String, reason: String },
    #[error("transport I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("server closed the stream before responding")]
    Closed,
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("server returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed server response: {0}")]
    Malformed(String),
}

/// One MCP client session: initialize, any number of requests, then [`McpSession::close`].
pub struct McpSession {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    child: Option<Child>,
    next_id: u64,
}

impl McpSession {
    pub fn new(
        reader: Box<dyn AsyncBufRead + Send + Unpin>,
        writer: Box<dyn AsyncWrite + Send + Unpin>,
        child: Option<Child>,
    ) -> Self {
        Self {
            reader,
            writer,
            child,
            next_id: 1,
        }
    }

    /// Performs the `initialize` handshake followed by `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<Value, SessionError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        self.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, SessionError> {
        self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        )
        .await
    }

    /// Sends a request and waits for the response with the matching id.
    ///
    /// Lines that are not JSON, notifications, and responses to other ids are skipped.
    pub async fn request(&mut self, method: &str, params: Value) -> Result<Value, SessionError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .await?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(SessionError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let Ok(message) = serde_json::from_str::<Value>(trimmed) else {
                tracing::debug!(line = trimmed, "skipping non-JSON server output");
                continue;
            };
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                return Err(SessionError::Rpc {
                    code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                    message: error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                });
            }
            return message
                .get("result")
                .cloned()
                .ok_or_else(|| SessionError::Malformed(format!("response {id} has no result")));
        }
    }

    pub async fn notify(&mut self, method: &str, params: Value) -> Result<(), SessionError> {
        self.send(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .await
    }

    async fn send(&mut self, message: &Value) -> Result<(), SessionError> {
        let mut encoded = serde_json::to_string(message)?;
        encoded.push('\n');
        self.writer.write_all(encoded.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Closes stdin and waits for the server to exit, killing it after a bounded wait.
    pub async fn close(self) {
        let Self {
            reader,
            mut writer,
            child,
            ..
        } = self;
        if let Err(err) = writer.shutdown().await {
            tracing::debug!(error = %err, "failed to close session writer");
        }
        drop(writer);
        drop(reader);

        let Some(mut child) = child else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "server process exited"),
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to wait for server process"),
            Err(_) => {
                tracing::warn!("server process did not exit in time; killing it");
                if let Err(err) = child.kill().await {
                    tracing::warn!(error = %err, "failed to kill server process");
                }
            }
        }
    }
}
