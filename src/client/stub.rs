//! In-memory MCP server for exercising the subprocess strategy without spawning processes.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

use super::session::{McpSession, PROTOCOL_VERSION, SessionError};
use super::subprocess::SessionLauncher;

pub(crate) enum StubReply {
    /// Raw `tools/call` result object.
    Result(Value),
    RpcError(i64, &'static str),
}

pub(crate) type Responder = fn(&str, &Value) -> StubReply;

/// Wraps a response document the way the MCP server does: one text block holding its JSON.
pub(crate) fn text_result(document: Value) -> StubReply {
    StubReply::Result(json!({
        "content": [{ "type": "text", "text": document.to_string() }],
        "isError": false,
    }))
}

#[derive(Clone)]
pub(crate) struct StubLauncher {
    responder: Responder,
    fail_handshake: bool,
    launches: Arc<AtomicUsize>,
}

impl StubLauncher {
    pub(crate) fn new(responder: Responder) -> Self {
        Self {
            responder,
            fail_handshake: false,
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing_handshake() -> Self {
        Self {
            fail_handshake: true,
            ..Self::new(|_, _| StubReply::RpcError(-32603, "unreachable"))
        }
    }

    pub(crate) fn launches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.launches)
    }
}

#[async_trait]
impl SessionLauncher for StubLauncher {
    async fn launch(&self) -> Result<McpSession, SessionError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve(server, self.responder, self.fail_handshake));
        let (read, write) = tokio::io::split(client);
        Ok(McpSession::new(
            Box::new(BufReader::new(read)),
            Box::new(write),
            None,
        ))
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}

async fn serve(stream: DuplexStream, responder: Responder, fail_handshake: bool) {
    let (read, mut write) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        let Some(id) = message.get("id").cloned() else {
            continue;
        };
        let method = message.get("method").and_then(Value::as_str).unwrap_or("");

        let reply = match method {
            "initialize" if fail_handshake => rpc_error(id, -32600, "unsupported client"),
            "initialize" => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": "stub", "version": "0.0.0" },
                },
            }),
            "tools/call" => {
                let name = message["params"]["name"].as_str().unwrap_or("");
                match responder(name, &message["params"]["arguments"]) {
                    StubReply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                    StubReply::RpcError(code, text) => rpc_error(id, code, text),
                }
            }
            _ => rpc_error(id, -32601, "method not found"),
        };

        // Interleaved noise the client must skip.
        let noise = format!(
            "stub log line\n{}\n",
            json!({ "jsonrpc": "2.0", "method": "notifications/message", "params": {} })
        );
        if write.write_all(noise.as_bytes()).await.is_err() {
            return;
        }
        if write
            .write_all(format!("{reply}\n").as_bytes())
            .await
            .is_err()
        {
            return;
        }
    }
}

fn rpc_error(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}
