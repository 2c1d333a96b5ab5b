use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::BufReader;
use tokio::process::Command;

use super::session::{McpSession, SessionError};
use super::{Operation, ToolClient, ToolError, Transport};
use crate::config::CATALOG_PATH_ENV;

/// Opens fresh, not yet initialized sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<McpSession, SessionError>;

    /// Human-readable description of the launch target, for logs.
    fn describe(&self) -> String;
}

/// Spawns a server command with piped stdio.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
    catalog_path: Option<PathBuf>,
}

impl CommandLauncher {
    /// Splits a command line on whitespace. Quoting is not supported.
    pub fn parse(command: &str) -> Result<Self, SessionError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            return Err(SessionError::Spawn {
                command: command.to_string(),
                reason: "server command is empty".to_string(),
            });
        };
        Ok(Self {
            program,
            args: parts.collect(),
            catalog_path: None,
        })
    }

    /// Hands the catalog file to the server through its environment.
    pub fn with_catalog_path(mut self, catalog_path: Option<&Path>) -> Self {
        self.catalog_path = catalog_path.map(Path::to_path_buf);
        self
    }

    pub(super) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(path) = &self.catalog_path {
            command.env(CATALOG_PATH_ENV, path);
        }
        command
    }
}

#[async_trait]
impl SessionLauncher for CommandLauncher {
    async fn launch(&self) -> Result<McpSession, SessionError> {
        let spawn_error = |reason: String| SessionError::Spawn {
            command: self.describe(),
            reason,
        };

        let mut child = self
            .command()
            .spawn()
            .map_err(|err| spawn_error(err.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("stdout was not captured".to_string()))?;

        Ok(McpSession::new(
            Box::new(BufReader::new(stdout)),
            Box::new(stdin),
            Some(child),
        ))
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Runs every tool call in its own MCP stdio session.
pub struct SubprocessClient {
    launcher: Box<dyn SessionLauncher>,
}

impl SubprocessClient {
    /// Builds a client for `command` and verifies one session can be launched and handshaked.
    /// A configured catalog file is passed on to the server.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Unavailable`] if the command is empty, cannot be spawned, or fails
    /// the handshake.
    pub async fn connect(command: &str, catalog_path: Option<&Path>) -> Result<Self, ToolError> {
        let launcher = CommandLauncher::parse(command)
            .map_err(|err| ToolError::Unavailable(err.to_string()))?
            .with_catalog_path(catalog_path);
        let client = Self::with_launcher(launcher);
        let session = client.open_session().await?;
        session.close().await;
        Ok(client)
    }

    pub fn with_launcher(launcher: impl SessionLauncher + 'static) -> Self {
        Self {
            launcher: Box::new(launcher),
        }
    }

    async fn open_session(&self) -> Result<McpSession, ToolError> {
        let target = self.launcher.describe();
        let mut session = self.launcher.launch().await.map_err(|err| {
            tracing::warn!(server = %target, error = %err, "failed to launch MCP server");
            ToolError::Unavailable(err.to_string())
        })?;

        match session.initialize().await {
            Ok(_) => {
                tracing::debug!(server = %target, "MCP session initialized");
                Ok(session)
            }
            Err(err) => {
                session.close().await;
                tracing::warn!(server = %target, error = %err, "MCP handshake failed");
                Err(ToolError::Unavailable(format!(
                    "handshake with '{target}' failed: {err}"
                )))
            }
        }
    }
}

#[async_trait]
impl ToolClient for SubprocessClient {
    fn transport(&self) -> Transport {
        Transport::Subprocess
    }

    async fn invoke(&self, operation: Operation, arguments: Value) -> Result<Value, ToolError> {
        let mut session = self.open_session().await?;
        let outcome = session.call_tool(operation.tool_name(), arguments).await;
        session.close().await;

        let result = outcome.map_err(|err| ToolError::Protocol {
            operation,
            reason: err.to_string(),
        })?;
        decode_tool_result(operation, &result)
    }
}

/// Extracts the response document from a `tools/call` result.
///
/// `isError: true` is a transport-level failure. The document itself is the JSON text of the
/// first text content block.
pub(crate) fn decode_tool_result(operation: Operation, result: &Value) -> Result<Value, ToolError> {
    let protocol = |reason: String| ToolError::Protocol { operation, reason };

    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|blocks| {
            blocks.iter().find_map(|block| {
                (block.get("type").and_then(Value::as_str) == Some("text"))
                    .then(|| block.get("text").and_then(Value::as_str))
                    .flatten()
            })
        });

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(protocol(format!(
            "server flagged the call as failed: {}",
            text.unwrap_or("no details")
        )));
    }

    let Some(text) = text else {
        return Err(protocol("tool result has no text content".to_string()));
    };
    serde_json::from_str(text).map_err(|err| protocol(format!("tool result is not JSON: {err}")))
}
