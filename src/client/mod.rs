//! Transport-agnostic access to the catalog/scoring tools.
//!
//! Both strategies only move raw response documents; envelope unwrapping and payload decoding
//! happen once, in the provided methods of [`ToolClient`].

mod direct;
mod envelope;
mod session;
mod subprocess;

#[cfg(test)]
pub(crate) mod stub;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cyber_compliance_catalog::{
    TOOL_CALCULATE_RISK_SCORE, TOOL_GENERATE_CHECKLIST, TOOL_RECOMMEND_NEXT_ACTIONS, codes,
};
use cyber_compliance_core::RiskLevel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::ComplianceConfig;
use crate::types::ResolvedControl;

pub use direct::DirectClient;
pub use envelope::unwrap_response;
pub use subprocess::SubprocessClient;

#[cfg(test)]
pub(crate) use envelope::TOOL_ERROR;
#[cfg(test)]
use subprocess::{CommandLauncher, SessionLauncher};

/// How tool calls reach the catalog/scoring service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// In-process calls into the linked catalog.
    #[default]
    #[serde(alias = "python")]
    #[value(alias = "python")]
    Direct,
    /// One MCP stdio session per call against an external server command.
    #[serde(alias = "stdio")]
    #[value(alias = "stdio")]
    Subprocess,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Subprocess => f.write_str("subprocess"),
        }
    }
}

/// The logical operations the evaluator needs from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Checklist,
    Score,
    Recommend,
}

impl Operation {
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Checklist => TOOL_GENERATE_CHECKLIST,
            Self::Score => TOOL_CALCULATE_RISK_SCORE,
            Self::Recommend => TOOL_RECOMMEND_NEXT_ACTIONS,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool_name())
    }
}

const ERROR_HINTS: &[(&str, &str)] = &[
    (
        codes::INVALID_FRAMEWORK,
        "use one of: nist_csf, iso27001, soc2, cis_v8",
    ),
    (
        codes::INVALID_ORG_TYPE,
        "use a supported organization type such as saas, fintech, healthcare, enterprise, or startup",
    ),
    (
        codes::INVALID_STATUS,
        "statuses must be implemented, partial, or missing",
    ),
    (
        codes::DUPLICATE_ID,
        "each control may appear only once per request",
    ),
    (
        codes::NOT_FOUND,
        "check the control name against the framework checklist",
    ),
    (
        codes::INVALID_ARGUMENTS,
        "the server rejected the request arguments; check client and server versions",
    ),
];

/// Static hint for a known error code.
pub fn hint_for(code: &str) -> Option<&'static str> {
    ERROR_HINTS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, hint)| *hint)
}

/// Application-level failure reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolFailure {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

impl ToolFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            hint: hint_for(&code),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(hint) = self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    /// The service could not be reached or located. Fatal for the current command.
    #[error("catalog service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with an error envelope.
    #[error("{operation} failed: {failure}")]
    Tool {
        operation: Operation,
        failure: ToolFailure,
    },
    /// The exchange itself was malformed. Never downgraded into a degraded summary.
    #[error("protocol failure during {operation}: {reason}")]
    Protocol {
        operation: Operation,
        reason: String,
    },
}

impl ToolError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Checklist row returned by the service. The baseline status is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub control: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Score payload. Fields the service omits stay `None` and are defaulted by the caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoreReport {
    pub risk_score: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub implemented: Option<usize>,
    pub partial: Option<usize>,
    pub missing: Option<usize>,
    pub controls_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChecklistPayload {
    checklist: Vec<ChecklistItem>,
}

#[derive(Debug, Deserialize)]
struct RecommendPayload {
    #[serde(default)]
    recommended_actions: Vec<String>,
}

#[async_trait]
pub trait ToolClient: Send + Sync {
    fn transport(&self) -> Transport;

    /// Performs one tool invocation and returns the decoded response document, before any
    /// envelope unwrapping.
    async fn invoke(&self, operation: Operation, arguments: Value) -> Result<Value, ToolError>;

    /// Invokes a tool and unwraps its envelope into the bare payload.
    async fn call(
        &self,
        operation: Operation,
        arguments: Value,
    ) -> Result<Map<String, Value>, ToolError> {
        let raw = self.invoke(operation, arguments).await?;
        unwrap_response(raw).into_result(operation)
    }

    async fn checklist(
        &self,
        framework: &str,
        org_type: &str,
    ) -> Result<Vec<ChecklistItem>, ToolError> {
        let payload = self
            .call(
                Operation::Checklist,
                json!({ "framework": framework, "org_type": org_type }),
            )
            .await?;
        let decoded: ChecklistPayload = decode_payload(Operation::Checklist, payload)?;
        Ok(decoded.checklist)
    }

    async fn score(&self, controls: &[ResolvedControl]) -> Result<ScoreReport, ToolError> {
        let payload = self
            .call(Operation::Score, json!({ "controls": controls }))
            .await?;
        decode_payload(Operation::Score, payload)
    }

    async fn recommend(&self, framework: &str, gaps: &[String]) -> Result<Vec<String>, ToolError> {
        let payload = self
            .call(
                Operation::Recommend,
                json!({ "framework": framework, "gaps": gaps }),
            )
            .await?;
        let decoded: RecommendPayload = decode_payload(Operation::Recommend, payload)?;
        Ok(decoded.recommended_actions)
    }
}

fn decode_payload<T: DeserializeOwned>(
    operation: Operation,
    payload: Map<String, Value>,
) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(payload)).map_err(|err| ToolError::Protocol {
        operation,
        reason: format!("unexpected payload shape: {err}"),
    })
}

/// Builds the configured strategy.
///
/// # Errors
///
/// Returns [`ToolError::Unavailable`] when the catalog file cannot be loaded (direct) or the
/// server command cannot be launched and handshaked (subprocess).
pub async fn connect(config: &ComplianceConfig) -> Result<Arc<dyn ToolClient>, ToolError> {
    let client: Arc<dyn ToolClient> = match config.transport {
        Transport::Direct => Arc::new(DirectClient::from_catalog_path(
            config.catalog_path.as_deref(),
        )?),
        Transport::Subprocess => Arc::new(
            SubprocessClient::connect(&config.server_command, config.catalog_path.as_deref())
                .await?,
        ),
    };
    tracing::debug!(transport = %client.transport(), "tool client ready");
    Ok(client)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
