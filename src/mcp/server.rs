//! MCP tool handlers hosting the catalog/scoring service over stdio.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use cyber_compliance_catalog::{
    Catalog, ChecklistRequest, RecommendRequest, ScoreRequest, TOOL_CALCULATE_RISK_SCORE,
    TOOL_GENERATE_CHECKLIST, TOOL_RECOMMEND_NEXT_ACTIONS,
};
use rmcp::{
    ErrorData as McpError, ServerHandler, handler::server::common::schema_for_type,
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*, tool,
    tool_handler, tool_router,
};
use serde_json::Value;

/// MCP transport adapter for the control catalog.
///
/// Every tool answers with one text block holding an envelope: `{"ok": true, ...}` on success,
/// `{"ok": false, "error": {"code", "message"}}` when the request is rejected.
///
/// Arguments arrive as raw objects and are decoded by [`Catalog::dispatch`], so malformed
/// arguments produce an `INVALID_ARGUMENTS` envelope here exactly as they do in-process. The
/// advertised input schemas still come from the typed request structs.
#[derive(Clone)]
pub struct ComplianceCatalogServer {
    tool_router: ToolRouter<Self>,
    catalog: Arc<Catalog>,
}

#[tool_router]
impl ComplianceCatalogServer {
    /// Creates a server over the catalog at `catalog_path`, or the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured catalog file cannot be loaded.
    pub fn new(catalog_path: Option<&Path>) -> anyhow::Result<Self> {
        let catalog = match catalog_path {
            Some(path) => Catalog::from_path(path)
                .with_context(|| format!("failed to load catalog for MCP server from {}", path.display()))?,
            None => Catalog::builtin(),
        };
        Ok(Self::with_catalog(catalog))
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            tool_router: Self::tool_router(),
            catalog: Arc::new(catalog),
        }
    }

    #[tool(
        name = "generate_checklist",
        description = "Returns the ordered control checklist for a compliance framework (nist_csf, iso27001, soc2, cis_v8), filtered by organization type. Every control starts with baseline status `missing`; callers overlay their recorded statuses.",
        input_schema = schema_for_type::<ChecklistRequest>()
    )]
    async fn generate_checklist(
        &self,
        Parameters(arguments): Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(TOOL_GENERATE_CHECKLIST, arguments)
    }

    #[tool(
        name = "calculate_risk_score",
        description = "Computes a weighted 0-100 risk score from control statuses (partial weighs 5, missing weighs 10) and maps it to low, medium, high, or critical. Returns the score, level, and per-status counts.",
        input_schema = schema_for_type::<ScoreRequest>()
    )]
    async fn calculate_risk_score(
        &self,
        Parameters(arguments): Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(TOOL_CALCULATE_RISK_SCORE, arguments)
    }

    #[tool(
        name = "recommend_next_actions",
        description = "Maps gap controls (names as returned by generate_checklist) to deduplicated remediation actions, in gap order. With no gaps, returns a maintenance recommendation.",
        input_schema = schema_for_type::<RecommendRequest>()
    )]
    async fn recommend_next_actions(
        &self,
        Parameters(arguments): Parameters<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(TOOL_RECOMMEND_NEXT_ACTIONS, arguments)
    }

    fn dispatch(&self, tool: &str, arguments: JsonObject) -> Result<CallToolResult, McpError> {
        tracing::info!(tool, "tool call");
        let envelope = self.catalog.dispatch(tool, Value::Object(arguments));
        if envelope.get("ok") != Some(&Value::Bool(true)) {
            tracing::info!(tool, error = %envelope["error"], "tool call rejected");
        }
        envelope_result(envelope)
    }
}

#[tool_handler]
impl ServerHandler for ComplianceCatalogServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Cyber compliance catalog: call `generate_checklist` for a framework's controls, then `calculate_risk_score` with each control's status, then `recommend_next_actions` with up to four missing controls. Responses are JSON envelopes; check `ok` before reading the payload.".into(),
            ),
        }
    }
}

fn envelope_result(envelope: Value) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string(&envelope).map_err(mcp_internal_error)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn mcp_internal_error(error: impl ToString) -> McpError {
    McpError::internal_error(error.to_string(), None)
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
