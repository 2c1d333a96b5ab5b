//! Control catalog and risk scoring service.
//!
//! Provides the three operations the compliance evaluator consumes (`generate_checklist`,
//! `calculate_risk_score`, `recommend_next_actions`) plus the envelope encoding shared by every
//! host of this service: in-process calls and the MCP stdio server.

mod builtin;

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use cyber_compliance_core::{RiskLevel, Status};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub use builtin::DEFAULT_ORG_TYPES;

pub const TOOL_GENERATE_CHECKLIST: &str = "generate_checklist";
pub const TOOL_CALCULATE_RISK_SCORE: &str = "calculate_risk_score";
pub const TOOL_RECOMMEND_NEXT_ACTIONS: &str = "recommend_next_actions";

/// Organization type used when a caller omits one.
pub const DEFAULT_ORG_TYPE: &str = "saas";

/// Weight of a `partial` control in the risk score.
pub const PARTIAL_WEIGHT: u64 = 5;
/// Weight of a `missing` control in the risk score.
pub const MISSING_WEIGHT: u64 = 10;

/// Stable, machine-readable error codes carried in error envelopes.
pub mod codes {
    pub const INVALID_FRAMEWORK: &str = "INVALID_FRAMEWORK";
    pub const INVALID_ORG_TYPE: &str = "INVALID_ORG_TYPE";
    pub const INVALID_STATUS: &str = "INVALID_STATUS";
    pub const DUPLICATE_ID: &str = "DUPLICATE_ID";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_ARGUMENTS: &str = "INVALID_ARGUMENTS";
    pub const UNKNOWN_TOOL: &str = "UNKNOWN_TOOL";
    pub const CATALOG_UNAVAILABLE: &str = "CATALOG_UNAVAILABLE";
    pub const INTERNAL: &str = "INTERNAL";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unsupported framework '{framework}'; supported frameworks: {supported}")]
    InvalidFramework { framework: String, supported: String },
    #[error("unsupported organization type '{org_type}'; supported types: {supported}")]
    InvalidOrgType { org_type: String, supported: String },
    #[error("invalid status '{status}' for control '{control}' (allowed: implemented|partial|missing)")]
    InvalidStatus { control: String, status: String },
    #[error("control '{control}' appears more than once")]
    DuplicateControl { control: String },
    #[error("control '{control}' not found in framework '{framework}'")]
    ControlNotFound { framework: String, control: String },
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("unknown tool '{tool}'")]
    UnknownTool { tool: String },
    #[error("catalog at {path} is unusable: {reason}")]
    Unavailable { path: String, reason: String },
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFramework { .. } => codes::INVALID_FRAMEWORK,
            Self::InvalidOrgType { .. } => codes::INVALID_ORG_TYPE,
            Self::InvalidStatus { .. } => codes::INVALID_STATUS,
            Self::DuplicateControl { .. } => codes::DUPLICATE_ID,
            Self::ControlNotFound { .. } => codes::NOT_FOUND,
            Self::InvalidArguments { .. } => codes::INVALID_ARGUMENTS,
            Self::UnknownTool { .. } => codes::UNKNOWN_TOOL,
            Self::Unavailable { .. } => codes::CATALOG_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogControl {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub domain: String,
    /// Organization types this control applies to. Empty means every type.
    #[serde(default)]
    pub org_types: Vec<String>,
    pub action: String,
}

impl CatalogControl {
    /// Checklist name, e.g. `"GV.OV-01 Governance strategy defined"`.
    pub fn name(&self) -> String {
        format!("{} {}", self.id, self.title)
    }

    fn applies_to(&self, org_type: &str) -> bool {
        self.org_types.is_empty()
            || self
                .org_types
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(org_type))
    }

    fn matches_reference(&self, reference: &str) -> bool {
        let reference = reference.trim();
        self.name() == reference || self.id == reference
    }

    fn matches_query(&self, query: &str) -> bool {
        [&self.id, &self.title, &self.domain]
            .iter()
            .any(|field| field.to_lowercase().contains(query))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkCatalog {
    pub label: String,
    pub controls: Vec<CatalogControl>,
}

/// Framework control catalog, either the built-in set or one loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_org_types")]
    pub org_types: Vec<String>,
    pub frameworks: BTreeMap<String, FrameworkCatalog>,
}

fn default_org_types() -> Vec<String> {
    DEFAULT_ORG_TYPES
        .iter()
        .map(|value| value.to_string())
        .collect()
}

fn default_org_type() -> String {
    DEFAULT_ORG_TYPE.to_string()
}

/// Arguments of `generate_checklist`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChecklistRequest {
    #[schemars(description = "Framework id: nist_csf, iso27001, soc2 or cis_v8.")]
    pub framework: String,
    #[schemars(
        description = "Organization type used to filter controls, e.g. \"saas\". Defaults to \"saas\"."
    )]
    #[serde(default = "default_org_type")]
    pub org_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlStatusInput {
    #[schemars(description = "Control name as returned by generate_checklist.")]
    pub control: String,
    #[schemars(description = "One of implemented, partial, missing.")]
    pub status: String,
}

/// Arguments of `calculate_risk_score`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScoreRequest {
    #[schemars(description = "Controls with their current implementation status.")]
    pub controls: Vec<ControlStatusInput>,
}

/// Arguments of `recommend_next_actions`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecommendRequest {
    #[schemars(description = "Framework id the gaps belong to.")]
    pub framework: String,
    #[schemars(description = "Control names (or ids) currently missing, most important first.")]
    #[serde(default)]
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistEntry {
    pub control: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistResponse {
    pub framework: String,
    pub org_type: String,
    pub checklist: Vec<ChecklistEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResponse {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub implemented: usize,
    pub partial: usize,
    pub missing: usize,
    pub controls_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendResponse {
    pub framework: String,
    pub recommended_actions: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    pub fn builtin() -> Self {
        builtin::builtin_catalog()
    }

    /// Loads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] when the file is missing, unreadable, malformed,
    /// empty, or declares the same control twice within one framework.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let unavailable = |reason: String| CatalogError::Unavailable {
            path: path.display().to_string(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|err| unavailable(err.to_string()))?;
        let catalog: Catalog =
            serde_json::from_str(&raw).map_err(|err| unavailable(err.to_string()))?;
        catalog.validate().map_err(unavailable)?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), String> {
        if self.frameworks.is_empty() {
            return Err("catalog declares no frameworks".to_string());
        }
        for (key, framework) in &self.frameworks {
            let mut seen = HashSet::new();
            for control in &framework.controls {
                if !seen.insert(control.name()) {
                    return Err(format!(
                        "framework '{key}' declares control '{}' more than once",
                        control.name()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn framework_keys(&self) -> Vec<&str> {
        self.frameworks.keys().map(String::as_str).collect()
    }

    fn framework(&self, raw: &str) -> Result<(String, &FrameworkCatalog), CatalogError> {
        let key = raw.trim().to_ascii_lowercase();
        match self.frameworks.get(&key) {
            Some(framework) => Ok((key, framework)),
            None => Err(CatalogError::InvalidFramework {
                framework: raw.to_string(),
                supported: self.framework_keys().join(", "),
            }),
        }
    }

    /// Returns the ordered checklist for a framework, filtered by organization type.
    pub fn generate_checklist(
        &self,
        request: &ChecklistRequest,
    ) -> Result<ChecklistResponse, CatalogError> {
        let (framework, catalog) = self.framework(&request.framework)?;
        let org_type = request.org_type.trim().to_ascii_lowercase();
        if !self.org_types.iter().any(|known| *known == org_type) {
            return Err(CatalogError::InvalidOrgType {
                org_type: request.org_type.clone(),
                supported: self.org_types.join(", "),
            });
        }

        let checklist = catalog
            .controls
            .iter()
            .filter(|control| control.applies_to(&org_type))
            .map(|control| ChecklistEntry {
                control: control.name(),
                status: Status::Missing,
            })
            .collect();

        Ok(ChecklistResponse {
            framework,
            org_type,
            checklist,
        })
    }

    /// Computes a weighted risk score over the supplied control statuses.
    pub fn calculate_risk_score(&self, request: &ScoreRequest) -> Result<ScoreResponse, CatalogError> {
        let mut seen = HashSet::new();
        let (mut implemented, mut partial, mut missing) = (0usize, 0usize, 0usize);

        for input in &request.controls {
            if !seen.insert(input.control.trim()) {
                return Err(CatalogError::DuplicateControl {
                    control: input.control.clone(),
                });
            }
            match Status::parse_strict(&input.status) {
                Some(Status::Implemented) => implemented += 1,
                Some(Status::Partial) => partial += 1,
                Some(Status::Missing) => missing += 1,
                None => {
                    return Err(CatalogError::InvalidStatus {
                        control: input.control.clone(),
                        status: input.status.clone(),
                    });
                }
            }
        }

        Ok(score_counts(implemented, partial, missing))
    }

    /// Maps gap controls to recommended actions, deduplicated in gap order.
    pub fn recommend_next_actions(
        &self,
        request: &RecommendRequest,
    ) -> Result<RecommendResponse, CatalogError> {
        let (framework, catalog) = self.framework(&request.framework)?;

        if request.gaps.is_empty() {
            return Ok(RecommendResponse {
                framework,
                recommended_actions: vec![format!(
                    "Maintain {} controls and schedule the next periodic review",
                    catalog.label
                )],
            });
        }

        let mut recommended_actions: Vec<String> = Vec::new();
        for gap in &request.gaps {
            let Some(control) = catalog
                .controls
                .iter()
                .find(|control| control.matches_reference(gap))
            else {
                return Err(CatalogError::ControlNotFound {
                    framework,
                    control: gap.clone(),
                });
            };
            if !recommended_actions.contains(&control.action) {
                recommended_actions.push(control.action.clone());
            }
        }

        Ok(RecommendResponse {
            framework,
            recommended_actions,
        })
    }

    /// Lists framework controls, optionally filtered by a case-insensitive query over id, title,
    /// and domain.
    pub fn list_controls(
        &self,
        framework: &str,
        query: Option<&str>,
    ) -> Result<Vec<&CatalogControl>, CatalogError> {
        let (_, catalog) = self.framework(framework)?;
        let query = query
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        Ok(catalog
            .controls
            .iter()
            .filter(|control| {
                query
                    .as_deref()
                    .is_none_or(|query| control.matches_query(query))
            })
            .collect())
    }

    /// Runs a tool by name and returns its envelope-encoded response.
    ///
    /// Every failure, including malformed arguments and unknown tools, is returned as an
    /// `{"ok": false, "error": {...}}` envelope rather than an `Err`.
    pub fn dispatch(&self, tool: &str, arguments: Value) -> Value {
        match tool {
            TOOL_GENERATE_CHECKLIST => encode_response(
                parse_arguments::<ChecklistRequest>(tool, arguments)
                    .and_then(|request| self.generate_checklist(&request)),
            ),
            TOOL_CALCULATE_RISK_SCORE => encode_response(
                parse_arguments::<ScoreRequest>(tool, arguments)
                    .and_then(|request| self.calculate_risk_score(&request)),
            ),
            TOOL_RECOMMEND_NEXT_ACTIONS => encode_response(
                parse_arguments::<RecommendRequest>(tool, arguments)
                    .and_then(|request| self.recommend_next_actions(&request)),
            ),
            other => encode_error(&CatalogError::UnknownTool {
                tool: other.to_string(),
            }),
        }
    }
}

/// Weighted risk: `(partial*5 + missing*10) / (total*10) * 100`, rounded to two decimals.
///
/// An empty control set scores 0 (low). The weighting is done in `f64` and the total saturates,
/// so arbitrarily large counts never overflow.
pub fn score_counts(implemented: usize, partial: usize, missing: usize) -> ScoreResponse {
    let total = implemented.saturating_add(partial).saturating_add(missing);
    let risk_score = if total == 0 {
        0.0
    } else {
        let weighted = partial as f64 * PARTIAL_WEIGHT as f64 + missing as f64 * MISSING_WEIGHT as f64;
        let possible = (implemented as f64 + partial as f64 + missing as f64) * MISSING_WEIGHT as f64;
        let raw = weighted / possible * 100.0;
        (raw * 100.0).round() / 100.0
    };

    ScoreResponse {
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        implemented,
        partial,
        missing,
        controls_total: total,
    }
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool: &str,
    arguments: Value,
) -> Result<T, CatalogError> {
    serde_json::from_value(arguments).map_err(|err| CatalogError::InvalidArguments {
        tool: tool.to_string(),
        reason: err.to_string(),
    })
}

/// Encodes an operation result as an envelope: `{"ok": true, ...payload}` or
/// `{"ok": false, "error": {"code", "message"}}`.
pub fn encode_response<T: Serialize>(result: Result<T, CatalogError>) -> Value {
    match result {
        Ok(payload) => match serde_json::to_value(payload) {
            Ok(Value::Object(mut object)) => {
                object.insert("ok".to_string(), Value::Bool(true));
                Value::Object(object)
            }
            Ok(other) => json!({ "ok": true, "result": other }),
            Err(err) => json!({
                "ok": false,
                "error": { "code": codes::INTERNAL, "message": err.to_string() },
            }),
        },
        Err(err) => encode_error(&err),
    }
}

pub fn encode_error(error: &CatalogError) -> Value {
    json!({
        "ok": false,
        "error": { "code": error.code(), "message": error.to_string() },
    })
}
