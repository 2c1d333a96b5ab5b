use cyber_compliance_core::{RiskLevel, Status};
use serde::Serialize;

use crate::client::ToolFailure;

/// A checklist control with its effective status from the assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedControl {
    pub control: String,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkSummary {
    pub framework: String,
    pub org_type: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub implemented: usize,
    pub partial: usize,
    pub missing: usize,
    pub controls_total: usize,
    pub recommended_actions: Vec<String>,
    pub controls: Vec<ResolvedControl>,
    /// Set when the checklist could not be produced and the summary is degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl FrameworkSummary {
    /// Worst-case summary used when the service rejects the framework or organization type.
    pub fn degraded(framework: &str, org_type: &str, failure: ToolFailure) -> Self {
        Self {
            framework: framework.to_string(),
            org_type: org_type.to_string(),
            risk_score: 100.0,
            risk_level: RiskLevel::Critical,
            implemented: 0,
            partial: 0,
            missing: 0,
            controls_total: 0,
            recommended_actions: Vec::new(),
            controls: Vec::new(),
            error: Some(failure),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceOverview {
    pub org_type: String,
    pub frameworks: Vec<FrameworkSummary>,
    pub priority_actions: Vec<String>,
}
