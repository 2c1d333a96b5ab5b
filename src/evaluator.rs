//! Per-framework compliance evaluation on top of a [`ToolClient`].

use std::sync::Arc;

use cyber_compliance_core::{FrameworkRegistry, RiskLevel, Status, StatusStore};

use crate::client::{ToolClient, ToolError};
use crate::config::{DEFAULT_MAX_GAPS, DEFAULT_MAX_PRIORITY_ACTIONS};
use crate::types::{ComplianceOverview, FrameworkSummary, ResolvedControl};

/// Merges catalog checklists with recorded statuses and asks the service for scores and actions.
#[derive(Clone)]
pub struct ComplianceEvaluator {
    client: Arc<dyn ToolClient>,
    frameworks: FrameworkRegistry,
    max_gaps: usize,
    max_priority_actions: usize,
}

impl ComplianceEvaluator {
    pub fn new(client: Arc<dyn ToolClient>, frameworks: FrameworkRegistry) -> Self {
        Self {
            client,
            frameworks,
            max_gaps: DEFAULT_MAX_GAPS,
            max_priority_actions: DEFAULT_MAX_PRIORITY_ACTIONS,
        }
    }

    pub fn with_limits(mut self, max_gaps: usize, max_priority_actions: usize) -> Self {
        self.max_gaps = max_gaps;
        self.max_priority_actions = max_priority_actions;
        self
    }

    /// Evaluates one framework.
    ///
    /// A checklist rejected by the service yields a degraded summary. Score and recommendation
    /// failures, and every unavailable or protocol failure, are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns the [`ToolError`] of the first failing call other than a rejected checklist.
    pub async fn summarize(
        &self,
        framework: &str,
        store: &StatusStore,
        org_type: &str,
    ) -> Result<FrameworkSummary, ToolError> {
        let checklist = match self.client.checklist(framework, org_type).await {
            Ok(checklist) => checklist,
            Err(ToolError::Tool { failure, .. }) => {
                tracing::warn!(framework, org_type, error = %failure, "checklist rejected; reporting degraded summary");
                return Ok(FrameworkSummary::degraded(framework, org_type, failure));
            }
            Err(err) => return Err(err),
        };

        let controls = checklist
            .into_iter()
            .map(|item| ResolvedControl {
                status: store.get(framework, &item.control),
                control: item.control,
            })
            .collect::<Vec<_>>();

        let score = self.client.score(&controls).await?;

        let gaps = controls
            .iter()
            .filter(|control| control.status == Status::Missing)
            .take(self.max_gaps)
            .map(|control| control.control.clone())
            .collect::<Vec<_>>();
        let recommended_actions = self.client.recommend(framework, &gaps).await?;

        tracing::debug!(
            framework,
            controls = controls.len(),
            gaps = gaps.len(),
            "framework evaluated"
        );

        Ok(FrameworkSummary {
            framework: framework.to_string(),
            org_type: org_type.to_string(),
            risk_score: score.risk_score.unwrap_or(100.0),
            risk_level: score.risk_level.unwrap_or(RiskLevel::Critical),
            implemented: score.implemented.unwrap_or(0),
            partial: score.partial.unwrap_or(0),
            missing: score.missing.unwrap_or(0),
            controls_total: score.controls_total.unwrap_or(controls.len()),
            recommended_actions,
            controls,
            error: None,
        })
    }

    /// Evaluates every registry framework in order and collects global priority actions.
    ///
    /// # Errors
    ///
    /// Returns the first error [`ComplianceEvaluator::summarize`] reports.
    pub async fn summarize_all(
        &self,
        store: &StatusStore,
        org_type: &str,
    ) -> Result<ComplianceOverview, ToolError> {
        let mut frameworks = Vec::with_capacity(self.frameworks.len());
        for framework in self.frameworks.iter() {
            frameworks.push(self.summarize(framework, store, org_type).await?);
        }

        let priority_actions = priority_actions(&frameworks, self.max_priority_actions);
        Ok(ComplianceOverview {
            org_type: org_type.to_string(),
            frameworks,
            priority_actions,
        })
    }
}

/// First-seen, exact-match deduplicated actions across summaries, truncated to `limit`.
pub fn priority_actions(summaries: &[FrameworkSummary], limit: usize) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    for action in summaries
        .iter()
        .flat_map(|summary| summary.recommended_actions.iter())
    {
        if actions.len() == limit {
            break;
        }
        if !actions.contains(action) {
            actions.push(action.clone());
        }
    }
    actions
}

#[cfg(test)]
#[path = "tests/evaluator.rs"]
mod tests;
