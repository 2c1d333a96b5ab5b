use super::*;
use crate::client::ToolFailure;
use crate::types::ResolvedControl;
use chrono::TimeZone;
use cyber_compliance_catalog::{Catalog, score_counts};
use cyber_compliance_core::{StatusStore, compare};

fn summary(framework: &str, risk_score: f64, actions: &[&str]) -> FrameworkSummary {
    FrameworkSummary {
        framework: framework.to_string(),
        org_type: "saas".to_string(),
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        implemented: 1,
        partial: 1,
        missing: 1,
        controls_total: 3,
        recommended_actions: actions.iter().map(|value| value.to_string()).collect(),
        controls: vec![
            ResolvedControl {
                control: "A".to_string(),
                status: Status::Implemented,
            },
            ResolvedControl {
                control: "B".to_string(),
                status: Status::Missing,
            },
        ],
        error: None,
    }
}

fn overview(priority_actions: &[&str]) -> ComplianceOverview {
    ComplianceOverview {
        org_type: "saas".to_string(),
        frameworks: vec![summary("nist_csf", 50.0, &["mfa"]), summary("soc2", 37.5, &[])],
        priority_actions: priority_actions.iter().map(|value| value.to_string()).collect(),
    }
}

#[test]
fn markdown_report_has_expected_sections() {
    let generated_at = Utc
        .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .expect("timestamp");
    let rendered = render_markdown_report(&overview(&["mfa", "backups"]), generated_at);

    assert!(rendered.starts_with("# Cyber Compliance Report\n"));
    assert!(rendered.contains("Generated: 2026-03-01 09:30 UTC"));
    assert!(rendered.contains("## Executive Summary"));
    assert!(rendered.contains(
        "- **NIST CSF**: Risk **HIGH** (50.0%), Implemented 1, Partial 1, Missing 1"
    ));
    assert!(rendered.contains("- **SOC 2**: Risk **MEDIUM** (37.5%)"));
    assert!(rendered.contains("## Priority Actions\n\n1. mfa\n2. backups\n"));
    assert!(rendered.contains("### NIST CSF\n\n| Metric | Value |\n|---|---|\n| Risk score | 50.0% |"));
    assert!(rendered.contains("| Risk level | MEDIUM |"));
    assert!(rendered.ends_with("\n"));
}

#[test]
fn markdown_report_without_actions_says_so() {
    let rendered = render_markdown_report(&overview(&[]), Utc::now());
    assert!(rendered.contains("- No prioritized actions generated."));
}

#[test]
fn degraded_framework_is_flagged() {
    let mut overview = overview(&[]);
    overview.frameworks[1] = FrameworkSummary::degraded(
        "soc2",
        "casino",
        ToolFailure::new("INVALID_ORG_TYPE", "unsupported organization type 'casino'"),
    );

    let markdown = render_markdown_report(&overview, Utc::now());
    assert!(markdown.contains("Risk **CRITICAL** (100.0%)"));
    assert!(markdown.contains("unavailable: [INVALID_ORG_TYPE]"));

    let text = render_overview(&overview, false);
    assert!(text.contains("(checklist unavailable)"));

    let framework = render_framework(&overview.frameworks[1], false);
    assert!(framework.contains("checklist unavailable"));
}

#[test]
fn framework_text_lists_controls_and_actions() {
    let rendered = render_framework(&summary("iso27001", 50.0, &["Encrypt backups"]), false);
    assert!(rendered.contains("ISO 27001 compliance summary (saas)"));
    assert!(rendered.contains("Risk level      HIGH"));
    assert!(rendered.contains("implemented  A"));
    assert!(rendered.contains("missing      B"));
    assert!(rendered.contains("  - Encrypt backups"));
    assert!(!rendered.contains("\x1b["));
}

#[test]
fn overview_with_color_includes_ansi_codes() {
    let rendered = render_overview(&overview(&["mfa"]), true);
    assert!(rendered.contains("\x1b["));
    assert!(rendered.contains("1. mfa"));
}

#[test]
fn diff_lists_at_most_ten_entries_per_section() {
    let mut old = StatusStore::default();
    let mut new = StatusStore::default();
    for index in 0..12 {
        let control = format!("C{index:02}");
        old.set("nist_csf", &control, "missing");
        new.set("nist_csf", &control, "implemented");
    }
    old.set("soc2", "CC8.1", "implemented");
    new.set("soc2", "CC8.1", "partial");
    old.set("soc2", "CC7.4", "partial");
    new.set("soc2", "CC7.4", "partial");

    let rendered = render_diff(&compare(&old, &new), false);
    assert!(rendered.contains("Improved: 12"));
    assert!(rendered.contains("Regressed: 1"));
    assert!(rendered.contains("Unchanged: 1"));
    assert!(rendered.contains(" - nist_csf | C00 : missing -> implemented"));
    assert!(rendered.contains(" - nist_csf | C09 : missing -> implemented"));
    assert!(!rendered.contains("C10"));
    assert!(rendered.contains("Regressions:\n - soc2 | CC8.1 : implemented -> partial"));
}

#[test]
fn diff_without_changes_prints_counts_only() {
    let rendered = render_diff(&compare(&StatusStore::default(), &StatusStore::default()), false);
    assert_eq!(rendered, "Improved: 0\nRegressed: 0\nUnchanged: 0");
}

#[test]
fn manual_score_renders_two_decimals() {
    let rendered = render_manual_score("SOC 2", &score_counts(1, 1, 1), false);
    assert_eq!(
        rendered,
        "Framework: SOC 2\nRisk Score: 50.00%\nRisk Level: HIGH"
    );
}

#[test]
fn controls_table_aligns_columns() {
    let catalog = Catalog::builtin();
    let controls = catalog
        .list_controls("iso27001", Some("technological"))
        .expect("controls");
    let rendered = render_controls("iso27001", &controls);

    assert!(rendered.starts_with("ISO 27001 controls: 3\n"));
    assert!(rendered.contains("A.8.13  Technological  Information backup"));
}
