//! Markdown report and terminal renderers for evaluation results.

use chrono::{DateTime, Utc};
use cyber_compliance_catalog::{CatalogControl, ScoreResponse};
use cyber_compliance_core::{AssessmentDiff, DiffEntry, RiskLevel, Status, framework_label};

use crate::types::{ComplianceOverview, FrameworkSummary};

/// Entries listed per section by [`render_diff`].
pub const DIFF_LIST_LIMIT: usize = 10;

pub fn render_markdown_report(overview: &ComplianceOverview, generated_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "# Cyber Compliance Report".to_string(),
        String::new(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC")),
        format!("Organization type: {}", overview.org_type),
        String::new(),
        "## Executive Summary".to_string(),
        String::new(),
    ];

    for summary in &overview.frameworks {
        let mut line = format!(
            "- **{}**: Risk **{}** ({}), Implemented {}, Partial {}, Missing {}",
            framework_label(&summary.framework),
            summary.risk_level.as_str().to_uppercase(),
            percent(summary.risk_score),
            summary.implemented,
            summary.partial,
            summary.missing,
        );
        if let Some(error) = &summary.error {
            line.push_str(&format!(" (unavailable: {error})"));
        }
        lines.push(line);
    }

    lines.extend(["".to_string(), "## Priority Actions".to_string(), String::new()]);
    if overview.priority_actions.is_empty() {
        lines.push("- No prioritized actions generated.".to_string());
    } else {
        for (index, action) in overview.priority_actions.iter().enumerate() {
            lines.push(format!("{}. {action}", index + 1));
        }
    }

    lines.extend(["".to_string(), "## Framework Details".to_string(), String::new()]);
    for summary in &overview.frameworks {
        lines.extend([
            format!("### {}", framework_label(&summary.framework)),
            String::new(),
            "| Metric | Value |".to_string(),
            "|---|---|".to_string(),
            format!("| Risk score | {} |", percent(summary.risk_score)),
            format!("| Risk level | {} |", summary.risk_level.as_str().to_uppercase()),
            format!("| Implemented | {} |", summary.implemented),
            format!("| Partial | {} |", summary.partial),
            format!("| Missing | {} |", summary.missing),
            format!("| Controls total | {} |", summary.controls_total),
            String::new(),
        ]);
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

/// One framework as a metric table followed by its resolved controls.
pub fn render_framework(summary: &FrameworkSummary, use_color: bool) -> String {
    let mut lines = vec![style(
        &format!(
            "{} compliance summary ({})",
            framework_label(&summary.framework),
            summary.org_type
        ),
        "1;36",
        use_color,
    )];

    if let Some(error) = &summary.error {
        lines.push(style(
            &format!("checklist unavailable: {error}"),
            "31",
            use_color,
        ));
    }

    let level = summary.risk_level.as_str().to_uppercase();
    for (metric, value) in [
        ("Risk score", percent(summary.risk_score)),
        ("Risk level", style(&level, level_color(summary.risk_level), use_color)),
        ("Implemented", summary.implemented.to_string()),
        ("Partial", summary.partial.to_string()),
        ("Missing", summary.missing.to_string()),
        ("Controls total", summary.controls_total.to_string()),
    ] {
        lines.push(format!("  {metric:<16}{value}"));
    }

    if !summary.controls.is_empty() {
        lines.push(String::new());
        lines.push(style("Controls", "1;36", use_color));
        for control in &summary.controls {
            lines.push(format!(
                "  {} {}",
                style(
                    &format!("{:<12}", control.status.as_str()),
                    status_color(control.status),
                    use_color
                ),
                control.control
            ));
        }
    }

    if !summary.recommended_actions.is_empty() {
        lines.push(String::new());
        lines.push(style("Recommended actions", "1;36", use_color));
        for action in &summary.recommended_actions {
            lines.push(format!("  - {action}"));
        }
    }

    lines.join("\n")
}

/// All frameworks as one line each plus the global priority actions.
pub fn render_overview(overview: &ComplianceOverview, use_color: bool) -> String {
    let mut lines = vec![
        style("Cyber compliance overview", "1;36", use_color),
        format!("organization type: {}", overview.org_type),
        String::new(),
    ];

    let label_width = overview
        .frameworks
        .iter()
        .map(|summary| framework_label(&summary.framework).len())
        .max()
        .unwrap_or(0);

    for summary in &overview.frameworks {
        let level = summary.risk_level.as_str().to_uppercase();
        let mut line = format!(
            "  {:<label_width$}  {:>8}  {:<8}  implemented {:>3}  partial {:>3}  missing {:>3}",
            framework_label(&summary.framework),
            percent(summary.risk_score),
            level,
            summary.implemented,
            summary.partial,
            summary.missing,
        );
        if summary.is_degraded() {
            line.push_str("  (checklist unavailable)");
        }
        lines.push(style(&line, level_color(summary.risk_level), use_color));
    }

    lines.push(String::new());
    lines.push(style("Priority actions", "1;36", use_color));
    if overview.priority_actions.is_empty() {
        lines.push("  none".to_string());
    } else {
        for (index, action) in overview.priority_actions.iter().enumerate() {
            lines.push(format!("  {}. {action}", index + 1));
        }
    }

    lines.join("\n")
}

pub fn render_diff(diff: &AssessmentDiff, use_color: bool) -> String {
    let mut lines = vec![
        format!(
            "Improved: {}",
            style(&diff.improved.len().to_string(), "32", use_color)
        ),
        format!(
            "Regressed: {}",
            style(&diff.regressed.len().to_string(), "31", use_color)
        ),
        format!("Unchanged: {}", diff.unchanged_count),
    ];

    for (title, entries, color) in [
        ("Top improvements:", &diff.improved, "32"),
        ("Regressions:", &diff.regressed, "31"),
    ] {
        if entries.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(style(title, color, use_color));
        lines.extend(entries.iter().take(DIFF_LIST_LIMIT).map(diff_line));
    }

    lines.join("\n")
}

fn diff_line(entry: &DiffEntry) -> String {
    format!(
        " - {} | {} : {} -> {}",
        entry.framework, entry.control, entry.from, entry.to
    )
}

pub fn render_manual_score(framework: &str, score: &ScoreResponse, use_color: bool) -> String {
    let color = level_color(score.risk_level);
    [
        format!("Framework: {}", style(framework, "1", use_color)),
        format!(
            "Risk Score: {}",
            style(&format!("{:.2}%", score.risk_score), color, use_color)
        ),
        format!(
            "Risk Level: {}",
            style(&score.risk_level.as_str().to_uppercase(), color, use_color)
        ),
    ]
    .join("\n")
}

pub fn render_controls(framework: &str, controls: &[&CatalogControl]) -> String {
    let id_width = controls
        .iter()
        .map(|control| control.id.len())
        .max()
        .unwrap_or(0)
        .max("id".len());
    let domain_width = controls
        .iter()
        .map(|control| control.domain.len())
        .max()
        .unwrap_or(0)
        .max("domain".len());

    let mut lines = vec![
        format!("{} controls: {}", framework_label(framework), controls.len()),
        format!("{:<id_width$}  {:<domain_width$}  title", "id", "domain"),
    ];
    for control in controls {
        lines.push(format!(
            "{:<id_width$}  {:<domain_width$}  {}",
            control.id, control.domain, control.title
        ));
    }
    lines.join("\n")
}

/// Scores print like `50.0%` or `37.5%`.
fn percent(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{score:.1}%")
    } else {
        format!("{score}%")
    }
}

fn level_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "32",
        RiskLevel::Medium => "33",
        RiskLevel::High => "38;5;208",
        RiskLevel::Critical => "31",
    }
}

fn status_color(status: Status) -> &'static str {
    match status {
        Status::Implemented => "32",
        Status::Partial => "33",
        Status::Missing => "31",
    }
}

fn style(value: &str, ansi_code: &str, use_color: bool) -> String {
    if use_color {
        return format!("\x1b[{ansi_code}m{value}\x1b[0m");
    }

    value.to_string()
}

#[cfg(test)]
#[path = "tests/report.rs"]
mod tests;
