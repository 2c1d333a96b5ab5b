//! Configuration loading and merge logic for `cyber-compliance`.
//!
//! Global config and project-local config are merged with project values taking precedence.
//! Command-line flags are applied on top by the caller.

mod overlay;

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use cyber_compliance_catalog::DEFAULT_ORG_TYPE;
use serde::{Deserialize, Serialize};

use crate::client::Transport;

use self::overlay::ConfigOverlay;

/// Default MCP server command for the subprocess transport.
pub const DEFAULT_SERVER_COMMAND: &str = "cyber-compliance serve --mcp";
/// Catalog file override read after config files. The subprocess transport sets it on the server
/// it launches, so both transports score against the same catalog.
pub const CATALOG_PATH_ENV: &str = "CYBER_COMPLIANCE_CATALOG_PATH";
/// Default assessment file, relative to the working directory.
pub const DEFAULT_ASSESSMENT_FILE: &str = "assessment.json";
/// Default number of missing controls sent to the recommender per framework.
pub const DEFAULT_MAX_GAPS: usize = 4;
/// Default number of global priority actions.
pub const DEFAULT_MAX_PRIORITY_ACTIONS: usize = 6;

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// How tool calls reach the catalog/scoring service.
    pub transport: Transport,
    /// Server command for the subprocess transport, split on whitespace.
    pub server_command: String,
    /// Organization type used to filter checklists.
    pub org_type: String,
    /// Assessment JSON file.
    pub assessment_file: PathBuf,
    /// Optional catalog JSON file for the direct transport. Built-in catalog when unset.
    pub catalog_path: Option<PathBuf>,
    pub report: ReportConfig,
    pub evaluator: EvaluatorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Upper bound on global priority actions.
    pub max_priority_actions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Upper bound on gaps passed to the recommender per framework.
    pub max_gaps: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_priority_actions: DEFAULT_MAX_PRIORITY_ACTIONS,
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_gaps: DEFAULT_MAX_GAPS,
        }
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            server_command: DEFAULT_SERVER_COMMAND.to_string(),
            org_type: DEFAULT_ORG_TYPE.to_string(),
            assessment_file: PathBuf::from(DEFAULT_ASSESSMENT_FILE),
            catalog_path: None,
            report: ReportConfig::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl ComplianceConfig {
    /// Loads and merges global + project configuration from default paths.
    ///
    /// # Errors
    ///
    /// Returns an error if any discovered config file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_with_paths(global_config_path(), project_config_path())?;
        config.apply_catalog_env(env::var_os(CATALOG_PATH_ENV));
        Ok(config)
    }

    fn apply_catalog_env(&mut self, value: Option<OsString>) {
        if let Some(path) = value.filter(|value| !value.is_empty()) {
            self.catalog_path = Some(PathBuf::from(path));
        }
    }

    #[cfg(test)]
    fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        Self::load_with_paths(Some(path.to_path_buf()), None)
    }

    fn load_with_paths(global: Option<PathBuf>, project: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(path) = global {
            config.merge_from_path(&path)?;
        }
        if let Some(path) = project {
            config.merge_from_path(&path)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.transport == Transport::Subprocess && self.server_command.trim().is_empty() {
            bail!("server_command must not be empty when transport is subprocess");
        }
        if self.org_type.trim().is_empty() {
            bail!("org_type must not be empty");
        }
        Ok(())
    }

    fn merge_from_path(&mut self, path: &Path) -> anyhow::Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        let overlay: ConfigOverlay = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file at {}", path.display()))?;
        tracing::debug!(path = %path.display(), "merged config file");
        self.apply_overlay(overlay);
        Ok(())
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(value) = overlay.transport {
            self.transport = value;
        }
        if let Some(value) = overlay.server_command {
            self.server_command = value;
        }
        if let Some(value) = overlay.org_type {
            self.org_type = normalize_org_type(&value);
        }
        if let Some(value) = overlay.assessment_file {
            self.assessment_file = value;
        }
        if let Some(value) = overlay.catalog_path {
            self.catalog_path = Some(value);
        }
        if let Some(value) = overlay.report
            && let Some(max_priority_actions) = value.max_priority_actions
        {
            self.report.max_priority_actions =
                sanitize_positive_usize(max_priority_actions, DEFAULT_MAX_PRIORITY_ACTIONS);
        }
        if let Some(value) = overlay.evaluator
            && let Some(max_gaps) = value.max_gaps
        {
            self.evaluator.max_gaps = sanitize_positive_usize(max_gaps, DEFAULT_MAX_GAPS);
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os("CYBER_COMPLIANCE_CONFIG_GLOBAL_PATH") {
        return Some(PathBuf::from(explicit));
    }

    let home = env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)?;

    Some(
        home.join(".config")
            .join("cyber-compliance")
            .join("config.toml"),
    )
}

fn project_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os("CYBER_COMPLIANCE_CONFIG_PROJECT_PATH") {
        return Some(PathBuf::from(explicit));
    }

    let cwd = env::current_dir().ok()?;
    Some(cwd.join(".cyber-compliance.toml"))
}

pub(crate) fn normalize_org_type(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn sanitize_positive_usize(value: usize, fallback: usize) -> usize {
    if value == 0 { fallback } else { value }
}

#[cfg(test)]
#[path = "../tests/config.rs"]
mod tests;
