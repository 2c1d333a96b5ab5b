use std::path::PathBuf;

use serde::Deserialize;

use crate::client::Transport;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ConfigOverlay {
    pub transport: Option<Transport>,
    pub server_command: Option<String>,
    pub org_type: Option<String>,
    pub assessment_file: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub report: Option<ReportOverlay>,
    pub evaluator: Option<EvaluatorOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct ReportOverlay {
    pub max_priority_actions: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct EvaluatorOverlay {
    pub max_gaps: Option<usize>,
}
