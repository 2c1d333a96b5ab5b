use super::*;
use crate::client::stub::{StubLauncher, StubReply, text_result};
use crate::client::{Operation, SubprocessClient, TOOL_ERROR, Transport};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;

type Script = fn(Operation, &Value) -> Value;

struct ScriptedClient {
    script: Script,
    calls: Mutex<Vec<(Operation, Value)>>,
}

impl ScriptedClient {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(Operation, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn arguments_for(&self, operation: Operation) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(called, _)| *called == operation)
            .map(|(_, arguments)| arguments)
            .collect()
    }
}

#[async_trait]
impl ToolClient for ScriptedClient {
    fn transport(&self) -> Transport {
        Transport::Direct
    }

    async fn invoke(&self, operation: Operation, arguments: Value) -> Result<Value, ToolError> {
        let response = (self.script)(operation, &arguments);
        self.calls
            .lock()
            .expect("calls lock")
            .push((operation, arguments));
        Ok(response)
    }
}

fn evaluator(client: Arc<dyn ToolClient>) -> ComplianceEvaluator {
    ComplianceEvaluator::new(client, FrameworkRegistry::standard())
}

fn store_with(framework: &str, entries: &[(&str, &str)]) -> StatusStore {
    let mut store = StatusStore::default();
    for (control, status) in entries {
        store.set(framework, control, status);
    }
    store
}

fn checklist_of(controls: &[&str]) -> Value {
    let checklist = controls
        .iter()
        .map(|control| json!({ "control": control, "status": "implemented" }))
        .collect::<Vec<_>>();
    json!({ "ok": true, "framework": "nist_csf", "org_type": "saas", "checklist": checklist })
}

fn fixed_score() -> Value {
    json!({
        "ok": true,
        "risk_score": 50.0,
        "risk_level": "high",
        "controls_total": 2,
        "missing": 1,
        "partial": 1,
        "implemented": 0,
    })
}

#[tokio::test]
async fn rejected_checklist_yields_degraded_summary() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => json!({
            "ok": false,
            "error": { "code": "INVALID_ORG_TYPE", "message": "unsupported organization type 'casino'" }
        }),
        _ => panic!("no further calls expected after a rejected checklist"),
    });

    let summary = evaluator(client.clone())
        .summarize("nist_csf", &StatusStore::default(), "casino")
        .await
        .expect("degraded summary");

    assert_eq!(summary.risk_score, 100.0);
    assert_eq!(summary.risk_level, RiskLevel::Critical);
    assert_eq!(
        (summary.implemented, summary.partial, summary.missing, summary.controls_total),
        (0, 0, 0, 0)
    );
    assert!(summary.is_degraded());
    let failure = summary.error.expect("recorded error");
    assert_eq!(failure.code, "INVALID_ORG_TYPE");
    assert!(failure.hint.is_some());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn legacy_checklist_error_object_is_degraded_too() {
    let client = ScriptedClient::new(|_, _| json!({ "error": "Unsupported org_type" }));
    let summary = evaluator(client)
        .summarize("soc2", &StatusStore::default(), "casino")
        .await
        .expect("degraded summary");

    assert_eq!(summary.risk_level, RiskLevel::Critical);
    assert_eq!(summary.error.map(|failure| failure.code), Some(TOOL_ERROR.to_string()));
}

#[tokio::test]
async fn checklist_protocol_failure_is_not_degraded() {
    let client = ScriptedClient::new(|_, _| json!("not an object"));
    let err = evaluator(client)
        .summarize("soc2", &StatusStore::default(), "saas")
        .await
        .expect_err("protocol failure");
    assert!(matches!(err, ToolError::Protocol { .. }));
}

#[tokio::test]
async fn subprocess_score_fields_pass_through_unchanged() {
    let launcher = StubLauncher::new(|name, _| match name {
        "generate_checklist" => text_result(checklist_of(&["A", "B"])),
        "calculate_risk_score" => text_result(fixed_score()),
        "recommend_next_actions" => text_result(json!({
            "ok": true,
            "framework": "nist_csf",
            "recommended_actions": ["Close gap A"],
        })),
        _ => StubReply::RpcError(-32601, "unknown tool"),
    });
    let client: Arc<dyn ToolClient> = Arc::new(SubprocessClient::with_launcher(launcher));

    let store = store_with("nist_csf", &[("A", "missing"), ("B", "partial")]);
    let summary = evaluator(client)
        .summarize("nist_csf", &store, "saas")
        .await
        .expect("summary");

    assert_eq!(summary.risk_score, 50.0);
    assert_eq!(summary.risk_level, RiskLevel::High);
    assert_eq!(summary.controls_total, 2);
    assert_eq!(summary.missing, 1);
    assert_eq!(summary.partial, 1);
    assert_eq!(summary.implemented, 0);
    assert_eq!(summary.recommended_actions, vec!["Close gap A"]);
    assert!(!summary.is_degraded());
}

#[tokio::test]
async fn recorded_statuses_override_checklist_baseline() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => checklist_of(&["A", "B", "C"]),
        Operation::Score => fixed_score(),
        Operation::Recommend => json!({ "ok": true, "recommended_actions": [] }),
    });

    let store = store_with("nist_csf", &[("A", "implemented"), ("B", "partial")]);
    let summary = evaluator(client.clone())
        .summarize("nist_csf", &store, "saas")
        .await
        .expect("summary");

    let statuses = summary
        .controls
        .iter()
        .map(|control| (control.control.as_str(), control.status))
        .collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![
            ("A", Status::Implemented),
            ("B", Status::Partial),
            ("C", Status::Missing),
        ]
    );

    let score_arguments = client.arguments_for(Operation::Score);
    assert_eq!(
        score_arguments,
        vec![json!({ "controls": [
            { "control": "A", "status": "implemented" },
            { "control": "B", "status": "partial" },
            { "control": "C", "status": "missing" },
        ]})]
    );
}

#[tokio::test]
async fn gaps_are_first_four_missing_in_checklist_order() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => checklist_of(&["C1", "C2", "C3", "C4", "C5", "C6", "C7"]),
        Operation::Score => fixed_score(),
        Operation::Recommend => json!({ "ok": true, "recommended_actions": ["act"] }),
    });

    let store = store_with("nist_csf", &[("C2", "implemented"), ("C4", "partial")]);
    evaluator(client.clone())
        .summarize("nist_csf", &store, "saas")
        .await
        .expect("summary");

    assert_eq!(
        client.arguments_for(Operation::Recommend),
        vec![json!({ "framework": "nist_csf", "gaps": ["C1", "C3", "C5", "C6"] })]
    );
}

#[tokio::test]
async fn omitted_score_fields_fall_back_to_worst_case() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => checklist_of(&["A", "B", "C"]),
        Operation::Score => json!({ "ok": true }),
        Operation::Recommend => json!({ "ok": true, "recommended_actions": [] }),
    });

    let summary = evaluator(client)
        .summarize("nist_csf", &StatusStore::default(), "saas")
        .await
        .expect("summary");

    assert_eq!(summary.risk_score, 100.0);
    assert_eq!(summary.risk_level, RiskLevel::Critical);
    assert_eq!(summary.controls_total, 3);
    assert_eq!((summary.implemented, summary.partial, summary.missing), (0, 0, 0));
}

#[tokio::test]
async fn score_failure_propagates() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => checklist_of(&["A"]),
        Operation::Score => json!({
            "ok": false,
            "error": { "code": "DUPLICATE_ID", "message": "control 'A' appears more than once" }
        }),
        Operation::Recommend => panic!("recommend must not run after a score failure"),
    });

    let err = evaluator(client)
        .summarize("nist_csf", &StatusStore::default(), "saas")
        .await
        .expect_err("score failure");
    match err {
        ToolError::Tool { operation, failure } => {
            assert_eq!(operation, Operation::Score);
            assert_eq!(failure.code, "DUPLICATE_ID");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn recommend_failure_propagates() {
    let client = ScriptedClient::new(|operation, _| match operation {
        Operation::Checklist => checklist_of(&["A"]),
        Operation::Score => fixed_score(),
        Operation::Recommend => json!({
            "ok": false,
            "error": { "code": "NOT_FOUND", "message": "control 'A' not found" }
        }),
    });

    let err = evaluator(client)
        .summarize("nist_csf", &StatusStore::default(), "saas")
        .await
        .expect_err("recommend failure");
    assert!(matches!(
        err,
        ToolError::Tool { operation: Operation::Recommend, .. }
    ));
}

#[tokio::test]
async fn summarize_all_dedupes_and_truncates_priority_actions() {
    let client = ScriptedClient::new(|operation, arguments| match operation {
        Operation::Checklist => checklist_of(&["A"]),
        Operation::Score => fixed_score(),
        Operation::Recommend => {
            let actions = match arguments["framework"].as_str() {
                Some("nist_csf") => json!(["mfa", "inventory", "logging"]),
                Some("iso27001") => json!(["inventory", "backups"]),
                Some("soc2") => json!(["mfa", "vendors", "training"]),
                _ => json!(["encryption", "hardening"]),
            };
            json!({ "ok": true, "recommended_actions": actions })
        }
    });

    let overview = evaluator(client.clone())
        .summarize_all(&StatusStore::default(), "saas")
        .await
        .expect("overview");

    let order = overview
        .frameworks
        .iter()
        .map(|summary| summary.framework.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["nist_csf", "iso27001", "soc2", "cis_v8"]);
    assert_eq!(
        overview.priority_actions,
        vec!["mfa", "inventory", "logging", "backups", "vendors", "training"]
    );
    assert_eq!(client.arguments_for(Operation::Checklist).len(), 4);
}

#[tokio::test]
async fn summarize_all_keeps_degraded_frameworks() {
    let client = ScriptedClient::new(|operation, arguments| match operation {
        Operation::Checklist if arguments["framework"] == "soc2" => json!({
            "ok": false,
            "error": { "code": "INVALID_FRAMEWORK", "message": "unsupported framework 'soc2'" }
        }),
        Operation::Checklist => checklist_of(&["A"]),
        Operation::Score => fixed_score(),
        Operation::Recommend => json!({ "ok": true, "recommended_actions": ["mfa"] }),
    });

    let overview = evaluator(client)
        .summarize_all(&StatusStore::default(), "saas")
        .await
        .expect("overview");

    let degraded = overview
        .frameworks
        .iter()
        .filter(|summary| summary.is_degraded())
        .map(|summary| summary.framework.as_str())
        .collect::<Vec<_>>();
    assert_eq!(degraded, vec!["soc2"]);
    assert_eq!(overview.priority_actions, vec!["mfa"]);
}

#[test]
fn priority_actions_honor_custom_limit() {
    let summary = |actions: &[&str]| {
        let mut summary = FrameworkSummary::degraded(
            "nist_csf",
            "saas",
            crate::client::ToolFailure::new("X", "m"),
        );
        summary.recommended_actions = actions.iter().map(|value| value.to_string()).collect();
        summary
    };

    let summaries = vec![summary(&["a", "b"]), summary(&["b", "c", "d"])];
    assert_eq!(priority_actions(&summaries, 3), vec!["a", "b", "c"]);
    assert_eq!(priority_actions(&summaries, 10), vec!["a", "b", "c", "d"]);
}
