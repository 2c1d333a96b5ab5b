//! Strict validation of a raw assessment document.
//!
//! Loading is permissive; this is the opt-in check that reports everything loading would
//! silently coerce or drop.

use cyber_compliance_core::{FrameworkRegistry, Status};
use serde_json::Value;

/// Returns every problem found, in document order. An empty list means the document is valid.
pub fn validate_assessment(document: &Value, frameworks: &FrameworkRegistry) -> Vec<String> {
    let Value::Object(root) = document else {
        return vec!["assessment must be a JSON object".to_string()];
    };

    let entries = match root.get("frameworks") {
        None => return vec!["missing required key: frameworks".to_string()],
        Some(Value::Object(entries)) => entries,
        Some(_) => return vec!["frameworks must be an object".to_string()],
    };

    let mut errors = Vec::new();
    for (framework, entry) in entries {
        if !frameworks.contains(framework) {
            errors.push(format!("unsupported framework key: {framework}"));
            continue;
        }
        let Value::Object(entry) = entry else {
            errors.push(format!("framework entry for {framework} must be an object"));
            continue;
        };

        let statuses = match entry.get("statuses") {
            None => continue,
            Some(Value::Object(statuses)) => statuses,
            Some(_) => {
                errors.push(format!("{framework}.statuses must be an object"));
                continue;
            }
        };

        for (control, status) in statuses {
            if control.trim().is_empty() {
                errors.push(format!("{framework}.statuses contains empty/invalid control key"));
            }
            let raw = match status {
                Value::String(raw) => raw.clone(),
                other => other.to_string(),
            };
            if raw.trim() != raw || Status::parse_strict(&raw).is_none() {
                errors.push(format!(
                    "{framework}.statuses[{control}] invalid status '{raw}' (allowed: implemented|partial|missing)"
                ));
            }
        }
    }
    errors
}
