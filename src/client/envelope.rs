use serde_json::{Map, Value};

use super::{Operation, ToolError, ToolFailure};

/// Code for responses that are not JSON objects. Treated as a protocol failure.
pub const NON_OBJECT_RESPONSE: &str = "NON_OBJECT_RESPONSE";
/// Code used when a failure is reported without one.
pub const TOOL_ERROR: &str = "TOOL_ERROR";

const OK_KEY: &str = "ok";
const ERROR_KEY: &str = "error";

#[derive(Debug, Clone, PartialEq)]
pub enum ResultEnvelope {
    Ok(Map<String, Value>),
    Err { code: String, message: String },
}

/// Normalizes a decoded response into an envelope.
///
/// `{"ok": true, ...}` yields the object without `ok`; an object with neither `ok` nor
/// `error` is passed through whole; `ok` set to anything other than `true`, or an `error`
/// without `ok`, yields `Err`. Non-objects yield `Err` with [`NON_OBJECT_RESPONSE`].
pub fn unwrap_response(raw: Value) -> ResultEnvelope {
    let mut object = match raw {
        Value::Object(object) => object,
        other => {
            return ResultEnvelope::Err {
                code: NON_OBJECT_RESPONSE.to_string(),
                message: format!("expected a JSON object response, got {}", kind(&other)),
            };
        }
    };

    match object.remove(OK_KEY) {
        Some(Value::Bool(true)) => ResultEnvelope::Ok(object),
        Some(_) => error_envelope(object.get(ERROR_KEY)),
        None => match object.get(ERROR_KEY) {
            Some(error) if !error.is_null() => error_envelope(Some(error)),
            _ => ResultEnvelope::Ok(object),
        },
    }
}

impl ResultEnvelope {
    #[cfg(test)]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Converts into the client error taxonomy. Non-object responses become protocol failures.
    pub fn into_result(self, operation: Operation) -> Result<Map<String, Value>, ToolError> {
        match self {
            Self::Ok(payload) => Ok(payload),
            Self::Err { code, message } if code == NON_OBJECT_RESPONSE => {
                Err(ToolError::Protocol {
                    operation,
                    reason: message,
                })
            }
            Self::Err { code, message } => Err(ToolError::Tool {
                operation,
                failure: ToolFailure::new(code, message),
            }),
        }
    }
}

fn error_envelope(error: Option<&Value>) -> ResultEnvelope {
    match error {
        Some(Value::Object(details)) => {
            let code = match details.get("code") {
                Some(Value::String(code)) => code.clone(),
                Some(Value::Number(code)) => code.to_string(),
                _ => TOOL_ERROR.to_string(),
            };
            let message = details
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("tool reported a failure without a message")
                .to_string();
            ResultEnvelope::Err { code, message }
        }
        Some(Value::String(message)) => ResultEnvelope::Err {
            code: TOOL_ERROR.to_string(),
            message: message.clone(),
        },
        _ => ResultEnvelope::Err {
            code: TOOL_ERROR.to_string(),
            message: "tool reported a failure without details".to_string(),
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
