// src/report/mod.rs

use crate::error::InputError;
use crate::interpreter::{OperationKind, Outcome};
use serde::Serialize;
use serde_json::{Value, json};

/// What the process prints on stdout and the code it exits with.
/// An empty `output` prints nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct ExplanationRecord<'a> {
    success: bool,
    explanation: Option<&'a str>,
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct InputErrorRecord {
    success: bool,
    error: String,
}

/// Refinement is silent on failure and only the exit code tells.
/// Explanations always print a record and always exit 0.
pub fn report(kind: OperationKind, outcome: &Outcome) -> Report {
    match (kind, outcome) {
        (OperationKind::Refine, Outcome::Success(command)) => Report {
            exit_code: 0,
            output: command.clone(),
        },
        (OperationKind::Refine, Outcome::Failure(_)) => Report {
            exit_code: 1,
            output: String::new(),
        },
        (_, Outcome::Success(explanation)) => Report {
            exit_code: 0,
            output: serialize(
                &ExplanationRecord {
                    success: true,
                    explanation: Some(explanation.as_str()),
                    error: None,
                },
                explanation_error,
            ),
        },
        (_, Outcome::Failure(error)) => Report {
            exit_code: 0,
            output: serialize(
                &ExplanationRecord {
                    success: false,
                    explanation: None,
                    error: Some(error.as_str()),
                },
                explanation_error,
            ),
        },
    }
}

/// A non-zero exit for `process` keeps the calling shell from running the record.
pub fn report_input_error(kind: OperationKind, err: &InputError) -> Report {
    Report {
        exit_code: if kind == OperationKind::Refine { 1 } else { 0 },
        output: serialize(
            &InputErrorRecord {
                success: false,
                error: err.to_string(),
            },
            input_error,
        ),
    }
}

/// `fallback` rebuilds the same record shape around the serializer's error.
fn serialize<T: Serialize>(record: &T, fallback: fn(String) -> Value) -> String {
    serde_json::to_string(record).unwrap_or_else(|e| fallback(e.to_string()).to_string())
}

fn explanation_error(error: String) -> Value {
    json!({"success": false, "explanation": null, "error": error})
}

fn input_error(error: String) -> Value {
    json!({"success": false, "error": error})
}
