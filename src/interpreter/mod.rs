// src/interpreter/mod.rs

use crate::invoker::InvocationResult;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

pub const INFERENCE_FAILED: &str = "inference command failed";
pub const EMPTY_EXPLANATION: &str = "inference tool returned an empty explanation";

/// A record wrapped in a single markdown fence, e.g. ```json {...} ```.
static FENCED_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z]*\s*(\{.*\})\s*```\z").expect("fence pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Refine,
    Explain,
    Failure,
}

impl OperationKind {
    /// Name used on the command line and in error messages.
    pub fn action(self) -> &'static str {
        match self {
            OperationKind::Refine => "process",
            OperationKind::Explain => "explain",
            OperationKind::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// Structured answer expected from the tool for refinement requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RefinementRecord {
    #[serde(default)]
    pub is_command: bool,
    pub refined: String,
    #[serde(default)]
    pub explanation: String,
}

pub fn interpret(result: &InvocationResult, kind: OperationKind) -> Outcome {
    if result.exit_code != 0 {
        let stderr = result.stderr.trim();
        tracing::debug!(exit_code = result.exit_code, "inference tool exited non-zero");
        return Outcome::Failure(if stderr.is_empty() {
            INFERENCE_FAILED.to_string()
        } else {
            stderr.to_string()
        });
    }

    match kind {
        OperationKind::Refine => interpret_refinement(&result.stdout),
        OperationKind::Explain | OperationKind::Failure => interpret_explanation(&result.stdout),
    }
}

fn interpret_refinement(stdout: &str) -> Outcome {
    let Some(record) = parse_record(stdout.trim()) else {
        return Outcome::Failure(String::new());
    };

    let refined = record.refined.trim();
    if refined.is_empty() {
        tracing::debug!("refinement record has an empty `refined` field");
        return Outcome::Failure(String::new());
    }

    // Both branches carry the command to run in `refined`.
    tracing::debug!(
        is_command = record.is_command,
        explanation = %record.explanation,
        "refinement record accepted"
    );
    Outcome::Success(refined.to_string())
}

fn interpret_explanation(stdout: &str) -> Outcome {
    let explanation = stdout.trim();
    if explanation.is_empty() {
        Outcome::Failure(EMPTY_EXPLANATION.to_string())
    } else {
        Outcome::Success(explanation.to_string())
    }
}

fn parse_record(raw: &str) -> Option<RefinementRecord> {
    let parsed = serde_json::from_str::<RefinementRecord>(raw).or_else(|err| {
        match FENCED_RECORD.captures(raw).and_then(|c| c.get(1)) {
            Some(inner) => serde_json::from_str(inner.as_str()),
            None => Err(err),
        }
    });

    match parsed {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(error = %e, "refinement record is malformed");
            None
        }
    }
}
