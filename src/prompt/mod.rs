// src/prompt/mod.rs

use crate::interpreter::OperationKind;

const REFINE_SYSTEM_PROMPT: &str = r#"You are a shell command processor. The user gives you a line typed into a shell. It is either already a valid shell command, or a natural-language request or a mistyped command that must be turned into one.

Respond with ONLY a JSON object in this exact format:
{"is_command": true, "refined": "<the shell command to run>", "explanation": "<one short sentence>"}

- "is_command": true if the input was already a valid command, false if you had to write or correct it.
- "refined": the command to run. Never leave it empty; repeat the input when it is already valid.
- "explanation": what the command does, or what you changed.

Do not wrap the JSON in markdown code fences. Do not add any text before or after the JSON object."#;

const EXPLAIN_SYSTEM_PROMPT: &str = "You are a shell command expert. Explain command execution results in a clear and concise way. Answer in plain text without markdown.";

const FAILURE_SYSTEM_PROMPT: &str = "You are a shell command expert. Explain why commands fail and suggest potential fixes. Answer in plain text without markdown.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinementRequest {
    pub query: String,
}

/// A finished command and what it produced.
///
/// `output` is ignored when the request is a failure analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRequest {
    pub command: String,
    pub status: i32,
    pub output: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Refine(RefinementRequest),
    Explain(ExplanationRequest),
    Failure(ExplanationRequest),
}

impl Request {
    pub fn kind(&self) -> OperationKind {
        match self {
            Request::Refine(_) => OperationKind::Refine,
            Request::Explain(_) => OperationKind::Explain,
            Request::Failure(_) => OperationKind::Failure,
        }
    }
}

/// System-role instruction plus the per-call user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub fn build(request: &Request) -> PromptPair {
    match request {
        Request::Refine(req) => PromptPair {
            system: REFINE_SYSTEM_PROMPT.into(),
            user: format!("Process this shell input: {}", req.query),
        },
        Request::Explain(req) => PromptPair {
            system: EXPLAIN_SYSTEM_PROMPT.into(),
            user: format!(
                "Explain this command execution result:\nCommand: {}\nStatus: {}\nOutput: {}\nError: {}",
                req.command, req.status, req.output, req.error
            ),
        },
        Request::Failure(req) => PromptPair {
            system: FAILURE_SYSTEM_PROMPT.into(),
            user: format!(
                "Explain why this command failed and suggest how to fix it:\nCommand: {}\nStatus: {}\nError: {}",
                req.command, req.status, req.error
            ),
        },
    }
}
