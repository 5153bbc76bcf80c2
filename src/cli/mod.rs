// src/cli/mod.rs

use crate::config::Config;
use crate::error::InputError;
use crate::handler::{Handler, unexpected};
use crate::interpreter::OperationKind;
use crate::invoker::LlmCommand;
use crate::prompt::{ExplanationRequest, RefinementRequest, Request};
use crate::report::{Report, report, report_input_error};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "jarvis-llm",
    version,
    about = "Refine shell input and explain command results with an external LLM tool",
    after_help = "Examples:\n  jarvis-llm process --query 'list files'\n  jarvis-llm explain --command 'ls /nope' --status 2 --error 'No such file'\n  jarvis-llm failure --command 'make' --status 2 --error 'No rule to make target'"
)]
pub struct Args {
    #[arg(value_enum)]
    pub action: Action,
    #[arg(long, allow_hyphen_values = true, help = "Shell input to refine (process)")]
    pub query: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Command that was run (explain, failure)")]
    pub command: Option<String>,
    #[arg(long, allow_negative_numbers = true, help = "Exit status of the command")]
    pub status: Option<i32>,
    #[arg(long, allow_hyphen_values = true, help = "Captured standard output")]
    pub output: Option<String>,
    #[arg(long, allow_hyphen_values = true, help = "Captured standard error")]
    pub error: Option<String>,
    #[arg(long, value_name = "PATH", help = "TOML config file")]
    pub config: Option<PathBuf>,
    #[arg(long = "llm-bin", value_name = "PATH", help = "Inference tool executable")]
    pub llm_bin: Option<PathBuf>,
    #[arg(long, help = "Model passed to the inference tool")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    #[value(alias = "refine")]
    Process,
    Explain,
    Failure,
}

impl Action {
    pub fn kind(self) -> OperationKind {
        match self {
            Action::Process => OperationKind::Refine,
            Action::Explain => OperationKind::Explain,
            Action::Failure => OperationKind::Failure,
        }
    }
}

fn required_text(
    value: Option<&str>,
    field: &'static str,
    kind: OperationKind,
) -> Result<String, InputError> {
    match value {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(InputError {
            field,
            action: kind.action(),
        }),
    }
}

impl Args {
    /// Absent and empty values both count as missing.
    pub fn to_request(&self) -> Result<Request, InputError> {
        let kind = self.action.kind();
        if kind == OperationKind::Refine {
            return Ok(Request::Refine(RefinementRequest {
                query: required_text(self.query.as_deref(), "query", kind)?,
            }));
        }

        let command = required_text(self.command.as_deref(), "command", kind)?;
        let status = self.status.ok_or(InputError {
            field: "status",
            action: kind.action(),
        })?;
        let request = ExplanationRequest {
            command,
            status,
            output: self.output.clone().unwrap_or_default(),
            error: self.error.clone().unwrap_or_default(),
        };

        Ok(match kind {
            OperationKind::Failure => Request::Failure(request),
            _ => Request::Explain(request),
        })
    }
}

/// Validate, configure, run and report one action. `env` looks up environment variables.
pub fn dispatch<F>(args: &Args, env: F) -> Report
where
    F: Fn(&str) -> Option<String>,
{
    let kind = args.action.kind();

    let request = match args.to_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting request before invocation");
            return report_input_error(kind, &e);
        }
    };

    let mut config = match Config::load(args.config.as_deref(), env) {
        Ok(config) => config,
        Err(e) => return report(kind, &unexpected(&e)),
    };
    if let Some(program) = &args.llm_bin {
        config.program = program.clone();
    }
    if let Some(model) = &args.model {
        config.model = Some(model.clone());
    }

    let invoker = LlmCommand::from_config(&config);
    let handler = Handler::new(config, invoker);
    report(kind, &handler.handle(&request))
}
