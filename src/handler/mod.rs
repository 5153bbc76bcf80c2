// src/handler/mod.rs

use crate::config::Config;
use crate::interpreter::{self, Outcome};
use crate::invoker::Invoker;
use crate::prompt::{self, Request};
use colored::Colorize;
use std::io::IsTerminal;

pub const LLM_ERROR_PREFIX: &str = "LLM error: ";

/// Runs one request through prompt building, invocation and interpretation.
pub struct Handler<I: Invoker> {
    config: Config,
    invoker: I,
}

impl<I: Invoker> Handler<I> {
    pub fn new(config: Config, invoker: I) -> Self {
        Self { config, invoker }
    }

    /// Every path ends in an `Outcome`; nothing escapes as an error.
    pub fn handle(&self, request: &Request) -> Outcome {
        let kind = request.kind();
        let prompts = prompt::build(request);
        let options = self.config.options_for(kind);

        match self.invoker.invoke(&prompts, &options) {
            Ok(result) => {
                let outcome = interpreter::interpret(&result, kind);
                tracing::debug!(
                    action = kind.action(),
                    exit_code = result.exit_code,
                    success = outcome.is_success(),
                    "inference finished"
                );
                outcome
            }
            Err(e) => unexpected(&e),
        }
    }
}

/// Turns an unexpected failure into a `Failure` and echoes it on stderr.
pub fn unexpected(cause: &dyn std::fmt::Display) -> Outcome {
    let message = format!("{LLM_ERROR_PREFIX}{cause:#}");
    tracing::warn!(error = %cause, "inference pipeline failed");
    eprintln!("{}", paint(&message, std::io::stderr().is_terminal()));
    Outcome::Failure(message)
}

fn paint(message: &str, terminal: bool) -> String {
    if terminal {
        message.red().to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvokeError;
    use crate::invoker::{InvocationResult, InvokeOptions};
    use crate::prompt::{ExplanationRequest, PromptPair, RefinementRequest};
    use std::cell::RefCell;
    use std::time::Duration;

    struct StubInvoker {
        reply: Result<InvocationResult, fn() -> InvokeError>,
        calls: RefCell<Vec<(PromptPair, InvokeOptions)>>,
    }

    impl StubInvoker {
        fn replying(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            Self {
                reply: Ok(InvocationResult {
                    exit_code,
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                }),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> InvokeError) -> Self {
            Self {
                reply: Err(err),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Invoker for StubInvoker {
        fn invoke(
            &self,
            prompts: &PromptPair,
            options: &InvokeOptions,
        ) -> Result<InvocationResult, InvokeError> {
            self.calls.borrow_mut().push((prompts.clone(), *options));
            match &self.reply {
                Ok(result) => Ok(result.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn refine(query: &str) -> Request {
        Request::Refine(RefinementRequest {
            query: query.into(),
        })
    }

    fn explain_ls_nope() -> Request {
        Request::Explain(ExplanationRequest {
            command: "ls /nope".into(),
            status: 2,
            output: String::new(),
            error: "No such file".into(),
        })
    }

    #[test]
    fn refine_list_files() {
        let stub = StubInvoker::replying(
            0,
            r#"{"is_command": false, "refined": "ls -la", "explanation": "added -la for details"}"#,
            "",
        );
        let handler = Handler::new(Config::default(), &stub);

        let outcome = handler.handle(&refine("list files"));

        assert_eq!(outcome, Outcome::Success("ls -la".into()));
        let calls = stub.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.user, "Process this shell input: list files");
        assert!(calls[0].1.extract);
        assert_eq!(calls[0].1.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn explain_missing_path() {
        let stub = StubInvoker::replying(0, "The path does not exist.\n", "");
        let handler = Handler::new(Config::default(), &stub);

        let outcome = handler.handle(&explain_ls_nope());

        assert_eq!(outcome, Outcome::Success("The path does not exist.".into()));
        let calls = stub.calls.borrow();
        assert!(calls[0].0.user.contains("Output: \n"));
        assert!(!calls[0].1.extract);
        assert_eq!(calls[0].1.timeout, None);
    }

    #[test]
    fn tool_failure_carries_stderr() {
        let stub = StubInvoker::replying(1, "", "Error: No key found\n");
        let handler = Handler::new(Config::default(), &stub);
        assert_eq!(
            handler.handle(&explain_ls_nope()),
            Outcome::Failure("Error: No key found".into())
        );
    }

    #[test]
    fn invoke_errors_are_prefixed() {
        let stub = StubInvoker::failing(|| InvokeError::Timeout {
            program: "llm".into(),
            after: Duration::from_secs(30),
        });
        let handler = Handler::new(Config::default(), &stub);

        let outcome = handler.handle(&refine("list files"));

        assert_eq!(
            outcome,
            Outcome::Failure("LLM error: `llm` timed out after 30s".into())
        );
    }

    #[test]
    fn spawn_failure_becomes_outcome() {
        let stub = StubInvoker::failing(|| InvokeError::Spawn {
            program: "llm".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        let handler = Handler::new(Config::default(), &stub);

        match handler.handle(&explain_ls_nope()) {
            Outcome::Failure(message) => {
                assert!(message.starts_with("LLM error: failed to start `llm`"), "{message}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn configured_timeouts_reach_the_invoker() {
        let stub = StubInvoker::replying(0, "fine", "");
        let mut config = Config::default();
        config.timeouts.failure_secs = 12;
        let handler = Handler::new(config, &stub);

        let request = match explain_ls_nope() {
            Request::Explain(req) => Request::Failure(req),
            other => other,
        };
        handler.handle(&request);

        assert_eq!(
            stub.calls.borrow()[0].1.timeout,
            Some(Duration::from_secs(12))
        );
    }

    #[test]
    fn echo_is_plain_off_a_terminal() {
        colored::control::set_override(true);
        assert_eq!(paint("LLM error: boom", false), "LLM error: boom");
        assert_eq!(paint("LLM error: boom", true), "\u{1b}[31mLLM error: boom\u{1b}[0m");
    }
}
