// src/invoker/mod.rs

use crate::error::InvokeError;
use crate::prompt::PromptPair;
use std::time::Duration;

pub mod process;
pub use process::LlmCommand;

/// What the inference tool left behind after it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Per-call switches passed to the inference tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvokeOptions {
    pub no_stream: bool,
    pub no_log: bool,
    /// Ask the tool to pull a structured record out of the model reply.
    pub extract: bool,
    /// `None` waits for the tool however long it takes.
    pub timeout: Option<Duration>,
}

/// Runs one inference call. Exactly one attempt, no retries.
pub trait Invoker {
    fn invoke(
        &self,
        prompts: &PromptPair,
        options: &InvokeOptions,
    ) -> Result<InvocationResult, InvokeError>;
}

impl<T: Invoker + ?Sized> Invoker for &T {
    fn invoke(
        &self,
        prompts: &PromptPair,
        options: &InvokeOptions,
    ) -> Result<InvocationResult, InvokeError> {
        (**self).invoke(prompts, options)
    }
}
