use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "JARVIS_LLM_LOG";

fn main() -> ExitCode {
    // Diagnostics go to stderr; stdout carries the result only.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();

    jarvis_llm::run()
}
