pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod interpreter;
pub mod invoker;
pub mod prompt;
pub mod report;

use clap::Parser;
use report::Report;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

/// Parse the command line, run one action, print its result.
pub fn run() -> ExitCode {
    // Colour only ever goes to stderr, so stderr decides.
    colored::control::set_override(
        io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    );

    let args = cli::Args::parse();
    let report = cli::dispatch(&args, |key| std::env::var(key).ok());

    if let Err(e) = emit(&mut io::stdout().lock(), &report) {
        tracing::warn!(error = %e, "failed to write result");
    }
    ExitCode::from(report.exit_code)
}

/// Writes the report's output line. A reader that went away is not an error.
fn emit(out: &mut impl Write, report: &Report) -> io::Result<()> {
    if report.output.is_empty() {
        return Ok(());
    }
    match writeln!(out, "{}", report.output).and_then(|()| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
