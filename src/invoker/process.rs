// src/invoker/process.rs

use crate::config::Config;
use crate::error::InvokeError;
use crate::invoker::{InvocationResult, InvokeOptions, Invoker};
use crate::prompt::PromptPair;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// The external inference tool, run as a subprocess.
///
/// Invoked as `program [args..] [-m model] [--no-stream] [--no-log] [--extract] -s <system> <user>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub model: Option<String>,
}

impl LlmCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            model: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            model: config.model.clone(),
        }
    }

    pub(crate) fn command_args(&self, prompts: &PromptPair, options: &InvokeOptions) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(model) = &self.model {
            args.push("-m".into());
            args.push(model.clone());
        }
        if options.no_stream {
            args.push("--no-stream".into());
        }
        if options.no_log {
            args.push("--no-log".into());
        }
        if options.extract {
            args.push("--extract".into());
        }
        args.push("-s".into());
        args.push(prompts.system.clone());
        args.push(prompts.user.clone());
        args
    }

    fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Default for LlmCommand {
    fn default() -> Self {
        Self::new("llm")
    }
}

impl Invoker for LlmCommand {
    fn invoke(
        &self,
        prompts: &PromptPair,
        options: &InvokeOptions,
    ) -> Result<InvocationResult, InvokeError> {
        let program = self.display_name();
        let io_err = |source| InvokeError::Io {
            program: program.clone(),
            source,
        };

        tracing::debug!(
            program = %program,
            timeout_secs = options.timeout.map(|t| t.as_secs()),
            extract = options.extract,
            "spawning inference tool"
        );

        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(prompts, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // A deadline needs a group to kill, so anything the tool starts goes down with it.
        #[cfg(unix)]
        if options.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| InvokeError::Spawn {
            program: program.clone(),
            source,
        })?;

        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
        let (tx, rx) = mpsc::channel();
        drain(Stream::Stdout, child.stdout.take(), tx.clone());
        drain(Stream::Stderr, child.stderr.take(), tx);

        let status = match deadline {
            None => child.wait().map_err(io_err)?,
            Some(deadline) => match wait_until(&mut child, deadline) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    reap(&mut child);
                    return Err(timed_out(&program, options));
                }
                Err(source) => {
                    reap(&mut child);
                    return Err(io_err(source));
                }
            },
        };

        let (stdout, stderr) = match collect(&rx, deadline).map_err(io_err)? {
            Some(output) => output,
            None => {
                // The tool exited but something it started still holds the pipes.
                kill_group(&child);
                return Err(timed_out(&program, options));
            }
        };

        Ok(InvocationResult {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8(stdout).map_err(|_| InvokeError::NonUtf8 {
                program: program.clone(),
                stream: "stdout",
            })?,
            stderr: String::from_utf8(stderr).map_err(|_| InvokeError::NonUtf8 {
                program: program.clone(),
                stream: "stderr",
            })?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

type Chunk = (Stream, io::Result<Vec<u8>>);

fn timed_out(program: &str, options: &InvokeOptions) -> InvokeError {
    let after = options.timeout.unwrap_or_default();
    tracing::warn!(
        program = %program,
        timeout_secs = after.as_secs(),
        "inference tool timed out"
    );
    InvokeError::Timeout {
        program: program.to_string(),
        after,
    }
}

/// Polls the child until it exits or `deadline` passes. `Ok(None)` means it is still running.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// Kills the group led by `child`. A no-op when the child was not spawned as a group leader.
#[cfg(unix)]
fn kill_group(child: &Child) {
    // A group id is never reused while any member lives, so this cannot hit a stranger.
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn drain<R: Read + Send + 'static>(stream: Stream, pipe: Option<R>, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let result = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        let _ = tx.send((stream, result));
    });
}

/// Gathers both streams. `Ok(None)` means the deadline passed with a pipe still open.
fn collect(rx: &Receiver<Chunk>, deadline: Option<Instant>) -> io::Result<Option<(Vec<u8>, Vec<u8>)>> {
    let stopped = || io::Error::other("output reader stopped");
    let (mut stdout, mut stderr) = (None, None);
    while stdout.is_none() || stderr.is_none() {
        let (stream, bytes) = match deadline {
            None => rx.recv().map_err(|_| stopped())?,
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) => return Ok(None),
                    Err(RecvTimeoutError::Disconnected) => return Err(stopped()),
                }
            }
        };
        match stream {
            Stream::Stdout => stdout = Some(bytes?),
            Stream::Stderr => stderr = Some(bytes?),
        }
    }
    Ok(stdout.zip(stderr))
}
