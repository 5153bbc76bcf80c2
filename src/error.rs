// src/error.rs

use std::time::Duration;

/// A required field was missing at the process boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} required for {action} action")]
pub struct InputError {
    pub field: &'static str,
    pub action: &'static str,
}

/// Failures of the inference subprocess that never produced an exit status.
///
/// A non-zero exit is not an error here: it is captured in the
/// `InvocationResult` and interpreted like any other response.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` timed out after {}s", .after.as_secs())]
    Timeout { program: String, after: Duration },
    #[error("`{program}` returned non-utf8 {stream}")]
    NonUtf8 {
        program: String,
        stream: &'static str,
    },
    #[error("failed while waiting for `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
