//! Rowlink error types.

use thiserror::Error;

use crate::types::Location;

/// Error code reported by the planner or worker service alongside a
/// rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ServiceErrorCode {
    InvalidRequest,
    InvalidTask,
    InvalidHandle,
    NotSupported,
    OutOfRange,
    Internal,
}

impl std::fmt::Display for ServiceErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One failed connection attempt recorded by the worker selector.
#[derive(Debug)]
pub struct AttemptFailure {
    pub location: Location,
    pub reason: Box<RowlinkError>,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.reason)
    }
}

fn format_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum RowlinkError {
    /// The transport could not be established or was lost mid-call.
    /// Safe to retry against another candidate or a fresh connection.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint is reachable but does not speak the expected
    /// protocol (wrong service, incompatible version, malformed frame).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The service executed the call and rejected it. Propagated
    /// unchanged; never retried by this layer.
    #[error("service error ({code}): {message}")]
    Service {
        code: ServiceErrorCode,
        message: String,
        detail: Option<String>,
    },

    /// The worker refused to open the task.
    #[error("task rejected by worker: {message}")]
    TaskRejected { message: String },

    /// A call was made on a connection that is not open. Caller bug.
    #[error("client not connected")]
    NotConnected,

    /// `next()` was called on a terminal fetch session. Caller bug.
    #[error("fetch session is closed")]
    SessionClosed,

    /// Every candidate location for a task failed. Carries one reason
    /// per attempted location.
    #[error("no reachable worker after {} attempt(s): {}", .0.len(), format_attempts(.0))]
    NoReachableWorker(Vec<AttemptFailure>),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RowlinkError {
    /// Whether a retry against a different endpoint could succeed.
    pub fn is_transport(&self) -> bool {
        matches!(self, RowlinkError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, RowlinkError>;
