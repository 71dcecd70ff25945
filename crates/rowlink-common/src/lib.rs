//! Rowlink Common - Shared types, errors, and configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::ClientConfig;
pub use error::{AttemptFailure, Result, RowlinkError, ServiceErrorCode};
pub use types::{
    ColumnDesc, ColumnType, Location, Plan, ProtocolVersion, Record, Request, RowBatch, Schema,
    SessionHandle, Task, TaskId, Value,
};
