//! Logical RPC messages exchanged with the planner and worker services.
//!
//! One request/response enum pair per service. The enums are
//! externally tagged, so the `GetProtocolVersion` exchange encodes
//! identically for both services and negotiation does not need to know
//! which kind of endpoint it is talking to; [`VersionCall`] and
//! [`VersionReply`] are that shared prefix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rowlink_common::{
    Plan, ProtocolVersion, Request, RowBatch, RowlinkError, Schema, ServiceErrorCode,
    SessionHandle, Task,
};

/// Opaque connection parameters sent along with the version exchange.
/// The service interprets them; the client never does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiateParams {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl NegotiateParams {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }
}

/// A planning request as transmitted: the caller's request stamped with
/// the version negotiated on the connection that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanParams {
    pub request: Request,
    pub client_version: ProtocolVersion,
}

/// Parameters for opening a task on a worker. `fetch_size` is a
/// records-per-batch hint the worker may cap or ignore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTaskParams {
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_size: Option<usize>,
}

/// On-wire form of a service-declared rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFailure {
    pub code: ServiceErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<ServiceFailure> for RowlinkError {
    fn from(f: ServiceFailure) -> Self {
        RowlinkError::Service {
            code: f.code,
            message: f.message,
            detail: f.detail,
        }
    }
}

/// Calls accepted by a planner endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerCall {
    GetProtocolVersion(NegotiateParams),
    PlanRequest(PlanParams),
    GetSchema(PlanParams),
}

/// Replies produced by a planner endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlannerReply {
    ProtocolVersion(ProtocolVersion),
    Plan(Plan),
    Schema(Schema),
    Error(ServiceFailure),
}

/// Calls accepted by a worker endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerCall {
    GetProtocolVersion(NegotiateParams),
    OpenTask(OpenTaskParams),
    Fetch(SessionHandle),
    CloseTask(SessionHandle),
}

/// Replies produced by a worker endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkerReply {
    ProtocolVersion(ProtocolVersion),
    TaskOpened(SessionHandle),
    /// One batch of records; `done` signals task completion and may
    /// accompany a final non-empty batch.
    Batch { batch: RowBatch, done: bool },
    TaskClosed,
    Error(ServiceFailure),
}

/// Service-agnostic negotiation call, wire-compatible with
/// [`PlannerCall::GetProtocolVersion`] and [`WorkerCall::GetProtocolVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionCall {
    GetProtocolVersion(NegotiateParams),
}

/// Service-agnostic negotiation reply. Any other reply shape fails to
/// decode, which negotiation reports as a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionReply {
    ProtocolVersion(ProtocolVersion),
}
