//! Rowlink core value objects.
//!
//! Everything exchanged between the planner client, the worker selector,
//! and the fetch session is an immutable value: once a `Plan` or `Task`
//! is returned to the caller it is never mutated or cached by this layer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Protocol versions understood by this client, oldest first.
///
/// Negotiated once per connection and cached for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1,
}

impl ProtocolVersion {
    /// The newest version this client speaks.
    pub const CURRENT: ProtocolVersion = ProtocolVersion::V1;
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Network address of a planner or worker endpoint.
///
/// Inside a [`Task`] the location list is ranked by locality, most-local
/// first; the ranking is produced by the planner and is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Location {
    pub host: String,
    pub port: u16,
}

impl Location {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn to_socket_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        use std::net::ToSocketAddrs;
        let addr = format!("{}:{}", self.host, self.port);
        addr.to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid address"))
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Unique task identifier, assigned by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task_{}", self.0)
    }
}

/// Handle to an open task on a worker, assigned by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub Uuid);

impl SessionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session_{}", self.0)
    }
}

/// A logical request to plan. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// A statement the planner compiles, e.g. `select n_name from tpch.nation`.
    Sql { statement: String },
    /// A full or projected scan of a single table. An empty projection
    /// means all columns.
    TableScan { table: String, columns: Vec<String> },
}

impl Request {
    pub fn sql(statement: impl Into<String>) -> Self {
        Request::Sql {
            statement: statement.into(),
        }
    }

    pub fn table_scan(table: impl Into<String>, columns: Vec<String>) -> Self {
        Request::TableScan {
            table: table.into(),
            columns,
        }
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Sql { statement } => write!(f, "sql[{}]", statement),
            Request::TableScan { table, columns } => {
                if columns.is_empty() {
                    write!(f, "scan[{}]", table)
                } else {
                    write!(f, "scan[{}({})]", table, columns.join(", "))
                }
            }
        }
    }
}

/// Column types surfaced in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    BigInt,
    Double,
    Text,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    pub col_type: ColumnType,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
        }
    }
}

/// Result-set shape for a request, as declared by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schema {
    pub columns: Vec<ColumnDesc>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDesc>) -> Self {
        Self { columns }
    }
}

/// One unit of planned work, executable by any worker in `locations`.
///
/// The descriptor is opaque to the client; only the worker that opens the
/// task interprets it. `locations` is never empty for a valid task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub descriptor: Vec<u8>,
    pub locations: Vec<Location>,
}

impl Task {
    pub fn new(descriptor: Vec<u8>, locations: Vec<Location>) -> Self {
        Self {
            id: TaskId::new(),
            descriptor,
            locations,
        }
    }
}

/// The physical execution plan for a request: an ordered task list plus
/// the declared result schema and any planner warnings.
///
/// Task order is significant; it defines the consumption/merge order when
/// the caller needs one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub tasks: Vec<Task>,
    pub schema: Schema,
    pub warnings: Vec<String>,
}

/// A single result cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// One result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: Vec<Value>,
}

impl Record {
    pub fn new(fields: Vec<Value>) -> Self {
        Self { fields }
    }
}

/// A finite, ordered group of records produced by one fetch call.
/// Consumed immediately by the caller; never retained by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RowBatch {
    pub records: Vec<Record>,
}

impl RowBatch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
