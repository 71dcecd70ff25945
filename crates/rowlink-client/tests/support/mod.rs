//! In-process stub planner and worker services for protocol tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use rowlink_common::{
    ColumnDesc, ColumnType, Location, Plan, ProtocolVersion, Record, RowBatch, Schema,
    ServiceErrorCode, SessionHandle, Task, Value,
};
use rowlink_wire::{
    read_frame, write_frame, PlannerCall, PlannerReply, ServiceFailure, WorkerCall, WorkerReply,
};

// ---------------------------------------------------------------------------
// Fixture data: tpch.nation, 25 rows
// ---------------------------------------------------------------------------

pub const NATION_NAMES: [&str; 25] = [
    "ALGERIA",
    "ARGENTINA",
    "BRAZIL",
    "CANADA",
    "EGYPT",
    "ETHIOPIA",
    "FRANCE",
    "GERMANY",
    "INDIA",
    "INDONESIA",
    "IRAN",
    "IRAQ",
    "JAPAN",
    "JORDAN",
    "KENYA",
    "MOROCCO",
    "MOZAMBIQUE",
    "PERU",
    "CHINA",
    "ROMANIA",
    "SAUDI ARABIA",
    "VIETNAM",
    "RUSSIA",
    "UNITED KINGDOM",
    "UNITED STATES",
];

pub fn nation_records() -> Vec<Record> {
    NATION_NAMES
        .iter()
        .map(|n| Record::new(vec![Value::Text(n.to_string())]))
        .collect()
}

pub fn nation_schema() -> Schema {
    Schema::new(vec![ColumnDesc::new("n_name", ColumnType::Text)])
}

pub fn make_task(locations: Vec<Location>) -> Task {
    Task::new(b"scan tpch.nation [n_name]".to_vec(), locations)
}

pub fn plan_reply(tasks: Vec<Task>) -> PlannerReply {
    plan_reply_with_warnings(tasks, vec![])
}

pub fn plan_reply_with_warnings(tasks: Vec<Task>, warnings: Vec<String>) -> PlannerReply {
    PlannerReply::Plan(Plan {
        tasks,
        schema: nation_schema(),
        warnings,
    })
}

pub fn schema_reply() -> PlannerReply {
    PlannerReply::Schema(nation_schema())
}

/// A port nothing listens on: bind an ephemeral listener, note the port,
/// drop the listener.
pub fn unreachable_location() -> Location {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Location::new("127.0.0.1", port)
}

// ---------------------------------------------------------------------------
// Stub planner
// ---------------------------------------------------------------------------

pub struct StubPlanner {
    pub location: Location,
    /// Every call the planner saw, in arrival order.
    pub seen: Arc<Mutex<Vec<PlannerCall>>>,
    handle: JoinHandle<()>,
}

impl Drop for StubPlanner {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Serve a planner that answers every PlanRequest with `plan_reply` and
/// every GetSchema with `schema_reply`.
pub async fn spawn_planner(plan_reply: PlannerReply, schema_reply: PlannerReply) -> StubPlanner {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub planner");
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_srv = seen.clone();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let plan_reply = plan_reply.clone();
            let schema_reply = schema_reply.clone();
            let seen = seen_srv.clone();
            tokio::spawn(async move {
                loop {
                    let call: PlannerCall = match read_frame(&mut stream).await {
                        Ok(call) => call,
                        Err(_) => return,
                    };
                    seen.lock().unwrap().push(call.clone());
                    let reply = match call {
                        PlannerCall::GetProtocolVersion(_) => {
                            PlannerReply::ProtocolVersion(ProtocolVersion::V1)
                        }
                        PlannerCall::PlanRequest(_) => plan_reply.clone(),
                        PlannerCall::GetSchema(_) => schema_reply.clone(),
                    };
                    if write_frame(&mut stream, &reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    StubPlanner {
        location: Location::new("127.0.0.1", addr.port()),
        seen,
        handle,
    }
}

// ---------------------------------------------------------------------------
// Stub worker
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct WorkerScript {
    pub records: Vec<Record>,
    pub batch_size: usize,
    /// Refuse every OpenTask with this failure.
    pub reject_open: Option<ServiceFailure>,
    /// Answer every Fetch with this failure.
    pub fail_fetch: Option<ServiceFailure>,
    /// Drop the connection on the first Fetch.
    pub drop_on_fetch: bool,
}

impl WorkerScript {
    pub fn nation() -> Self {
        Self {
            records: nation_records(),
            batch_size: 10,
            reject_open: None,
            fail_fetch: None,
            drop_on_fetch: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }
}

pub struct StubWorker {
    pub location: Location,
    /// Number of CloseTask calls the worker handled.
    pub close_calls: Arc<AtomicUsize>,
    /// Opaque parameters received with each version exchange.
    pub negotiate_params: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
    handle: JoinHandle<()>,
}

impl Drop for StubWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_worker(script: WorkerScript) -> StubWorker {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub worker");
    let addr = listener.local_addr().unwrap();
    let close_calls = Arc::new(AtomicUsize::new(0));
    let negotiate_params = Arc::new(Mutex::new(Vec::new()));

    let close_srv = close_calls.clone();
    let negotiate_srv = negotiate_params.clone();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let script = script.clone();
            let close_calls = close_srv.clone();
            let negotiate_params = negotiate_srv.clone();
            tokio::spawn(async move {
                // handle -> (cursor, effective batch size)
                let mut sessions: HashMap<SessionHandle, (usize, usize)> = HashMap::new();
                loop {
                    let call: WorkerCall = match read_frame(&mut stream).await {
                        Ok(call) => call,
                        Err(_) => return,
                    };
                    let reply = match call {
                        WorkerCall::GetProtocolVersion(negotiate) => {
                            negotiate_params.lock().unwrap().push(negotiate.params);
                            WorkerReply::ProtocolVersion(ProtocolVersion::V1)
                        }
                        WorkerCall::OpenTask(params) => {
                            if let Some(failure) = &script.reject_open {
                                WorkerReply::Error(failure.clone())
                            } else {
                                let batch_size =
                                    params.fetch_size.unwrap_or(script.batch_size).max(1);
                                let handle = SessionHandle::new();
                                sessions.insert(handle, (0, batch_size));
                                WorkerReply::TaskOpened(handle)
                            }
                        }
                        WorkerCall::Fetch(handle) => {
                            if script.drop_on_fetch {
                                return;
                            }
                            if let Some(failure) = &script.fail_fetch {
                                WorkerReply::Error(failure.clone())
                            } else {
                                match sessions.get_mut(&handle) {
                                    None => WorkerReply::Error(ServiceFailure {
                                        code: ServiceErrorCode::InvalidHandle,
                                        message: format!("unknown handle {handle}"),
                                        detail: None,
                                    }),
                                    Some((cursor, batch_size)) => {
                                        let end =
                                            (*cursor + *batch_size).min(script.records.len());
                                        let batch =
                                            RowBatch::new(script.records[*cursor..end].to_vec());
                                        let done = end == script.records.len();
                                        *cursor = end;
                                        WorkerReply::Batch { batch, done }
                                    }
                                }
                            }
                        }
                        WorkerCall::CloseTask(handle) => {
                            sessions.remove(&handle);
                            close_calls.fetch_add(1, Ordering::SeqCst);
                            WorkerReply::TaskClosed
                        }
                    };
                    if write_frame(&mut stream, &reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    StubWorker {
        location: Location::new("127.0.0.1", addr.port()),
        close_calls,
        negotiate_params,
        handle,
    }
}

// ---------------------------------------------------------------------------
// Wrong-service endpoints
// ---------------------------------------------------------------------------

pub struct StubEndpoint {
    pub location: Location,
    handle: JoinHandle<()>,
}

impl Drop for StubEndpoint {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An endpoint that accepts TCP and answers with something that is not
/// the record service protocol.
pub async fn spawn_garbage_endpoint() -> StubEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub endpoint");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let _ = stream
                .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\n\r\n")
                .await;
            let _ = stream.shutdown().await;
        }
    });
    StubEndpoint {
        location: Location::new("127.0.0.1", addr.port()),
        handle,
    }
}

/// An endpoint that accepts TCP and immediately hangs up.
pub async fn spawn_closing_endpoint() -> StubEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub endpoint");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            drop(stream);
        }
    });
    StubEndpoint {
        location: Location::new("127.0.0.1", addr.port()),
        handle,
    }
}
