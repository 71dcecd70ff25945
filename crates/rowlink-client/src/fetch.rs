//! Client for the worker service and the fetch session state machine.

use rowlink_common::{
    ClientConfig, Location, ProtocolVersion, Result, RowBatch, RowlinkError, SessionHandle, Task,
};
use rowlink_wire::{OpenTaskParams, WorkerCall, WorkerReply};

use crate::connection::Connection;

/// Client for one worker endpoint. Not thread safe; one owner at a time.
///
/// Opening a task mutably borrows the client for the lifetime of the
/// returned [`FetchSession`], so one connection drives at most one task
/// at a time. Once the session is dropped or closed the client can open
/// another task against the same worker.
#[derive(Debug)]
pub struct WorkerClient {
    conn: Connection,
    default_fetch_size: Option<usize>,
}

impl WorkerClient {
    /// Open a connection to a worker and negotiate the protocol.
    pub async fn connect(location: &Location) -> Result<Self> {
        let conn = Connection::open(location).await?;
        Ok(Self {
            conn,
            default_fetch_size: None,
        })
    }

    /// Like [`Self::connect`], sending `config`'s opaque parameters with
    /// the version exchange and adopting its `fetch_size` as the default
    /// batch hint for [`Self::open_task`].
    pub async fn connect_with(location: &Location, config: &ClientConfig) -> Result<Self> {
        let conn = Connection::open_with(location, &config.params).await?;
        Ok(Self {
            conn,
            default_fetch_size: config.fetch_size,
        })
    }

    /// The protocol version of the connected worker.
    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        self.conn.version()
    }

    /// The worker endpoint this client is bound to.
    pub fn location(&self) -> &Location {
        self.conn.peer()
    }

    /// Open `task` on this worker and return a fetching session. Uses
    /// the configured default batch hint, if any.
    pub async fn open_task(&mut self, task: &Task) -> Result<FetchSession<'_>> {
        self.open_task_inner(task, self.default_fetch_size).await
    }

    /// Like [`Self::open_task`], with a records-per-batch hint the
    /// worker may cap or ignore.
    pub async fn open_task_with_fetch_size(
        &mut self,
        task: &Task,
        fetch_size: usize,
    ) -> Result<FetchSession<'_>> {
        self.open_task_inner(task, Some(fetch_size)).await
    }

    async fn open_task_inner(
        &mut self,
        task: &Task,
        fetch_size: Option<usize>,
    ) -> Result<FetchSession<'_>> {
        let params = OpenTaskParams {
            task: task.clone(),
            fetch_size,
        };
        let reply: WorkerReply = self.conn.call(&WorkerCall::OpenTask(params)).await?;
        match reply {
            WorkerReply::TaskOpened(handle) => {
                tracing::debug!("Opened {} as {} on {}", task.id, handle, self.conn.peer());
                Ok(FetchSession {
                    conn: &mut self.conn,
                    handle,
                    state: FetchState::Fetching,
                    task_closed: false,
                })
            }
            WorkerReply::Error(failure) => Err(RowlinkError::TaskRejected {
                message: format!("{}: {}", failure.code, failure.message),
            }),
            other => Err(RowlinkError::Protocol(format!(
                "unexpected worker reply to OpenTask: {other:?}"
            ))),
        }
    }

    /// Close the worker connection. Idempotent.
    pub async fn close(&mut self) {
        self.conn.close().await
    }
}

/// Observable states of a fetch session after a successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// More data may be available; `next()` is permitted.
    Fetching,
    /// The worker signalled completion. Terminal.
    Exhausted,
    /// A fetch raised a transport or service error. Terminal.
    Failed,
}

/// A cursor over one task on one worker connection.
///
/// The session borrows the connection; it never owns it. Closing the
/// session releases the worker-side task resources but leaves the
/// connection open for the [`WorkerClient`] that lent it.
#[derive(Debug)]
pub struct FetchSession<'a> {
    conn: &'a mut Connection,
    handle: SessionHandle,
    state: FetchState,
    task_closed: bool,
}

impl FetchSession<'_> {
    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    /// Pull the next batch.
    ///
    /// Returns `Ok(Some(batch))` while the task produces data. A final
    /// batch delivered together with the completion signal is still
    /// returned, with the session moving to [`FetchState::Exhausted`];
    /// a bare completion signal yields `Ok(None)`. Calling `next()` on
    /// a terminal or closed session fails with
    /// [`RowlinkError::SessionClosed`]. A transport or service failure
    /// moves the session to [`FetchState::Failed`] and is propagated
    /// unchanged.
    pub async fn next(&mut self) -> Result<Option<RowBatch>> {
        if self.task_closed || self.state != FetchState::Fetching {
            return Err(RowlinkError::SessionClosed);
        }

        let reply: WorkerReply = match self.conn.call(&WorkerCall::Fetch(self.handle)).await {
            Ok(reply) => reply,
            Err(e) => {
                self.state = FetchState::Failed;
                return Err(e);
            }
        };

        match reply {
            WorkerReply::Batch { batch, done } => {
                if done {
                    self.state = FetchState::Exhausted;
                    tracing::debug!(
                        "{} exhausted with a final batch of {} record(s)",
                        self.handle,
                        batch.num_records()
                    );
                }
                if done && batch.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(batch))
                }
            }
            WorkerReply::Error(failure) => {
                self.state = FetchState::Failed;
                Err(failure.into())
            }
            other => {
                self.state = FetchState::Failed;
                Err(RowlinkError::Protocol(format!(
                    "unexpected worker reply to Fetch: {other:?}"
                )))
            }
        }
    }

    /// Release the worker-side task resources. Valid in any state and
    /// idempotent; failures are logged, never propagated, so cleanup on
    /// an error path cannot mask the primary error. Does not close the
    /// underlying connection.
    pub async fn close(&mut self) {
        if self.task_closed {
            return;
        }
        self.task_closed = true;
        match self
            .conn
            .call::<_, WorkerReply>(&WorkerCall::CloseTask(self.handle))
            .await
        {
            Ok(WorkerReply::TaskClosed) => tracing::debug!("Closed {}", self.handle),
            Ok(other) => {
                tracing::warn!("Unexpected reply closing {}: {:?}", self.handle, other)
            }
            Err(e) => tracing::warn!("Failed to close {}: {}", self.handle, e),
        }
    }
}
