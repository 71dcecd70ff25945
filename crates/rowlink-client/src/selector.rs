//! Worker selection with deterministic locality fallback.

use rowlink_common::{AttemptFailure, ClientConfig, Location, Result, RowlinkError, Task};

use crate::fetch::WorkerClient;

/// The outcome of a successful selection: a negotiated client, the
/// location it is bound to, and the failed attempts that preceded it,
/// in the order they were tried.
#[derive(Debug)]
pub struct Selection {
    pub client: WorkerClient,
    pub location: Location,
    pub failures: Vec<AttemptFailure>,
}

/// Connect to the best available worker for `task`.
///
/// Candidates are tried strictly in the locality order supplied by the
/// plan; the first that connects and negotiates wins. No randomization,
/// no load-aware re-ranking, and no retries beyond the candidate list.
/// If every candidate fails, the error aggregates one reason per
/// attempted location.
pub async fn select_worker(task: &Task) -> Result<Selection> {
    select_worker_with(task, &ClientConfig::default()).await
}

/// Like [`select_worker`], connecting each candidate with `config`'s
/// opaque parameters and default batch hint.
pub async fn select_worker_with(task: &Task, config: &ClientConfig) -> Result<Selection> {
    if task.locations.is_empty() {
        return Err(RowlinkError::Protocol(format!(
            "{} has no candidate locations",
            task.id
        )));
    }

    let mut failures = Vec::new();
    for location in &task.locations {
        match WorkerClient::connect_with(location, config).await {
            Ok(client) => {
                if !failures.is_empty() {
                    tracing::info!(
                        "Selected fallback worker {} for {} after {} failed candidate(s)",
                        location,
                        task.id,
                        failures.len()
                    );
                }
                return Ok(Selection {
                    client,
                    location: location.clone(),
                    failures,
                });
            }
            Err(e) => {
                tracing::warn!("Worker candidate {} for {} failed: {}", location, task.id, e);
                failures.push(AttemptFailure {
                    location: location.clone(),
                    reason: Box::new(e),
                });
            }
        }
    }

    Err(RowlinkError::NoReachableWorker(failures))
}
