//! Rowlink Client - protocol client for the planner/worker record service
//!
//! The flow is: build a [`Request`](rowlink_common::Request), have a
//! [`PlannerClient`] compile it into a plan of tasks, pick a worker per
//! task with [`select_worker`], then drive each task to exhaustion with
//! a [`FetchSession`].
//!
//! Connections and sessions are single-owner and never internally
//! locked; run one per concurrent task. No call in this crate carries
//! an internal timeout; bound calls externally (e.g. with
//! `tokio::time::timeout`) and a cancelled transport surfaces as a
//! transport error from the in-flight call.

pub mod connection;
pub mod fetch;
pub mod planner;
pub mod selector;

pub use connection::Connection;
pub use fetch::{FetchSession, FetchState, WorkerClient};
pub use planner::PlannerClient;
pub use selector::{select_worker, select_worker_with, Selection};
