//! Client for the planner service.

use rowlink_common::{
    ClientConfig, Location, Plan, ProtocolVersion, Request, Result, RowlinkError, Schema,
};
use rowlink_wire::{PlanParams, PlannerCall, PlannerReply};

use crate::connection::Connection;

/// Client for the planner endpoint. Not thread safe; one owner at a time.
#[derive(Debug)]
pub struct PlannerClient {
    conn: Connection,
}

impl PlannerClient {
    /// Open a connection to the planner and negotiate the protocol.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let conn = Connection::open(&Location::new(host, port)).await?;
        Ok(Self { conn })
    }

    /// Connect to the planner named by `config`, sending its opaque
    /// parameters with the version exchange.
    pub async fn connect_with(config: &ClientConfig) -> Result<Self> {
        let conn = Connection::open_with(&config.planner, &config.params).await?;
        Ok(Self { conn })
    }

    /// The protocol version of the connected planner.
    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        self.conn.version()
    }

    /// Plan `request`: compile it into an ordered set of tasks, each
    /// with a locality-ranked candidate worker list.
    pub async fn plan_request(&mut self, request: &Request) -> Result<Plan> {
        tracing::info!("Planning request: {}", request);
        let params = self.stamp(request)?;
        let reply: PlannerReply = self.conn.call(&PlannerCall::PlanRequest(params)).await?;
        let plan = match reply {
            PlannerReply::Plan(plan) => plan,
            PlannerReply::Error(failure) => return Err(failure.into()),
            other => {
                return Err(RowlinkError::Protocol(format!(
                    "unexpected planner reply to PlanRequest: {other:?}"
                )))
            }
        };
        validate_plan(&plan)?;
        for warning in &plan.warnings {
            tracing::warn!("Planner warning: {}", warning);
        }
        tracing::debug!("PlanRequest generated {} task(s)", plan.tasks.len());
        Ok(plan)
    }

    /// Fetch the result schema for `request` without planning it.
    pub async fn get_schema(&mut self, request: &Request) -> Result<Schema> {
        tracing::info!("Getting schema for request: {}", request);
        let params = self.stamp(request)?;
        let reply: PlannerReply = self.conn.call(&PlannerCall::GetSchema(params)).await?;
        match reply {
            PlannerReply::Schema(schema) => Ok(schema),
            PlannerReply::Error(failure) => Err(failure.into()),
            other => Err(RowlinkError::Protocol(format!(
                "unexpected planner reply to GetSchema: {other:?}"
            ))),
        }
    }

    /// Close the planner connection. Idempotent.
    pub async fn close(&mut self) {
        self.conn.close().await
    }

    /// One-shot plan: connect, plan, and close the connection on every
    /// exit path (success, service error, or transport error).
    pub async fn plan(host: &str, port: u16, request: &Request) -> Result<Plan> {
        let mut client = Self::connect(host, port).await?;
        let result = client.plan_request(request).await;
        client.close().await;
        result
    }

    /// One-shot schema fetch with the same release guarantee as [`Self::plan`].
    pub async fn schema(host: &str, port: u16, request: &Request) -> Result<Schema> {
        let mut client = Self::connect(host, port).await?;
        let result = client.get_schema(request).await;
        client.close().await;
        result
    }

    // Requests go out stamped with the version negotiated on this
    // connection, never with a hardcoded one.
    fn stamp(&self, request: &Request) -> Result<PlanParams> {
        Ok(PlanParams {
            request: request.clone(),
            client_version: self.conn.version()?,
        })
    }
}

fn validate_plan(plan: &Plan) -> Result<()> {
    for task in &plan.tasks {
        if task.locations.is_empty() {
            return Err(RowlinkError::Protocol(format!(
                "planner returned {} with no candidate locations",
                task.id
            )));
        }
    }
    Ok(())
}
