//! A single logical RPC session to one remote endpoint.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use rowlink_common::{Location, ProtocolVersion, Result, RowlinkError};
use rowlink_wire::{read_frame, write_frame, NegotiateParams, VersionCall, VersionReply};

/// One connection to a planner or worker endpoint.
///
/// Owns exactly one transport. Opening the connection immediately runs
/// version negotiation; a connection handed to callers is always
/// negotiated. Single-owner by contract: a `Connection` must not be
/// shared across concurrent callers.
pub struct Connection {
    peer: Location,
    stream: Option<TcpStream>,
    version: Option<ProtocolVersion>,
}

impl Connection {
    /// Establish the transport and negotiate the protocol version.
    ///
    /// A connect failure is a [`RowlinkError::Transport`]. Once the
    /// transport is up, any failure to complete the version exchange is
    /// a [`RowlinkError::Protocol`]: the endpoint is reachable but is
    /// not the service we expect.
    pub async fn open(location: &Location) -> Result<Self> {
        Self::open_with(location, &BTreeMap::new()).await
    }

    /// Like [`Connection::open`], but sends the given opaque parameters
    /// with the version exchange. The service interprets them; the
    /// client passes them through untouched.
    pub async fn open_with(
        location: &Location,
        params: &BTreeMap<String, String>,
    ) -> Result<Self> {
        tracing::info!("Connecting to {}", location);
        let stream = TcpStream::connect((location.host.as_str(), location.port))
            .await
            .map_err(|e| {
                RowlinkError::Transport(format!("could not connect to {location}: {e}"))
            })?;

        let mut conn = Self {
            peer: location.clone(),
            stream: Some(stream),
            version: None,
        };
        let version = conn.negotiate(params).await?;
        conn.version = Some(version);
        tracing::debug!("Connected to {} with protocol version {}", location, version);
        Ok(conn)
    }

    async fn negotiate(&mut self, params: &BTreeMap<String, String>) -> Result<ProtocolVersion> {
        let call = VersionCall::GetProtocolVersion(NegotiateParams::new(params.clone()));
        let reply: Result<VersionReply> = self.exchange(&call).await;
        match reply {
            Ok(VersionReply::ProtocolVersion(version)) => Ok(version),
            Err(e) => Err(RowlinkError::Protocol(format!(
                "{} did not complete version negotiation: {e}",
                self.peer
            ))),
        }
    }

    /// Send one call and read one reply.
    ///
    /// Fails with [`RowlinkError::NotConnected`] unless the connection
    /// is open and negotiated. An externally cancelled or lost transport
    /// surfaces as [`RowlinkError::Transport`] from the in-flight call.
    pub async fn call<C, R>(&mut self, call: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        if self.version.is_none() {
            return Err(RowlinkError::NotConnected);
        }
        self.exchange(call).await
    }

    async fn exchange<C, R>(&mut self, call: &C) -> Result<R>
    where
        C: Serialize,
        R: DeserializeOwned,
    {
        let stream = self.stream.as_mut().ok_or(RowlinkError::NotConnected)?;
        write_frame(stream, call).await?;
        read_frame(stream).await
    }

    /// The version negotiated at open time.
    pub fn version(&self) -> Result<ProtocolVersion> {
        self.version.ok_or(RowlinkError::NotConnected)
    }

    /// The endpoint this connection talks to.
    pub fn peer(&self) -> &Location {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection. Safe to call any number of times; the
    /// second and later calls are no-ops.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!("Closing connection to {}", self.peer);
            if let Err(e) = stream.shutdown().await {
                tracing::warn!("Shutdown of connection to {} failed: {}", self.peer, e);
            }
            self.version = None;
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("open", &self.is_open())
            .field("version", &self.version)
            .finish()
    }
}
