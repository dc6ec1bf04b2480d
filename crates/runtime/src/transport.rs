//! In-process stand-in for the network between the server and its clients.
//!
//! Every RPC is bincode-encoded on send and decoded on receipt, so anything
//! that would not survive the wire fails here too. Packets are held back for
//! a fixed number of ticks to simulate one-way latency.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::trace;

use arena_core::{ClientRpc, ControllerId, ErrorSeverity, GameError, ServerRpc, Tick};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode packet")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode packet")]
    Decode(#[source] bincode::Error),

    #[error("{0} has no open connection")]
    NotConnected(ControllerId),
}

impl GameError for TransportError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Encode(_) | Self::Decode(_) => ErrorSeverity::Internal,
            Self::NotConnected(_) => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "TRANSPORT_ENCODE",
            Self::Decode(_) => "TRANSPORT_DECODE",
            Self::NotConnected(_) => "TRANSPORT_NOT_CONNECTED",
        }
    }
}

#[derive(Debug)]
struct InFlight {
    deliver_at: Tick,
    payload: Vec<u8>,
}

/// Packets sent on one connection and not yet delivered.
#[derive(Debug, Default)]
struct Connection {
    upstream: VecDeque<InFlight>,
    downstream: VecDeque<InFlight>,
}

/// Loopback connections keyed by the client's controller.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    latency_ticks: u64,
    connections: BTreeMap<ControllerId, Connection>,
    bytes_sent: u64,
}

impl LoopbackTransport {
    pub fn new(latency_ticks: u64) -> Self {
        Self {
            latency_ticks,
            ..Self::default()
        }
    }

    pub fn latency_ticks(&self) -> u64 {
        self.latency_ticks
    }

    /// Total encoded bytes sent in either direction.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn connect(&mut self, controller: ControllerId) -> bool {
        if self.connections.contains_key(&controller) {
            return false;
        }
        self.connections.insert(controller, Connection::default());
        true
    }

    /// Closes the connection; packets still in flight are lost.
    pub fn disconnect(&mut self, controller: ControllerId) -> bool {
        self.connections.remove(&controller).is_some()
    }

    pub fn is_connected(&self, controller: ControllerId) -> bool {
        self.connections.contains_key(&controller)
    }

    /// Client `from` sends `rpc` to the server.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if `from` has no connection,
    /// [`TransportError::Encode`] if the RPC cannot be serialized.
    pub fn send_to_server(&mut self, now: Tick, from: ControllerId, rpc: &ServerRpc) -> Result<(), TransportError> {
        let packet = self.encode(now, rpc)?;
        let connection = self
            .connections
            .get_mut(&from)
            .ok_or(TransportError::NotConnected(from))?;
        trace!(target: "runtime::transport", %from, bytes = packet.payload.len(), "upstream packet");
        connection.upstream.push_back(packet);
        Ok(())
    }

    /// Server sends `rpc` to client `to`.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if `to` has no connection,
    /// [`TransportError::Encode`] if the RPC cannot be serialized.
    pub fn send_to_client(&mut self, now: Tick, to: ControllerId, rpc: &ClientRpc) -> Result<(), TransportError> {
        let packet = self.encode(now, rpc)?;
        let connection = self
            .connections
            .get_mut(&to)
            .ok_or(TransportError::NotConnected(to))?;
        trace!(target: "runtime::transport", %to, bytes = packet.payload.len(), "downstream packet");
        connection.downstream.push_back(packet);
        Ok(())
    }

    /// Server side: every upstream packet due by `now`, in send order per
    /// connection.
    ///
    /// # Errors
    ///
    /// [`TransportError::Decode`] on a corrupt packet; later packets stay queued.
    pub fn receive_on_server(&mut self, now: Tick) -> Result<Vec<(ControllerId, ServerRpc)>, TransportError> {
        let mut received = Vec::new();
        for (controller, connection) in &mut self.connections {
            for payload in drain_due(&mut connection.upstream, now) {
                received.push((*controller, decode(&payload)?));
            }
        }
        Ok(received)
    }

    /// Client side: every downstream packet for `controller` due by `now`.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if `controller` has no connection,
    /// [`TransportError::Decode`] on a corrupt packet.
    pub fn receive_on_client(&mut self, now: Tick, controller: ControllerId) -> Result<Vec<ClientRpc>, TransportError> {
        let connection = self
            .connections
            .get_mut(&controller)
            .ok_or(TransportError::NotConnected(controller))?;
        drain_due(&mut connection.downstream, now)
            .iter()
            .map(|payload| decode(payload))
            .collect()
    }

    /// Packets queued in either direction.
    pub fn in_flight(&self) -> usize {
        self.connections
            .values()
            .map(|c| c.upstream.len() + c.downstream.len())
            .sum()
    }

    fn encode<T: Serialize>(&mut self, now: Tick, rpc: &T) -> Result<InFlight, TransportError> {
        let payload = bincode::serialize(rpc).map_err(TransportError::Encode)?;
        self.bytes_sent += payload.len() as u64;
        Ok(InFlight {
            deliver_at: now.saturating_add(self.latency_ticks),
            payload,
        })
    }
}

fn drain_due(queue: &mut VecDeque<InFlight>, now: Tick) -> Vec<Vec<u8>> {
    let mut due = Vec::new();
    while queue.front().is_some_and(|p| p.deliver_at <= now) {
        if let Some(packet) = queue.pop_front() {
            due.push(packet.payload);
        }
    }
    due
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, TransportError> {
    bincode::deserialize(payload).map_err(TransportError::Decode)
}
