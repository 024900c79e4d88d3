//! Transport abstraction for peer-to-peer communication.
//!
//! Nodes interact with peers through this narrow capability set; the
//! in-process [`LocalTransport`](crate::network::local_transport::LocalTransport)
//! is the reference implementation, and a real network transport would
//! implement the same contract.

use crate::network::rpc::Rpc;
use crate::types::bytes::Bytes;
use crate::types::wrapper_types::BoxFuture;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::Receiver;

/// Errors from transport operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has been closed.
    #[error("transport is not running")]
    NotRunning,

    /// The peer table is full.
    #[error("maximum peer count reached")]
    MaxPeers,

    /// The peer is not a compatible transport implementation.
    #[error("incompatible transport type")]
    WrongType,

    /// A transport cannot connect to itself.
    #[error("cannot connect to self")]
    SelfConnect,

    /// A transport cannot message itself.
    #[error("cannot send a message to self")]
    SelfSend,

    /// The peer is already in the table.
    #[error("already connected to {0}")]
    AlreadyConnected(String),

    /// No peer with that address in the table.
    #[error("unknown peer {0}")]
    UnknownPeer(String),

    /// The peer's inbound channel stayed full past the send timeout.
    #[error("send to {0} timed out")]
    SendTimeout(String),
}

/// Async peer-to-peer channel between nodes.
///
/// Methods returning futures capture everything they need up front, so the
/// returned futures are `'static` and can be driven from detached tasks.
pub trait Transport: Send + Sync {
    /// Hands over the inbound message receiver. Single consumer: the node's
    /// pump task drains it.
    fn consume(&self) -> Receiver<Rpc>;

    /// Registers `other` as a peer. Registration is unidirectional: call
    /// `connect` on both sides for a bidirectional link.
    fn connect(&self, other: &Arc<dyn Transport>) -> Result<(), TransportError>;

    /// Delivers `payload` to the peer at `to`, waiting at most the
    /// transport's send timeout for channel space.
    fn send_message(&self, to: String, payload: Bytes)
        -> BoxFuture<'static, Result<(), TransportError>>;

    /// Sends `payload` to every peer; the first failure is returned and
    /// stops the fan-out (earlier peers keep their copy).
    fn broadcast(&self, payload: Bytes) -> BoxFuture<'static, Result<(), TransportError>>;

    /// This transport's unique address.
    fn addr(&self) -> String;

    /// Concrete-type access, used by `connect` to check compatibility.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
