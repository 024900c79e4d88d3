//! In-memory transport for tests and single-process simulations.
//!
//! Routes messages between nodes through bounded channels, with the same
//! peer-table and timeout behavior a network transport would have.

use crate::network::rpc::Rpc;
use crate::network::transport::{Transport, TransportError};
use crate::types::bytes::Bytes;
use crate::types::wrapper_types::BoxFuture;
use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::{channel, Receiver, Sender};

/// Inbound channel capacity.
const CHANNEL_CAPACITY: usize = 1024;

/// Default maximum peer count.
const DEFAULT_MAX_PEERS: usize = 100;

/// Default send timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`LocalTransport`].
pub struct LocalTransportOpts {
    pub addr: String,
    /// Maximum peer count; 0 means the default (100).
    pub max_peers: usize,
    /// Send timeout; zero means the default (5 s).
    pub timeout: Duration,
}

/// In-memory transport using bounded async channels.
pub struct LocalTransport {
    address: String,
    /// Sender side of the inbound channel; dropped on `close`.
    inbound: RwLock<Option<Sender<Rpc>>>,
    /// Receiver side, handed out once via `consume`.
    rx: Mutex<Option<Receiver<Rpc>>>,
    peers: DashMap<String, Arc<LocalTransport>>,
    max_peers: usize,
    timeout: Duration,
    running: AtomicBool,
}

impl LocalTransport {
    /// Creates a transport with default limits.
    pub fn new(addr: impl Into<String>) -> Arc<LocalTransport> {
        Self::with_opts(LocalTransportOpts {
            addr: addr.into(),
            max_peers: 0,
            timeout: Duration::ZERO,
        })
    }

    pub fn with_opts(opts: LocalTransportOpts) -> Arc<LocalTransport> {
        let (tx, rx) = channel(CHANNEL_CAPACITY);

        let max_peers = if opts.max_peers == 0 {
            DEFAULT_MAX_PEERS
        } else {
            opts.max_peers
        };
        let timeout = if opts.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            opts.timeout
        };

        Arc::new(LocalTransport {
            address: opts.addr,
            inbound: RwLock::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            peers: DashMap::new(),
            max_peers,
            timeout,
            running: AtomicBool::new(true),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Removes `addr` from the peer table.
    pub fn disconnect(&self, addr: &str) -> Result<(), TransportError> {
        if !self.is_running() {
            return Err(TransportError::NotRunning);
        }
        self.peers
            .remove(addr)
            .map(|_| ())
            .ok_or_else(|| TransportError::UnknownPeer(addr.to_string()))
    }

    /// Stops the transport: closes the inbound channel and clears peers.
    /// Subsequent operations fail with `NotRunning`.
    pub fn close(&self) -> Result<(), TransportError> {
        if !self.running.swap(false, Ordering::AcqRel) {
            return Err(TransportError::NotRunning);
        }
        *self.inbound.write().unwrap() = None;
        self.peers.clear();
        Ok(())
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn get_peers(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Clone of this peer's inbound sender, if it is still accepting.
    fn sender(&self) -> Option<Sender<Rpc>> {
        self.inbound.read().unwrap().clone()
    }
}

/// Shorthand for an immediately-ready failed send.
fn fail(err: TransportError) -> BoxFuture<'static, Result<(), TransportError>> {
    Box::pin(async move { Err(err) })
}

impl Transport for LocalTransport {
    fn consume(&self) -> Receiver<Rpc> {
        self.rx
            .lock()
            .unwrap()
            .take()
            .expect("inbound receiver already taken")
    }

    fn connect(&self, other: &Arc<dyn Transport>) -> Result<(), TransportError> {
        if !self.is_running() {
            return Err(TransportError::NotRunning);
        }
        if self.peers.len() >= self.max_peers {
            return Err(TransportError::MaxPeers);
        }

        let peer = Arc::clone(other)
            .as_any()
            .downcast::<LocalTransport>()
            .map_err(|_| TransportError::WrongType)?;

        if peer.address == self.address {
            return Err(TransportError::SelfConnect);
        }
        if self.peers.contains_key(&peer.address) {
            return Err(TransportError::AlreadyConnected(peer.address.clone()));
        }

        self.peers.insert(peer.address.clone(), peer);
        Ok(())
    }

    fn send_message(
        &self,
        to: String,
        payload: Bytes,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        if !self.is_running() {
            return fail(TransportError::NotRunning);
        }
        if to == self.address {
            return fail(TransportError::SelfSend);
        }

        let peer = match self.peers.get(&to) {
            Some(entry) => Arc::clone(entry.value()),
            None => return fail(TransportError::UnknownPeer(to)),
        };

        // A closed peer has already dropped its inbound sender.
        let Some(sender) = peer.sender() else {
            return fail(TransportError::NotRunning);
        };

        let rpc = Rpc::new(self.address.clone(), payload);
        let timeout = self.timeout;

        Box::pin(async move {
            match tokio::time::timeout(timeout, sender.send(rpc)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(TransportError::NotRunning),
                Err(_) => Err(TransportError::SendTimeout(to)),
            }
        })
    }

    fn broadcast(&self, payload: Bytes) -> BoxFuture<'static, Result<(), TransportError>> {
        let sends: Vec<_> = self
            .get_peers()
            .into_iter()
            .map(|addr| self.send_message(addr, payload.clone()))
            .collect();

        Box::pin(async move {
            for send in sends {
                send.await?;
            }
            Ok(())
        })
    }

    fn addr(&self) -> String {
        self.address.clone()
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
