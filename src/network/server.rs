//! The node: one event loop multiplexing transports, gossip, and block
//! production.
//!
//! Every transport pumps its inbound frames into a single rpc channel; the
//! main task decodes, dispatches, and re-broadcasts. A node configured with
//! a private key is the network's validator and additionally runs a ticker
//! that drains the mempool into a new block every `block_time`.

use crate::core::block::{now_unix_nanos, Block, Header, PROTOCOL_VERSION};
use crate::core::blockchain::{Blockchain, ChainError};
use crate::core::transaction::{Transaction, TxError};
use crate::crypto::key_pair::{KeyError, PrivateKey};
use crate::network::message::{GetBlocksMessage, GetStatusMessage, Message, MessageType, StatusMessage};
use crate::network::rpc::{decode_message, DecodedMessage, DecodedMessageData, Rpc, RpcError};
use crate::network::transport::{Transport, TransportError};
use crate::network::txpool::TxPool;
use crate::types::encoding::Encode;
use crate::types::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Capacity of the node's multiplexed rpc channel.
const RPC_CHANNEL_CAPACITY: usize = 1024;

/// Default block production cadence.
const DEFAULT_BLOCK_TIME: Duration = Duration::from_secs(5);

/// Default mempool capacity.
const DEFAULT_POOL_CAPACITY: usize = 1000;

/// Errors surfaced by the message handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Node configuration.
pub struct ServerOpts {
    /// Node identifier, used in status messages and logs.
    pub id: String,
    /// This node's own transport.
    pub transport: Arc<dyn Transport>,
    /// Static bootstrap set; the node connects to every entry that is not
    /// itself on startup.
    pub transports: Vec<Arc<dyn Transport>>,
    /// Present on exactly one node per network: the validator.
    pub private_key: Option<PrivateKey>,
    /// Block production cadence; zero means the default (5 s).
    pub block_time: Duration,
    /// Mempool capacity; 0 means the default (1000).
    pub pool_capacity: usize,
}

/// A running node.
pub struct Server {
    inner: Arc<ServerInner>,
    rpc_rx: Receiver<Rpc>,
    quit_rx: Receiver<()>,
    quit_tx: Sender<()>,
}

struct ServerInner {
    id: String,
    transport: Arc<dyn Transport>,
    transports: Vec<Arc<dyn Transport>>,
    private_key: Option<PrivateKey>,
    is_validator: bool,
    block_time: Duration,
    chain: Blockchain,
    mempool: TxPool,
    rpc_tx: Sender<Rpc>,
}

impl Server {
    /// Builds a node around a fresh chain seeded with the network genesis.
    pub fn new(opts: ServerOpts) -> Self {
        let (rpc_tx, rpc_rx) = channel(RPC_CHANNEL_CAPACITY);
        let (quit_tx, quit_rx) = channel(1);

        let block_time = if opts.block_time.is_zero() {
            DEFAULT_BLOCK_TIME
        } else {
            opts.block_time
        };
        let pool_capacity = if opts.pool_capacity == 0 {
            DEFAULT_POOL_CAPACITY
        } else {
            opts.pool_capacity
        };

        let inner = ServerInner {
            id: opts.id,
            transport: opts.transport,
            transports: opts.transports,
            is_validator: opts.private_key.is_some(),
            private_key: opts.private_key,
            block_time,
            chain: Blockchain::new(genesis_block()),
            mempool: TxPool::new(pool_capacity),
            rpc_tx,
        };

        Server {
            inner: Arc::new(inner),
            rpc_rx,
            quit_rx,
            quit_tx,
        }
    }

    /// Handle that terminates the main loop when sent to.
    pub fn quit_handle(&self) -> Sender<()> {
        self.quit_tx.clone()
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn chain(&self) -> &Blockchain {
        &self.inner.chain
    }

    pub fn mempool(&self) -> &TxPool {
        &self.inner.mempool
    }

    /// Runs the node until a quit signal arrives.
    pub async fn start(mut self) {
        self.inner.bootstrap().await;
        self.inner.spawn_pump();

        if self.inner.is_validator {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.validator_loop().await });
        }

        loop {
            tokio::select! {
                maybe_rpc = self.rpc_rx.recv() => {
                    let Some(rpc) = maybe_rpc else { break };
                    Arc::clone(&self.inner).handle_rpc(rpc).await;
                }
                _ = self.quit_rx.recv() => break,
            }
        }

        info!(id = %self.inner.id, "server shutting down");
    }
}

impl ServerInner {
    /// Connects to every configured peer transport and asks for its status.
    async fn bootstrap(&self) {
        for peer in &self.transports {
            if peer.addr() == self.transport.addr() {
                continue;
            }

            if let Err(err) = self.transport.connect(peer) {
                warn!(peer = %peer.addr(), error = %err, "could not connect to peer");
                continue;
            }
            info!(id = %self.id, peer = %peer.addr(), "connected to peer");

            let msg = Message::new(MessageType::GetStatus, GetStatusMessage.to_bytes());
            if let Err(err) = self
                .transport
                .send_message(peer.addr(), msg.to_bytes())
                .await
            {
                warn!(peer = %peer.addr(), error = %err, "initial status request failed");
            }
        }
    }

    /// Forwards this node's transport frames into the rpc channel.
    fn spawn_pump(&self) {
        let transport = Arc::clone(&self.transport);
        let rpc_tx = self.rpc_tx.clone();

        tokio::spawn(async move {
            let mut rx = transport.consume();
            while let Some(rpc) = rx.recv().await {
                if rpc_tx.send(rpc).await.is_err() {
                    break;
                }
            }
        });
    }

    /// Decodes and dispatches one frame. Per-message errors are logged and
    /// dropped; `BlockKnown` is dropped silently since peers re-announce
    /// blocks constantly.
    async fn handle_rpc(self: Arc<Self>, rpc: Rpc) {
        let decoded = match decode_message(&rpc) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(from = %rpc.from, error = %err, "dropping undecodable message");
                return;
            }
        };

        if let Err(err) = Arc::clone(&self).process_message(decoded).await {
            if !matches!(err, ServerError::Chain(ChainError::BlockKnown { .. })) {
                warn!(id = %self.id, error = %err, "message handling failed");
            }
        }
    }

    async fn process_message(self: Arc<Self>, msg: DecodedMessage) -> Result<(), ServerError> {
        match msg.data {
            DecodedMessageData::Tx(tx) => self.process_transaction(tx).await,
            DecodedMessageData::Block(block) => self.process_block(block).await,
            DecodedMessageData::GetStatus => self.process_get_status(&msg.from).await,
            DecodedMessageData::Status(status) => self.process_status(&msg.from, status).await,
            DecodedMessageData::GetBlocks(body) => self.process_get_blocks(&msg.from, body),
        }
    }

    /// Verifies a gossiped transaction and pools it. Known hashes are
    /// no-ops, which is what stops gossip loops.
    async fn process_transaction(self: Arc<Self>, mut tx: Transaction) -> Result<(), ServerError> {
        let hash = tx.hash();
        if self.mempool.contains(hash) {
            return Ok(());
        }

        tx.verify()?;
        tx.set_first_seen(now_unix_nanos());

        debug!(
            id = %self.id,
            %hash,
            pending = self.mempool.pending_count(),
            "adding transaction to mempool"
        );
        self.mempool.add(tx.clone());

        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(err) = inner.broadcast_transaction(&tx).await {
                warn!(error = %err, "transaction broadcast failed");
            }
        });

        Ok(())
    }

    /// Appends a gossiped block and re-announces it on success.
    async fn process_block(self: Arc<Self>, block: Block) -> Result<(), ServerError> {
        self.chain.add_block(block.clone())?;

        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(err) = inner.broadcast_block(&block).await {
                warn!(error = %err, "block broadcast failed");
            }
        });

        Ok(())
    }

    /// Answers a status request with our id and tip height.
    async fn process_get_status(&self, from: &str) -> Result<(), ServerError> {
        let status = StatusMessage {
            id: self.id.clone(),
            version: PROTOCOL_VERSION,
            current_height: self.chain.height(),
        };

        let msg = Message::new(MessageType::Status, status.to_bytes());
        self.transport
            .send_message(from.to_string(), msg.to_bytes())
            .await?;
        Ok(())
    }

    /// Requests a back-fill when the peer's chain is ahead of ours.
    async fn process_status(&self, from: &str, status: StatusMessage) -> Result<(), ServerError> {
        if status.current_height <= self.chain.height() {
            debug!(
                id = %self.id,
                ours = self.chain.height(),
                theirs = status.current_height,
                peer = %from,
                "peer is not ahead, nothing to sync"
            );
            return Ok(());
        }

        let request = GetBlocksMessage {
            from: self.chain.height(),
            to: 0,
        };
        let msg = Message::new(MessageType::GetBlocks, request.to_bytes());
        self.transport
            .send_message(from.to_string(), msg.to_bytes())
            .await?;
        Ok(())
    }

    /// Accepts a block-range request. The reply is a placeholder until the
    /// protocol grows a block-stream message; see DESIGN notes.
    fn process_get_blocks(&self, from: &str, body: GetBlocksMessage) -> Result<(), ServerError> {
        debug!(
            id = %self.id,
            peer = %from,
            from_height = body.from,
            to_height = body.to,
            "received block range request"
        );
        Ok(())
    }

    /// Validator duty: drain pending transactions into the next block.
    async fn create_new_block(self: Arc<Self>) -> Result<(), ServerError> {
        let Some(key) = &self.private_key else {
            return Ok(());
        };

        let tip = self.chain.get_header(self.chain.height())?;
        let transactions = self.mempool.pending();

        let mut block = Block::from_prev_header(&tip, transactions);
        block.sign(key)?;

        self.chain.add_block(block.clone())?;
        self.mempool.clear_pending();

        info!(
            id = %self.id,
            height = block.header.height,
            transactions = block.transactions.len(),
            "produced new block"
        );

        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            if let Err(err) = inner.broadcast_block(&block).await {
                warn!(error = %err, "block broadcast failed");
            }
        });

        Ok(())
    }

    async fn validator_loop(self: Arc<Self>) {
        info!(id = %self.id, block_time = ?self.block_time, "starting validator loop");

        let mut ticker = interval(self.block_time);
        ticker.tick().await; // the first tick completes immediately

        loop {
            ticker.tick().await;
            if let Err(err) = Arc::clone(&self).create_new_block().await {
                warn!(id = %self.id, error = %err, "block production failed");
            }
        }
    }

    async fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), TransportError> {
        let msg = Message::new(MessageType::Tx, tx.to_bytes());
        self.transport.broadcast(msg.to_bytes()).await
    }

    async fn broadcast_block(&self, block: &Block) -> Result<(), TransportError> {
        let msg = Message::new(MessageType::Block, block.to_bytes());
        self.transport.broadcast(msg.to_bytes()).await
    }
}

/// The network genesis: identical on every node, inserted unvalidated.
pub fn genesis_block() -> Block {
    let header = Header {
        version: PROTOCOL_VERSION,
        data_hash: Hash::zero(),
        prev_block_hash: Hash::zero(),
        height: 0,
        timestamp: 0,
    };
    Block::new(header, vec![])
}
