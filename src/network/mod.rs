//! Peer-to-peer networking: transports, mempool, gossip, and the node loop.
//!
//! - [`transport`]: the abstract peer channel and its errors
//! - [`local_transport`]: in-process reference transport
//! - [`txpool`]: bounded mempool with insertion-order draining
//! - [`message`]: wire message envelope and bodies
//! - [`rpc`]: frame decoding into typed messages
//! - [`server`]: the node event loop and block production

pub mod local_transport;
pub mod message;
pub mod rpc;
pub mod server;
pub mod transport;
pub mod txpool;
