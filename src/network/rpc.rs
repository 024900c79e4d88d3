//! RPC framing and message decoding.
//!
//! A transport delivers [`Rpc`] frames; [`decode_message`] peels the
//! envelope and produces a typed [`DecodedMessage`] for the server loop to
//! dispatch on.

use crate::core::block::Block;
use crate::core::transaction::Transaction;
use crate::network::message::{GetBlocksMessage, StatusMessage};
use crate::types::bytes::Bytes;
use crate::types::encoding::{Decode, DecodeError};
use solochain_derive::BinaryCodec;
use thiserror::Error;

/// Errors from decoding inbound traffic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RpcError {
    /// The envelope or body did not parse.
    #[error("failed to decode message: {0}")]
    DecodeFailed(#[from] DecodeError),

    /// The envelope's type byte matches no known message.
    #[error("unknown message type {0:#x}")]
    UnknownMessageType(u8),
}

/// A raw frame as delivered by a transport.
#[derive(Debug, BinaryCodec)]
pub struct Rpc {
    /// Address of the sending peer.
    pub from: String,
    /// The serialized [`Message`](crate::network::message::Message).
    pub payload: Bytes,
}

impl Rpc {
    pub fn new(from: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            from: from.into(),
            payload: payload.into(),
        }
    }
}

/// A message body after envelope decoding.
#[derive(Debug)]
pub enum DecodedMessageData {
    Tx(Transaction),
    Block(Block),
    GetBlocks(GetBlocksMessage),
    Status(StatusMessage),
    GetStatus,
}

/// A fully decoded message with its sender.
#[derive(Debug)]
pub struct DecodedMessage {
    pub from: String,
    pub data: DecodedMessageData,
}

/// Decodes the envelope and the typed body out of a raw frame.
///
/// The envelope is read field-by-field rather than through the
/// `MessageType` enum so that an unrecognized type byte surfaces as
/// [`RpcError::UnknownMessageType`] instead of a generic decode failure.
pub fn decode_message(rpc: &Rpc) -> Result<DecodedMessage, RpcError> {
    let mut input = rpc.payload.as_slice();
    let header = u8::decode(&mut input)?;
    let body = Bytes::decode(&mut input)?;

    let data = match header {
        0x1 => DecodedMessageData::Tx(Transaction::from_bytes(&body)?),
        0x2 => DecodedMessageData::Block(Block::from_bytes(&body)?),
        0x3 => DecodedMessageData::GetBlocks(GetBlocksMessage::from_bytes(&body)?),
        0x4 => DecodedMessageData::Status(StatusMessage::from_bytes(&body)?),
        0x5 => {
            if !body.is_empty() {
                return Err(RpcError::DecodeFailed(DecodeError::InvalidValue));
            }
            DecodedMessageData::GetStatus
        }
        other => return Err(RpcError::UnknownMessageType(other)),
    };

    Ok(DecodedMessage {
        from: rpc.from.clone(),
        data,
    })
}
