//! Management wire messages
//!
//! Test harnesses talk to a launcher's cluster manager over TCP. Every frame is
//! a 4-byte big-endian length prefix followed by a bincode payload.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::{SharedError, SharedResult};
use crate::types::{NodeEntry, NodeId};

/// Upper bound on a single frame payload
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests accepted by the management listener
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ManagementRequest {
    RegisterNode(NodeEntry),
    UnregisterNode(NodeId),
    GetNode(NodeId),
    ListNodes,
    /// Ask the owning launcher to stop the node's broker process
    TerminateNode(NodeId),
    Ping,
}

/// Responses sent back for each request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ManagementResponse {
    Ack,
    /// `None` means no node is registered under the requested id
    Node(Option<NodeEntry>),
    Nodes(Vec<NodeEntry>),
    Terminated(bool),
    Pong { name: String },
    Error { message: String },
}

/// Serialize a message into a length-prefixed frame
pub fn encode_frame<T: Serialize>(message: &T) -> SharedResult<Vec<u8>> {
    let payload = bincode::serialize(message).map_err(|e| SharedError::SerializationError {
        message: e.to_string(),
    })?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(SharedError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Deserialize a frame payload (without its length prefix)
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> SharedResult<T> {
    bincode::deserialize(payload).map_err(|e| SharedError::DeserializationError {
        message: e.to_string(),
    })
}

/// Validate a length prefix read off the wire
pub fn check_frame_len(len_bytes: [u8; 4]) -> SharedResult<usize> {
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(SharedError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(len)
}
