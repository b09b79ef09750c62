// ABOUTME: Supporting types for chat client operations
// ABOUTME: Carries delivery outcomes and parsed server-pushed messages

use crate::frame::Frame;
use crate::message;
use bytes::Bytes;

/// Outcome of a delivery verb (`msg_room`, `msg_client`).
///
/// The failure replies resolve the call with a descriptive value rather than
/// an error: a missing room or client is an ordinary answer, not a fault.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message (`room_msgd` / `client_msgd`).
    Delivered,
    /// No room by this name (`no_room`).
    NoSuchRoom(String),
    /// No client by this name (`no_client`).
    NoSuchClient(String),
}

/// A parsed `broadcast` frame: who said what, where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Broadcast {
    pub room: String,
    pub sender: String,
    pub body: Bytes,
}

impl From<&Frame> for Broadcast {
    fn from(frame: &Frame) -> Broadcast {
        let (room, sender) = message::broadcast_origin(frame);
        Broadcast {
            room,
            sender,
            body: frame.payload.clone(),
        }
    }
}
