//! The closed catalogue of protocol messages.
//!
//! Every message on the wire is a [`Frame`]; this module pins down how each
//! verb populates the three generic fields. Only the tags listed in [`tags`]
//! are produced by compliant peers; a receiver that sees anything else
//! answers with [`not_found`] and carries on.

use crate::frame::Frame;
use bytes::Bytes;

/// Handler tags, one constant per verb.
pub mod tags {
    pub const ECHO: &str = "echo";
    pub const TERMINATE: &str = "terminate";
    pub const NOT_FOUND: &str = "not_found";

    pub const IDENTIFY: &str = "identify";
    pub const IDENTIFIED: &str = "identified";
    pub const ID_TAKEN: &str = "id_taken";
    pub const REQ_ID: &str = "req_id";

    pub const CREATE_ROOM: &str = "create_room";
    pub const ROOM_CREATED: &str = "room_created";
    pub const LIST_ROOMS: &str = "list_rooms";
    pub const ROOM_LIST: &str = "room_list";
    pub const JOIN_ROOM: &str = "join_room";
    pub const ROOM_JOINED: &str = "room_joined";
    pub const LEAVE_ROOM: &str = "leave_room";
    pub const ROOM_LEFT: &str = "room_left";
    pub const ROOM_MEMBERS: &str = "room_members";
    pub const MEMBER_LIST: &str = "member_list";

    pub const MSG_ROOM: &str = "msg_room";
    pub const ROOM_MSGD: &str = "room_msgd";
    pub const NO_ROOM: &str = "no_room";
    pub const BROADCAST: &str = "broadcast";

    pub const MSG_CLIENT: &str = "msg_client";
    pub const CLIENT_MSGD: &str = "client_msgd";
    pub const NO_CLIENT: &str = "no_client";
    pub const CLIENT_MSG: &str = "client_msg";
}

/// Delimiter between room and sender in a `broadcast` header. Names may not
/// contain it; `identify` refuses them.
pub const ORIGIN_DELIMITER: char = ':';

/// Sender reported for a `broadcast` whose header carries no delimiter.
pub const ANONYMOUS: &str = "Anonymous";

pub fn echo(text: &str) -> Frame {
    Frame::new(tags::ECHO, Bytes::new(), Bytes::copy_from_slice(text.as_bytes()))
}

pub fn terminate() -> Frame {
    Frame::new(tags::TERMINATE, Bytes::new(), Bytes::new())
}

pub fn not_found() -> Frame {
    Frame::new(tags::NOT_FOUND, Bytes::new(), Bytes::from_static(b"Handler Not Found"))
}

pub fn identify(name: &str) -> Frame {
    Frame::new(tags::IDENTIFY, Bytes::new(), Bytes::copy_from_slice(name.as_bytes()))
}

pub fn identified() -> Frame {
    Frame::new(tags::IDENTIFIED, Bytes::new(), Bytes::new())
}

pub fn id_taken() -> Frame {
    Frame::new(tags::ID_TAKEN, Bytes::new(), Bytes::new())
}

pub fn req_id() -> Frame {
    Frame::new(tags::REQ_ID, Bytes::new(), Bytes::new())
}

pub fn create_room(room: &str) -> Frame {
    Frame::new(tags::CREATE_ROOM, Bytes::new(), Bytes::copy_from_slice(room.as_bytes()))
}

pub fn room_created() -> Frame {
    Frame::new(tags::ROOM_CREATED, Bytes::new(), Bytes::new())
}

pub fn list_rooms() -> Frame {
    Frame::new(tags::LIST_ROOMS, Bytes::new(), Bytes::new())
}

/// Payload is the names joined by newlines, in the order given.
pub fn room_list(names: &[&str]) -> Frame {
    Frame::new(tags::ROOM_LIST, Bytes::new(), Bytes::from(names.join("\n")))
}

pub fn join_room(room: &str) -> Frame {
    Frame::new(tags::JOIN_ROOM, Bytes::new(), Bytes::copy_from_slice(room.as_bytes()))
}

pub fn room_joined() -> Frame {
    Frame::new(tags::ROOM_JOINED, Bytes::new(), Bytes::new())
}

pub fn leave_room(room: &str) -> Frame {
    Frame::new(tags::LEAVE_ROOM, Bytes::new(), Bytes::copy_from_slice(room.as_bytes()))
}

pub fn room_left() -> Frame {
    Frame::new(tags::ROOM_LEFT, Bytes::new(), Bytes::new())
}

pub fn room_members(room: &str) -> Frame {
    Frame::new(tags::ROOM_MEMBERS, Bytes::new(), Bytes::copy_from_slice(room.as_bytes()))
}

/// Payload is the member names joined by newlines, in insertion order.
pub fn member_list(names: &[&str]) -> Frame {
    Frame::new(tags::MEMBER_LIST, Bytes::new(), Bytes::from(names.join("\n")))
}

/// Header carries the room name; the body is opaque.
pub fn msg_room(room: &str, body: &[u8]) -> Frame {
    Frame::new(
        tags::MSG_ROOM,
        Bytes::copy_from_slice(room.as_bytes()),
        Bytes::copy_from_slice(body),
    )
}

pub fn room_msgd() -> Frame {
    Frame::new(tags::ROOM_MSGD, Bytes::new(), Bytes::new())
}

pub fn no_room(room: &str) -> Frame {
    Frame::new(tags::NO_ROOM, Bytes::new(), Bytes::copy_from_slice(room.as_bytes()))
}

/// Header is `room:sender`; the body passes through untouched.
pub fn broadcast(room: &str, sender: &str, body: Bytes) -> Frame {
    let origin = format!("{room}{ORIGIN_DELIMITER}{sender}");
    Frame::new(tags::BROADCAST, Bytes::from(origin), body)
}

/// Header carries the target name; the body is opaque.
pub fn msg_client(target: &str, body: &[u8]) -> Frame {
    Frame::new(
        tags::MSG_CLIENT,
        Bytes::copy_from_slice(target.as_bytes()),
        Bytes::copy_from_slice(body),
    )
}

pub fn client_msgd() -> Frame {
    Frame::new(tags::CLIENT_MSGD, Bytes::new(), Bytes::new())
}

pub fn no_client(target: &str) -> Frame {
    Frame::new(tags::NO_CLIENT, Bytes::new(), Bytes::copy_from_slice(target.as_bytes()))
}

/// Header carries the sender name; the body passes through untouched.
pub fn client_msg(sender: &str, body: Bytes) -> Frame {
    Frame::new(tags::CLIENT_MSG, Bytes::copy_from_slice(sender.as_bytes()), body)
}

/// Splits a `broadcast` header into room and sender names. A header with no
/// delimiter names the room alone and the sender falls back to `Anonymous`.
pub fn broadcast_origin(frame: &Frame) -> (String, String) {
    let header = frame.str_header();
    match header.split_once(ORIGIN_DELIMITER) {
        Some((room, sender)) => (room.to_string(), sender.to_string()),
        None => (header.into_owned(), ANONYMOUS.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_carries_text_in_payload() {
        let frame = echo("Hello World!");
        assert_eq!(frame.handler, tags::ECHO);
        assert!(frame.header.is_empty());
        assert_eq!(frame.payload.as_ref(), b"Hello World!");
    }

    #[test]
    fn not_found_payload_is_fixed() {
        assert_eq!(not_found().payload.as_ref(), b"Handler Not Found");
    }

    #[test]
    fn room_list_joins_names_with_newlines() {
        assert_eq!(room_list(&["r1", "r2"]).payload.as_ref(), b"r1\nr2");
        assert!(room_list(&[]).payload.is_empty());
    }

    #[test]
    fn broadcast_header_joins_room_and_sender() {
        let frame = broadcast("test_room", "test_client", Bytes::from_static(b"hi"));
        assert_eq!(frame.str_header(), "test_room:test_client");
        assert_eq!(frame.payload.as_ref(), b"hi");
    }

    #[test]
    fn broadcast_origin_splits_on_first_delimiter() {
        let frame = broadcast("room", "sender", Bytes::new());
        assert_eq!(
            broadcast_origin(&frame),
            ("room".to_string(), "sender".to_string())
        );
    }

    #[test]
    fn broadcast_origin_without_delimiter_is_anonymous() {
        let frame = Frame::new(tags::BROADCAST, Bytes::from_static(b"room"), Bytes::new());
        assert_eq!(
            broadcast_origin(&frame),
            ("room".to_string(), ANONYMOUS.to_string())
        );
    }

    #[test]
    fn msg_client_keeps_body_verbatim() {
        let frame = msg_client("bob", &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(frame.str_header(), "bob");
        assert_eq!(frame.payload.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    }
}
