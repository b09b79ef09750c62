//! Provides a type representing a single chat protocol frame as well as
//! utilities for parsing frames from a byte array.
//!
//! A frame carries three fields: a short `handler` tag that selects routing,
//! and two opaque byte runs (`header` and `payload`) whose interpretation is
//! up to the handler. On the wire each field is preceded by its length as an
//! unsigned 64-bit big-endian integer; there is no magic, no checksum and no
//! version field, so frames are delimited solely by their declared lengths
//! and concatenate freely.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use core::fmt;
use std::borrow::Cow;
use std::io::Cursor;
use std::mem::size_of;
use thiserror::Error;

/// Maximum allowed size for any single frame field, to keep a hostile or
/// confused peer from forcing an unbounded allocation.
pub const MAX_FIELD_SIZE: u64 = 16 * 1024 * 1024;

/// Size of the length preamble: three big-endian `u64` values
/// (handler length, header length, payload length).
pub const PREAMBLE_SIZE: usize = 3 * size_of::<u64>();

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Routing tag, UTF-8 on the wire.
    pub handler: String,
    /// Opaque bytes, may be empty.
    pub header: Bytes,
    /// Opaque bytes, may be empty.
    pub payload: Bytes,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Not enough data is available to parse a frame
    #[error("stream ended early")]
    Incomplete,

    /// A declared field length exceeds the per-field cap
    #[error("protocol error; {field} length {declared} exceeds cap of {max} bytes")]
    FieldTooLarge {
        field: &'static str,
        declared: u64,
        max: u64,
    },
}

impl Frame {
    pub fn new(
        handler: impl Into<String>,
        header: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Frame {
        Frame {
            handler: handler.into(),
            header: header.into(),
            payload: payload.into(),
        }
    }

    /// Checks if an entire frame can be decoded from `src`. If it can be,
    /// returns the total frame size in bytes.
    ///
    /// This is much cheaper than a full parse: nothing is allocated unless
    /// the whole frame is known to be buffered.
    #[tracing::instrument]
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<usize, Error> {
        let (handler_len, header_len, payload_len) = peek_lengths(src)?;

        for (field, declared) in [
            ("handler", handler_len),
            ("header", header_len),
            ("payload", payload_len),
        ] {
            if declared > MAX_FIELD_SIZE {
                return Err(Error::FieldTooLarge {
                    field,
                    declared,
                    max: MAX_FIELD_SIZE,
                });
            }
        }

        let total = PREAMBLE_SIZE + (handler_len + header_len + payload_len) as usize;
        (src.remaining() >= total)
            .then_some(total)
            .ok_or(Error::Incomplete)
    }

    /// The frame has already been validated with `check`.
    #[tracing::instrument]
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
        let handler_len = get_u64(src)? as usize;
        let header_len = get_u64(src)? as usize;
        let payload_len = get_u64(src)? as usize;

        let handler = get_bytes(src, handler_len)?;
        let header = get_bytes(src, header_len)?;
        let payload = get_bytes(src, payload_len)?;

        // Malformed tag bytes are replaced rather than treated as fatal; a
        // garbled tag simply routes to `not_found`.
        Ok(Frame {
            handler: String::from_utf8_lossy(&handler).into_owned(),
            header,
            payload,
        })
    }

    /// Encode the frame into `buf`: the three lengths, then the three byte
    /// runs, exactly as declared.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64(self.handler.len() as u64);
        buf.put_u64(self.header.len() as u64);
        buf.put_u64(self.payload.len() as u64);
        buf.put_slice(self.handler.as_bytes());
        buf.put_slice(&self.header);
        buf.put_slice(&self.payload);
    }

    /// Convert this frame to its wire representation.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// The encoded size without actually encoding.
    pub fn encoded_size(&self) -> usize {
        PREAMBLE_SIZE + self.handler.len() + self.header.len() + self.payload.len()
    }

    /// The header as text. Malformed bytes are replaced, never fatal.
    pub fn str_header(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.header)
    }

    /// The payload as text. Malformed bytes are replaced, never fatal.
    pub fn str_payload(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

fn peek_lengths(src: &mut Cursor<&[u8]>) -> Result<(u64, u64, u64), Error> {
    if src.remaining() < PREAMBLE_SIZE {
        return Err(Error::Incomplete);
    }

    let pos = src.position();
    let lengths = (src.get_u64(), src.get_u64(), src.get_u64());
    src.set_position(pos);
    Ok(lengths)
}

fn get_u64(src: &mut Cursor<&[u8]>) -> Result<u64, Error> {
    if src.remaining() < size_of::<u64>() {
        return Err(Error::Incomplete);
    }

    Ok(src.get_u64())
}

fn get_bytes(src: &mut Cursor<&[u8]>, n: usize) -> Result<Bytes, Error> {
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }

    Ok(src.copy_to_bytes(n))
}

impl fmt::Display for Frame {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "{} header={}B payload={}B",
            self.handler,
            self.header.len(),
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::new(
            "echo",
            Bytes::from_static(b"header"),
            Bytes::from_static(b"Hello World!"),
        )
    }

    #[test]
    fn check_incomplete_preamble() {
        let data = vec![0u8; 7];
        let mut cursor = Cursor::new(data.as_slice());

        assert!(matches!(Frame::check(&mut cursor), Err(Error::Incomplete)));
    }

    #[test]
    fn check_incomplete_body() {
        let mut encoded = BytesMut::new();
        sample().encode(&mut encoded);
        // Drop the final byte so the declared lengths overrun the buffer.
        let truncated = &encoded[..encoded.len() - 1];
        let mut cursor = Cursor::new(truncated);

        assert!(matches!(Frame::check(&mut cursor), Err(Error::Incomplete)));
    }

    #[test]
    fn check_rejects_oversized_field() {
        let mut buf = BytesMut::new();
        buf.put_u64(4);
        buf.put_u64(MAX_FIELD_SIZE + 1);
        buf.put_u64(0);
        buf.put_slice(b"echo");
        let mut cursor = Cursor::new(&buf[..]);

        assert!(matches!(
            Frame::check(&mut cursor),
            Err(Error::FieldTooLarge { field: "header", .. })
        ));
    }

    #[test]
    fn check_reports_total_size() {
        let frame = sample();
        let encoded = frame.to_bytes();
        let mut cursor = Cursor::new(encoded.as_ref());

        assert_eq!(Frame::check(&mut cursor).unwrap(), frame.encoded_size());
    }

    #[test]
    fn wire_layout_is_three_lengths_then_bytes() {
        let encoded = sample().to_bytes();

        assert_eq!(&encoded[..8], 4u64.to_be_bytes().as_slice());
        assert_eq!(&encoded[8..16], 6u64.to_be_bytes().as_slice());
        assert_eq!(&encoded[16..24], 12u64.to_be_bytes().as_slice());
        assert_eq!(&encoded[24..28], b"echo");
        assert_eq!(&encoded[28..34], b"header");
        assert_eq!(&encoded[34..], b"Hello World!");
    }

    #[test]
    fn round_trip_identity() {
        let frame = sample();
        let encoded = frame.to_bytes();
        let mut cursor = Cursor::new(encoded.as_ref());

        Frame::check(&mut cursor).unwrap();
        assert_eq!(Frame::parse(&mut cursor).unwrap(), frame);
    }

    #[test]
    fn empty_fields_round_trip() {
        let frame = Frame::new("terminate", Bytes::new(), Bytes::new());
        let encoded = frame.to_bytes();
        let mut cursor = Cursor::new(encoded.as_ref());

        assert_eq!(Frame::check(&mut cursor).unwrap(), PREAMBLE_SIZE + 9);
        assert_eq!(Frame::parse(&mut cursor).unwrap(), frame);
    }

    #[test]
    fn concatenated_frames_parse_in_order() {
        let frames = vec![
            Frame::new("echo", Bytes::new(), Bytes::from_static(b"one")),
            Frame::new("identify", Bytes::new(), Bytes::from_static(b"alice")),
            Frame::new("terminate", Bytes::new(), Bytes::new()),
        ];

        let mut wire = BytesMut::new();
        for frame in &frames {
            frame.encode(&mut wire);
        }

        let mut cursor = Cursor::new(&wire[..]);
        let mut parsed = Vec::new();
        while (cursor.position() as usize) < wire.len() {
            Frame::check(&mut cursor).unwrap();
            parsed.push(Frame::parse(&mut cursor).unwrap());
        }

        assert_eq!(parsed, frames);
    }

    #[test]
    fn malformed_tag_bytes_are_replaced() {
        let mut buf = BytesMut::new();
        buf.put_u64(2);
        buf.put_u64(0);
        buf.put_u64(0);
        buf.put_slice(&[0xff, 0xfe]);

        let mut cursor = Cursor::new(&buf[..]);
        let frame = Frame::parse(&mut cursor).unwrap();
        assert_eq!(frame.handler, "\u{fffd}\u{fffd}");
    }
}
