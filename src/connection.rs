// ABOUTME: Provides TCP connection management for the chat protocol
// ABOUTME: Implements frame-based I/O with buffering for optimal network performance

use crate::frame::{self, Frame};
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Inbound half of a frame-based endpoint.
///
/// Accumulates received bytes into an internal buffer and peels whole frames
/// off the head, so it tolerates both TCP coalescing (several frames in one
/// receive) and fragmentation (one frame across several receives).
#[derive(Debug)]
pub struct FrameReader<R> {
    src: R,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(src: R) -> FrameReader<R> {
        FrameReader {
            src,
            // Default to a 4KB read buffer; plenty for chat traffic. A
            // deployment pushing large payloads may want to tune this.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a
    /// frame. Any data remaining in the read buffer after the frame has been
    /// parsed is kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the stream is closed
    /// in a way that doesn't break a frame in half, it returns `None`.
    /// Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // There is not enough buffered data to read a frame. Attempt to
            // read more data from the socket.
            //
            // On success, the number of bytes is returned. `0` indicates "end
            // of stream".
            if 0 == self.src.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer. If
                // there is, this means that the peer closed the socket while
                // sending a frame.
                return self
                    .buffer
                    .is_empty()
                    .then(|| None)
                    .ok_or_else(|| "connection reset by peer".into());
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If
    /// not enough data has been buffered yet, `Ok(None)` is returned. If the
    /// buffered data does not represent a valid frame, `Err` is returned.
    fn parse_frame(&mut self) -> crate::Result<Option<Frame>> {
        use frame::Error::Incomplete;

        // Cursor is used to track the "current" location in the buffer.
        // Cursor also implements `Buf` from the `bytes` crate which provides
        // a number of helpful utilities for working with bytes.
        let mut buf = Cursor::new(&self.buffer[..]);

        // Checking for a whole frame first lets us skip allocating anything
        // until the full frame has been received.
        match Frame::check(&mut buf) {
            Ok(len) => {
                // Parse the frame from the buffer. This allocates the
                // structures needed to represent it and returns the frame
                // value.
                let frame = Frame::parse(&mut buf)?;

                // Discard the parsed data from the read buffer.
                self.buffer.advance(len);

                Ok(Some(frame))
            }
            // There is not enough data present in the read buffer to parse a
            // single frame. We must wait for more data to be received from
            // the socket.
            //
            // We do not want to return `Err` from here as this "error" is an
            // expected runtime condition.
            Err(Incomplete) => Ok(None),
            // An error was encountered while parsing the frame. The
            // connection is now in an invalid state. Returning `Err` from
            // here will result in the connection being closed.
            Err(e) => Err(e.into()),
        }
    }
}

/// Outbound half of a frame-based endpoint. Writes are fire-and-forget: the
/// frame is serialized into the buffered stream and flushed; no
/// application-level acknowledgment is implied.
#[derive(Debug)]
pub struct FrameWriter<W> {
    // Decorated with a `BufWriter`, which provides write level buffering so
    // each frame costs a bounded number of syscalls.
    dst: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(dst: W) -> FrameWriter<W> {
        FrameWriter {
            dst: BufWriter::new(dst),
        }
    }

    /// Write a single `Frame` value to the underlying stream.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.dst.write_all(&frame.to_bytes()).await?;

        // The write above lands in the buffered stream; `flush` pushes the
        // remaining contents to the socket.
        self.dst.flush().await
    }
}

/// A chat protocol endpoint bound to exactly one TCP stream.
///
/// Used on both sides: the server wraps each accepted socket in one and the
/// client wraps its outbound socket. Callers that need to read and write
/// from separate tasks split it first.
#[derive(Debug)]
pub struct Connection {
    reader: FrameReader<OwnedReadHalf>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`. Read and write buffers
    /// are initialized.
    pub fn new(socket: TcpStream) -> Connection {
        let (read_half, write_half) = socket.into_split();
        Connection {
            reader: FrameReader::new(read_half),
            writer: FrameWriter::new(write_half),
        }
    }

    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        self.reader.read_frame().await
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.writer.write_frame(frame).await
    }

    /// Splits the endpoint so reading and writing can proceed from separate
    /// tasks. Dropping both halves closes the stream.
    pub fn into_split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        (self.reader, self.writer)
    }
}
