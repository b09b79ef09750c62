// ABOUTME: Default chat client implementation providing complete trait implementations
// ABOUTME: Multiplexes in-flight calls over one stream and surfaces disconnection as a failed call

use crate::client::error::{ClientError, ClientResult};
use crate::client::router::Router;
use crate::client::traits::{ChatClient, ChatConnection};
use crate::client::types::SendOutcome;
use crate::connection::{Connection, FrameReader, FrameWriter};
use crate::frame::Frame;
use crate::message::{self, tags};
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::watch;
use tracing::warn;

/// Default chat client implementation
///
/// Owns the write half of one connection; a background task owns the read
/// half and routes every inbound frame through the per-connection routing
/// table. Each verb is a call: install the completion slot(s) for the reply
/// tag(s), write the frame, await whichever fires first of the slots and the
/// `disconnected` signal.
pub struct DefaultClient {
    writer: FrameWriter<OwnedWriteHalf>,
    router: Arc<Router>,
    disconnected: watch::Receiver<bool>,
    /// The name bound by a successful `identify`, recorded so gated verbs
    /// can refuse locally without touching the wire.
    name: Option<String>,
}

impl ChatConnection for DefaultClient {
    async fn connect<T: ToSocketAddrs + Send>(addr: T) -> ClientResult<Self> {
        let socket = TcpStream::connect(addr).await?;
        let (reader, writer) = Connection::new(socket).into_split();

        let router = Arc::new(Router::default());
        let (closed_tx, closed_rx) = watch::channel(false);
        tokio::spawn(read_loop(reader, Arc::clone(&router), closed_tx));

        Ok(DefaultClient {
            writer,
            router,
            disconnected: closed_rx,
            name: None,
        })
    }

    async fn disconnect(&mut self) -> ClientResult<()> {
        if self.is_connected() {
            // A write failure just means the stream beat us to closing.
            let _ = self.writer.write_frame(&message::terminate()).await;
            let mut disconnected = self.disconnected.clone();
            let _ = disconnected.wait_for(|closed| *closed).await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !*self.disconnected.borrow()
    }
}

impl ChatClient for DefaultClient {
    async fn echo(&mut self, text: &str) -> ClientResult<String> {
        let reply = self.call(message::echo(text), tags::ECHO).await?;
        Ok(reply.str_payload().into_owned())
    }

    async fn identify(&mut self, name: &str) -> ClientResult<()> {
        let reply = self
            .call2(message::identify(name), tags::IDENTIFIED, tags::ID_TAKEN)
            .await?;
        if reply.handler == tags::ID_TAKEN {
            return Err(ClientError::NameTaken(name.to_string()));
        }

        self.name = Some(name.to_string());
        Ok(())
    }

    async fn create_room(&mut self, room: &str) -> ClientResult<()> {
        self.gate()?;
        self.call(message::create_room(room), tags::ROOM_CREATED)
            .await?;
        Ok(())
    }

    async fn list_rooms(&mut self) -> ClientResult<Vec<String>> {
        self.gate()?;
        let reply = self.call(message::list_rooms(), tags::ROOM_LIST).await?;
        Ok(split_names(&reply.str_payload()))
    }

    async fn join_room(&mut self, room: &str) -> ClientResult<()> {
        self.gate()?;
        self.call(message::join_room(room), tags::ROOM_JOINED)
            .await?;
        Ok(())
    }

    async fn leave_room(&mut self, room: &str) -> ClientResult<()> {
        self.gate()?;
        self.call(message::leave_room(room), tags::ROOM_LEFT)
            .await?;
        Ok(())
    }

    async fn room_members(&mut self, room: &str) -> ClientResult<Vec<String>> {
        self.gate()?;
        let reply = self
            .call(message::room_members(room), tags::MEMBER_LIST)
            .await?;
        Ok(split_names(&reply.str_payload()))
    }

    async fn msg_room(&mut self, room: &str, text: &str) -> ClientResult<SendOutcome> {
        self.gate()?;
        let reply = self
            .call2(
                message::msg_room(room, text.as_bytes()),
                tags::ROOM_MSGD,
                tags::NO_ROOM,
            )
            .await?;
        Ok(if reply.handler == tags::NO_ROOM {
            SendOutcome::NoSuchRoom(reply.str_payload().into_owned())
        } else {
            SendOutcome::Delivered
        })
    }

    async fn msg_client(&mut self, target: &str, text: &str) -> ClientResult<SendOutcome> {
        self.gate()?;
        let reply = self
            .call2(
                message::msg_client(target, text.as_bytes()),
                tags::CLIENT_MSGD,
                tags::NO_CLIENT,
            )
            .await?;
        Ok(if reply.handler == tags::NO_CLIENT {
            SendOutcome::NoSuchClient(reply.str_payload().into_owned())
        } else {
            SendOutcome::Delivered
        })
    }
}

impl DefaultClient {
    /// The name this client identified with, if it has.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Install a durable handler for a server-originated tag (`broadcast`,
    /// `client_msg`). Unlike a call's completion slot, the handler stays
    /// installed and sees every matching frame no pending call claims.
    pub fn add_handler(
        &mut self,
        tag: impl Into<String>,
        handler: impl FnMut(&Frame) + Send + 'static,
    ) {
        self.router.add_handler(tag, Box::new(handler));
    }

    fn gate(&self) -> ClientResult<()> {
        if self.name.is_some() {
            Ok(())
        } else {
            Err(ClientError::NotIdentified)
        }
    }

    /// Issue one frame and await the single reply tag it expects, or the
    /// disconnection signal, whichever fires first.
    async fn call(&mut self, frame: Frame, reply: &str) -> ClientResult<Frame> {
        if !self.is_connected() {
            return Err(ClientError::ConnectionReset);
        }

        let slot = self.router.register(reply);
        if let Err(err) = self.writer.write_frame(&frame).await {
            self.router.cancel(reply);
            return Err(ClientError::Connection(err));
        }

        let mut disconnected = self.disconnected.clone();
        let result = tokio::select! {
            completed = slot => completed.map_err(|_| ClientError::ConnectionReset),
            _ = disconnected.wait_for(|closed| *closed) => Err(ClientError::ConnectionReset),
        };
        self.router.cancel(reply);
        result
    }

    /// Issue one frame and race a success tag against a failure tag; the
    /// loser slot is cancelled.
    async fn call2(&mut self, frame: Frame, ok: &str, fail: &str) -> ClientResult<Frame> {
        if !self.is_connected() {
            return Err(ClientError::ConnectionReset);
        }

        let ok_slot = self.router.register(ok);
        let fail_slot = self.router.register(fail);
        if let Err(err) = self.writer.write_frame(&frame).await {
            self.router.cancel(ok);
            self.router.cancel(fail);
            return Err(ClientError::Connection(err));
        }

        let mut disconnected = self.disconnected.clone();
        let result = tokio::select! {
            completed = ok_slot => completed.map_err(|_| ClientError::ConnectionReset),
            completed = fail_slot => completed.map_err(|_| ClientError::ConnectionReset),
            _ = disconnected.wait_for(|closed| *closed) => Err(ClientError::ConnectionReset),
        };
        self.router.cancel(ok);
        self.router.cancel(fail);
        result
    }
}

/// Owns the read half: routes inbound frames until the stream ends, then
/// fails every pending call and raises the disconnection signal.
async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    router: Arc<Router>,
    closed: watch::Sender<bool>,
) {
    loop {
        match reader.read_frame().await {
            Ok(Some(frame)) => router.route(frame),
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "read failed");
                break;
            }
        }
    }

    router.fail_all();
    let _ = closed.send(true);
}

fn split_names(payload: &str) -> Vec<String> {
    if payload.is_empty() {
        Vec::new()
    } else {
        payload.split('\n').map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names_handles_empty_payload() {
        assert!(split_names("").is_empty());
        assert_eq!(split_names("r1"), vec!["r1"]);
        assert_eq!(split_names("r1\nr2"), vec!["r1", "r2"]);
    }
}
