// ABOUTME: Core chat client traits using native async functions for modern Rust implementations
// ABOUTME: Defines extensible interfaces for connection management and the protocol verbs

use crate::client::error::ClientResult;
use crate::client::types::SendOutcome;
use std::future::Future;
use tokio::net::ToSocketAddrs;

/// Base connection management for chat clients
///
/// Provides fundamental connection lifecycle operations regardless of
/// whether the client has identified yet.
pub trait ChatConnection {
    /// Establish a connection to the chat server
    ///
    /// Creates a TCP connection to the specified address and starts the
    /// background reader that routes server-pushed frames.
    fn connect<T: ToSocketAddrs + Send>(addr: T) -> impl Future<Output = ClientResult<Self>> + Send
    where
        Self: Sized;

    /// Gracefully disconnect from the server
    ///
    /// Sends `terminate` and waits for the server to close the stream.
    fn disconnect(&mut self) -> impl Future<Output = ClientResult<()>> + Send;

    /// Check if the connection is active
    ///
    /// Returns false once the stream has gone away; every later call fails
    /// immediately without writing.
    fn is_connected(&self) -> bool;
}

/// One call per protocol verb
///
/// Each call writes its frame, then awaits the reply tag(s) it expects or
/// the connection's disconnection signal, whichever fires first. Verbs other
/// than `echo` and `identify` require a completed `identify` and answer
/// [`ClientError::NotIdentified`](crate::client::ClientError::NotIdentified)
/// otherwise, without touching the wire.
pub trait ChatClient: ChatConnection {
    /// Round-trip a text payload through the server unchanged.
    fn echo(&mut self, text: &str) -> impl Future<Output = ClientResult<String>> + Send;

    /// Claim `name` on the server. Names are first-come-first-served; a name
    /// already held by another connection answers
    /// [`ClientError::NameTaken`](crate::client::ClientError::NameTaken).
    fn identify(&mut self, name: &str) -> impl Future<Output = ClientResult<()>> + Send;

    /// Create a room. Creating a room that already exists succeeds.
    fn create_room(&mut self, room: &str) -> impl Future<Output = ClientResult<()>> + Send;

    /// Room names in creation order.
    fn list_rooms(&mut self) -> impl Future<Output = ClientResult<Vec<String>>> + Send;

    /// Join a room, creating it first if nobody has yet.
    fn join_room(&mut self, room: &str) -> impl Future<Output = ClientResult<()>> + Send;

    /// Leave a room. Leaving a room you are not in succeeds.
    fn leave_room(&mut self, room: &str) -> impl Future<Output = ClientResult<()>> + Send;

    /// Member names of a room in join order; a missing room lists as empty.
    fn room_members(&mut self, room: &str) -> impl Future<Output = ClientResult<Vec<String>>> + Send;

    /// Broadcast `text` to every member of `room` (including this client,
    /// when it is a member).
    fn msg_room(
        &mut self,
        room: &str,
        text: &str,
    ) -> impl Future<Output = ClientResult<SendOutcome>> + Send;

    /// Send `text` to the named client.
    fn msg_client(
        &mut self,
        target: &str,
        text: &str,
    ) -> impl Future<Output = ClientResult<SendOutcome>> + Send;
}
