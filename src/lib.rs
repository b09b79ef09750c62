pub mod client;
pub mod connection;
pub mod frame;
pub mod message;
pub mod server;


// Re-export the frame type and the server core for direct access

pub use frame::Frame;
pub use server::{ConnId, Server, ServerState};

// Re-export the main client API for easy access
pub use client::{
    Broadcast, ChatClient, ChatConnection, ClientBuilder, ClientError, ClientResult,
    DefaultClient, SendOutcome,
};

/// Error returned by most functions.
///
/// When writing a real application, one might want to consider a specialized
/// error handling crate or defining an error type as an `enum` of causes.
/// However, for our example, using a boxed `std::error::Error` is sufficient.
///
/// For performance reasons, boxing is avoided in any hot path. For example,
/// in `parse`, a custom error `enum` is defined. This is because the error is
/// hit and handled during normal execution when a partial frame is received
/// on a socket. `std::error::Error` is implemented for `frame::Error` which
/// allows it to be converted to `Box<dyn std::error::Error>`.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for chat operations.
///
/// This is defined as a convenience.
///
/// # Examples
///
/// ## A complete round trip
///
/// This example starts an in-process server, connects a client, and sends a
/// message to a room:
///
/// ```rust,no_run
/// use natter::{ChatClient, ChatConnection, DefaultClient, Server};
/// use tokio::net::TcpListener;
///
/// #[tokio::main]
/// async fn main() -> natter::Result<()> {
///     let listener = TcpListener::bind("127.0.0.1:13180").await?;
///     tokio::spawn(Server::new().run(listener));
///
///     let mut client = DefaultClient::connect("127.0.0.1:13180").await?;
///     client.identify("alice").await?;
///     client.join_room("lobby").await?;
///     client.msg_room("lobby", "Hello World!").await?;
///     client.disconnect().await?;
///
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
