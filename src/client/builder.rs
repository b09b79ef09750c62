// ABOUTME: Client factory for easy chat client creation
// ABOUTME: Provides convenient constructors that bundle connect and identify

use crate::client::default::DefaultClient;
use crate::client::error::ClientResult;
use crate::client::traits::{ChatClient, ChatConnection};
use tokio::net::ToSocketAddrs;

/// Factory for creating chat clients
///
/// Bundles the connection + identification steps for the common cases.
/// Returned clients are concrete [`DefaultClient`]s so callers can still
/// install durable handlers with
/// [`add_handler`](DefaultClient::add_handler).
pub struct ClientBuilder;

impl ClientBuilder {
    /// Create a connection without identifying
    ///
    /// Just establishes the TCP connection. Only `echo`, `identify` and
    /// `disconnect` are usable until `identify` completes.
    pub async fn connection<T: ToSocketAddrs + Send>(addr: T) -> ClientResult<DefaultClient> {
        DefaultClient::connect(addr).await
    }

    /// Connect and identify in a single operation
    ///
    /// The returned client is past the identification gate and every verb is
    /// available.
    pub async fn identified<T: ToSocketAddrs + Send>(
        addr: T,
        name: impl AsRef<str>,
    ) -> ClientResult<DefaultClient> {
        let mut client = DefaultClient::connect(addr).await?;
        client.identify(name.as_ref()).await?;
        Ok(client)
    }
}
