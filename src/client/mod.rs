// ABOUTME: Chat client module providing trait-based interfaces for extensible client implementations
// ABOUTME: Exports all client components including traits, builders, error types, and default implementation

//! Chat Client Module
//!
//! This module provides a trait-based chat client with the following
//! features:
//!
//! * **Native async traits** - Uses Rust 1.75+ async fn in traits (no async_trait dependency)
//! * **Call-and-reply semantics** - Each protocol verb is one async call,
//!   correlated with the reply frame(s) it expects
//! * **Multiplexing** - Many in-flight calls share one stream; a background
//!   reader routes replies through a per-connection routing table
//! * **Disconnection as a failed call** - The `disconnected` signal
//!   participates in every wait, so a dropped stream fails pending calls
//!   with `ConnectionReset` instead of hanging them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use natter::client::{ChatClient, ChatConnection, ClientBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Connect and claim a name
//! let mut client = ClientBuilder::identified("localhost:13180", "alice").await?;
//!
//! // Join a room and say hello
//! client.join_room("lobby").await?;
//! client.msg_room("lobby", "Hello World!").await?;
//!
//! // Clean shutdown
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Receiving pushed messages
//!
//! Replies are claimed by the call that awaits them; everything else — room
//! broadcasts and private messages — goes to durable handlers:
//!
//! ```rust,no_run
//! use natter::client::{Broadcast, ClientBuilder};
//! use natter::message::tags;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = ClientBuilder::identified("localhost:13180", "alice").await?;
//! client.add_handler(tags::BROADCAST, |frame| {
//!     let msg = Broadcast::from(frame);
//!     println!("[{}] {}: {}", msg.room, msg.sender, frame.str_payload());
//! });
//! # Ok(())
//! # }
//! ```
//!
//! One caveat: the routing table holds one pending slot per reply tag, so
//! issuing two concurrent calls that await the same tag is a programming
//! error. Sequential calls (the normal case) never collide.

pub mod builder;
pub mod default;
pub mod error;
mod router;
pub mod traits;
pub mod types;

// Re-export the main types for easy access
pub use builder::ClientBuilder;
pub use default::DefaultClient;
pub use error::{ClientError, ClientResult};
pub use traits::{ChatClient, ChatConnection};
pub use types::{Broadcast, SendOutcome};
