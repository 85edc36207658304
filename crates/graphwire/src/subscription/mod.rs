//! GraphQL subscriptions over a persistent WebSocket connection.
//!
//! A [`SubscriptionClient`] owns exactly one duplex connection and
//! multiplexes any number of subscriptions over it, keyed by caller-chosen
//! ids. One spawned task runs the connection: it is the sole reader and the
//! sole writer of the socket, with caller-initiated frames funneled through
//! a command channel.
//!
//! ```ignore
//! use graphwire::{Request, SubscriptionClient, SubscriptionEvent};
//!
//! let client = SubscriptionClient::builder("https://api.example.com/graphql")
//!     .bearer_auth("my-token")
//!     .build()?;
//! client.connect().await?;
//!
//! let mut stream = client
//!     .subscribe("events", &Request::new("subscription { events { id } }"))
//!     .await?;
//! while let Some(event) = stream.next().await {
//!     match event {
//!         SubscriptionEvent::Data(payload) => println!("{payload:?}"),
//!         SubscriptionEvent::Completed => break,
//!         SubscriptionEvent::Failed(error) => return Err(error),
//!     }
//! }
//! ```

use std::fmt;

mod client;
mod protocol;
mod registry;

pub use client::{SubscriptionClient, SubscriptionClientBuilder, SubscriptionStream};
pub use protocol::SubprotocolVariant;
pub use registry::{SubscriptionEvent, SubscriptionRegistry};

/// Lifecycle state of the subscription connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection. The initial and terminal state.
    Disconnected,
    /// The socket is being opened.
    Connecting,
    /// `connection_init` is on the wire, waiting for the server's ack.
    AwaitingAck,
    /// Handshake complete; subscriptions can be started.
    Ready,
    /// Shutdown requested, close frame going out.
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingAck => "awaiting ack",
            Self::Ready => "ready",
            Self::Closing => "closing",
        })
    }
}
