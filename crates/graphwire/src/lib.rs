//! GraphQL client transport layer.
//!
//! This crate covers the client side of GraphQL over two transports:
//!
//! - **HTTP**: [`HttpTransport`] executes one query/mutation per call as an
//!   HTTP POST and hands back the raw exchange for the caller to
//!   deserialize into a [`Response`].
//! - **WebSocket**: [`SubscriptionClient`] owns a persistent duplex
//!   connection, speaks either of the two GraphQL-over-WebSocket
//!   subprotocol dialects, and multiplexes any number of subscriptions
//!   over it by id.
//!
//! Operations come from `.graphql`/`.graphqlfrag` documents via the
//! [`loader`] functions, which use the bundled parser
//! ([`graphwire_parser`], re-exported as [`parser`]) to split source into
//! [`Query`] and [`Fragment`] values; [`Query::to_request`] composes an
//! operation with its fragments into the wire-format [`Request`].
//!
//! # Example
//!
//! ```ignore
//! use graphwire::{loader, HttpTransport, Response};
//! use http::HeaderMap;
//!
//! let queries = loader::load_query_file("hero.graphql")?;
//! let request = queries[0].to_request(&[], None);
//!
//! let transport = HttpTransport::new()?;
//! let exchange = transport
//!     .execute("https://api.example.com/graphql", &request, &HeaderMap::new(), None, None)
//!     .await?;
//! let response = Response::from_body(&exchange.body)?;
//! ```

mod error;
mod http;
pub mod loader;
mod query;
mod request;
mod response;
pub mod subscription;

pub use graphwire_parser as parser;

pub use error::{Error, Result};
pub use http::{HttpExchange, HttpTransport, HttpTransportBuilder};
pub use query::{Fragment, OperationType, Query};
pub use request::Request;
pub use response::{ErrorLocation, GraphQLError, PathSegment, Response};
pub use subscription::{
    ConnectionState, SubprotocolVariant, SubscriptionClient, SubscriptionClientBuilder,
    SubscriptionEvent, SubscriptionStream,
};
