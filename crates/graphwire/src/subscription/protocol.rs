//! Subprotocol variants and frame encoding/decoding.
//!
//! Two wire-compatible but not cross-compatible dialects exist for GraphQL
//! over WebSocket. The variant is fixed at connect time; frames are encoded
//! with the variant's outgoing names and decoded against its inbound set.
//! A frame type outside that set is a protocol error, never guessed at.

use serde_json::{Map, Value, json};

use crate::error::Error;
use crate::request::Request;

/// The subprotocol dialect negotiated at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubprotocolVariant {
    /// The legacy `graphql-ws` dialect (subscriptions-transport-ws):
    /// `start`/`stop` outbound, `data`/`ka` inbound.
    GraphqlWs,
    /// The `graphql-transport-ws` dialect (graphql-ws library):
    /// `subscribe`/`complete` outbound, `next`/`ping`/`pong` inbound.
    /// Bearer auth travels in the `connection_init` payload.
    GraphqlTransportWs,
}

impl SubprotocolVariant {
    /// The `Sec-WebSocket-Protocol` identifier for this variant.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::GraphqlWs => "graphql-ws",
            Self::GraphqlTransportWs => "graphql-transport-ws",
        }
    }
}

impl std::fmt::Display for SubprotocolVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// An outgoing frame, named per variant at encode time.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// Handshake opener, optionally carrying auth or other init data.
    ConnectionInit { payload: Option<Value> },
    /// Start a subscription under the given id.
    Subscribe { id: String, request: Request },
    /// Stop the subscription with the given id.
    Unsubscribe { id: String },
    /// Keepalive reply (variant B).
    Pong,
}

impl OutboundFrame {
    /// Encode this frame as the JSON text for the given variant.
    pub fn encode(&self, variant: SubprotocolVariant) -> String {
        let value = match self {
            Self::ConnectionInit { payload } => {
                let mut obj = Map::new();
                obj.insert("type".into(), "connection_init".into());
                if let Some(payload) = payload {
                    obj.insert("payload".into(), payload.clone());
                }
                Value::Object(obj)
            }
            Self::Subscribe { id, request } => {
                let ty = match variant {
                    SubprotocolVariant::GraphqlWs => "start",
                    SubprotocolVariant::GraphqlTransportWs => "subscribe",
                };
                json!({"id": id, "type": ty, "payload": request})
            }
            Self::Unsubscribe { id } => {
                let ty = match variant {
                    SubprotocolVariant::GraphqlWs => "stop",
                    SubprotocolVariant::GraphqlTransportWs => "complete",
                };
                json!({"id": id, "type": ty})
            }
            Self::Pong => json!({"type": "pong"}),
        };
        value.to_string()
    }
}

/// An inbound frame, already validated against the negotiated variant.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Handshake accepted.
    ConnectionAck,
    /// No-op keepalive (`ka` on variant A).
    KeepAlive,
    /// Keepalive probe requiring an immediate `pong` (variant B).
    Ping,
    /// Reply to a ping we sent (variant B); ignored.
    Pong,
    /// Payload delivery for a subscription id. A JSON `null` payload is
    /// normalized to `None`.
    Data { id: String, payload: Option<Value> },
    /// The server finished the subscription with the given id.
    Complete { id: String },
    /// Fatal server-reported failure (`connection_error`, `error`, or
    /// `subscription_fail`); the connection is dead.
    ConnectionError { message: String },
}

impl InboundFrame {
    /// Decode one frame of JSON text against the negotiated variant.
    ///
    /// Malformed JSON, a missing `type`, a missing `id` on an id-scoped
    /// frame, and a type outside the variant's inbound set are all
    /// [`Error::Protocol`] (fatal).
    pub fn decode(text: &str, variant: SubprotocolVariant) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Protocol(format!("malformed frame: {e}")))?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Protocol("frame is not a JSON object".into()))?;
        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Protocol("frame has no `type` field".into()))?;

        use SubprotocolVariant::{GraphqlTransportWs, GraphqlWs};
        let frame = match (ty, variant) {
            ("connection_ack", _) => Self::ConnectionAck,
            ("ka", GraphqlWs) => Self::KeepAlive,
            ("ping", GraphqlTransportWs) => Self::Ping,
            ("pong", GraphqlTransportWs) => Self::Pong,
            ("data", GraphqlWs) | ("next", GraphqlTransportWs) => Self::Data {
                id: require_id(obj, ty)?,
                payload: obj.get("payload").filter(|v| !v.is_null()).cloned(),
            },
            ("complete", _) => Self::Complete {
                id: require_id(obj, ty)?,
            },
            ("error", _) => Self::ConnectionError {
                message: payload_message(obj, "operation error"),
            },
            ("connection_error", GraphqlWs) => Self::ConnectionError {
                message: payload_message(obj, "connection refused by server"),
            },
            ("subscription_fail", GraphqlWs) => Self::ConnectionError {
                message: payload_message(obj, "subscription failed"),
            },
            _ => {
                return Err(Error::Protocol(format!(
                    "unexpected `{ty}` frame for subprotocol {}",
                    variant.identifier()
                )));
            }
        };
        Ok(frame)
    }
}

fn require_id(obj: &Map<String, Value>, ty: &str) -> Result<String, Error> {
    obj.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Protocol(format!("`{ty}` frame has no `id` field")))
}

/// Best-effort human-readable message out of a frame payload.
fn payload_message(obj: &Map<String, Value>, fallback: &str) -> String {
    match obj.get("payload") {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(payload) => payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string()),
    }
}
