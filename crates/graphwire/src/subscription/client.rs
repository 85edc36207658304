//! The subscription connection and its state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::ConnectionState;
use super::protocol::{InboundFrame, OutboundFrame, SubprotocolVariant};
use super::registry::{SubscriptionEvent, SubscriptionRegistry};
use crate::error::{Error, Result};
use crate::request::Request;

type SocketSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Builder for a [`SubscriptionClient`].
pub struct SubscriptionClientBuilder {
    url: String,
    variant: SubprotocolVariant,
    headers: HashMap<String, String>,
    auth_token: Option<String>,
    init_payload: Option<Value>,
    connection_timeout: Duration,
}

impl SubscriptionClientBuilder {
    /// Create a builder for the given endpoint URL.
    ///
    /// An `http`/`https` URL is rewritten to `ws`/`wss`; a `ws`/`wss` URL
    /// is used as-is.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            variant: SubprotocolVariant::GraphqlTransportWs,
            headers: HashMap::new(),
            auth_token: None,
            init_payload: None,
            connection_timeout: Duration::from_secs(30),
        }
    }

    /// Select the subprotocol dialect. Defaults to `graphql-transport-ws`.
    pub fn variant(mut self, variant: SubprotocolVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Add a header to the connection handshake.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add multiple handshake headers.
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Set bearer token authentication.
    ///
    /// On `graphql-transport-ws` the token travels inside the
    /// `connection_init` payload; on legacy `graphql-ws` it becomes an
    /// `Authorization` handshake header.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set an explicit `connection_init` payload, overriding the one
    /// derived from [`bearer_auth`](Self::bearer_auth).
    pub fn init_payload(mut self, payload: impl Serialize) -> Self {
        self.init_payload = serde_json::to_value(payload).ok();
        self
    }

    /// Set the socket-open timeout. Defaults to 30 seconds.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Build the client. Fails on an unparsable URL.
    pub fn build(self) -> Result<SubscriptionClient> {
        let ws_url = http_to_ws_url(&self.url);
        url::Url::parse(&ws_url)?;

        let mut headers = self.headers;
        let init_payload = match (self.init_payload, &self.auth_token, self.variant) {
            (Some(payload), _, _) => Some(payload),
            (None, Some(token), SubprotocolVariant::GraphqlTransportWs) => {
                Some(serde_json::json!({"Authorization": format!("Bearer {token}")}))
            }
            _ => None,
        };
        if self.variant == SubprotocolVariant::GraphqlWs
            && let Some(ref token) = self.auth_token
        {
            headers.insert("Authorization".into(), format!("Bearer {token}"));
        }

        Ok(SubscriptionClient {
            inner: Arc::new(ClientInner {
                config: ClientConfig {
                    ws_url,
                    variant: self.variant,
                    headers,
                    init_payload,
                    connection_timeout: self.connection_timeout,
                },
                state: Mutex::new(ConnectionState::Disconnected),
                registry: SubscriptionRegistry::new(),
                commands: Mutex::new(None),
            }),
        })
    }
}

fn http_to_ws_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}

struct ClientConfig {
    ws_url: String,
    variant: SubprotocolVariant,
    headers: HashMap<String, String>,
    init_payload: Option<Value>,
    connection_timeout: Duration,
}

struct ClientInner {
    config: ClientConfig,
    state: Mutex<ConnectionState>,
    registry: SubscriptionRegistry,
    commands: Mutex<Option<mpsc::UnboundedSender<Command>>>,
}

enum Command {
    Send {
        text: String,
        ack: oneshot::Sender<Result<()>>,
    },
    Close {
        ack: oneshot::Sender<()>,
    },
}

/// A client owning one duplex subscription connection.
///
/// Cheap to clone; clones share the connection and registry. There is no
/// reconnect or retry anywhere: once the connection dies the client is back
/// in [`ConnectionState::Disconnected`] and a fresh [`connect`] opens a new
/// socket.
///
/// [`connect`]: SubscriptionClient::connect
#[derive(Clone)]
pub struct SubscriptionClient {
    inner: Arc<ClientInner>,
}

impl SubscriptionClient {
    /// Create a builder for the given endpoint URL.
    pub fn builder(url: impl Into<String>) -> SubscriptionClientBuilder {
        SubscriptionClientBuilder::new(url)
    }

    /// The current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// The URL the client connects to.
    pub fn url(&self) -> &str {
        &self.inner.config.ws_url
    }

    /// Number of currently registered subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.inner.registry.len()
    }

    /// Open the connection and send `connection_init`.
    ///
    /// Completes once `connection_init` is on the wire; the server's ack
    /// arrives asynchronously and moves the state to
    /// [`ConnectionState::Ready`], which [`subscribe`](Self::subscribe)
    /// requires.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::Connection(format!(
                    "already connected (state: {state})"
                )));
            }
            *state = ConnectionState::Connecting;
        }

        match self.open_socket().await {
            Ok(()) => Ok(()),
            Err(error) => {
                *self.inner.state.lock() = ConnectionState::Disconnected;
                Err(error)
            }
        }
    }

    async fn open_socket(&self) -> Result<()> {
        let config = &self.inner.config;

        let mut request = config
            .ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::Connection(e.to_string()))?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            http::HeaderValue::from_str(config.variant.identifier())
                .map_err(|e| Error::Connection(e.to_string()))?,
        );
        for (name, value) in &config.headers {
            let name = http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Connection(e.to_string()))?;
            let value = http::HeaderValue::from_str(value)
                .map_err(|e| Error::Connection(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let connect = tokio_tungstenite::connect_async(request);
        let (stream, _response) = tokio::time::timeout(config.connection_timeout, connect)
            .await
            .map_err(|_| Error::Timeout)??;
        tracing::debug!(
            target: "graphwire::subscription",
            url = %config.ws_url,
            subprotocol = %config.variant,
            "connected"
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        *self.inner.commands.lock() = Some(commands_tx);
        tokio::spawn(run_connection(self.inner.clone(), stream, commands_rx));

        // The ack can only arrive after the init frame is written, so the
        // state must already say so when it does.
        *self.inner.state.lock() = ConnectionState::AwaitingAck;
        let init = OutboundFrame::ConnectionInit {
            payload: config.init_payload.clone(),
        }
        .encode(config.variant);
        self.send(init).await
    }

    /// Start a subscription under a caller-chosen id.
    ///
    /// Fails fast with [`Error::NotReady`] unless the connection is
    /// [`ConnectionState::Ready`] (callers queue or retry themselves), and
    /// with [`Error::SubscriptionIdInUse`] when the id already has a live
    /// subscription. Nothing is sent in either failure case. On success
    /// exactly one subscribe frame goes out and the returned stream yields
    /// the subscription's events.
    pub async fn subscribe(
        &self,
        id: impl Into<String>,
        request: &Request,
    ) -> Result<SubscriptionStream> {
        let id = id.into();
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(Error::NotReady(state));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.inner.registry.insert(&id, events_tx)?;

        let frame = OutboundFrame::Subscribe {
            id: id.clone(),
            request: request.clone(),
        }
        .encode(self.inner.config.variant);
        if let Err(error) = self.send(frame).await {
            self.inner.registry.remove(&id);
            return Err(error);
        }

        tracing::debug!(target: "graphwire::subscription", %id, "subscribed");
        Ok(SubscriptionStream { id, events: events_rx })
    }

    /// Stop the subscription with the given id.
    ///
    /// Requires [`ConnectionState::Ready`]. The stop frame is sent even
    /// when the id is unknown (best-effort cleanup, at most one stop in
    /// flight per id); an unknown id is otherwise a no-op, not an error.
    pub async fn unsubscribe(&self, id: &str) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(Error::NotReady(state));
        }

        self.inner.registry.remove(id);
        let frame = OutboundFrame::Unsubscribe { id: id.to_string() }
            .encode(self.inner.config.variant);
        self.send(frame).await
    }

    /// Close the connection.
    ///
    /// Sends a close frame, stops the connection task, and fails every
    /// still-registered subscription exactly once with
    /// [`Error::ConnectionClosed`]. A no-op when already disconnected.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Disconnected {
                return Ok(());
            }
            *state = ConnectionState::Closing;
        }

        let sender = self.inner.commands.lock().clone();
        let Some(sender) = sender else {
            *self.inner.state.lock() = ConnectionState::Disconnected;
            return Ok(());
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if sender.send(Command::Close { ack: ack_tx }).is_ok() {
            // The task acks after it has torn the connection down.
            let _ = ack_rx.await;
        } else {
            *self.inner.state.lock() = ConnectionState::Disconnected;
        }
        Ok(())
    }

    /// Hand a frame to the connection task and wait for the write to
    /// complete.
    async fn send(&self, text: String) -> Result<()> {
        let sender = self
            .inner
            .commands
            .lock()
            .clone()
            .ok_or(Error::ConnectionClosed)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(Command::Send { text, ack: ack_tx })
            .map_err(|_| Error::ConnectionClosed)?;
        ack_rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

impl std::fmt::Debug for SubscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionClient")
            .field("url", &self.inner.config.ws_url)
            .field("subprotocol", &self.inner.config.variant.identifier())
            .field("state", &self.state())
            .finish()
    }
}

/// Events for one subscription id.
#[derive(Debug)]
pub struct SubscriptionStream {
    id: String,
    events: mpsc::UnboundedReceiver<SubscriptionEvent>,
}

impl SubscriptionStream {
    /// The subscription id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The next event, or `None` once the subscription is finished and
    /// drained.
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        self.events.recv().await
    }
}

/// The connection task: sole reader and sole writer of the socket.
///
/// Outbound frames arrive over the command channel, so writes are
/// serialized by construction and `disconnect` can always unblock the
/// otherwise timeout-free socket read.
async fn run_connection(
    inner: Arc<ClientInner>,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let variant = inner.config.variant;
    let (mut write, mut read) = stream.split();
    let mut fatal: Option<Error> = None;
    let mut close_ack: Option<oneshot::Sender<()>> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send { text, ack }) => {
                    let result = write
                        .send(Message::Text(text.into()))
                        .await
                        .map_err(Error::from);
                    let failure = result.as_ref().err().cloned();
                    let _ = ack.send(result);
                    if let Some(error) = failure {
                        fatal = Some(error);
                        break;
                    }
                }
                Some(Command::Close { ack }) => {
                    let _ = write.send(Message::Close(None)).await;
                    close_ack = Some(ack);
                    break;
                }
                None => break,
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Err(error) =
                        handle_frame(&inner, &mut write, variant, text.as_str()).await
                    {
                        fatal = Some(error);
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    fatal = Some(Error::ConnectionClosed);
                    break;
                }
                // Binary and socket-level ping/pong are not protocol frames.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    fatal = Some(Error::Connection(error.to_string()));
                    break;
                }
            },
        }
    }

    let error = fatal.unwrap_or(Error::ConnectionClosed);
    if !inner.registry.is_empty() {
        tracing::debug!(
            target: "graphwire::subscription",
            %error,
            "failing active subscriptions"
        );
    }
    inner.registry.fail_all(error);
    *inner.state.lock() = ConnectionState::Disconnected;
    *inner.commands.lock() = None;
    if let Some(ack) = close_ack {
        let _ = ack.send(());
    }
}

/// Handle one decoded frame. A returned error is fatal to the connection.
async fn handle_frame(
    inner: &ClientInner,
    write: &mut SocketSink,
    variant: SubprotocolVariant,
    text: &str,
) -> Result<()> {
    match InboundFrame::decode(text, variant)? {
        InboundFrame::ConnectionAck => {
            let mut state = inner.state.lock();
            if *state == ConnectionState::AwaitingAck {
                *state = ConnectionState::Ready;
                tracing::debug!(target: "graphwire::subscription", "connection acknowledged");
            } else {
                tracing::warn!(
                    target: "graphwire::subscription",
                    state = %*state,
                    "ignoring connection_ack"
                );
            }
        }
        InboundFrame::KeepAlive | InboundFrame::Pong => {}
        InboundFrame::Ping => {
            // The reply goes out before the loop reads again.
            write
                .send(Message::Text(OutboundFrame::Pong.encode(variant).into()))
                .await?;
        }
        InboundFrame::Data { id, payload } => match *inner.state.lock() {
            ConnectionState::Ready => inner.registry.deliver(&id, payload),
            // Frames racing our own shutdown are dropped, not a violation.
            ConnectionState::Closing => {}
            state => {
                return Err(Error::Protocol(format!(
                    "payload frame for `{id}` arrived in state {state}"
                )));
            }
        },
        InboundFrame::Complete { id } => inner.registry.complete(&id),
        InboundFrame::ConnectionError { message } => return Err(Error::Connection(message)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::future::Future;
    use tokio::net::TcpListener;

    #[test]
    fn http_urls_rewrite_to_ws_schemes() {
        assert_eq!(
            http_to_ws_url("https://example.com/graphql"),
            "wss://example.com/graphql"
        );
        assert_eq!(
            http_to_ws_url("http://example.com/graphql"),
            "ws://example.com/graphql"
        );
        assert_eq!(
            http_to_ws_url("wss://example.com/graphql"),
            "wss://example.com/graphql"
        );
    }

    #[test]
    fn builder_places_bearer_auth_per_variant() {
        let modern = SubscriptionClient::builder("https://api.example.com/graphql")
            .bearer_auth("tok")
            .build()
            .unwrap();
        assert_eq!(
            modern.inner.config.init_payload,
            Some(json!({"Authorization": "Bearer tok"}))
        );
        assert!(modern.inner.config.headers.is_empty());

        let legacy = SubscriptionClient::builder("https://api.example.com/graphql")
            .variant(SubprotocolVariant::GraphqlWs)
            .bearer_auth("tok")
            .build()
            .unwrap();
        assert!(legacy.inner.config.init_payload.is_none());
        assert_eq!(
            legacy.inner.config.headers.get("Authorization").unwrap(),
            "Bearer tok"
        );
    }

    #[test]
    fn builder_rejects_invalid_urls() {
        let err = SubscriptionClient::builder("not a url").build().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn subscribe_fails_fast_when_disconnected() {
        let client = SubscriptionClient::builder("ws://127.0.0.1:9/graphql")
            .build()
            .unwrap();

        let err = client
            .subscribe("s1", &Request::new("subscription { tick }"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotReady(ConnectionState::Disconnected));
        assert_eq!(client.active_subscriptions(), 0);

        let err = client.unsubscribe("s1").await.unwrap_err();
        assert_eq!(err, Error::NotReady(ConnectionState::Disconnected));
    }

    // In-process server plumbing for the end-to-end tests.

    type ServerSocket = WebSocketStream<TcpStream>;

    async fn spawn_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(ServerSocket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_hdr_async(
                socket,
                |request: &tokio_tungstenite::tungstenite::handshake::server::Request,
                 mut response: tokio_tungstenite::tungstenite::handshake::server::Response| {
                    if let Some(protocol) = request.headers().get("Sec-WebSocket-Protocol") {
                        response
                            .headers_mut()
                            .insert("Sec-WebSocket-Protocol", protocol.clone());
                    }
                    Ok(response)
                },
            )
            .await
            .unwrap();
            handler(ws).await;
        });
        format!("ws://{addr}/graphql")
    }

    async fn recv_json(ws: &mut ServerSocket) -> Value {
        loop {
            match ws.next().await.expect("socket closed early").unwrap() {
                Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                _ => continue,
            }
        }
    }

    async fn send_json(ws: &mut ServerSocket, value: Value) {
        ws.send(Message::Text(value.to_string().into())).await.unwrap();
    }

    /// Read `connection_init` and reply with `connection_ack`.
    async fn accept_handshake(ws: &mut ServerSocket) {
        let init = recv_json(ws).await;
        assert_eq!(init["type"], "connection_init");
        send_json(ws, json!({"type": "connection_ack"})).await;
    }

    async fn wait_for_state(client: &SubscriptionClient, target: ConnectionState) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.state() != target {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("state never became {target}"));
    }

    #[tokio::test]
    async fn variant_b_subscription_lifecycle() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;

            let subscribe = recv_json(&mut ws).await;
            assert_eq!(subscribe["type"], "subscribe");
            assert_eq!(subscribe["id"], "s1");
            assert_eq!(subscribe["payload"]["query"], "subscription{tick}");

            send_json(&mut ws, json!({"id": "s1", "type": "next", "payload": null})).await;
            send_json(&mut ws, json!({"id": "s1", "type": "complete"})).await;
            // A late frame for the finished id must go nowhere.
            send_json(
                &mut ws,
                json!({"id": "s1", "type": "next", "payload": {"data": {"tick": 1}}}),
            )
            .await;

            // Stay open until the client closes.
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut stream = client
            .subscribe("s1", &Request::new("subscription{tick}"))
            .await
            .unwrap();
        assert_eq!(stream.id(), "s1");

        // A payload-free `next` still fires delivery: the payload, present
        // or absent, is the event.
        assert!(matches!(
            stream.next().await.unwrap(),
            SubscriptionEvent::Data(None)
        ));
        assert!(matches!(
            stream.next().await.unwrap(),
            SubscriptionEvent::Completed
        ));
        assert_eq!(client.active_subscriptions(), 0);

        client.disconnect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        // Nothing past completion, the late frame included.
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn ping_gets_a_pong_before_further_reads() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;
            let subscribe = recv_json(&mut ws).await;
            let id = subscribe["id"].as_str().unwrap().to_string();

            send_json(&mut ws, json!({"type": "ping"})).await;
            let reply = recv_json(&mut ws).await;
            assert_eq!(reply, json!({"type": "pong"}));

            // Only reached once the pong came back.
            send_json(
                &mut ws,
                json!({"id": id, "type": "next", "payload": {"data": {"n": 1}}}),
            )
            .await;

            // Stay open until the client closes.
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut stream = client
            .subscribe("k1", &Request::new("subscription{n}"))
            .await
            .unwrap();
        let SubscriptionEvent::Data(Some(payload)) = stream.next().await.unwrap() else {
            panic!("expected a data event");
        };
        assert_eq!(payload["data"]["n"], 1);
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn connection_error_fails_every_subscription_once() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;
            recv_json(&mut ws).await;
            recv_json(&mut ws).await;
            send_json(
                &mut ws,
                json!({"type": "error", "payload": {"message": "kicked"}}),
            )
            .await;
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut first = client
            .subscribe("a", &Request::new("subscription{x}"))
            .await
            .unwrap();
        let mut second = client
            .subscribe("b", &Request::new("subscription{y}"))
            .await
            .unwrap();

        for stream in [&mut first, &mut second] {
            let SubscriptionEvent::Failed(error) = stream.next().await.unwrap() else {
                panic!("expected a failure event");
            };
            assert_eq!(error, Error::Connection("kicked".into()));
            assert!(stream.next().await.is_none());
        }

        wait_for_state(&client, ConnectionState::Disconnected).await;
        assert_eq!(client.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn duplicate_subscription_id_is_rejected() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let _stream = client
            .subscribe("dup", &Request::new("subscription{x}"))
            .await
            .unwrap();
        let err = client
            .subscribe("dup", &Request::new("subscription{x}"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::SubscriptionIdInUse("dup".into()));
        assert_eq!(client.active_subscriptions(), 1);

        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn unsubscribe_sends_the_stop_frame_even_for_unknown_ids() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;

            let subscribe = recv_json(&mut ws).await;
            assert_eq!(subscribe["type"], "subscribe");

            let stop = recv_json(&mut ws).await;
            assert_eq!(stop, json!({"id": "s1", "type": "complete"}));

            let ghost_stop = recv_json(&mut ws).await;
            assert_eq!(ghost_stop, json!({"id": "ghost", "type": "complete"}));

            // Confirm the connection survived all of it.
            send_json(&mut ws, json!({"type": "ping"})).await;
            let reply = recv_json(&mut ws).await;
            assert_eq!(reply["type"], "pong");
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut stream = client
            .subscribe("s1", &Request::new("subscription{x}"))
            .await
            .unwrap();
        client.unsubscribe("s1").await.unwrap();
        assert_eq!(client.active_subscriptions(), 0);
        assert!(stream.next().await.is_none());

        client.unsubscribe("ghost").await.unwrap();
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn legacy_variant_speaks_start_and_accepts_ka() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;
            send_json(&mut ws, json!({"type": "ka"})).await;

            let start = recv_json(&mut ws).await;
            assert_eq!(start["type"], "start");
            assert_eq!(start["id"], "s1");

            send_json(
                &mut ws,
                json!({"id": "s1", "type": "data", "payload": {"data": {"tick": 2}}}),
            )
            .await;
        })
        .await;

        let client = SubscriptionClient::builder(url)
            .variant(SubprotocolVariant::GraphqlWs)
            .build()
            .unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut stream = client
            .subscribe("s1", &Request::new("subscription{tick}"))
            .await
            .unwrap();
        let SubscriptionEvent::Data(Some(payload)) = stream.next().await.unwrap() else {
            panic!("expected a data event");
        };
        assert_eq!(payload["data"]["tick"], 2);
    }

    #[tokio::test]
    async fn out_of_variant_frame_kills_the_connection() {
        let url = spawn_server(|mut ws| async move {
            accept_handshake(&mut ws).await;
            recv_json(&mut ws).await;
            // `ka` belongs to the legacy dialect only.
            send_json(&mut ws, json!({"type": "ka"})).await;
        })
        .await;

        let client = SubscriptionClient::builder(url).build().unwrap();
        client.connect().await.unwrap();
        wait_for_state(&client, ConnectionState::Ready).await;

        let mut stream = client
            .subscribe("s1", &Request::new("subscription{x}"))
            .await
            .unwrap();
        let SubscriptionEvent::Failed(error) = stream.next().await.unwrap() else {
            panic!("expected a failure event");
        };
        assert!(matches!(error, Error::Protocol(_)));
        wait_for_state(&client, ConnectionState::Disconnected).await;
    }
}
