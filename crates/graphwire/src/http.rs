//! HTTP execution for queries and mutations.

use std::time::{Duration, Instant};

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{Error, Result};
use crate::request::Request;

/// Builder for an [`HttpTransport`].
#[derive(Debug, Default)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
    debug: bool,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-request timeout. No timeout by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Emit a structured log line per exchange, including elapsed time.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpTransport {
            client: builder.build()?,
            debug: self.debug,
        })
    }
}

/// One completed request/response exchange.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    /// The raw response body. GraphQL-level `errors` stay in here untouched
    /// for the caller to deserialize into [`Response`](crate::Response).
    pub body: String,
    /// The HTTP status code. Non-2xx is the caller's concern, not an error
    /// from this layer.
    pub status: u16,
    /// Wall-clock duration of the round trip.
    pub elapsed: Duration,
}

/// Executes single request/response exchanges for queries and mutations.
///
/// Stateless across calls; cheap to clone (the underlying connection pool
/// is shared).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    debug: bool,
}

impl HttpTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }

    /// Create a builder for configuring a transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// POST `request` to `endpoint` and return the raw exchange.
    ///
    /// Sends `Content-Type: application/json` with the serialized request
    /// as the body, and `Authorization: {scheme} {token}` when a token is
    /// given (`scheme` defaults to `Bearer`). Caller `headers` are merged
    /// last, so they win over the defaults; duplicate names within them
    /// are last-write-wins.
    ///
    /// Only transport-level failures (refused connection, timeout,
    /// malformed response) become errors here.
    pub async fn execute(
        &self,
        endpoint: &str,
        request: &Request,
        headers: &HeaderMap,
        auth_scheme: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<HttpExchange> {
        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        merged.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = auth_token {
            let scheme = auth_scheme.unwrap_or("Bearer");
            merged.insert(AUTHORIZATION, HeaderValue::from_str(&format!("{scheme} {token}"))?);
        }
        for (name, value) in headers {
            merged.insert(name, value.clone());
        }

        if self.debug {
            tracing::debug!(
                target: "graphwire::http",
                endpoint,
                operation = request.operation_name.as_deref().unwrap_or("<anonymous>"),
                "executing request"
            );
        }

        let started = Instant::now();
        let response = self
            .client
            .post(endpoint)
            .headers(merged)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let elapsed = started.elapsed();

        if self.debug {
            tracing::debug!(
                target: "graphwire::http",
                endpoint,
                status,
                elapsed_ms = elapsed.as_millis() as u64,
                body_len = body.len(),
                "request completed"
            );
        }

        Ok(HttpExchange { body, status, elapsed })
    }
}
