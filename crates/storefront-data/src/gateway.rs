//! # Remote Data Gateway
//!
//! One parameterized HTTP call to the hosted REST backend.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        HttpGateway::execute                             │
//! │                                                                         │
//! │  RestRequest { method, path, query, body, prefer }                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  {rest_url}/{path}?{query}                                              │
//! │  + apikey: <key>                                                        │
//! │  + Authorization: Bearer <key>                                          │
//! │  + Prefer: return=representation,resolution=...   (when requested)      │
//! │  + JSON body                                       (when present)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Read full body as text                                                 │
//! │       │                                                                 │
//! │       ├── status not 2xx ──► Err(DataError::Remote { status, body })    │
//! │       ├── body empty     ──► Ok(None)                                   │
//! │       └── otherwise      ──► Ok(Some(parsed JSON))                      │
//! │                                                                         │
//! │  One attempt. No retries, no timeout, no backoff.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Credentials come from an explicit [`GatewayConfig`] handed to the gateway
//! at construction; nothing is read from globals.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

use crate::error::{DataError, DataResult};
use crate::query::Query;

// =============================================================================
// Request Model
// =============================================================================

/// HTTP verb of a REST call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// One directive of the `Prefer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    /// Echo the affected rows back.
    ReturnRepresentation,
    /// Return no body.
    ReturnMinimal,
    /// On conflict, update the existing row.
    MergeDuplicates,
    /// On conflict, leave the existing row alone.
    IgnoreDuplicates,
}

impl Prefer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefer::ReturnRepresentation => "return=representation",
            Prefer::ReturnMinimal => "return=minimal",
            Prefer::MergeDuplicates => "resolution=merge-duplicates",
            Prefer::IgnoreDuplicates => "resolution=ignore-duplicates",
        }
    }
}

/// A single call to the REST backend.
///
/// `path` is a table name (`cart`) or a function (`rpc/add_to_cart`).
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub query: Query,
    pub body: Option<Value>,
    pub prefer: Vec<Prefer>,
}

impl RestRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        RestRequest {
            method,
            path: path.into(),
            query: Query::new(),
            body: None,
            prefer: Vec::new(),
        }
    }

    pub fn get(table: &str) -> Self {
        RestRequest::new(Method::Get, table)
    }

    pub fn post(table: &str, body: Value) -> Self {
        RestRequest::new(Method::Post, table).body(body)
    }

    pub fn patch(table: &str, body: Value) -> Self {
        RestRequest::new(Method::Patch, table).body(body)
    }

    pub fn delete(table: &str) -> Self {
        RestRequest::new(Method::Delete, table)
    }

    /// Calls a backend function: `POST rpc/<name>`.
    pub fn rpc(function: &str, args: Value) -> Self {
        RestRequest::new(Method::Post, format!("rpc/{}", function)).body(args)
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn prefer(mut self, prefer: Prefer) -> Self {
        if !self.prefer.contains(&prefer) {
            self.prefer.push(prefer);
        }
        self
    }

    /// The `Prefer` header value, if any directive was set.
    pub fn prefer_header(&self) -> Option<String> {
        if self.prefer.is_empty() {
            return None;
        }
        Some(
            self.prefer
                .iter()
                .map(Prefer::as_str)
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Returns true if the caller asked for affected rows to be echoed.
    pub fn wants_representation(&self) -> bool {
        self.prefer.contains(&Prefer::ReturnRepresentation)
    }
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// The seam between repositories and the REST backend.
///
/// `HttpGateway` is the production implementation; tests use the in-memory
/// gateway from the `testing` module.
#[async_trait]
pub trait RestGateway: Send + Sync {
    /// Issues one request. Empty bodies map to `Ok(None)`.
    async fn execute(&self, request: RestRequest) -> DataResult<Option<Value>>;
}

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the REST backend.
///
/// ## Example
/// ```rust
/// use storefront_data::GatewayConfig;
///
/// let config = GatewayConfig::new("https://abc.supabase.co/rest/v1", "anon-key");
/// assert_eq!(config.rest_url(), "https://abc.supabase.co/rest/v1");
/// ```
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the REST API, e.g. `https://<project>.supabase.co/rest/v1`.
    pub rest_url: String,

    /// Key sent as both `apikey` and bearer token.
    pub api_key: String,
}

impl GatewayConfig {
    pub fn new(rest_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        GatewayConfig {
            rest_url: rest_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Base URL without a trailing slash.
    pub fn rest_url(&self) -> &str {
        self.rest_url.trim_end_matches('/')
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("rest_url", &self.rest_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// HTTP Gateway
// =============================================================================

/// Production gateway backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Self {
        HttpGateway {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Uses a caller-supplied client (shared connection pool, proxies).
    pub fn with_client(client: reqwest::Client, config: GatewayConfig) -> Self {
        HttpGateway { client, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn build_url(&self, request: &RestRequest) -> DataResult<url::Url> {
        let mut url = url::Url::parse(&format!(
            "{}/{}",
            self.config.rest_url(),
            request.path.trim_start_matches('/')
        ))?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.pairs());
        }

        Ok(url)
    }
}

#[async_trait]
impl RestGateway for HttpGateway {
    async fn execute(&self, request: RestRequest) -> DataResult<Option<Value>> {
        let url = self.build_url(&request)?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        debug!(method = request.method.as_str(), path = %request.path, "REST request");

        let mut builder = self
            .client
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key);

        if let Some(prefer) = request.prefer_header() {
            builder = builder.header("Prefer", prefer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                method = request.method.as_str(),
                path = %request.path,
                status = status.as_u16(),
                "REST request failed"
            );
            return Err(DataError::remote(status.as_u16(), text));
        }

        debug!(status = status.as_u16(), bytes = text.len(), "REST response");

        if text.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&text)?))
    }
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Decodes a response into rows.
///
/// `None` and `null` give an empty list; a single object gives one row.
pub fn decode_rows<T: DeserializeOwned>(value: Option<Value>) -> DataResult<Vec<T>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(DataError::from))
            .collect(),
        Some(other) => Ok(vec![serde_json::from_value(other)?]),
    }
}

/// Decodes a response into at most one row.
pub fn decode_first<T: DeserializeOwned>(value: Option<Value>) -> DataResult<Option<T>> {
    Ok(decode_rows(value)?.into_iter().next())
}

// =============================================================================
// Tests
// =============================================================================
