//! Gremlin Explorer Core - Query pipeline types, traits, and shared logic
//!
//! This crate defines the abstractions shared by the API server and the
//! interactive console:
//! - Query and batch types produced by the splitter
//! - Per-query outcomes and normalized diagnostics
//! - Error taxonomy for connection, transport, and service failures
//! - The `GraphSession` / `SessionFactory` traits implemented by transports
//! - The sequential execution engine
//! - Configuration management

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod splitter;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{AppConfig, ConfigError, GremlinConfig, GremlinTarget, LoggingConfig, ServerConfig};
pub use diagnostics::{classify, extract};
pub use engine::{run, run_until_cancelled};
pub use splitter::split;

use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Raw status attributes as returned by the remote engine
pub type StatusAttributes = serde_json::Map<String, Value>;

// ============================================================================
// Error Types
// ============================================================================

/// Failure to establish a session. Fatal to the whole submission.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid session target: {0}")]
    InvalidTarget(#[from] ConfigError),

    #[error("Failed to connect to {endpoint}: {message}")]
    Handshake { endpoint: String, message: String },

    #[error("Timed out connecting to {endpoint} after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
}

/// Loss of an established connection. Fatal to the rest of a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection closed by remote endpoint")]
    Closed,

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    Socket(String),
}

/// Per-query rejection reported by the remote engine, or raised by the
/// client before the request was sent (`status_code` is `None` then).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ServiceError {
    /// Protocol status code of the response, if the request reached the service
    pub status_code: Option<u16>,

    /// Human-readable message from the engine or client
    pub message: String,

    /// Status attributes supplied alongside the error
    pub attributes: StatusAttributes,
}

impl ServiceError {
    /// Create an error for a response the engine rejected
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
            attributes: StatusAttributes::new(),
        }
    }

    /// Create an error for a request rejected before it left the client
    pub fn client_side(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            attributes: StatusAttributes::new(),
        }
    }

    /// Attach status attributes
    pub fn with_attributes(mut self, attributes: StatusAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Everything `GraphSession::submit` can fail with
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Session used after close")]
    UseAfterClose,
}

// ============================================================================
// Queries
// ============================================================================

/// A single trimmed, non-empty query statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query(String);

impl Query {
    /// Create a query from text. Returns `None` when the text is blank.
    pub fn new(text: impl AsRef<str>) -> Option<Self> {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered queries parsed out of one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBatch(Vec<Query>);

impl QueryBatch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Query> {
        self.0.iter()
    }

    /// Join the batch back into a single submission string
    pub fn to_raw(&self) -> String {
        self.0
            .iter()
            .map(Query::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl FromIterator<Query> for QueryBatch {
    fn from_iter<I: IntoIterator<Item = Query>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a QueryBatch {
    type Item = &'a Query;
    type IntoIter = std::slice::Iter<'a, Query>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ============================================================================
// Results and Diagnostics
// ============================================================================

/// Successful response to one submitted query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Result rows in the order the engine returned them
    pub rows: Vec<Value>,

    /// Status attributes attached to the final response frame
    pub attributes: StatusAttributes,
}

/// Normalized service diagnostics, shared by success and failure paths.
///
/// Attributes the engine did not send stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticAttributes {
    /// Service status code (`x-ms-status-code`, else the protocol status)
    pub status_code: Option<u16>,

    /// Consumed capacity in request units
    pub request_charge: Option<f64>,

    /// Suggested wait before retrying, present under throttling
    pub retry_after: Option<Duration>,

    /// Opaque id for cross-system troubleshooting
    pub correlation_id: Option<String>,
}

/// Classification of a failed query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limited by the service (status 429)
    Throttled,
    /// Rejected by the service for any other reason
    Rejected,
    /// Rejected before the request left the client
    ClientSideRejected,
    /// Connection lost while the query was in flight
    Transport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Throttled => "throttled",
            Self::Rejected => "rejected",
            Self::ClientSideRejected => "clientSideRejected",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Success {
        rows: Vec<Value>,
        diagnostics: DiagnosticAttributes,
    },
    Failure {
        kind: ErrorKind,
        message: String,
        diagnostics: DiagnosticAttributes,
    },
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn diagnostics(&self) -> &DiagnosticAttributes {
        match self {
            Self::Success { diagnostics, .. } | Self::Failure { diagnostics, .. } => diagnostics,
        }
    }

    /// Failure kind, if the query failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// A query paired with its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub query: Query,
    pub outcome: QueryOutcome,
}

/// Why a batch stopped before its last query
#[derive(Debug, Clone, PartialEq)]
pub enum BatchHalt {
    /// The connection failed; the failing query is the last entry
    Transport {
        error: TransportError,
        skipped: usize,
    },
    /// The session had already been closed
    SessionClosed { skipped: usize },
    /// The governing request was cancelled
    Cancelled { skipped: usize },
}

impl BatchHalt {
    /// Number of queries that were never attempted
    pub fn skipped(&self) -> usize {
        match self {
            Self::Transport { skipped, .. }
            | Self::SessionClosed { skipped }
            | Self::Cancelled { skipped } => *skipped,
        }
    }
}

impl fmt::Display for BatchHalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { error, skipped } => {
                write!(f, "{error} ({skipped} queries not attempted)")
            }
            Self::SessionClosed { skipped } => {
                write!(f, "session already closed ({skipped} queries not attempted)")
            }
            Self::Cancelled { skipped } => {
                write!(f, "cancelled ({skipped} queries not attempted)")
            }
        }
    }
}

/// Ordered outcomes of a batch plus the reason it stopped early, if any
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub entries: Vec<ExecutedQuery>,
    pub halt: Option<BatchHalt>,
}

impl BatchReport {
    /// True when every query in the batch was attempted
    pub fn is_complete(&self) -> bool {
        self.halt.is_none()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.error_kind() == Some(kind))
            .count()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// One persistent, authenticated connection to a remote graph endpoint
#[async_trait::async_trait]
pub trait GraphSession: Send {
    /// Send one query and wait for its complete response. Never retries.
    async fn submit(&mut self, query: &Query) -> Result<ResultSet, SubmitError>;

    /// Release the connection. A second call fails with `UseAfterClose`.
    async fn close(&mut self) -> Result<(), SubmitError>;
}

/// Opens sessions against a target collection
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a session for `collection`, validating configuration first
    async fn open(&self, collection: &str) -> Result<Box<dyn GraphSession>, ConnectionError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
