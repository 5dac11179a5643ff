//! Scripted in-memory sessions for tests
//!
//! A `ScriptedSession` replays a fixed list of steps, one per submitted
//! query, and records what it was asked to run. `ScriptedFactory` hands out
//! fresh sessions with the same script and can simulate connection failures.

use crate::diagnostics::{ACTIVITY_ID, RETRY_AFTER_MS, STATUS_CODE, TOTAL_REQUEST_CHARGE};
use crate::{
    ConnectionError, GraphSession, Query, ResultSet, ServiceError, SessionFactory,
    StatusAttributes, SubmitError, TransportError,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// What the session does for the next query
#[derive(Debug, Clone)]
pub enum Step {
    Respond(ResultSet),
    Fail(SubmitError),
    /// Never answer, to exercise cancellation
    Hang,
}

impl Step {
    /// Successful response with typical diagnostics
    pub fn rows(rows: Vec<Value>) -> Self {
        Self::Respond(ResultSet {
            rows,
            attributes: attributes(json!({
                STATUS_CODE: 200,
                TOTAL_REQUEST_CHARGE: 2.29,
                ACTIVITY_ID: "00000000-0000-0000-0000-000000000200",
            })),
        })
    }

    /// Throttled response carrying a retry hint in milliseconds
    pub fn throttled(retry_after_ms: u64) -> Self {
        let error = ServiceError::new(500, "Request rate is large").with_attributes(attributes(json!({
            STATUS_CODE: 429,
            TOTAL_REQUEST_CHARGE: 0.0,
            RETRY_AFTER_MS: retry_after_ms,
            ACTIVITY_ID: "00000000-0000-0000-0000-000000000429",
        })));
        Self::Fail(error.into())
    }

    /// Non-throttling rejection
    pub fn rejected(status: u16, message: &str) -> Self {
        let error = ServiceError::new(597, message).with_attributes(attributes(json!({
            STATUS_CODE: status,
            ACTIVITY_ID: "00000000-0000-0000-0000-000000000597",
        })));
        Self::Fail(error.into())
    }

    /// Rejection raised before the request left the client
    pub fn client_side(message: &str) -> Self {
        Self::Fail(ServiceError::client_side(message).into())
    }

    /// Connection drop while the query is in flight
    pub fn transport() -> Self {
        Self::Fail(TransportError::Closed.into())
    }

    pub fn hang() -> Self {
        Self::Hang
    }
}

fn attributes(value: Value) -> StatusAttributes {
    match value {
        Value::Object(map) => map,
        _ => StatusAttributes::new(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Session replaying a fixed script
#[derive(Debug)]
pub struct ScriptedSession {
    steps: VecDeque<Step>,
    submitted: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedSession {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            submitted: Arc::default(),
            closed: Arc::default(),
        }
    }

    /// Query texts submitted so far, in order
    pub fn submitted(&self) -> Vec<String> {
        lock(&self.submitted).clone()
    }
}

#[async_trait::async_trait]
impl GraphSession for ScriptedSession {
    async fn submit(&mut self, query: &Query) -> Result<ResultSet, SubmitError> {
        if *lock(&self.closed) {
            return Err(SubmitError::UseAfterClose);
        }
        lock(&self.submitted).push(query.as_str().to_string());

        match self.steps.pop_front() {
            Some(Step::Respond(result_set)) => Ok(result_set),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Protocol("script exhausted".to_string()).into()),
        }
    }

    async fn close(&mut self) -> Result<(), SubmitError> {
        let mut closed = lock(&self.closed);
        if *closed {
            return Err(SubmitError::UseAfterClose);
        }
        *closed = true;
        Ok(())
    }
}

/// Factory handing out scripted sessions and recording their use
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    steps: Vec<Step>,
    refuse_connections: bool,
    opened: Arc<Mutex<Vec<String>>>,
    submitted: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<usize>>,
}

impl ScriptedFactory {
    /// Every opened session replays `steps` from the start
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    /// A factory whose `open` always fails
    pub fn unreachable() -> Self {
        Self {
            refuse_connections: true,
            ..Default::default()
        }
    }

    /// Collections opened so far
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    /// Queries submitted across all sessions
    pub fn submitted(&self) -> Vec<String> {
        lock(&self.submitted).clone()
    }

    /// Number of sessions explicitly closed
    pub fn closed(&self) -> usize {
        *lock(&self.closed)
    }
}

/// Session wrapper that reports back to its factory
struct TrackedSession {
    inner: ScriptedSession,
    closed: Arc<Mutex<usize>>,
}

#[async_trait::async_trait]
impl GraphSession for TrackedSession {
    async fn submit(&mut self, query: &Query) -> Result<ResultSet, SubmitError> {
        self.inner.submit(query).await
    }

    async fn close(&mut self) -> Result<(), SubmitError> {
        self.inner.close().await?;
        *lock(&self.closed) += 1;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open(&self, collection: &str) -> Result<Box<dyn GraphSession>, ConnectionError> {
        if self.refuse_connections {
            return Err(ConnectionError::Handshake {
                endpoint: "wss://scripted:443/gremlin".to_string(),
                message: "connection refused".to_string(),
            });
        }
        lock(&self.opened).push(collection.to_string());

        let mut inner = ScriptedSession::new(self.steps.clone());
        inner.submitted = Arc::clone(&self.submitted);
        Ok(Box::new(TrackedSession {
            inner,
            closed: Arc::clone(&self.closed),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
