//! Application state management

use gex_core::{AppConfig, BatchReport, ErrorKind, SessionFactory};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared across handlers.
///
/// Holds no sessions: every request opens and closes its own.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Opens a session per request
    pub sessions: Arc<dyn SessionFactory>,
    /// Server start time
    pub start_time: Instant,
    /// Query endpoint request counter
    pub request_count: AtomicU64,
    /// Queries that returned results
    pub queries_succeeded: AtomicU64,
    /// Queries that failed for any reason
    pub queries_failed: AtomicU64,
    /// Failed queries that were throttled
    pub queries_throttled: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
}

impl AppState {
    /// Create new application state
    pub fn new(config: AppConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            sessions,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            queries_succeeded: AtomicU64::new(0),
            queries_failed: AtomicU64::new(0),
            queries_throttled: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Fold a finished batch into the query counters
    pub fn record_batch(&self, report: &BatchReport) {
        self.queries_succeeded
            .fetch_add(report.succeeded() as u64, Ordering::Relaxed);
        self.queries_failed
            .fetch_add(report.failed() as u64, Ordering::Relaxed);
        self.queries_throttled
            .fetch_add(report.count_kind(ErrorKind::Throttled) as u64, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Time a batch may run before it is cancelled.
    ///
    /// Kept below the HTTP request timeout so the session can be closed and
    /// partial outcomes returned before the timeout layer drops the handler.
    pub fn batch_budget(&self) -> Duration {
        Duration::from_secs(self.config.server.request_timeout_secs).mul_f64(0.8)
    }

    /// Collection used when a request does not name one
    pub fn default_collection(&self) -> &str {
        &self.config.gremlin.collection
    }
}
