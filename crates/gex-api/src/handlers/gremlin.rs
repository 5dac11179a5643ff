//! Multi-statement Gremlin query handlers

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use gex_core::{BatchHalt, DiagnosticAttributes, ExecutedQuery, QueryOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use utoipa::{IntoParams, ToSchema};

/// Query submission
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GremlinRequest {
    /// One or more Gremlin statements separated by `;`
    #[schema(example = "g.V().count(); g.E().count()")]
    pub query: String,

    /// Target collection; the configured default when omitted
    #[schema(example = "thehobbit")]
    pub collection_id: Option<String>,
}

/// Normalized service diagnostics
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    /// Service status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Request units consumed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_charge: Option<f64>,

    /// Suggested wait before retrying, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<f64>,

    /// Activity id for troubleshooting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl From<&DiagnosticAttributes> for Diagnostics {
    fn from(diagnostics: &DiagnosticAttributes) -> Self {
        Self {
            status_code: diagnostics.status_code,
            request_charge: diagnostics.request_charge,
            // Integer nanos keep whole milliseconds exact
            retry_after_ms: diagnostics
                .retry_after
                .map(|d| d.as_nanos() as f64 / 1_000_000.0),
            correlation_id: diagnostics.correlation_id.clone(),
        }
    }
}

/// Failure of a single statement
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    /// `throttled`, `rejected`, `clientSideRejected` or `transport`
    #[schema(example = "throttled")]
    pub kind: String,

    /// Message from the engine or client
    pub message: String,

    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

/// Outcome of one statement, in submission order
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry {
    /// The statement as executed
    #[schema(example = "g.V().count()")]
    pub query_text: String,

    /// Result rows, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub query_result: Option<Vec<Value>>,

    /// Diagnostics, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,

    /// Failure details, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_error: Option<QueryError>,
}

impl From<&ExecutedQuery> for QueryEntry {
    fn from(executed: &ExecutedQuery) -> Self {
        let query_text = executed.query.to_string();
        match &executed.outcome {
            QueryOutcome::Success { rows, diagnostics } => Self {
                query_text,
                query_result: Some(rows.clone()),
                diagnostics: Some(diagnostics.into()),
                query_error: None,
            },
            QueryOutcome::Failure {
                kind,
                message,
                diagnostics,
            } => Self {
                query_text,
                query_result: None,
                diagnostics: None,
                query_error: Some(QueryError {
                    kind: kind.to_string(),
                    message: message.clone(),
                    diagnostics: diagnostics.into(),
                }),
            },
        }
    }
}

/// Run a submission with the query string in the URL
#[utoipa::path(
    get,
    path = "/api/v1/gremlin",
    tag = "gremlin",
    params(GremlinRequest),
    responses(
        (status = 200, description = "One entry per statement", body = [QueryEntry]),
        (status = 400, description = "Malformed request", body = crate::error::ApiError),
        (status = 502, description = "Graph endpoint unreachable or lost", body = crate::error::PartialFailure),
        (status = 504, description = "Request deadline reached mid-batch", body = crate::error::PartialFailure)
    )
)]
pub async fn gremlin_get(
    State(state): State<Arc<AppState>>,
    req: Result<Query<GremlinRequest>, QueryRejection>,
) -> Result<Json<Vec<QueryEntry>>, AppError> {
    let Query(req) = req?;
    execute(&state, req).await.map(Json)
}

/// Run a submission posted as JSON
#[utoipa::path(
    post,
    path = "/api/v1/gremlin",
    tag = "gremlin",
    request_body = GremlinRequest,
    responses(
        (status = 200, description = "One entry per statement", body = [QueryEntry]),
        (status = 400, description = "Malformed request", body = crate::error::ApiError),
        (status = 502, description = "Graph endpoint unreachable or lost", body = crate::error::PartialFailure),
        (status = 504, description = "Request deadline reached mid-batch", body = crate::error::PartialFailure)
    )
)]
pub async fn gremlin_post(
    State(state): State<Arc<AppState>>,
    req: Result<Json<GremlinRequest>, JsonRejection>,
) -> Result<Json<Vec<QueryEntry>>, AppError> {
    let Json(req) = req?;
    execute(&state, req).await.map(Json)
}

/// Split, open a session for this request only, run, close.
///
/// The batch is cancelled once the request budget is spent; outcomes
/// produced until then are still returned.
async fn execute(state: &AppState, req: GremlinRequest) -> Result<Vec<QueryEntry>, AppError> {
    state.increment_requests();

    let batch = gex_core::split(&req.query);
    if batch.is_empty() {
        return Ok(Vec::new());
    }

    let collection = req
        .collection_id
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| state.default_collection())
        .to_string();

    tracing::info!(%collection, queries = batch.len(), "Executing Gremlin batch");

    let mut session = state.sessions.open(&collection).await?;

    let cancel = CancellationToken::new();
    let budget = state.batch_budget();
    let report = {
        let run = gex_core::run_until_cancelled(session.as_mut(), &batch, &cancel);
        tokio::pin!(run);
        tokio::select! {
            report = &mut run => report,
            _ = tokio::time::sleep(budget) => {
                tracing::warn!(?budget, "Request budget spent, cancelling batch");
                cancel.cancel();
                run.await
            }
        }
    };

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close session for {}: {}", collection, e);
    }

    state.record_batch(&report);
    let entries: Vec<QueryEntry> = report.entries.iter().map(QueryEntry::from).collect();

    match report.halt {
        None => Ok(entries),
        Some(BatchHalt::Transport { error, .. }) => Err(AppError::Transport {
            message: error.to_string(),
            results: entries,
        }),
        Some(halt @ BatchHalt::Cancelled { .. }) => Err(AppError::Timeout {
            message: halt.to_string(),
            results: entries,
        }),
        Some(halt @ BatchHalt::SessionClosed { .. }) => Err(AppError::Internal(halt.to_string())),
    }
}
