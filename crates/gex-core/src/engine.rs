//! Sequential batch execution
//!
//! Queries run one at a time, in order, against a single session. A query
//! the service rejects becomes a `Failure` entry and the batch moves on. A
//! transport failure ends the batch: the failing query is reported and
//! nothing after it is attempted. Cancellation drops the in-flight query and
//! skips the rest; entries already produced are kept.

use crate::diagnostics::{classify, extract};
use crate::{
    BatchHalt, BatchReport, DiagnosticAttributes, ErrorKind, ExecutedQuery, GraphSession,
    QueryBatch, QueryOutcome, SubmitError,
};
use tokio_util::sync::CancellationToken;

/// Run every query of `batch` against `session`
pub async fn run<S>(session: &mut S, batch: &QueryBatch) -> BatchReport
where
    S: GraphSession + ?Sized,
{
    run_until_cancelled(session, batch, &CancellationToken::new()).await
}

/// Run `batch` until it completes, the transport fails, or `cancel` fires
#[tracing::instrument(skip_all, fields(queries = batch.len()))]
pub async fn run_until_cancelled<S>(
    session: &mut S,
    batch: &QueryBatch,
    cancel: &CancellationToken,
) -> BatchReport
where
    S: GraphSession + ?Sized,
{
    let mut report = BatchReport {
        entries: Vec::with_capacity(batch.len()),
        halt: None,
    };

    for (index, query) in batch.iter().enumerate() {
        let remaining = batch.len() - index;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(skipped = remaining, "Batch cancelled");
                report.halt = Some(BatchHalt::Cancelled { skipped: remaining });
                break;
            }
            result = session.submit(query) => result,
        };

        let outcome = match result {
            Ok(result_set) => {
                tracing::debug!(index, rows = result_set.rows.len(), "Query succeeded");
                QueryOutcome::Success {
                    diagnostics: extract(&result_set.attributes),
                    rows: result_set.rows,
                }
            }
            Err(SubmitError::Service(error)) => {
                let (kind, diagnostics) = classify(&error);
                if kind == ErrorKind::Throttled {
                    tracing::warn!(
                        index,
                        retry_after = ?diagnostics.retry_after,
                        activity_id = ?diagnostics.correlation_id,
                        "Query throttled"
                    );
                } else {
                    tracing::debug!(index, %kind, status = ?diagnostics.status_code, "Query failed: {}", error);
                }
                QueryOutcome::Failure {
                    kind,
                    message: error.message,
                    diagnostics,
                }
            }
            Err(SubmitError::Transport(error)) => {
                tracing::error!(index, "Transport failed mid-batch: {}", error);
                report.entries.push(ExecutedQuery {
                    query: query.clone(),
                    outcome: QueryOutcome::Failure {
                        kind: ErrorKind::Transport,
                        message: error.to_string(),
                        diagnostics: DiagnosticAttributes::default(),
                    },
                });
                report.halt = Some(BatchHalt::Transport {
                    error,
                    skipped: remaining - 1,
                });
                break;
            }
            Err(SubmitError::UseAfterClose) => {
                tracing::error!(index, "Batch submitted to a closed session");
                report.halt = Some(BatchHalt::SessionClosed { skipped: remaining });
                break;
            }
        };

        report.entries.push(ExecutedQuery {
            query: query.clone(),
            outcome,
        });
    }

    report
}
