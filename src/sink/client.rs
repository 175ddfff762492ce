//! HTTP client that ships row batches to the store as bulk inserts.
//!
//! Every submission is a single POST; delivery problems are logged and
//! counted, never returned, so telemetry cannot disturb the run it reports.

use crate::sink::metrics::{SinkMetrics, SinkMetricsSnapshot};
use crate::sink::rows::encode_rows;
use crate::sink::target::InsertTarget;
use anyhow::{Context, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

const MAX_LOGGED_BODY_CHARS: usize = 512;

#[derive(Debug)]
pub enum SinkError {
    Encode(serde_json::Error),
    InvalidEndpoint { endpoint: String, reason: String },
    Timeout { table: String },
    Transport(reqwest::Error),
    Rejected { status: u16, body: String },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Encode(err) => write!(f, "failed to encode rows: {err}"),
            SinkError::InvalidEndpoint { endpoint, reason } => {
                write!(f, "invalid endpoint {endpoint}: {reason}")
            }
            SinkError::Timeout { table } => write!(f, "insert into {table} timed out"),
            SinkError::Transport(err) => write!(f, "transport error: {err}"),
            SinkError::Rejected { status, body } => {
                write!(f, "store rejected insert with status {status}: {body}")
            }
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Encode(err) => Some(err),
            SinkError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

/// Fire-and-forget writer for `JSONEachRow` inserts.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    client: reqwest::Client,
    metrics: Arc<SinkMetrics>,
}

impl TelemetrySink {
    /// Builds a sink with its own HTTP client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build telemetry HTTP client")?;
        Ok(Self::with_client(client))
    }

    /// Builds a sink around an existing client, sharing its connection pool.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            metrics: Arc::new(SinkMetrics::default()),
        }
    }

    /// Outcome counters, shared by every clone of this sink.
    pub fn metrics(&self) -> SinkMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Inserts `rows` into `target` with one request.
    ///
    /// Never fails: transport errors, timeouts and store rejections are logged
    /// as warnings and dropped. An empty batch sends nothing.
    pub async fn submit<T: Serialize>(&self, target: &InsertTarget, rows: &[T]) {
        if rows.is_empty() {
            tracing::debug!(
                target: "run_telemetry::sink",
                table = %target.qualified_table(),
                "no rows to submit"
            );
            return;
        }

        match self.try_submit(target, rows).await {
            Ok(()) => {
                tracing::debug!(
                    target: "run_telemetry::sink",
                    table = %target.qualified_table(),
                    rows = rows.len(),
                    "telemetry rows submitted"
                );
            }
            Err(SinkError::Rejected { status, body }) => {
                tracing::warn!(
                    target: "run_telemetry::sink",
                    table = %target.qualified_table(),
                    status,
                    body = %body,
                    "could not submit telemetry: store rejected insert"
                );
            }
            Err(err) => {
                tracing::warn!(
                    target: "run_telemetry::sink",
                    table = %target.qualified_table(),
                    endpoint = target.endpoint(),
                    error = %err,
                    "could not submit telemetry"
                );
            }
        }
    }

    /// Performs the insert and reports the outcome instead of logging it.
    pub async fn try_submit<T: Serialize>(
        &self,
        target: &InsertTarget,
        rows: &[T],
    ) -> Result<(), SinkError> {
        let payload = encode_rows(rows).map_err(SinkError::Encode)?;
        let url = target.url()?;
        let statement = target.insert_statement(&payload);

        let started = Instant::now();
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(target.timeout())
            .body(statement)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                self.metrics.record_timeout(started.elapsed());
                return Err(SinkError::Timeout {
                    table: target.qualified_table(),
                });
            }
            Err(err) => {
                self.metrics.record_transport_error(started.elapsed());
                return Err(SinkError::Transport(err));
            }
        };

        let status = response.status();
        if status.is_success() {
            self.metrics.record_delivered(started.elapsed());
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => truncate_body(body),
            Err(err) => format!("<unreadable response body: {err}>"),
        };
        self.metrics.record_rejected(started.elapsed());
        Err(SinkError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

fn truncate_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_LOGGED_BODY_CHARS {
        return trimmed.to_owned();
    }
    let mut truncated: String = trimmed.chars().take(MAX_LOGGED_BODY_CHARS).collect();
    truncated.push('…');
    truncated
}
