//! Per-operation usage aggregation

use crate::context::{RequestContext, ResolvedOperation, ServerStartContext};
use crate::error::Result;
use crate::listener::{RequestListener, ServerListener};
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use dashmap::DashMap;
use meridian_core::HttpGraphQLResponse;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const UNRESOLVED_OPERATION: &str = "<unresolved>";

/// Request and error counts for one operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Requests observed
    pub requests: u64,
    /// Requests whose response carried errors
    pub errors: u64,
}

/// Aggregates per-operation request and error counts and flushes a summary
/// on every report interval and on server stop
#[derive(Debug, Clone)]
pub struct UsageReportingPlugin {
    graph_ref: String,
    report_interval: Duration,
    stats: Arc<DashMap<String, OperationStats>>,
    ticker: Arc<Mutex<Option<CancellationToken>>>,
}

impl UsageReportingPlugin {
    /// Create the plugin
    pub fn new(graph_ref: impl Into<String>, report_interval: Duration) -> Self {
        Self {
            graph_ref: graph_ref.into(),
            report_interval,
            stats: Arc::new(DashMap::new()),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    /// Counts gathered since the last flush
    pub fn pending(&self) -> Vec<(String, OperationStats)> {
        let mut pending: Vec<_> = self
            .stats
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));
        pending
    }

    /// Whether the periodic flush is running
    pub fn is_reporting(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Emit and reset the gathered counts
    pub fn flush(&self) -> usize {
        flush(&self.graph_ref, &self.stats)
    }
}

fn flush(graph_ref: &str, stats: &DashMap<String, OperationStats>) -> usize {
    let operations: Vec<String> = stats.iter().map(|entry| entry.key().clone()).collect();
    let mut flushed = 0;

    for operation in operations {
        if let Some((operation, counts)) = stats.remove(&operation) {
            tracing::info!(
                graph_ref = %graph_ref,
                operation = %operation,
                requests = counts.requests,
                errors = counts.errors,
                "Usage report"
            );
            flushed += 1;
        }
    }

    flushed
}

#[async_trait]
impl Plugin for UsageReportingPlugin {
    fn name(&self) -> &str {
        "usage-reporting"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::UsageReporting))
    }

    async fn server_will_start(&self, _ctx: &ServerStartContext) -> Result<Option<ServerListener>> {
        let token = CancellationToken::new();
        if let Some(previous) = self.ticker.lock().replace(token.clone()) {
            previous.cancel();
        }

        let ticker_token = token.clone();
        let graph_ref = self.graph_ref.clone();
        let stats = self.stats.clone();
        let interval = self.report_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker_token.cancelled() => break,
                    _ = ticker.tick() => {
                        flush(&graph_ref, &stats);
                    }
                }
            }
        });

        tracing::info!(graph_ref = %self.graph_ref, interval = ?self.report_interval, "Usage reporting enabled");

        let graph_ref = self.graph_ref.clone();
        let stats = self.stats.clone();
        Ok(Some(ServerListener::new().on_stop(move || {
            token.cancel();
            let flushed = flush(&graph_ref, &stats);
            async move {
                tracing::debug!(operations = flushed, "Flushed final usage report");
                Ok(())
            }
        })))
    }

    async fn request_did_start(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>> {
        Ok(Some(Arc::new(UsageRecorder {
            stats: self.stats.clone(),
        })))
    }
}

#[derive(Debug)]
struct UsageRecorder {
    stats: Arc<DashMap<String, OperationStats>>,
}

#[async_trait]
impl RequestListener for UsageRecorder {
    async fn will_send_response(
        &self,
        _ctx: &RequestContext,
        operation: Option<&ResolvedOperation>,
        response: &mut HttpGraphQLResponse,
    ) {
        let name = operation
            .map(ResolvedOperation::display_name)
            .unwrap_or(UNRESOLVED_OPERATION);

        let mut entry = self.stats.entry(name.to_string()).or_default();
        entry.requests += 1;
        if response.body.has_errors() || !response.status.is_success() {
            entry.errors += 1;
        }
    }
}
