//! Schema reporting

use crate::context::ServerStartContext;
use crate::error::{PluginError, Result};
use crate::listener::ServerListener;
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use meridian_core::schema_hash;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Reports the schema hash at startup and whenever it changes
#[derive(Debug, Clone)]
pub struct SchemaReportingPlugin {
    graph_ref: Option<String>,
    state: Arc<ReporterState>,
}

#[derive(Debug, Default)]
struct ReporterState {
    last_reported: Mutex<Option<String>>,
    reports: AtomicUsize,
    stopped: AtomicBool,
}

impl ReporterState {
    fn report(&self, graph_ref: &str, hash: &str) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let mut last = self.last_reported.lock();
        if last.as_deref() == Some(hash) {
            return;
        }

        tracing::info!(graph_ref = %graph_ref, schema_hash = %hash, "Reporting schema");
        *last = Some(hash.to_string());
        self.reports.fetch_add(1, Ordering::SeqCst);
    }
}

impl SchemaReportingPlugin {
    /// Create the plugin
    pub fn new(graph_ref: Option<String>) -> Self {
        Self {
            graph_ref,
            state: Arc::new(ReporterState::default()),
        }
    }

    /// Most recently reported schema hash
    pub fn last_reported_hash(&self) -> Option<String> {
        self.state.last_reported.lock().clone()
    }

    /// Number of reports sent
    pub fn report_count(&self) -> usize {
        self.state.reports.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for SchemaReportingPlugin {
    fn name(&self) -> &str {
        "schema-reporting"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::SchemaReporting))
    }

    async fn server_will_start(&self, ctx: &ServerStartContext) -> Result<Option<ServerListener>> {
        let graph_ref = self.graph_ref.clone().ok_or_else(|| {
            PluginError::config(
                "Schema reporting requires a graph ref; set reporting.graph_ref or MERIDIAN_GRAPH_REF",
            )
        })?;

        self.state.report(&graph_ref, &ctx.schema_hash);

        let update_state = self.state.clone();
        let stop_state = self.state.clone();
        let listener = ServerListener::new()
            .on_schema_update(move |update| {
                let sdl = update
                    .core_supergraph_sdl
                    .as_deref()
                    .unwrap_or(&update.api_schema);
                update_state.report(&graph_ref, &schema_hash(sdl));
            })
            .on_stop(move || {
                stop_state.stopped.store(true, Ordering::SeqCst);
                async { Ok(()) }
            });

        Ok(Some(listener))
    }
}
