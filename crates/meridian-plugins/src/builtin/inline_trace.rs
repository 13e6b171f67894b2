//! Inline traces for federated gateways

use crate::context::{RequestContext, ResolvedOperation, ServerStartContext};
use crate::error::Result;
use crate::listener::{RequestListener, ServerListener};
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use meridian_core::HttpGraphQLResponse;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Header a gateway sets to ask for an inline trace
pub const INCLUDE_TRACE_HEADER: &str = "meridian-federation-include-trace";

/// Value of [`INCLUDE_TRACE_HEADER`] requesting an `ftv1` trace
pub const FTV1: &str = "ftv1";

/// Adds an `ftv1` response extension with timing data when the gateway asks
/// for one
#[derive(Debug, Clone)]
pub struct InlineTracePlugin {
    federated_only: bool,
    enabled: Arc<AtomicBool>,
}

impl InlineTracePlugin {
    /// Trace only when the active schema is a federated composition
    pub fn federated_only() -> Self {
        Self {
            federated_only: true,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Trace for any schema
    pub fn always() -> Self {
        Self {
            federated_only: false,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether traces are currently produced
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for InlineTracePlugin {
    fn name(&self) -> &str {
        "inline-trace"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::InlineTrace))
    }

    async fn server_will_start(&self, ctx: &ServerStartContext) -> Result<Option<ServerListener>> {
        let enabled = !self.federated_only || ctx.schema.is_federated();
        self.enabled.store(enabled, Ordering::SeqCst);

        if enabled {
            tracing::info!("Inline tracing enabled");
        }

        Ok(None)
    }

    async fn request_did_start(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>> {
        if !self.is_enabled() || ctx.http.header(INCLUDE_TRACE_HEADER) != Some(FTV1) {
            return Ok(None);
        }

        Ok(Some(Arc::new(TraceRecorder {
            started_at: Utc::now(),
            started: Instant::now(),
        })))
    }
}

#[derive(Debug)]
struct TraceRecorder {
    started_at: DateTime<Utc>,
    started: Instant,
}

#[async_trait]
impl RequestListener for TraceRecorder {
    async fn will_send_response(
        &self,
        _ctx: &RequestContext,
        _operation: Option<&ResolvedOperation>,
        response: &mut HttpGraphQLResponse,
    ) {
        let duration = self.started.elapsed();
        response.body.extensions.insert(
            FTV1.to_string(),
            json!({
                "startTime": self.started_at.to_rfc3339(),
                "endTime": Utc::now().to_rfc3339(),
                "durationNs": u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
            }),
        );
    }
}
