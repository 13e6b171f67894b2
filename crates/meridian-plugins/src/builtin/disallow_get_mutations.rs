//! Rejects non-query operations sent over GET

use crate::context::{RequestContext, ResolvedOperation};
use crate::error::{PluginError, Result};
use crate::listener::RequestListener;
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use http::{header, HeaderValue, Method, StatusCode};
use meridian_core::OperationKind;
use std::sync::Arc;

/// Fails any non-query operation received over GET with `405` and `Allow: POST`
#[derive(Debug, Default, Clone, Copy)]
pub struct DisallowGetMutationsPlugin;

impl DisallowGetMutationsPlugin {
    /// Create the plugin
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Plugin for DisallowGetMutationsPlugin {
    fn name(&self) -> &str {
        "disallow-get-mutations"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::DisallowGetMutations))
    }

    async fn request_did_start(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>> {
        if ctx.http.method != Method::GET {
            return Ok(None);
        }
        Ok(Some(Arc::new(GetRequestGuard)))
    }
}

#[derive(Debug)]
struct GetRequestGuard;

#[async_trait]
impl RequestListener for GetRequestGuard {
    async fn did_resolve_operation(
        &self,
        _ctx: &RequestContext,
        operation: &ResolvedOperation,
    ) -> Result<()> {
        if operation.kind == OperationKind::Query {
            return Ok(());
        }

        tracing::debug!(operation = %operation.display_name(), kind = %operation.kind, "Rejecting GET operation");

        Err(PluginError::http(
            StatusCode::METHOD_NOT_ALLOWED,
            vec![(header::ALLOW, HeaderValue::from_static("POST"))],
            format!(
                "GET requests only support query operations, not {} operations",
                operation.kind
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{GraphQLRequest, HttpRequestHead};

    fn ctx(http: HttpRequestHead) -> RequestContext {
        RequestContext {
            request: GraphQLRequest::new("mutation { bump }"),
            http,
            schema_hash: String::new(),
        }
    }

    fn mutation() -> ResolvedOperation {
        ResolvedOperation {
            kind: OperationKind::Mutation,
            name: None,
        }
    }

    #[tokio::test]
    async fn test_post_is_not_guarded() {
        let plugin = DisallowGetMutationsPlugin::new();
        let listener = plugin.request_did_start(&ctx(HttpRequestHead::post())).await.unwrap();
        assert!(listener.is_none());
    }

    #[tokio::test]
    async fn test_get_mutation_rejected() {
        let plugin = DisallowGetMutationsPlugin::new();
        let ctx = ctx(HttpRequestHead::get());
        let listener = plugin.request_did_start(&ctx).await.unwrap().unwrap();

        let err = listener.did_resolve_operation(&ctx, &mutation()).await.unwrap_err();
        match err {
            PluginError::Http { status, headers, .. } => {
                assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(headers, vec![(header::ALLOW, HeaderValue::from_static("POST"))]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_query_allowed() {
        let plugin = DisallowGetMutationsPlugin::new();
        let ctx = ctx(HttpRequestHead::get());
        let listener = plugin.request_did_start(&ctx).await.unwrap().unwrap();

        let query = ResolvedOperation {
            kind: OperationKind::Query,
            name: Some("Q".into()),
        };
        assert!(listener.did_resolve_operation(&ctx, &query).await.is_ok());
    }
}
