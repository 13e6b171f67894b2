//! Default cache-control policy

use crate::context::{RequestContext, ResolvedOperation};
use crate::error::Result;
use crate::listener::RequestListener;
use crate::plugin::{InternalPluginId, InternalPluginKind, Plugin, Token};
use async_trait::async_trait;
use http::{header, HeaderValue};
use meridian_config::CacheControlConfig;
use meridian_core::{HttpGraphQLResponse, OperationKind};
use std::sync::Arc;

/// Sets `cache-control: max-age=N, public` on successful query responses
#[derive(Debug, Clone)]
pub struct CacheControlPlugin {
    default_max_age: u32,
    calculate_http_headers: bool,
}

impl CacheControlPlugin {
    /// Create the plugin
    pub fn new(default_max_age: u32, calculate_http_headers: bool) -> Self {
        Self {
            default_max_age,
            calculate_http_headers,
        }
    }

    /// Create the plugin from configuration
    pub fn from_config(config: &CacheControlConfig) -> Self {
        Self::new(config.default_max_age, config.calculate_http_headers)
    }
}

#[async_trait]
impl Plugin for CacheControlPlugin {
    fn name(&self) -> &str {
        "cache-control"
    }

    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        Some(InternalPluginId::new(InternalPluginKind::CacheControl))
    }

    async fn request_did_start(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>> {
        if !self.calculate_http_headers || self.default_max_age == 0 {
            return Ok(None);
        }
        Ok(Some(Arc::new(CacheHeaderWriter {
            max_age: self.default_max_age,
        })))
    }
}

#[derive(Debug)]
struct CacheHeaderWriter {
    max_age: u32,
}

#[async_trait]
impl RequestListener for CacheHeaderWriter {
    async fn will_send_response(
        &self,
        _ctx: &RequestContext,
        operation: Option<&ResolvedOperation>,
        response: &mut HttpGraphQLResponse,
    ) {
        let cacheable = matches!(operation, Some(op) if op.kind == OperationKind::Query)
            && response.status.is_success()
            && !response.body.has_errors();

        if !cacheable || response.headers.contains_key(header::CACHE_CONTROL) {
            return;
        }

        if let Ok(value) = HeaderValue::from_str(&format!("max-age={}, public", self.max_age)) {
            response.headers.insert(header::CACHE_CONTROL, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{GraphQLError, GraphQLRequest, GraphQLResponse, HttpRequestHead};

    fn ctx() -> RequestContext {
        RequestContext {
            request: GraphQLRequest::new("{ hello }"),
            http: HttpRequestHead::post(),
            schema_hash: String::new(),
        }
    }

    fn op(kind: OperationKind) -> ResolvedOperation {
        ResolvedOperation { kind, name: None }
    }

    async fn headers_for(
        plugin: &CacheControlPlugin,
        kind: OperationKind,
        body: GraphQLResponse,
    ) -> Option<String> {
        let ctx = ctx();
        let listener = plugin.request_did_start(&ctx).await.unwrap()?;
        let mut response = HttpGraphQLResponse::ok(body);
        listener
            .will_send_response(&ctx, Some(&op(kind)), &mut response)
            .await;
        response
            .headers
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_sets_header_on_successful_query() {
        let plugin = CacheControlPlugin::new(60, true);
        let header = headers_for(&plugin, OperationKind::Query, GraphQLResponse::default()).await;
        assert_eq!(header.as_deref(), Some("max-age=60, public"));
    }

    #[tokio::test]
    async fn test_no_header_for_mutations_or_errors() {
        let plugin = CacheControlPlugin::new(60, true);
        assert!(headers_for(&plugin, OperationKind::Mutation, GraphQLResponse::default())
            .await
            .is_none());

        let errored = GraphQLResponse::from_errors(vec![GraphQLError::new("boom")]);
        assert!(headers_for(&plugin, OperationKind::Query, errored).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_without_max_age() {
        let plugin = CacheControlPlugin::from_config(&CacheControlConfig::default());
        assert!(plugin.request_did_start(&ctx()).await.unwrap().is_none());
    }
}
