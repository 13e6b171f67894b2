//! Capability sets returned by plugins

use crate::context::{RequestContext, ResolvedOperation};
use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use meridian_core::{HttpGraphQLResponse, LandingPage, SchemaLoadOrUpdate};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Callback invoked whenever the schema loads or changes
pub type SchemaUpdateHook = Arc<dyn Fn(&SchemaLoadOrUpdate) + Send + Sync>;

/// Asynchronous server hook
pub type ServerHook = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Landing page renderer
pub type LandingPageHook = Arc<dyn Fn() -> BoxFuture<'static, Result<LandingPage>> + Send + Sync>;

/// Server-level hooks a plugin registers from `server_will_start`.
///
/// Every hook is optional.
#[derive(Clone, Default)]
pub struct ServerListener {
    schema_did_load_or_update: Option<SchemaUpdateHook>,
    drain_server: Option<ServerHook>,
    server_will_stop: Option<ServerHook>,
    render_landing_page: Option<LandingPageHook>,
}

impl ServerListener {
    /// Create a listener with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe schema loads and updates
    pub fn on_schema_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SchemaLoadOrUpdate) + Send + Sync + 'static,
    {
        self.schema_did_load_or_update = Some(Arc::new(hook));
        self
    }

    /// Run while the transport drains, before disposal
    pub fn on_drain<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.drain_server = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// Run during the first disposal wave
    pub fn on_stop<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.server_will_stop = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// Render the landing page
    pub fn with_landing_page<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<LandingPage>> + Send + 'static,
    {
        self.render_landing_page = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// Schema update hook, if registered
    pub fn schema_did_load_or_update(&self) -> Option<&SchemaUpdateHook> {
        self.schema_did_load_or_update.as_ref()
    }

    /// Drain hook, if registered
    pub fn drain_server(&self) -> Option<&ServerHook> {
        self.drain_server.as_ref()
    }

    /// Stop hook, if registered
    pub fn server_will_stop(&self) -> Option<&ServerHook> {
        self.server_will_stop.as_ref()
    }

    /// Landing page renderer, if registered
    pub fn render_landing_page(&self) -> Option<&LandingPageHook> {
        self.render_landing_page.as_ref()
    }
}

impl fmt::Debug for ServerListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerListener")
            .field("schema_did_load_or_update", &self.schema_did_load_or_update.is_some())
            .field("drain_server", &self.drain_server.is_some())
            .field("server_will_stop", &self.server_will_stop.is_some())
            .field("render_landing_page", &self.render_landing_page.is_some())
            .finish()
    }
}

/// Request-level hooks a plugin returns from `request_did_start`
#[async_trait]
pub trait RequestListener: Send + Sync + fmt::Debug {
    /// Called once the operation is known, before execution.
    ///
    /// An error aborts the request without executing it.
    async fn did_resolve_operation(
        &self,
        _ctx: &RequestContext,
        _operation: &ResolvedOperation,
    ) -> Result<()> {
        Ok(())
    }

    /// Called with the final response before it is handed to the transport
    async fn will_send_response(
        &self,
        _ctx: &RequestContext,
        _operation: Option<&ResolvedOperation>,
        _response: &mut HttpGraphQLResponse,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;

    #[tokio::test]
    async fn test_listener_hooks() {
        let listener = ServerListener::new()
            .on_stop(|| async { Err(PluginError::runtime("no way 1")) })
            .with_landing_page(|| async { Ok(LandingPage::Html("<p>hi</p>".into())) });

        assert!(listener.drain_server().is_none());
        assert!(listener.schema_did_load_or_update().is_none());

        let stop = listener.server_will_stop().unwrap();
        assert_eq!(stop().await, Err(PluginError::runtime("no way 1")));

        let page = (listener.render_landing_page().unwrap())().await.unwrap();
        assert_eq!(page.html(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_listener_debug_lists_hooks() {
        let listener = ServerListener::new().on_drain(|| async { Ok(()) });
        let debug = format!("{listener:?}");
        assert!(debug.contains("drain_server: true"));
        assert!(debug.contains("server_will_stop: false"));
    }
}
