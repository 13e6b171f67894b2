//! Public server facade

use crate::lifecycle::Lifecycle;
use crate::phase::ServerPhaseKind;
use crate::schema_manager::{Gateway, SchemaManager, SchemaProvider};
use meridian_config::{validate_config, Config};
use meridian_core::{
    Error, GraphQLRequest, GraphQLSchema, HttpGraphQLResponse, HttpRequestHead, LandingPage,
    Result, SchemaDerivedData,
};
use meridian_plugins::{resolve_plugins, Plugin, PluginDefinition};
use std::fmt;
use std::sync::Arc;

/// A GraphQL server with a managed lifecycle.
///
/// Cloning is cheap; clones share the same lifecycle.
#[derive(Clone)]
pub struct GraphQLServer {
    lifecycle: Arc<Lifecycle>,
}

impl GraphQLServer {
    /// Start building a server
    pub fn builder() -> GraphQLServerBuilder {
        GraphQLServerBuilder::default()
    }

    /// Start the server and wait for startup to finish.
    ///
    /// Fails if called more than once, or with the startup error.
    pub async fn start(&self) -> Result<()> {
        self.lifecycle.start().await
    }

    /// Begin startup without waiting for it.
    ///
    /// Operations issued meanwhile wait for startup. A startup failure is
    /// logged and reported to later operations in redacted form.
    pub fn start_in_background(&self) -> Result<()> {
        let (resolver, schema_provider) = self.lifecycle.begin_start()?;
        let lifecycle = self.lifecycle.clone();
        tokio::spawn(async move {
            // failures are logged and recorded by finish_start
            let _ = lifecycle.finish_start(resolver, schema_provider).await;
        });
        Ok(())
    }

    /// Stop the server.
    ///
    /// Concurrent and repeated calls all observe the outcome of the first.
    pub async fn stop(&self) -> Result<()> {
        self.lifecycle.stop().await
    }

    /// Current lifecycle phase
    pub fn state(&self) -> ServerPhaseKind {
        self.lifecycle.kind()
    }

    /// Execute an operation as if it arrived in a plain `POST`
    pub async fn execute_operation(&self, request: GraphQLRequest) -> Result<HttpGraphQLResponse> {
        self.execute_http_request(HttpRequestHead::post(), request)
            .await
    }

    /// Execute an operation received over HTTP.
    ///
    /// Errors when the server is not accepting operations. Everything else,
    /// including plugin rejections, is a GraphQL error response.
    pub async fn execute_http_request(
        &self,
        http: HttpRequestHead,
        request: GraphQLRequest,
    ) -> Result<HttpGraphQLResponse> {
        self.lifecycle.execute_http_request(http, request).await
    }

    /// Landing page rendered at startup, while the server is serving
    pub fn landing_page(&self) -> Option<LandingPage> {
        self.lifecycle.landing_page()
    }

    /// Names of the installed plugins, in invocation order
    pub fn plugin_names(&self) -> Vec<String> {
        self.lifecycle
            .plugins
            .iter()
            .map(|registration| registration.name().to_string())
            .collect()
    }

    /// Schema data for the current phase, waiting for startup if needed
    pub async fn schema_derived_data(&self) -> Result<Arc<SchemaDerivedData>> {
        self.lifecycle.schema_derived_data_for_operation().await
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.lifecycle.config
    }
}

impl fmt::Debug for GraphQLServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQLServer")
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

/// Builder for [`GraphQLServer`]
#[derive(Default)]
pub struct GraphQLServerBuilder {
    config: Option<Config>,
    schema: Option<Arc<dyn GraphQLSchema>>,
    gateway: Option<Arc<dyn Gateway>>,
    plugins: Vec<PluginDefinition>,
}

impl GraphQLServerBuilder {
    /// Use `config` instead of the defaults
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Serve a fixed schema
    pub fn schema(self, schema: impl GraphQLSchema + 'static) -> Self {
        self.schema_arc(Arc::new(schema))
    }

    /// Serve a shared fixed schema
    pub fn schema_arc(mut self, schema: Arc<dyn GraphQLSchema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Serve whatever `gateway` loads
    pub fn gateway(mut self, gateway: impl Gateway + 'static) -> Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    /// Install a plugin
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(PluginDefinition::instance(plugin));
        self
    }

    /// Install a plugin definition
    pub fn plugin_definition(mut self, definition: PluginDefinition) -> Self {
        self.plugins.push(definition);
        self
    }

    /// Install a plugin created when the server is built
    pub fn plugin_factory<F, P>(mut self, factory: F) -> Self
    where
        F: FnOnce() -> P + Send + 'static,
        P: Plugin + 'static,
    {
        self.plugins.push(PluginDefinition::factory(factory));
        self
    }

    /// Validate the configuration, resolve the plugin set and build the server
    pub fn build(self) -> Result<GraphQLServer> {
        let config = self.config.unwrap_or_default();
        validate_config(&config)?;

        let capacity = config.document_cache.capacity();
        let schema_provider: Arc<dyn SchemaProvider> = match (self.schema, self.gateway) {
            (Some(_), Some(_)) => {
                return Err(Error::Config(
                    "Cannot provide both a schema and a gateway".to_string(),
                ))
            }
            (Some(schema), None) => Arc::new(SchemaManager::from_schema(schema, capacity)),
            (None, Some(gateway)) => Arc::new(SchemaManager::from_gateway(gateway, capacity)),
            (None, None) => {
                return Err(Error::Config(
                    "Either a schema or a gateway is required".to_string(),
                ))
            }
        };

        let plugins = resolve_plugins(self.plugins, &config)?;
        tracing::debug!(
            environment = %config.server.environment,
            plugins = plugins.len(),
            "Built GraphQL server"
        );

        Ok(GraphQLServer {
            lifecycle: Arc::new(Lifecycle::new(schema_provider, plugins, config)),
        })
    }
}

impl fmt::Debug for GraphQLServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQLServerBuilder")
            .field("config", &self.config)
            .field("schema", &self.schema.is_some())
            .field("gateway", &self.gateway.is_some())
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
