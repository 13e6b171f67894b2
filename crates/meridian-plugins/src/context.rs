//! Contexts handed to plugin hooks

use meridian_config::Environment;
use meridian_core::{GraphQLRequest, GraphQLSchema, HttpRequestHead, OperationKind};
use std::fmt;
use std::sync::Arc;

/// Context for [`Plugin::server_will_start`](crate::Plugin::server_will_start)
#[derive(Clone)]
pub struct ServerStartContext {
    /// Schema active at startup
    pub schema: Arc<dyn GraphQLSchema>,

    /// Hash of the startup schema
    pub schema_hash: String,

    /// Deployment environment
    pub environment: Environment,
}

impl fmt::Debug for ServerStartContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerStartContext")
            .field("schema_hash", &self.schema_hash)
            .field("environment", &self.environment)
            .finish()
    }
}

/// Context for a single GraphQL request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The GraphQL request
    pub request: GraphQLRequest,

    /// HTTP facts about the request
    pub http: HttpRequestHead,

    /// Hash of the schema serving the request
    pub schema_hash: String,
}

/// The operation selected from a request document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOperation {
    /// Operation kind
    pub kind: OperationKind,

    /// Operation name, if the operation is named
    pub name: Option<String>,
}

impl ResolvedOperation {
    /// Name used for reporting, `<anonymous>` when unnamed
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}
