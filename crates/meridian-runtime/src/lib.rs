//! # Meridian Runtime
//!
//! Lifecycle management for the Meridian GraphQL server.
//!
//! ## Phases
//!
//! A server moves through `initialized`, `starting`, `started`, `draining`,
//! `stopping` and `stopped`, or ends in `failed to start`. Operations run only
//! while `started` or `draining`; operations issued during `starting` wait for
//! startup to finish.
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_graphql::{EmptyMutation, EmptySubscription, Object, Schema};
//! use meridian_runtime::prelude::*;
//!
//! struct Query;
//!
//! #[Object]
//! impl Query {
//!     async fn hello(&self) -> String {
//!         "world".to_string()
//!     }
//! }
//!
//! # async fn run() -> meridian_core::Result<()> {
//! let schema = Schema::new(Query, EmptyMutation, EmptySubscription);
//! let server = GraphQLServer::builder()
//!     .schema(AsyncGraphQLSchema::new(schema))
//!     .build()?;
//!
//! server.start().await?;
//! let response = server
//!     .execute_operation(GraphQLRequest::new("{ hello }"))
//!     .await?;
//! assert!(!response.body.has_errors());
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod completion;
pub mod engine;
pub mod errors;
mod gate;
mod lifecycle;
mod phase;
mod request;
pub mod schema_manager;
pub mod server;
mod shutdown;
pub mod signal;

#[cfg(test)]
mod test_support;

pub use completion::{CompletionSignal, Resolver};
pub use engine::AsyncGraphQLSchema;
pub use errors::{
    GRAPHQL_PARSE_FAILED, GRAPHQL_VALIDATION_FAILED, INTERNAL_SERVER_ERROR,
    OPERATION_RESOLUTION_FAILURE,
};
pub use phase::ServerPhaseKind;
pub use schema_manager::{
    Gateway, GatewayLoad, GatewaySchemaCallback, GatewayUnsubscribe, SchemaManager,
    SchemaProvider,
};
pub use server::{GraphQLServer, GraphQLServerBuilder};
pub use signal::TerminationSignal;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::engine::AsyncGraphQLSchema;
    pub use crate::phase::ServerPhaseKind;
    pub use crate::server::{GraphQLServer, GraphQLServerBuilder};
    pub use meridian_core::{GraphQLRequest, GraphQLResponse, HttpRequestHead};
}
