//! # Meridian Plugins
//!
//! Plugin API and plugin set resolution for the Meridian GraphQL server.
//!
//! ## Hooks
//!
//! - **Server hooks**: `server_will_start` returns a [`ServerListener`] with
//!   optional schema update, drain, stop and landing page hooks
//! - **Request hooks**: `request_did_start` returns a [`RequestListener`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use meridian_plugins::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! struct Announcer;
//!
//! #[async_trait]
//! impl Plugin for Announcer {
//!     fn name(&self) -> &str { "announcer" }
//!
//!     async fn server_will_start(
//!         &self,
//!         ctx: &ServerStartContext,
//!     ) -> Result<Option<ServerListener>, PluginError> {
//!         println!("starting with schema {}", ctx.schema_hash);
//!         Ok(Some(ServerListener::new().on_stop(|| async { Ok(()) })))
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builtin;
pub mod context;
pub mod error;
pub mod listener;
pub mod plugin;
pub mod resolver;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(test)]
mod testing_support;

pub use context::{RequestContext, ResolvedOperation, ServerStartContext};
pub use error::PluginError;
pub use listener::{LandingPageHook, RequestListener, SchemaUpdateHook, ServerHook, ServerListener};
pub use plugin::{InternalPluginId, InternalPluginKind, Plugin, PluginDefinition};
pub use resolver::{resolve_plugins, PluginRegistration};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::context::{RequestContext, ResolvedOperation, ServerStartContext};
    pub use crate::error::PluginError;
    pub use crate::listener::{RequestListener, ServerListener};
    pub use crate::plugin::{Plugin, PluginDefinition};
}
