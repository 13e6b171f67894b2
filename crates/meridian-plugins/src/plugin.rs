//! Core plugin trait and types

use crate::context::{RequestContext, ServerStartContext};
use crate::error::Result;
use crate::listener::{RequestListener, ServerListener};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Core plugin trait that all plugins must implement
///
/// Every hook has a no-op default; a plugin implements only what it needs.
#[async_trait]
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Plugin name, used in logs and errors
    fn name(&self) -> &str;

    /// Identifier of a built-in plugin.
    ///
    /// The [`Token`] argument cannot be named outside this crate, so this
    /// method can be neither overridden nor called by other crates. Only
    /// built-in plugins answer `Some`.
    ///
    /// ```compile_fail
    /// use meridian_plugins::{InternalPluginId, Plugin};
    ///
    /// #[derive(Debug)]
    /// struct Impostor;
    ///
    /// impl Plugin for Impostor {
    ///     fn name(&self) -> &str {
    ///         "cache-control"
    ///     }
    ///
    ///     fn internal_id(&self, _: meridian_plugins::plugin::sealed::Token) -> Option<InternalPluginId> {
    ///         None
    ///     }
    /// }
    /// ```
    fn internal_id(&self, _: Token) -> Option<InternalPluginId> {
        None
    }

    /// Called once during startup, concurrently with every other plugin
    async fn server_will_start(&self, _ctx: &ServerStartContext) -> Result<Option<ServerListener>> {
        Ok(None)
    }

    /// Called at the start of every request
    async fn request_did_start(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>> {
        Ok(None)
    }
}

/// Kind of built-in plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternalPluginKind {
    /// Rejects non-query operations over GET
    DisallowGetMutations,
    /// Cache-control policy
    CacheControl,
    /// Usage reporting
    UsageReporting,
    /// Schema reporting
    SchemaReporting,
    /// Federated inline tracing
    InlineTrace,
    /// Default landing page
    LandingPage,
    /// Landing page disabled
    LandingPageDisabled,
}

mod sealed {
    /// Witness that a call originates inside this crate
    #[allow(unreachable_pub)]
    #[derive(Debug, Clone, Copy)]
    pub struct Token;
}

pub(crate) use sealed::Token;

/// Sealed identifier carried by built-in plugins
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InternalPluginId(InternalPluginKind);

impl InternalPluginId {
    pub(crate) const fn new(kind: InternalPluginKind) -> Self {
        Self(kind)
    }

    /// The built-in plugin kind
    pub fn kind(&self) -> InternalPluginKind {
        self.0
    }
}

/// A plugin as supplied by the caller: an instance, or a factory invoked once
/// during resolution
pub enum PluginDefinition {
    /// Ready plugin instance
    Instance(Arc<dyn Plugin>),
    /// Deferred construction
    Factory(Box<dyn FnOnce() -> Arc<dyn Plugin> + Send>),
}

impl PluginDefinition {
    /// Wrap a plugin instance
    pub fn instance<P: Plugin + 'static>(plugin: P) -> Self {
        Self::Instance(Arc::new(plugin))
    }

    /// Wrap a plugin factory
    pub fn factory<F, P>(factory: F) -> Self
    where
        F: FnOnce() -> P + Send + 'static,
        P: Plugin + 'static,
    {
        Self::Factory(Box::new(move || Arc::new(factory()) as Arc<dyn Plugin>))
    }

    /// Produce the plugin, invoking the factory if needed
    pub fn into_plugin(self) -> Arc<dyn Plugin> {
        match self {
            Self::Instance(plugin) => plugin,
            Self::Factory(factory) => factory(),
        }
    }
}

impl From<Arc<dyn Plugin>> for PluginDefinition {
    fn from(plugin: Arc<dyn Plugin>) -> Self {
        Self::Instance(plugin)
    }
}

impl fmt::Debug for PluginDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(plugin) => f.debug_tuple("Instance").field(&plugin.name()).finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_user_plugins_have_no_internal_id() {
        assert!(Named("custom").internal_id(Token).is_none());
    }

    #[test]
    fn test_factory_invoked_once_on_resolution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let definition = PluginDefinition::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Named("lazy")
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let plugin = definition.into_plugin();
        assert_eq!(plugin.name(), "lazy");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
