//! Schema providers
//!
//! A [`SchemaManager`] either wraps a fixed schema or drives a [`Gateway`]
//! that loads and hot-swaps schemas. Derived data is rebuilt wholesale on
//! every change.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use meridian_core::{
    Error, Executor, GraphQLSchema, Result, SchemaDerivedData, SchemaLoadOrUpdate,
};
use meridian_plugins::SchemaUpdateHook;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the active schema
#[async_trait]
pub trait SchemaProvider: Send + Sync + fmt::Debug {
    /// Load the schema. May return an executor that replaces the schema's own
    async fn start(&self) -> Result<Option<Arc<dyn Executor>>>;

    /// Release resources
    async fn stop(&self) -> Result<()>;

    /// Data derived from the current schema
    fn schema_derived_data(&self) -> Result<Arc<SchemaDerivedData>>;

    /// Register a schema change listener. The listener is called immediately
    /// with the current schema, then on every change.
    fn on_schema_change(&self, callback: SchemaUpdateHook) -> Result<()>;
}

/// What a gateway produces when it loads
#[derive(Debug, Clone)]
pub struct GatewayLoad {
    /// Initial schema
    pub schema: Arc<dyn GraphQLSchema>,

    /// Executor to use instead of the schema's own
    pub executor: Option<Arc<dyn Executor>>,
}

/// Called by a gateway with every new schema
pub type GatewaySchemaCallback = Arc<dyn Fn(Arc<dyn GraphQLSchema>) + Send + Sync>;

/// Cancels a gateway subscription
pub type GatewayUnsubscribe = Box<dyn FnOnce() + Send>;

/// A schema source that can change the schema at runtime
#[async_trait]
pub trait Gateway: Send + Sync + fmt::Debug {
    /// Load the initial schema
    async fn load(&self) -> Result<GatewayLoad>;

    /// Subscribe to schema updates.
    ///
    /// Returns `None` when the gateway cannot deliver updates.
    fn on_schema_load_or_update(&self, _callback: GatewaySchemaCallback) -> Option<GatewayUnsubscribe> {
        None
    }

    /// Stop the gateway
    async fn stop(&self) -> Result<()>;
}

struct SchemaState {
    cache_capacity: Option<u64>,
    derived: ArcSwapOption<SchemaDerivedData>,
    listeners: Mutex<Vec<SchemaUpdateHook>>,
}

impl SchemaState {
    fn install(&self, schema: Arc<dyn GraphQLSchema>) {
        let data = Arc::new(SchemaDerivedData::new(schema, self.cache_capacity));
        let update = SchemaLoadOrUpdate::from_schema(data.schema.as_ref());
        tracing::debug!(schema_hash = %data.schema_hash, "Schema loaded");
        self.derived.store(Some(data));

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&update);
        }
    }
}

enum Mode {
    Static,
    Gateway {
        gateway: Arc<dyn Gateway>,
        unsubscribe: Mutex<Option<GatewayUnsubscribe>>,
        supports_updates: AtomicBool,
    },
}

/// The schema provider used by the server
pub struct SchemaManager {
    mode: Mode,
    state: Arc<SchemaState>,
}

impl SchemaManager {
    /// Serve a fixed schema
    pub fn from_schema(schema: Arc<dyn GraphQLSchema>, cache_capacity: Option<u64>) -> Self {
        let state = Arc::new(SchemaState {
            cache_capacity,
            derived: ArcSwapOption::empty(),
            listeners: Mutex::new(Vec::new()),
        });
        state.install(schema);

        Self {
            mode: Mode::Static,
            state,
        }
    }

    /// Serve whatever `gateway` loads
    pub fn from_gateway(gateway: Arc<dyn Gateway>, cache_capacity: Option<u64>) -> Self {
        Self {
            mode: Mode::Gateway {
                gateway,
                unsubscribe: Mutex::new(None),
                supports_updates: AtomicBool::new(false),
            },
            state: Arc::new(SchemaState {
                cache_capacity,
                derived: ArcSwapOption::empty(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl fmt::Debug for SchemaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.mode {
            Mode::Static => "static",
            Mode::Gateway { .. } => "gateway",
        };
        f.debug_struct("SchemaManager")
            .field("mode", &mode)
            .field("schema", &self.state.derived.load_full())
            .finish()
    }
}

#[async_trait]
impl SchemaProvider for SchemaManager {
    async fn start(&self) -> Result<Option<Arc<dyn Executor>>> {
        let Mode::Gateway {
            gateway,
            unsubscribe,
            supports_updates,
        } = &self.mode
        else {
            return Ok(None);
        };

        let loaded = gateway.load().await?;
        self.state.install(loaded.schema);

        let state = self.state.clone();
        let subscription = gateway.on_schema_load_or_update(Arc::new(move |schema| {
            state.install(schema);
        }));
        supports_updates.store(subscription.is_some(), Ordering::SeqCst);
        *unsubscribe.lock() = subscription;

        Ok(loaded.executor)
    }

    async fn stop(&self) -> Result<()> {
        let Mode::Gateway {
            gateway,
            unsubscribe,
            ..
        } = &self.mode
        else {
            return Ok(());
        };

        let subscription = unsubscribe.lock().take();
        if let Some(cancel) = subscription {
            cancel();
        }
        gateway.stop().await
    }

    fn schema_derived_data(&self) -> Result<Arc<SchemaDerivedData>> {
        self.state
            .derived
            .load_full()
            .ok_or_else(|| Error::Schema("the schema has not been loaded yet".to_string()))
    }

    fn on_schema_change(&self, callback: SchemaUpdateHook) -> Result<()> {
        if let Mode::Gateway {
            supports_updates, ..
        } = &self.mode
        {
            if !supports_updates.load(Ordering::SeqCst) {
                return Err(Error::IncompatibleSchemaProvider(
                    "a plugin observes schema updates, but the configured gateway cannot deliver them"
                        .to_string(),
                ));
            }
        }

        if let Some(current) = self.state.derived.load_full() {
            callback(&SchemaLoadOrUpdate::from_schema(current.schema.as_ref()));
        }
        self.state.listeners.lock().push(callback);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{GraphQLRequest, GraphQLResponse};
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Sdl(&'static str);

    #[async_trait]
    impl Executor for Sdl {
        async fn execute(&self, _request: &GraphQLRequest) -> GraphQLResponse {
            GraphQLResponse::default()
        }
    }

    impl GraphQLSchema for Sdl {
        fn sdl(&self) -> String {
            self.0.to_string()
        }
    }

    #[derive(Default)]
    struct TestGateway {
        live: bool,
        callback: Mutex<Option<GatewaySchemaCallback>>,
        stopped: AtomicBool,
    }

    impl fmt::Debug for TestGateway {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("TestGateway").field("live", &self.live).finish()
        }
    }

    impl TestGateway {
        fn push(&self, sdl: &'static str) {
            let callback = self.callback.lock().clone();
            if let Some(callback) = callback {
                callback(Arc::new(Sdl(sdl)));
            }
        }
    }

    #[async_trait]
    impl Gateway for Arc<TestGateway> {
        async fn load(&self) -> Result<GatewayLoad> {
            Ok(GatewayLoad {
                schema: Arc::new(Sdl("type Query { v1: Int }")),
                executor: None,
            })
        }

        fn on_schema_load_or_update(&self, callback: GatewaySchemaCallback) -> Option<GatewayUnsubscribe> {
            if !self.live {
                return None;
            }
            *self.callback.lock() = Some(callback);
            let gateway = self.clone();
            Some(Box::new(move || {
                gateway.callback.lock().take();
            }))
        }

        async fn stop(&self) -> Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_hook(count: &Arc<AtomicUsize>) -> SchemaUpdateHook {
        let count = count.clone();
        Arc::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_static_schema() {
        let manager = SchemaManager::from_schema(Arc::new(Sdl("type Query { a: Int }")), Some(10));

        assert!(manager.start().await.unwrap().is_none());
        let data = manager.schema_derived_data().unwrap();
        assert_eq!(data.schema_hash, meridian_core::schema_hash("type Query { a: Int }"));
        assert!(data.document_cache.is_some());

        let calls = Arc::new(AtomicUsize::new(0));
        manager.on_schema_change(counting_hook(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gateway_updates_rebuild_derived_data() {
        let gateway = Arc::new(TestGateway {
            live: true,
            ..TestGateway::default()
        });
        let manager = SchemaManager::from_gateway(Arc::new(gateway.clone()), Some(10));
        assert!(manager.schema_derived_data().is_err());

        manager.start().await.unwrap();
        let first = manager.schema_derived_data().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        manager.on_schema_change(counting_hook(&calls)).unwrap();

        gateway.push("type Query { v2: Int }");
        let second = manager.schema_derived_data().unwrap();

        assert_ne!(first.schema_hash, second.schema_hash);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        manager.stop().await.unwrap();
        assert!(gateway.stopped.load(Ordering::SeqCst));
        assert!(gateway.callback.lock().is_none());
    }

    #[tokio::test]
    async fn test_gateway_without_updates_is_incompatible() {
        let gateway = Arc::new(TestGateway::default());
        let manager = SchemaManager::from_gateway(Arc::new(gateway), None);
        manager.start().await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let err = manager.on_schema_change(counting_hook(&calls)).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSchemaProvider(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
