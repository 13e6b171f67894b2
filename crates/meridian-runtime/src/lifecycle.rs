//! Server lifecycle state machine
//!
//! The phase lives behind a mutex that is never held across an `.await`.
//! Every transition happens in one synchronous critical section, and every
//! suspension is followed by a fresh look at the phase.

use crate::completion::{self, Resolver};
use crate::phase::{Callback, Outcome, Phase, ServerPhaseKind};
use crate::schema_manager::SchemaProvider;
use crate::shutdown::run_disposal_waves;
use crate::signal::{self, SignalRegistration};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use meridian_config::Config;
use meridian_core::{Error, Executor, LandingPage, Result};
use meridian_plugins::{PluginRegistration, ServerListener, ServerStartContext};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

pub(crate) struct Lifecycle {
    pub(crate) phase: Mutex<Phase>,
    pub(crate) plugins: Vec<PluginRegistration>,
    pub(crate) config: Config,
    pub(crate) executor_override: RwLock<Option<Arc<dyn Executor>>>,
    signal_registration: Mutex<Option<Arc<SignalRegistration>>>,
}

#[derive(Default)]
struct StartedParts {
    drain_callback: Option<Callback>,
    landing_page: Option<LandingPage>,
    dispose_callbacks: Vec<Callback>,
    dispose_last_callbacks: Vec<Callback>,
}

impl Lifecycle {
    pub(crate) fn new(
        schema_provider: Arc<dyn SchemaProvider>,
        plugins: Vec<PluginRegistration>,
        config: Config,
    ) -> Self {
        Self {
            phase: Mutex::new(Phase::Initialized { schema_provider }),
            plugins,
            config,
            executor_override: RwLock::new(None),
            signal_registration: Mutex::new(None),
        }
    }

    pub(crate) fn kind(&self) -> ServerPhaseKind {
        self.phase.lock().kind()
    }

    pub(crate) fn landing_page(&self) -> Option<LandingPage> {
        match &*self.phase.lock() {
            Phase::Started { landing_page, .. } | Phase::Draining { landing_page, .. } => {
                landing_page.clone()
            }
            _ => None,
        }
    }

    pub(crate) fn signal_registration(&self) -> Option<Arc<SignalRegistration>> {
        self.signal_registration.lock().clone()
    }

    /// Startup runs on its own task, so dropping the caller's future does not
    /// abandon it halfway
    pub(crate) async fn start(self: &Arc<Self>) -> Result<()> {
        let (resolver, schema_provider) = self.begin_start()?;
        let lifecycle = self.clone();
        tokio::spawn(async move { lifecycle.finish_start(resolver, schema_provider).await })
            .await
            .unwrap_or_else(|e| Err(Error::Internal(format!("startup task failed: {e}"))))
    }

    /// `Initialized -> Starting`
    pub(crate) fn begin_start(&self) -> Result<(Resolver<Outcome>, Arc<dyn SchemaProvider>)> {
        let mut phase = self.phase.lock();
        let schema_provider = match &*phase {
            Phase::Initialized { schema_provider } => schema_provider.clone(),
            other => {
                return Err(Error::lifecycle(format!(
                    "called start() with surprising state {}",
                    other.kind()
                )))
            }
        };

        let (resolver, startup_signal) = completion::channel();
        *phase = Phase::Starting {
            schema_provider: schema_provider.clone(),
            startup_signal,
        };
        tracing::debug!(phase = ?ServerPhaseKind::Starting, "Server starting");

        Ok((resolver, schema_provider))
    }

    /// `Starting -> Started | FailedToStart`, resolving the startup signal
    pub(crate) async fn finish_start(
        self: &Arc<Self>,
        resolver: Resolver<Outcome>,
        schema_provider: Arc<dyn SchemaProvider>,
    ) -> Result<()> {
        let mut parts = StartedParts::default();
        let outcome = match self.run_startup(&schema_provider, &mut parts).await {
            Ok(()) => self.enter_started(parts),
            Err(error) => {
                dispose_after_failed_start(parts).await;
                Err(error)
            }
        };

        if let Err(error) = &outcome {
            tracing::error!(error = %error, "Server failed to start");
            *self.phase.lock() = Phase::FailedToStart {
                error: error.clone(),
            };
        }

        resolver.resolve(outcome.clone());
        outcome
    }

    fn enter_started(&self, parts: StartedParts) -> Result<()> {
        let mut phase = self.phase.lock();
        let schema_provider = match std::mem::replace(&mut *phase, Phase::vacant()) {
            Phase::Starting {
                schema_provider, ..
            } => schema_provider,
            other => {
                let kind = other.kind();
                *phase = other;
                return Err(Error::lifecycle(format!(
                    "expected starting phase at the end of start(), found {kind}"
                )));
            }
        };

        *phase = Phase::Started {
            schema_provider,
            drain_callback: parts.drain_callback,
            landing_page: parts.landing_page,
            dispose_callbacks: parts.dispose_callbacks,
            dispose_last_callbacks: parts.dispose_last_callbacks,
        };
        tracing::info!(plugins = self.plugins.len(), "Server started");

        Ok(())
    }

    /// Cleanup collected in `parts` is kept even when startup fails
    async fn run_startup(
        self: &Arc<Self>,
        schema_provider: &Arc<dyn SchemaProvider>,
        parts: &mut StartedParts,
    ) -> Result<()> {
        if let Some(executor) = schema_provider.start().await? {
            *self.executor_override.write() = Some(executor);
        }

        let provider = schema_provider.clone();
        parts
            .dispose_callbacks
            .push(Box::new(move || async move { provider.stop().await }.boxed()));

        let derived = schema_provider.schema_derived_data()?;
        let ctx = ServerStartContext {
            schema: derived.schema.clone(),
            schema_hash: derived.schema_hash.clone(),
            environment: self.config.server.environment,
        };

        let results = join_all(self.plugins.iter().map(|registration| {
            let ctx = &ctx;
            async move {
                registration
                    .plugin
                    .server_will_start(ctx)
                    .await
                    .map(|listener| listener.map(|l| (registration, l)))
                    .map_err(|e| e.into_error(registration.name()))
            }
        }))
        .await;

        let mut listeners: Vec<(&PluginRegistration, ServerListener)> = Vec::new();
        let mut failure = None;
        for result in results {
            match result {
                Ok(Some(listener)) => listeners.push(listener),
                Ok(None) => {}
                Err(error) => {
                    failure.get_or_insert(error);
                }
            }
        }

        // plugins that did start still get their stop hook if startup fails
        let stop_hooks = named_hooks(&listeners, ServerListener::server_will_stop);
        if !stop_hooks.is_empty() {
            parts
                .dispose_callbacks
                .push(Box::new(move || run_hooks(stop_hooks)));
        }

        if let Some(error) = failure {
            return Err(error);
        }

        for (registration, listener) in &listeners {
            if let Some(hook) = listener.schema_did_load_or_update() {
                if let Err(e) = schema_provider.on_schema_change(hook.clone()) {
                    tracing::error!(
                        plugin = %registration.name(),
                        "Plugin observes schema updates the schema provider cannot deliver"
                    );
                    return Err(e);
                }
            }
        }

        let drain_hooks = named_hooks(&listeners, ServerListener::drain_server);
        if !drain_hooks.is_empty() {
            parts.drain_callback = Some(Box::new(move || run_hooks(drain_hooks)));
        }

        parts.landing_page = render_landing_page(&listeners).await?;

        if self.config.server.handle_signals_enabled() {
            let registration = signal::install(Arc::downgrade(self))?;
            parts.dispose_last_callbacks.push(registration.teardown());
            *self.signal_registration.lock() = Some(registration);
        }

        Ok(())
    }
}

async fn dispose_after_failed_start(parts: StartedParts) {
    for error in run_disposal_waves(parts.dispose_callbacks, parts.dispose_last_callbacks).await {
        tracing::warn!(error = %error, "Cleanup after failed startup reported an error");
    }
}

type NamedHook = (String, meridian_plugins::ServerHook);

fn named_hooks(
    listeners: &[(&PluginRegistration, ServerListener)],
    hook: fn(&ServerListener) -> Option<&meridian_plugins::ServerHook>,
) -> Vec<NamedHook> {
    listeners
        .iter()
        .filter_map(|(registration, listener)| {
            hook(listener).map(|h| (registration.name().to_string(), h.clone()))
        })
        .collect()
}

/// Run hooks concurrently, wait for all, and report the first failure in
/// registration order
fn run_hooks(hooks: Vec<NamedHook>) -> BoxFuture<'static, Result<()>> {
    async move {
        let results = join_all(hooks.iter().map(|(_, hook)| hook())).await;
        hooks
            .iter()
            .zip(results)
            .map(|((name, _), result)| result.map_err(|e| e.into_error(name)))
            .find(|result| result.is_err())
            .unwrap_or(Ok(()))
    }
    .boxed()
}

async fn render_landing_page(
    listeners: &[(&PluginRegistration, ServerListener)],
) -> Result<Option<LandingPage>> {
    let mut renderers: Vec<_> = listeners
        .iter()
        .filter_map(|(registration, listener)| {
            listener
                .render_landing_page()
                .map(|render| (*registration, render.clone()))
        })
        .collect();

    if renderers.len() > 1 {
        renderers.retain(|(registration, _)| !registration.implicitly_installed);
    }

    match renderers.as_slice() {
        [] => Ok(None),
        [(registration, render)] => render()
            .await
            .map(Some)
            .map_err(|e| e.into_error(registration.name())),
        many => Err(Error::MultipleLandingPages(
            many.iter()
                .map(|(registration, _)| registration.name().to_string())
                .collect(),
        )),
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("phase", &*self.phase.lock())
            .field("plugins", &self.plugins)
            .field("signals", &self.signal_registration())
            .finish()
    }
}
