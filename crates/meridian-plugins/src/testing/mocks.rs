//! Mock implementations for testing

use crate::context::{RequestContext, ResolvedOperation, ServerStartContext};
use crate::error::PluginError;
use crate::listener::{RequestListener, ServerListener};
use crate::plugin::Plugin;
use async_trait::async_trait;
use meridian_core::{HttpGraphQLResponse, LandingPage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Shared, ordered log of hook invocations
#[derive(Debug, Clone, Default)]
pub struct HookProbe {
    events: Arc<Mutex<Vec<String>>>,
}

impl HookProbe {
    /// Create an empty probe
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    /// All events, oldest first
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Number of times `event` was recorded
    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    /// Index of the first `event`
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e == event)
    }
}

/// Mock plugin for testing
///
/// Records `<name>:<hook>` in its [`HookProbe`] for every hook invoked.
#[derive(Debug, Clone)]
pub struct MockPlugin {
    name: String,
    probe: HookProbe,
    start_error: Option<PluginError>,
    start_delay: Option<Duration>,
    stop_error: Option<PluginError>,
    stop_delay: Option<Duration>,
    drain: bool,
    drain_gate: Option<Arc<Notify>>,
    landing_page: Option<LandingPage>,
    observe_schema: bool,
}

impl MockPlugin {
    /// Create a new mock plugin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: HookProbe::new(),
            start_error: None,
            start_delay: None,
            stop_error: None,
            stop_delay: None,
            drain: false,
            drain_gate: None,
            landing_page: None,
            observe_schema: false,
        }
    }

    /// Create a mock plugin with a random name
    pub fn unnamed() -> Self {
        Self::new(format!("mock-{}", uuid::Uuid::new_v4()))
    }

    /// Record into `probe`
    pub fn with_probe(mut self, probe: HookProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Fail `server_will_start` with `message`
    pub fn fail_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(PluginError::runtime(message.into()));
        self
    }

    /// Sleep for `delay` inside `server_will_start`
    pub fn start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    /// Fail the stop hook with `message`
    pub fn fail_stop(mut self, message: impl Into<String>) -> Self {
        self.stop_error = Some(PluginError::runtime(message.into()));
        self
    }

    /// Sleep for `delay` inside the stop hook
    pub fn stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = Some(delay);
        self
    }

    /// Register a drain hook
    pub fn with_drain(mut self) -> Self {
        self.drain = true;
        self
    }

    /// Register a drain hook that waits for `gate` to be notified
    pub fn block_drain_on(mut self, gate: Arc<Notify>) -> Self {
        self.drain = true;
        self.drain_gate = Some(gate);
        self
    }

    /// Render `page` as the landing page
    pub fn with_landing_page(mut self, page: LandingPage) -> Self {
        self.landing_page = Some(page);
        self
    }

    /// Register a schema update hook
    pub fn observe_schema_updates(mut self) -> Self {
        self.observe_schema = true;
        self
    }

    /// The probe this mock records into
    pub fn probe(&self) -> &HookProbe {
        &self.probe
    }

    /// Event name recorded for `hook`
    pub fn event(&self, hook: &str) -> String {
        format!("{}:{}", self.name, hook)
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn server_will_start(
        &self,
        _ctx: &ServerStartContext,
    ) -> Result<Option<ServerListener>, PluginError> {
        self.probe.record(self.event("server_will_start"));
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.start_error {
            return Err(err.clone());
        }

        let mut listener = ServerListener::new();

        let probe = self.probe.clone();
        let event = self.event("server_will_stop");
        let delay = self.stop_delay;
        let stop_error = self.stop_error.clone();
        listener = listener.on_stop(move || {
            let probe = probe.clone();
            let event = event.clone();
            let stop_error = stop_error.clone();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                probe.record(event);
                stop_error.map_or(Ok(()), Err)
            }
        });

        if self.drain {
            let probe = self.probe.clone();
            let event = self.event("drain_server");
            let gate = self.drain_gate.clone();
            listener = listener.on_drain(move || {
                let probe = probe.clone();
                let event = event.clone();
                let gate = gate.clone();
                async move {
                    probe.record(event);
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                    Ok(())
                }
            });
        }

        if let Some(page) = self.landing_page.clone() {
            let probe = self.probe.clone();
            let event = self.event("render_landing_page");
            listener = listener.with_landing_page(move || {
                probe.record(event.clone());
                let page = page.clone();
                async move { Ok(page) }
            });
        }

        if self.observe_schema {
            let probe = self.probe.clone();
            let event = self.event("schema_did_load_or_update");
            listener = listener.on_schema_update(move |_| probe.record(event.clone()));
        }

        Ok(Some(listener))
    }

    async fn request_did_start(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Option<Arc<dyn RequestListener>>, PluginError> {
        self.probe.record(self.event("request_did_start"));
        Ok(Some(Arc::new(MockRequestListener {
            name: self.name.clone(),
            probe: self.probe.clone(),
        })))
    }
}

#[derive(Debug)]
struct MockRequestListener {
    name: String,
    probe: HookProbe,
}

#[async_trait]
impl RequestListener for MockRequestListener {
    async fn did_resolve_operation(
        &self,
        _ctx: &RequestContext,
        _operation: &ResolvedOperation,
    ) -> Result<(), PluginError> {
        self.probe
            .record(format!("{}:did_resolve_operation", self.name));
        Ok(())
    }

    async fn will_send_response(
        &self,
        _ctx: &RequestContext,
        _operation: Option<&ResolvedOperation>,
        _response: &mut HttpGraphQLResponse,
    ) {
        self.probe.record(format!("{}:will_send_response", self.name));
    }
}
