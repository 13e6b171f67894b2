//! Server phase

use crate::completion::CompletionSignal;
use crate::schema_manager::SchemaProvider;
use futures::future::BoxFuture;
use meridian_core::{Error, LandingPage, Result};
use std::fmt;
use std::sync::Arc;

/// Deferred cleanup or drain step
pub(crate) type Callback = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Outcome broadcast by start and stop
pub(crate) type Outcome = Result<()>;

/// Observable server phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerPhaseKind {
    /// Constructed, not started
    Initialized,
    /// Start in progress
    Starting,
    /// Startup failed
    FailedToStart,
    /// Serving operations
    Started,
    /// Stop requested, transport draining
    Draining,
    /// Disposal hooks running
    Stopping,
    /// Terminal
    Stopped,
}

impl fmt::Display for ServerPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerPhaseKind::Initialized => "initialized",
            ServerPhaseKind::Starting => "starting",
            ServerPhaseKind::FailedToStart => "failed to start",
            ServerPhaseKind::Started => "started",
            ServerPhaseKind::Draining => "draining",
            ServerPhaseKind::Stopping => "stopping",
            ServerPhaseKind::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub(crate) enum Phase {
    Initialized {
        schema_provider: Arc<dyn SchemaProvider>,
    },
    Starting {
        schema_provider: Arc<dyn SchemaProvider>,
        startup_signal: CompletionSignal<Outcome>,
    },
    FailedToStart {
        error: Error,
    },
    Started {
        schema_provider: Arc<dyn SchemaProvider>,
        drain_callback: Option<Callback>,
        landing_page: Option<LandingPage>,
        dispose_callbacks: Vec<Callback>,
        dispose_last_callbacks: Vec<Callback>,
    },
    Draining {
        schema_provider: Arc<dyn SchemaProvider>,
        stop_signal: CompletionSignal<Outcome>,
        landing_page: Option<LandingPage>,
    },
    Stopping {
        stop_signal: CompletionSignal<Outcome>,
    },
    Stopped {
        stop_error: Option<Error>,
    },
}

impl Phase {
    pub(crate) fn kind(&self) -> ServerPhaseKind {
        match self {
            Phase::Initialized { .. } => ServerPhaseKind::Initialized,
            Phase::Starting { .. } => ServerPhaseKind::Starting,
            Phase::FailedToStart { .. } => ServerPhaseKind::FailedToStart,
            Phase::Started { .. } => ServerPhaseKind::Started,
            Phase::Draining { .. } => ServerPhaseKind::Draining,
            Phase::Stopping { .. } => ServerPhaseKind::Stopping,
            Phase::Stopped { .. } => ServerPhaseKind::Stopped,
        }
    }

    /// Placeholder left behind while a phase is moved out for a transition
    pub(crate) fn vacant() -> Self {
        Phase::Stopped { stop_error: None }
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::FailedToStart { error } => f
                .debug_struct("FailedToStart")
                .field("error", error)
                .finish(),
            Phase::Stopped { stop_error } => f
                .debug_struct("Stopped")
                .field("stop_error", stop_error)
                .finish(),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}
