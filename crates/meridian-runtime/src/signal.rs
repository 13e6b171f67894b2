//! Termination signal handling
//!
//! When enabled, SIGINT and SIGTERM stop the server. Once the stop settles the
//! signal is delivered again under its default disposition, so the process
//! ends exactly as it would have without a handler. The registration is torn
//! down in the last disposal wave, after which the signals behave as if no
//! handler had ever been installed.

use crate::lifecycle::Lifecycle;
use crate::phase::Callback;
use futures::FutureExt;
use meridian_core::{Error, Result};
use std::fmt;
use std::sync::{Arc, Weak};

#[cfg(unix)]
use signal_hook::consts::signal::{SIGINT, SIGTERM};

#[cfg(not(unix))]
const SIGINT: i32 = 2;

/// Signals that trigger a graceful stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl TerminationSignal {
    /// POSIX signal number
    pub fn number(self) -> i32 {
        match self {
            TerminationSignal::Interrupt => 2,
            TerminationSignal::Terminate => 15,
        }
    }

    /// Conventional exit status of a process ended by this signal
    pub fn exit_code(self) -> i32 {
        128 + self.number()
    }

    /// Map a raw signal number
    pub fn from_number(signal: i32) -> Option<Self> {
        match signal {
            2 => Some(TerminationSignal::Interrupt),
            15 => Some(TerminationSignal::Terminate),
            _ => None,
        }
    }
}

/// Signal handlers registered by one server.
///
/// Until [`deregister`](Self::deregister) runs, deliveries are routed to the
/// listener and the default action is suppressed. Afterwards the listener is
/// closed and every delivery runs the default action.
pub(crate) struct SignalRegistration {
    #[cfg(unix)]
    handle: signal_hook_tokio::Handle,
    #[cfg(unix)]
    restore_default: Arc<std::sync::atomic::AtomicBool>,
    #[cfg(not(unix))]
    token: tokio_util::sync::CancellationToken,
}

#[cfg(unix)]
pub(crate) type SignalStream = signal_hook_tokio::Signals;

#[cfg(not(unix))]
pub(crate) type SignalStream = tokio_util::sync::CancellationToken;

#[cfg(unix)]
impl SignalRegistration {
    pub(crate) fn register(signals: &[i32]) -> Result<(Self, SignalStream)> {
        use signal_hook::flag;
        use std::sync::atomic::{AtomicBool, Ordering};

        let restore_default = Arc::new(AtomicBool::new(false));
        let installed = signals
            .iter()
            .try_for_each(|&signal| {
                flag::register_conditional_default(signal, restore_default.clone()).map(drop)
            })
            .and_then(|()| signal_hook_tokio::Signals::new(signals));

        match installed {
            Ok(stream) => Ok((
                Self {
                    handle: stream.handle(),
                    restore_default,
                },
                stream,
            )),
            Err(e) => {
                // partially installed handlers must not swallow deliveries
                restore_default.store(true, Ordering::SeqCst);
                Err(Error::Io(format!("failed to install signal handlers: {e}")))
            }
        }
    }

    /// Close the listener and hand the signals back to their default action
    pub(crate) fn deregister(&self) {
        self.handle.close();
        self.restore_default
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn is_deregistered(&self) -> bool {
        self.handle.is_closed()
            && self
                .restore_default
                .load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(not(unix))]
impl SignalRegistration {
    pub(crate) fn register(_signals: &[i32]) -> Result<(Self, SignalStream)> {
        let token = tokio_util::sync::CancellationToken::new();
        Ok((
            Self {
                token: token.clone(),
            },
            token,
        ))
    }

    pub(crate) fn deregister(&self) {
        self.token.cancel();
    }

    pub(crate) fn is_deregistered(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl SignalRegistration {
    /// Wave-2 disposal callback that deregisters
    pub(crate) fn teardown(self: &Arc<Self>) -> Callback {
        let registration = self.clone();
        Box::new(move || {
            async move {
                registration.deregister();
                tracing::debug!("Signal handlers deregistered");
                Ok(())
            }
            .boxed()
        })
    }
}

impl fmt::Debug for SignalRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRegistration")
            .field("deregistered", &self.is_deregistered())
            .finish()
    }
}

/// Register SIGINT and SIGTERM and stop `lifecycle` on the first delivery
pub(crate) fn install(lifecycle: Weak<Lifecycle>) -> Result<Arc<SignalRegistration>> {
    #[cfg(unix)]
    let signals = [SIGINT, SIGTERM];
    #[cfg(not(unix))]
    let signals = [SIGINT];

    let (registration, stream) = SignalRegistration::register(&signals)?;

    tokio::spawn(async move {
        if let Some((signal, outcome)) = listen(stream, lifecycle).await {
            redeliver(signal, outcome);
        }
    });

    Ok(Arc::new(registration))
}

/// Wait for the first signal and stop the server.
///
/// Deliveries that arrive while the stop runs are ignored. Returns `None` when
/// the registration is torn down before any signal arrives.
pub(crate) async fn listen(
    mut stream: SignalStream,
    lifecycle: Weak<Lifecycle>,
) -> Option<(i32, Result<()>)> {
    let signal = next_signal(&mut stream).await?;
    tracing::info!(
        signal,
        kind = ?TerminationSignal::from_number(signal),
        "Received termination signal, stopping server"
    );

    let outcome = match lifecycle.upgrade() {
        Some(lifecycle) => lifecycle.stop().await,
        None => Ok(()),
    };
    Some((signal, outcome))
}

#[cfg(unix)]
async fn next_signal(stream: &mut SignalStream) -> Option<i32> {
    use futures::StreamExt;
    stream.next().await
}

#[cfg(not(unix))]
async fn next_signal(stream: &mut SignalStream) -> Option<i32> {
    tokio::select! {
        _ = stream.cancelled() => None,
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => Some(SIGINT),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                None
            }
        },
    }
}

fn redeliver(signal: i32, outcome: Result<()>) {
    if let Err(error) = outcome {
        tracing::error!(error = %error, "Server failed to stop cleanly");
        std::process::exit(1);
    }

    tracing::info!(signal, "Server stopped, delivering signal");
    run_default_action(signal);

    // only reached when the default action did not end the process
    std::process::exit(128 + signal);
}

#[cfg(unix)]
fn run_default_action(signal: i32) {
    if let Err(e) = signal_hook::low_level::emulate_default_handler(signal) {
        tracing::error!(error = %e, signal, "Failed to deliver signal");
    }
}

#[cfg(not(unix))]
fn run_default_action(_signal: i32) {}
