//! Shutdown coordination
//!
//! `stop()` drains, runs disposal in two waves, and records the outcome.
//! Concurrent callers share one outcome through the stop signal.

use crate::completion::{self, CompletionSignal, Resolver};
use crate::lifecycle::Lifecycle;
use crate::phase::{Callback, Outcome, Phase};
use futures::future::join_all;
use meridian_core::{Error, Result};
use std::sync::Arc;

enum StopAction {
    Run {
        resolver: Resolver<Outcome>,
        drain_callback: Option<Callback>,
        dispose_callbacks: Vec<Callback>,
        dispose_last_callbacks: Vec<Callback>,
    },
    Wait(CompletionSignal<Outcome>),
    Done(Result<()>),
}

impl Lifecycle {
    /// The claiming caller drives shutdown on its own task, so dropping its
    /// future leaves the sequence running and waiters still get the outcome
    pub(crate) async fn stop(self: &Arc<Self>) -> Result<()> {
        match self.claim_stop()? {
            StopAction::Done(outcome) => outcome,
            StopAction::Wait(signal) => signal.wait().await.unwrap_or_else(|| {
                Err(Error::Internal(
                    "shutdown ended without reporting an outcome".to_string(),
                ))
            }),
            StopAction::Run {
                resolver,
                drain_callback,
                dispose_callbacks,
                dispose_last_callbacks,
            } => {
                let lifecycle = self.clone();
                tokio::spawn(async move {
                    let outcome = lifecycle
                        .run_stop(drain_callback, dispose_callbacks, dispose_last_callbacks)
                        .await;
                    resolver.resolve(outcome.clone());
                    outcome
                })
                .await
                .unwrap_or_else(|e| Err(Error::Internal(format!("shutdown task failed: {e}"))))
            }
        }
    }

    fn claim_stop(&self) -> Result<StopAction> {
        let mut phase = self.phase.lock();
        match std::mem::replace(&mut *phase, Phase::vacant()) {
            Phase::Started {
                schema_provider,
                drain_callback,
                landing_page,
                dispose_callbacks,
                dispose_last_callbacks,
            } => {
                let (resolver, stop_signal) = completion::channel();
                *phase = Phase::Draining {
                    schema_provider,
                    stop_signal,
                    landing_page,
                };
                tracing::info!("Server draining");
                Ok(StopAction::Run {
                    resolver,
                    drain_callback,
                    dispose_callbacks,
                    dispose_last_callbacks,
                })
            }
            Phase::Draining {
                schema_provider,
                stop_signal,
                landing_page,
            } => {
                let signal = stop_signal.clone();
                *phase = Phase::Draining {
                    schema_provider,
                    stop_signal,
                    landing_page,
                };
                Ok(StopAction::Wait(signal))
            }
            Phase::Stopping { stop_signal } => {
                let signal = stop_signal.clone();
                *phase = Phase::Stopping { stop_signal };
                Ok(StopAction::Wait(signal))
            }
            Phase::Stopped { stop_error } => {
                let outcome = stop_error.clone().map_or(Ok(()), Err);
                *phase = Phase::Stopped { stop_error };
                Ok(StopAction::Done(outcome))
            }
            other => {
                let kind = other.kind();
                *phase = other;
                Err(Error::lifecycle(format!(
                    "called stop() with surprising state {kind}"
                )))
            }
        }
    }

    async fn run_stop(
        &self,
        drain_callback: Option<Callback>,
        dispose_callbacks: Vec<Callback>,
        dispose_last_callbacks: Vec<Callback>,
    ) -> Result<()> {
        let drain_error = match drain_callback {
            Some(drain) => drain().await.err(),
            None => None,
        };

        {
            let mut phase = self.phase.lock();
            match std::mem::replace(&mut *phase, Phase::vacant()) {
                Phase::Draining { stop_signal, .. } => {
                    *phase = Phase::Stopping { stop_signal };
                }
                other => {
                    let kind = other.kind();
                    *phase = other;
                    return Err(Error::lifecycle(format!(
                        "expected draining phase after drain, found {kind}"
                    )));
                }
            }
        }
        tracing::info!("Server stopping");

        let errors = run_disposal_waves(dispose_callbacks, dispose_last_callbacks).await;
        let stop_error = drain_error.into_iter().chain(errors).next();

        if let Some(error) = &stop_error {
            tracing::error!(error = %error, "Server stopped with an error");
        } else {
            tracing::info!("Server stopped");
        }
        *self.phase.lock() = Phase::Stopped {
            stop_error: stop_error.clone(),
        };

        stop_error.map_or(Ok(()), Err)
    }
}

/// Run `first` concurrently, wait for every callback to settle, then run
/// `last` the same way. Returns the failures in callback order.
pub(crate) async fn run_disposal_waves(first: Vec<Callback>, last: Vec<Callback>) -> Vec<Error> {
    let mut errors = Vec::new();
    for wave in [first, last] {
        let results = join_all(wave.into_iter().map(|callback| callback())).await;
        errors.extend(results.into_iter().filter_map(Result::err));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use meridian_plugins::testing::HookProbe;
    use std::time::Duration;

    fn recording(probe: &HookProbe, event: &'static str, delay_ms: u64, fail: bool) -> Callback {
        let probe = probe.clone();
        Box::new(move || {
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                probe.record(event);
                if fail {
                    Err(Error::Internal(event.to_string()))
                } else {
                    Ok(())
                }
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_wave_waits_for_slow_first_wave() {
        let probe = HookProbe::new();
        let errors = run_disposal_waves(
            vec![
                recording(&probe, "slow", 50, false),
                recording(&probe, "fast", 1, false),
            ],
            vec![recording(&probe, "last", 0, false)],
        )
        .await;

        assert!(errors.is_empty());
        assert_eq!(probe.events(), vec!["fast", "slow", "last"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_wave_runs_after_failures() {
        let probe = HookProbe::new();
        let errors = run_disposal_waves(
            vec![
                recording(&probe, "no way 1", 20, true),
                recording(&probe, "no way 2", 1, true),
            ],
            vec![recording(&probe, "last", 0, false)],
        )
        .await;

        assert_eq!(probe.position("last"), Some(2));
        assert_eq!(
            errors,
            vec![
                Error::Internal("no way 1".to_string()),
                Error::Internal("no way 2".to_string()),
            ]
        );
    }
}
