//! Operation gate
//!
//! Decides, per phase, whether an operation may run and against which
//! schema.

use crate::lifecycle::Lifecycle;
use crate::phase::Phase;
use meridian_core::{Error, Result, SchemaDerivedData};
use std::sync::Arc;

impl Lifecycle {
    /// Schema data for executing an operation in the current phase.
    ///
    /// Waits for an in-progress start. Startup failures are logged here and
    /// replaced by a redacted error for the caller.
    pub(crate) async fn schema_derived_data_for_operation(&self) -> Result<Arc<SchemaDerivedData>> {
        loop {
            let startup_signal = {
                let phase = self.phase.lock();
                match &*phase {
                    Phase::Initialized { .. } => return Err(Error::NotStarted),
                    Phase::Starting { startup_signal, .. } => startup_signal.clone(),
                    Phase::FailedToStart { error } => {
                        tracing::error!(
                            error = %error,
                            "An operation was received after the server failed to start"
                        );
                        return Err(Error::StartupFailed);
                    }
                    Phase::Started {
                        schema_provider, ..
                    }
                    | Phase::Draining {
                        schema_provider, ..
                    } => return schema_provider.schema_derived_data(),
                    Phase::Stopping { .. } => return Err(Error::Stopping),
                    Phase::Stopped { .. } => return Err(Error::Stopped),
                }
            };

            if startup_signal.wait().await.is_none() {
                return Err(Error::Internal(
                    "startup ended without reporting an outcome".to_string(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema_manager::SchemaManager;
    use crate::test_support::StubSchema;
    use meridian_config::Config;
    use parking_lot::Mutex;
    use std::fmt::{self, Write};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Clone, Default)]
    struct ErrorRecorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl<S: Subscriber> Layer<S> for ErrorRecorder {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != Level::ERROR {
                return;
            }
            let mut fields = FieldRecorder::default();
            event.record(&mut fields);
            self.events.lock().push(fields.0);
        }
    }

    #[derive(Default)]
    struct FieldRecorder(String);

    impl Visit for FieldRecorder {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }
    }

    fn lifecycle() -> Arc<Lifecycle> {
        let mut config = Config::default();
        config.server.handle_signals = Some(false);
        Arc::new(Lifecycle::new(
            Arc::new(SchemaManager::from_schema(Arc::new(StubSchema), None)),
            Vec::new(),
            config,
        ))
    }

    #[tokio::test]
    async fn test_rejects_before_start() {
        let lifecycle = lifecycle();
        let err = lifecycle.schema_derived_data_for_operation().await.unwrap_err();
        assert_eq!(err, Error::NotStarted);
    }

    #[tokio::test]
    async fn test_waits_for_start_in_progress() {
        let lifecycle = lifecycle();
        let (resolver, provider) = lifecycle.begin_start().unwrap();

        let waiting = tokio::spawn({
            let lifecycle = lifecycle.clone();
            async move { lifecycle.schema_derived_data_for_operation().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        lifecycle.finish_start(resolver, provider).await.unwrap();
        assert!(waiting.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_stopping_and_stopped_reject() {
        let lifecycle = lifecycle();
        let (_resolver, stop_signal) = crate::completion::channel();
        *lifecycle.phase.lock() = Phase::Stopping { stop_signal };
        assert_eq!(
            lifecycle.schema_derived_data_for_operation().await.unwrap_err(),
            Error::Stopping
        );

        *lifecycle.phase.lock() = Phase::Stopped { stop_error: None };
        assert_eq!(
            lifecycle.schema_derived_data_for_operation().await.unwrap_err(),
            Error::Stopped
        );
    }

    #[tokio::test]
    async fn test_failed_start_is_redacted() {
        let lifecycle = lifecycle();
        *lifecycle.phase.lock() = Phase::FailedToStart {
            error: Error::plugin("secrets", "password=hunter2"),
        };

        let err = lifecycle.schema_derived_data_for_operation().await.unwrap_err();
        assert_eq!(err, Error::StartupFailed);
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_startup_error_logged_once_per_attempt() {
        let recorder = ErrorRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let lifecycle = lifecycle();
        *lifecycle.phase.lock() = Phase::FailedToStart {
            error: Error::plugin("secrets", "password=hunter2"),
        };

        for _ in 0..3 {
            let err = lifecycle.schema_derived_data_for_operation().await.unwrap_err();
            assert_eq!(err, Error::StartupFailed);
        }

        let events = recorder.events.lock().clone();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|event| event.contains("password=hunter2")));
    }
}
