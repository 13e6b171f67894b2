//! One-shot broadcast completion signal
//!
//! A [`Resolver`] is consumed when it resolves, so a signal can be resolved at
//! most once. Any number of [`CompletionSignal`] clones can wait on it;
//! waiting after resolution returns immediately.

use tokio::sync::watch;

/// Create an unresolved signal and the handle that resolves it
pub fn channel<T: Clone>() -> (Resolver<T>, CompletionSignal<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, CompletionSignal { rx })
}

/// Write side of a completion signal
#[derive(Debug)]
pub struct Resolver<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Resolver<T> {
    /// Record the outcome and wake every waiter
    pub fn resolve(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

/// Read side of a completion signal
#[derive(Debug, Clone)]
pub struct CompletionSignal<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> CompletionSignal<T> {
    /// Wait for the outcome.
    ///
    /// Returns `None` if the resolver was dropped without resolving.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.rx.clone();
        let outcome = rx.wait_for(Option::is_some).await.ok()?;
        outcome.clone()
    }

    /// The outcome, if already resolved
    pub fn peek(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}
