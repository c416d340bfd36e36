//! One-shot completion signal shared between a test actor and the run loop.
//!
//! The signal starts [`Completion::Pending`] and makes at most one terminal
//! transition, to either [`Completion::Succeeded`] or [`Completion::Aborted`].
//! It is never reset. Every transition is check-then-set, so repeated calls
//! do not wake waiters again.

use std::sync::Arc;

use tokio::sync::watch;

/// State of a [`CompletionSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Pending,
    Succeeded,
    Aborted { reason: String },
}

impl Completion {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Cloneable handle to a shared one-shot completion flag.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Arc<watch::Sender<Completion>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Completion::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Mark the signal as succeeded.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn set(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = Completion::Succeeded;
            true
        })
    }

    /// Terminate the signal without success.
    ///
    /// Has no effect once the signal is terminal.
    pub fn abort(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.tx.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = Completion::Aborted { reason };
            true
        })
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(*self.tx.borrow(), Completion::Succeeded)
    }

    #[must_use]
    pub fn state(&self) -> Completion {
        self.tx.borrow().clone()
    }

    /// Subscribe to raw state changes.
    pub fn subscribe(&self) -> watch::Receiver<Completion> {
        self.tx.subscribe()
    }

    /// Wait until the signal reaches a terminal state.
    pub async fn wait(&self) -> Completion {
        let mut rx = self.tx.subscribe();
        // The borrowed guard must be released before `rx` goes out of scope.
        let result = rx.wait_for(Completion::is_terminal).await.map(|state| state.clone());
        let state = match result {
            Ok(state) => state,
            // The sender lives as long as `self`, so the channel cannot close here.
            Err(_) => std::future::pending().await,
        };
        state
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_pending() {
        let signal = CompletionSignal::new();
        assert!(!signal.is_set());
        assert_eq!(signal.state(), Completion::Pending);
    }

    #[test]
    fn set_transitions_once() {
        let signal = CompletionSignal::new();
        let mut rx = signal.subscribe();

        assert!(signal.set());
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!signal.set());
        assert!(!rx.has_changed().unwrap());
        assert!(signal.is_set());
    }

    #[test]
    fn first_terminal_transition_wins() {
        let signal = CompletionSignal::new();
        assert!(signal.abort("instrument not found"));
        assert!(!signal.set());
        assert_eq!(
            signal.state(),
            Completion::Aborted {
                reason: "instrument not found".into()
            }
        );

        let signal = CompletionSignal::new();
        assert!(signal.set());
        assert!(!signal.abort("late"));
        assert!(signal.is_set());
    }

    #[test]
    fn clones_share_state() {
        let signal = CompletionSignal::new();
        let writer = signal.clone();
        writer.set();
        assert!(signal.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_resolves_when_set() {
        let signal = CompletionSignal::new();
        let writer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            writer.set();
        });

        let state = tokio::time::timeout(Duration::from_secs(10), signal.wait())
            .await
            .expect("signal should resolve");
        assert_eq!(state, Completion::Succeeded);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_terminal() {
        let signal = CompletionSignal::new();
        signal.set();
        assert_eq!(signal.wait().await, Completion::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_from_spawned_task_reports_abort() {
        let signal = CompletionSignal::new();
        let waiter = tokio::spawn({
            let signal = signal.clone();
            async move { signal.wait().await }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        signal.abort("subscription rejected");

        let state = waiter.await.expect("waiter task");
        assert_eq!(
            state,
            Completion::Aborted {
                reason: "subscription rejected".into()
            }
        );
    }
}
