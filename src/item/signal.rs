//! # One-shot lifecycle signals.
//!
//! A [`Signal`] fires at most once with a value, or closes without one.
//! Any number of observers can read or await it, before or after it settles.
//!
//! ```text
//! Waiting ──fire(v)──► Fired(v)
//!    │
//!    └──close()─────► Closed
//! ```
//!
//! Each [`StreamItem`](crate::StreamItem) carries one beginning and one ending
//! signal per matching renderer. They are what external code composes on to
//! react to render timing (loading indicators, gating transforms, etc.).

use tokio::sync::watch;

#[derive(Debug, Clone)]
enum SignalState<T> {
    Waiting,
    Fired(T),
    Closed,
}

/// Fire-once observable value.
#[derive(Debug)]
pub struct Signal<T> {
    tx: watch::Sender<SignalState<T>>,
}

impl<T: Clone + Send + Sync> Signal<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SignalState::Waiting);
        Self { tx }
    }

    /// Fires the signal. Returns `false` if it had already settled.
    pub(crate) fn fire(&self, value: T) -> bool {
        self.tx.send_if_modified(move |state| {
            if matches!(state, SignalState::Waiting) {
                *state = SignalState::Fired(value);
                true
            } else {
                false
            }
        })
    }

    /// Closes the signal without a value if it has not fired yet.
    pub(crate) fn close(&self) {
        self.tx.send_if_modified(|state| {
            if matches!(state, SignalState::Waiting) {
                *state = SignalState::Closed;
                true
            } else {
                false
            }
        });
    }

    /// Returns the fired value, if any.
    pub fn get(&self) -> Option<T> {
        match &*self.tx.borrow() {
            SignalState::Fired(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// True once the signal has fired or closed.
    pub fn is_settled(&self) -> bool {
        !matches!(&*self.tx.borrow(), SignalState::Waiting)
    }

    /// Waits until the signal settles.
    ///
    /// Returns `Some(value)` if it fired, `None` if it closed without a value.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.tx.subscribe();
        let settled = rx
            .wait_for(|state| !matches!(state, SignalState::Waiting))
            .await;
        match settled {
            Ok(state) => match &*state {
                SignalState::Fired(v) => Some(v.clone()),
                _ => None,
            },
            Err(_) => None,
        }
    }
}
