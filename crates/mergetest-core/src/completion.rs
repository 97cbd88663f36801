//! One-shot run completion signal

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Why a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionCause {
    /// The receive side counted the configured number of packets
    TargetReached,
    /// The run deadline elapsed first
    TimedOut,
}

/// Guarded one-shot signal: pending until the first `fire`, fired forever
/// after.
///
/// Any number of lanes may call [`CompletionSignal::fire`] concurrently; the
/// pending→fired transition happens under the channel's lock, so exactly one
/// caller sees `true` and the cause it supplied is the one waiters observe.
#[derive(Debug)]
pub struct CompletionSignal {
    tx: watch::Sender<Option<CompletionCause>>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        CompletionSignal { tx }
    }

    /// Fire the signal. Returns `true` only for the call that performed the
    /// transition; later calls are no-ops.
    pub fn fire(&self, cause: CompletionCause) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(cause);
            true
        })
    }

    /// Current state without waiting
    #[inline]
    pub fn state(&self) -> Option<CompletionCause> {
        *self.tx.borrow()
    }

    #[inline]
    pub fn is_fired(&self) -> bool {
        self.state().is_some()
    }

    /// Wait until fired and return the winning cause. Returns immediately if
    /// the signal already fired.
    pub async fn wait(&self) -> CompletionCause {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(cause) = *rx.borrow_and_update() {
                return cause;
            }
            // The sender lives in `self`, so the channel stays open while we wait.
            let _ = rx.changed().await;
        }
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
