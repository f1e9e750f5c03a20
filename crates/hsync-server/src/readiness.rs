//! Broadcast-once readiness signal.
//!
//! States: `Starting` (collecting waiters), `Ready`, `Failed`. The only
//! transitions are `Starting -> Ready` and `Starting -> Failed`. On a
//! transition every pending waiter is resumed exactly once; later waiters
//! resolve immediately from the final state.

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug)]
struct BindFailed {
    addr: SocketAddr,
    reason: String,
}

impl From<BindFailed> for ServerError {
    fn from(f: BindFailed) -> Self {
        ServerError::BindFailure {
            addr: f.addr,
            reason: f.reason,
        }
    }
}

type Outcome = Result<(), BindFailed>;

enum State {
    Starting { waiters: Vec<oneshot::Sender<Outcome>> },
    Ready,
    Failed(BindFailed),
}

pub struct Readiness {
    state: Mutex<State>,
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Starting {
                waiters: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Transitions never panic while holding the lock.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.lock(), State::Ready)
    }

    /// The bind failure, once the signal has settled on `Failed`.
    pub fn failure(&self) -> Option<ServerError> {
        match &*self.lock() {
            State::Failed(f) => Some(f.clone().into()),
            _ => None,
        }
    }

    /// Number of callers currently suspended in [`Readiness::wait`].
    pub fn pending_waiters(&self) -> usize {
        match &*self.lock() {
            State::Starting { waiters } => waiters.iter().filter(|w| !w.is_closed()).count(),
            _ => 0,
        }
    }

    /// Resolve once the listener is bound, or fail if binding failed.
    pub async fn wait(&self) -> ServerResult<()> {
        let rx = {
            let mut state = self.lock();
            match &mut *state {
                State::Ready => return Ok(()),
                State::Failed(f) => return Err(f.clone().into()),
                State::Starting { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
            }
        };

        match rx.await {
            Ok(outcome) => outcome.map_err(Into::into),
            Err(_) => Err(ServerError::Internal("readiness signal dropped".into())),
        }
    }

    /// `Starting -> Ready`. Returns the number of waiters resumed, or `None`
    /// if the signal had already left `Starting`.
    pub fn mark_ready(&self) -> Option<usize> {
        self.settle(Ok(()))
    }

    /// `Starting -> Failed`. Pending and future waiters get
    /// [`ServerError::BindFailure`]. Ignored once ready.
    pub fn mark_failed(&self, addr: SocketAddr, reason: impl Into<String>) -> Option<usize> {
        self.settle(Err(BindFailed {
            addr,
            reason: reason.into(),
        }))
    }

    fn settle(&self, outcome: Outcome) -> Option<usize> {
        let waiters = {
            let mut state = self.lock();
            let State::Starting { waiters } = &mut *state else {
                return None;
            };
            let waiters = std::mem::take(waiters);
            *state = match &outcome {
                Ok(()) => State::Ready,
                Err(f) => State::Failed(f.clone()),
            };
            waiters
        };

        let count = waiters.len();
        for waiter in waiters {
            // A waiter that gave up has dropped its receiver; nothing to resume.
            let _ = waiter.send(outcome.clone());
        }
        debug!(count, ready = outcome.is_ok(), "readiness settled");
        Some(count)
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.lock() {
            State::Starting { .. } => "starting",
            State::Ready => "ready",
            State::Failed(_) => "failed",
        };
        f.debug_struct("Readiness").field("state", &state).finish()
    }
}
