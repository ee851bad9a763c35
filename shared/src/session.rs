//! Lifecycle of one game session and cooperative cancellation.
//!
//! A session moves `Waiting` → `Running` → `Ended`, and may be `Aborted` from
//! any non-terminal phase. Tasks poll the phase at loop boundaries or await a
//! change through [`Session::subscribe`].

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting connections; the simulation has not started.
    Waiting,
    Running,
    Ended,
    /// Stopped by an unrecoverable local error.
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ended | Phase::Aborted)
    }
}

/// Shared handle to a session's phase. Clones observe the same session.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Arc<watch::Sender<Phase>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Phase::Waiting);
        Self {
            phase: Arc::new(sender),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Moves a waiting session to running. Returns false in any other phase.
    pub fn start(&self) -> bool {
        self.transition(|phase| phase == Phase::Waiting, Phase::Running)
    }

    /// Ends a session that has not already finished.
    pub fn end(&self) -> bool {
        self.transition(|phase| !phase.is_terminal(), Phase::Ended)
    }

    /// Aborts a session that has not already finished.
    pub fn abort(&self) -> bool {
        self.transition(|phase| !phase.is_terminal(), Phase::Aborted)
    }

    fn transition(&self, allowed: impl Fn(Phase) -> bool, next: Phase) -> bool {
        self.phase.send_if_modified(|phase| {
            if allowed(*phase) {
                *phase = next;
                true
            } else {
                false
            }
        })
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn is_aborted(&self) -> bool {
        self.phase() == Phase::Aborted
    }

    pub fn is_over(&self) -> bool {
        self.phase().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Resolves once the session has left `Waiting`, returning the new phase.
    pub async fn started(&self) -> Phase {
        let mut receiver = self.subscribe();
        let phase = match receiver.wait_for(|phase| *phase != Phase::Waiting).await {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };
        phase
    }

    /// Resolves once the session is ended or aborted.
    pub async fn finished(&self) -> Phase {
        let mut receiver = self.subscribe();
        let phase = match receiver.wait_for(|phase| phase.is_terminal()).await {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        };
        phase
    }
}
