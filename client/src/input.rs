//! Client input management with change detection

use shared::{ControlEvent, Controls};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Collects the four control keys of the local ship and wakes whoever pushes
/// them on
///
/// Clones share the same state. Only a change of a key wakes the consumer;
/// a repeated press of a key already held is not an edge and is dropped.
#[derive(Debug, Clone, Default)]
pub struct InputManager {
    controls: Arc<Mutex<Controls>>,
    moved: Arc<Notify>,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Controls> {
        self.controls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Applies one key edge. Returns true and wakes the consumer if the
    /// controls changed.
    pub fn apply(&self, event: ControlEvent) -> bool {
        let changed = self.lock().apply(event);
        if changed {
            self.moved.notify_one();
        }
        changed
    }

    /// Parses and applies a console command such as `+fire`
    ///
    /// Returns `None` when the line is not a control command.
    pub fn apply_command(&self, command: &str) -> Option<bool> {
        ControlEvent::parse(command).map(|event| self.apply(event))
    }

    /// Returns the current key state
    pub fn controls(&self) -> Controls {
        *self.lock()
    }

    /// Waits for the next change
    ///
    /// A change that happened while nobody was waiting is remembered, so an
    /// edge is never lost between two waits. Several changes in between
    /// collapse into one wakeup.
    pub async fn moved(&self) {
        self.moved.notified().await;
    }

    /// Wakes the consumer without a key change, for when the receiving end
    /// lost track of the held keys
    pub fn resend(&self) {
        self.moved.notify_one();
    }

    /// Releases every key, waking the consumer if any was held
    pub fn release_all(&self) -> bool {
        let mut controls = self.lock();
        let changed = *controls != Controls::default();
        *controls = Controls::default();
        drop(controls);
        if changed {
            self.moved.notify_one();
        }
        changed
    }
}
