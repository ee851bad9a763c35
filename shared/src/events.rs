//! Synchronous callback registry.
//!
//! Publishers hold a [`Listeners`] and call [`Listeners::notify`]; every
//! subscribed callback runs on the notifying thread before `notify` returns.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Things a running session tells its observers about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Time to redraw. `since_tick` is how long ago the last physics step ran.
    DisplayFrame { since_tick: Duration },
    /// A fresh snapshot replaced the local world.
    SnapshotInstalled,
    /// The set of connected clients changed.
    ConnectionsChanged { connected: usize },
    /// The round ended and a new one began.
    Restarted,
    Aborted,
}

/// Returned by [`Listeners::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<E>)>,
}

pub struct Listeners<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            }),
        }
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry<E>> {
        // A panicking callback never runs under this lock, so the data is intact.
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, Arc::new(callback)));
        ListenerHandle(id)
    }

    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut registry = self.registry();
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(id, _)| *id != handle.0);
        registry.callbacks.len() != before
    }

    /// Invokes every callback with `event`, in subscription order.
    ///
    /// Callbacks may subscribe or unsubscribe; changes apply from the next
    /// notification.
    pub fn notify(&self, event: &E) {
        let callbacks: Vec<Callback<E>> = self
            .registry()
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.registry().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_reaches_every_subscriber() {
        let listeners = Listeners::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            listeners.subscribe(move |event: &SessionEvent| {
                if *event == SessionEvent::SnapshotInstalled {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        listeners.notify(&SessionEvent::SnapshotInstalled);
        listeners.notify(&SessionEvent::Aborted);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_unsubscribe() {
        let listeners = Listeners::<SessionEvent>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = {
            let hits = Arc::clone(&hits);
            listeners.subscribe(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(listeners.unsubscribe(handle));
        assert!(!listeners.unsubscribe(handle));
        listeners.notify(&SessionEvent::Restarted);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_callback_may_subscribe_during_notify() {
        let listeners = Arc::new(Listeners::<SessionEvent>::new());
        let inner = Arc::clone(&listeners);
        listeners.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        listeners.notify(&SessionEvent::Restarted);
        assert_eq!(listeners.len(), 2);
    }
}
