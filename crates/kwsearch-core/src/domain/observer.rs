//! Listener hub used for every change notification in the workspace.
//!
//! # Dispatch discipline
//!
//! [`Listeners::notify`] copies the current subscriber list while holding the
//! lock, releases the lock, and only then calls each listener.  A listener may
//! therefore subscribe, unsubscribe, or call back into the object that is
//! notifying without deadlocking or disturbing the dispatch in progress.
//! Subscriptions added or removed during a dispatch take effect from the next
//! notification.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;
use uuid::Uuid;

/// Callback invoked with every notification.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`Listeners::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered set of listeners for events of type `E`.
pub struct Listeners<E> {
    entries: Mutex<Vec<(SubscriptionId, Listener<E>)>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Registers `listener` and returns its subscription handle.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Removes the listener registered under `id`.
    ///
    /// Returns `false` if no such subscription exists.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Delivers `event` to a snapshot of the current listeners, in
    /// subscription order.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(listeners = snapshot.len(), "dispatching notification");
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener<E>)>> {
        // A panicking listener runs outside the lock, so poisoning can only
        // come from a panic inside this module; the Vec is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notify_reaches_every_subscriber_in_order() {
        // Arrange
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            listeners.subscribe(move |value: &u32| seen.lock().unwrap().push((tag, *value)));
        }

        // Act
        listeners.notify(&7);

        // Assert
        assert_eq!(*seen.lock().unwrap(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let listeners: Listeners<()> = Listeners::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(listeners.unsubscribe(id));
        listeners.notify(&());

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!listeners.unsubscribe(id), "second unsubscribe must report absence");
    }

    #[test]
    fn test_listener_may_unsubscribe_itself_during_dispatch() {
        // Arrange: a listener that removes itself the first time it runs.
        let listeners: Arc<Listeners<()>> = Arc::new(Listeners::new());
        let count = Arc::new(AtomicUsize::new(0));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let hub = Arc::clone(&listeners);
        let counter = Arc::clone(&count);
        let slot = Arc::clone(&own_id);
        let id = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock().unwrap() {
                hub.unsubscribe(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        // Act
        listeners.notify(&());
        listeners.notify(&());

        // Assert
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_listener_added_during_dispatch_runs_from_next_notification() {
        let listeners: Arc<Listeners<()>> = Arc::new(Listeners::new());
        let late_calls = Arc::new(AtomicUsize::new(0));

        let hub = Arc::clone(&listeners);
        let late = Arc::clone(&late_calls);
        listeners.subscribe(move |_| {
            let late = Arc::clone(&late);
            hub.subscribe(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        listeners.notify(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        listeners.notify(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }
}
