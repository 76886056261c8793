//! Explicit observer registration with a clear lifecycle.
//!
//! Observers register against a registry owned by a context object (the
//! conversation view) and unregister on teardown. Nothing here is a
//! module-global singleton.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Handle returned by [`ObserverRegistry::register`]; pass it back to
/// [`ObserverRegistry::unregister`] on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Registry of event observers.
pub struct ObserverRegistry<E> {
    observers: Mutex<HashMap<u64, Callback<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut observers = match self.observers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        observers.insert(id, Arc::new(callback));
        ObserverId(id)
    }

    pub fn unregister(&self, id: ObserverId) {
        let mut observers = match self.observers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        observers.remove(&id.0);
    }

    /// Invoke every registered observer with `event`.
    ///
    /// Callbacks run on a snapshot taken outside the lock, so an observer
    /// may register, unregister, or emit on the same registry without
    /// deadlocking. Observers added during an emit see only later events.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = {
            let observers = match self.observers.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            observers.values().cloned().collect()
        };
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        match self.observers.lock() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn register_emit_unregister() {
        let registry: ObserverRegistry<u32> = ObserverRegistry::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let observed = seen.clone();
        let id = registry.register(move |value| {
            observed.fetch_add(*value as usize, Ordering::SeqCst);
        });
        assert_eq!(registry.observer_count(), 1);

        registry.emit(&3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        registry.unregister(id);
        registry.emit(&5);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn observer_may_touch_the_registry_during_emit() {
        let registry: Arc<ObserverRegistry<u32>> = Arc::new(ObserverRegistry::new());
        let late_events = Arc::new(AtomicUsize::new(0));

        let inner_registry = registry.clone();
        let observed = late_events.clone();
        registry.register(move |_| {
            // Re-entrant registration must not deadlock. The new observer
            // only sees events emitted after this one.
            let counted = observed.clone();
            inner_registry.register(move |value| {
                counted.fetch_add(*value as usize, Ordering::SeqCst);
            });
        });

        registry.emit(&1);
        assert_eq!(registry.observer_count(), 2);
        assert_eq!(late_events.load(Ordering::SeqCst), 0);

        registry.emit(&7);
        assert_eq!(late_events.load(Ordering::SeqCst), 7);
        assert_eq!(registry.observer_count(), 3);
    }
}
