//! Ordered callback registry shared by the channel and tracking sessions.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::warn;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: BTreeMap<u64, Callback<T>>,
}

/// Subscribers notified in registration order.
///
/// A panicking subscriber is logged and skipped; the remaining subscribers
/// still see the value.
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Observers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    /// Registers a callback until the returned handle is dropped or unsubscribed
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.insert(id, Arc::new(callback));
            id
        };

        let registry: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    lock(&registry).entries.remove(&id);
                }
            })),
        }
    }

    pub fn notify(&self, value: &T) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe
        let callbacks: Vec<(u64, Callback<T>)> = lock(&self.registry)
            .entries
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();

        for (id, callback) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                warn!(subscriber = id, "subscriber panicked, continuing with the rest");
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by `subscribe`; dropping it detaches the callback
#[must_use = "dropping a subscription detaches the callback immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Observers<u32>) {
        (Arc::new(Mutex::new(Vec::new())), Observers::new())
    }

    #[test]
    fn test_notifies_in_registration_order() {
        let (seen, observers) = recorder();
        let subs: Vec<Subscription> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                let seen = seen.clone();
                observers.subscribe(move |v| seen.lock().unwrap().push(format!("{name}{v}")))
            })
            .collect();

        observers.notify(&1);
        assert_eq!(*seen.lock().unwrap(), ["a1", "b1", "c1"]);
        drop(subs);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let (seen, observers) = recorder();
        let first = {
            let seen = seen.clone();
            observers.subscribe(move |v| seen.lock().unwrap().push(format!("first{v}")))
        };
        let _boom = observers.subscribe(|_| panic!("listener bug"));
        let last = {
            let seen = seen.clone();
            observers.subscribe(move |v| seen.lock().unwrap().push(format!("last{v}")))
        };

        observers.notify(&7);
        observers.notify(&8);
        assert_eq!(*seen.lock().unwrap(), ["first7", "last7", "first8", "last8"]);
        drop((first, last));
    }

    #[test]
    fn test_unsubscribe_and_drop_detach() {
        let (seen, observers) = recorder();
        let kept = {
            let seen = seen.clone();
            observers.subscribe(move |v| seen.lock().unwrap().push(v.to_string()))
        };
        let removed = observers.subscribe(|_| panic!("should be detached"));
        assert_eq!(observers.len(), 2);

        removed.unsubscribe();
        observers.notify(&3);
        assert_eq!(*seen.lock().unwrap(), ["3"]);

        drop(kept);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let observers: Observers<u32> = Observers::new();
        let sub = observers.subscribe(|_| {});
        drop(observers);
        sub.unsubscribe();
    }
}
