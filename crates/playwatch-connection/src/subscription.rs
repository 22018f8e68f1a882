//! Handler registries with drop-to-unsubscribe handles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

trait Unregister: Send + Sync {
    fn unregister(&self, id: u64);
}

struct RegistryInner<T> {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<u64, Handler<T>>>,
}

impl<T: 'static> Unregister for RegistryInner<T> {
    fn unregister(&self, id: u64) {
        self.handlers.write().remove(&id);
    }
}

/// An ordered set of callbacks for values of type `T`.
///
/// Handlers run in registration order on the notifying thread. The lock is
/// released before any handler runs, so a handler may register or drop
/// subscriptions without deadlocking.
pub struct HandlerRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T: 'static> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicU64::new(1),
                handlers: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    /// Register a handler. It stays registered until the returned
    /// [`Subscription`] is dropped or the registry is cleared.
    pub fn register<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.handlers.write().insert(id, Arc::new(handler));
        let weak: Weak<dyn Unregister> = Arc::downgrade(&self.inner) as Weak<dyn Unregister>;
        Subscription {
            id,
            registry: Some(weak),
        }
    }

    /// Call every handler with `value`.
    pub fn notify(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self.inner.handlers.read().values().cloned().collect();
        for handler in handlers {
            handler(value);
        }
    }

    /// Remove every handler. Outstanding subscriptions become no-ops.
    pub fn clear(&self) {
        self.inner.handlers.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clones share the same handler set.
impl<T> Clone for HandlerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by every `subscribe`-style call.
///
/// Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the handler immediately"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Unregister>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the handler registered for the lifetime of its registry.
    pub fn detach(mut self) {
        self.registry = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.unregister(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_notify_in_registration_order() {
        let registry = HandlerRegistry::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let a = {
            let seen = seen.clone();
            registry.register(move |v| seen.lock().push(("a", *v)))
        };
        let b = {
            let seen = seen.clone();
            registry.register(move |v| seen.lock().push(("b", *v)))
        };

        registry.notify(&7);
        assert_eq!(*seen.lock(), vec![("a", 7), ("b", 7)]);
        drop((a, b));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = HandlerRegistry::<u32>::new();
        let count = Arc::new(AtomicU64::new(0));

        let sub = {
            let count = count.clone();
            registry.register(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        registry.notify(&1);
        sub.unsubscribe();
        registry.notify(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_detach_keeps_handler() {
        let registry = HandlerRegistry::<u32>::new();
        registry.register(|_| {}).detach();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear_and_outstanding_subscription() {
        let registry = HandlerRegistry::<u32>::new();
        let sub = registry.register(|_| {});
        registry.clear();
        assert!(registry.is_empty());
        drop(sub);
    }

    #[test]
    fn test_subscription_outlives_registry() {
        let registry = HandlerRegistry::<u32>::new();
        let sub = registry.register(|_| {});
        drop(registry);
        drop(sub);
    }

    #[test]
    fn test_handler_can_register_during_notify() {
        let registry = Arc::new(HandlerRegistry::<u32>::new());
        let inner = registry.clone();
        let _sub = registry.register(move |_| inner.register(|_| {}).detach());
        registry.notify(&1);
        assert_eq!(registry.len(), 2);
    }
}
