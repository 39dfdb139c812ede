//! Explicit event registry.
//!
//! Every component that reports something (transport state, inbound messages,
//! client state, client keys) owns an [`EventSource`]. Listeners register an
//! async callback and get a [`Subscription`] back; dropping the subscription
//! (or calling [`Subscription::unsubscribe`]) removes the callback again.
//!
//! Publishing awaits the subscribers one after another in registration order.
//! A subscriber that returns an error is logged and skipped; it never stops
//! the remaining subscribers from running.

use crate::error::handler::HandlerError;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::future::BoxFuture;
use log::{error, trace};

type Callback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

fn lock<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    // Callbacks never run under the lock, so a poisoned registry is still consistent
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A named, cloneable fan-out point for values of type `T`.
///
/// Clones share the same subscriber list.
pub struct EventSource<T> {
    name: &'static str,
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for EventSource<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> EventSource<T>
where
    T: Clone + Send + 'static,
{
    /// Create an empty source. `name` only shows up in log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register an async callback.
    ///
    /// The callback stays registered for as long as the returned
    /// [`Subscription`] is alive.
    pub fn subscribe<F, Fut>(&self, handler: F) -> Subscription
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let callback: Callback<T> =
            Arc::new(move |value| -> BoxFuture<'static, Result<(), HandlerError>> {
                Box::pin(handler(value))
            });

        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, callback));
            id
        };

        trace!("Subscriber {id} added to {} event", self.name);

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    lock(&registry).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Invoke every current subscriber with `value`.
    ///
    /// Subscribers added or removed while a publish is running only take
    /// effect for the next publish.
    pub async fn publish(&self, value: T) {
        let snapshot: Vec<(u64, Callback<T>)> = lock(&self.registry).entries.clone();

        for (id, callback) in snapshot {
            if let Err(e) = callback(value.clone()).await {
                error!("Subscriber {id} of {} event failed: {e}", self.name);
            }
        }
    }

    /// Snapshot the subscribers now and deliver `value` on a spawned task.
    ///
    /// Successive calls fix their subscriber set in call order, so a caller
    /// never waits on a slow subscriber. Must be called inside a tokio runtime.
    pub fn publish_detached(&self, value: T) {
        let snapshot: Vec<(u64, Callback<T>)> = lock(&self.registry).entries.clone();
        let name = self.name;

        tokio::spawn(async move {
            for (id, callback) in snapshot {
                if let Err(e) = callback(value.clone()).await {
                    error!("Subscriber {id} of {name} event failed: {e}");
                }
            }
        });
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }
}

/// Registration handle returned by [`EventSource::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Remove the callback from its source.
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
