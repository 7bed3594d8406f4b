//! Process-wide avatar invalidation epoch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::VersionToken;

type Callback = Arc<dyn Fn(VersionToken) + Send + Sync>;

struct Inner {
    token: Mutex<VersionToken>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

/// Shared invalidation token plus the callbacks interested in it.
///
/// Cloning is cheap and every clone observes the same epoch. Construct one
/// per process (or per test) and pass it to every mutator and view.
#[derive(Clone)]
pub struct VersionBroadcaster {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VersionBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionBroadcaster")
            .field("token", &self.current_token())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Default for VersionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(VersionToken::INITIAL)
    }

    #[must_use]
    pub fn starting_at(token: VersionToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: Mutex::new(token),
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn current_token(&self) -> VersionToken {
        *self.inner.token.lock()
    }

    /// Registers `callback` to run with every new token.
    ///
    /// The callback stays registered until the returned [`Subscription`] is
    /// dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(VersionToken) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, Arc::new(callback)));
        trace!(id, "Avatar version subscriber added");
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Advances the epoch and notifies every current subscriber.
    ///
    /// Callbacks run synchronously on the caller, outside of any lock.
    pub fn bump(&self) -> VersionToken {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        let token = {
            let mut current = self.inner.token.lock();
            *current = current.advance(now);
            *current
        };

        let snapshot: Vec<Callback> = self
            .inner
            .subscribers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        debug!(version = %token, subscribers = snapshot.len(), "Avatar version bumped");

        for callback in snapshot {
            callback(token);
        }
        token
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Registration handle returned by [`VersionBroadcaster::subscribe`].
///
/// Dropping it removes the callback.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Removes the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().retain(|(id, _)| *id != self.id);
            trace!(id = self.id, "Avatar version subscriber removed");
        }
    }
}
