//! Headless avatar view.
//!
//! Each mounted view subscribes to the version broadcaster and re-queries the
//! resolution cache whenever the epoch advances. Views never talk to each
//! other; a save made anywhere reaches all of them through the broadcaster.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::application::services::{
    Lookup, ResolutionCache, Subscription, VersionBroadcaster, initials, initials_color,
};
use crate::domain::entities::{CacheEntry, CacheKey, Profile, SubjectId, VersionToken};

/// What a view currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarRender {
    /// The stored avatar.
    Image {
        /// URL to display.
        url: String,
    },
    /// Initials badge shown while loading or when there is no avatar.
    Initials {
        /// One or two uppercase characters.
        text: String,
        /// Badge colour as `#rrggbb`.
        color: String,
    },
}

impl AvatarRender {
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Image { url } => Some(url),
            Self::Initials { .. } => None,
        }
    }

    #[must_use]
    pub fn initials(&self) -> Option<&str> {
        match self {
            Self::Initials { text, .. } => Some(text),
            Self::Image { .. } => None,
        }
    }
}

#[derive(Debug)]
struct ViewState {
    key: Option<CacheKey>,
    entry: Option<CacheEntry>,
    broken_url: Option<String>,
}

struct ViewInner {
    profile: Profile,
    fallback: AvatarRender,
    cache: Arc<ResolutionCache>,
    state: Mutex<ViewState>,
    renders: watch::Sender<AvatarRender>,
}

impl ViewInner {
    /// Moves the view to `version`, ignoring epochs it has already passed.
    fn refresh(self: &Arc<Self>, version: VersionToken) {
        let mut state = self.state.lock();
        if state.key.as_ref().is_some_and(|key| key.version >= version) {
            return;
        }

        let key = CacheKey::new(self.profile.subject().clone(), version);
        state.key = Some(key.clone());

        match self.cache.lookup(&key.subject, version) {
            Lookup::Ready(entry) => {
                trace!(key = %key, "Avatar view hit");
                state.entry = Some(entry);
                self.publish(&state);
            }
            Lookup::Pending(pending) => {
                state.entry = None;
                self.publish(&state);
                drop(state);

                let weak: Weak<Self> = Arc::downgrade(self);
                let runtime = pending.runtime().clone();
                runtime.spawn(async move {
                    let entry = pending.wait().await;
                    match weak.upgrade() {
                        Some(inner) => inner.apply(&key, entry),
                        None => debug!(key = %key, "Discarding avatar resolution for unmounted view"),
                    }
                });
            }
        }
    }

    /// Applies a finished resolution if it still matches the current key.
    fn apply(&self, key: &CacheKey, entry: CacheEntry) {
        let mut state = self.state.lock();
        if state.key.as_ref() != Some(key) {
            trace!(key = %key, "Discarding stale avatar resolution");
            return;
        }
        state.entry = Some(entry);
        self.publish(&state);
    }

    fn image_failed(&self, url: &str) {
        let mut state = self.state.lock();
        debug!(subject = %self.profile.subject(), url, "Avatar image failed to load");
        state.broken_url = Some(url.to_string());
        self.publish(&state);
    }

    fn compute(&self, state: &ViewState) -> AvatarRender {
        match &state.entry {
            Some(CacheEntry::Found { url, .. }) if state.broken_url.as_deref() != Some(url) => {
                AvatarRender::Image { url: url.clone() }
            }
            _ => self.fallback.clone(),
        }
    }

    fn publish(&self, state: &ViewState) {
        let next = self.compute(state);
        self.renders.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// One rendered avatar. Dropping the view unmounts it.
pub struct AvatarView {
    inner: Arc<ViewInner>,
    _subscription: Subscription,
}

impl std::fmt::Debug for AvatarView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarView")
            .field("subject", self.inner.profile.subject())
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl AvatarView {
    /// Mounts a view for `profile` at the broadcaster's current epoch.
    ///
    /// Resolutions run on the cache's runtime, so `mount` and later bumps may
    /// come from any thread.
    #[must_use]
    pub fn mount(
        profile: Profile,
        cache: Arc<ResolutionCache>,
        broadcaster: &VersionBroadcaster,
    ) -> Self {
        let name = profile.fallback_name();
        let fallback = AvatarRender::Initials {
            text: initials(name),
            color: initials_color(name),
        };
        let (renders, _) = watch::channel(fallback.clone());

        let inner = Arc::new(ViewInner {
            profile,
            fallback,
            cache,
            state: Mutex::new(ViewState {
                key: None,
                entry: None,
                broken_url: None,
            }),
            renders,
        });

        let weak = Arc::downgrade(&inner);
        let subscription = broadcaster.subscribe(move |version| {
            if let Some(inner) = weak.upgrade() {
                inner.refresh(version);
            }
        });
        inner.refresh(broadcaster.current_token());

        debug!(subject = %inner.profile.subject(), "Avatar view mounted");
        Self {
            inner,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        self.inner.profile.subject()
    }

    /// Key the view is currently showing or waiting for.
    #[must_use]
    pub fn current_key(&self) -> Option<CacheKey> {
        self.inner.state.lock().key.clone()
    }

    /// Whether the current key has finished resolving.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.state.lock().entry.is_some()
    }

    #[must_use]
    pub fn render(&self) -> AvatarRender {
        self.inner.renders.borrow().clone()
    }

    /// Receiver notified on every change of [`Self::render`].
    #[must_use]
    pub fn renders(&self) -> watch::Receiver<AvatarRender> {
        self.inner.renders.subscribe()
    }

    /// Reports that `url` could not be displayed; the view falls back to
    /// initials until a different URL resolves.
    pub fn image_failed(&self, url: &str) {
        self.inner.image_failed(url);
    }

    /// Tears the view down. Equivalent to dropping it.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for AvatarView {
    fn drop(&mut self) {
        trace!(subject = %self.inner.profile.subject(), "Avatar view unmounted");
    }
}
