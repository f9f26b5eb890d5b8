//! Activity tokens
//!
//! A performer holds an [`ActivityToken`] for as long as something it owns
//! is animating. Tokens are produced by a [`TokenGenerator`] supplied by the
//! host; the [`ActivityTracker`] generator aggregates live tokens across
//! every performer into a single idle/active state.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Handle to a registered activity listener
    pub struct ActivityListenerId;
}

/// Produces activity tokens
pub trait TokenGenerator {
    fn generate(&self) -> ActivityToken;
}

/// An opaque "work in progress" handle
///
/// Released exactly once: either explicitly through [`terminate`](Self::terminate)
/// or when dropped.
pub struct ActivityToken {
    release: Option<Box<dyn FnOnce()>>,
}

impl ActivityToken {
    /// Create a token that runs `release` when it ends
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A token nobody is tracking
    pub fn detached() -> Self {
        Self { release: None }
    }

    /// End the activity this token represents
    pub fn terminate(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ActivityToken {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for ActivityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityToken")
            .field("tracked", &self.release.is_some())
            .finish()
    }
}

type ActivityListener = Rc<dyn Fn(bool)>;

#[derive(Default)]
struct TrackerInner {
    live: usize,
    generated: u64,
    listeners: SlotMap<ActivityListenerId, ActivityListener>,
}

/// Counts live tokens and reports idle/active transitions
///
/// Cloning yields another handle to the same tracker.
///
/// ```rust
/// use recoil_core::activity::{ActivityTracker, TokenGenerator};
///
/// let tracker = ActivityTracker::new();
/// let a = tracker.generate();
/// let b = tracker.generate();
/// assert_eq!(tracker.active_count(), 2);
///
/// a.terminate();
/// drop(b);
/// assert!(!tracker.is_active());
/// ```
#[derive(Clone, Default)]
pub struct ActivityTracker {
    inner: Rc<RefCell<TrackerInner>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any token is live
    pub fn is_active(&self) -> bool {
        self.inner.borrow().live > 0
    }

    /// Number of live tokens
    pub fn active_count(&self) -> usize {
        self.inner.borrow().live
    }

    /// Total number of tokens handed out
    pub fn generated_count(&self) -> u64 {
        self.inner.borrow().generated
    }

    /// Register a listener called with `true` on idle→active and `false` on active→idle
    pub fn add_state_listener<F>(&self, listener: F) -> ActivityListenerId
    where
        F: Fn(bool) + 'static,
    {
        self.inner.borrow_mut().listeners.insert(Rc::new(listener))
    }

    pub fn remove_state_listener(&self, id: ActivityListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id).is_some()
    }

    fn notify(inner: &Rc<RefCell<TrackerInner>>, active: bool) {
        let listeners: SmallVec<[ActivityListener; 4]> =
            inner.borrow().listeners.values().cloned().collect();
        tracing::debug!(active, "activity state changed");
        for listener in listeners {
            listener(active);
        }
    }

    fn release(inner: &Weak<RefCell<TrackerInner>>) {
        let Some(inner) = inner.upgrade() else {
            return;
        };

        let now_idle = {
            let mut guard = inner.borrow_mut();
            guard.live = guard.live.saturating_sub(1);
            guard.live == 0
        };

        if now_idle {
            Self::notify(&inner, false);
        }
    }
}

impl TokenGenerator for ActivityTracker {
    fn generate(&self) -> ActivityToken {
        let became_active = {
            let mut guard = self.inner.borrow_mut();
            guard.live += 1;
            guard.generated += 1;
            guard.live == 1
        };

        if became_active {
            Self::notify(&self.inner, true);
        }

        let weak = Rc::downgrade(&self.inner);
        ActivityToken::new(move || Self::release(&weak))
    }
}

impl fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ActivityTracker")
            .field("live", &inner.live)
            .field("generated", &inner.generated)
            .finish()
    }
}
