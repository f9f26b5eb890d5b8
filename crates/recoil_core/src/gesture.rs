//! Gesture recognizers as signal sources
//!
//! A [`GestureRecognizer`] exposes a discrete [`GestureState`] and notifies
//! registered listeners synchronously whenever that state changes. Hosts
//! adapt their input system by calling [`GestureRecognizer::set_state`];
//! tests drive it the same way.
//!
//! ```rust
//! use recoil_core::gesture::{GestureRecognizer, GestureState};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let pan = GestureRecognizer::new();
//! let began = Rc::new(Cell::new(0));
//!
//! let counter = Rc::clone(&began);
//! pan.add_state_listener(move |g| {
//!     if g.state() == GestureState::Began {
//!         counter.set(counter.get() + 1);
//!     }
//! });
//!
//! pan.set_state(GestureState::Began);
//! pan.set_state(GestureState::Recognized);
//! assert_eq!(began.get(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Handle to a registered state listener
    pub struct ListenerId;
}

/// Unique identity of a gesture recognizer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(u64);

impl GestureId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GestureId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Discrete recognizer state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GestureState {
    /// Waiting for input
    #[default]
    Possible,
    /// The gesture started
    Began,
    /// The gesture is ongoing and its values changed
    Changed,
    /// The gesture completed
    Recognized,
    /// The gesture was aborted
    Cancelled,
}

impl GestureState {
    /// `Began` or `Changed`
    pub fn is_active(self) -> bool {
        matches!(self, GestureState::Began | GestureState::Changed)
    }

    /// `Recognized` or `Cancelled`
    pub fn is_terminal(self) -> bool {
        matches!(self, GestureState::Recognized | GestureState::Cancelled)
    }
}

type StateListener = Rc<dyn Fn(&GestureRecognizer)>;

struct RecognizerInner {
    state: GestureState,
    listeners: SlotMap<ListenerId, StateListener>,
}

/// A gesture recognizer handle (cheap to clone, single-threaded)
///
/// Clones share state and identity.
#[derive(Clone)]
pub struct GestureRecognizer {
    id: GestureId,
    inner: Rc<RefCell<RecognizerInner>>,
}

impl GestureRecognizer {
    /// Create a recognizer in the `Possible` state
    pub fn new() -> Self {
        Self {
            id: GestureId::next(),
            inner: Rc::new(RefCell::new(RecognizerInner {
                state: GestureState::Possible,
                listeners: SlotMap::with_key(),
            })),
        }
    }

    pub fn id(&self) -> GestureId {
        self.id
    }

    pub fn state(&self) -> GestureState {
        self.inner.borrow().state
    }

    /// Transition to `state`, notifying listeners if it differs from the current one
    ///
    /// Listeners run after the state is stored and may query it.
    pub fn set_state(&self, state: GestureState) {
        let listeners: SmallVec<[StateListener; 4]> = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == state {
                return;
            }
            tracing::trace!(gesture = self.id.0, from = ?inner.state, to = ?state, "gesture state changed");
            inner.state = state;
            inner.listeners.values().cloned().collect()
        };

        for listener in listeners {
            listener(self);
        }
    }

    /// Register a state listener
    pub fn add_state_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&GestureRecognizer) + 'static,
    {
        self.inner.borrow_mut().listeners.insert(Rc::new(listener))
    }

    /// Remove a state listener, returns `false` if it was not registered
    pub fn remove_state_listener(&self, id: ListenerId) -> bool {
        self.inner.borrow_mut().listeners.remove(id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for GestureRecognizer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GestureRecognizer {}

impl Hash for GestureRecognizer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureRecognizer")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_state_classification() {
        assert!(!GestureState::Possible.is_active());
        assert!(GestureState::Began.is_active());
        assert!(GestureState::Changed.is_active());
        assert!(GestureState::Recognized.is_terminal());
        assert!(GestureState::Cancelled.is_terminal());
        assert!(!GestureState::Changed.is_terminal());
    }

    #[test]
    fn test_listener_sees_new_state() {
        let gesture = GestureRecognizer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = Rc::clone(&seen);
        gesture.add_state_listener(move |g| log.borrow_mut().push(g.state()));

        gesture.set_state(GestureState::Began);
        gesture.set_state(GestureState::Changed);
        gesture.set_state(GestureState::Cancelled);

        assert_eq!(
            *seen.borrow(),
            vec![
                GestureState::Began,
                GestureState::Changed,
                GestureState::Cancelled
            ]
        );
    }

    #[test]
    fn test_same_state_does_not_notify() {
        let gesture = GestureRecognizer::new();
        let count = Rc::new(RefCell::new(0));

        let c = Rc::clone(&count);
        gesture.add_state_listener(move |_| *c.borrow_mut() += 1);

        gesture.set_state(GestureState::Possible);
        assert_eq!(*count.borrow(), 0);

        gesture.set_state(GestureState::Began);
        gesture.set_state(GestureState::Began);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let gesture = GestureRecognizer::new();
        let count = Rc::new(RefCell::new(0));

        let c = Rc::clone(&count);
        let id = gesture.add_state_listener(move |_| *c.borrow_mut() += 1);
        assert_eq!(gesture.listener_count(), 1);

        assert!(gesture.remove_state_listener(id));
        assert!(!gesture.remove_state_listener(id));

        gesture.set_state(GestureState::Began);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_clones_share_identity() {
        let a = GestureRecognizer::new();
        let b = a.clone();
        let c = GestureRecognizer::new();

        assert_eq!(a, b);
        assert_ne!(a, c);

        b.set_state(GestureState::Changed);
        assert_eq!(a.state(), GestureState::Changed);
    }
}
