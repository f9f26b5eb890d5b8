//! Activity token bridge
//!
//! Holds one activity token per active spring so the host can tell whether
//! anything is still animating.

use std::cell::RefCell;
use std::rc::Rc;

use recoil_core::{ActivityToken, TokenGenerator};
use rustc_hash::FxHashMap;

use crate::error::{Result, SpringError};
use crate::system::{SpringId, SpringListener};

#[derive(Default)]
pub(crate) struct ActivityTokens {
    generator: Option<Rc<dyn TokenGenerator>>,
    held: FxHashMap<SpringId, ActivityToken>,
}

impl ActivityTokens {
    pub(crate) fn set_generator(&mut self, generator: Rc<dyn TokenGenerator>) {
        self.generator = Some(generator);
    }

    #[cfg(test)]
    pub(crate) fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub(crate) fn held_count(&self) -> usize {
        self.held.len()
    }
}

/// Spring listener that acquires a token on activation and releases it on rest
pub(crate) struct LifecycleListener {
    tokens: Rc<RefCell<ActivityTokens>>,
}

impl LifecycleListener {
    pub(crate) fn new(tokens: Rc<RefCell<ActivityTokens>>) -> Self {
        Self { tokens }
    }
}

impl SpringListener for LifecycleListener {
    fn on_activate(&self, id: SpringId) -> Result<()> {
        let generator = {
            let tokens = self.tokens.borrow();
            if tokens.held.contains_key(&id) {
                return Err(SpringError::SpringActivatedTwice(id));
            }
            tokens
                .generator
                .clone()
                .ok_or(SpringError::MissingTokenGenerator)?
        };

        // The generator may notify host listeners, keep it outside the borrow
        let token = generator.generate();
        self.tokens.borrow_mut().held.insert(id, token);
        tracing::trace!(spring = id.to_raw(), "spring activated");
        Ok(())
    }

    fn on_at_rest(&self, id: SpringId) -> Result<()> {
        let token = self
            .tokens
            .borrow_mut()
            .held
            .remove(&id)
            .ok_or(SpringError::TokenNotHeld(id))?;
        token.terminate();
        tracing::trace!(spring = id.to_raw(), "spring at rest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recoil_core::ActivityTracker;

    fn listener() -> (LifecycleListener, Rc<RefCell<ActivityTokens>>, ActivityTracker) {
        let tracker = ActivityTracker::new();
        let tokens = Rc::new(RefCell::new(ActivityTokens::default()));
        tokens.borrow_mut().set_generator(Rc::new(tracker.clone()));
        (LifecycleListener::new(tokens.clone()), tokens, tracker)
    }

    #[test]
    fn test_activate_then_rest_releases_token() {
        let (listener, tokens, tracker) = listener();
        let id = SpringId::default();

        listener.on_activate(id).unwrap();
        assert!(tracker.is_active());
        assert_eq!(tokens.borrow().held_count(), 1);

        listener.on_at_rest(id).unwrap();
        assert!(!tracker.is_active());
        assert_eq!(tokens.borrow().held_count(), 0);
    }

    #[test]
    fn test_activate_twice_fails() {
        let (listener, _, tracker) = listener();
        let id = SpringId::default();

        listener.on_activate(id).unwrap();
        assert!(matches!(
            listener.on_activate(id),
            Err(SpringError::SpringActivatedTwice(_))
        ));
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.generated_count(), 1);
    }

    #[test]
    fn test_rest_without_token_fails() {
        let (listener, _, _) = listener();
        assert!(matches!(
            listener.on_at_rest(SpringId::default()),
            Err(SpringError::TokenNotHeld(_))
        ));
    }

    #[test]
    fn test_missing_generator() {
        let tokens = Rc::new(RefCell::new(ActivityTokens::default()));
        let listener = LifecycleListener::new(tokens.clone());

        assert!(!tokens.borrow().has_generator());
        assert!(matches!(
            listener.on_activate(SpringId::default()),
            Err(SpringError::MissingTokenGenerator)
        ));
    }
}
