//! Spring performer
//!
//! Carries out spring plans against one target. Each animated property gets
//! its own spring, created the first time a plan mentions it. Gestures named
//! by [`PausesSpring`] plans freeze those springs while they are in progress;
//! the destination a spring was heading for is staged and restored when the
//! gesture ends.
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use recoil_core::{ActivityTracker, SpringProperty};
//! use recoil_spring::performer::SpringPerformer;
//! use recoil_spring::plan::SpringTo;
//! use recoil_spring::system::SpringSystem;
//!
//! struct Card {
//!     alpha: f32,
//! }
//!
//! let alpha = SpringProperty::new("alpha", |c: &Card| c.alpha, |c: &mut Card, v| c.alpha = v);
//! let card = Rc::new(RefCell::new(Card { alpha: 0.0 }));
//!
//! let system = SpringSystem::new();
//! let performer = SpringPerformer::new(system.clone());
//! performer.set_token_generator(Rc::new(ActivityTracker::new()));
//! performer.initialize(&card).unwrap();
//! performer.add_plan(&SpringTo::new(alpha, 1.0)).unwrap();
//!
//! while system.step(0.016).unwrap() {}
//! assert_eq!(card.borrow().alpha, 1.0);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use recoil_core::{GestureRecognizer, GestureState, PropertyKey, SpringProperty, TokenGenerator};

use crate::error::{Result, SpringError};
use crate::pause::PauseCoordinator;
use crate::plan::{ConfigureSpring, PausesSpring, Plan, SpringTo};
use crate::registry::SpringRegistry;
use crate::spring::validate_coefficient;
use crate::system::{SpringId, SpringSystem};
use crate::tokens::{ActivityTokens, LifecycleListener};

/// Spring values closer than this to the target's value are left alone
const VALUE_EPSILON: f32 = 0.01;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= VALUE_EPSILON
}

/// A plan the performer has accepted
enum Intent<T> {
    SpringTo(SpringTo<T>),
    Configure(ConfigureSpring<T>),
    Pause(PausesSpring<T>),
}

impl<T: 'static> Intent<T> {
    fn lower(plan: &dyn Plan) -> Result<Self> {
        let any = plan.as_any();
        if let Some(plan) = any.downcast_ref::<SpringTo<T>>() {
            if let Some(config) = &plan.configuration {
                config.validate()?;
            }
            return Ok(Intent::SpringTo(plan.clone()));
        }
        if let Some(plan) = any.downcast_ref::<ConfigureSpring<T>>() {
            if let Some(tension) = plan.tension {
                validate_coefficient("tension", tension)?;
            }
            if let Some(friction) = plan.friction {
                validate_coefficient("friction", friction)?;
            }
            return Ok(Intent::Configure(plan.clone()));
        }
        if let Some(plan) = any.downcast_ref::<PausesSpring<T>>() {
            return Ok(Intent::Pause(plan.clone()));
        }
        Err(SpringError::UnsupportedPlan(format!("{plan:?}")))
    }
}

struct PerformerInner<T> {
    system: SpringSystem,
    registry: Option<SpringRegistry<T>>,
    target: Weak<RefCell<T>>,
    pause: PauseCoordinator,
    pending: Vec<Intent<T>>,
}

/// Animates the properties of one target with springs
///
/// Cloning yields another handle to the same performer.
pub struct SpringPerformer<T> {
    inner: Rc<RefCell<PerformerInner<T>>>,
    tokens: Rc<RefCell<ActivityTokens>>,
}

impl<T> Clone for SpringPerformer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<T: 'static> SpringPerformer<T> {
    /// Create a performer whose springs live in `system`
    pub fn new(system: SpringSystem) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PerformerInner {
                system,
                registry: None,
                target: Weak::new(),
                pause: PauseCoordinator::default(),
                pending: Vec::new(),
            })),
            tokens: Rc::new(RefCell::new(ActivityTokens::default())),
        }
    }

    /// Supply the generator used for activity tokens
    pub fn set_token_generator(&self, generator: Rc<dyn TokenGenerator>) {
        self.tokens.borrow_mut().set_generator(generator);
    }

    /// Bind the performer to its target and apply any queued plans in order
    ///
    /// The performer only keeps a weak reference to the target.
    pub fn initialize(&self, target: &Rc<RefCell<T>>) -> Result<()> {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            if inner.registry.is_some() {
                return Err(SpringError::AlreadyInitialized);
            }
            let lifecycle = Rc::new(LifecycleListener::new(self.tokens.clone()));
            let registry =
                SpringRegistry::new(inner.system.clone(), Rc::downgrade(target), lifecycle);
            inner.target = Rc::downgrade(target);
            inner.registry = Some(registry);
            std::mem::take(&mut inner.pending)
        };

        if !pending.is_empty() {
            tracing::debug!(plans = pending.len(), "applying queued plans");
        }
        for intent in pending {
            self.apply(intent);
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.borrow().registry.is_some()
    }

    /// Carry out a plan
    ///
    /// Fails with [`SpringError::UnsupportedPlan`] for plans this performer
    /// does not understand, leaving the performer untouched. Plans added
    /// before [`initialize`](Self::initialize) are queued.
    pub fn add_plan(&self, plan: &dyn Plan) -> Result<()> {
        let intent = Intent::lower(plan)?;
        {
            let mut inner = self.inner.borrow_mut();
            if inner.registry.is_none() {
                inner.pending.push(intent);
                return Ok(());
            }
        }
        self.apply(intent);
        Ok(())
    }

    /// Number of springs created so far
    pub fn spring_count(&self) -> usize {
        self.inner.borrow().registry.as_ref().map_or(0, |r| r.len())
    }

    /// The spring driving the property named `key`, if one was created
    pub fn spring_for(&self, key: &PropertyKey) -> Option<SpringId> {
        self.inner.borrow().registry.as_ref()?.get(key)
    }

    /// Whether a gesture is currently pausing the property named `key`
    pub fn is_suppressed(&self, key: &PropertyKey) -> bool {
        self.inner.borrow().pause.is_suppressed(key)
    }

    /// Destination withheld from the spring for `key` while it is paused
    pub fn staged_value(&self, key: &PropertyKey) -> Option<f32> {
        let inner = self.inner.borrow();
        let id = inner.registry.as_ref()?.get(key)?;
        inner.pause.staged(id)
    }

    pub fn system(&self) -> SpringSystem {
        self.inner.borrow().system.clone()
    }

    /// Number of activity tokens currently held
    pub fn active_spring_count(&self) -> usize {
        self.tokens.borrow().held_count()
    }

    fn apply(&self, intent: Intent<T>) {
        match intent {
            Intent::SpringTo(plan) => self.spring_to(plan),
            Intent::Configure(plan) => self.configure(plan),
            Intent::Pause(plan) => self.pause(plan),
        }
    }

    fn spring_to(&self, plan: SpringTo<T>) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        if inner.target.strong_count() == 0 {
            tracing::debug!(property = plan.property.name(), "target dropped, plan ignored");
            return;
        }
        let Some(registry) = inner.registry.as_mut() else {
            return;
        };

        let id = registry.get_or_create(&plan.property);
        if let Some(config) = plan.configuration {
            inner.system.with_spring_mut(id, |spring| spring.set_config(config));
        }

        Self::sync_to_target(inner, &plan.property, id);
        Self::arm(inner, plan.property.key(), id, plan.destination);
    }

    fn configure(&self, plan: ConfigureSpring<T>) {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        let Some(registry) = inner.registry.as_mut() else {
            return;
        };

        let id = registry.get_or_create(&plan.property);
        inner.system.with_spring_mut(id, |spring| {
            if let Some(tension) = plan.tension {
                spring.set_tension(tension);
            }
            if let Some(friction) = plan.friction {
                spring.set_friction(friction);
            }
        });
    }

    fn pause(&self, plan: PausesSpring<T>) {
        let first_seen = self
            .inner
            .borrow_mut()
            .pause
            .add_relation(&plan.gesture, plan.property.key().clone());
        tracing::debug!(
            gesture = plan.gesture.id().to_raw(),
            property = plan.property.name(),
            "gesture pauses property"
        );

        if first_seen {
            let weak = Rc::downgrade(&self.inner);
            plan.gesture.add_state_listener(move |gesture| {
                if let Some(inner) = weak.upgrade() {
                    Self::gesture_changed(&inner, gesture);
                }
            });
        }
    }

    /// Reset the spring, at rest, to the target's value if the two drifted apart
    fn sync_to_target(inner: &PerformerInner<T>, property: &SpringProperty<T>, id: SpringId) {
        let Some(target) = inner.target.upgrade() else {
            return;
        };
        let current = match target.try_borrow() {
            Ok(target) => property.read_fraction(&target),
            Err(_) => {
                tracing::warn!(property = property.name(), "target borrowed, sync skipped");
                return;
            }
        };

        inner.system.with_spring_mut(id, |spring| {
            if !approx_eq(spring.current_value(), current) {
                tracing::debug!(
                    spring = id.to_raw(),
                    from = spring.current_value(),
                    to = current,
                    "spring out of sync with target, resetting"
                );
                spring.set_current_value(current, true);
            }
        });
    }

    /// Point the spring at `destination`, or stage it while paused
    fn arm(inner: &mut PerformerInner<T>, key: &PropertyKey, id: SpringId, destination: f32) {
        if inner.pause.is_suppressed(key) {
            tracing::debug!(spring = id.to_raw(), destination, "spring paused, staging destination");
            inner.pause.stage(id, destination);
            return;
        }
        inner
            .system
            .with_spring_mut(id, |spring| spring.set_end_value(destination));
    }

    fn gesture_changed(inner: &Rc<RefCell<PerformerInner<T>>>, gesture: &GestureRecognizer) {
        let mut guard = inner.borrow_mut();
        let inner = &mut *guard;
        let Some(registry) = inner.registry.as_ref() else {
            return;
        };

        let state = gesture.state();
        let keys = inner.pause.properties_of(gesture.id());
        let springs: Vec<(PropertyKey, SpringId, SpringProperty<T>)> = keys
            .into_iter()
            .filter_map(|key| {
                let (id, property) = registry.entry(&key)?;
                let property = property.clone();
                Some((key, id, property))
            })
            .collect();

        match state {
            GestureState::Began => {
                for (key, id, _) in springs {
                    let Some(end) = inner.system.with_spring(id, |s| s.end_value()) else {
                        continue;
                    };
                    inner.pause.stage_if_absent(id, end);
                    inner.system.with_spring_mut(id, |s| s.set_at_rest());
                    tracing::debug!(
                        gesture = gesture.id().to_raw(),
                        property = %key,
                        "paused spring"
                    );
                }
            }
            GestureState::Recognized | GestureState::Cancelled => {
                for (key, id, property) in springs {
                    match inner.pause.take_staged(id) {
                        Some(destination) => {
                            tracing::debug!(
                                gesture = gesture.id().to_raw(),
                                property = %key,
                                destination,
                                "resuming spring"
                            );
                            Self::sync_to_target(inner, &property, id);
                            Self::arm(inner, &key, id, destination);
                        }
                        None => tracing::debug!(
                            gesture = gesture.id().to_raw(),
                            property = %key,
                            "nothing staged to resume"
                        ),
                    }
                }
            }
            GestureState::Possible | GestureState::Changed => {}
        }
    }
}

impl<T: 'static> fmt::Debug for SpringPerformer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SpringPerformer")
            .field("initialized", &inner.registry.is_some())
            .field("springs", &inner.registry.as_ref().map_or(0, |r| r.len()))
            .field("pending", &inner.pending.len())
            .finish()
    }
}
