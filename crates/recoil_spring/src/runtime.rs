//! Motion runtime
//!
//! Host-side entry point: routes plans to one performer per target, shares a
//! single spring system between them and reports whether anything is still
//! animating.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use recoil_core::{ActivityListenerId, ActivityTracker};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::performer::SpringPerformer;
use crate::plan::Plan;
use crate::system::SpringSystem;

/// Whether any performer is animating
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RuntimeState {
    #[default]
    Idle,
    Active,
}

struct PerformerSlot {
    target: Weak<dyn Any>,
    performer: Box<dyn Any>,
}

/// Owns the performers for a set of targets
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use recoil_core::SpringProperty;
/// use recoil_spring::plan::SpringTo;
/// use recoil_spring::runtime::{MotionRuntime, RuntimeState};
///
/// struct Card {
///     y: f32,
/// }
///
/// let y = SpringProperty::new("y", |c: &Card| c.y, |c: &mut Card, v| c.y = v);
/// let card = Rc::new(RefCell::new(Card { y: 0.0 }));
///
/// let mut runtime = MotionRuntime::new();
/// runtime.add_plan(&SpringTo::new(y, 120.0), &card).unwrap();
///
/// while runtime.step(0.016).unwrap() {}
/// assert_eq!(card.borrow().y, 120.0);
/// assert_eq!(runtime.state(), RuntimeState::Idle);
/// ```
pub struct MotionRuntime {
    tracker: ActivityTracker,
    system: Option<SpringSystem>,
    performers: FxHashMap<(TypeId, usize), PerformerSlot>,
}

impl MotionRuntime {
    pub fn new() -> Self {
        Self {
            tracker: ActivityTracker::new(),
            system: None,
            performers: FxHashMap::default(),
        }
    }

    /// Use `system` instead of creating one on first use
    pub fn with_spring_system(mut self, system: SpringSystem) -> Self {
        self.system = Some(system);
        self
    }

    /// The shared spring system, created on first use
    pub fn spring_system(&mut self) -> SpringSystem {
        self.system.get_or_insert_with(SpringSystem::new).clone()
    }

    /// Hand a plan to the performer for `target`, creating it if needed
    pub fn add_plan<T: 'static>(&mut self, plan: &dyn Plan, target: &Rc<RefCell<T>>) -> Result<()> {
        self.performer_for(target)?.add_plan(plan)
    }

    /// The performer already created for `target`
    pub fn performer<T: 'static>(&self, target: &Rc<RefCell<T>>) -> Option<SpringPerformer<T>> {
        let slot = self.performers.get(&Self::slot_key(target))?;
        if slot.target.strong_count() == 0 {
            return None;
        }
        slot.performer
            .downcast_ref::<SpringPerformer<T>>()
            .cloned()
    }

    fn performer_for<T: 'static>(&mut self, target: &Rc<RefCell<T>>) -> Result<SpringPerformer<T>> {
        if let Some(performer) = self.performer(target) {
            return Ok(performer);
        }

        let performer = SpringPerformer::new(self.spring_system());
        performer.set_token_generator(Rc::new(self.tracker.clone()));
        performer.initialize(target)?;

        let weak: Weak<RefCell<T>> = Rc::downgrade(target);
        self.performers.insert(
            Self::slot_key(target),
            PerformerSlot {
                target: weak,
                performer: Box::new(performer.clone()),
            },
        );
        tracing::debug!(
            target = std::any::type_name::<T>(),
            performers = self.performers.len(),
            "created performer"
        );
        Ok(performer)
    }

    fn slot_key<T: 'static>(target: &Rc<RefCell<T>>) -> (TypeId, usize) {
        (TypeId::of::<T>(), Rc::as_ptr(target) as usize)
    }

    /// Performers whose targets are still alive
    pub fn performer_count(&self) -> usize {
        self.performers
            .values()
            .filter(|slot| slot.target.strong_count() > 0)
            .count()
    }

    pub fn state(&self) -> RuntimeState {
        if self.tracker.is_active() {
            RuntimeState::Active
        } else {
            RuntimeState::Idle
        }
    }

    /// Register a listener called on every Idle/Active transition
    pub fn add_state_listener<F>(&self, listener: F) -> ActivityListenerId
    where
        F: Fn(RuntimeState) + 'static,
    {
        self.tracker.add_state_listener(move |active| {
            listener(if active {
                RuntimeState::Active
            } else {
                RuntimeState::Idle
            })
        })
    }

    pub fn remove_state_listener(&self, id: ActivityListenerId) -> bool {
        self.tracker.remove_state_listener(id)
    }

    /// Step the shared spring system by `dt` seconds
    pub fn step(&self, dt: f32) -> Result<bool> {
        match &self.system {
            Some(system) => system.step(dt),
            None => Ok(false),
        }
    }

    /// Step the shared spring system by its clock
    pub fn tick(&self) -> Result<bool> {
        match &self.system {
            Some(system) => system.tick(),
            None => Ok(false),
        }
    }

    /// Drop performers whose targets no longer exist
    pub fn prune(&mut self) {
        self.performers
            .retain(|_, slot| slot.target.strong_count() > 0);
    }
}

impl Default for MotionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MotionRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionRuntime")
            .field("state", &self.state())
            .field("performers", &self.performer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::plan::{PausesSpring, SpringTo};
    use crate::system::ManualClock;
    use recoil_core::{GestureRecognizer, GestureState, SpringProperty};

    const FRAME: f32 = 0.016;

    #[derive(Default)]
    struct Knob {
        angle: f64,
    }

    #[derive(Default)]
    struct Label {
        alpha: f32,
    }

    fn angle() -> SpringProperty<Knob> {
        SpringProperty::with_converter(
            "angle",
            |k: &Knob| k.angle,
            |k: &mut Knob, v: f64| k.angle = v,
            recoil_core::Widen,
        )
    }

    fn alpha() -> SpringProperty<Label> {
        SpringProperty::new("alpha", |l: &Label| l.alpha, |l: &mut Label, v| l.alpha = v)
    }

    #[test]
    fn test_state_follows_springs() {
        let mut runtime = MotionRuntime::new();
        let knob = Rc::new(RefCell::new(Knob::default()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        runtime.add_state_listener(move |state| sink.borrow_mut().push(state));

        assert_eq!(runtime.state(), RuntimeState::Idle);
        runtime.add_plan(&SpringTo::new(angle(), 90.0), &knob).unwrap();
        assert_eq!(runtime.state(), RuntimeState::Idle);

        runtime.step(FRAME).unwrap();
        assert_eq!(runtime.state(), RuntimeState::Active);

        while runtime.step(FRAME).unwrap() {}
        assert_eq!(runtime.state(), RuntimeState::Idle);
        assert_eq!(knob.borrow().angle, 90.0);
        assert_eq!(
            *seen.borrow(),
            vec![RuntimeState::Active, RuntimeState::Idle]
        );
    }

    #[test]
    fn test_one_performer_per_target() {
        let mut runtime = MotionRuntime::new();
        let knob = Rc::new(RefCell::new(Knob::default()));
        let label = Rc::new(RefCell::new(Label::default()));
        let other_label = Rc::new(RefCell::new(Label::default()));

        runtime.add_plan(&SpringTo::new(angle(), 1.0), &knob).unwrap();
        runtime.add_plan(&SpringTo::new(angle(), 2.0), &knob).unwrap();
        runtime.add_plan(&SpringTo::new(alpha(), 1.0), &label).unwrap();
        runtime.add_plan(&SpringTo::new(alpha(), 1.0), &other_label).unwrap();

        assert_eq!(runtime.performer_count(), 3);
        assert_eq!(runtime.performer(&knob).map(|p| p.spring_count()), Some(1));
        assert_eq!(runtime.spring_system().spring_count(), 3);
    }

    #[test]
    fn test_plan_for_wrong_target_type() {
        let mut runtime = MotionRuntime::new();
        let label = Rc::new(RefCell::new(Label::default()));

        assert!(runtime.add_plan(&SpringTo::new(angle(), 1.0), &label).is_err());
    }

    #[test]
    fn test_step_without_system() {
        let runtime = MotionRuntime::new();
        assert!(!runtime.step(FRAME).unwrap());
        assert!(!runtime.tick().unwrap());
    }

    #[test]
    fn test_tick_with_manual_clock() {
        let clock = ManualClock::new();
        let mut runtime =
            MotionRuntime::new().with_spring_system(SpringSystem::with_clock(clock.clone()));
        let label = Rc::new(RefCell::new(Label::default()));
        runtime.add_plan(&SpringTo::new(alpha(), 1.0), &label).unwrap();

        let mut ticks = 0;
        loop {
            clock.advance(Duration::from_millis(16));
            ticks += 1;
            if !runtime.tick().unwrap() {
                break;
            }
        }

        assert!(ticks > 1);
        assert_eq!(label.borrow().alpha, 1.0);
    }

    #[test]
    fn test_pause_through_runtime() {
        let mut runtime = MotionRuntime::new();
        let label = Rc::new(RefCell::new(Label::default()));
        let drag = GestureRecognizer::new();

        runtime
            .add_plan(&PausesSpring::new(alpha(), drag.clone()), &label)
            .unwrap();
        runtime.add_plan(&SpringTo::new(alpha(), 1.0), &label).unwrap();
        runtime.step(FRAME).unwrap();

        drag.set_state(GestureState::Began);
        runtime.step(FRAME).unwrap();
        assert_eq!(runtime.state(), RuntimeState::Idle);

        drag.set_state(GestureState::Recognized);
        while runtime.step(FRAME).unwrap() {}
        assert_eq!(label.borrow().alpha, 1.0);
    }

    #[test]
    fn test_prune_dropped_targets() {
        let mut runtime = MotionRuntime::new();
        let label = Rc::new(RefCell::new(Label::default()));
        runtime.add_plan(&SpringTo::new(alpha(), 0.0), &label).unwrap();
        assert_eq!(runtime.performer_count(), 1);

        drop(label);
        assert_eq!(runtime.performer_count(), 0);
        runtime.prune();
        assert!(runtime.performers.is_empty());
    }
}
