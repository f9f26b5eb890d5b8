//! Spring system
//!
//! Owns every spring created through it and advances them together, so all
//! performers sharing one system tick in lockstep. Stepping is driven from
//! outside: call [`SpringSystem::step`] with an explicit delta, or
//! [`SpringSystem::tick`] to use the injected [`Clock`].
//!
//! Listeners are invoked synchronously from `step`, after the system has
//! released its internal borrow, so a listener may freely call back into the
//! system. For a given tick:
//!
//! 1. every spring advances, in registration order;
//! 2. `on_update` fires for every spring that advanced, in registration order;
//! 3. `on_activate` / `on_at_rest` fire, in registration order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::config::SystemConfig;
use crate::error::Result;
use crate::spring::{Advance, Spring};

new_key_type! {
    /// Handle to a spring registered with a [`SpringSystem`]
    pub struct SpringId;
}

impl SpringId {
    /// Convert to raw u64 for logging and external storage
    pub fn to_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Receives a spring's per-step updates and lifecycle transitions
///
/// All methods default to no-ops.
pub trait SpringListener {
    /// The spring advanced; `value` is its new current value
    fn on_update(&self, _id: SpringId, _value: f32) {}

    /// The spring left its resting state
    fn on_activate(&self, _id: SpringId) -> Result<()> {
        Ok(())
    }

    /// The spring came to rest
    fn on_at_rest(&self, _id: SpringId) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// Source of monotonic time for [`SpringSystem::tick`]
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Move back to the origin
    pub fn reset(&self) {
        self.now.set(Duration::ZERO);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ============================================================================
// SpringSystem
// ============================================================================

struct SpringNode {
    spring: Spring,
    listeners: SmallVec<[Rc<dyn SpringListener>; 2]>,
}

struct SystemInner {
    springs: SlotMap<SpringId, SpringNode>,
    /// Registration order
    order: Vec<SpringId>,
    config: SystemConfig,
    clock: Rc<dyn Clock>,
    last_tick: Duration,
}

/// One spring's outcome for the current tick
struct Stepped {
    id: SpringId,
    advance: Advance,
    listeners: SmallVec<[Rc<dyn SpringListener>; 2]>,
}

/// Shared stepping loop for springs (cheap to clone, single-threaded)
///
/// # Example
///
/// ```rust
/// use recoil_spring::system::SpringSystem;
///
/// let system = SpringSystem::new();
/// let id = system.create_spring();
/// system.with_spring_mut(id, |s| s.set_end_value(1.0));
///
/// let mut frames = 0;
/// while system.step(0.016).unwrap() {
///     frames += 1;
/// }
///
/// assert!(frames > 0);
/// assert_eq!(system.spring(id).unwrap().current_value(), 1.0);
/// ```
#[derive(Clone)]
pub struct SpringSystem {
    inner: Rc<RefCell<SystemInner>>,
}

impl SpringSystem {
    /// Create a system with default configuration, ticking on wall-clock time
    pub fn new() -> Self {
        Self::build(SystemConfig::default(), Rc::new(SystemClock::new()))
    }

    /// Create a system with default configuration and the given clock
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::build(SystemConfig::default(), Rc::new(clock))
    }

    /// Create a system with a validated configuration and the given clock
    pub fn with_config(config: SystemConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, Rc::new(clock)))
    }

    fn build(config: SystemConfig, clock: Rc<dyn Clock>) -> Self {
        let last_tick = clock.now();
        Self {
            inner: Rc::new(RefCell::new(SystemInner {
                springs: SlotMap::with_key(),
                order: Vec::new(),
                config,
                clock,
                last_tick,
            })),
        }
    }

    pub fn config(&self) -> SystemConfig {
        self.inner.borrow().config
    }

    /// Create a resting spring with the system's default coefficients
    pub fn create_spring(&self) -> SpringId {
        let mut inner = self.inner.borrow_mut();
        let config = inner.config;
        let spring = Spring::new(config.default_spring).with_rest_thresholds(
            config.rest_speed_threshold,
            config.rest_displacement_threshold,
        );
        let id = inner.springs.insert(SpringNode {
            spring,
            listeners: SmallVec::new(),
        });
        inner.order.push(id);
        id
    }

    /// Attach a listener to a spring, returns `false` if the spring does not exist
    pub fn add_listener(&self, id: SpringId, listener: Rc<dyn SpringListener>) -> bool {
        match self.inner.borrow_mut().springs.get_mut(id) {
            Some(node) => {
                node.listeners.push(listener);
                true
            }
            None => false,
        }
    }

    /// Copy of a spring's current state
    pub fn spring(&self, id: SpringId) -> Option<Spring> {
        self.inner.borrow().springs.get(id).map(|n| n.spring)
    }

    pub fn with_spring<F, R>(&self, id: SpringId, f: F) -> Option<R>
    where
        F: FnOnce(&Spring) -> R,
    {
        self.inner.borrow().springs.get(id).map(|n| f(&n.spring))
    }

    /// Apply a function to modify a spring if it exists
    ///
    /// Changes take effect on the next step; no listener runs from here.
    pub fn with_spring_mut<F, R>(&self, id: SpringId, f: F) -> Option<R>
    where
        F: FnOnce(&mut Spring) -> R,
    {
        self.inner
            .borrow_mut()
            .springs
            .get_mut(id)
            .map(|n| f(&mut n.spring))
    }

    pub fn spring_count(&self) -> usize {
        self.inner.borrow().springs.len()
    }

    /// Whether every spring is at rest with nothing left to report
    pub fn is_idle(&self) -> bool {
        self.inner
            .borrow()
            .springs
            .values()
            .all(|n| n.spring.is_idle())
    }

    /// Advance all springs by `dt` seconds
    ///
    /// Returns `true` if any spring still needs stepping. A listener error
    /// stops dispatch for the rest of this tick and is returned.
    pub fn step(&self, dt: f32) -> Result<bool> {
        let (stepped, still_active) = {
            let mut inner = self.inner.borrow_mut();
            let inner = &mut *inner;
            let config = inner.config;
            let mut stepped: Vec<Stepped> = Vec::new();

            for &id in &inner.order {
                let Some(node) = inner.springs.get_mut(id) else {
                    continue;
                };
                if let Some(advance) = node.spring.advance(dt, &config) {
                    stepped.push(Stepped {
                        id,
                        advance,
                        listeners: node.listeners.clone(),
                    });
                }
            }

            let still_active = inner.springs.values().any(|n| !n.spring.is_idle());
            (stepped, still_active)
        };

        if !stepped.is_empty() {
            tracing::trace!(springs = stepped.len(), dt, "stepped springs");
        }

        for s in &stepped {
            for listener in &s.listeners {
                listener.on_update(s.id, s.advance.value);
            }
        }

        for s in &stepped {
            if s.advance.activated {
                for listener in &s.listeners {
                    listener.on_activate(s.id)?;
                }
            }
            if s.advance.at_rest {
                for listener in &s.listeners {
                    listener.on_at_rest(s.id)?;
                }
            }
        }

        Ok(still_active)
    }

    /// Advance all springs by the time elapsed on the clock since the previous tick
    pub fn tick(&self) -> Result<bool> {
        let dt = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.clock.now();
            let dt = now.saturating_sub(inner.last_tick);
            inner.last_tick = now;
            dt
        };
        self.step(dt.as_secs_f32())
    }

    /// Forget the previous tick time so the next tick starts from the clock's present
    pub fn reset_clock(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.last_tick = inner.clock.now();
    }
}

impl Default for SpringSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpringSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SpringSystem")
            .field("springs", &inner.springs.len())
            .field("config", &inner.config)
            .finish()
    }
}
