//! Spring physics
//!
//! RK4-integrated damped harmonic oscillator with tension/friction
//! coefficients (unit mass). A spring tracks whether it was at rest after its
//! previous advance so it can report activation and rest transitions.

use serde::{Deserialize, Serialize};

use crate::config::SystemConfig;
use crate::error::{Result, SpringError};

/// Tension and friction of a spring
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub tension: f32,
    pub friction: f32,
}

impl SpringConfig {
    /// Default tension, from an origami spring with tension 40 and friction 7
    pub const DEFAULT_TENSION: f32 = 342.0;
    /// Default friction, from an origami spring with tension 40 and friction 7
    pub const DEFAULT_FRICTION: f32 = 30.0;

    pub fn new(tension: f32, friction: f32) -> Self {
        Self { tension, friction }
    }

    /// A gentle, slow spring (good for page transitions)
    pub fn gentle() -> Self {
        Self::new(120.0, 14.0)
    }

    /// A wobbly spring with overshoot (good for playful UI)
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0)
    }

    /// A stiff, snappy spring (good for buttons)
    pub fn stiff() -> Self {
        Self::new(400.0, 30.0)
    }

    /// A slow spring with no overshoot
    pub fn molasses() -> Self {
        Self::new(100.0, 20.0)
    }

    pub fn with_tension(mut self, tension: f32) -> Self {
        self.tension = tension;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Friction at which this spring's tension is critically damped
    pub fn critical_friction(&self) -> f32 {
        2.0 * self.tension.sqrt()
    }

    /// Check if the spring is underdamped (will oscillate)
    pub fn is_underdamped(&self) -> bool {
        self.friction < self.critical_friction()
    }

    /// Check if the spring is overdamped (slow settling, no oscillation)
    pub fn is_overdamped(&self) -> bool {
        self.friction > self.critical_friction()
    }

    /// Reject negative or non-finite coefficients
    pub fn validate(&self) -> Result<()> {
        validate_coefficient("tension", self.tension)?;
        validate_coefficient("friction", self.friction)
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TENSION, Self::DEFAULT_FRICTION)
    }
}

pub(crate) fn validate_coefficient(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SpringError::InvalidConfig(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )))
    }
}

/// Transitions reported by one [`Spring::advance`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Advance {
    /// Value after the advance
    pub value: f32,
    /// The spring left its resting state
    pub activated: bool,
    /// The spring came to rest
    pub at_rest: bool,
}

/// A damped spring
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    end: f32,
    was_at_rest: bool,
    rest_speed_threshold: f32,
    rest_displacement_threshold: f32,
}

impl Spring {
    /// Create a resting spring at 0.0 with the given coefficients
    pub fn new(config: SpringConfig) -> Self {
        let defaults = SystemConfig::default();
        Self {
            config,
            value: 0.0,
            velocity: 0.0,
            end: 0.0,
            was_at_rest: true,
            rest_speed_threshold: defaults.rest_speed_threshold,
            rest_displacement_threshold: defaults.rest_displacement_threshold,
        }
    }

    /// Override the thresholds used to decide whether the spring is at rest
    pub fn with_rest_thresholds(mut self, speed: f32, displacement: f32) -> Self {
        self.rest_speed_threshold = speed;
        self.rest_displacement_threshold = displacement;
        self
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SpringConfig) {
        self.config = config;
    }

    pub fn tension(&self) -> f32 {
        self.config.tension
    }

    pub fn set_tension(&mut self, tension: f32) {
        self.config.tension = tension;
    }

    pub fn friction(&self) -> f32 {
        self.config.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.config.friction = friction;
    }

    pub fn current_value(&self) -> f32 {
        self.value
    }

    pub fn end_value(&self) -> f32 {
        self.end
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity;
    }

    /// Jump to `value`
    ///
    /// With `at_rest`, the end value follows and velocity is cleared, so the
    /// spring stops where it was placed.
    pub fn set_current_value(&mut self, value: f32, at_rest: bool) {
        self.value = value;
        if at_rest {
            self.set_at_rest();
        }
    }

    /// Set the value the spring pulls towards
    pub fn set_end_value(&mut self, end: f32) {
        self.end = end;
    }

    /// Stop in place: the end value becomes the current value and velocity is cleared
    pub fn set_at_rest(&mut self) {
        self.end = self.value;
        self.velocity = 0.0;
    }

    /// Whether the spring is within its rest thresholds
    pub fn is_at_rest(&self) -> bool {
        self.velocity.abs() <= self.rest_speed_threshold
            && ((self.end - self.value).abs() <= self.rest_displacement_threshold
                || self.config.tension == 0.0)
    }

    /// At rest and already reported as such, advancing would do nothing
    pub fn is_idle(&self) -> bool {
        self.was_at_rest && self.is_at_rest()
    }

    /// Integrate forward by `dt` seconds
    ///
    /// `dt` is clamped to `config.max_delta` and integrated in sub-steps no
    /// longer than `config.solver_timestep`. Returns `None` when the spring
    /// was and still is at rest.
    pub fn advance(&mut self, dt: f32, config: &SystemConfig) -> Option<Advance> {
        let resting = self.is_at_rest();
        if resting && self.was_at_rest {
            return None;
        }

        if !resting {
            let dt = dt.clamp(0.0, config.max_delta);
            let steps = (dt / config.solver_timestep).ceil().max(1.0) as u32;
            let h = dt / steps as f32;
            for _ in 0..steps {
                self.integrate(h);
            }
        }

        let at_rest = self.is_at_rest();
        if at_rest {
            if self.config.tension > 0.0 {
                self.value = self.end;
            } else {
                self.end = self.value;
            }
            self.velocity = 0.0;
        }

        let activated = self.was_at_rest;
        self.was_at_rest = at_rest;

        Some(Advance {
            value: self.value,
            activated,
            at_rest,
        })
    }

    /// One RK4 step
    fn integrate(&mut self, dt: f32) {
        let k1_v = self.acceleration(self.value, self.velocity);
        let k1_x = self.velocity;

        let k2_v = self.acceleration(
            self.value + k1_x * dt * 0.5,
            self.velocity + k1_v * dt * 0.5,
        );
        let k2_x = self.velocity + k1_v * dt * 0.5;

        let k3_v = self.acceleration(
            self.value + k2_x * dt * 0.5,
            self.velocity + k2_v * dt * 0.5,
        );
        let k3_x = self.velocity + k2_v * dt * 0.5;

        let k4_v = self.acceleration(self.value + k3_x * dt, self.velocity + k3_v * dt);
        let k4_x = self.velocity + k3_v * dt;

        self.velocity += (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * dt / 6.0;
        self.value += (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * dt / 6.0;
    }

    fn acceleration(&self, x: f32, v: f32) -> f32 {
        -self.config.tension * (x - self.end) - self.config.friction * v
    }
}

impl Default for Spring {
    fn default() -> Self {
        Self::new(SpringConfig::default())
    }
}
