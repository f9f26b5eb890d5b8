//! Spring system configuration
//!
//! Integration and rest-detection parameters shared by every spring in a
//! [`SpringSystem`](crate::system::SpringSystem), plus the coefficients new
//! springs start with. Loadable from TOML:
//!
//! ```rust
//! use recoil_spring::config::SystemConfig;
//!
//! let config = SystemConfig::from_toml_str(
//!     r#"
//!     solver_timestep = 0.002
//!
//!     [default_spring]
//!     tension = 200.0
//!     friction = 20.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.solver_timestep, 0.002);
//! assert_eq!(config.default_spring.tension, 200.0);
//! assert_eq!(config.max_delta, 0.064);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpringError};
use crate::spring::{validate_coefficient, SpringConfig};

/// Configuration for a spring system
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Longest integration sub-step, in seconds
    pub solver_timestep: f32,
    /// Longest time advanced in one step, in seconds; larger gaps are clamped
    pub max_delta: f32,
    /// Speed under which a spring may be considered at rest
    pub rest_speed_threshold: f32,
    /// Distance from the end value under which a spring may be considered at rest
    pub rest_displacement_threshold: f32,
    /// Coefficients for newly created springs
    pub default_spring: SpringConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            solver_timestep: 0.001,
            max_delta: 0.064,
            rest_speed_threshold: 0.005,
            rest_displacement_threshold: 0.005,
            default_spring: SpringConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Parse and validate a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SystemConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_solver_timestep(mut self, seconds: f32) -> Self {
        self.solver_timestep = seconds;
        self
    }

    pub fn with_max_delta(mut self, seconds: f32) -> Self {
        self.max_delta = seconds;
        self
    }

    pub fn with_rest_thresholds(mut self, speed: f32, displacement: f32) -> Self {
        self.rest_speed_threshold = speed;
        self.rest_displacement_threshold = displacement;
        self
    }

    pub fn with_default_spring(mut self, spring: SpringConfig) -> Self {
        self.default_spring = spring;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.solver_timestep.is_finite() && self.solver_timestep > 0.0) {
            return Err(SpringError::InvalidConfig(format!(
                "solver_timestep must be positive (got {})",
                self.solver_timestep
            )));
        }
        if !(self.max_delta.is_finite() && self.max_delta > 0.0) {
            return Err(SpringError::InvalidConfig(format!(
                "max_delta must be positive (got {})",
                self.max_delta
            )));
        }
        validate_coefficient("rest_speed_threshold", self.rest_speed_threshold)?;
        validate_coefficient(
            "rest_displacement_threshold",
            self.rest_displacement_threshold,
        )?;
        self.default_spring.validate()
    }
}
