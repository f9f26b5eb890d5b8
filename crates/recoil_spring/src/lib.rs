//! Recoil Spring
//!
//! Spring-driven property animation that gestures can pause and resume.
//!
//! # Features
//!
//! - **Spring Physics**: RK4-integrated springs with tension and friction
//! - **Spring System**: Steps every spring together from an injectable clock
//! - **Plans**: `SpringTo`, `ConfigureSpring` and `PausesSpring` commands
//! - **One Spring Per Property**: Created on first use, reused afterwards
//! - **Gesture Pausing**: Springs freeze while a gesture is in progress and
//!   resume towards their last destination when it ends
//! - **Activity Tokens**: Active springs hold a token so the host knows when
//!   everything is idle
//! - **MotionRuntime**: One performer per target over a shared spring system

pub mod config;
pub mod error;
pub mod pause;
pub mod performer;
pub mod plan;
mod registry;
pub mod runtime;
pub mod spring;
pub mod system;
mod tokens;

pub use config::SystemConfig;
pub use error::{Result, SpringError};
pub use pause::PauseGraph;
pub use performer::SpringPerformer;
pub use plan::{ConfigureSpring, PausesSpring, Plan, SpringTo};
pub use runtime::{MotionRuntime, RuntimeState};
pub use spring::{Advance, Spring, SpringConfig};
pub use system::{Clock, ManualClock, SpringId, SpringListener, SpringSystem, SystemClock};
