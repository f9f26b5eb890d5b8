//! Recoil Core
//!
//! The collaborators a spring performer talks to, independent of any
//! physics:
//!
//! - **Property Bindings**: Read and write a target's field as a float fraction
//! - **Combined Properties**: Drive several fields from a single fraction
//! - **Gesture Recognizers**: Discrete-state signal sources with transition listeners
//! - **Activity Tokens**: "Work in progress" handles aggregated by an [`ActivityTracker`]
//!
//! # Example
//!
//! ```rust
//! use recoil_core::property::SpringProperty;
//!
//! struct Card {
//!     alpha: f32,
//! }
//!
//! let alpha = SpringProperty::new("alpha", |c: &Card| c.alpha, |c: &mut Card, v| c.alpha = v);
//! let mut card = Card { alpha: 1.0 };
//!
//! alpha.write_fraction(&mut card, 0.25);
//! assert_eq!(alpha.read_fraction(&card), 0.25);
//! ```

pub mod activity;
pub mod gesture;
pub mod property;

pub use activity::{ActivityListenerId, ActivityToken, ActivityTracker, TokenGenerator};
pub use gesture::{GestureId, GestureRecognizer, GestureState, ListenerId};
pub use property::{
    Identity, PropertyKey, Round, SpringProperty, TypeConverter, UnitByte, Widen,
};
