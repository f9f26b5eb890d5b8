//! Plans
//!
//! Declarative commands handed to a performer. Performers accept any
//! [`Plan`] and downcast to the types they support.

use std::any::Any;
use std::fmt;

use recoil_core::{GestureRecognizer, SpringProperty, TypeConverter};

use crate::spring::SpringConfig;

/// A command a performer may carry out
pub trait Plan: fmt::Debug + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Animate a property towards `destination` (a fraction)
pub struct SpringTo<T> {
    pub property: SpringProperty<T>,
    pub destination: f32,
    /// Coefficients to apply to the spring first, if any
    pub configuration: Option<SpringConfig>,
}

impl<T: 'static> SpringTo<T> {
    pub fn new(property: SpringProperty<T>, destination: f32) -> Self {
        Self {
            property,
            destination,
            configuration: None,
        }
    }

    /// Build a plan from a destination in the property's own value type
    ///
    /// ```rust
    /// use recoil_core::{SpringProperty, UnitByte};
    /// use recoil_spring::plan::SpringTo;
    ///
    /// struct Led {
    ///     level: u8,
    /// }
    ///
    /// let level = SpringProperty::with_converter(
    ///     "level",
    ///     |l: &Led| l.level,
    ///     |l: &mut Led, v: u8| l.level = v,
    ///     UnitByte,
    /// );
    /// let plan = SpringTo::converted(level, &UnitByte, 255);
    /// assert_eq!(plan.destination, 1.0);
    /// ```
    pub fn converted<V, C>(property: SpringProperty<T>, converter: &C, value: V) -> Self
    where
        C: TypeConverter<V>,
    {
        Self::new(property, converter.convert(&value))
    }

    pub fn with_configuration(mut self, configuration: SpringConfig) -> Self {
        self.configuration = Some(configuration);
        self
    }
}

impl<T> Clone for SpringTo<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            destination: self.destination,
            configuration: self.configuration,
        }
    }
}

impl<T> fmt::Debug for SpringTo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpringTo")
            .field("property", &self.property.name())
            .field("destination", &self.destination)
            .field("configuration", &self.configuration)
            .finish()
    }
}

impl<T: 'static> Plan for SpringTo<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Change a property's spring coefficients without moving it
///
/// `None` leaves a coefficient unchanged.
pub struct ConfigureSpring<T> {
    pub property: SpringProperty<T>,
    pub tension: Option<f32>,
    pub friction: Option<f32>,
}

impl<T> ConfigureSpring<T> {
    pub fn new(property: SpringProperty<T>) -> Self {
        Self {
            property,
            tension: None,
            friction: None,
        }
    }

    pub fn tension(mut self, tension: f32) -> Self {
        self.tension = Some(tension);
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction);
        self
    }
}

impl<T> Clone for ConfigureSpring<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            tension: self.tension,
            friction: self.friction,
        }
    }
}

impl<T> fmt::Debug for ConfigureSpring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigureSpring")
            .field("property", &self.property.name())
            .field("tension", &self.tension)
            .field("friction", &self.friction)
            .finish()
    }
}

impl<T: 'static> Plan for ConfigureSpring<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Pause a property's spring while `gesture` is in progress
pub struct PausesSpring<T> {
    pub property: SpringProperty<T>,
    pub gesture: GestureRecognizer,
}

impl<T> PausesSpring<T> {
    pub fn new(property: SpringProperty<T>, gesture: GestureRecognizer) -> Self {
        Self { property, gesture }
    }
}

impl<T> Clone for PausesSpring<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
            gesture: self.gesture.clone(),
        }
    }
}

impl<T> fmt::Debug for PausesSpring<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PausesSpring")
            .field("property", &self.property.name())
            .field("gesture", &self.gesture.id())
            .finish()
    }
}

impl<T: 'static> Plan for PausesSpring<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recoil_core::Round;

    struct Counter {
        count: i32,
    }

    fn count() -> SpringProperty<Counter> {
        SpringProperty::with_converter(
            "count",
            |c: &Counter| c.count,
            |c: &mut Counter, v: i32| c.count = v,
            Round,
        )
    }

    #[test]
    fn test_downcast() {
        let plan: Box<dyn Plan> = Box::new(SpringTo::new(count(), 4.0));

        assert!(plan.as_any().downcast_ref::<SpringTo<Counter>>().is_some());
        assert!(plan
            .as_any()
            .downcast_ref::<ConfigureSpring<Counter>>()
            .is_none());
    }

    #[test]
    fn test_converted_destination() {
        let plan = SpringTo::converted(count(), &Round, 7);
        assert_eq!(plan.destination, 7.0);
        assert!(plan.configuration.is_none());
    }

    #[test]
    fn test_configure_builder() {
        let plan = ConfigureSpring::new(count()).friction(12.0);
        assert_eq!(plan.tension, None);
        assert_eq!(plan.friction, Some(12.0));
        assert_eq!(
            format!("{plan:?}"),
            "ConfigureSpring { property: \"count\", tension: None, friction: Some(12.0) }"
        );
    }
}
