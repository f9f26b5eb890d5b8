//! Property bindings
//!
//! A [`SpringProperty`] maps a logical animatable attribute to read/write
//! access on a target object. Springs only ever deal in `f32` fractions, so
//! every binding carries a [`TypeConverter`] between the field's value type
//! and its fraction.
//!
//! Properties are identified by their [`PropertyKey`] (their name): two
//! bindings with the same name are the same property as far as springs and
//! pause relations are concerned.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use smallvec::SmallVec;

// ============================================================================
// Converters
// ============================================================================

/// Converts a value type to a float fraction and back again
pub trait TypeConverter<V> {
    /// Converts a value to its fraction
    fn convert(&self, value: &V) -> f32;

    /// Converts a fraction back to a value
    fn convert_back(&self, fraction: f32) -> V;
}

/// `f32` to `f32`
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl TypeConverter<f32> for Identity {
    fn convert(&self, value: &f32) -> f32 {
        *value
    }

    fn convert_back(&self, fraction: f32) -> f32 {
        fraction
    }
}

/// `f64` fields, narrowed to `f32` while animating
#[derive(Clone, Copy, Debug, Default)]
pub struct Widen;

impl TypeConverter<f64> for Widen {
    fn convert(&self, value: &f64) -> f32 {
        *value as f32
    }

    fn convert_back(&self, fraction: f32) -> f64 {
        fraction as f64
    }
}

/// Integer fields, rounded to the nearest whole value on write
#[derive(Clone, Copy, Debug, Default)]
pub struct Round;

impl TypeConverter<i32> for Round {
    fn convert(&self, value: &i32) -> f32 {
        *value as f32
    }

    fn convert_back(&self, fraction: f32) -> i32 {
        fraction.round() as i32
    }
}

/// Byte channels (0..=255) mapped onto 0.0..=1.0
///
/// Overshoot beyond the unit range saturates.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitByte;

impl TypeConverter<u8> for UnitByte {
    fn convert(&self, value: &u8) -> f32 {
        *value as f32 / 255.0
    }

    fn convert_back(&self, fraction: f32) -> u8 {
        (fraction * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

// ============================================================================
// Fraction access
// ============================================================================

/// Type-erased fraction access to one or more fields of `T`
trait FractionAccess<T> {
    fn read(&self, target: &T) -> f32;
    fn write(&self, target: &mut T, fraction: f32);
    fn arity(&self) -> usize {
        1
    }
}

/// A single field with its converter
struct Field<T, V, C> {
    get: fn(&T) -> V,
    set: fn(&mut T, V),
    converter: C,
}

impl<T, V, C: TypeConverter<V>> FractionAccess<T> for Field<T, V, C> {
    fn read(&self, target: &T) -> f32 {
        self.converter.convert(&(self.get)(target))
    }

    fn write(&self, target: &mut T, fraction: f32) {
        (self.set)(target, self.converter.convert_back(fraction));
    }
}

/// Several bindings driven by one fraction
///
/// Reads defer to the first binding, writes fan out to all of them in order.
struct Combined<T> {
    parts: SmallVec<[Rc<dyn FractionAccess<T>>; 2]>,
}

impl<T> FractionAccess<T> for Combined<T> {
    fn read(&self, target: &T) -> f32 {
        self.parts[0].read(target)
    }

    fn write(&self, target: &mut T, fraction: f32) {
        for part in &self.parts {
            part.write(target, fraction);
        }
    }

    fn arity(&self) -> usize {
        self.parts.iter().map(|p| p.arity()).sum()
    }
}

// ============================================================================
// SpringProperty
// ============================================================================

/// Identity of an animatable property
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyKey(Cow<'static, str>);

impl PropertyKey {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PropertyKey {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

/// An animatable property of targets of type `T`
///
/// Cheap to clone; equality and hashing go through the [`PropertyKey`].
///
/// # Example
///
/// ```rust
/// use recoil_core::property::{SpringProperty, UnitByte};
///
/// struct Sprite {
///     scale_x: f32,
///     scale_y: f32,
///     opacity: u8,
/// }
///
/// let scale_x = SpringProperty::new("scale_x", |s: &Sprite| s.scale_x, |s: &mut Sprite, v| s.scale_x = v);
/// let scale_y = SpringProperty::new("scale_y", |s: &Sprite| s.scale_y, |s: &mut Sprite, v| s.scale_y = v);
/// let scale = SpringProperty::combined("scale", [scale_x, scale_y]);
///
/// let opacity = SpringProperty::with_converter(
///     "opacity",
///     |s: &Sprite| s.opacity,
///     |s: &mut Sprite, v| s.opacity = v,
///     UnitByte,
/// );
///
/// let mut sprite = Sprite { scale_x: 1.0, scale_y: 1.0, opacity: 255 };
/// scale.write_fraction(&mut sprite, 0.5);
/// opacity.write_fraction(&mut sprite, 0.0);
///
/// assert_eq!((sprite.scale_x, sprite.scale_y), (0.5, 0.5));
/// assert_eq!(sprite.opacity, 0);
/// ```
pub struct SpringProperty<T> {
    key: PropertyKey,
    access: Rc<dyn FractionAccess<T>>,
}

impl<T: 'static> SpringProperty<T> {
    /// Create a property for an `f32` field
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        get: fn(&T) -> f32,
        set: fn(&mut T, f32),
    ) -> Self {
        Self::with_converter(name, get, set, Identity)
    }

    /// Create a property for a field of any value type
    pub fn with_converter<V, C>(
        name: impl Into<Cow<'static, str>>,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
        converter: C,
    ) -> Self
    where
        V: 'static,
        C: TypeConverter<V> + 'static,
    {
        Self {
            key: PropertyKey::new(name),
            access: Rc::new(Field {
                get,
                set,
                converter,
            }),
        }
    }

    /// Treat several properties as one
    ///
    /// # Panics
    ///
    /// Panics if `parts` is empty.
    pub fn combined(
        name: impl Into<Cow<'static, str>>,
        parts: impl IntoIterator<Item = SpringProperty<T>>,
    ) -> Self {
        let parts: SmallVec<[Rc<dyn FractionAccess<T>>; 2]> =
            parts.into_iter().map(|p| p.access).collect();
        assert!(
            !parts.is_empty(),
            "a combined property needs at least one underlying property"
        );

        Self {
            key: PropertyKey::new(name),
            access: Rc::new(Combined { parts }),
        }
    }
}

impl<T> SpringProperty<T> {
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.as_str()
    }

    /// Number of underlying fields written by this property
    pub fn arity(&self) -> usize {
        self.access.arity()
    }

    /// Read the target's current value as a fraction
    pub fn read_fraction(&self, target: &T) -> f32 {
        self.access.read(target)
    }

    /// Write a fraction back to the target
    pub fn write_fraction(&self, target: &mut T, fraction: f32) {
        self.access.write(target, fraction);
    }
}

impl<T> Clone for SpringProperty<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            access: Rc::clone(&self.access),
        }
    }
}

impl<T> PartialEq for SpringProperty<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for SpringProperty<T> {}

impl<T> Hash for SpringProperty<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for SpringProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpringProperty")
            .field("key", &self.key)
            .field("arity", &self.arity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Square {
        x: f64,
        scale_x: f32,
        scale_y: f32,
        depth: i32,
        alpha: u8,
    }

    fn scale_x() -> SpringProperty<Square> {
        SpringProperty::new(
            "scale_x",
            |s: &Square| s.scale_x,
            |s: &mut Square, v| s.scale_x = v,
        )
    }

    fn scale_y() -> SpringProperty<Square> {
        SpringProperty::new(
            "scale_y",
            |s: &Square| s.scale_y,
            |s: &mut Square, v| s.scale_y = v,
        )
    }

    #[test]
    fn test_identity_round_trip() {
        let prop = scale_x();
        let mut square = Square::default();

        prop.write_fraction(&mut square, 0.75);
        assert_eq!(square.scale_x, 0.75);
        assert_eq!(prop.read_fraction(&square), 0.75);
    }

    #[test]
    fn test_combined_writes_all_reads_first() {
        let scale = SpringProperty::combined("scale", [scale_x(), scale_y()]);
        let mut square = Square::default();

        scale.write_fraction(&mut square, 2.0);
        assert_eq!(square.scale_x, 2.0);
        assert_eq!(square.scale_y, 2.0);

        square.scale_y = 5.0;
        assert_eq!(scale.read_fraction(&square), 2.0);
        assert_eq!(scale.arity(), 2);
    }

    #[test]
    #[should_panic(expected = "at least one")]
    fn test_empty_combined_panics() {
        let _ = SpringProperty::<Square>::combined("nothing", Vec::new());
    }

    #[test]
    fn test_converters() {
        let x = SpringProperty::with_converter(
            "x",
            |s: &Square| s.x,
            |s: &mut Square, v| s.x = v,
            Widen,
        );
        let depth = SpringProperty::with_converter(
            "depth",
            |s: &Square| s.depth,
            |s: &mut Square, v| s.depth = v,
            Round,
        );
        let alpha = SpringProperty::with_converter(
            "alpha",
            |s: &Square| s.alpha,
            |s: &mut Square, v| s.alpha = v,
            UnitByte,
        );
        let mut square = Square::default();

        x.write_fraction(&mut square, 12.5);
        depth.write_fraction(&mut square, 2.6);
        alpha.write_fraction(&mut square, 1.2);

        assert_eq!(square.x, 12.5);
        assert_eq!(square.depth, 3);
        assert_eq!(square.alpha, 255);
        assert_eq!(alpha.read_fraction(&square), 1.0);
    }

    #[test]
    fn test_equality_is_by_key() {
        let a = scale_x();
        let b = SpringProperty::new(
            "scale_x",
            |s: &Square| s.scale_y,
            |s: &mut Square, v| s.scale_y = v,
        );

        assert_eq!(a, b);
        assert_ne!(a, scale_y());

        let set: HashSet<_> = [a, b, scale_y()].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
