//! Spring registry
//!
//! One spring per property of a target, created on first use and kept for
//! the registry's lifetime.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use recoil_core::{PropertyKey, SpringProperty};
use rustc_hash::FxHashMap;

use crate::system::{SpringId, SpringListener, SpringSystem};

/// Writes a spring's value into the target's property on every step
struct WriteBack<T> {
    target: Weak<RefCell<T>>,
    property: SpringProperty<T>,
}

impl<T> SpringListener for WriteBack<T> {
    fn on_update(&self, id: SpringId, value: f32) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        match target.try_borrow_mut() {
            Ok(mut target) => self.property.write_fraction(&mut target, value),
            Err(_) => tracing::warn!(
                spring = id.to_raw(),
                property = self.property.name(),
                "target borrowed during step, update skipped"
            ),
        };
    }
}

struct Entry<T> {
    id: SpringId,
    property: SpringProperty<T>,
}

/// Springs keyed by property for a single target
pub(crate) struct SpringRegistry<T> {
    system: SpringSystem,
    target: Weak<RefCell<T>>,
    lifecycle: Rc<dyn SpringListener>,
    entries: FxHashMap<PropertyKey, Entry<T>>,
}

impl<T: 'static> SpringRegistry<T> {
    pub(crate) fn new(
        system: SpringSystem,
        target: Weak<RefCell<T>>,
        lifecycle: Rc<dyn SpringListener>,
    ) -> Self {
        Self {
            system,
            target,
            lifecycle,
            entries: FxHashMap::default(),
        }
    }

    /// The spring driving `property`, creating it on first use
    pub(crate) fn get_or_create(&mut self, property: &SpringProperty<T>) -> SpringId {
        if let Some(entry) = self.entries.get(property.key()) {
            return entry.id;
        }

        let id = self.system.create_spring();
        self.system.add_listener(id, self.lifecycle.clone());
        self.system.add_listener(
            id,
            Rc::new(WriteBack {
                target: self.target.clone(),
                property: property.clone(),
            }),
        );
        tracing::debug!(
            spring = id.to_raw(),
            property = property.name(),
            "created spring"
        );

        self.entries.insert(
            property.key().clone(),
            Entry {
                id,
                property: property.clone(),
            },
        );
        id
    }
}

impl<T> SpringRegistry<T> {
    pub(crate) fn get(&self, key: &PropertyKey) -> Option<SpringId> {
        self.entries.get(key).map(|e| e.id)
    }

    /// The spring for `key` together with the property it writes to
    pub(crate) fn entry(&self, key: &PropertyKey) -> Option<(SpringId, &SpringProperty<T>)> {
        self.entries.get(key).map(|e| (e.id, &e.property))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dot {
        x: f32,
        y: f32,
    }

    struct Silent;

    impl SpringListener for Silent {}

    fn registry() -> (SpringRegistry<Dot>, SpringSystem, Rc<RefCell<Dot>>) {
        let system = SpringSystem::new();
        let dot = Rc::new(RefCell::new(Dot { x: 0.0, y: 0.0 }));
        let registry = SpringRegistry::new(system.clone(), Rc::downgrade(&dot), Rc::new(Silent));
        (registry, system, dot)
    }

    #[test]
    fn test_same_property_reuses_spring() {
        let (mut registry, system, _dot) = registry();
        let x = SpringProperty::new("x", |d: &Dot| d.x, |d: &mut Dot, v| d.x = v);

        assert!(registry.is_empty());
        let first = registry.get_or_create(&x);
        let second = registry.get_or_create(&x.clone());

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(system.spring_count(), 1);
        assert_eq!(registry.get(x.key()), Some(first));
        assert_eq!(registry.entry(x.key()).map(|(_, p)| p.name()), Some("x"));
    }

    #[test]
    fn test_new_property_adds_spring() {
        let (mut registry, system, _dot) = registry();
        let x = SpringProperty::new("x", |d: &Dot| d.x, |d: &mut Dot, v| d.x = v);
        let y = SpringProperty::new("y", |d: &Dot| d.y, |d: &mut Dot, v| d.y = v);

        let a = registry.get_or_create(&x);
        let b = registry.get_or_create(&y);

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(system.spring_count(), 2);
        assert_eq!(registry.get(&PropertyKey::new("z")), None);
    }

    #[test]
    fn test_spring_writes_to_target() {
        let (mut registry, system, dot) = registry();
        let x = SpringProperty::new("x", |d: &Dot| d.x, |d: &mut Dot, v| d.x = v);

        let id = registry.get_or_create(&x);
        system.with_spring_mut(id, |s| s.set_end_value(10.0));
        while system.step(0.016).unwrap() {}

        assert_eq!(dot.borrow().x, 10.0);
        assert_eq!(dot.borrow().y, 0.0);
    }

    #[test]
    fn test_dropped_target_is_ignored() {
        let (mut registry, system, dot) = registry();
        let x = SpringProperty::new("x", |d: &Dot| d.x, |d: &mut Dot, v| d.x = v);

        let id = registry.get_or_create(&x);
        drop(dot);
        system.with_spring_mut(id, |s| s.set_end_value(10.0));
        assert!(system.step(0.016).unwrap());
    }
}
