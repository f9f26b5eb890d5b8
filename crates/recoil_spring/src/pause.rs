//! Pause coordination
//!
//! Tracks which gestures pause which properties and the destinations that
//! were withheld from springs while they were paused.

use std::hash::Hash;

use recoil_core::{GestureId, GestureRecognizer, PropertyKey};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::system::SpringId;

/// Many-to-many relation kept in both directions
///
/// `insert` is the only mutator, so the two sides can never disagree.
///
/// ```rust
/// use recoil_spring::pause::PauseGraph;
///
/// let mut graph = PauseGraph::default();
/// graph.insert("pan", "x");
/// graph.insert("pan", "y");
/// graph.insert("pinch", "x");
///
/// assert_eq!(graph.properties_of(&"pan").count(), 2);
/// assert_eq!(graph.sources_of(&"x").count(), 2);
/// assert!(!graph.contains(&"pinch", &"y"));
/// ```
#[derive(Clone, Debug)]
pub struct PauseGraph<S, K> {
    by_source: FxHashMap<S, FxHashSet<K>>,
    by_key: FxHashMap<K, FxHashSet<S>>,
}

impl<S, K> Default for PauseGraph<S, K> {
    fn default() -> Self {
        Self {
            by_source: FxHashMap::default(),
            by_key: FxHashMap::default(),
        }
    }
}

impl<S, K> PauseGraph<S, K>
where
    S: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
{
    /// Record that `source` pauses `key`, returns `false` if already recorded
    pub fn insert(&mut self, source: S, key: K) -> bool {
        let added = self
            .by_source
            .entry(source.clone())
            .or_default()
            .insert(key.clone());
        self.by_key.entry(key).or_default().insert(source);
        added
    }

    pub fn properties_of<'a>(&'a self, source: &S) -> impl Iterator<Item = &'a K> + 'a {
        self.by_source.get(source).into_iter().flatten()
    }

    pub fn sources_of<'a>(&'a self, key: &K) -> impl Iterator<Item = &'a S> + 'a {
        self.by_key.get(key).into_iter().flatten()
    }

    pub fn contains(&self, source: &S, key: &K) -> bool {
        self.by_source
            .get(source)
            .is_some_and(|keys| keys.contains(key))
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Pause bookkeeping for one performer
#[derive(Debug, Default)]
pub(crate) struct PauseCoordinator {
    graph: PauseGraph<GestureId, PropertyKey>,
    gestures: FxHashMap<GestureId, GestureRecognizer>,
    staged: FxHashMap<SpringId, f32>,
}

impl PauseCoordinator {
    /// Record the relation; returns `true` the first time `gesture` is seen
    pub(crate) fn add_relation(&mut self, gesture: &GestureRecognizer, key: PropertyKey) -> bool {
        self.graph.insert(gesture.id(), key);
        if self.gestures.contains_key(&gesture.id()) {
            return false;
        }
        self.gestures.insert(gesture.id(), gesture.clone());
        true
    }

    /// Whether any gesture pausing `key` is in progress
    pub(crate) fn is_suppressed(&self, key: &PropertyKey) -> bool {
        self.graph.sources_of(key).any(|id| {
            self.gestures
                .get(id)
                .is_some_and(|g| g.state().is_active())
        })
    }

    pub(crate) fn properties_of(&self, gesture: GestureId) -> Vec<PropertyKey> {
        self.graph.properties_of(&gesture).cloned().collect()
    }

    /// Stage a destination, replacing any earlier one
    pub(crate) fn stage(&mut self, spring: SpringId, value: f32) {
        self.staged.insert(spring, value);
    }

    /// Stage a destination unless one is already waiting
    pub(crate) fn stage_if_absent(&mut self, spring: SpringId, value: f32) {
        self.staged.entry(spring).or_insert(value);
    }

    pub(crate) fn take_staged(&mut self, spring: SpringId) -> Option<f32> {
        self.staged.remove(&spring)
    }

    pub(crate) fn staged(&self, spring: SpringId) -> Option<f32> {
        self.staged.get(&spring).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recoil_core::GestureState;

    #[test]
    fn test_graph_keeps_both_sides() {
        let mut graph = PauseGraph::default();
        assert!(graph.is_empty());
        assert!(graph.insert(1, "a"));
        assert!(graph.insert(1, "b"));
        assert!(graph.insert(2, "a"));
        assert!(!graph.insert(1, "a"));

        let mut keys: Vec<_> = graph.properties_of(&1).copied().collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);

        let mut sources: Vec<_> = graph.sources_of(&"a").copied().collect();
        sources.sort();
        assert_eq!(sources, vec![1, 2]);

        assert_eq!(graph.sources_of(&"b").count(), 1);
        assert_eq!(graph.properties_of(&3).count(), 0);
    }

    #[test]
    fn test_suppressed_while_any_source_active() {
        let mut pause = PauseCoordinator::default();
        let key = PropertyKey::new("x");
        let pan = GestureRecognizer::new();
        let pinch = GestureRecognizer::new();

        assert!(pause.add_relation(&pan, key.clone()));
        assert!(pause.add_relation(&pinch, key.clone()));
        assert!(!pause.add_relation(&pan, PropertyKey::new("y")));
        assert!(!pause.is_suppressed(&key));

        pan.set_state(GestureState::Began);
        pinch.set_state(GestureState::Changed);
        assert!(pause.is_suppressed(&key));

        pan.set_state(GestureState::Recognized);
        assert!(pause.is_suppressed(&key));

        pinch.set_state(GestureState::Cancelled);
        assert!(!pause.is_suppressed(&key));
        assert!(!pause.is_suppressed(&PropertyKey::new("unrelated")));
    }

    #[test]
    fn test_staging() {
        let mut pause = PauseCoordinator::default();
        let id = SpringId::default();

        pause.stage_if_absent(id, 1.0);
        pause.stage_if_absent(id, 2.0);
        assert_eq!(pause.staged(id), Some(1.0));

        pause.stage(id, 3.0);
        assert_eq!(pause.take_staged(id), Some(3.0));
        assert_eq!(pause.take_staged(id), None);
    }
}
