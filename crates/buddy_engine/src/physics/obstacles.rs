use std::rc::{Rc, Weak};

use tracing::debug;

use crate::geometry::Rect;

/// A UI element Buddy can stand on. The owning element keeps the `Rc`; the
/// registry only holds weak references, so dropping the element removes it
/// from collision without touching the registry.
#[derive(Debug)]
pub struct Collidable {
    name: String,
    bounds: Rect,
}

impl Collidable {
    pub fn new(name: impl Into<String>, bounds: Rect) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            bounds,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

/// Source of the current collidable set, consulted by [`ObstacleRegistry::refresh`].
pub trait ObstacleProvider {
    fn collidables(&self) -> Vec<Rc<Collidable>>;
}

#[derive(Debug, Default)]
pub struct ObstacleRegistry {
    entries: Vec<Weak<Collidable>>,
}

impl ObstacleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the element was already registered.
    pub fn register(&mut self, collidable: &Rc<Collidable>) -> bool {
        let weak = Rc::downgrade(collidable);
        if self.entries.iter().any(|entry| entry.ptr_eq(&weak)) {
            return false;
        }
        self.entries.push(weak);
        debug!(name = collidable.name(), "obstacle_registered");
        true
    }

    pub fn deregister(&mut self, collidable: &Rc<Collidable>) -> bool {
        let weak = Rc::downgrade(collidable);
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.ptr_eq(&weak));
        let removed = self.entries.len() != before;
        if removed {
            debug!(name = collidable.name(), "obstacle_deregistered");
        }
        removed
    }

    /// Replaces the cached set with the provider's. O(elements); call after
    /// layout changes, not per tick.
    pub fn refresh(&mut self, provider: &dyn ObstacleProvider) -> usize {
        let collidables = provider.collidables();
        let names = collidables
            .iter()
            .map(|collidable| collidable.name())
            .collect::<Vec<_>>();
        debug!(obstacle_count = collidables.len(), names = ?names, "obstacles_refreshed");
        self.entries = collidables.iter().map(Rc::downgrade).collect();
        self.entries.len()
    }

    /// Drops entries whose element no longer exists.
    pub fn prune_stale(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.strong_count() > 0);
        before - self.entries.len()
    }

    /// Cached entries in registration order, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Yields each cached obstacle's rectangle, or `None` for an element that
    /// has been dropped. Consumers skip the `None`s.
    pub fn current_obstacles(&self) -> impl Iterator<Item = Option<Rect>> + '_ {
        self.entries
            .iter()
            .map(|entry| entry.upgrade().map(|collidable| collidable.bounds()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(Vec<Rc<Collidable>>);

    impl ObstacleProvider for FixedProvider {
        fn collidables(&self) -> Vec<Rc<Collidable>> {
            self.0.clone()
        }
    }

    fn platform(name: &str) -> Rc<Collidable> {
        Collidable::new(name, Rect::new(10.0, 30.0, 10.0, 20.0))
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = ObstacleRegistry::new();
        let shelf = platform("shelf");
        assert!(registry.register(&shelf));
        assert!(!registry.register(&shelf));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_removes_only_that_element() {
        let mut registry = ObstacleRegistry::new();
        let a = platform("a");
        let b = platform("b");
        registry.register(&a);
        registry.register(&b);

        assert!(registry.deregister(&a));
        assert!(!registry.deregister(&a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn dropped_element_reads_as_stale() {
        let mut registry = ObstacleRegistry::new();
        let kept = platform("kept");
        let dropped = platform("dropped");
        registry.register(&dropped);
        registry.register(&kept);
        drop(dropped);

        let seen = registry.current_obstacles().collect::<Vec<_>>();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].is_none());
        assert_eq!(seen[1], Some(kept.bounds()));

        assert_eq!(registry.prune_stale(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn refresh_replaces_cached_set() {
        let mut registry = ObstacleRegistry::new();
        let old = platform("old");
        registry.register(&old);

        let fresh = vec![platform("x"), platform("y")];
        let count = registry.refresh(&FixedProvider(fresh.clone()));

        assert_eq!(count, 2);
        assert!(!registry.deregister(&old));
        assert!(registry.current_obstacles().all(|entry| entry.is_some()));
    }
}
