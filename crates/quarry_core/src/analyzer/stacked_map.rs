//! Layered map backing lexical scopes.
//!
//! A [`StackedMap`] is a stack of hash-map layers.  Writes go to the top
//! layer; reads search downward and cache what they find in the top layer.
//! Deleting a key that may live in an outer layer writes a tombstone so the
//! outer binding stays hidden until the layer is popped.
//!
//! Child maps share their parents' layers through [`Rc`], so entering a scope
//! is `O(depth)` pointer copies and never clones entries.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
enum Slot<V> {
    Value(V),
    Tombstone,
}

type Layer<K, V> = Rc<RefCell<FxHashMap<K, Slot<V>>>>;

/// A stack of map layers with tombstone deletion.
#[derive(Debug)]
pub struct StackedMap<K, V> {
    stack: Vec<Layer<K, V>>,
}

impl<K, V> Default for StackedMap<K, V> {
    fn default() -> Self {
        Self {
            stack: vec![Rc::new(RefCell::new(FxHashMap::default()))],
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> StackedMap<K, V> {
    /// An empty single-layer map.
    pub fn new() -> Self {
        Self::default()
    }

    fn top(&self) -> &Layer<K, V> {
        // The stack is never empty: construction pushes one layer and
        // `compress` replaces the stack with exactly one.
        &self.stack[self.stack.len() - 1]
    }

    /// Number of layers, the top one included.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bind `key` in the top layer.
    pub fn set(&mut self, key: K, value: V) {
        self.top().borrow_mut().insert(key, Slot::Value(value));
    }

    /// Unbind `key` as seen from this layer.
    ///
    /// In a single-layer map the entry is simply removed; otherwise a
    /// tombstone shadows any outer binding.
    pub fn delete<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if self.stack.len() > 1 {
            self.top().borrow_mut().insert(key.to_owned(), Slot::Tombstone);
        } else {
            self.top().borrow_mut().remove(key);
        }
    }

    /// Look `key` up through all layers.
    ///
    /// The outcome, a miss included, is cached in the top layer.
    pub fn lookup<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(slot) = RefCell::borrow(self.top()).get(key) {
            return match slot {
                Slot::Value(v) => Some(v.clone()),
                Slot::Tombstone => None,
            };
        }
        if self.stack.len() == 1 {
            return None;
        }
        let found = self.stack[..self.stack.len() - 1]
            .iter()
            .rev()
            .find_map(|layer| RefCell::borrow(layer).get(key).cloned());
        let slot = found.unwrap_or(Slot::Tombstone);
        self.top().borrow_mut().insert(key.to_owned(), slot.clone());
        match slot {
            Slot::Value(v) => Some(v),
            Slot::Tombstone => None,
        }
    }

    /// Whether `key` is bound in any layer and not shadowed by a tombstone.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        self.lookup(key).is_some()
    }

    /// A new map whose bottom layers are this map's layers.
    pub fn create_child(&self) -> Self {
        let mut stack = self.stack.clone();
        stack.push(Rc::new(RefCell::new(FxHashMap::default())));
        Self { stack }
    }

    /// Flatten all layers into one, dropping tombstones.
    ///
    /// Lookups are unaffected.  Only call this when no child map is alive,
    /// since children keep referring to the old layers.
    pub fn compress(&mut self) {
        if self.stack.len() == 1 {
            return;
        }
        let mut merged = FxHashMap::default();
        for layer in &self.stack {
            for (key, slot) in RefCell::borrow(layer).iter() {
                match slot {
                    Slot::Value(_) => {
                        merged.insert(key.clone(), slot.clone());
                    }
                    Slot::Tombstone => {
                        merged.remove(key);
                    }
                }
            }
        }
        self.stack = vec![Rc::new(RefCell::new(merged))];
    }

    /// All visible keys, in no particular order.
    pub fn keys(&self) -> Vec<K> {
        let mut visible: FxHashMap<K, bool> = FxHashMap::default();
        for layer in &self.stack {
            for (key, slot) in RefCell::borrow(layer).iter() {
                visible.insert(key.clone(), matches!(slot, Slot::Value(_)));
            }
        }
        visible
            .into_iter()
            .filter_map(|(key, live)| live.then_some(key))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_lookup_single_layer() {
        let mut map = StackedMap::new();
        map.set("a", 1);
        assert_eq!(map.lookup(&"a"), Some(1));
        assert_eq!(map.lookup(&"b"), None);
        map.delete(&"a");
        assert!(!map.has(&"a"));
    }

    #[test]
    fn test_child_sees_parent_bindings() {
        let mut parent = StackedMap::new();
        parent.set("x", 1);
        let child = parent.create_child();
        assert_eq!(child.lookup(&"x"), Some(1));
        assert_eq!(child.depth(), 2);
    }

    #[test]
    fn test_child_shadowing_does_not_leak_to_parent() {
        let mut parent = StackedMap::new();
        parent.set("x", 1);
        let mut child = parent.create_child();
        child.set("x", 2);
        child.set("y", 3);
        assert_eq!(child.lookup(&"x"), Some(2));
        drop(child);
        assert_eq!(parent.lookup(&"x"), Some(1));
        assert_eq!(parent.lookup(&"y"), None);
    }

    #[test]
    fn test_delete_in_child_writes_tombstone() {
        let mut parent = StackedMap::new();
        parent.set("x", 1);
        let mut child = parent.create_child();
        child.delete(&"x");
        assert!(!child.has(&"x"));
        assert_eq!(parent.lookup(&"x"), Some(1));
    }

    #[test]
    fn test_cached_miss_is_overwritten_by_set() {
        let parent: StackedMap<&str, i32> = StackedMap::new();
        let mut child = parent.create_child();
        assert_eq!(child.lookup(&"late"), None);
        child.set("late", 7);
        assert_eq!(child.lookup(&"late"), Some(7));
    }

    #[test]
    fn test_compress_preserves_lookups() {
        let mut root = StackedMap::new();
        root.set("a", 1);
        root.set("b", 2);
        let mut mid = root.create_child();
        mid.delete(&"a");
        mid.set("c", 3);
        let mut top = mid.create_child();
        top.set("b", 20);

        let before: Vec<_> = ["a", "b", "c"].iter().map(|k| top.lookup(k)).collect();
        top.compress();
        let after: Vec<_> = ["a", "b", "c"].iter().map(|k| top.lookup(k)).collect();
        assert_eq!(before, after);
        assert_eq!(top.depth(), 1);

        let mut keys = top.keys();
        keys.sort();
        assert_eq!(keys, vec!["b", "c"]);
    }
}
