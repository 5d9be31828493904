use std::collections::HashMap;
use std::hash::Hash;

/// The associative-container capabilities the cache and lock map need from
/// their backing store.
///
/// Any conforming container can be substituted, which is how key types
/// without a native [`Hash`]/[`Eq`] get supported: adapt them onto a
/// hashable representation with [`MapAdapter`].
pub trait MapLike<K, V> {
    /// Removes all entries.
    fn clear(&mut self);

    /// Removes the entry for `key`, returning its value if one was present.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Returns a reference to the value stored for `key`.
    fn get(&self, key: &K) -> Option<&V>;

    /// Returns whether an entry for `key` is present.
    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a value for `key`, returning the value it displaced, if any.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// The number of entries in the container.
    fn len(&self) -> usize;

    /// Returns whether the container holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the stored values.
    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_>;
}

impl<K: Eq + Hash, V> MapLike<K, V> for HashMap<K, V> {
    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        HashMap::remove(self, key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        HashMap::get(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        HashMap::contains_key(self, key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        HashMap::insert(self, key, value)
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn is_empty(&self) -> bool {
        HashMap::is_empty(self)
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        Box::new(HashMap::values(self))
    }
}

/// A [`MapLike`] store for arbitrary key types, backed by a [`HashMap`] over
/// an adapted key representation.
///
/// The adapter function must map distinct keys to distinct representations;
/// a collision silently overwrites the other key's entry and is not
/// detected.
pub struct MapAdapter<K, V, A> {
    adapter: Box<dyn Fn(&K) -> A + Send + Sync>,
    map: HashMap<A, V>,
}

impl<K, V, A: Eq + Hash> MapAdapter<K, V, A> {
    /// Creates an empty store that addresses entries through `adapter`.
    pub fn new<F>(adapter: F) -> Self
    where
        F: Fn(&K) -> A + Send + Sync + 'static,
    {
        Self {
            adapter: Box::new(adapter),
            map: HashMap::new(),
        }
    }
}

impl<K, V, A: Eq + Hash> MapLike<K, V> for MapAdapter<K, V, A> {
    fn clear(&mut self) {
        self.map.clear();
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let adapted = (self.adapter)(key);
        self.map.remove(&adapted)
    }

    fn get(&self, key: &K) -> Option<&V> {
        let adapted = (self.adapter)(key);
        self.map.get(&adapted)
    }

    fn contains_key(&self, key: &K) -> bool {
        let adapted = (self.adapter)(key);
        self.map.contains_key(&adapted)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        let adapted = (self.adapter)(&key);
        self.map.insert(adapted, value)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn values(&self) -> Box<dyn Iterator<Item = &V> + '_> {
        Box::new(self.map.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_roundtrip() {
        let mut map: MapAdapter<Vec<u8>, &str, usize> = MapAdapter::new(|key: &Vec<u8>| key.len());

        assert!(map.insert(vec![1, 2], "two").is_none());
        assert!(map.insert(vec![1, 2, 3], "three").is_none());

        assert_eq!(map.get(&vec![1, 2]), Some(&"two"));
        assert_eq!(map.get(&vec![1, 2, 3]), Some(&"three"));
        assert!(map.contains_key(&vec![9, 9]));
        assert_eq!(map.len(), 2);

        assert_eq!(map.remove(&vec![0, 0, 0]), Some("three"));
        assert!(map.get(&vec![1, 2, 3]).is_none());

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_adapter_collisions_overwrite() {
        // both keys map to the same representation, so the second insert
        // displaces the first
        let mut map: MapAdapter<&str, u32, usize> = MapAdapter::new(|key: &&str| key.len());

        assert_eq!(map.insert("foo", 1), None);
        assert_eq!(map.insert("bar", 2), Some(1));
        assert_eq!(map.get(&"foo"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_values_iteration() {
        let mut map: MapAdapter<String, u32, String> = MapAdapter::new(|key: &String| key.to_lowercase());

        map.insert("A".to_owned(), 1);
        map.insert("b".to_owned(), 2);

        let mut values: Vec<u32> = map.values().copied().collect();
        values.sort();
        assert_eq!(values, vec![1, 2]);
    }
}
