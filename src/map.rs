//! Persistent (immutable) hash map based on a CHAMP trie.
//!
//! This module provides [`ChampMap`], an immutable hash map with structural
//! sharing, and [`TransientChampMap`], its temporarily mutable editor for
//! efficient batch updates.
//!
//! # Overview
//!
//! `ChampMap` is based on CHAMP (Compressed Hash-Array Mapped Prefix-tree),
//! a refinement of HAMT that separates inline entries from sub-node pointers
//! with two bitmaps per node. It uses 32-way branching where 5-bit slices of
//! the key hash navigate the tree.
//!
//! - O(log32 N) get (effectively O(1) for practical sizes)
//! - O(log32 N) insert
//! - O(log32 N) remove
//! - O(1) len and `is_empty`
//!
//! All operations return new maps without modifying the original, and
//! structural sharing ensures memory efficiency.
//!
//! # Examples
//!
//! ```rust
//! use champ_collections::ChampMap;
//!
//! let map = ChampMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(map.get("two"), Some(&2));
//! assert_eq!(map.get("three"), Some(&3));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! # Batch Updates
//!
//! Building a map one persistent insert at a time copies a path per insert.
//! A transient editor shares one ownership token across the whole batch and
//! mutates freshly created nodes in place:
//!
//! ```rust
//! use champ_collections::{ChampMap, TransientChampMap};
//!
//! let mut transient = TransientChampMap::new();
//! for index in 0..100 {
//!     transient.insert(index, index * 2);
//! }
//! let map: ChampMap<i32, i32> = transient.persistent();
//! assert_eq!(map.len(), 100);
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::ReferenceCounter;
use crate::hash::hash_key;
use crate::node::{Change, Node, NodeEntries, OwnershipToken};

// =============================================================================
// ChampMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on a CHAMP trie.
///
/// `ChampMap` is an immutable data structure that uses structural sharing to
/// efficiently support functional programming patterns: every mutating
/// operation returns a new map and leaves every previously obtained version
/// intact.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `contains_key` | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use champ_collections::ChampMap;
///
/// let map = ChampMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
#[derive(Clone)]
pub struct ChampMap<K, V> {
    /// Root node of the trie; `None` is the canonical empty map.
    root: Option<ReferenceCounter<Node<K, V>>>,
    /// Number of entries.
    size: usize,
}

impl<K, V> ChampMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map: ChampMap<String, i32> = ChampMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            size: 0,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// assert_eq!(map.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let empty: ChampMap<String, i32> = ChampMap::new();
    /// assert!(empty.is_empty());
    ///
    /// let non_empty = empty.insert("key".to_string(), 42);
    /// assert!(!non_empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl<K: Clone + Hash + Eq, V: Clone> ChampMap<K, V> {
    /// Creates a map containing a single key-value pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get("key"), Some(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash`
    /// and `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key-value pair corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("hello".to_string(), 42);
    /// let (key, value) = map.get_key_value("hello").unwrap();
    /// assert_eq!(key, "hello");
    /// assert_eq!(*value, 42);
    /// ```
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root
            .as_ref()?
            .find_entry(key, hash_key(key), 0)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("key".to_string(), 42);
    ///
    /// assert!(map.contains_key("key"));
    /// assert!(!map.contains_key("other"));
    /// ```
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the map already contains the key, the stored key is kept and its
    /// value is replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map1 = ChampMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        self.insert_outcome(key, value).0
    }

    /// Inserts a key-value pair and reports the change outcome.
    ///
    /// Crate-internal: the sequenced set inspects the outcome to decide
    /// whether a sequence number was consumed.
    pub(crate) fn insert_outcome(&self, key: K, value: V) -> (Self, Change<V>) {
        let hash = hash_key(&key);
        match &self.root {
            Some(root) => {
                let mut root = root.clone();
                let change = Node::update(&mut root, None, key, value, hash, 0);
                let size = if matches!(change, Change::Inserted) {
                    self.size + 1
                } else {
                    self.size
                };
                (
                    Self {
                        root: Some(root),
                        size,
                    },
                    change,
                )
            }
            None => (
                Self {
                    root: Some(Node::singleton(key, value, hash, None)),
                    size: 1,
                },
                Change::Inserted,
            ),
        }
    }

    /// Removes a key from the map.
    ///
    /// Returns a new map without the key. If the key doesn't exist, returns
    /// a clone of the original map.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_outcome(key).0
    }

    /// Removes a key and reports the change outcome.
    ///
    /// Crate-internal counterpart of [`insert_outcome`](Self::insert_outcome):
    /// every top-level mutation funnels through one of the two, so exactly
    /// one outcome is produced per call.
    pub(crate) fn remove_outcome<Q>(&self, key: &Q) -> (Self, Change<V>)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(root) = self.root.as_ref() else {
            return (self.clone(), Change::Unchanged);
        };
        let mut root = root.clone();
        let Some(previous) = Node::remove(&mut root, None, key, hash_key(key), 0) else {
            return (self.clone(), Change::Unchanged);
        };
        let root = if root.is_empty_node() { None } else { Some(root) };
        (
            Self {
                root,
                size: self.size - 1,
            },
            Change::Removed { previous },
        )
    }

    /// Removes a key from the map, returning the removed value together with
    /// the new map.
    ///
    /// Returns `None` if the key is absent, leaving nothing to build.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("a".to_string(), 1);
    ///
    /// let (value, rest) = map.extract("a").unwrap();
    /// assert_eq!(value, 1);
    /// assert!(rest.is_empty());
    /// assert!(map.extract("missing").is_none());
    /// ```
    #[must_use]
    pub fn extract<Q>(&self, key: &Q) -> Option<(V, Self)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.remove_outcome(key) {
            (map, Change::Removed { previous }) => Some((previous, map)),
            _ => None,
        }
    }

    /// Updates the value for a key using a function.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("count".to_string(), 10);
    /// let updated = map.update("count", |value| value + 1);
    ///
    /// assert_eq!(updated.unwrap().get("count"), Some(&11));
    /// ```
    #[must_use]
    pub fn update<Q, F>(&self, key: &Q, function: F) -> Option<Self>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> V,
    {
        let (stored_key, value) = self.get_key_value(key)?;
        let new_value = function(value);
        Some(self.insert(stored_key.clone(), new_value))
    }

    /// Merges two maps, with values from `other` taking precedence on key
    /// conflicts.
    ///
    /// The merge runs through a transient batch, so intermediate versions
    /// are never materialized.
    ///
    /// # Complexity
    ///
    /// O(m log32 (n + m)) where `m` is the size of `other`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map1 = ChampMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let map2 = ChampMap::new()
    ///     .insert("b".to_string(), 20)
    ///     .insert("c".to_string(), 3);
    ///
    /// let merged = map1.merge(&map2);
    ///
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20)); // From map2
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut transient = self.transient();
        for (key, value) in other.iter() {
            transient.insert(key.clone(), value.clone());
        }
        transient.persistent()
    }

    /// Creates a transient editor seeded with this map's contents.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert(1, "one");
    /// let mut transient = map.transient();
    /// transient.insert(2, "two");
    ///
    /// let bigger = transient.persistent();
    /// assert_eq!(map.len(), 1);    // Original unchanged
    /// assert_eq!(bigger.len(), 2);
    /// ```
    #[must_use]
    pub fn transient(&self) -> TransientChampMap<K, V> {
        TransientChampMap {
            root: self.root.clone(),
            size: self.size,
            token: OwnershipToken::new(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over key-value pairs, in hash-partition order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(sum, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> ChampMapIterator<'_, K, V> {
        ChampMapIterator {
            entries: NodeEntries::new(self.root.as_deref()),
            remaining: self.size,
        }
    }

    /// Returns an iterator over keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new().insert("a".to_string(), 1);
    /// assert_eq!(map.keys().count(), 1);
    /// ```
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampMap;
    ///
    /// let map = ChampMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let sum: i32 = map.values().sum();
    /// assert_eq!(sum, 3);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over key-value pairs of a [`ChampMap`].
///
/// Yields entries in hash-partition order, which is arbitrary with respect
/// to insertion order.
pub struct ChampMapIterator<'a, K, V> {
    entries: NodeEntries<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for ChampMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for ChampMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

/// An owning iterator over key-value pairs of a [`ChampMap`].
pub struct ChampMapIntoIterator<K, V> {
    entries: Vec<(K, V)>,
    current_index: usize,
}

impl<K: Clone, V: Clone> Iterator for ChampMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.entries.len() {
            None
        } else {
            let entry = self.entries[self.current_index].clone();
            self.current_index += 1;
            Some(entry)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len().saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for ChampMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len().saturating_sub(self.current_index)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V> Default for ChampMap<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> FromIterator<(K, V)> for ChampMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = TransientChampMap::new();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<K: Clone + Hash + Eq, V: Clone> IntoIterator for ChampMap<K, V> {
    type Item = (K, V);
    type IntoIter = ChampMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        ChampMapIntoIterator {
            entries,
            current_index: 0,
        }
    }
}

impl<'a, K, V> IntoIterator for &'a ChampMap<K, V>
where
    K: Clone + Hash + Eq,
    V: Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = ChampMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone + Hash + Eq, V: Clone + PartialEq> PartialEq for ChampMap<K, V> {
    /// Structural equality: two maps are equal iff they contain the same
    /// key-value pairs, independent of insertion order. Compared via node
    /// equivalence rather than raw layout, since two tries holding identical
    /// logical content may differ physically inside collision nodes.
    fn eq(&self, other: &Self) -> bool {
        if self.size != other.size {
            return false;
        }
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(root_a), Some(root_b)) => {
                ReferenceCounter::ptr_eq(root_a, root_b) || root_a.equivalent(root_b)
            }
            _ => false,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone + Eq> Eq for ChampMap<K, V> {}

impl<K: Clone + Hash + Eq, V: Clone + Hash> Hash for ChampMap<K, V> {
    /// Order-independent hash consistent with [`PartialEq`]: a commutative
    /// sum of per-entry hashes.
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.size);
        let content = self
            .root
            .as_ref()
            .map_or(0, |root| root.content_hash());
        state.write_u64(content);
    }
}

impl<K: Clone + Hash + Eq + fmt::Debug, V: Clone + fmt::Debug> fmt::Debug for ChampMap<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientChampMap Definition
// =============================================================================

/// A transient (temporarily mutable) hash map for efficient batch updates.
///
/// `TransientChampMap` holds an ownership token; trie nodes created during
/// the batch are marked with it and mutated in place on subsequent hits,
/// because nothing else can reach them yet. Nodes inherited from a
/// persistent map stay shared and are copied on first touch. After batch
/// updates, convert to [`ChampMap`] using [`persistent()`](Self::persistent);
/// this discards the token, so the nodes are frozen from then on.
///
/// # Design
///
/// - `PhantomData<Rc<()>>` ensures `!Send` and `!Sync`: a token must never
///   be observable from two threads
/// - Clone/Copy traits are intentionally not implemented (linear type
///   semantics): two live editors sharing a token would break the
///   exclusive-ownership invariant
///
/// # Examples
///
/// ```rust
/// use champ_collections::{ChampMap, TransientChampMap};
///
/// // Build a map efficiently using transient operations
/// let mut transient = TransientChampMap::new();
/// transient.insert("a".to_string(), 1);
/// transient.insert("b".to_string(), 2);
///
/// // Convert to persistent map
/// let persistent = transient.persistent();
/// assert_eq!(persistent.len(), 2);
/// ```
///
/// # Transient-Persistent Pattern
///
/// ```rust
/// use champ_collections::ChampMap;
///
/// // Start with a persistent map
/// let persistent: ChampMap<i32, i32> = [(1, 10), (2, 20)].into_iter().collect();
///
/// // Convert to transient for batch updates
/// let mut transient = persistent.transient();
/// transient.insert(3, 30);
/// transient.remove(&1);
///
/// // Convert back to persistent
/// let new_persistent = transient.persistent();
/// assert_eq!(new_persistent.len(), 2);
/// assert_eq!(persistent.len(), 2); // Original unchanged
/// ```
pub struct TransientChampMap<K, V> {
    root: Option<ReferenceCounter<Node<K, V>>>,
    size: usize,
    token: OwnershipToken,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientChampMap is not Send/Sync
static_assertions::assert_not_impl_any!(TransientChampMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientChampMap<String, String>: Send, Sync);

impl<K, V> TransientChampMap<K, V> {
    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let mut transient: TransientChampMap<i32, i32> = TransientChampMap::new();
    /// assert_eq!(transient.len(), 0);
    /// transient.insert(1, 10);
    /// assert_eq!(transient.len(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let transient: TransientChampMap<i32, i32> = TransientChampMap::new();
    /// assert!(transient.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Creates a new empty `TransientChampMap` with a fresh ownership token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let transient: TransientChampMap<i32, i32> = TransientChampMap::new();
    /// assert!(transient.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            size: 0,
            token: OwnershipToken::new(),
            _marker: PhantomData,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> TransientChampMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let mut transient = TransientChampMap::new();
    /// transient.insert("key".to_string(), 42);
    /// assert_eq!(transient.get("key"), Some(&42));
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root
            .as_ref()?
            .find_entry(key, hash_key(key), 0)
            .map(|(_, value)| value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    ///
    /// Returns `None` if the key was new, or `Some(old_value)` if an
    /// existing value was replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N); nodes created earlier in this batch are mutated in place.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let mut transient = TransientChampMap::new();
    /// assert_eq!(transient.insert(1, "one"), None);
    /// assert_eq!(transient.insert(1, "uno"), Some("one"));
    /// assert_eq!(transient.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&key);
        match &mut self.root {
            Some(root) => {
                match Node::update(root, Some(&self.token), key, value, hash, 0) {
                    Change::Inserted => {
                        self.size += 1;
                        None
                    }
                    Change::Replaced { previous } => Some(previous),
                    Change::Unchanged | Change::Removed { .. } => None,
                }
            }
            None => {
                self.root = Some(Node::singleton(key, value, hash, Some(&self.token)));
                self.size = 1;
                None
            }
        }
    }

    /// Removes a key from the map. Returns the removed value, or `None` if
    /// the key was not present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let mut transient = TransientChampMap::new();
    /// transient.insert(1, "one");
    ///
    /// assert_eq!(transient.remove(&1), Some("one"));
    /// assert_eq!(transient.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let root = self.root.as_mut()?;
        let previous = Node::remove(root, Some(&self.token), key, hash_key(key), 0)?;
        self.size -= 1;
        if root.is_empty_node() {
            self.root = None;
        }
        Some(previous)
    }

    /// Freezes the batch into a persistent map.
    ///
    /// The ownership token is dropped here; nodes it owned keep a stale mark
    /// that no future token can ever match, so they are immutable from now
    /// on.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampMap;
    ///
    /// let mut transient = TransientChampMap::new();
    /// transient.insert(1, "one");
    ///
    /// let persistent = transient.persistent();
    /// assert_eq!(persistent.get(&1), Some(&"one"));
    /// ```
    #[must_use]
    pub fn persistent(self) -> ChampMap<K, V> {
        ChampMap {
            root: self.root,
            size: self.size,
        }
    }
}

impl<K, V> Default for TransientChampMap<K, V> {
    fn default() -> Self {
        Self {
            root: None,
            size: 0,
            token: OwnershipToken::new(),
            _marker: PhantomData,
        }
    }
}

impl<K: Clone + Hash + Eq, V: Clone> Extend<(K, V)> for TransientChampMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
