//! Persistent (immutable) hash set based on a CHAMP trie.
//!
//! This module provides [`ChampSet`], an immutable hash set, and
//! [`TransientChampSet`], its temporarily mutable editor.
//!
//! # Design
//!
//! `ChampSet<T>` is a thin wrapper around [`ChampMap<T, ()>`](ChampMap): a
//! set entry is a map entry whose value is zero-sized, so each trie slot
//! holds exactly one element. All trie mechanics (structural sharing,
//! collision handling, transient batches) are inherited from the map.
//!
//! # Examples
//!
//! ```rust
//! use champ_collections::ChampSet;
//!
//! let set = ChampSet::new().insert(1).insert(2).insert(3);
//! assert!(set.contains(&1));
//!
//! // Structural sharing: the original set is preserved
//! let updated = set.insert(4);
//! assert_eq!(set.len(), 3);      // Original unchanged
//! assert_eq!(updated.len(), 4);  // New version
//!
//! // Set operations
//! let other: ChampSet<i32> = [2, 3, 4].into_iter().collect();
//! let union = set.union(&other);
//! let intersection = set.intersection(&other);
//!
//! assert_eq!(union.len(), 4);        // {1, 2, 3, 4}
//! assert_eq!(intersection.len(), 2); // {2, 3}
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::map::{ChampMap, ChampMapIterator, TransientChampMap};

// =============================================================================
// ChampSet Definition
// =============================================================================

/// A persistent (immutable) hash set based on a CHAMP trie.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `contains`     | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use champ_collections::ChampSet;
///
/// let set = ChampSet::singleton(42);
/// assert!(set.contains(&42));
/// ```
#[derive(Clone)]
pub struct ChampSet<T> {
    inner: ChampMap<T, ()>,
}

impl<T> ChampSet<T> {
    /// Creates a new empty set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set: ChampSet<i32> = ChampSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: ChampMap::new(),
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert(1).insert(2);
    /// assert_eq!(set.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let empty: ChampSet<i32> = ChampSet::new();
    /// assert!(empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T: Clone + Hash + Eq> ChampSet<T> {
    /// Creates a set containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::singleton(42);
    /// assert_eq!(set.len(), 1);
    /// assert!(set.contains(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::new().insert(element)
    }

    /// Returns `true` if the set contains the specified element.
    ///
    /// The element may be any borrowed form of the set's element type, but
    /// `Hash` and `Eq` on the borrowed form must match those for the element
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert("hello".to_string());
    ///
    /// // Can use &str to look up String elements
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("world"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts an element into the set, returning a new set.
    ///
    /// Inserting an element that is already present is idempotent: the
    /// result is equal to the original.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert(42);
    /// assert!(set.contains(&42));
    ///
    /// let same = set.insert(42);
    /// assert_eq!(same.len(), 1);
    /// ```
    #[must_use]
    pub fn insert(&self, element: T) -> Self {
        if self.contains(&element) {
            return self.clone();
        }
        Self {
            inner: self.inner.insert(element, ()),
        }
    }

    /// Removes an element from the set, returning a new set.
    ///
    /// If the element does not exist, returns a clone of the current set.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert(1).insert(2);
    /// let removed = set.remove(&1);
    ///
    /// assert_eq!(removed.len(), 1);
    /// assert!(!removed.contains(&1));
    /// assert!(set.contains(&1)); // Original unchanged
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, element: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self {
            inner: self.inner.remove(element),
        }
    }

    /// Returns the union of `self` and `other` as a new set.
    ///
    /// # Complexity
    ///
    /// O(m log32 (n + m)) where `m` is the size of `other`
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let left: ChampSet<i32> = [1, 2].into_iter().collect();
    /// let right: ChampSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let union = left.union(&right);
    /// assert_eq!(union.len(), 3);
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut transient = self.transient();
        for element in other.iter() {
            transient.insert(element.clone());
        }
        transient.persistent()
    }

    /// Returns the intersection of `self` and `other` as a new set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let left: ChampSet<i32> = [1, 2, 3].into_iter().collect();
    /// let right: ChampSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let intersection = left.intersection(&right);
    /// assert_eq!(intersection.len(), 2);
    /// assert!(intersection.contains(&2));
    /// assert!(intersection.contains(&3));
    /// ```
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut transient = TransientChampSet::new();
        for element in self.iter() {
            if other.contains(element) {
                transient.insert(element.clone());
            }
        }
        transient.persistent()
    }

    /// Returns the elements of `self` that are not in `other` as a new set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let left: ChampSet<i32> = [1, 2, 3].into_iter().collect();
    /// let right: ChampSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let difference = left.difference(&right);
    /// assert_eq!(difference.len(), 1);
    /// assert!(difference.contains(&1));
    /// ```
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        let mut transient = TransientChampSet::new();
        for element in self.iter() {
            if !other.contains(element) {
                transient.insert(element.clone());
            }
        }
        transient.persistent()
    }

    /// Creates a transient editor seeded with this set's contents.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert(1);
    /// let mut transient = set.transient();
    /// transient.insert(2);
    ///
    /// let bigger = transient.persistent();
    /// assert_eq!(set.len(), 1);
    /// assert_eq!(bigger.len(), 2);
    /// ```
    #[must_use]
    pub fn transient(&self) -> TransientChampSet<T> {
        TransientChampSet {
            inner: self.inner.transient(),
            _marker: PhantomData,
        }
    }

    /// Returns an iterator over references to the elements, in
    /// hash-partition order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::ChampSet;
    ///
    /// let set = ChampSet::new().insert(1).insert(2).insert(3);
    /// let mut elements: Vec<i32> = set.iter().copied().collect();
    /// elements.sort();
    /// assert_eq!(elements, vec![1, 2, 3]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> ChampSetIterator<'_, T> {
        ChampSetIterator {
            inner: self.inner.iter(),
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over elements of a [`ChampSet`].
pub struct ChampSetIterator<'a, T> {
    inner: ChampMapIterator<'a, T, ()>,
}

impl<'a, T> Iterator for ChampSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(element, _)| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for ChampSetIterator<'_, T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// An owning iterator over elements of a [`ChampSet`].
pub struct ChampSetIntoIterator<T> {
    elements: Vec<T>,
    current_index: usize,
}

impl<T: Clone> Iterator for ChampSetIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.elements.len() {
            None
        } else {
            let element = self.elements[self.current_index].clone();
            self.current_index += 1;
            Some(element)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.elements.len().saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for ChampSetIntoIterator<T> {
    fn len(&self) -> usize {
        self.elements.len().saturating_sub(self.current_index)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for ChampSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Hash + Eq> FromIterator<T> for ChampSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut transient = TransientChampSet::new();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<T: Clone + Hash + Eq> IntoIterator for ChampSet<T> {
    type Item = T;
    type IntoIter = ChampSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        let elements: Vec<T> = self.iter().cloned().collect();
        ChampSetIntoIterator {
            elements,
            current_index: 0,
        }
    }
}

impl<'a, T: Clone + Hash + Eq> IntoIterator for &'a ChampSet<T> {
    type Item = &'a T;
    type IntoIter = ChampSetIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + Hash + Eq> PartialEq for ChampSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Clone + Hash + Eq> Eq for ChampSet<T> {}

impl<T: Clone + Hash + Eq> Hash for ChampSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T: Clone + Hash + Eq + fmt::Debug> fmt::Debug for ChampSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

// =============================================================================
// TransientChampSet Definition
// =============================================================================

/// A transient (temporarily mutable) hash set for efficient batch updates.
///
/// `TransientChampSet` is a wrapper around
/// [`TransientChampMap<T, ()>`](TransientChampMap) that provides efficient
/// mutable operations for building a hash set. After batch updates, convert
/// to [`ChampSet`] using [`persistent()`](Self::persistent).
///
/// # Design
///
/// - Internally uses `TransientChampMap<T, ()>` for all operations
/// - `PhantomData<Rc<()>>` ensures `!Send` and `!Sync` for thread safety
/// - Clone/Copy traits are intentionally not implemented (linear type
///   semantics)
///
/// # Examples
///
/// ```rust
/// use champ_collections::{ChampSet, TransientChampSet};
///
/// // Build a set efficiently using transient operations
/// let mut transient = TransientChampSet::new();
/// transient.insert(1);
/// transient.insert(2);
/// transient.insert(3);
///
/// // Convert to persistent set
/// let persistent = transient.persistent();
/// assert!(persistent.contains(&1));
/// assert_eq!(persistent.len(), 3);
/// ```
pub struct TransientChampSet<T> {
    inner: TransientChampMap<T, ()>,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientChampSet is not Send/Sync
static_assertions::assert_not_impl_any!(TransientChampSet<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientChampSet<String>: Send, Sync);

impl<T> TransientChampSet<T> {
    /// Returns the number of elements in the set.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Creates a new empty `TransientChampSet`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampSet;
    ///
    /// let transient: TransientChampSet<i32> = TransientChampSet::new();
    /// assert!(transient.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: TransientChampMap::new(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + Hash + Eq> TransientChampSet<T> {
    /// Returns `true` if the set contains the specified element.
    #[must_use]
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(element)
    }

    /// Inserts an element into the set.
    ///
    /// Returns `true` if the element was newly inserted, `false` if it was
    /// already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampSet;
    ///
    /// let mut transient = TransientChampSet::new();
    /// assert!(transient.insert(1));   // New element
    /// assert!(!transient.insert(1));  // Already exists
    /// assert_eq!(transient.len(), 1);
    /// ```
    pub fn insert(&mut self, element: T) -> bool {
        if self.contains(&element) {
            return false;
        }
        self.inner.insert(element, ());
        true
    }

    /// Removes an element from the set.
    ///
    /// Returns `true` if the element was present and removed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampSet;
    ///
    /// let mut transient = TransientChampSet::new();
    /// transient.insert(1);
    ///
    /// assert!(transient.remove(&1));   // Was present
    /// assert!(!transient.remove(&1));  // Already removed
    /// ```
    pub fn remove<Q>(&mut self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(element).is_some()
    }

    /// Freezes the batch into a persistent set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use champ_collections::TransientChampSet;
    ///
    /// let mut transient = TransientChampSet::new();
    /// transient.insert(1);
    ///
    /// let persistent = transient.persistent();
    /// assert!(persistent.contains(&1));
    /// ```
    #[must_use]
    pub fn persistent(self) -> ChampSet<T> {
        ChampSet {
            inner: self.inner.persistent(),
        }
    }
}

impl<T> Default for TransientChampSet<T> {
    fn default() -> Self {
        Self {
            inner: TransientChampMap::default(),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + Hash + Eq> Extend<T> for TransientChampSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for element in iter {
            self.insert(element);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
