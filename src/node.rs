//! CHAMP trie nodes and the copy-on-write update machinery.
//!
//! A trie node is either a bitmap-compressed [`Branch`](Node::Branch) or a
//! linear [`Collision`](Node::Collision) leaf. Branch nodes keep two disjoint
//! bitmaps: `data_map` marks hash fragments resolved by an inline entry,
//! `node_map` marks fragments resolved by a child subtree. Entries and
//! children are stored in compact arrays addressed by population count over
//! the owning bitmap, so a node occupies space proportional to its arity.
//!
//! Collision nodes exist only below [`MAX_SHIFT`], where the full 64-bit key
//! hash has been consumed: two keys can only meet there if their hashes are
//! identical, which is what makes the collision node's single stored hash an
//! invariant rather than an approximation.
//!
//! Every mutating operation either copies the nodes along the touched path
//! (persistent calls) or, when the node carries the caller's
//! [`OwnershipToken`], mutates the node in place (transient calls). A
//! structural copy is never owned: `Clone` deliberately clears the owner.

use std::borrow::Borrow;
use std::hash::Hash;
use std::mem;

use arrayvec::ArrayVec;
use smallvec::{SmallVec, smallvec};

use crate::ReferenceCounter;
use crate::hash::hash_key;

/// Bits consumed per trie level (5 bits → 32-way branching).
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Largest shift at which a branch node can sit; one level further the hash
/// is exhausted and only collision nodes remain.
pub(crate) const MAX_SHIFT: u32 = 60;

/// Deepest possible traversal stack: 13 branch levels plus a collision leaf.
const MAX_ITER_DEPTH: usize = 14;

// =============================================================================
// Bitmap helpers
// =============================================================================

/// Extracts the 5-bit hash fragment addressed at the given shift.
#[inline]
pub(crate) const fn fragment(hash: u64, shift: u32) -> u32 {
    ((hash >> shift) & 0x1F) as u32
}

/// Returns the single-bit mask for a fragment (0..=31).
#[inline]
pub(crate) const fn mask(fragment: u32) -> u32 {
    1 << fragment
}

/// Returns the compact array index of `bit` within `bitmap`: the number of
/// occupied slots below it.
#[inline]
pub(crate) const fn compact_index(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Ownership Token
// =============================================================================

/// Identity object marking a batch of nodes as exclusively mutable.
///
/// Two tokens are the same owner only if they are clones of the same
/// allocation; equality is pointer identity, never structural. A node whose
/// `owner` matches the token of the operation in flight is reachable from
/// exactly one transient editor and may be mutated destructively.
#[derive(Clone)]
pub(crate) struct OwnershipToken {
    identity: ReferenceCounter<()>,
}

impl OwnershipToken {
    /// Creates a fresh token, distinct from every other token in existence.
    pub(crate) fn new() -> Self {
        Self {
            identity: ReferenceCounter::new(()),
        }
    }

    /// Returns `true` if both tokens denote the same ownership identity.
    fn is_identical(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.identity, &other.identity)
    }
}

// =============================================================================
// Change Outcome Record
// =============================================================================

/// Outcome of a single top-level update or removal.
pub(crate) enum Change<V> {
    /// The collection was left untouched.
    Unchanged,
    /// A new entry was added.
    Inserted,
    /// An existing entry's value was replaced.
    Replaced {
        /// The value that was displaced.
        previous: V,
    },
    /// An entry was removed.
    Removed {
        /// The value that was removed.
        previous: V,
    },
}

// =============================================================================
// Node Definition
// =============================================================================

/// A CHAMP trie node.
pub(crate) enum Node<K, V> {
    /// Bitmap-compressed interior node.
    ///
    /// Invariants: `data_map & node_map == 0`;
    /// `entries.len() == data_map.count_ones()`;
    /// `children.len() == node_map.count_ones()`; both arrays are ordered by
    /// ascending bit position.
    Branch {
        /// Bitmap of fragments resolved by an inline entry.
        data_map: u32,
        /// Bitmap of fragments resolved by a child subtree.
        node_map: u32,
        /// Inline entries, compact and bit-position ordered.
        entries: Vec<(K, V)>,
        /// Child subtrees, compact and bit-position ordered.
        children: Vec<ReferenceCounter<Node<K, V>>>,
        /// Token of the transient batch that may mutate this node in place.
        owner: Option<OwnershipToken>,
    },
    /// Linear leaf for keys sharing one full 64-bit hash.
    ///
    /// Invariant: at least two entries, except transiently during one removal
    /// unwinding step (the parent inlines the survivor immediately).
    Collision {
        /// The hash shared by every entry in this node.
        hash: u64,
        /// Colliding entries; almost always exactly two.
        entries: SmallVec<[(K, V); 2]>,
        /// Token of the transient batch that may mutate this node in place.
        owner: Option<OwnershipToken>,
    },
}

/// A structural copy is never owned: cloning a node produces the persistent
/// (unowned) variant regardless of the source's owner.
impl<K: Clone, V: Clone> Clone for Node<K, V> {
    fn clone(&self) -> Self {
        match self {
            Self::Branch {
                data_map,
                node_map,
                entries,
                children,
                ..
            } => Self::Branch {
                data_map: *data_map,
                node_map: *node_map,
                entries: entries.clone(),
                children: children.clone(),
                owner: None,
            },
            Self::Collision { hash, entries, .. } => Self::Collision {
                hash: *hash,
                entries: entries.clone(),
                owner: None,
            },
        }
    }
}

// =============================================================================
// Arity accessors
// =============================================================================

impl<K, V> Node<K, V> {
    /// Number of inline entries in this node.
    pub(crate) fn entry_count(&self) -> usize {
        match self {
            Self::Branch { entries, .. } => entries.len(),
            Self::Collision { entries, .. } => entries.len(),
        }
    }

    /// Number of child subtrees (always zero for collision nodes).
    pub(crate) fn child_count(&self) -> usize {
        match self {
            Self::Branch { children, .. } => children.len(),
            Self::Collision { .. } => 0,
        }
    }

    /// Returns `true` if the node holds no entries and no children.
    ///
    /// Only ever observed at the root; the facade normalizes an emptied root
    /// to the canonical empty collection.
    pub(crate) fn is_empty_node(&self) -> bool {
        self.entry_count() == 0 && self.child_count() == 0
    }

    /// A node with exactly one entry and no children is inlined into its
    /// parent during removal unwinding.
    fn is_unary(&self) -> bool {
        self.entry_count() == 1 && self.child_count() == 0
    }

    fn entry_at(&self, index: usize) -> (&K, &V) {
        match self {
            Self::Branch { entries, .. } => (&entries[index].0, &entries[index].1),
            Self::Collision { entries, .. } => (&entries[index].0, &entries[index].1),
        }
    }

    fn child_at(&self, index: usize) -> &Self {
        match self {
            Self::Branch { children, .. } => &children[index],
            Self::Collision { .. } => unreachable!("collision nodes have no children"),
        }
    }

    fn owner(&self) -> Option<&OwnershipToken> {
        match self {
            Self::Branch { owner, .. } | Self::Collision { owner, .. } => owner.as_ref(),
        }
    }

    /// Returns `true` if the in-flight operation's token owns this node.
    fn is_owned_by(&self, token: Option<&OwnershipToken>) -> bool {
        match (self.owner(), token) {
            (Some(owner), Some(token)) => owner.is_identical(token),
            _ => false,
        }
    }

    fn expect_branch(&self) -> (u32, u32, &Vec<(K, V)>, &Vec<ReferenceCounter<Self>>) {
        match self {
            Self::Branch {
                data_map,
                node_map,
                entries,
                children,
                ..
            } => (*data_map, *node_map, entries, children),
            Self::Collision { .. } => unreachable!("expected a branch node"),
        }
    }

    #[allow(clippy::type_complexity)]
    fn expect_branch_mut(
        &mut self,
    ) -> (
        &mut u32,
        &mut u32,
        &mut Vec<(K, V)>,
        &mut Vec<ReferenceCounter<Self>>,
    ) {
        match self {
            Self::Branch {
                data_map,
                node_map,
                entries,
                children,
                ..
            } => (data_map, node_map, entries, children),
            Self::Collision { .. } => unreachable!("expected a branch node"),
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

impl<K: Hash + Eq + Clone, V: Clone> Node<K, V> {
    /// Finds the entry for `key`, descending one trie level per 5-bit hash
    /// fragment.
    pub(crate) fn find_entry<'a, Q>(
        &'a self,
        key: &Q,
        hash: u64,
        shift: u32,
    ) -> Option<(&'a K, &'a V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Self::Branch {
                data_map,
                node_map,
                entries,
                children,
                ..
            } => {
                let bit = mask(fragment(hash, shift));
                if *data_map & bit != 0 {
                    // One fragment addresses at most one data slot; a key
                    // mismatch here means the key is absent.
                    let (stored_key, value) = &entries[compact_index(*data_map, bit)];
                    (stored_key.borrow() == key).then_some((stored_key, value))
                } else if *node_map & bit != 0 {
                    children[compact_index(*node_map, bit)].find_entry(
                        key,
                        hash,
                        shift + BITS_PER_LEVEL,
                    )
                } else {
                    None
                }
            }
            Self::Collision {
                hash: node_hash,
                entries,
                ..
            } => {
                if *node_hash != hash {
                    return None;
                }
                entries
                    .iter()
                    .find(|(stored_key, _)| stored_key.borrow() == key)
                    .map(|(stored_key, value)| (stored_key, value))
            }
        }
    }
}

// =============================================================================
// Update
// =============================================================================

/// Which slot of a branch node the hash fragment addresses.
enum Slot {
    Data { index: usize, key_matches: bool },
    Child { index: usize },
    Free,
}

impl<K: Hash + Eq + Clone, V: Clone> Node<K, V> {
    /// Builds the root node for the first entry of a collection.
    ///
    /// This is the node factory's entry point: a `token` produces an owned
    /// (transient) node, `None` a persistent one.
    pub(crate) fn singleton(
        key: K,
        value: V,
        hash: u64,
        token: Option<&OwnershipToken>,
    ) -> ReferenceCounter<Self> {
        ReferenceCounter::new(Self::Branch {
            data_map: mask(fragment(hash, 0)),
            node_map: 0,
            entries: vec![(key, value)],
            children: Vec::new(),
            owner: token.cloned(),
        })
    }

    /// Inserts or replaces the entry for `key` in the subtree behind `rc`.
    ///
    /// Persistent calls (`token == None`) replace `rc` with a freshly built
    /// path copy; transient calls mutate owned nodes in place and only copy
    /// the still-shared ones.
    pub(crate) fn update(
        rc: &mut ReferenceCounter<Self>,
        token: Option<&OwnershipToken>,
        key: K,
        value: V,
        hash: u64,
        shift: u32,
    ) -> Change<V> {
        if matches!(&**rc, Self::Collision { .. }) {
            return Self::update_collision(rc, token, key, value, hash);
        }
        let bit = mask(fragment(hash, shift));
        let slot = {
            let (data_map, node_map, entries, _) = rc.expect_branch();
            if data_map & bit != 0 {
                let index = compact_index(data_map, bit);
                Slot::Data {
                    index,
                    key_matches: entries[index].0 == key,
                }
            } else if node_map & bit != 0 {
                Slot::Child {
                    index: compact_index(node_map, bit),
                }
            } else {
                Slot::Free
            }
        };

        match slot {
            Slot::Data {
                index,
                key_matches: true,
            } => {
                if rc.is_owned_by(token) {
                    if let Self::Branch { entries, .. } = ReferenceCounter::make_mut(rc) {
                        let previous = mem::replace(&mut entries[index].1, value);
                        return Change::Replaced { previous };
                    }
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let mut new_entries = entries.clone();
                let previous = mem::replace(&mut new_entries[index].1, value);
                let replacement = Self::Branch {
                    data_map,
                    node_map,
                    entries: new_entries,
                    children: children.clone(),
                    owner: token.cloned(),
                };
                *rc = ReferenceCounter::new(replacement);
                Change::Replaced { previous }
            }
            Slot::Data {
                index,
                key_matches: false,
            } => {
                // Partition collision: demote the resident entry into a
                // merged sub-node holding both entries.
                let (existing, existing_hash) = {
                    let (_, _, entries, _) = rc.expect_branch();
                    let existing = entries[index].clone();
                    let existing_hash = hash_key(&existing.0);
                    (existing, existing_hash)
                };
                let merged = Self::merge_entries(
                    existing,
                    existing_hash,
                    (key, value),
                    hash,
                    shift + BITS_PER_LEVEL,
                    token,
                );
                if rc.is_owned_by(token) {
                    let (data_map, node_map, entries, children) =
                        ReferenceCounter::make_mut(rc).expect_branch_mut();
                    *data_map &= !bit;
                    entries.remove(index);
                    *node_map |= bit;
                    children.insert(compact_index(*node_map, bit), merged);
                    return Change::Inserted;
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let new_node_map = node_map | bit;
                let mut new_entries = entries.clone();
                new_entries.remove(index);
                let mut new_children = children.clone();
                new_children.insert(compact_index(new_node_map, bit), merged);
                let replacement = Self::Branch {
                    data_map: data_map & !bit,
                    node_map: new_node_map,
                    entries: new_entries,
                    children: new_children,
                    owner: token.cloned(),
                };
                *rc = ReferenceCounter::new(replacement);
                Change::Inserted
            }
            Slot::Child { index } => {
                if rc.is_owned_by(token) {
                    let (_, _, _, children) = ReferenceCounter::make_mut(rc).expect_branch_mut();
                    return Self::update(
                        &mut children[index],
                        token,
                        key,
                        value,
                        hash,
                        shift + BITS_PER_LEVEL,
                    );
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let mut new_children = children.clone();
                let change = Self::update(
                    &mut new_children[index],
                    token,
                    key,
                    value,
                    hash,
                    shift + BITS_PER_LEVEL,
                );
                let replacement = Self::Branch {
                    data_map,
                    node_map,
                    entries: entries.clone(),
                    children: new_children,
                    owner: token.cloned(),
                };
                *rc = ReferenceCounter::new(replacement);
                change
            }
            Slot::Free => {
                if rc.is_owned_by(token) {
                    let (data_map, _, entries, _) =
                        ReferenceCounter::make_mut(rc).expect_branch_mut();
                    *data_map |= bit;
                    entries.insert(compact_index(*data_map, bit), (key, value));
                    return Change::Inserted;
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let new_data_map = data_map | bit;
                let mut new_entries = entries.clone();
                new_entries.insert(compact_index(new_data_map, bit), (key, value));
                let replacement = Self::Branch {
                    data_map: new_data_map,
                    node_map,
                    entries: new_entries,
                    children: children.clone(),
                    owner: token.cloned(),
                };
                *rc = ReferenceCounter::new(replacement);
                Change::Inserted
            }
        }
    }

    fn update_collision(
        rc: &mut ReferenceCounter<Self>,
        token: Option<&OwnershipToken>,
        key: K,
        value: V,
        hash: u64,
    ) -> Change<V> {
        let position = {
            let Self::Collision {
                hash: node_hash,
                entries,
                ..
            } = &**rc
            else {
                unreachable!("expected a collision node")
            };
            debug_assert_eq!(
                *node_hash, hash,
                "collision node reached with a foreign hash"
            );
            entries.iter().position(|(stored_key, _)| *stored_key == key)
        };
        if let Some(index) = position {
            if rc.is_owned_by(token) {
                if let Self::Collision { entries, .. } = ReferenceCounter::make_mut(rc) {
                    let previous = mem::replace(&mut entries[index].1, value);
                    return Change::Replaced { previous };
                }
            }
            let Self::Collision {
                hash: node_hash,
                entries,
                ..
            } = &**rc
            else {
                unreachable!("expected a collision node")
            };
            let mut new_entries = entries.clone();
            let previous = mem::replace(&mut new_entries[index].1, value);
            let replacement = Self::Collision {
                hash: *node_hash,
                entries: new_entries,
                owner: token.cloned(),
            };
            *rc = ReferenceCounter::new(replacement);
            Change::Replaced { previous }
        } else {
            if rc.is_owned_by(token) {
                if let Self::Collision { entries, .. } = ReferenceCounter::make_mut(rc) {
                    entries.push((key, value));
                    return Change::Inserted;
                }
            }
            let Self::Collision {
                hash: node_hash,
                entries,
                ..
            } = &**rc
            else {
                unreachable!("expected a collision node")
            };
            let mut new_entries = entries.clone();
            new_entries.push((key, value));
            let replacement = Self::Collision {
                hash: *node_hash,
                entries: new_entries,
                owner: token.cloned(),
            };
            *rc = ReferenceCounter::new(replacement);
            Change::Inserted
        }
    }

    /// Merges two entries whose hash fragments collided at the caller's
    /// level.
    ///
    /// Recurses one 5-bit slice at a time until the fragments diverge (a
    /// two-entry branch) or the hash is exhausted (a collision node),
    /// building a chain of single-child branch nodes in between. Only fully
    /// identical hashes ever reach the collision case.
    fn merge_entries(
        first: (K, V),
        first_hash: u64,
        second: (K, V),
        second_hash: u64,
        shift: u32,
        token: Option<&OwnershipToken>,
    ) -> ReferenceCounter<Self> {
        if shift > MAX_SHIFT {
            debug_assert_eq!(first_hash, second_hash, "divergent hashes exhausted the trie");
            return ReferenceCounter::new(Self::Collision {
                hash: first_hash,
                entries: smallvec![first, second],
                owner: token.cloned(),
            });
        }
        let first_fragment = fragment(first_hash, shift);
        let second_fragment = fragment(second_hash, shift);
        if first_fragment == second_fragment {
            let child = Self::merge_entries(
                first,
                first_hash,
                second,
                second_hash,
                shift + BITS_PER_LEVEL,
                token,
            );
            return ReferenceCounter::new(Self::Branch {
                data_map: 0,
                node_map: mask(first_fragment),
                entries: Vec::new(),
                children: vec![child],
                owner: token.cloned(),
            });
        }
        let entries = if first_fragment < second_fragment {
            vec![first, second]
        } else {
            vec![second, first]
        };
        ReferenceCounter::new(Self::Branch {
            data_map: mask(first_fragment) | mask(second_fragment),
            node_map: 0,
            entries,
            children: Vec::new(),
            owner: token.cloned(),
        })
    }
}

// =============================================================================
// Removal
// =============================================================================

/// Which slot a removal targets in a branch node.
enum RemovalSlot {
    Data(usize),
    Child(usize),
}

impl<K: Hash + Eq + Clone, V: Clone> Node<K, V> {
    /// Removes the entry for `key` from the subtree behind `rc`, returning
    /// the removed value.
    ///
    /// After a child removal, a child left with a single entry and no
    /// children has that entry migrated back into this node's data slots,
    /// which unwinds single-child chains level by level and keeps the trie
    /// canonical.
    pub(crate) fn remove<Q>(
        rc: &mut ReferenceCounter<Self>,
        token: Option<&OwnershipToken>,
        key: &Q,
        hash: u64,
        shift: u32,
    ) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if matches!(&**rc, Self::Collision { .. }) {
            return Self::remove_collision(rc, token, key, hash);
        }
        let bit = mask(fragment(hash, shift));
        let slot = {
            let (data_map, node_map, entries, _) = rc.expect_branch();
            if data_map & bit != 0 {
                let index = compact_index(data_map, bit);
                if entries[index].0.borrow() == key {
                    RemovalSlot::Data(index)
                } else {
                    return None;
                }
            } else if node_map & bit != 0 {
                RemovalSlot::Child(compact_index(node_map, bit))
            } else {
                return None;
            }
        };

        match slot {
            RemovalSlot::Data(index) => {
                if rc.is_owned_by(token) {
                    let (data_map, _, entries, _) =
                        ReferenceCounter::make_mut(rc).expect_branch_mut();
                    *data_map &= !bit;
                    let (_, previous) = entries.remove(index);
                    return Some(previous);
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let mut new_entries = entries.clone();
                let (_, previous) = new_entries.remove(index);
                let replacement = Self::Branch {
                    data_map: data_map & !bit,
                    node_map,
                    entries: new_entries,
                    children: children.clone(),
                    owner: token.cloned(),
                };
                *rc = ReferenceCounter::new(replacement);
                Some(previous)
            }
            RemovalSlot::Child(index) => {
                if rc.is_owned_by(token) {
                    let (data_map, node_map, entries, children) =
                        ReferenceCounter::make_mut(rc).expect_branch_mut();
                    let previous = Self::remove(
                        &mut children[index],
                        token,
                        key,
                        hash,
                        shift + BITS_PER_LEVEL,
                    )?;
                    if children[index].is_unary() {
                        let entry = children[index].first_entry_cloned();
                        children.remove(index);
                        *node_map &= !bit;
                        *data_map |= bit;
                        entries.insert(compact_index(*data_map, bit), entry);
                    }
                    return Some(previous);
                }
                let (data_map, node_map, entries, children) = rc.expect_branch();
                let mut new_children = children.clone();
                let previous = Self::remove(
                    &mut new_children[index],
                    token,
                    key,
                    hash,
                    shift + BITS_PER_LEVEL,
                )?;
                let replacement = if new_children[index].is_unary() {
                    let entry = new_children[index].first_entry_cloned();
                    new_children.remove(index);
                    let new_data_map = data_map | bit;
                    let mut new_entries = entries.clone();
                    new_entries.insert(compact_index(new_data_map, bit), entry);
                    Self::Branch {
                        data_map: new_data_map,
                        node_map: node_map & !bit,
                        entries: new_entries,
                        children: new_children,
                        owner: token.cloned(),
                    }
                } else {
                    Self::Branch {
                        data_map,
                        node_map,
                        entries: entries.clone(),
                        children: new_children,
                        owner: token.cloned(),
                    }
                };
                *rc = ReferenceCounter::new(replacement);
                Some(previous)
            }
        }
    }

    fn remove_collision<Q>(
        rc: &mut ReferenceCounter<Self>,
        token: Option<&OwnershipToken>,
        key: &Q,
        hash: u64,
    ) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let position = {
            let Self::Collision {
                hash: node_hash,
                entries,
                ..
            } = &**rc
            else {
                unreachable!("expected a collision node")
            };
            if *node_hash != hash {
                return None;
            }
            entries
                .iter()
                .position(|(stored_key, _)| stored_key.borrow() == key)?
        };
        if rc.is_owned_by(token) {
            if let Self::Collision { entries, .. } = ReferenceCounter::make_mut(rc) {
                let (_, previous) = entries.remove(position);
                return Some(previous);
            }
        }
        let Self::Collision {
            hash: node_hash,
            entries,
            ..
        } = &**rc
        else {
            unreachable!("expected a collision node")
        };
        let mut new_entries = entries.clone();
        let (_, previous) = new_entries.remove(position);
        let replacement = Self::Collision {
            hash: *node_hash,
            entries: new_entries,
            owner: token.cloned(),
        };
        *rc = ReferenceCounter::new(replacement);
        Some(previous)
    }

    fn first_entry_cloned(&self) -> (K, V) {
        let (key, value) = self.entry_at(0);
        (key.clone(), value.clone())
    }
}

// =============================================================================
// Equivalence and content hashing
// =============================================================================

impl<K: Hash + Eq + Clone, V: Clone> Node<K, V> {
    /// Structural equivalence: local entry slices compared in place,
    /// children compared recursively with a pointer-identity fast path, and
    /// collision entries compared as a multiset because they carry no
    /// canonical order.
    pub(crate) fn equivalent(&self, other: &Self) -> bool
    where
        V: PartialEq,
    {
        match (self, other) {
            (
                Self::Branch {
                    data_map: data_map_a,
                    node_map: node_map_a,
                    entries: entries_a,
                    children: children_a,
                    ..
                },
                Self::Branch {
                    data_map: data_map_b,
                    node_map: node_map_b,
                    entries: entries_b,
                    children: children_b,
                    ..
                },
            ) => {
                data_map_a == data_map_b
                    && node_map_a == node_map_b
                    && entries_a
                        .iter()
                        .zip(entries_b.iter())
                        .all(|((key_a, value_a), (key_b, value_b))| {
                            key_a == key_b && value_a == value_b
                        })
                    && children_a
                        .iter()
                        .zip(children_b.iter())
                        .all(|(child_a, child_b)| {
                            ReferenceCounter::ptr_eq(child_a, child_b)
                                || child_a.equivalent(child_b)
                        })
            }
            (
                Self::Collision {
                    hash: hash_a,
                    entries: entries_a,
                    ..
                },
                Self::Collision {
                    hash: hash_b,
                    entries: entries_b,
                    ..
                },
            ) => {
                hash_a == hash_b
                    && entries_a.len() == entries_b.len()
                    && entries_a.iter().all(|(key, value)| {
                        entries_b
                            .iter()
                            .any(|(other_key, other_value)| key == other_key && value == other_value)
                    })
            }
            _ => false,
        }
    }

    /// Order-independent hash of the subtree's contents: a wrapping sum of
    /// per-entry hashes, so equal collections hash equal regardless of
    /// physical layout.
    pub(crate) fn content_hash(&self) -> u64
    where
        V: Hash,
    {
        match self {
            Self::Branch {
                entries, children, ..
            } => {
                let entry_sum = entries
                    .iter()
                    .fold(0_u64, |sum, entry| sum.wrapping_add(hash_key(entry)));
                children
                    .iter()
                    .fold(entry_sum, |sum, child| sum.wrapping_add(child.content_hash()))
            }
            Self::Collision { entries, .. } => entries
                .iter()
                .fold(0_u64, |sum, entry| sum.wrapping_add(hash_key(entry))),
        }
    }
}

// =============================================================================
// Unordered traversal
// =============================================================================

struct TraversalFrame<'a, K, V> {
    node: &'a Node<K, V>,
    next_entry: usize,
    next_child: usize,
}

/// Lazy depth-first traversal over every entry of a subtree, in
/// hash-partition order.
///
/// The stack is bounded by the trie's maximum depth, so it lives in a
/// fixed-capacity `ArrayVec` and never allocates.
pub(crate) struct NodeEntries<'a, K, V> {
    stack: ArrayVec<TraversalFrame<'a, K, V>, MAX_ITER_DEPTH>,
}

impl<'a, K, V> NodeEntries<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>) -> Self {
        let mut stack = ArrayVec::new();
        if let Some(node) = root {
            stack.push(TraversalFrame {
                node,
                next_entry: 0,
                next_child: 0,
            });
        }
        Self { stack }
    }
}

impl<'a, K, V> Iterator for NodeEntries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node = frame.node;
            if frame.next_entry < node.entry_count() {
                let index = frame.next_entry;
                frame.next_entry += 1;
                return Some(node.entry_at(index));
            }
            if frame.next_child < node.child_count() {
                let index = frame.next_child;
                frame.next_child += 1;
                self.stack.push(TraversalFrame {
                    node: node.child_at(index),
                    next_entry: 0,
                    next_child: 0,
                });
                continue;
            }
            self.stack.pop();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    type TestNode = Node<u64, &'static str>;

    /// Builds a root holding `entries`, driving the trie with the given
    /// explicit hashes instead of `hash_key`.
    fn build(entries: &[(u64, u64, &'static str)]) -> ReferenceCounter<TestNode> {
        let mut iterator = entries.iter();
        let &(key, hash, value) = iterator.next().expect("at least one entry");
        let mut root = TestNode::singleton(key, value, hash, None);
        for &(key, hash, value) in iterator {
            TestNode::update(&mut root, None, key, value, hash, 0);
        }
        root
    }

    #[rstest]
    fn test_partition_collision_forces_sub_node() {
        // 1 and 33 share the lowest 5-bit fragment (both 1) but diverge at
        // the next level, so the resident entry is demoted into a sub-node.
        let root = build(&[(1, 1, "a"), (2, 2, "b"), (33, 33, "c")]);

        assert_eq!(root.find_entry(&1, 1, 0), Some((&1, &"a")));
        assert_eq!(root.find_entry(&2, 2, 0), Some((&2, &"b")));
        assert_eq!(root.find_entry(&33, 33, 0), Some((&33, &"c")));
        assert_eq!(root.find_entry(&34, 34, 0), None);

        // The colliding pair lives one level down; key 2 stays inline.
        assert_eq!(root.entry_count(), 1);
        assert_eq!(root.child_count(), 1);
        assert_eq!(root.child_at(0).entry_count(), 2);
        assert_eq!(root.child_at(0).child_count(), 0);
    }

    #[rstest]
    fn test_removing_sub_node_entry_inlines_survivor() {
        let mut root = build(&[(1, 1, "a"), (33, 33, "c")]);
        assert_eq!(root.entry_count(), 0);
        assert_eq!(root.child_count(), 1);

        let removed = TestNode::remove(&mut root, None, &33, 33, 0);
        assert_eq!(removed, Some("c"));

        // The one-entry child collapses back into the root's data slots.
        assert_eq!(root.entry_count(), 1);
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.find_entry(&1, 1, 0), Some((&1, &"a")));
    }

    #[rstest]
    fn test_identical_hashes_build_collision_chain() {
        // Identical 64-bit hashes never diverge, so the merge builds a chain
        // of single-child branches ending in a collision node.
        let root = build(&[(10, 7, "x"), (20, 7, "y")]);

        assert_eq!(root.find_entry(&10, 7, 0), Some((&10, &"x")));
        assert_eq!(root.find_entry(&20, 7, 0), Some((&20, &"y")));

        let mut depth = 0;
        let mut node: &TestNode = &root;
        while node.child_count() == 1 {
            node = node.child_at(0);
            depth += 1;
        }
        assert!(matches!(node, Node::Collision { .. }));
        assert_eq!(node.entry_count(), 2);
        // Thirteen branch levels sit above the collision leaf.
        assert_eq!(depth, 13);
    }

    #[rstest]
    fn test_collision_chain_collapses_on_removal() {
        let mut root = build(&[(10, 7, "x"), (20, 7, "y")]);

        let removed = TestNode::remove(&mut root, None, &10, 7, 0);
        assert_eq!(removed, Some("x"));

        // The whole chain unwinds: the survivor ends up inline at the root.
        assert_eq!(root.entry_count(), 1);
        assert_eq!(root.child_count(), 0);
        assert_eq!(root.find_entry(&20, 7, 0), Some((&20, &"y")));
        assert_eq!(root.find_entry(&10, 7, 0), None);
    }

    #[rstest]
    fn test_collision_update_replaces_value() {
        let mut root = build(&[(10, 7, "x"), (20, 7, "y")]);
        let change = TestNode::update(&mut root, None, 20, "z", 7, 0);
        assert!(matches!(change, Change::Replaced { previous: "y" }));
        assert_eq!(root.find_entry(&20, 7, 0), Some((&20, &"z")));
        assert_eq!(root.find_entry(&10, 7, 0), Some((&10, &"x")));
    }

    #[rstest]
    fn test_persistent_update_leaves_old_root_intact() {
        let old_root = build(&[(1, 1, "a"), (2, 2, "b")]);
        let mut new_root = old_root.clone();
        TestNode::update(&mut new_root, None, 1, "changed", 1, 0);

        assert_eq!(old_root.find_entry(&1, 1, 0), Some((&1, &"a")));
        assert_eq!(new_root.find_entry(&1, 1, 0), Some((&1, &"changed")));
        // Untouched subtrees stay shared, touched paths diverge.
        assert!(!ReferenceCounter::ptr_eq(&old_root, &new_root));
    }

    #[rstest]
    fn test_owned_update_mutates_in_place() {
        let token = OwnershipToken::new();
        let mut root = TestNode::singleton(1, "a", 1, Some(&token));
        let pointer_before = ReferenceCounter::as_ptr(&root);

        TestNode::update(&mut root, Some(&token), 2, "b", 2, 0);
        TestNode::update(&mut root, Some(&token), 1, "a2", 1, 0);

        assert_eq!(ReferenceCounter::as_ptr(&root), pointer_before);
        assert_eq!(root.find_entry(&1, 1, 0), Some((&1, &"a2")));
        assert_eq!(root.find_entry(&2, 2, 0), Some((&2, &"b")));
    }

    #[rstest]
    fn test_foreign_token_copies_instead_of_mutating() {
        let batch_token = OwnershipToken::new();
        let root = TestNode::singleton(1, "a", 1, Some(&batch_token));

        // A later batch with a different token must not touch these nodes.
        let foreign_token = OwnershipToken::new();
        let mut edited = root.clone();
        TestNode::update(&mut edited, Some(&foreign_token), 1, "b", 1, 0);

        assert!(!ReferenceCounter::ptr_eq(&root, &edited));
        assert_eq!(root.find_entry(&1, 1, 0), Some((&1, &"a")));
        assert_eq!(edited.find_entry(&1, 1, 0), Some((&1, &"b")));
    }

    #[rstest]
    fn test_structural_copy_is_unowned() {
        let token = OwnershipToken::new();
        let root = TestNode::singleton(1, "a", 1, Some(&token));
        let copy = (*root).clone();
        assert!(copy.owner().is_none());
    }

    #[rstest]
    fn test_equivalent_ignores_collision_entry_order() {
        let forward = build(&[(10, 7, "x"), (20, 7, "y")]);
        let backward = build(&[(20, 7, "y"), (10, 7, "x")]);
        assert!(forward.equivalent(&backward));
        assert_eq!(forward.content_hash(), backward.content_hash());
    }

    #[rstest]
    fn test_equivalent_detects_value_difference() {
        let left = build(&[(1, 1, "a"), (2, 2, "b")]);
        let right = build(&[(1, 1, "a"), (2, 2, "changed")]);
        assert!(!left.equivalent(&right));
    }

    #[rstest]
    fn test_traversal_visits_every_entry_once() {
        let root = build(&[(1, 1, "a"), (2, 2, "b"), (33, 33, "c"), (10, 7, "x"), (20, 7, "y")]);
        let mut keys: Vec<u64> = NodeEntries::new(Some(&root)).map(|(key, _)| *key).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 10, 20, 33]);
    }

    #[rstest]
    fn test_traversal_of_empty_root() {
        let entries = NodeEntries::<u64, &'static str>::new(None);
        assert_eq!(entries.count(), 0);
    }
}
