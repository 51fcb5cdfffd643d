//! # champ-collections
//!
//! Persistent (immutable) map and set collections backed by CHAMP tries.
//!
//! ## Overview
//!
//! CHAMP (Compressed Hash-Array Mapped Prefix-tree) is a refinement of the
//! Hash Array Mapped Trie that keeps inline entries and sub-node pointers in
//! separate bitmap-compressed regions of each node. The collections in this
//! crate share structure between versions: every mutating operation returns
//! a new collection and leaves the original untouched.
//!
//! - [`ChampMap`]: persistent hash map, O(log32 N) get/insert/remove
//! - [`ChampSet`]: persistent hash set built on [`ChampMap`]
//! - [`SequencedChampSet`]: persistent set that preserves insertion order
//! - [`TransientChampMap`] / [`TransientChampSet`]: temporarily mutable
//!   editors for efficient batch updates
//!
//! ## Structural Sharing
//!
//! Nodes are reference-counted and immutable once shared. A transient editor
//! holds an ownership token; nodes created during the batch are marked with
//! that token and may be mutated in place because no other version can reach
//! them yet. Converting the editor back to a persistent value discards the
//! token, freezing the nodes.
//!
//! ## Example
//!
//! ```rust
//! use champ_collections::ChampMap;
//!
//! let map = ChampMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` for node references, making the
//!   persistent types `Send`/`Sync` when their contents are
//! - `fxhash`: hash keys with `rustc-hash`'s `FxHasher`
//! - `ahash`: hash keys with `ahash` (randomly seeded once per process)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod hash;
mod map;
mod node;
mod sequenced;
mod set;

pub use map::ChampMap;
pub use map::ChampMapIntoIterator;
pub use map::ChampMapIterator;
pub use map::TransientChampMap;
pub use sequenced::SequencedChampSet;
pub use sequenced::SequencedChampSetIntoIterator;
pub use sequenced::SequencedChampSetIterator;
pub use sequenced::SequencedChampSetReverseIterator;
pub use set::ChampSet;
pub use set::ChampSetIntoIterator;
pub use set::ChampSetIterator;
pub use set::TransientChampSet;

// =============================================================================
// Tests
// =============================================================================
