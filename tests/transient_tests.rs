//! Tests for the transient (owned batch) editors.
//!
//! The critical property here is isolation: an ownership token must never
//! let one batch disturb nodes reachable from a persistent version or from
//! a different batch.

use champ_collections::{ChampMap, ChampSet, TransientChampMap, TransientChampSet};
use rstest::rstest;

// =============================================================================
// Batch building
// =============================================================================

#[rstest]
fn test_large_batch_builds_correct_map() {
    let mut transient = TransientChampMap::new();
    for index in 0..1000 {
        transient.insert(index, index * 2);
    }
    let map = transient.persistent();

    assert_eq!(map.len(), 1000);
    for index in 0..1000 {
        assert_eq!(map.get(&index), Some(&(index * 2)));
    }
}

#[rstest]
fn test_batch_with_replacements_and_removals() {
    let mut transient = TransientChampMap::new();
    for index in 0..100 {
        transient.insert(index, "original");
    }
    for index in 0..50 {
        assert_eq!(transient.insert(index, "rewritten"), Some("original"));
    }
    for index in 50..75 {
        assert_eq!(transient.remove(&index), Some("original"));
    }

    let map = transient.persistent();
    assert_eq!(map.len(), 75);
    assert_eq!(map.get(&0), Some(&"rewritten"));
    assert_eq!(map.get(&60), None);
    assert_eq!(map.get(&80), Some(&"original"));
}

#[rstest]
fn test_batch_remove_to_empty_and_refill() {
    let seed: ChampMap<i32, i32> = (0..10).map(|index| (index, index)).collect();
    let mut transient = seed.transient();
    for index in 0..10 {
        transient.remove(&index);
    }
    assert!(transient.is_empty());

    transient.insert(42, 42);
    let map = transient.persistent();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&42), Some(&42));
}

// =============================================================================
// Isolation across versions and batches
// =============================================================================

#[rstest]
fn test_batch_never_disturbs_seed_map() {
    let seed: ChampMap<i32, i32> = (0..200).map(|index| (index, index)).collect();

    let mut transient = seed.transient();
    for index in 0..200 {
        transient.insert(index, index + 1000);
    }
    for index in 0..100 {
        transient.remove(&index);
    }
    let edited = transient.persistent();

    // The seed is byte-for-byte observationally unchanged.
    assert_eq!(seed.len(), 200);
    for index in 0..200 {
        assert_eq!(seed.get(&index), Some(&index));
    }
    assert_eq!(edited.len(), 100);
    assert_eq!(edited.get(&150), Some(&1150));
}

#[rstest]
fn test_immutability_holds_across_distinct_batches() {
    // A token used for one batch must not enable mutation of nodes frozen
    // by an earlier batch.
    let mut first_batch = TransientChampMap::new();
    for index in 0..50 {
        first_batch.insert(index, "first");
    }
    let first = first_batch.persistent();

    let mut second_batch = first.transient();
    for index in 0..50 {
        second_batch.insert(index, "second");
    }
    let second = second_batch.persistent();

    for index in 0..50 {
        assert_eq!(first.get(&index), Some(&"first"));
        assert_eq!(second.get(&index), Some(&"second"));
    }
}

#[rstest]
fn test_interleaved_snapshots_stay_frozen() {
    let snapshot_a: ChampMap<i32, i32> = (0..20).map(|index| (index, index)).collect();

    let mut batch = snapshot_a.transient();
    batch.insert(0, 999);
    let snapshot_b = batch.persistent();

    let mut later_batch = snapshot_b.transient();
    later_batch.remove(&0);
    let snapshot_c = later_batch.persistent();

    assert_eq!(snapshot_a.get(&0), Some(&0));
    assert_eq!(snapshot_b.get(&0), Some(&999));
    assert_eq!(snapshot_c.get(&0), None);
}

// =============================================================================
// Transient sets
// =============================================================================

#[rstest]
fn test_transient_set_batch() {
    let mut transient = TransientChampSet::new();
    for element in 0..500 {
        assert!(transient.insert(element));
    }
    for element in 0..500 {
        assert!(!transient.insert(element));
    }
    for element in (0..500).step_by(2) {
        assert!(transient.remove(&element));
    }

    let set = transient.persistent();
    assert_eq!(set.len(), 250);
    assert!(set.contains(&1));
    assert!(!set.contains(&2));
}

#[rstest]
fn test_transient_set_isolation_from_seed() {
    let seed: ChampSet<i32> = (0..100).collect();
    let mut transient = seed.transient();
    for element in 0..100 {
        transient.remove(&element);
    }
    let emptied = transient.persistent();

    assert!(emptied.is_empty());
    assert_eq!(seed.len(), 100);
}

// =============================================================================
// Extend
// =============================================================================

#[rstest]
fn test_extend_matches_individual_inserts() {
    let entries: Vec<(i32, i32)> = (0..50).map(|index| (index, index * 3)).collect();

    let mut extended = TransientChampMap::new();
    extended.extend(entries.iter().copied());

    let mut inserted = TransientChampMap::new();
    for (key, value) in entries {
        inserted.insert(key, value);
    }

    assert_eq!(extended.persistent(), inserted.persistent());
}
