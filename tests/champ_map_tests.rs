//! Unit tests for ChampMap.
//!
//! These tests exercise the full facade API, the hash-collision paths via a
//! poisoned hash function, and the persistence guarantees across versions.

use champ_collections::ChampMap;
use rstest::rstest;
use std::hash::{Hash, Hasher};

// =============================================================================
// Poisoned-hash key: every instance shares one full 64-bit hash
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
struct CollidingKey {
    id: u32,
}

impl CollidingKey {
    const fn new(id: u32) -> Self {
        Self { id }
    }
}

impl Hash for CollidingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Deliberately constant: forces every key onto the collision path.
        state.write_u8(0);
    }
}

// =============================================================================
// Construction and basic operations
// =============================================================================

#[rstest]
fn test_new_creates_empty_map() {
    let map: ChampMap<String, i32> = ChampMap::new();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.get("anything"), None);
}

#[rstest]
fn test_default_creates_empty_map() {
    let map: ChampMap<String, i32> = ChampMap::default();
    assert!(map.is_empty());
}

#[rstest]
fn test_lookup_after_insert_returns_last_written_value() {
    let map = ChampMap::new()
        .insert(1, "first")
        .insert(2, "second")
        .insert(1, "rewritten");

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&1), Some(&"rewritten"));
    assert_eq!(map.get(&2), Some(&"second"));
}

#[rstest]
fn test_concrete_scenario_with_partitioned_keys() {
    let map = ChampMap::new()
        .insert(1, "a".to_string())
        .insert(2, "b".to_string())
        .insert(33, "c".to_string());

    assert_eq!(map.get(&33), Some(&"c".to_string()));
    assert_eq!(map.get(&1), Some(&"a".to_string()));
    assert_eq!(map.len(), 3);

    let removed = map.remove(&2);
    assert_eq!(removed.len(), 2);
    assert_eq!(removed.get(&2), None);
    assert_eq!(removed.get(&1), Some(&"a".to_string()));
    assert_eq!(removed.get(&33), Some(&"c".to_string()));
}

#[rstest]
fn test_get_key_value_returns_stored_key() {
    let map = ChampMap::new().insert("stored".to_string(), 7);
    let (key, value) = map.get_key_value("stored").unwrap();
    assert_eq!(key, "stored");
    assert_eq!(*value, 7);
}

#[rstest]
fn test_borrowed_form_lookup() {
    let map = ChampMap::new().insert("hello".to_string(), 42);
    assert_eq!(map.get("hello"), Some(&42));
    assert!(map.contains_key("hello"));
    assert_eq!(map.remove("hello").len(), 0);
}

// =============================================================================
// Persistence
// =============================================================================

#[rstest]
fn test_insert_preserves_all_previous_versions() {
    let mut versions = vec![ChampMap::new()];
    for index in 0..100 {
        let next = versions.last().unwrap().insert(index, index * 10);
        versions.push(next);
    }

    for (version_length, version) in versions.iter().enumerate() {
        assert_eq!(version.len(), version_length);
        for index in 0..version_length as i32 {
            assert_eq!(version.get(&index), Some(&(index * 10)));
        }
    }
}

#[rstest]
fn test_remove_preserves_previous_version() {
    let map: ChampMap<i32, i32> = (0..50).map(|index| (index, index)).collect();
    let mut shrinking = map.clone();
    for index in 0..50 {
        shrinking = shrinking.remove(&index);
    }

    assert!(shrinking.is_empty());
    assert_eq!(map.len(), 50);
    for index in 0..50 {
        assert_eq!(map.get(&index), Some(&index));
    }
}

#[rstest]
fn test_extract_reports_removed_value() {
    let map = ChampMap::new().insert("a".to_string(), 1).insert("b".to_string(), 2);

    let (value, rest) = map.extract("a").unwrap();
    assert_eq!(value, 1);
    assert_eq!(rest.len(), 1);
    assert_eq!(map.len(), 2);
    assert!(map.extract("missing").is_none());
}

// =============================================================================
// Structural equality
// =============================================================================

#[rstest]
fn test_equality_is_insertion_order_independent() {
    let entries: Vec<(i32, i32)> = (0..200).map(|index| (index, index * 3)).collect();

    let forward: ChampMap<i32, i32> = entries.iter().copied().collect();
    let backward: ChampMap<i32, i32> = entries.iter().rev().copied().collect();

    assert_eq!(forward, backward);
}

#[rstest]
fn test_equality_detects_value_difference() {
    let left = ChampMap::new().insert(1, "a").insert(2, "b");
    let right = ChampMap::new().insert(1, "a").insert(2, "different");
    assert_ne!(left, right);
}

#[rstest]
fn test_equality_detects_size_difference() {
    let left: ChampMap<i32, i32> = (0..10).map(|index| (index, index)).collect();
    let right: ChampMap<i32, i32> = (0..11).map(|index| (index, index)).collect();
    assert_ne!(left, right);
}

// =============================================================================
// Hash collisions
// =============================================================================

#[rstest]
fn test_colliding_keys_are_independently_retrievable() {
    let mut map = ChampMap::new();
    for id in 0..10 {
        map = map.insert(CollidingKey::new(id), id * 100);
    }

    assert_eq!(map.len(), 10);
    for id in 0..10 {
        assert_eq!(map.get(&CollidingKey::new(id)), Some(&(id * 100)));
    }
    assert_eq!(map.get(&CollidingKey::new(99)), None);
}

#[rstest]
fn test_colliding_key_value_replacement() {
    let map = ChampMap::new()
        .insert(CollidingKey::new(1), "one")
        .insert(CollidingKey::new(2), "two")
        .insert(CollidingKey::new(1), "uno");

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(&CollidingKey::new(1)), Some(&"uno"));
    assert_eq!(map.get(&CollidingKey::new(2)), Some(&"two"));
}

#[rstest]
fn test_removing_colliding_keys_leaves_others_retrievable() {
    let mut map = ChampMap::new();
    for id in 0..5 {
        map = map.insert(CollidingKey::new(id), id);
    }

    let removed = map.remove(&CollidingKey::new(2));
    assert_eq!(removed.len(), 4);
    assert_eq!(removed.get(&CollidingKey::new(2)), None);
    for id in [0, 1, 3, 4] {
        assert_eq!(removed.get(&CollidingKey::new(id)), Some(&id));
    }
}

#[rstest]
fn test_collision_pair_collapses_to_single_entry() {
    // Two fully colliding keys; removing one must leave the survivor
    // retrievable after the collision node collapses away.
    let map = ChampMap::new()
        .insert(CollidingKey::new(1), "x")
        .insert(CollidingKey::new(2), "y");

    let survivor_only = map.remove(&CollidingKey::new(1));
    assert_eq!(survivor_only.len(), 1);
    assert_eq!(survivor_only.get(&CollidingKey::new(2)), Some(&"y"));
    assert_eq!(survivor_only.get(&CollidingKey::new(1)), None);

    let emptied = survivor_only.remove(&CollidingKey::new(2));
    assert!(emptied.is_empty());
}

#[rstest]
fn test_colliding_maps_compare_equal_regardless_of_entry_order() {
    let forward = ChampMap::new()
        .insert(CollidingKey::new(1), "x")
        .insert(CollidingKey::new(2), "y");
    let backward = ChampMap::new()
        .insert(CollidingKey::new(2), "y")
        .insert(CollidingKey::new(1), "x");

    assert_eq!(forward, backward);
}

// =============================================================================
// Combinators and iteration
// =============================================================================

#[rstest]
fn test_update_applies_function_to_existing_value() {
    let map = ChampMap::new().insert("count".to_string(), 10);
    let updated = map.update("count", |value| value * 2).unwrap();
    assert_eq!(updated.get("count"), Some(&20));
    assert!(map.update("absent", |value| *value).is_none());
}

#[rstest]
fn test_merge_prefers_other_on_conflicts() {
    let left: ChampMap<i32, &str> = [(1, "left"), (2, "left")].into_iter().collect();
    let right: ChampMap<i32, &str> = [(2, "right"), (3, "right")].into_iter().collect();

    let merged = left.merge(&right);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.get(&1), Some(&"left"));
    assert_eq!(merged.get(&2), Some(&"right"));
    assert_eq!(merged.get(&3), Some(&"right"));
}

#[rstest]
fn test_iterators_cover_all_entries() {
    let map: ChampMap<i32, i32> = (0..64).map(|index| (index, -index)).collect();

    assert_eq!(map.iter().count(), 64);
    assert_eq!(map.keys().count(), 64);
    assert_eq!(map.values().count(), 64);

    let mut pairs: Vec<(i32, i32)> = map.clone().into_iter().collect();
    pairs.sort_unstable();
    let expected: Vec<(i32, i32)> = (0..64).map(|index| (index, -index)).collect();
    assert_eq!(pairs, expected);
}

#[rstest]
fn test_exact_size_iterator_reports_remaining() {
    let map: ChampMap<i32, i32> = (0..5).map(|index| (index, index)).collect();
    let mut iterator = map.iter();
    assert_eq!(iterator.len(), 5);
    iterator.next();
    assert_eq!(iterator.len(), 4);
}
