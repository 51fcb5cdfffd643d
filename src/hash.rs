//! Key hashing for the CHAMP trie.
//!
//! All trie operations address nodes by a precomputed 64-bit key hash. The
//! hasher is selected at compile time: `std`'s `DefaultHasher` by default,
//! or a faster non-cryptographic hasher under the `fxhash`/`ahash` features.
//! Whichever hasher is selected, it must produce identical hashes for
//! identical keys for the lifetime of the process, because structural
//! equality compares tries whose shapes are derived from those hashes.

use std::hash::Hash;

/// Computes the 64-bit hash of a key using `DefaultHasher`.
#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
pub(crate) fn hash_key<Q: Hash + ?Sized>(key: &Q) -> u64 {
    use std::hash::Hasher;

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Computes the 64-bit hash of a key using `FxHasher`.
#[cfg(feature = "fxhash")]
pub(crate) fn hash_key<Q: Hash + ?Sized>(key: &Q) -> u64 {
    use std::hash::Hasher;

    let mut hasher = rustc_hash::FxHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Computes the 64-bit hash of a key using `ahash`.
///
/// The random state is created once per process so that hashes stay stable
/// across every collection in the program.
#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
pub(crate) fn hash_key<Q: Hash + ?Sized>(key: &Q) -> u64 {
    use std::hash::BuildHasher;
    use std::sync::OnceLock;

    static STATE: OnceLock<ahash::RandomState> = OnceLock::new();
    STATE.get_or_init(ahash::RandomState::new).hash_one(key)
}

#[cfg(test)]
mod tests {
    use super::hash_key;
    use rstest::rstest;

    #[rstest]
    fn test_hash_is_stable_across_calls() {
        assert_eq!(hash_key("key"), hash_key("key"));
        assert_eq!(hash_key(&42_u64), hash_key(&42_u64));
    }

    #[rstest]
    fn test_hash_of_borrowed_form_matches_owned() {
        let owned = "borrowed".to_string();
        assert_eq!(hash_key(&owned), hash_key("borrowed"));
    }
}
