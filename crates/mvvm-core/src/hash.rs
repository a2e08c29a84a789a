//! Fast hash map and hash set type aliases.
//!
//! The store keys almost everything by short string ids or [`TypeId`]s
//! (`std::any::TypeId`), and none of it is attacker controlled, so the Fx hash
//! from `rustc-hash` is used instead of the SipHash default.
//!
//! # Examples
//!
//! ```
//! use mvvm_core::{FxHashMap, FxHashSet};
//!
//! let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
//! counts.insert("sidebar", 2);
//!
//! let mut mounting: FxHashSet<&str> = FxHashSet::default();
//! mounting.insert("sidebar");
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new [`FxHashMap`] with the specified capacity.
#[inline]
#[must_use]
pub fn fx_hash_map_with_capacity<K, V>(capacity: usize) -> FxHashMap<K, V> {
    FxHashMap::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_with_capacity() {
        let map: FxHashMap<String, usize> = fx_hash_map_with_capacity(64);
        assert!(map.capacity() >= 64);
    }
}
