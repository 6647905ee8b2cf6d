//! Provide stable name hashing and hash containers keyed by pre-hashed values.
//!
//! - [`fnv1a_32`]: 32-bit FNV-1a over UTF-8 bytes. The result only depends on
//!   the input, so it can be stored in files and compared across processes.
//! - [`NoOpHashState`]: a `BuildHasher` that passes an already computed hash
//!   through unchanged.
//! - [`PreHashMap`]: a [`hashbrown::HashMap`] using [`NoOpHashState`].

// -----------------------------------------------------------------------------
// Modules

mod hasher;
mod name_hash;

// -----------------------------------------------------------------------------
// Exports

pub use hasher::{NoOpHashState, NoOpHasher};
pub use name_hash::{fnv1a_32, fnv1a_32_bytes};

/// A hash map whose keys are already well distributed hashes.
pub type PreHashMap<K, V> = hashbrown::HashMap<K, V, NoOpHashState>;

/// A hash set whose values are already well distributed hashes.
pub type PreHashSet<K> = hashbrown::HashSet<K, NoOpHashState>;

// -----------------------------------------------------------------------------
// Re-export crates

pub use hashbrown;
