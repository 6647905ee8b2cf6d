use core::hash::{BuildHasher, Hasher};

/// A no-op hasher that passes a pre-computed hash through.
///
/// Integer writes replace the state, so a `u32` key hashes to itself.
/// Other writes fold the bytes in, which keeps it usable (if weak)
/// for keys that are not hashes.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash = self.hash.rotate_left(8) ^ (*byte as u64);
        }
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        // Spread the 32-bit hash into the high bits too, hashbrown
        // takes its control byte from the top of the `u64`.
        self.hash = (i as u64) | ((i as u64) << 32);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// `BuildHasher` for [`NoOpHasher`].
///
/// # Examples
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::NoOpHashState;
///
/// let hash = NoOpHashState.hash_one(7_u64);
/// assert_eq!(hash, 7);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher { hash: 0 }
    }
}
