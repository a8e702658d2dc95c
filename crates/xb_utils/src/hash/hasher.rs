//! Provide `FixedHasher` and `NoOpHasher`.
//!
//! `FixedHasher` wraps `foldhash` with a constant seed, so equal input
//! always hashes to the same value in every process.
//!
//! `NoOpHasher` passes an already well-distributed `u64` (such as the
//! content of a `TypeId`) straight through.

use core::fmt::Debug;
use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// FixedHasher

const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x3C6E_F372_FE94_F82B);

/// A hasher whose output only depends on the input.
///
/// Alias for [`foldhash::fast::FoldHasher`], created by [`FixedHashState`].
pub type FixedHasher = FoldHasher<'static>;

/// [`BuildHasher`] producing [`FixedHasher`]s from a constant seed.
///
/// # Examples
///
/// ```
/// use core::hash::BuildHasher;
/// use xb_utils::hash::FixedHashState;
///
/// let a = FixedHashState.hash_one("string");
/// let b = FixedHashState.hash_one("string");
/// assert_eq!(a, b);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// NoOpHasher

/// A hasher that stores the last written `u64` as the hash.
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
        // `TypeId` hashes through `write_u64`, this path only folds stray bytes.
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// [`BuildHasher`] producing [`NoOpHasher`]s.
///
/// Only suitable for keys whose `Hash` impl writes a single random-looking
/// `u64`, which is the case for [`TypeId`](core::any::TypeId).
///
/// # Examples
///
/// ```
/// use core::hash::{BuildHasher, Hasher};
/// use xb_utils::hash::NoOpHashState;
///
/// let mut hasher = NoOpHashState.build_hasher();
/// hasher.write_u64(42);
/// assert_eq!(hasher.finish(), 42);
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
