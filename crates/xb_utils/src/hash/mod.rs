//! Hash containers with a fixed seed, re-exports *hashbrown* and *foldhash*.

// -----------------------------------------------------------------------------
// Modules

mod hasher;

pub mod hash_map;

// -----------------------------------------------------------------------------
// Exports

pub use hasher::{FixedHashState, FixedHasher};
pub use hasher::{NoOpHashState, NoOpHasher};

pub use hash_map::{HashMap, HashSet};

// -----------------------------------------------------------------------------
// Re-export crates

pub use foldhash;
pub use hashbrown;
