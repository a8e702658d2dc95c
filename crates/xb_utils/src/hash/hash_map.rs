//! [`hashbrown`] containers defaulting to [`FixedHashState`].

use super::FixedHashState;

/// A [`hashbrown::HashMap`] using [`FixedHashState`] unless told otherwise.
///
/// Iteration order depends only on the inserted keys, so documents built
/// from the map (for example diagnostics listing registered names) are
/// reproducible between runs.
///
/// # Examples
///
/// ```
/// use xb_utils::hash::HashMap;
///
/// let mut map: HashMap<&str, u32> = HashMap::default();
/// map.insert("circle", 1);
/// assert_eq!(map.get("circle"), Some(&1));
/// ```
pub type HashMap<K, V, S = FixedHashState> = hashbrown::HashMap<K, V, S>;

/// A [`hashbrown::HashSet`] using [`FixedHashState`] unless told otherwise.
pub type HashSet<T, S = FixedHashState> = hashbrown::HashSet<T, S>;

pub use hashbrown::hash_map::{Entry, OccupiedEntry, VacantEntry};
