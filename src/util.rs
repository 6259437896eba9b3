//! Support functions that don't belong anywhere else.

use fnv::FnvHasher;
use std::collections;
use std::hash::BuildHasherDefault;

/// Type alias for hashmaps to allow swapping out the implementation.
///
/// Keys are short byte strings or small integers, so FNV wins over the
/// default SipHash.
pub(crate) type HashMap<K, V> = collections::HashMap<K, V, BuildHasherDefault<FnvHasher>>;
/// Type alias for hashsets to allow swapping out the implementation.
pub(crate) type HashSet<K> = collections::HashSet<K, BuildHasherDefault<FnvHasher>>;

/// Empties a vector of a POD type.
///
/// With `T: Copy` there is no drop glue and `clear` is already a bare
/// length reset; the bound keeps non-POD payloads out of the verifier's
/// per-proof reset path.
pub(crate) fn fast_clear<T: Copy>(vec: &mut Vec<T>) {
    vec.clear();
}

/// Appends a POD slice to a vector.
///
/// `extend_from_slice` lowers to a plain `memcpy` for `T: Copy`; the name
/// marks the call sites that sit on the per-step path of the verifier.
pub(crate) fn fast_extend<T: Copy>(vec: &mut Vec<T>, other: &[T]) {
    vec.extend_from_slice(other);
}
