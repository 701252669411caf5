pub use self::charge_spread::{spread_scatter, spread_tiled_gather};
pub use self::particle_map::map_particles;

use std::sync::atomic::AtomicU32;

mod charge_spread;
mod particle_map;

/// Reinterprets exclusively borrowed words as atomics for the duration of
/// a concurrent pass.
pub(crate) fn atomic_view(words: &mut [u32]) -> &[AtomicU32] {
    unsafe { std::slice::from_raw_parts(words.as_mut_ptr() as *const AtomicU32, words.len()) }
}

/// Same as [`atomic_view`], for a brick of reals accumulated through their
/// bit representation.
pub(crate) fn atomic_real_view(values: &mut [f32]) -> &[AtomicU32] {
    unsafe { std::slice::from_raw_parts(values.as_mut_ptr() as *const AtomicU32, values.len()) }
}
