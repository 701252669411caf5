pub use self::atomic::{AtomicAdd, AtomicInt};
pub use self::particle_map::particle_map;
pub use self::reset::{reset_brick, reset_cells};
pub use self::spread::{spread_charge, spread_charge_resequenced, spread_charge_tiled};

/// Workers per group for the particle-indexed kernels.
pub const MAP_THREADS: u32 = 512;
/// Workers per group for the scatter kernels.
pub const SPREAD_THREADS: u32 = 128;
/// Edge length of one (y, z) tile of the gather kernel; groups are
/// `SPREAD_TILE × SPREAD_TILE` workers.
pub const SPREAD_TILE: u32 = 8;

mod atomic;
mod particle_map;
mod reset;
mod spread;
