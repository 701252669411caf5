use crate::cuda::atomic::{AtomicAdd, AtomicInt};
use crate::GpuBrick;
use cuda_std::thread;
use ember_core::grid::{fractional_coords, owning_cell};
use ember_core::math::{Point, Real, Vector};
use ember_core::prelude::{ParticlePosition, SpreadErrorCode};
use ember_core::utils::resequence_index;

/// Bins every particle into its owning cell's atom list.
///
/// Workers are assigned particles through the stride permutation so that a
/// dense region does not put a whole warp on the same cell counter at
/// once. Launch over `resequenced_len(particles_len, resequence_skip)`
/// worker identities.
#[cuda_std::kernel]
pub unsafe fn particle_map(
    positions: *const ParticlePosition,
    particles_len: u32,
    resequence_skip: u32,
    box_lo: Point<Real>,
    inv_spacing: Vector<Real>,
    mut brick: GpuBrick,
) {
    let id = thread::index();
    if let Some(particle_id) = resequence_index(id, resequence_skip, particles_len) {
        let p = &*positions.add(particle_id as usize);
        map_particle(particle_id, &p.point, &box_lo, &inv_spacing, &mut brick);
    }
}

pub(crate) unsafe fn map_particle(
    particle_id: u32,
    point: &Point<Real>,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
    brick: &mut GpuBrick,
) {
    let t = fractional_coords(point, box_lo, inv_spacing);
    let cell = owning_cell(t);

    if !brick.shape().contains_cell(cell) {
        brick.raise_error(SpreadErrorCode::OutOfDomain);
        return;
    }

    let cell_id = brick.shape().cell_index(cell.map(|e| e as u32));
    let slot = brick.cell_count_mut(cell_id).global_atomic_add(1);

    if slot >= brick.cell_capacity() {
        // Undo the reservation so the counter settles back at capacity.
        brick.cell_count_mut(cell_id).global_atomic_sub(1);
        brick.raise_error(SpreadErrorCode::CellOverflow);
        return;
    }

    *brick.cell_atom_mut(cell_id, slot) = particle_id;
}
