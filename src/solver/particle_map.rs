use crate::core::grid::{fractional_coords, owning_cell};
use crate::core::prelude::{BrickShape, ParticlePosition, SpreadErrorCode};
use crate::core::utils::{resequence_index, resequenced_len};
use crate::geometry::CellAtomLists;
use crate::math::{Point, Real, Vector};
use crate::solver::atomic_view;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bins every local particle into its owning cell's atom list.
///
/// Each particle is handled independently: the owning cell is the per-axis
/// floor of the fractional grid coordinates, a slot is reserved with an
/// atomic increment, and out-of-domain or overflowing particles merge
/// their code into the shared flag instead of being inserted. Workers go
/// through the stride permutation so that neighbors in dispatch order hit
/// different cell counters.
pub fn map_particles(
    positions: &[ParticlePosition],
    num_local: usize,
    shape: &BrickShape,
    cells: &mut CellAtomLists,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
    resequence_skip: u32,
    error_flag: &AtomicU32,
) {
    let capacity = cells.capacity();
    let (counts, atoms) = cells.views_mut();
    let (counts, atoms) = (atomic_view(counts), atomic_view(atoms));

    let padded = resequenced_len(num_local as u32, resequence_skip);

    (0..padded).into_par_iter().for_each(|id| {
        let particle_id = match resequence_index(id, resequence_skip, num_local as u32) {
            Some(particle_id) => particle_id,
            None => return,
        };

        let t = fractional_coords(
            &positions[particle_id as usize].point,
            box_lo,
            inv_spacing,
        );
        let cell = owning_cell(t);

        if !shape.contains_cell(cell) {
            error_flag.fetch_max(SpreadErrorCode::OutOfDomain.to_raw(), Ordering::Relaxed);
            return;
        }

        let cell_id = shape.cell_index(cell.map(|e| e as u32));
        let slot = counts[cell_id].fetch_add(1, Ordering::Relaxed);

        if slot >= capacity {
            // Undo the reservation so the counter settles back at capacity.
            counts[cell_id].fetch_sub(1, Ordering::Relaxed);
            error_flag.fetch_max(SpreadErrorCode::CellOverflow.to_raw(), Ordering::Relaxed);
            return;
        }

        atoms[cell_id * capacity as usize + slot as usize].store(particle_id, Ordering::Relaxed);
    });
}
