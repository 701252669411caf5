use crate::core::grid::{fractional_coords, owning_cell};
use crate::core::prelude::{AssignmentStencil, ParticlePosition};
use crate::core::utils::{atomic_f32_add, resequence_index, resequenced_len};
use crate::geometry::{CellAtomLists, ChargeBrick};
use crate::math::{Point, Real, Vector};
use crate::solver::atomic_real_view;
use na::vector;
use rayon::prelude::*;

/// Per-particle scatter: one worker per particle, every stencil point
/// updated through the lock-free bit-representation accumulation.
///
/// With `resequence_skip > 1` this is the resequenced variant: adjacent
/// workers deposit into cells that far apart, thinning out retry-loop
/// collisions without changing the result.
pub fn spread_scatter(
    positions: &[ParticlePosition],
    charges: &[Real],
    num_local: usize,
    stencil: &AssignmentStencil,
    brick: &mut ChargeBrick,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
    density_scale: Real,
    resequence_skip: u32,
) {
    let shape = *brick.shape();
    let values = atomic_real_view(brick.values_mut());

    let ord = stencil.order() as usize;
    let nlower = stencil.nlower();
    let padded = resequenced_len(num_local as u32, resequence_skip);

    (0..padded).into_par_iter().for_each(|id| {
        let particle_id = match resequence_index(id, resequence_skip, num_local as u32) {
            Some(particle_id) => particle_id as usize,
            None => return,
        };

        let t = fractional_coords(&positions[particle_id].point, box_lo, inv_spacing);
        let cell = owning_cell(t);

        if !shape.contains_cell(cell) {
            // The mapper already failed the pass; this charge is excluded.
            return;
        }

        let frac = t - cell.cast::<Real>();
        let w = stencil.precompute_weights(frac);
        let q = charges[particle_id] * density_scale;

        for k in 0..ord {
            let wz = w[2][k] * q;
            for j in 0..ord {
                let wyz = w[1][j] * wz;
                for i in 0..ord {
                    let point = vector![
                        cell.x + nlower + i as i32,
                        cell.y + nlower + j as i32,
                        cell.z + nlower + k as i32
                    ];
                    atomic_f32_add(&values[shape.point_index(point)], w[0][i] * wyz);
                }
            }
        }
    });
}

/// Tiled gather: workers own disjoint z-planes of the brick and walk the
/// cell columns along x, keeping an `order`-long running ring per (y, z)
/// point (the per-column halo carry). Every brick point is written by
/// exactly one worker, so no accumulation primitive is needed.
pub fn spread_tiled_gather(
    positions: &[ParticlePosition],
    charges: &[Real],
    stencil: &AssignmentStencil,
    brick: &mut ChargeBrick,
    cells: &CellAtomLists,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
    density_scale: Real,
) {
    let shape = *brick.shape();
    let ord = stencil.order() as usize;
    let nlower = stencil.nlower();
    let nupper = stencil.nupper();
    let ghost = shape.ghost as i32;
    let plane = shape.npts.x as usize * shape.npts.y as usize;

    brick
        .values_mut()
        .par_chunks_mut(plane)
        .enumerate()
        .for_each(|(gz, plane_values)| {
            let pz = gz as i32 - ghost;
            let cz_lo = (pz - nupper).max(0);
            let cz_hi = (pz - nlower).min(shape.nlocal.z as i32 - 1);

            for gy in 0..shape.npts.y as usize {
                let py = gy as i32 - ghost;
                let cy_lo = (py - nupper).max(0);
                let cy_hi = (py - nlower).min(shape.nlocal.y as i32 - 1);

                let mut ring = [0.0 as Real; crate::core::stencil::MAX_ORDER];

                for cx in 0..shape.nlocal.x as i32 {
                    for cz in cz_lo..=cz_hi {
                        for cy in cy_lo..=cy_hi {
                            let cell_id =
                                shape.cell_index(vector![cx as u32, cy as u32, cz as u32]);

                            for &particle_id in cells.atoms_of(cell_id) {
                                let particle_id = particle_id as usize;
                                let t = fractional_coords(
                                    &positions[particle_id].point,
                                    box_lo,
                                    inv_spacing,
                                );
                                let frac = t - vector![cx as Real, cy as Real, cz as Real];

                                let wy = stencil
                                    .eval_all(AssignmentStencil::axis_argument(frac.y))
                                    [(py - cy - nlower) as usize];
                                let wz = stencil
                                    .eval_all(AssignmentStencil::axis_argument(frac.z))
                                    [(pz - cz - nlower) as usize];
                                let qw = charges[particle_id] * density_scale * wy * wz;

                                let wx = stencil
                                    .eval_all(AssignmentStencil::axis_argument(frac.x));
                                for i in 0..ord {
                                    // Partial sum for point `cx + nlower + i`.
                                    ring[i] += wx[i] * qw;
                                }
                            }
                        }
                    }

                    // No cell beyond `cx` reaches point `cx + nlower`:
                    // carry the finalized head out of the ring.
                    let px = cx + nlower;
                    plane_values[gy * shape.npts.x as usize + (px + ghost) as usize] += ring[0];
                    for i in 1..ord {
                        ring[i - 1] = ring[i];
                    }
                    ring[ord - 1] = 0.0;
                }

                // Flush the halo tail past the last cell column.
                for (i, carry) in ring[..ord - 1].iter().enumerate() {
                    let px = shape.nlocal.x as i32 + nlower + i as i32;
                    plane_values[gy * shape.npts.x as usize + (px + ghost) as usize] += *carry;
                }
            }
        });
}
