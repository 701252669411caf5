use crate::cuda::atomic::AtomicAdd;
use crate::GpuBrick;
use cuda_std::{kernel, shared_array, thread};
use ember_core::grid::{fractional_coords, owning_cell};
use ember_core::math::{Point, Real, Vector};
use ember_core::prelude::{AssignmentStencil, ParticlePosition};
use ember_core::stencil::MAX_ORDER;
use ember_core::utils::resequence_index;
use na::vector;

/// Per-particle scatter: one worker per particle, every stencil point
/// updated through an atomic floating add on the brick.
#[kernel]
pub unsafe fn spread_charge(
    positions: *const ParticlePosition,
    charges: *const Real,
    particles_len: u32,
    stencil: AssignmentStencil,
    box_lo: Point<Real>,
    inv_spacing: Vector<Real>,
    density_scale: Real,
    mut brick: GpuBrick,
) {
    let id = thread::index();
    if id < particles_len {
        spread_particle(
            id,
            positions,
            charges,
            &stencil,
            &box_lo,
            &inv_spacing,
            density_scale,
            &mut brick,
        );
    }
}

/// Per-particle scatter over the stride permutation: adjacent workers
/// deposit into cells `resequence_skip` apart, which thins out collisions
/// in the atomic retry path without changing the result. Launch over
/// `resequenced_len(particles_len, resequence_skip)` worker identities.
#[kernel]
pub unsafe fn spread_charge_resequenced(
    positions: *const ParticlePosition,
    charges: *const Real,
    particles_len: u32,
    resequence_skip: u32,
    stencil: AssignmentStencil,
    box_lo: Point<Real>,
    inv_spacing: Vector<Real>,
    density_scale: Real,
    mut brick: GpuBrick,
) {
    let id = thread::index();
    if let Some(particle_id) = resequence_index(id, resequence_skip, particles_len) {
        spread_particle(
            particle_id,
            positions,
            charges,
            &stencil,
            &box_lo,
            &inv_spacing,
            density_scale,
            &mut brick,
        );
    }
}

pub(crate) unsafe fn spread_particle(
    particle_id: u32,
    positions: *const ParticlePosition,
    charges: *const Real,
    stencil: &AssignmentStencil,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
    density_scale: Real,
    brick: &mut GpuBrick,
) {
    let p = &*positions.add(particle_id as usize);
    let t = fractional_coords(&p.point, box_lo, inv_spacing);
    let cell = owning_cell(t);

    if !brick.shape().contains_cell(cell) {
        // The mapper already failed the pass; this charge is excluded.
        return;
    }

    let frac = t - cell.cast::<Real>();
    let w = stencil.precompute_weights(frac);
    let q = *charges.add(particle_id as usize) * density_scale;

    let ord = stencil.order() as usize;
    let nlower = stencil.nlower();

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
                brick.value_unchecked_mut(point).global_red_add(w[0][i] * wyz);
            }
        }
    }
}

/// One-dimensional weight for stencil point `j`, read from the staged
/// coefficient rows: Horner's scheme over the shared table.
#[inline(always)]
unsafe fn eval_shared(coeff: *const Real, order: usize, j: usize, dx: Real) -> Real {
    let mut r = *coeff.add((order - 1) * MAX_ORDER + j);
    let mut l = order - 1;
    while l > 0 {
        l -= 1;
        r = *coeff.add(l * MAX_ORDER + j) + r * dx;
    }
    r
}

/// Tiled gather: each group owns a (y, z) tile of the brick, each worker
/// one point column along x. The coefficient table is staged into shared
/// scratch behind a barrier; workers then walk the cell columns keeping an
/// `order`-long running ring (the per-column halo carry), gathering every
/// atom whose cell can reach their point, and store each finalized value
/// exactly once. No atomics anywhere.
///
/// Launch with `SPREAD_TILE × SPREAD_TILE` threads per group and enough
/// groups to cover the extended (y, z) plane.
#[kernel]
pub unsafe fn spread_charge_tiled(
    positions: *const ParticlePosition,
    charges: *const Real,
    stencil: AssignmentStencil,
    box_lo: Point<Real>,
    inv_spacing: Vector<Real>,
    density_scale: Real,
    mut brick: GpuBrick,
) {
    let shared_coeff = shared_array![Real; MAX_ORDER * MAX_ORDER];

    let ord = stencil.order() as usize;
    let nlower = stencil.nlower();
    let nupper = stencil.nupper();
    let shape = *brick.shape();

    // Phase 1: stage the coefficient table into group-shared scratch.
    let tid = thread::thread_idx_x() + thread::thread_idx_y() * thread::block_dim_x();
    let group_size = thread::block_dim_x() * thread::block_dim_y();
    let mut i = tid;
    while (i as usize) < MAX_ORDER * MAX_ORDER {
        let l = i as usize / MAX_ORDER;
        let j = i as usize % MAX_ORDER;
        *shared_coeff.add(i as usize) = stencil.coefficient(l, j);
        i += group_size;
    }

    // Every group member must see the full table before gathering.
    thread::sync_threads();

    // Phase 2: gather. Each worker owns one (y, z) point column, so the
    // stores below never race.
    let gy = (thread::block_idx_x() * thread::block_dim_x() + thread::thread_idx_x()) as i64;
    let gz = (thread::block_idx_y() * thread::block_dim_y() + thread::thread_idx_y()) as i64;

    if gy < shape.npts.y as i64 && gz < shape.npts.z as i64 {
        // Local point coordinates, ghost points included.
        let py = gy as i32 - shape.ghost as i32;
        let pz = gz as i32 - shape.ghost as i32;

        // Cells whose stencil reaches this (y, z) point.
        let cy_lo = (py - nupper).max(0);
        let cy_hi = (py - nlower).min(shape.nlocal.y as i32 - 1);
        let cz_lo = (pz - nupper).max(0);
        let cz_hi = (pz - nlower).min(shape.nlocal.z as i32 - 1);

        let mut ring = [0.0 as Real; MAX_ORDER];

        for cx in 0..shape.nlocal.x as i32 {
            let mut cz = cz_lo;
            while cz <= cz_hi {
                let mut cy = cy_lo;
                while cy <= cy_hi {
                    let cell = vector![cx as u32, cy as u32, cz as u32];
                    let cell_id = shape.cell_index(cell);
                    let count = brick.cell_count(cell_id).min(brick.cell_capacity());

                    for slot in 0..count {
                        let particle_id = brick.cell_atom(cell_id, slot);
                        let p = &*positions.add(particle_id as usize);
                        let t = fractional_coords(&p.point, &box_lo, &inv_spacing);
                        let frac = t - vector![cx as Real, cy as Real, cz as Real];

                        let dy = AssignmentStencil::axis_argument(frac.y);
                        let dz = AssignmentStencil::axis_argument(frac.z);
                        let wy = eval_shared(shared_coeff, ord, (py - cy - nlower) as usize, dy);
                        let wz = eval_shared(shared_coeff, ord, (pz - cz - nlower) as usize, dz);
                        let qw = *charges.add(particle_id as usize) * density_scale * wy * wz;

                        let dx = AssignmentStencil::axis_argument(frac.x);
                        for i in 0..ord {
                            // Partial sum for point `cx + nlower + i`.
                            ring[i] += eval_shared(shared_coeff, ord, i, dx) * qw;
                        }
                    }

                    cy += 1;
                }
                cz += 1;
            }

            // No cell beyond `cx` reaches point `cx + nlower`: carry the
            // finalized head out of the ring and shift the halo forward.
            let px = cx + nlower;
            *brick.value_unchecked_mut(vector![px, py, pz]) += ring[0];
            for i in 1..ord {
                ring[i - 1] = ring[i];
            }
            ring[ord - 1] = 0.0;
        }

        // Flush the halo tail past the last cell column.
        for i in 0..ord - 1 {
            let px = shape.nlocal.x as i32 + nlower + i as i32;
            *brick.value_unchecked_mut(vector![px, py, pz]) += ring[i];
        }
    }
}
