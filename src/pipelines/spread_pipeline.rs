use crate::core::prelude::{
    AssignmentStencil, BrickShape, GridRegion, ParticlePosition, SpreadErrorCode,
    SpreadParameters, SpreadStrategy,
};
use crate::geometry::{CellAtomLists, ChargeBrick};
use crate::math::{Point, Real, Vector};
use crate::solver;
use instant::{Duration, Instant};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Failure of a spreading pass, read once by the caller after the pass
/// completes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpreadError {
    /// At least one particle mapped outside the local grid region. The
    /// step cannot be salvaged; the upstream decomposition or integrator
    /// is unstable.
    OutOfDomain,
    /// A cell received more particles than its atom-list capacity. The
    /// partial grid must be discarded; re-running with a larger
    /// `SpreadParameters::cell_capacity` recovers.
    CellOverflow,
    /// Buffer allocation failed; retry with smaller batches or fail the
    /// step.
    Allocation,
    /// `compute` was called before `init`.
    Uninitialized,
}

impl SpreadError {
    pub(crate) fn from_code(code: SpreadErrorCode) -> Option<Self> {
        match code {
            SpreadErrorCode::None => None,
            SpreadErrorCode::OutOfDomain => Some(Self::OutOfDomain),
            SpreadErrorCode::CellOverflow => Some(Self::CellOverflow),
        }
    }
}

impl fmt::Display for SpreadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OutOfDomain => write!(f, "{}", SpreadErrorCode::OutOfDomain),
            Self::CellOverflow => write!(f, "{}", SpreadErrorCode::CellOverflow),
            Self::Allocation => write!(f, "buffer allocation failed"),
            Self::Uninitialized => write!(f, "the pipeline was not initialized"),
        }
    }
}

impl std::error::Error for SpreadError {}

/// Accumulated wall time of the pass phases, one entry per phase in
/// execution order. Cleared with `SpreadPipeline::reset_timings`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpreadTimings {
    /// Refreshing the position/kind/charge mirrors.
    pub mirror_in: Duration,
    /// Zeroing the brick and the cell counters.
    pub reset: Duration,
    /// The particle-to-cell mapping pass.
    pub map: Duration,
    /// The charge deposition pass.
    pub spread: Duration,
    /// Whole `compute` calls, including error translation.
    pub total: Duration,
}

/// Grow-only reallocation of the atom mirrors; never shrinks, and leaves
/// the mirrors usable when the growth fails.
fn grow_mirrors(
    positions: &mut Vec<ParticlePosition>,
    kinds: &mut Vec<u32>,
    charges: &mut Vec<Real>,
    num_total: usize,
) -> Result<(), SpreadError> {
    if positions.len() >= num_total {
        return Ok(());
    }

    let additional = num_total - positions.len();
    positions
        .try_reserve(additional)
        .and_then(|_| kinds.try_reserve(additional))
        .and_then(|_| charges.try_reserve(additional))
        .map_err(|_| SpreadError::Allocation)?;

    positions.resize(num_total, ParticlePosition::default());
    kinds.resize(num_total, 0);
    charges.resize(num_total, 0.0);
    Ok(())
}

struct PipelineState {
    stencil: AssignmentStencil,
    brick: ChargeBrick,
    cells: CellAtomLists,
    positions: Vec<ParticlePosition>,
    kinds: Vec<u32>,
    charges: Vec<Real>,
}

/// Sequences one charge-spreading pass per call: mirror refresh, buffer
/// reset, particle mapping, deposition, error translation.
///
/// This is the reference pipeline running on host workers; the CUDA
/// pipeline (`cuda::CudaSpreadPipeline`) exposes the same surface over the
/// device kernels.
pub struct SpreadPipeline {
    params: SpreadParameters,
    state: Option<PipelineState>,
    timings: SpreadTimings,
}

impl SpreadPipeline {
    pub fn new(params: SpreadParameters) -> Self {
        Self {
            params,
            state: None,
            timings: SpreadTimings::default(),
        }
    }

    pub fn params(&self) -> &SpreadParameters {
        &self.params
    }

    /// Reconfigures the pass tuning. Takes effect at the next `init` for
    /// capacity changes and at the next `compute` for strategy changes.
    pub fn set_params(&mut self, params: SpreadParameters) {
        self.params = params;
    }

    /// Allocates (or grows) every buffer for the given atom counts and
    /// grid geometry. May be called again whenever either grows; existing
    /// allocations are reused where they suffice.
    pub fn init(
        &mut self,
        _num_local: usize,
        num_total: usize,
        local_region: GridRegion,
        stencil: AssignmentStencil,
    ) -> Result<(), SpreadError> {
        let shape = BrickShape::new(&local_region, stencil.ghost());

        match &mut self.state {
            Some(state) => {
                state.stencil = stencil;
                state
                    .brick
                    .resize(shape)
                    .map_err(|_| SpreadError::Allocation)?;
                state
                    .cells
                    .resize(shape.num_cells(), self.params.cell_capacity)
                    .map_err(|_| SpreadError::Allocation)?;
                grow_mirrors(
                    &mut state.positions,
                    &mut state.kinds,
                    &mut state.charges,
                    num_total,
                )?;
            }
            None => {
                let brick = ChargeBrick::new(shape).map_err(|_| SpreadError::Allocation)?;
                let cells = CellAtomLists::new(shape.num_cells(), self.params.cell_capacity)
                    .map_err(|_| SpreadError::Allocation)?;
                let mut state = PipelineState {
                    stencil,
                    brick,
                    cells,
                    positions: Vec::new(),
                    kinds: Vec::new(),
                    charges: Vec::new(),
                };
                grow_mirrors(
                    &mut state.positions,
                    &mut state.kinds,
                    &mut state.charges,
                    num_total,
                )?;
                self.state = Some(state);
            }
        }

        Ok(())
    }

    /// Runs one spreading pass.
    ///
    /// `steps_since_rebuild == 0` signals that the caller's neighbor list
    /// was rebuilt, so the mirrors are re-sized before being refreshed;
    /// otherwise only their contents are refreshed. The pass is
    /// synchronous: when this returns, the brick is final and the merged
    /// error flag has been read exactly once.
    pub fn compute(
        &mut self,
        steps_since_rebuild: u32,
        num_local: usize,
        num_total: usize,
        positions: &[ParticlePosition],
        kinds: &[u32],
        charges: &[Real],
        box_lo: Point<Real>,
        inv_spacing: Vector<Real>,
    ) -> Result<(), SpreadError> {
        let state = self.state.as_mut().ok_or(SpreadError::Uninitialized)?;
        assert!(positions.len() >= num_total, "missing position data");
        assert!(kinds.len() >= num_total, "missing type data");
        assert!(charges.len() >= num_total, "missing charge data");
        assert!(num_local <= num_total);

        let pass_start = Instant::now();

        // Mirror refresh; a neighbor-list rebuild may change the atom
        // count, so capacity is revisited only then.
        let t0 = Instant::now();
        if steps_since_rebuild == 0 {
            grow_mirrors(
                &mut state.positions,
                &mut state.kinds,
                &mut state.charges,
                num_total,
            )?;
        }
        let mirrored = num_total.min(state.positions.len());
        state.positions[..mirrored].copy_from_slice(&positions[..mirrored]);
        state.kinds[..mirrored].copy_from_slice(&kinds[..mirrored]);
        state.charges[..mirrored].copy_from_slice(&charges[..mirrored]);
        self.timings.mirror_in += t0.elapsed();

        // Zero the brick, the counters, and the error flag.
        let t0 = Instant::now();
        state.brick.reset();
        state.cells.reset();
        let error_flag = AtomicU32::new(SpreadErrorCode::None.to_raw());
        self.timings.reset += t0.elapsed();

        // Mapping pass.
        let t0 = Instant::now();
        let shape = *state.brick.shape();
        solver::map_particles(
            &state.positions,
            num_local,
            &shape,
            &mut state.cells,
            &box_lo,
            &inv_spacing,
            self.params.resequence_skip,
            &error_flag,
        );
        self.timings.map += t0.elapsed();

        // Deposition pass. It runs even when the mapping already failed;
        // the flag is only consumed once, below.
        let t0 = Instant::now();
        let density_scale = inv_spacing.x * inv_spacing.y * inv_spacing.z;
        match self.params.strategy {
            SpreadStrategy::Scatter => solver::spread_scatter(
                &state.positions,
                &state.charges,
                num_local,
                &state.stencil,
                &mut state.brick,
                &box_lo,
                &inv_spacing,
                density_scale,
                1,
            ),
            SpreadStrategy::ResequencedScatter => solver::spread_scatter(
                &state.positions,
                &state.charges,
                num_local,
                &state.stencil,
                &mut state.brick,
                &box_lo,
                &inv_spacing,
                density_scale,
                self.params.resequence_skip,
            ),
            SpreadStrategy::TiledGather => solver::spread_tiled_gather(
                &state.positions,
                &state.charges,
                &state.stencil,
                &mut state.brick,
                &state.cells,
                &box_lo,
                &inv_spacing,
                density_scale,
            ),
        }
        self.timings.spread += t0.elapsed();

        let code = SpreadErrorCode::from_raw(error_flag.load(Ordering::Relaxed));
        self.timings.total += pass_start.elapsed();

        match SpreadError::from_code(code) {
            None => Ok(()),
            Some(err) => {
                error!("charge spreading pass failed: {}", err);
                Err(err)
            }
        }
    }

    /// The charge brick of the last pass, if the pipeline is initialized.
    pub fn brick(&self) -> Option<&ChargeBrick> {
        self.state.as_ref().map(|s| &s.brick)
    }

    /// The per-cell atom lists of the last pass.
    pub fn cells(&self) -> Option<&CellAtomLists> {
        self.state.as_ref().map(|s| &s.cells)
    }

    pub fn timings(&self) -> &SpreadTimings {
        &self.timings
    }

    pub fn reset_timings(&mut self) {
        self.timings = SpreadTimings::default();
    }

    /// Bytes of mirror storage held per atom.
    pub fn bytes_per_atom(&self) -> usize {
        std::mem::size_of::<ParticlePosition>()
            + std::mem::size_of::<u32>()
            + std::mem::size_of::<Real>()
    }

    /// Total host memory retained by the pipeline's buffers.
    pub fn host_memory_usage(&self) -> usize {
        match &self.state {
            None => 0,
            Some(state) => {
                state.brick.host_memory_usage()
                    + state.cells.host_memory_usage()
                    + state.positions.capacity() * std::mem::size_of::<ParticlePosition>()
                    + state.kinds.capacity() * std::mem::size_of::<u32>()
                    + state.charges.capacity() * std::mem::size_of::<Real>()
            }
        }
    }
}
