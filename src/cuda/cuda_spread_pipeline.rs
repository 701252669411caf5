use super::{CudaAtomSet, CudaChargeBrick};
use crate::core::prelude::{
    AssignmentStencil, GridRegion, ParticlePosition, SpreadParameters, SpreadStrategy,
};
use crate::core::utils::resequenced_len;
use crate::math::{Point, Real, Vector};
use crate::pipelines::SpreadError;
use cust::{
    error::{CudaError, CudaResult},
    event::{Event, EventFlags},
    launch,
    module::{Module, ModuleJitOption},
    prelude::*,
};
use instant::{Duration, Instant};
use kernels::cuda::{MAP_THREADS, SPREAD_THREADS, SPREAD_TILE};
use kernels::DevicePointer;
use std::fmt;

/// Register cap handed to the JIT; spilling past this keeps enough warps
/// resident to hide the global-memory latency of the scatter kernels.
const MAX_REGISTERS: u32 = 130;

/// Failure of a device spreading pass: either a pass error surfaced
/// through the shared flag, or a CUDA-level failure (allocation included).
#[derive(Debug)]
pub enum CudaSpreadError {
    Spread(SpreadError),
    Cuda(CudaError),
}

impl From<SpreadError> for CudaSpreadError {
    fn from(err: SpreadError) -> Self {
        Self::Spread(err)
    }
}

impl From<CudaError> for CudaSpreadError {
    fn from(err: CudaError) -> Self {
        Self::Cuda(err)
    }
}

impl fmt::Display for CudaSpreadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Spread(err) => write!(f, "{}", err),
            Self::Cuda(err) => write!(f, "CUDA error: {}", err),
        }
    }
}

impl std::error::Error for CudaSpreadError {}

/// Accumulated timings of the device pass phases. Device phases are
/// measured with CUDA events recorded on the pass stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CudaSpreadTimings {
    /// Host-to-device mirror refresh.
    pub mirror_in: Duration,
    /// Brick/counter/error-flag zeroing kernels.
    pub reset: Duration,
    /// The particle-to-cell mapping kernel.
    pub map: Duration,
    /// The charge deposition kernel.
    pub spread: Duration,
    /// Whole `compute` calls, including the error-flag readback.
    pub total: Duration,
}

struct EventTimer {
    start: Event,
    stop: Option<Event>,
    enabled: bool,
}

impl EventTimer {
    fn new(enabled: bool) -> CudaResult<Self> {
        let flags = if enabled {
            EventFlags::empty()
        } else {
            EventFlags::DISABLE_TIMING
        };

        Ok(Self {
            start: Event::new(flags)?,
            stop: None,
            enabled,
        })
    }

    fn start(&self, stream: &Stream) -> CudaResult<()> {
        if self.enabled {
            self.start.record(stream)?;
        }
        Ok(())
    }

    fn stop(&mut self, stream: &Stream) -> CudaResult<()> {
        if self.enabled {
            let stop = Event::new(EventFlags::empty())?;
            stop.record(stream)?;
            self.stop = Some(stop);
        }
        Ok(())
    }

    /// Only valid after the stream synchronized past the `stop` record.
    fn end(self) -> CudaResult<Duration> {
        match (self.enabled, self.stop) {
            (true, Some(stop)) => stop.elapsed(&self.start),
            _ => Ok(Duration::default()),
        }
    }
}

/// Device counterpart of `pipelines::SpreadPipeline`: sequences mirror
/// refresh, buffer reset, mapping, deposition, and the error-flag readback
/// over the kernels module, synchronously from the caller's perspective.
pub struct CudaSpreadPipeline {
    module: Module,
    stream: Stream,
    params: SpreadParameters,
    atoms: CudaAtomSet,
    brick: Option<CudaChargeBrick>,
    staging: Vec<Real>,
    timings: CudaSpreadTimings,
    timing_enabled: bool,
}

impl CudaSpreadPipeline {
    /// JIT-compiles the kernels module emitted by the PTX builder.
    pub fn load_module(ptx: &str) -> CudaResult<Module> {
        Module::from_ptx(ptx, &[ModuleJitOption::MaxRegisters(MAX_REGISTERS)])
    }

    pub fn new(module: Module, stream: Stream, params: SpreadParameters) -> CudaResult<Self> {
        Ok(Self {
            module,
            stream,
            params,
            atoms: CudaAtomSet::new()?,
            brick: None,
            staging: Vec::new(),
            timings: CudaSpreadTimings::default(),
            timing_enabled: false,
        })
    }

    pub fn params(&self) -> &SpreadParameters {
        &self.params
    }

    pub fn set_params(&mut self, params: SpreadParameters) {
        self.params = params;
    }

    /// Enables CUDA-event timing of the pass phases.
    pub fn enable_timings(&mut self, enabled: bool) {
        self.timing_enabled = enabled;
    }

    /// Allocates (or grows) the device pass state for the given geometry
    /// and returns the device pointer to the brick values.
    pub fn init(
        &mut self,
        _num_local: usize,
        _num_total: usize,
        local_region: GridRegion,
        stencil: AssignmentStencil,
    ) -> CudaResult<DevicePointer<Real>> {
        let cell_capacity = self.params.cell_capacity;
        let brick = match &mut self.brick {
            Some(brick) => {
                brick.resize(&local_region, stencil, cell_capacity)?;
                brick
            }
            None => self
                .brick
                .insert(CudaChargeBrick::new(&local_region, stencil, cell_capacity)?),
        };

        Ok(brick.values_ptr())
    }

    /// Runs one spreading pass on the device: submit, wait for completion,
    /// read the error flag once.
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
    ) -> Result<(), CudaSpreadError> {
        let brick = self
            .brick
            .as_mut()
            .ok_or(SpreadError::Uninitialized)?;
        assert!(positions.len() >= num_total, "missing position data");
        assert!(kinds.len() >= num_total, "missing type data");
        assert!(charges.len() >= num_total, "missing charge data");
        assert!(num_local <= num_total);

        info!("launching a CUDA charge-spreading pass");
        let pass_start = Instant::now();

        let t0 = Instant::now();
        self.atoms.write(
            &positions[..num_total],
            &kinds[..num_total],
            &charges[..num_total],
            steps_since_rebuild == 0,
        )?;
        self.timings.mirror_in += t0.elapsed();

        let module = &self.module;
        let stream = &self.stream;

        let mut reset_timer = EventTimer::new(self.timing_enabled)?;
        let mut map_timer = EventTimer::new(self.timing_enabled)?;
        let mut spread_timer = EventTimer::new(self.timing_enabled)?;

        let shape = *brick.shape();
        let stencil = *brick.stencil();
        let device_brick = brick.device_elements();
        let skip = self.params.resequence_skip;
        let density_scale = inv_spacing.x * inv_spacing.y * inv_spacing.z;

        unsafe {
            reset_timer.start(stream)?;
            let npts = shape.num_points() as u32;
            launch!(module.reset_brick<<<npts / MAP_THREADS + 1, MAP_THREADS, 0, stream>>>(
                device_brick
            ))?;
            let ncells = shape.num_cells() as u32;
            launch!(module.reset_cells<<<ncells / MAP_THREADS + 1, MAP_THREADS, 0, stream>>>(
                device_brick
            ))?;
            reset_timer.stop(stream)?;

            map_timer.start(stream)?;
            let padded = resequenced_len(num_local as u32, skip);
            launch!(module.particle_map<<<padded / MAP_THREADS + 1, MAP_THREADS, 0, stream>>>(
                self.atoms.positions_ptr(),
                num_local as u32,
                skip,
                box_lo,
                inv_spacing,
                device_brick
            ))?;
            map_timer.stop(stream)?;

            spread_timer.start(stream)?;
            match self.params.strategy {
                SpreadStrategy::Scatter => {
                    let n = num_local as u32;
                    launch!(module.spread_charge<<<n / SPREAD_THREADS + 1, SPREAD_THREADS, 0, stream>>>(
                        self.atoms.positions_ptr(),
                        self.atoms.charges_ptr(),
                        n,
                        stencil,
                        box_lo,
                        inv_spacing,
                        density_scale,
                        device_brick
                    ))?;
                }
                SpreadStrategy::ResequencedScatter => {
                    launch!(module.spread_charge_resequenced<<<padded / SPREAD_THREADS + 1, SPREAD_THREADS, 0, stream>>>(
                        self.atoms.positions_ptr(),
                        self.atoms.charges_ptr(),
                        num_local as u32,
                        skip,
                        stencil,
                        box_lo,
                        inv_spacing,
                        density_scale,
                        device_brick
                    ))?;
                }
                SpreadStrategy::TiledGather => {
                    let groups_y = (shape.npts.y + SPREAD_TILE - 1) / SPREAD_TILE;
                    let groups_z = (shape.npts.z + SPREAD_TILE - 1) / SPREAD_TILE;
                    launch!(module.spread_charge_tiled<<<(groups_y, groups_z), (SPREAD_TILE, SPREAD_TILE), 0, stream>>>(
                        self.atoms.positions_ptr(),
                        self.atoms.charges_ptr(),
                        stencil,
                        box_lo,
                        inv_spacing,
                        density_scale,
                        device_brick
                    ))?;
                }
            }
            spread_timer.stop(stream)?;
        }

        stream.synchronize()?;

        self.timings.reset += reset_timer.end()?;
        self.timings.map += map_timer.end()?;
        self.timings.spread += spread_timer.end()?;

        let code = brick.read_error_flag()?;
        self.timings.total += pass_start.elapsed();

        match SpreadError::from_code(code) {
            None => Ok(()),
            Some(err) => {
                error!("CUDA charge spreading pass failed: {}", err);
                Err(err.into())
            }
        }
    }

    /// Reads the brick of the last pass back into host staging storage.
    pub fn read_brick(&mut self) -> Result<&[Real], CudaSpreadError> {
        let brick = self
            .brick
            .as_ref()
            .ok_or(SpreadError::Uninitialized)?;
        self.staging = brick.read_values()?;
        Ok(&self.staging)
    }

    pub fn brick(&self) -> Option<&CudaChargeBrick> {
        self.brick.as_ref()
    }

    pub fn timings(&self) -> &CudaSpreadTimings {
        &self.timings
    }

    pub fn reset_timings(&mut self) {
        self.timings = CudaSpreadTimings::default();
    }

    /// Bytes of device storage held per atom.
    pub fn bytes_per_atom(&self) -> usize {
        self.atoms.bytes_per_atom()
    }

    /// Host memory retained by the pipeline (the readback staging brick).
    pub fn host_memory_usage(&self) -> usize {
        self.staging.capacity() * std::mem::size_of::<Real>()
    }

    /// Device memory retained by the mirrors and the pass state.
    pub fn device_memory_usage(&self) -> usize {
        self.atoms.device_memory_usage()
            + self
                .brick
                .as_ref()
                .map(|b| b.device_memory_usage())
                .unwrap_or(0)
    }
}
