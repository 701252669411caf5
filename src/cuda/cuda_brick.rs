use super::device_ptr;
use crate::core::prelude::{AssignmentStencil, BrickShape, GridRegion, SpreadErrorCode};
use crate::math::Real;
use cust::{
    error::CudaResult,
    memory::{CopyDestination, DeviceBox, DeviceBuffer},
};
use kernels::{DevicePointer, GpuBrick};

/// Device-resident pass state: the charge brick, the per-cell atom lists,
/// and the shared error flag, with grow-only reallocation across passes.
pub struct CudaChargeBrick {
    shape: BrickShape,
    stencil: AssignmentStencil,
    cell_capacity: u32,
    values: DeviceBuffer<Real>,
    cell_counts: DeviceBuffer<u32>,
    cell_atoms: DeviceBuffer<u32>,
    error_flag: DeviceBox<u32>,
}

impl CudaChargeBrick {
    pub fn new(
        local_region: &GridRegion,
        stencil: AssignmentStencil,
        cell_capacity: u32,
    ) -> CudaResult<Self> {
        let shape = BrickShape::new(local_region, stencil.ghost());
        Ok(Self {
            shape,
            stencil,
            cell_capacity,
            values: DeviceBuffer::zeroed(shape.num_points())?,
            cell_counts: DeviceBuffer::zeroed(shape.num_cells())?,
            cell_atoms: DeviceBuffer::zeroed(shape.num_cells() * cell_capacity as usize)?,
            error_flag: DeviceBox::zeroed()?,
        })
    }

    /// Adopts a new grid geometry, stencil, or cell capacity. Buffers only
    /// ever grow; a failed allocation leaves the previous buffers intact.
    pub fn resize(
        &mut self,
        local_region: &GridRegion,
        stencil: AssignmentStencil,
        cell_capacity: u32,
    ) -> CudaResult<()> {
        let shape = BrickShape::new(local_region, stencil.ghost());

        if shape.num_points() > self.values.len() {
            self.values = DeviceBuffer::zeroed(shape.num_points())?;
        }
        if shape.num_cells() > self.cell_counts.len() {
            self.cell_counts = DeviceBuffer::zeroed(shape.num_cells())?;
        }
        let slots = shape.num_cells() * cell_capacity as usize;
        if slots > self.cell_atoms.len() {
            self.cell_atoms = DeviceBuffer::zeroed(slots)?;
        }

        self.shape = shape;
        self.stencil = stencil;
        self.cell_capacity = cell_capacity;
        Ok(())
    }

    pub fn shape(&self) -> &BrickShape {
        &self.shape
    }

    pub fn stencil(&self) -> &AssignmentStencil {
        &self.stencil
    }

    pub fn cell_capacity(&self) -> u32 {
        self.cell_capacity
    }

    /// Device pointer to the brick values, for the consumer of the pass.
    pub fn values_ptr(&self) -> DevicePointer<Real> {
        device_ptr(&self.values)
    }

    /// Assembles the by-value view handed to every kernel of a pass.
    pub fn device_elements(&mut self) -> GpuBrick {
        unsafe {
            GpuBrick::new(
                self.shape,
                device_ptr(&self.values),
                device_ptr(&self.cell_counts),
                device_ptr(&self.cell_atoms),
                self.cell_capacity,
                DevicePointer::from_raw(self.error_flag.as_device_ptr().as_raw() as usize
                    as *mut u32),
            )
        }
    }

    /// Reads the merged error flag back to the host.
    pub fn read_error_flag(&self) -> CudaResult<SpreadErrorCode> {
        let mut raw = 0u32;
        self.error_flag.copy_to(&mut raw)?;
        Ok(SpreadErrorCode::from_raw(raw))
    }

    /// Reads the whole brick back to the host, for the consumer of the
    /// pass or for validation.
    pub fn read_values(&self) -> CudaResult<Vec<Real>> {
        let mut out = vec![0.0; self.shape.num_points()];
        self.values.index(..self.shape.num_points()).copy_to(&mut out)?;
        Ok(out)
    }

    /// Device memory currently retained by the pass state.
    pub fn device_memory_usage(&self) -> usize {
        self.values.len() * std::mem::size_of::<Real>()
            + (self.cell_counts.len() + self.cell_atoms.len() + 1) * std::mem::size_of::<u32>()
    }
}
