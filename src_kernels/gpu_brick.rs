use crate::cuda::AtomicInt;
use ember_core::math::{Real, Vector};
use ember_core::prelude::{BrickShape, SpreadErrorCode};

/// A raw pointer into device-accessible memory, crossing the host/device
/// boundary by value.
#[derive(Copy, Clone, Debug)]
#[repr(transparent)]
pub struct DevicePointer<T>(*mut T);

#[cfg(not(target_os = "cuda"))]
unsafe impl<T: core::marker::Copy> cust_core::DeviceCopy for DevicePointer<T> {}

impl<T> DevicePointer<T> {
    /// The pointer must reference memory accessible by every worker the
    /// value is handed to, for at least the duration of the pass.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *const T {
        self.0
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.0
    }
}

/// Device-side view of one spreading pass's mutable state: the charge
/// brick, the per-cell atom lists, and the shared error flag.
///
/// The same view is concurrently held by every worker of a pass; all
/// mutation goes through atomics or a phase that guarantees exclusive
/// ownership of the written points.
#[cfg_attr(not(target_os = "cuda"), derive(cust_core::DeviceCopy))]
#[derive(Copy, Clone)]
#[repr(C)]
pub struct GpuBrick {
    shape: BrickShape,
    values: DevicePointer<Real>,
    cell_counts: DevicePointer<u32>,
    cell_atoms: DevicePointer<u32>,
    cell_capacity: u32,
    error_flag: DevicePointer<u32>,
}

impl GpuBrick {
    /// Assembles a brick view from raw buffers.
    ///
    /// `values` must hold `shape.num_points()` reals, `cell_counts` one
    /// counter per cell, and `cell_atoms` `cell_capacity` slots per cell.
    pub unsafe fn new(
        shape: BrickShape,
        values: DevicePointer<Real>,
        cell_counts: DevicePointer<u32>,
        cell_atoms: DevicePointer<u32>,
        cell_capacity: u32,
        error_flag: DevicePointer<u32>,
    ) -> Self {
        Self {
            shape,
            values,
            cell_counts,
            cell_atoms,
            cell_capacity,
            error_flag,
        }
    }

    pub fn shape(&self) -> &BrickShape {
        &self.shape
    }

    pub fn cell_capacity(&self) -> u32 {
        self.cell_capacity
    }

    pub unsafe fn value_unchecked_mut(&mut self, point: Vector<i32>) -> &mut Real {
        let index = self.shape.point_index(point);
        &mut *self.values.as_mut_ptr().add(index)
    }

    pub unsafe fn value_raw_mut(&mut self, index: usize) -> &mut Real {
        &mut *self.values.as_mut_ptr().add(index)
    }

    pub unsafe fn cell_count(&self, cell: usize) -> u32 {
        *self.cell_counts.as_ptr().add(cell)
    }

    pub unsafe fn cell_count_mut(&mut self, cell: usize) -> &mut u32 {
        &mut *self.cell_counts.as_mut_ptr().add(cell)
    }

    pub unsafe fn cell_atom(&self, cell: usize, slot: u32) -> u32 {
        *self
            .cell_atoms
            .as_ptr()
            .add(cell * self.cell_capacity as usize + slot as usize)
    }

    pub unsafe fn cell_atom_mut(&mut self, cell: usize, slot: u32) -> &mut u32 {
        &mut *self
            .cell_atoms
            .as_mut_ptr()
            .add(cell * self.cell_capacity as usize + slot as usize)
    }

    /// Merges an error observation into the shared flag, worst code wins.
    pub unsafe fn raise_error(&mut self, code: SpreadErrorCode) {
        (*self.error_flag.as_mut_ptr()).global_red_max(code.to_raw());
    }

    pub unsafe fn error_flag_mut(&mut self) -> &mut u32 {
        &mut *self.error_flag.as_mut_ptr()
    }
}
