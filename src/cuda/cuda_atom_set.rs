use super::CudaVec;
use crate::core::prelude::ParticlePosition;
use crate::math::Real;
use cust::error::CudaResult;
use kernels::DevicePointer;

/// Device mirrors of the caller's per-atom arrays, refreshed once per
/// pass and resized only when the neighbor list was rebuilt.
pub struct CudaAtomSet {
    positions: CudaVec<ParticlePosition>,
    kinds: CudaVec<u32>,
    charges: CudaVec<Real>,
}

impl CudaAtomSet {
    pub fn new() -> CudaResult<Self> {
        Ok(Self {
            positions: CudaVec::new()?,
            kinds: CudaVec::new()?,
            charges: CudaVec::new()?,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Refreshes the position and charge mirrors; the kind mirror only
    /// changes when the caller's atom order does, so it is refreshed only
    /// when `rebuilt` is set.
    pub fn write(
        &mut self,
        positions: &[ParticlePosition],
        kinds: &[u32],
        charges: &[Real],
        rebuilt: bool,
    ) -> CudaResult<()> {
        self.positions.write(positions)?;
        self.charges.write(charges)?;
        if rebuilt || self.kinds.len() != kinds.len() {
            self.kinds.write(kinds)?;
        }
        Ok(())
    }

    pub fn positions_ptr(&self) -> DevicePointer<ParticlePosition> {
        self.positions.as_device_ptr()
    }

    pub fn charges_ptr(&self) -> DevicePointer<Real> {
        self.charges.as_device_ptr()
    }

    /// Bytes of device storage held per atom.
    pub fn bytes_per_atom(&self) -> usize {
        std::mem::size_of::<ParticlePosition>()
            + std::mem::size_of::<u32>()
            + std::mem::size_of::<Real>()
    }

    /// Device memory currently retained by the mirrors.
    pub fn device_memory_usage(&self) -> usize {
        self.positions.capacity() * std::mem::size_of::<ParticlePosition>()
            + self.kinds.capacity() * std::mem::size_of::<u32>()
            + self.charges.capacity() * std::mem::size_of::<Real>()
    }
}
