use bytemuck::Zeroable;
use cust::{
    error::CudaResult,
    memory::{CopyDestination, DeviceBuffer, DeviceCopy},
};
use kernels::DevicePointer;

/// A device buffer refreshed from the host once per pass, with grow-only
/// reallocation.
pub struct CudaVec<T: DeviceCopy> {
    len: usize,
    buffer: DeviceBuffer<T>,
}

impl<T: DeviceCopy> CudaVec<T> {
    pub fn new() -> CudaResult<Self> {
        Ok(Self {
            len: 0,
            buffer: DeviceBuffer::zeroed(0)?,
        })
    }

    pub fn from_slice(data: &[T]) -> CudaResult<Self> {
        Ok(Self {
            len: data.len(),
            buffer: DeviceBuffer::from_slice(data)?,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &DeviceBuffer<T> {
        &self.buffer
    }

    pub fn as_device_ptr(&self) -> DevicePointer<T> {
        super::device_ptr(&self.buffer)
    }

    /// Ensures room for `len` elements, reallocating with doubling growth
    /// when needed. The contents are not preserved (the live range is
    /// refreshed by [`Self::write`] every pass); a failed allocation
    /// leaves the previous buffer intact.
    pub fn reserve(&mut self, len: usize) -> CudaResult<()>
    where
        T: Zeroable,
    {
        if len > self.capacity() {
            let new_capacity = (self.capacity() * 2).max(len);
            self.buffer = DeviceBuffer::zeroed(new_capacity)?;
            self.len = 0;
        }
        Ok(())
    }

    /// Refreshes the device contents from the host slice, growing the
    /// allocation when needed; never shrinks.
    pub fn write(&mut self, data: &[T]) -> CudaResult<()>
    where
        T: Zeroable,
    {
        self.reserve(data.len())?;
        if !data.is_empty() {
            self.buffer.index(..data.len()).copy_from(data)?;
        }
        self.len = data.len();
        Ok(())
    }

    pub fn to_vec(&self) -> CudaResult<Vec<T>>
    where
        T: Zeroable,
    {
        let mut out = vec![T::zeroed(); self.len];
        if self.len > 0 {
            self.buffer.index(..self.len).copy_to(&mut out)?;
        }
        Ok(out)
    }
}
