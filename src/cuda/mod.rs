pub use self::cuda_atom_set::CudaAtomSet;
pub use self::cuda_brick::CudaChargeBrick;
pub use self::cuda_spread_pipeline::{CudaSpreadError, CudaSpreadPipeline, CudaSpreadTimings};
pub use self::cuda_vec::CudaVec;

use cust::memory::{DeviceBuffer, DeviceCopy};
use kernels::DevicePointer;

mod cuda_atom_set;
mod cuda_brick;
mod cuda_spread_pipeline;
mod cuda_vec;

/// Kernel-side pointer to a device buffer's storage.
pub(crate) fn device_ptr<T: DeviceCopy>(buffer: &DeviceBuffer<T>) -> DevicePointer<T> {
    unsafe { DevicePointer::from_raw(buffer.as_device_ptr().as_raw() as usize as *mut T) }
}
