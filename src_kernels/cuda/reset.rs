use crate::GpuBrick;
use cuda_std::thread;

/// Zeroes the brick values. Launch over `shape.num_points()` workers.
#[cuda_std::kernel]
pub unsafe fn reset_brick(mut brick: GpuBrick) {
    let id = thread::index();
    if (id as usize) < brick.shape().num_points() {
        *brick.value_raw_mut(id as usize) = 0.0;
    }
}

/// Zeroes the per-cell atom counters and the shared error flag. Launch
/// over `shape.num_cells()` workers.
#[cuda_std::kernel]
pub unsafe fn reset_cells(mut brick: GpuBrick) {
    let id = thread::index();
    if (id as usize) < brick.shape().num_cells() {
        *brick.cell_count_mut(id as usize) = 0;
    }
    if id == 0 {
        *brick.error_flag_mut() = 0;
    }
}
