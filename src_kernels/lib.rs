#![no_std]
#![cfg_attr(
    target_os = "cuda",
    feature(register_attr, bench_black_box, asm_experimental_arch),
    register_attr(nvvm_internal)
)]
#![cfg_attr(target_os = "cuda", feature(core_intrinsics))]
#![cfg_attr(target_os = "cuda", feature(asm))]
#![cfg_attr(target_os = "cuda", feature(const_float_bits_conv))]

pub extern crate ember3d_core as ember_core;

extern crate nalgebra as na;

pub use self::gpu_brick::{DevicePointer, GpuBrick};

pub mod cuda;
mod gpu_brick;
