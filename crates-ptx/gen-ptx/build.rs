fn main() {
    use cuda_builder::{CudaBuilder, NvvmArch};
    println!("cargo:rerun-if-changed={}", "build.rs");

    let mut builder = CudaBuilder::new("../../crates/ember3d-kernels")
        .copy_to("../../resources/ember3d-kernels.ptx")
        .emit_llvm_ir(true);
    builder.arch = NvvmArch::Compute70;

    builder.build().unwrap();
}
