pub extern crate ember3d_core;
#[cfg(feature = "cuda")]
pub extern crate ember3d_kernels as kernels;

#[cfg(feature = "cuda")]
pub extern crate cust;

pub extern crate nalgebra as na;

#[macro_use]
extern crate log;

pub use ember3d_core as core;

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::geometry::*;
    pub use crate::math::*;
    pub use crate::pipelines::*;
}

pub mod math {
    pub use crate::core::math::*;
}

pub mod geometry;
pub mod pipelines;
pub mod solver;

#[cfg(feature = "cuda")]
pub mod cuda;
