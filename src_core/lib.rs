#![no_std]

pub extern crate nalgebra as na;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

#[cfg(test)]
extern crate std;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::grid::*;
    pub use crate::math::*;
    pub use crate::params::*;
    pub use crate::particle::*;
    pub use crate::stencil::*;
}

pub mod math {
    use na::{Point3, Vector3};

    /// The scalar type used throughout this crate.
    pub type Real = f32;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub type Point<N> = Point3<N>;

    /// The vector type.
    pub type Vector<N> = Vector3<N>;
}

pub mod error;
pub mod grid;
pub mod params;
pub mod particle;
pub mod stencil;
pub mod utils;
