use crate::math::{Point, Real};

/// Position mirror of one particle.
///
/// Owned by the caller for the duration of a spreading pass; the pipeline
/// only keeps a pass-local mirror of it.
#[cfg_attr(feature = "cuda", derive(cust_core::DeviceCopy))]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ParticlePosition {
    pub point: Point<Real>,
}

impl ParticlePosition {
    pub fn new(point: Point<Real>) -> Self {
        Self { point }
    }
}
