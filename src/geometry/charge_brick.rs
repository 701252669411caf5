use crate::core::prelude::BrickShape;
use crate::math::{Real, Vector};
use std::collections::TryReserveError;

/// Host-side charge brick: one accumulator per grid point of the
/// halo-extended local region, flattened z-major with x fastest.
pub struct ChargeBrick {
    shape: BrickShape,
    values: Vec<Real>,
}

impl ChargeBrick {
    pub fn new(shape: BrickShape) -> Result<Self, TryReserveError> {
        let mut brick = Self {
            shape,
            values: Vec::new(),
        };
        brick.resize(shape)?;
        Ok(brick)
    }

    pub fn shape(&self) -> &BrickShape {
        &self.shape
    }

    /// Adopts a new grid geometry. The backing storage only ever grows;
    /// shrinking geometries reuse the existing allocation, and a failed
    /// growth leaves the previous buffer and shape intact.
    pub fn resize(&mut self, shape: BrickShape) -> Result<(), TryReserveError> {
        if self.values.len() < shape.num_points() {
            self.values
                .try_reserve(shape.num_points() - self.values.len())?;
            self.values.resize(shape.num_points(), 0.0);
        }
        self.shape = shape;
        Ok(())
    }

    /// Zeroes every accumulator. Called at the start of each pass.
    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    pub fn values(&self) -> &[Real] {
        &self.values[..self.shape.num_points()]
    }

    pub fn values_mut(&mut self) -> &mut [Real] {
        let n = self.shape.num_points();
        &mut self.values[..n]
    }

    /// Value at a grid point given in local coordinates (ghosts included).
    pub fn value_at(&self, point: Vector<i32>) -> Real {
        self.values[self.shape.point_index(point)]
    }

    /// Sum of every accumulator, ghost points included.
    pub fn total(&self) -> Real {
        self.values().iter().sum()
    }

    pub fn host_memory_usage(&self) -> usize {
        self.values.capacity() * std::mem::size_of::<Real>()
    }
}
