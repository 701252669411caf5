use crate::math::{Point, Real, Vector};
use na::{vector, ComplexField};

/// Inclusive index-space bounds of the local (non-ghost) grid region.
///
/// The surrounding simulator hands each device the slab of the global grid
/// it owns; only the extents matter for a single-device pass, the absolute
/// bounds are kept for the caller's bookkeeping.
#[cfg_attr(feature = "cuda", derive(cust_core::DeviceCopy))]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct GridRegion {
    pub lo: Vector<i32>,
    pub hi: Vector<i32>,
}

impl GridRegion {
    pub fn new(lo: Vector<i32>, hi: Vector<i32>) -> Self {
        Self { lo, hi }
    }

    /// Region spanning `extents` points with its lower corner at the origin.
    pub fn from_extents(extents: Vector<u32>) -> Self {
        Self {
            lo: vector![0, 0, 0],
            hi: extents.map(|e| e as i32 - 1),
        }
    }

    /// Number of grid points per axis.
    pub fn extents(&self) -> Vector<u32> {
        vector![
            (self.hi.x - self.lo.x + 1) as u32,
            (self.hi.y - self.lo.y + 1) as u32,
            (self.hi.z - self.lo.z + 1) as u32
        ]
    }
}

/// Geometry of the charge brick: the local grid region extended by a halo
/// of ghost points on every side, flattened z-major with x fastest.
#[cfg_attr(feature = "cuda", derive(cust_core::DeviceCopy))]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct BrickShape {
    /// Local grid points per axis; cells are indexed over this range.
    pub nlocal: Vector<u32>,
    /// Halo width, identical on every side of every axis.
    pub ghost: u32,
    /// Extended grid points per axis (`nlocal + 2 * ghost`).
    pub npts: Vector<u32>,
}

impl BrickShape {
    pub fn new(region: &GridRegion, ghost: u32) -> Self {
        let nlocal = region.extents();
        Self {
            nlocal,
            ghost,
            npts: nlocal.map(|e| e + 2 * ghost),
        }
    }

    /// Total number of grid points in the extended brick.
    pub fn num_points(&self) -> usize {
        self.npts.x as usize * self.npts.y as usize * self.npts.z as usize
    }

    /// Total number of cells in the local region.
    pub fn num_cells(&self) -> usize {
        self.nlocal.x as usize * self.nlocal.y as usize * self.nlocal.z as usize
    }

    /// Flat index of a grid point given in local coordinates, which may
    /// reach `-ghost..nlocal + ghost` on every axis.
    #[inline(always)]
    pub fn point_index(&self, p: Vector<i32>) -> usize {
        let g = self.ghost as i32;
        let x = (p.x + g) as usize;
        let y = (p.y + g) as usize;
        let z = (p.z + g) as usize;
        (z * self.npts.y as usize + y) * self.npts.x as usize + x
    }

    /// Flat index of a local cell.
    #[inline(always)]
    pub fn cell_index(&self, c: Vector<u32>) -> usize {
        (c.z as usize * self.nlocal.y as usize + c.y as usize) * self.nlocal.x as usize
            + c.x as usize
    }

    /// `true` if the signed cell coordinates fall inside the local region.
    #[inline(always)]
    pub fn contains_cell(&self, c: Vector<i32>) -> bool {
        c.x >= 0
            && c.y >= 0
            && c.z >= 0
            && (c.x as u32) < self.nlocal.x
            && (c.y as u32) < self.nlocal.y
            && (c.z as u32) < self.nlocal.z
    }
}

/// Fractional grid coordinates of a position relative to the local box
/// corner: `t = (pos - lo) * inv_spacing`, per axis.
#[inline(always)]
pub fn fractional_coords(
    pos: &Point<Real>,
    box_lo: &Point<Real>,
    inv_spacing: &Vector<Real>,
) -> Vector<Real> {
    (pos - box_lo).component_mul(inv_spacing)
}

/// Owning cell of fractional grid coordinates: the per-axis floor.
#[inline(always)]
pub fn owning_cell(t: Vector<Real>) -> Vector<i32> {
    t.map(|e| e.floor() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::point;

    #[test]
    fn point_index_covers_the_extended_brick() {
        let shape = BrickShape::new(&GridRegion::from_extents(vector![4, 5, 6]), 2);
        assert_eq!(shape.npts, vector![8, 9, 10]);
        assert_eq!(shape.num_points(), 8 * 9 * 10);

        // Lowest and highest ghost corners map to the buffer ends.
        assert_eq!(shape.point_index(vector![-2, -2, -2]), 0);
        assert_eq!(shape.point_index(vector![5, 6, 7]), shape.num_points() - 1);

        // Neighboring points along x are adjacent in memory.
        let a = shape.point_index(vector![0, 1, 2]);
        let b = shape.point_index(vector![1, 1, 2]);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn cell_mapping_uses_the_floor() {
        let t = fractional_coords(
            &point![1.5, 2.25, -0.25],
            &point![0.0, 0.0, 0.0],
            &vector![2.0, 2.0, 2.0],
        );
        assert_eq!(owning_cell(t), vector![3, 4, -1]);
    }

    #[test]
    fn contains_cell_matches_local_extents() {
        let shape = BrickShape::new(&GridRegion::from_extents(vector![4, 4, 4]), 1);
        assert!(shape.contains_cell(vector![0, 0, 0]));
        assert!(shape.contains_cell(vector![3, 3, 3]));
        assert!(!shape.contains_cell(vector![-1, 0, 0]));
        assert!(!shape.contains_cell(vector![0, 4, 0]));
    }
}
