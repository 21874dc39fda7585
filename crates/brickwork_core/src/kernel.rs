//! # Matching Kernels
//!
//! A kernel is the boolean footprint of a brick in local coordinates.
//! Cuboid kernels are dense `L x W x H` blocks; sloped kernels are authored
//! as an explicit cell list in one canonical orientation and derived for the
//! other three by transpose and flips.
//!
//! ## Kernel origin
//!
//! The correlation scan reports matches at the kernel origin, not at the
//! brick's minimum corner. Per axis the origin of a cuboid is
//! [`dimension_origin`]: `d / 2 - 1` for even `d`, `d / 2` for odd `d`.
//! Subtracting the origin from a match position yields the minimum-corner
//! anchor where the brick is actually placed.

use crate::grid::{Coord, Grid3, GridDims};

/// Kernel origin along one axis of size `d`.
///
/// ```rust,ignore
/// assert_eq!(dimension_origin(4), 1);
/// assert_eq!(dimension_origin(5), 2);
/// ```
#[inline]
#[must_use]
pub const fn dimension_origin(d: usize) -> i32 {
    if d % 2 == 0 {
        (d / 2) as i32 - 1
    } else {
        (d / 2) as i32
    }
}

/// Offset from a brick's minimum corner to its kernel origin.
///
/// Sloped bricks carry authored origins, which may be negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct KernelOrigin {
    /// X offset.
    pub x: i32,
    /// Y offset.
    pub y: i32,
    /// Z offset.
    pub z: i32,
}

impl KernelOrigin {
    /// Creates an origin from explicit offsets.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Origin of a dense cuboid kernel.
    #[inline]
    #[must_use]
    pub const fn centered(length: usize, width: usize, height: usize) -> Self {
        Self {
            x: dimension_origin(length),
            y: dimension_origin(width),
            z: dimension_origin(height),
        }
    }
}

impl From<[i32; 3]> for KernelOrigin {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Boolean footprint of a brick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kernel {
    mask: Grid3<bool>,
    /// Filled cells in coordinate order.
    cells: Vec<Coord>,
}

impl Kernel {
    /// Dense all-ones kernel.
    #[must_use]
    pub fn cuboid(length: usize, width: usize, height: usize) -> Self {
        Self::from_mask(Grid3::filled(GridDims::new(length, width, height), true))
    }

    /// Kernel from an explicit list of filled cells.
    ///
    /// # Errors
    ///
    /// Returns the first cell that lies outside `dims`.
    pub fn from_cells(dims: GridDims, cells: &[Coord]) -> Result<Self, Coord> {
        let mut mask = Grid3::filled(dims, false);
        for &c in cells {
            *mask.get_mut(c).ok_or(c)? = true;
        }
        Ok(Self::from_mask(mask))
    }

    /// Kernel whose cell `c` is filled when `f(c)` holds.
    #[must_use]
    pub fn from_fn(dims: GridDims, f: impl FnMut(Coord) -> bool) -> Self {
        Self::from_mask(Grid3::from_fn(dims, f))
    }

    fn from_mask(mask: Grid3<bool>) -> Self {
        let mut cells: Vec<Coord> = mask.iter().filter(|(_, &v)| v).map(|(c, _)| c).collect();
        cells.sort_unstable();
        Self { mask, cells }
    }

    /// Bounding box of the kernel.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.mask.dims()
    }

    /// Filled cells, in coordinate order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    /// Number of filled cells, i.e. the correlation value of a full match.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the local cell is part of the footprint.
    #[inline]
    #[must_use]
    pub fn contains(&self, c: Coord) -> bool {
        self.mask.get(c).copied().unwrap_or(false)
    }

    /// Swaps the X and Y axes.
    #[must_use]
    pub fn transposed_xy(&self) -> Self {
        let d = self.dims();
        let dims = GridDims::new(d.y, d.x, d.z);
        Self::from_mask(Grid3::from_fn(dims, |c| self.mask[Coord::new(c.y, c.x, c.z)]))
    }

    /// Mirrors along X.
    #[must_use]
    pub fn flipped_x(&self) -> Self {
        let d = self.dims();
        Self::from_mask(Grid3::from_fn(d, |c| {
            self.mask[Coord::new(d.x - 1 - c.x, c.y, c.z)]
        }))
    }

    /// Mirrors along Y.
    #[must_use]
    pub fn flipped_y(&self) -> Self {
        let d = self.dims();
        Self::from_mask(Grid3::from_fn(d, |c| {
            self.mask[Coord::new(c.x, d.y - 1 - c.y, c.z)]
        }))
    }

    /// Top-most filled cell of every footprint column, as `(x, y, top_z)`.
    #[must_use]
    pub fn column_tops(&self) -> Vec<(usize, usize, usize)> {
        let d = self.dims();
        let mut tops = Vec::new();
        for y in 0..d.y {
            for x in 0..d.x {
                if let Some(z) = (0..d.z).rev().find(|&z| self.mask[Coord::new(x, y, z)]) {
                    tops.push((x, y, z));
                }
            }
        }
        tops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slope() -> Kernel {
        Kernel::from_cells(
            GridDims::new(3, 1, 3),
            &[
                Coord::new(0, 0, 0),
                Coord::new(1, 0, 0),
                Coord::new(1, 0, 1),
                Coord::new(2, 0, 1),
                Coord::new(2, 0, 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dimension_origin() {
        assert_eq!(dimension_origin(1), 0);
        assert_eq!(dimension_origin(2), 0);
        assert_eq!(dimension_origin(3), 1);
        assert_eq!(dimension_origin(4), 1);
        assert_eq!(dimension_origin(5), 2);
    }

    #[test]
    fn test_cuboid_is_dense() {
        let k = Kernel::cuboid(2, 3, 1);
        assert_eq!(k.cell_count(), 6);
        assert!(k.contains(Coord::new(1, 2, 0)));
        assert!(!k.contains(Coord::new(2, 0, 0)));
    }

    #[test]
    fn test_from_cells_rejects_outside() {
        let err = Kernel::from_cells(GridDims::new(2, 1, 1), &[Coord::new(2, 0, 0)]).unwrap_err();
        assert_eq!(err, Coord::new(2, 0, 0));
    }

    #[test]
    fn test_transpose_and_flips() {
        let k = slope();
        let t = k.transposed_xy();
        assert_eq!(t.dims(), GridDims::new(1, 3, 3));
        assert!(t.contains(Coord::new(0, 2, 2)));

        let fx = k.flipped_x();
        assert!(fx.contains(Coord::new(0, 0, 2)));
        assert!(!fx.contains(Coord::new(2, 0, 2)));

        let fy = t.flipped_y();
        assert!(fy.contains(Coord::new(0, 0, 2)));
        assert_eq!(fy.cell_count(), k.cell_count());

        assert_eq!(k.flipped_x().flipped_x(), k);
        assert_eq!(k.transposed_xy().transposed_xy(), k);
    }

    #[test]
    fn test_column_tops() {
        let tops = slope().column_tops();
        assert_eq!(tops, vec![(0, 0, 0), (1, 0, 1), (2, 0, 2)]);
    }
}
