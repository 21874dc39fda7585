//! # Placement Search
//!
//! Kernel matching over a window of the voxel grid.
//!
//! ## Correlation
//!
//! A window holds `1` for open cells and `0` for everything else. For a
//! match position `p`, the correlation is
//!
//! ```text
//! C(p) = sum over kernel cells k of  W[p - O + k]      (0 outside the window)
//! ```
//!
//! where `O` is the kernel origin. The brick fits with its minimum corner at
//! `p - O` exactly when `C(p)` equals the kernel's cell count. Placement
//! search walks anchors and evaluates `C` at `anchor + O`, so origins only
//! shift the match grid and never the anchors reported.
//!
//! ## Overhang filter
//!
//! Surface passes additionally reject positions that would cap a column of
//! the original model: for each kernel column, every reference cell strictly
//! above the column's top-most kernel cell must be outside the model.
//!
//! Results are returned in scan order (Z, then Y, then X). Callers shuffle or
//! score them; nothing downstream depends on that order for correctness.

use std::ops::Range;

use crate::brick::OrientedBrick;
use crate::grid::{Coord, Grid3, GridDims, VoxelGrid};
use crate::kernel::{Kernel, KernelOrigin};

/// An open/closed snapshot of part of the grid.
///
/// Local coordinates are relative to `offset`; all public results are global.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchWindow {
    offset: Coord,
    values: Grid3<u8>,
}

impl SearchWindow {
    /// A horizontal band of the grid spanning `z`.
    #[must_use]
    pub fn band(grid: &VoxelGrid, z: Range<usize>) -> Self {
        let start = z.start.min(grid.dims().z);
        Self {
            offset: Coord::new(0, 0, start),
            values: grid.band_window(z),
        }
    }

    /// The whole grid.
    #[must_use]
    pub fn full(grid: &VoxelGrid) -> Self {
        Self::band(grid, 0..grid.dims().z)
    }

    /// An arbitrary box with `min` as its global origin; `open` decides each
    /// global cell.
    #[must_use]
    pub fn from_fn(min: Coord, size: GridDims, mut open: impl FnMut(Coord) -> bool) -> Self {
        Self {
            offset: min,
            values: Grid3::from_fn(size, |c| u8::from(open(min.add(c)))),
        }
    }

    /// Global coordinate of the window's local origin.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> Coord {
        self.offset
    }

    /// Window extents.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.values.dims()
    }

    /// Local open/closed values.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &Grid3<u8> {
        &self.values
    }

    /// Returns true if the global cell is inside the window and open.
    #[must_use]
    pub fn is_open(&self, global: Coord) -> bool {
        self.to_local(global)
            .and_then(|c| self.values.get(c))
            .is_some_and(|&v| v == 1)
    }

    /// Closes global cells after a placement. Cells outside the window are
    /// ignored.
    pub fn mark_filled(&mut self, cells: &[Coord]) {
        for &global in cells {
            if let Some(v) = self.to_local(global).and_then(|c| self.values.get_mut(c)) {
                *v = 0;
            }
        }
    }

    /// Number of open cells.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.values.as_slice().iter().filter(|&&v| v == 1).count()
    }

    fn to_local(&self, global: Coord) -> Option<Coord> {
        Some(Coord::new(
            global.x.checked_sub(self.offset.x)?,
            global.y.checked_sub(self.offset.y)?,
            global.z.checked_sub(self.offset.z)?,
        ))
    }
}

/// Rejects positions that would leave original model cells above a brick.
#[derive(Clone, Copy, Debug)]
pub struct OverhangFilter<'a> {
    reference: &'a Grid3<bool>,
}

impl<'a> OverhangFilter<'a> {
    /// Filter against the pre-packing model silhouette.
    #[must_use]
    pub fn new(reference: &'a Grid3<bool>) -> Self {
        Self { reference }
    }

    /// Returns true if a brick with `kernel` anchored at global `anchor`
    /// leaves no reference cell above any of its columns.
    #[must_use]
    pub fn accepts(&self, kernel: &Kernel, anchor: Coord) -> bool {
        let dims = self.reference.dims();
        kernel.column_tops().into_iter().all(|(x, y, top)| {
            let (gx, gy, gz) = (anchor.x + x, anchor.y + y, anchor.z + top);
            (gz + 1..dims.z).all(|z| {
                !self
                    .reference
                    .get(Coord::new(gx, gy, z))
                    .copied()
                    .unwrap_or(false)
            })
        })
    }
}

/// Kernel correlation at match position `p` (local window coordinates).
///
/// Out-of-window cells count as `0`.
#[must_use]
pub fn correlation_at(
    values: &Grid3<u8>,
    kernel: &Kernel,
    origin: KernelOrigin,
    p: [isize; 3],
) -> usize {
    let origin = [origin.x as isize, origin.y as isize, origin.z as isize];
    kernel
        .cells()
        .iter()
        .filter_map(|k| {
            let x = usize::try_from(p[0] - origin[0] + k.x as isize).ok()?;
            let y = usize::try_from(p[1] - origin[1] + k.y as isize).ok()?;
            let z = usize::try_from(p[2] - origin[2] + k.z as isize).ok()?;
            values.get(Coord::new(x, y, z))
        })
        .map(|&v| usize::from(v))
        .sum()
}

/// The full correlation map over every match position in the window.
#[must_use]
pub fn correlation_map(values: &Grid3<u8>, kernel: &Kernel, origin: KernelOrigin) -> Grid3<usize> {
    Grid3::from_fn(values.dims(), |p| {
        correlation_at(values, kernel, origin, [p.x as isize, p.y as isize, p.z as isize])
    })
}

/// Every global anchor where `brick` fits inside `window`.
///
/// Each candidate anchor `a` is tested at match position `a + O`, so the
/// anchor reported is always the brick's minimum corner whatever its origin.
/// An empty result is the normal "no fitting position" signal.
#[must_use]
pub fn fitting_positions(
    window: &SearchWindow,
    brick: &OrientedBrick,
    overhang: Option<&OverhangFilter<'_>>,
) -> Vec<Coord> {
    let kernel = brick.kernel();
    let (kd, wd) = (kernel.dims(), window.dims());
    let (Some(max_x), Some(max_y), Some(max_z)) = (
        wd.x.checked_sub(kd.x),
        wd.y.checked_sub(kd.y),
        wd.z.checked_sub(kd.z),
    ) else {
        return Vec::new();
    };

    let values = window.values();
    let origin = brick.origin();
    let full = kernel.cell_count();
    let mut positions = Vec::new();
    for z in 0..=max_z {
        for y in 0..=max_y {
            for x in 0..=max_x {
                let local = Coord::new(x, y, z);
                let p = [
                    x as isize + origin.x as isize,
                    y as isize + origin.y as isize,
                    z as isize + origin.z as isize,
                ];
                if correlation_at(values, kernel, origin, p) != full {
                    continue;
                }
                let anchor = window.offset().add(local);
                if overhang.is_some_and(|f| !f.accepts(kernel, anchor)) {
                    continue;
                }
                positions.push(anchor);
            }
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BrickTypeDef;
    use std::sync::Arc;

    fn brick(l: usize, w: usize, h: usize) -> OrientedBrick {
        OrientedBrick::new(Arc::new(BrickTypeDef::standard("b", l, w, h).unwrap()))
    }

    fn open_grid(x: usize, y: usize, z: usize) -> VoxelGrid {
        VoxelGrid::from_occupancy(Grid3::filled(GridDims::new(x, y, z), true)).unwrap()
    }

    #[test]
    fn test_all_anchors_in_open_window() {
        let grid = open_grid(4, 4, 1);
        let window = SearchWindow::full(&grid);
        let positions = fitting_positions(&window, &brick(2, 2, 1), None);
        assert_eq!(positions.len(), 9);
        assert_eq!(positions[0], Coord::new(0, 0, 0));
        assert_eq!(positions[8], Coord::new(2, 2, 0));
    }

    #[test]
    fn test_oversized_kernel_has_no_positions() {
        let grid = open_grid(3, 3, 1);
        let window = SearchWindow::full(&grid);
        assert!(fitting_positions(&window, &brick(4, 1, 1), None).is_empty());
        assert!(fitting_positions(&window, &brick(1, 1, 3), None).is_empty());
    }

    #[test]
    fn test_filled_cells_block_matches() {
        let grid = open_grid(3, 1, 1);
        let mut window = SearchWindow::full(&grid);
        window.mark_filled(&[Coord::new(1, 0, 0)]);
        assert!(fitting_positions(&window, &brick(2, 1, 1), None).is_empty());
        assert_eq!(window.open_count(), 2);
    }

    #[test]
    fn test_band_window_reports_global_anchors() {
        let grid = open_grid(2, 1, 4);
        let window = SearchWindow::band(&grid, 3..4);
        let positions = fitting_positions(&window, &brick(2, 1, 1), None);
        assert_eq!(positions, vec![Coord::new(0, 0, 3)]);
    }

    #[test]
    fn test_correlation_matches_fit() {
        let grid = open_grid(5, 1, 1);
        let mut window = SearchWindow::full(&grid);
        window.mark_filled(&[Coord::new(4, 0, 0)]);
        let b = brick(3, 1, 1);
        let origin = b.origin();
        assert_eq!(origin, KernelOrigin::new(1, 0, 0));

        let map = correlation_map(window.values(), b.kernel(), origin);
        // Match positions are anchors shifted by the origin.
        assert_eq!(map[Coord::new(1, 0, 0)], 3);
        assert_eq!(map[Coord::new(2, 0, 0)], 3);
        assert_eq!(map[Coord::new(3, 0, 0)], 2);
        assert_eq!(map[Coord::new(0, 0, 0)], 2);

        let fits = fitting_positions(&window, &b, None);
        assert_eq!(fits, vec![Coord::new(0, 0, 0), Coord::new(1, 0, 0)]);
    }

    #[test]
    fn test_sloped_origin_shifts_match_positions() {
        let slope = Arc::new(
            BrickTypeDef::sloped(
                "2x1x2_slope",
                2,
                1,
                2,
                &[Coord::new(0, 0, 0), Coord::new(1, 0, 1)],
                &[[-1, 0, -1], [-1, 0, -1], [0, -1, -1], [0, -1, -1]],
            )
            .unwrap(),
        );
        let b = OrientedBrick::new(slope);
        let origin = b.origin();
        assert_eq!(origin, KernelOrigin::new(-1, 0, -1));

        // Only (2, 0, 1) is closed: the upper cell of the slope lands on it
        // when anchored at x = 1.
        let grid = open_grid(4, 1, 2);
        let mut window = SearchWindow::full(&grid);
        window.mark_filled(&[Coord::new(2, 0, 1)]);
        let fits = fitting_positions(&window, &b, None);
        assert_eq!(fits, vec![Coord::new(0, 0, 0), Coord::new(2, 0, 0)]);

        // Match positions are anchors shifted by the origin, here below and
        // left of the window.
        let at = |x: isize, z: isize| {
            correlation_at(window.values(), b.kernel(), origin, [x, 0, z])
        };
        assert_eq!(at(-1, -1), 2);
        assert_eq!(at(0, -1), 1);
        assert_eq!(at(1, -1), 2);
        // Reading the anchor itself as a match position misses the brick.
        assert_eq!(at(0, 0), 1);
    }

    #[test]
    fn test_overhang_rejects_capped_column() {
        // Column x=0 is two cells tall; x=1 is one cell.
        let mut occupancy = Grid3::filled(GridDims::new(2, 1, 2), true);
        occupancy[Coord::new(1, 0, 1)] = false;
        let grid = VoxelGrid::from_occupancy(occupancy).unwrap();
        let window = SearchWindow::full(&grid);
        let filter = OverhangFilter::new(grid.reference());
        let b = brick(1, 1, 1);

        let raw = fitting_positions(&window, &b, None);
        assert!(raw.contains(&Coord::new(0, 0, 0)));

        let filtered = fitting_positions(&window, &b, Some(&filter));
        assert!(!filtered.contains(&Coord::new(0, 0, 0)));
        assert!(filtered.contains(&Coord::new(0, 0, 1)));
        assert!(filtered.contains(&Coord::new(1, 0, 0)));
    }

    #[test]
    fn test_from_fn_window() {
        let window = SearchWindow::from_fn(Coord::new(2, 0, 1), GridDims::new(2, 1, 1), |c| c.x == 3);
        assert!(window.is_open(Coord::new(3, 0, 1)));
        assert!(!window.is_open(Coord::new(2, 0, 1)));
        assert!(!window.is_open(Coord::new(0, 0, 0)));
    }
}
