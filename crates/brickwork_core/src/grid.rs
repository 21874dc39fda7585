//! # Voxel Grid
//!
//! The shared 3D state of a build:
//! - `cells`: tri-state occupancy (`Void`, `Empty`, `Filled`)
//! - `components`: which excluded sub-assembly a voxel belongs to
//! - `owners`: which brick instance owns a filled voxel
//! - `reference`: the model silhouette before any packing
//!
//! ## Invariant
//!
//! `owner(c).is_some() <=> cell(c) == Cell::Filled`. Every mutation goes
//! through [`VoxelGrid::occupy`] / [`VoxelGrid::release`], which keep both
//! arrays in step and never mutate partially.

use std::fmt;
use std::num::NonZeroU32;
use std::ops::Range;

use crate::error::{GridError, GridResult};

/// Grid extents along X, Y and Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GridDims {
    /// Extent along X.
    pub x: usize,
    /// Extent along Y.
    pub y: usize,
    /// Extent along Z (up).
    pub z: usize,
}

impl GridDims {
    /// Creates new dimensions.
    #[inline]
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn volume(self) -> usize {
        self.x * self.y * self.z
    }

    /// Returns true if any axis is zero.
    #[inline]
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Returns true if the coordinate lies inside the grid.
    #[inline]
    #[must_use]
    pub const fn contains(self, c: Coord) -> bool {
        c.x < self.x && c.y < self.y && c.z < self.z
    }

    /// Linear index of a coordinate (X fastest, Z slowest).
    #[inline]
    #[must_use]
    pub const fn index(self, c: Coord) -> usize {
        (c.z * self.y + c.y) * self.x + c.x
    }

    /// Inverse of [`GridDims::index`].
    #[inline]
    #[must_use]
    pub const fn coord(self, index: usize) -> Coord {
        let x = index % self.x;
        let y = (index / self.x) % self.y;
        let z = index / (self.x * self.y);
        Coord { x, y, z }
    }

    /// Dimensions as an array.
    #[inline]
    #[must_use]
    pub const fn as_array(self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }
}

/// A cell coordinate inside a grid.
///
/// Ordering is lexicographic on `(x, y, z)`, which keeps every set of
/// coordinates iterable in a stable order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    /// X index.
    pub x: usize,
    /// Y index.
    pub y: usize,
    /// Z index (up).
    pub z: usize,
}

impl Coord {
    /// Creates a new coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum.
    #[inline]
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Applies a signed offset, returning `None` if it would underflow or
    /// leave `dims`.
    #[must_use]
    pub fn offset(self, dx: isize, dy: isize, dz: isize, dims: GridDims) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        let z = self.z.checked_add_signed(dz)?;
        let c = Self::new(x, y, z);
        dims.contains(c).then_some(c)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Dense 3D array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid3<T> {
    dims: GridDims,
    data: Vec<T>,
}

impl<T: Clone> Grid3<T> {
    /// Creates a grid filled with `value`.
    #[must_use]
    pub fn filled(dims: GridDims, value: T) -> Self {
        Self {
            dims,
            data: vec![value; dims.volume()],
        }
    }

    /// Copies an axis-aligned box out of the grid.
    ///
    /// `min` is the box origin; the box is clipped to the grid.
    #[must_use]
    pub fn sub_box(&self, min: Coord, size: GridDims) -> Self {
        let size = GridDims::new(
            size.x.min(self.dims.x.saturating_sub(min.x)),
            size.y.min(self.dims.y.saturating_sub(min.y)),
            size.z.min(self.dims.z.saturating_sub(min.z)),
        );
        let mut data = Vec::with_capacity(size.volume());
        for z in 0..size.z {
            for y in 0..size.y {
                for x in 0..size.x {
                    data.push(self[min.add(Coord::new(x, y, z))].clone());
                }
            }
        }
        Self { dims: size, data }
    }
}

impl<T> Grid3<T> {
    /// Builds a grid from raw data laid out as in [`GridDims::index`].
    ///
    /// Returns `None` if the data length does not match the volume.
    #[must_use]
    pub fn from_vec(dims: GridDims, data: Vec<T>) -> Option<Self> {
        (data.len() == dims.volume()).then_some(Self { dims, data })
    }

    /// Builds a grid by evaluating `f` at every coordinate.
    #[must_use]
    pub fn from_fn(dims: GridDims, mut f: impl FnMut(Coord) -> T) -> Self {
        let data = (0..dims.volume()).map(|i| f(dims.coord(i))).collect();
        Self { dims, data }
    }

    /// Grid dimensions.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> GridDims {
        self.dims
    }

    /// Returns the cell at `c`, or `None` when out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, c: Coord) -> Option<&T> {
        if self.dims.contains(c) {
            self.data.get(self.dims.index(c))
        } else {
            None
        }
    }

    /// Mutable access to the cell at `c`, or `None` when out of bounds.
    #[inline]
    pub fn get_mut(&mut self, c: Coord) -> Option<&mut T> {
        if self.dims.contains(c) {
            let index = self.dims.index(c);
            self.data.get_mut(index)
        } else {
            None
        }
    }

    /// Iterates over `(coord, value)` pairs in linear order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &T)> {
        let dims = self.dims;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (dims.coord(i), v))
    }

    /// Raw linear storage.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> std::ops::Index<Coord> for Grid3<T> {
    type Output = T;

    #[inline]
    fn index(&self, c: Coord) -> &T {
        &self.data[self.dims.index(c)]
    }
}

impl<T> std::ops::IndexMut<Coord> for Grid3<T> {
    #[inline]
    fn index_mut(&mut self, c: Coord) -> &mut T {
        let index = self.dims.index(c);
        &mut self.data[index]
    }
}

/// State of a single voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Outside the model, or carved out for an excluded component.
    #[default]
    Void,
    /// Model voxel that still needs a brick.
    Empty,
    /// Covered by a brick.
    Filled,
}

/// Identifier of a placed brick instance. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct BrickId(NonZeroU32);

impl BrickId {
    /// Wraps a non-zero value.
    #[inline]
    #[must_use]
    pub const fn new(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    /// Wraps a raw id; `0` means "no brick" and yields `None`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for BrickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Excluded sub-assembly tag. `0` is the main model body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub u16);

impl ComponentId {
    /// The main model body (not an excluded component).
    pub const MAIN: Self = Self(0);

    /// Returns true for the main model body.
    #[inline]
    #[must_use]
    pub const fn is_main(self) -> bool {
        self.0 == 0
    }
}

/// The voxel grid shared by every stage of a build.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    cells: Grid3<Cell>,
    components: Grid3<ComponentId>,
    owners: Grid3<Option<BrickId>>,
    reference: Grid3<bool>,
}

impl VoxelGrid {
    /// Builds a grid from a binary occupancy array and a component map.
    ///
    /// Model voxels tagged with a non-main component start out `Void`
    /// (carved out); they can be re-opened later with
    /// [`VoxelGrid::reopen_components`]. The occupancy itself becomes the
    /// pre-packing reference used by the overhang filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is zero-sized or the two inputs have
    /// different shapes.
    pub fn new(occupancy: Grid3<bool>, components: Grid3<ComponentId>) -> GridResult<Self> {
        let dims = occupancy.dims();
        if dims.is_degenerate() {
            return Err(GridError::ZeroSized(dims.as_array()));
        }
        if components.dims() != dims {
            return Err(GridError::ShapeMismatch {
                occupancy: dims.as_array(),
                components: components.dims().as_array(),
            });
        }

        let cells = Grid3::from_fn(dims, |c| {
            if occupancy[c] && components[c].is_main() {
                Cell::Empty
            } else {
                Cell::Void
            }
        });

        Ok(Self {
            cells,
            components,
            owners: Grid3::filled(dims, None),
            reference: occupancy,
        })
    }

    /// Builds a grid with no excluded components.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is zero-sized.
    pub fn from_occupancy(occupancy: Grid3<bool>) -> GridResult<Self> {
        let components = Grid3::filled(occupancy.dims(), ComponentId::MAIN);
        Self::new(occupancy, components)
    }

    /// Grid dimensions.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.cells.dims()
    }

    /// State of a cell (`Void` when out of bounds).
    #[inline]
    #[must_use]
    pub fn cell(&self, c: Coord) -> Cell {
        self.cells.get(c).copied().unwrap_or(Cell::Void)
    }

    /// Returns true if the cell is inside the model and still needs a brick.
    #[inline]
    #[must_use]
    pub fn is_empty(&self, c: Coord) -> bool {
        self.cell(c) == Cell::Empty
    }

    /// Brick owning the cell, if any.
    #[inline]
    #[must_use]
    pub fn owner(&self, c: Coord) -> Option<BrickId> {
        self.owners.get(c).copied().flatten()
    }

    /// Component the cell belongs to.
    #[inline]
    #[must_use]
    pub fn component(&self, c: Coord) -> ComponentId {
        self.components.get(c).copied().unwrap_or_default()
    }

    /// The pre-packing model silhouette.
    #[inline]
    #[must_use]
    pub fn reference(&self) -> &Grid3<bool> {
        &self.reference
    }

    /// Raw owner array.
    #[inline]
    #[must_use]
    pub fn owners(&self) -> &Grid3<Option<BrickId>> {
        &self.owners
    }

    /// Marks `cells` as filled by `id`.
    ///
    /// All cells are checked first; nothing is written unless every cell
    /// is `Empty`.
    ///
    /// # Errors
    ///
    /// Returns the first unavailable cell.
    pub fn occupy(&mut self, cells: &[Coord], id: BrickId) -> GridResult<()> {
        if let Some(&bad) = cells.iter().find(|&&c| !self.is_empty(c)) {
            return Err(GridError::CellUnavailable(bad));
        }
        for &c in cells {
            self.cells[c] = Cell::Filled;
            self.owners[c] = Some(id);
        }
        Ok(())
    }

    /// Clears every cell owned by `id` back to `Empty`.
    ///
    /// Returns the released cells in coordinate order.
    pub fn release(&mut self, id: BrickId) -> Vec<Coord> {
        let released = self.cells_of(id);
        for &c in &released {
            self.cells[c] = Cell::Empty;
            self.owners[c] = None;
        }
        released
    }

    /// All cells owned by `id`, in coordinate order.
    #[must_use]
    pub fn cells_of(&self, id: BrickId) -> Vec<Coord> {
        let mut cells: Vec<Coord> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == Some(id))
            .map(|(c, _)| c)
            .collect();
        cells.sort_unstable();
        cells
    }

    /// Re-opens carved-out cells of the given components (`Void` -> `Empty`).
    ///
    /// Returns the number of cells re-opened.
    pub fn reopen_components(&mut self, ids: &[ComponentId]) -> usize {
        let mut reopened = 0;
        for index in 0..self.dims().volume() {
            let c = self.dims().coord(index);
            if self.cells[c] == Cell::Void
                && self.reference[c]
                && ids.contains(&self.components[c])
            {
                self.cells[c] = Cell::Empty;
                reopened += 1;
            }
        }
        reopened
    }

    /// Copies the open/closed state of a Z band into a search window
    /// (1 = empty, 0 = anything else).
    #[must_use]
    pub fn band_window(&self, z: Range<usize>) -> Grid3<u8> {
        let dims = self.dims();
        let start = z.start.min(dims.z);
        let end = z.end.min(dims.z).max(start);
        let size = GridDims::new(dims.x, dims.y, end - start);
        Grid3::from_fn(size, |c| {
            u8::from(self.is_empty(Coord::new(c.x, c.y, c.z + start)))
        })
    }

    /// Number of cells in a given state.
    #[must_use]
    pub fn count(&self, state: Cell) -> usize {
        self.cells.as_slice().iter().filter(|&&c| c == state).count()
    }
}
