//! # Core Error Types
//!
//! All errors that can occur while loading a catalog, building a grid or
//! re-orienting a brick.

use thiserror::Error;

use crate::brick::Orientation;
use crate::grid::Coord;

/// Malformed catalog entries. Always fatal at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A brick dimension is zero.
    #[error("brick {name}: dimensions must be non-zero, got {length}x{width}x{height}")]
    ZeroDimension {
        /// Brick name.
        name: String,
        /// Length (X extent in canonical orientation).
        length: usize,
        /// Width (Y extent in canonical orientation).
        width: usize,
        /// Height (Z extent).
        height: usize,
    },

    /// A sloped brick was declared with a wrong number of kernel origins.
    #[error("brick {name}: sloped bricks need exactly 4 kernel origins, got {found}")]
    SlopedOrigins {
        /// Brick name.
        name: String,
        /// Number of origin tuples supplied.
        found: usize,
    },

    /// A sloped kernel cell lies outside the brick's bounding box.
    #[error("brick {name}: kernel cell ({x}, {y}, {z}) lies outside the {length}x{width}x{height} box")]
    CellOutOfBounds {
        /// Brick name.
        name: String,
        /// Cell X.
        x: usize,
        /// Cell Y.
        y: usize,
        /// Cell Z.
        z: usize,
        /// Box length.
        length: usize,
        /// Box width.
        width: usize,
        /// Box height.
        height: usize,
    },

    /// A sloped brick declares no kernel cells at all.
    #[error("brick {0}: sloped kernel has no filled cells")]
    EmptyKernel(String),

    /// Kernel cells were given for a brick whose shape is a plain cuboid.
    #[error("brick {0}: explicit kernel cells are only valid for sloped bricks")]
    UnexpectedCells(String),

    /// Two catalog entries share the same name.
    #[error("duplicate brick name: {0}")]
    DuplicateName(String),

    /// The catalog document could not be parsed.
    #[error("invalid catalog file: {0}")]
    Parse(String),
}

/// Invalid rotation requests. Recoverable: the brick is left unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationError {
    /// The brick has a square footprint and no orientation.
    #[error("the brick has the same length and width")]
    Symmetric,

    /// The requested orientation is the current one.
    #[error("current orientation is already {0:?}")]
    Unchanged(Orientation),

    /// The requested orientation does not belong to the brick's shape.
    #[error("orientation {0:?} is not allowed for this brick shape")]
    Incompatible(Orientation),
}

/// Grid construction and mutation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Occupancy and component grids have different shapes.
    #[error("grid shape mismatch: occupancy {occupancy:?} vs components {components:?}")]
    ShapeMismatch {
        /// Occupancy grid dimensions.
        occupancy: [usize; 3],
        /// Component grid dimensions.
        components: [usize; 3],
    },

    /// A grid with a zero-sized axis was supplied.
    #[error("grid dimensions must be non-zero, got {0:?}")]
    ZeroSized([usize; 3]),

    /// A cell was not available for the requested mutation.
    #[error("cell {0} is not available")]
    CellUnavailable(Coord),

    /// Every brick id has been handed out.
    #[error("brick id space exhausted")]
    IdsExhausted,
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;
