//! # Brickwork Core
//!
//! Data model and kernel matching for turning a voxel model into bricks.
//!
//! ## Contents
//!
//! - [`grid`]: the voxel grid with component and brick ownership arrays
//! - [`kernel`]: boolean brick footprints and kernel origins
//! - [`catalog`]: immutable brick type definitions (built in or TOML)
//! - [`brick`]: a brick type in a concrete orientation
//! - [`search`]: correlation scan and overhang filter
//!
//! ## Design Principles
//!
//! 1. **No randomness** - every function here is deterministic
//! 2. **Validate, then mutate** - grid writes are all-or-nothing
//! 3. **Fail at load** - catalog errors surface before any placement
//!
//! ## Example
//!
//! ```rust,ignore
//! use brickwork_core::{BrickCatalog, OrientedBrick, SearchWindow, VoxelGrid};
//!
//! let catalog = BrickCatalog::builtin();
//! let grid = VoxelGrid::from_occupancy(occupancy)?;
//! let brick = OrientedBrick::new(catalog.get("4x2x1").unwrap().clone());
//!
//! let window = SearchWindow::band(&grid, 0..1);
//! let anchors = brickwork_core::search::fitting_positions(&window, &brick, None);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod brick;
pub mod catalog;
pub mod error;
pub mod grid;
pub mod kernel;
pub mod search;

pub use brick::{Orientation, OrientedBrick};
pub use catalog::{sort_largest_first, BrickCatalog, BrickFamily, BrickShape, BrickTypeDef};
pub use error::{CatalogError, CatalogResult, GridError, GridResult, OrientationError};
pub use grid::{BrickId, Cell, ComponentId, Coord, Grid3, GridDims, VoxelGrid};
pub use kernel::{dimension_origin, Kernel, KernelOrigin};
pub use search::{fitting_positions, OverhangFilter, SearchWindow};
