//! # Brick Catalog
//!
//! Immutable brick shape definitions, shared by every stage through `Arc`.
//!
//! ## Sources
//!
//! - [`BrickCatalog::builtin`]: the standard thin/thick sets, smooth tiles and
//!   three sloped shapes
//! - [`BrickCatalog::from_toml_str`]: a user catalog file
//!
//! ## Catalog file format
//!
//! ```toml
//! [[brick]]
//! name = "4x2x1"
//! length = 4
//! width = 2
//! height = 1
//!
//! [[brick]]
//! name = "2x1x2_slope"
//! family = "sloped"
//! length = 2
//! width = 1
//! height = 2
//! cells = [[0, 0, 0], [1, 0, 1]]
//! # north, south, west, east
//! origins = [[-1, 0, -1], [-1, 0, -1], [0, -1, -1], [0, -1, -1]]
//! ```
//!
//! Every entry is validated at load. A malformed entry rejects the whole
//! catalog before any placement happens.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::brick::Orientation;
use crate::error::{CatalogError, CatalogResult};
use crate::grid::{Coord, GridDims};
use crate::kernel::{Kernel, KernelOrigin};

/// Which pass a brick type belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickFamily {
    /// Structural bricks used by the thick and thin passes.
    #[default]
    Standard,
    /// Flat finishing tiles used by the smooth surface pass.
    Smooth,
    /// Irregular slopes used by the sloped surface pass.
    Sloped,
}

/// Geometry of a brick type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrickShape {
    /// Dense `L x W x H` block.
    Cuboid,
    /// Irregular kernel authored in the north orientation.
    Sloped {
        /// Kernel cells in the north orientation.
        canonical: Kernel,
        /// Kernel origins in the order north, south, west, east.
        origins: [KernelOrigin; 4],
    },
}

/// An immutable catalog entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrickTypeDef {
    name: String,
    length: usize,
    width: usize,
    height: usize,
    family: BrickFamily,
    shape: BrickShape,
    rotation_angle: Option<i32>,
}

impl BrickTypeDef {
    /// A structural cuboid brick.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ZeroDimension`] if any dimension is zero.
    pub fn standard(
        name: impl Into<String>,
        length: usize,
        width: usize,
        height: usize,
    ) -> CatalogResult<Self> {
        Self::cuboid(name.into(), BrickFamily::Standard, length, width, height)
    }

    /// A smooth finishing tile (cuboid).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ZeroDimension`] if any dimension is zero.
    pub fn smooth(
        name: impl Into<String>,
        length: usize,
        width: usize,
        height: usize,
    ) -> CatalogResult<Self> {
        Self::cuboid(name.into(), BrickFamily::Smooth, length, width, height)
    }

    fn cuboid(
        name: String,
        family: BrickFamily,
        length: usize,
        width: usize,
        height: usize,
    ) -> CatalogResult<Self> {
        check_dims(&name, length, width, height)?;
        Ok(Self {
            name,
            length,
            width,
            height,
            family,
            shape: BrickShape::Cuboid,
            rotation_angle: None,
        })
    }

    /// A sloped brick from its north-facing cells and four kernel origins
    /// (north, south, west, east).
    ///
    /// # Errors
    ///
    /// - [`CatalogError::ZeroDimension`] if any dimension is zero
    /// - [`CatalogError::SlopedOrigins`] unless exactly four origins are given
    /// - [`CatalogError::EmptyKernel`] if `cells` is empty
    /// - [`CatalogError::CellOutOfBounds`] if a cell lies outside the box
    pub fn sloped(
        name: impl Into<String>,
        length: usize,
        width: usize,
        height: usize,
        cells: &[Coord],
        origins: &[[i32; 3]],
    ) -> CatalogResult<Self> {
        let name = name.into();
        check_dims(&name, length, width, height)?;

        let origins: [[i32; 3]; 4] =
            origins
                .try_into()
                .map_err(|_| CatalogError::SlopedOrigins {
                    name: name.clone(),
                    found: origins.len(),
                })?;
        if cells.is_empty() {
            return Err(CatalogError::EmptyKernel(name));
        }
        let canonical = Kernel::from_cells(GridDims::new(length, width, height), cells).map_err(
            |c| CatalogError::CellOutOfBounds {
                name: name.clone(),
                x: c.x,
                y: c.y,
                z: c.z,
                length,
                width,
                height,
            },
        )?;

        Ok(Self {
            name,
            length,
            width,
            height,
            family: BrickFamily::Sloped,
            shape: BrickShape::Sloped {
                canonical,
                origins: origins.map(KernelOrigin::from),
            },
            rotation_angle: None,
        })
    }

    /// Overrides the default display angle of the starting orientation.
    #[must_use]
    pub fn with_rotation_angle(mut self, angle: i32) -> Self {
        self.rotation_angle = Some(angle);
        self
    }

    /// Catalog name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extent along X in the default orientation.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Extent along Y in the default orientation.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extent along Z.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pass family.
    #[inline]
    #[must_use]
    pub fn family(&self) -> BrickFamily {
        self.family
    }

    /// Geometry.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &BrickShape {
        &self.shape
    }

    /// Custom starting display angle, if any.
    #[inline]
    #[must_use]
    pub fn rotation_angle(&self) -> Option<i32> {
        self.rotation_angle
    }

    /// Returns true for sloped shapes.
    #[inline]
    #[must_use]
    pub fn is_sloped(&self) -> bool {
        matches!(self.shape, BrickShape::Sloped { .. })
    }

    /// Square cuboid footprint: the brick has no orientation.
    #[inline]
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        !self.is_sloped() && self.length == self.width
    }

    /// Orientations worth trying for this type.
    ///
    /// Square cuboids have a single meaningful orientation.
    #[must_use]
    pub fn allowed_orientations(&self) -> &'static [Orientation] {
        if self.is_sloped() {
            &Orientation::SLOPED
        } else if self.is_symmetric() {
            &[Orientation::Unoriented]
        } else {
            &Orientation::CUBOID
        }
    }

    /// Number of cells the brick occupies.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        match &self.shape {
            BrickShape::Cuboid => self.length * self.width * self.height,
            BrickShape::Sloped { canonical, .. } => canonical.cell_count(),
        }
    }
}

fn check_dims(name: &str, length: usize, width: usize, height: usize) -> CatalogResult<()> {
    if length == 0 || width == 0 || height == 0 {
        return Err(CatalogError::ZeroDimension {
            name: name.to_owned(),
            length,
            width,
            height,
        });
    }
    Ok(())
}

/// Orders a pool largest-footprint first: descending `min(L, W)`, then
/// descending `max(L, W)`. Near-square large bricks come before long thin
/// ones. The sort is stable, so equal footprints keep catalog order.
pub fn sort_largest_first(pool: &mut [Arc<BrickTypeDef>]) {
    pool.sort_by_key(|def| {
        let (a, b) = (def.length(), def.width());
        (Reverse(a.min(b)), Reverse(a.max(b)))
    });
}

/// The set of brick types available to a build.
#[derive(Clone, Debug, Default)]
pub struct BrickCatalog {
    bricks: Vec<Arc<BrickTypeDef>>,
}

impl BrickCatalog {
    /// Creates a catalog from definitions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateName`] if two entries share a name.
    pub fn new(defs: impl IntoIterator<Item = BrickTypeDef>) -> CatalogResult<Self> {
        let mut seen = BTreeSet::new();
        let mut bricks = Vec::new();
        for def in defs {
            if !seen.insert(def.name.clone()) {
                return Err(CatalogError::DuplicateName(def.name));
            }
            bricks.push(Arc::new(def));
        }
        tracing::debug!("Brick catalog loaded: {} entries", bricks.len());
        Ok(Self { bricks })
    }

    /// Parses a TOML catalog document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed TOML, or the validation
    /// error of the first bad entry.
    pub fn from_toml_str(source: &str) -> CatalogResult<Self> {
        let file: CatalogFile =
            toml::from_str(source).map_err(|e| CatalogError::Parse(e.to_string()))?;
        let defs = file
            .brick
            .into_iter()
            .map(CatalogEntry::into_def)
            .collect::<CatalogResult<Vec<_>>>()?;
        Self::new(defs)
    }

    /// The built-in brick set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut bricks = Vec::new();
        for &(l, w) in THIN_FOOTPRINTS {
            bricks.push(builtin_cuboid(format!("{l}x{w}x1"), BrickFamily::Standard, l, w, 1));
        }
        for &(l, w) in THICK_FOOTPRINTS {
            bricks.push(builtin_cuboid(format!("{l}x{w}x3"), BrickFamily::Standard, l, w, 3));
        }
        for &(l, w) in SMOOTH_FOOTPRINTS {
            bricks.push(builtin_cuboid(format!("{l}x{w}x1_smooth"), BrickFamily::Smooth, l, w, 1));
        }
        for slope in BUILTIN_SLOPES {
            bricks.push(slope.build());
        }
        Self {
            bricks: bricks.into_iter().map(Arc::new).collect(),
        }
    }

    /// All entries in catalog order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<BrickTypeDef>> {
        self.bricks.iter()
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    /// Returns true if the catalog has no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    /// Looks up an entry by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<BrickTypeDef>> {
        self.bricks.iter().find(|b| b.name == name)
    }

    /// All entries of a family, in catalog order.
    #[must_use]
    pub fn family(&self, family: BrickFamily) -> Vec<Arc<BrickTypeDef>> {
        self.bricks
            .iter()
            .filter(|b| b.family == family)
            .cloned()
            .collect()
    }

    /// Standard bricks of exactly `height`, ordered largest first.
    #[must_use]
    pub fn structural_pool(&self, height: usize) -> Vec<Arc<BrickTypeDef>> {
        let mut pool: Vec<_> = self
            .bricks
            .iter()
            .filter(|b| b.family == BrickFamily::Standard && b.height == height)
            .cloned()
            .collect();
        sort_largest_first(&mut pool);
        pool
    }
}

const THIN_FOOTPRINTS: &[(usize, usize)] = &[
    (1, 1), (2, 1), (3, 1), (4, 1), (5, 1), (6, 1), (8, 1), (10, 1), (12, 1),
    (2, 2), (3, 2), (4, 2), (6, 2), (8, 2), (10, 2), (12, 2), (14, 2), (16, 2),
    (3, 3), (4, 4), (6, 4), (8, 4), (10, 4), (12, 4),
    (6, 6), (8, 6), (10, 6), (12, 6), (14, 6), (16, 6), (24, 6),
    (8, 8), (11, 8), (16, 8), (16, 16),
];

const THICK_FOOTPRINTS: &[(usize, usize)] = &[
    (1, 1), (2, 1), (4, 1), (6, 1), (8, 1), (10, 1), (12, 1), (16, 1),
    (2, 2), (3, 2), (4, 2), (6, 2), (8, 2), (10, 2),
];

const SMOOTH_FOOTPRINTS: &[(usize, usize)] = &[
    (1, 1), (2, 1), (3, 1), (4, 1), (6, 1), (8, 1),
    (2, 2), (3, 2), (4, 2), (6, 2), (6, 6),
];

struct BuiltinSlope {
    name: &'static str,
    dims: (usize, usize, usize),
    cells: &'static [(usize, usize, usize)],
    origins: [[i32; 3]; 4],
}

impl BuiltinSlope {
    fn build(&self) -> BrickTypeDef {
        let (length, width, height) = self.dims;
        let canonical = Kernel::from_fn(GridDims::new(length, width, height), |c| {
            self.cells.contains(&(c.x, c.y, c.z))
        });
        BrickTypeDef {
            name: self.name.to_owned(),
            length,
            width,
            height,
            family: BrickFamily::Sloped,
            shape: BrickShape::Sloped {
                canonical,
                origins: self.origins.map(KernelOrigin::from),
            },
            rotation_angle: None,
        }
    }
}

const BUILTIN_SLOPES: &[BuiltinSlope] = &[
    BuiltinSlope {
        name: "2x1x2_slope",
        dims: (2, 1, 2),
        cells: &[(0, 0, 0), (1, 0, 1)],
        origins: [[-1, 0, -1], [-1, 0, -1], [0, -1, -1], [0, -1, -1]],
    },
    BuiltinSlope {
        name: "3x1x3_slope",
        dims: (3, 1, 3),
        cells: &[(0, 0, 0), (1, 0, 0), (1, 0, 1), (2, 0, 1), (2, 0, 2)],
        origins: [[-1, 0, -1], [-1, 0, -1], [0, -1, -1], [0, -1, -1]],
    },
    BuiltinSlope {
        name: "3x3x3_corner",
        dims: (3, 3, 3),
        cells: &[
            (0, 0, 0), (0, 1, 0), (0, 2, 0),
            (1, 0, 0), (1, 1, 0), (1, 1, 1), (1, 2, 0), (1, 2, 1),
            (2, 0, 0), (2, 1, 0), (2, 1, 1), (2, 2, 1), (2, 2, 2),
        ],
        origins: [[-1, -1, -1]; 4],
    },
];

fn builtin_cuboid(
    name: String,
    family: BrickFamily,
    length: usize,
    width: usize,
    height: usize,
) -> BrickTypeDef {
    BrickTypeDef {
        name,
        length,
        width,
        height,
        family,
        shape: BrickShape::Cuboid,
        rotation_angle: None,
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    brick: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    name: String,
    length: usize,
    width: usize,
    height: usize,
    #[serde(default)]
    family: BrickFamily,
    #[serde(default)]
    cells: Vec<[usize; 3]>,
    #[serde(default)]
    origins: Vec<[i32; 3]>,
    rotation_angle: Option<i32>,
}

impl CatalogEntry {
    fn into_def(self) -> CatalogResult<BrickTypeDef> {
        let def = match self.family {
            BrickFamily::Sloped => {
                let cells: Vec<Coord> =
                    self.cells.iter().map(|&[x, y, z]| Coord::new(x, y, z)).collect();
                BrickTypeDef::sloped(
                    self.name,
                    self.length,
                    self.width,
                    self.height,
                    &cells,
                    &self.origins,
                )?
            }
            family => {
                if !self.cells.is_empty() {
                    return Err(CatalogError::UnexpectedCells(self.name));
                }
                BrickTypeDef::cuboid(self.name, family, self.length, self.width, self.height)?
            }
        };
        Ok(match self.rotation_angle {
            Some(angle) => def.with_rotation_angle(angle),
            None => def,
        })
    }
}
