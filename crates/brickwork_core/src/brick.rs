//! # Oriented Bricks
//!
//! A [`BrickTypeDef`] is immutable and shared; an [`OrientedBrick`] is a
//! working copy of one type in one orientation, carrying the kernel, kernel
//! origin and display angle for that orientation.
//!
//! ## Orientation rules
//!
//! | Shape   | Orientations              | Default                         |
//! |---------|---------------------------|---------------------------------|
//! | Cuboid  | `EastWest`, `NorthSouth`  | `EastWest`, or `Unoriented` if square |
//! | Sloped  | `North`, `South`, `East`, `West` | `North`                  |
//!
//! Cuboid rotation swaps length and width. Sloped rotation swaps them only
//! when crossing between the north/south and east/west axis pairs.

use std::sync::Arc;

use crate::catalog::{BrickShape, BrickTypeDef};
use crate::error::OrientationError;
use crate::grid::Coord;
use crate::kernel::{Kernel, KernelOrigin};

/// Display angle of a cuboid lying east-west.
pub const ANGLE_EAST_WEST: i32 = -180;
/// Display angle of a cuboid lying north-south.
pub const ANGLE_NORTH_SOUTH: i32 = -90;
/// Display angle of a sloped brick facing north.
pub const ANGLE_NORTH: i32 = -90;
/// Display angle of a sloped brick facing south.
pub const ANGLE_SOUTH: i32 = -270;
/// Display angle of a sloped brick facing east.
pub const ANGLE_EAST: i32 = -180;
/// Display angle of a sloped brick facing west.
pub const ANGLE_WEST: i32 = 0;

/// Orientation of a brick in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Orientation {
    /// Cuboid with its length along X.
    EastWest,
    /// Cuboid with its length along Y.
    NorthSouth,
    /// Square cuboid; rotation has no effect.
    Unoriented,
    /// Sloped brick in its canonical orientation.
    North,
    /// Sloped brick mirrored along X.
    South,
    /// Sloped brick transposed then mirrored along Y.
    East,
    /// Sloped brick transposed.
    West,
}

impl Orientation {
    /// The four sloped orientations, in authored-origin order.
    pub const SLOPED: [Self; 4] = [Self::North, Self::South, Self::West, Self::East];

    /// The two cuboid orientations.
    pub const CUBOID: [Self; 2] = [Self::EastWest, Self::NorthSouth];

    /// Returns true for the sloped orientations.
    #[inline]
    #[must_use]
    pub const fn is_sloped(self) -> bool {
        matches!(self, Self::North | Self::South | Self::East | Self::West)
    }

    /// Orientation of the mirror image about the central X plane.
    ///
    /// Cuboid orientations are their own mirror.
    #[inline]
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            other => other,
        }
    }

    /// Returns true if this orientation lies along the east/west axis pair,
    /// where sloped bricks have swapped length and width.
    #[inline]
    #[must_use]
    const fn is_east_west_pair(self) -> bool {
        matches!(self, Self::East | Self::West)
    }

    /// Index into the authored origin list (north, south, west, east).
    #[inline]
    #[must_use]
    pub const fn origin_index(self) -> Option<usize> {
        match self {
            Self::North => Some(0),
            Self::South => Some(1),
            Self::West => Some(2),
            Self::East => Some(3),
            _ => None,
        }
    }
}

/// A brick type in a specific orientation.
#[derive(Clone, Debug)]
pub struct OrientedBrick {
    def: Arc<BrickTypeDef>,
    orientation: Orientation,
    length: usize,
    width: usize,
    kernel: Kernel,
    origin: KernelOrigin,
    rotation_angle: i32,
}

impl OrientedBrick {
    /// Creates a brick in the default orientation of its type.
    #[must_use]
    pub fn new(def: Arc<BrickTypeDef>) -> Self {
        match def.shape() {
            BrickShape::Cuboid => {
                let orientation = if def.is_symmetric() {
                    Orientation::Unoriented
                } else {
                    Orientation::EastWest
                };
                let (length, width, height) = (def.length(), def.width(), def.height());
                Self {
                    orientation,
                    length,
                    width,
                    kernel: Kernel::cuboid(length, width, height),
                    origin: KernelOrigin::centered(length, width, height),
                    rotation_angle: def.rotation_angle().unwrap_or(ANGLE_EAST_WEST),
                    def,
                }
            }
            BrickShape::Sloped { canonical, origins } => {
                let kernel = canonical.clone();
                let origin = origins[0];
                let (length, width) = (def.length(), def.width());
                Self {
                    orientation: Orientation::North,
                    length,
                    width,
                    kernel,
                    origin,
                    rotation_angle: def.rotation_angle().unwrap_or(ANGLE_NORTH),
                    def,
                }
            }
        }
    }

    /// Creates a brick and rotates it to `orientation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the orientation does not apply to this type.
    /// Requesting the default orientation is not an error.
    pub fn with_orientation(
        def: Arc<BrickTypeDef>,
        orientation: Orientation,
    ) -> Result<Self, OrientationError> {
        let mut brick = Self::new(def);
        if brick.orientation != orientation {
            brick.reorient(orientation)?;
        }
        Ok(brick)
    }

    /// The shared type definition.
    #[inline]
    #[must_use]
    pub fn def(&self) -> &Arc<BrickTypeDef> {
        &self.def
    }

    /// Current orientation.
    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Extent along X in the current orientation.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Extent along Y in the current orientation.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Extent along Z.
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.def.height()
    }

    /// Kernel for the current orientation.
    #[inline]
    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Kernel origin for the current orientation.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> KernelOrigin {
        self.origin
    }

    /// Display rotation angle in degrees.
    #[inline]
    #[must_use]
    pub fn rotation_angle(&self) -> i32 {
        self.rotation_angle
    }

    /// Grid cells covered when anchored at `anchor` (minimum corner).
    #[must_use]
    pub fn footprint(&self, anchor: Coord) -> Vec<Coord> {
        self.kernel.cells().iter().map(|&k| anchor.add(k)).collect()
    }

    /// Rotates to `target`, dispatching on the brick's shape.
    ///
    /// # Errors
    ///
    /// See [`OrientedBrick::change_orientation`] and
    /// [`OrientedBrick::change_sloped_orientation`].
    pub fn reorient(&mut self, target: Orientation) -> Result<(), OrientationError> {
        match self.def.shape() {
            BrickShape::Cuboid => self.change_orientation(target),
            BrickShape::Sloped { .. } => self.change_sloped_orientation(target),
        }
    }

    /// Rotates a cuboid brick between `EastWest` and `NorthSouth`.
    ///
    /// Swaps length and width and rebuilds the kernel and origin.
    ///
    /// # Errors
    ///
    /// - [`OrientationError::Symmetric`] for square bricks
    /// - [`OrientationError::Unchanged`] if `target` is the current orientation
    /// - [`OrientationError::Incompatible`] for sloped bricks or sloped targets
    ///
    /// On error the brick is left untouched.
    pub fn change_orientation(&mut self, target: Orientation) -> Result<(), OrientationError> {
        let result = self.rotate_cuboid(target);
        self.log_rejection(target, result)
    }

    /// Rotates a sloped brick to one of its four facings.
    ///
    /// The kernel is derived from the canonical (north) cells: south mirrors
    /// X, west transposes X/Y, east transposes then mirrors Y.
    ///
    /// # Errors
    ///
    /// - [`OrientationError::Unchanged`] if `target` is the current orientation
    /// - [`OrientationError::Incompatible`] for cuboid bricks or cuboid targets
    pub fn change_sloped_orientation(
        &mut self,
        target: Orientation,
    ) -> Result<(), OrientationError> {
        let result = self.rotate_sloped(target);
        self.log_rejection(target, result)
    }

    fn log_rejection(
        &self,
        target: Orientation,
        result: Result<(), OrientationError>,
    ) -> Result<(), OrientationError> {
        if let Err(e) = &result {
            tracing::debug!(
                "{} stays {:?} instead of {:?}: {}",
                self.def.name(),
                self.orientation,
                target,
                e
            );
        }
        result
    }

    fn rotate_cuboid(&mut self, target: Orientation) -> Result<(), OrientationError> {
        if !matches!(self.def.shape(), BrickShape::Cuboid) || target.is_sloped() {
            return Err(OrientationError::Incompatible(target));
        }
        if self.orientation == Orientation::Unoriented {
            return Err(OrientationError::Symmetric);
        }
        if target == Orientation::Unoriented {
            return Err(OrientationError::Incompatible(target));
        }
        if target == self.orientation {
            return Err(OrientationError::Unchanged(target));
        }

        std::mem::swap(&mut self.length, &mut self.width);
        let height = self.height();
        self.orientation = target;
        self.rotation_angle = if target == Orientation::NorthSouth {
            ANGLE_NORTH_SOUTH
        } else {
            ANGLE_EAST_WEST
        };
        self.kernel = Kernel::cuboid(self.length, self.width, height);
        self.origin = KernelOrigin::centered(self.length, self.width, height);
        Ok(())
    }

    fn rotate_sloped(&mut self, target: Orientation) -> Result<(), OrientationError> {
        let BrickShape::Sloped { canonical, origins } = self.def.shape() else {
            return Err(OrientationError::Incompatible(target));
        };
        let Some(origin_index) = target.origin_index() else {
            return Err(OrientationError::Incompatible(target));
        };
        if target == self.orientation {
            return Err(OrientationError::Unchanged(target));
        }

        let kernel = match target {
            Orientation::South => canonical.flipped_x(),
            Orientation::West => canonical.transposed_xy(),
            Orientation::East => canonical.transposed_xy().flipped_y(),
            _ => canonical.clone(),
        };

        if target.is_east_west_pair() != self.orientation.is_east_west_pair() {
            std::mem::swap(&mut self.length, &mut self.width);
        }
        self.rotation_angle = match target {
            Orientation::South => ANGLE_SOUTH,
            Orientation::East => ANGLE_EAST,
            Orientation::West => ANGLE_WEST,
            _ => ANGLE_NORTH,
        };
        self.orientation = target;
        self.kernel = kernel;
        self.origin = origins[origin_index];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDims;

    fn cuboid(l: usize, w: usize, h: usize) -> Arc<BrickTypeDef> {
        Arc::new(BrickTypeDef::standard(format!("{l}x{w}x{h}"), l, w, h).unwrap())
    }

    fn slope_2x1x2() -> Arc<BrickTypeDef> {
        Arc::new(
            BrickTypeDef::sloped(
                "2x1x2_slope",
                2,
                1,
                2,
                &[Coord::new(0, 0, 0), Coord::new(1, 0, 1)],
                &[[-1, 0, -1], [-1, 0, -1], [0, -1, -1], [0, -1, -1]],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_default_orientations() {
        assert_eq!(OrientedBrick::new(cuboid(4, 2, 1)).orientation(), Orientation::EastWest);
        assert_eq!(OrientedBrick::new(cuboid(2, 2, 1)).orientation(), Orientation::Unoriented);
        assert_eq!(OrientedBrick::new(slope_2x1x2()).orientation(), Orientation::North);
    }

    #[test]
    fn test_cuboid_round_trip() {
        let mut brick = OrientedBrick::new(cuboid(4, 2, 3));
        let kernel = brick.kernel().clone();
        let origin = brick.origin();

        brick.change_orientation(Orientation::NorthSouth).unwrap();
        assert_eq!((brick.length(), brick.width()), (2, 4));
        assert_eq!(brick.kernel().dims(), GridDims::new(2, 4, 3));
        assert_eq!(brick.rotation_angle(), ANGLE_NORTH_SOUTH);

        brick.change_orientation(Orientation::EastWest).unwrap();
        assert_eq!((brick.length(), brick.width()), (4, 2));
        assert_eq!(brick.kernel(), &kernel);
        assert_eq!(brick.origin(), origin);
        assert_eq!(brick.rotation_angle(), ANGLE_EAST_WEST);
    }

    #[test]
    fn test_cuboid_errors_are_no_ops() {
        let mut square = OrientedBrick::new(cuboid(2, 2, 1));
        assert_eq!(
            square.change_orientation(Orientation::NorthSouth),
            Err(OrientationError::Symmetric)
        );

        let mut brick = OrientedBrick::new(cuboid(3, 1, 1));
        assert_eq!(
            brick.change_orientation(Orientation::EastWest),
            Err(OrientationError::Unchanged(Orientation::EastWest))
        );
        assert_eq!(
            brick.change_orientation(Orientation::North),
            Err(OrientationError::Incompatible(Orientation::North))
        );
        assert_eq!((brick.length(), brick.width()), (3, 1));
    }

    #[test]
    fn test_sloped_orientations() {
        let mut brick = OrientedBrick::new(slope_2x1x2());
        assert!(brick.kernel().contains(Coord::new(1, 0, 1)));

        brick.change_sloped_orientation(Orientation::South).unwrap();
        assert_eq!((brick.length(), brick.width()), (2, 1));
        assert!(brick.kernel().contains(Coord::new(0, 0, 1)));
        assert_eq!(brick.rotation_angle(), ANGLE_SOUTH);

        brick.change_sloped_orientation(Orientation::West).unwrap();
        assert_eq!((brick.length(), brick.width()), (1, 2));
        assert!(brick.kernel().contains(Coord::new(0, 1, 1)));
        assert_eq!(brick.origin(), KernelOrigin::new(0, -1, -1));

        brick.change_sloped_orientation(Orientation::East).unwrap();
        assert_eq!((brick.length(), brick.width()), (1, 2));
        assert!(brick.kernel().contains(Coord::new(0, 0, 1)));
        assert_eq!(brick.rotation_angle(), ANGLE_EAST);

        brick.change_sloped_orientation(Orientation::North).unwrap();
        assert_eq!((brick.length(), brick.width()), (2, 1));
        assert_eq!(brick.kernel(), OrientedBrick::new(slope_2x1x2()).kernel());
    }

    #[test]
    fn test_sloped_rejections_are_no_ops() {
        let mut brick = OrientedBrick::new(slope_2x1x2());
        brick.change_sloped_orientation(Orientation::West).unwrap();
        let kernel = brick.kernel().clone();

        assert_eq!(
            brick.change_sloped_orientation(Orientation::West),
            Err(OrientationError::Unchanged(Orientation::West))
        );
        assert_eq!(
            brick.change_sloped_orientation(Orientation::Unoriented),
            Err(OrientationError::Incompatible(Orientation::Unoriented))
        );
        assert_eq!(
            brick.change_orientation(Orientation::NorthSouth),
            Err(OrientationError::Incompatible(Orientation::NorthSouth))
        );
        assert_eq!(brick.orientation(), Orientation::West);
        assert_eq!((brick.length(), brick.width()), (1, 2));
        assert_eq!(brick.kernel(), &kernel);
        assert_eq!(brick.origin(), KernelOrigin::new(0, -1, -1));
        assert_eq!(brick.rotation_angle(), ANGLE_WEST);
    }

    #[test]
    fn test_sloped_rejects_cuboid_target() {
        let mut brick = OrientedBrick::new(slope_2x1x2());
        assert_eq!(
            brick.reorient(Orientation::EastWest),
            Err(OrientationError::Incompatible(Orientation::EastWest))
        );
    }

    #[test]
    fn test_footprint_offsets_kernel() {
        let brick = OrientedBrick::new(cuboid(2, 1, 1));
        assert_eq!(
            brick.footprint(Coord::new(3, 4, 5)),
            vec![Coord::new(3, 4, 5), Coord::new(4, 4, 5)]
        );
    }

    #[test]
    fn test_mirrored_orientations() {
        assert_eq!(Orientation::North.mirrored(), Orientation::South);
        assert_eq!(Orientation::West.mirrored(), Orientation::East);
        assert_eq!(Orientation::EastWest.mirrored(), Orientation::EastWest);
    }
}
