//! # Layer Scheduler
//!
//! Drives greedy filling. A pass works over a [`SearchWindow`] and a pool of
//! brick types:
//!
//! ```text
//! queue = pool, largest first
//! while queue not empty:
//!     for each allowed orientation (starting one first):
//!         candidates = fitting_positions(window, brick)
//!         if candidates: shuffle, plan symmetric placements, commit, retry type
//!     if no orientation fit: evict type
//! ```
//!
//! Band passes slice the grid into horizontal slabs processed bottom to top.
//! Full passes (surface and carve-out) use one window over the whole grid.

use std::ops::AddAssign;
use std::sync::Arc;

use brickwork_core::search::{fitting_positions, OverhangFilter, SearchWindow};
use brickwork_core::{sort_largest_first, BrickTypeDef, Orientation, OrientedBrick};

use crate::config::MaterialTag;
use crate::instance::PlacementKind;
use crate::model::BrickModel;
use crate::presenter::ScenePresenter;
use crate::symmetry::SymmetryPlanner;

/// Placement totals of one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Bricks committed.
    pub placed: usize,
    /// Of which were mirror halves.
    pub mirrored: usize,
    /// Brick types dropped from a working pool.
    pub evicted: usize,
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, other: Self) {
        self.placed += other.placed;
        self.mirrored += other.mirrored;
        self.evicted += other.evicted;
    }
}

/// What a pass places and how it tags the result.
#[derive(Clone, Copy, Debug)]
pub struct PassSpec<'a> {
    /// Brick types to use. Ordered largest first by the scheduler.
    pub pool: &'a [Arc<BrickTypeDef>],
    /// Material for every brick of the pass.
    pub material: &'a MaterialTag,
    /// Role recorded on every brick of the pass.
    pub kind: PlacementKind,
}

/// Greedy band and full-grid filling.
#[derive(Clone, Copy, Debug)]
pub struct LayerScheduler {
    planner: SymmetryPlanner,
    alternate_orientations: bool,
}

impl LayerScheduler {
    /// Scheduler for a grid `grid_x` cells wide.
    #[must_use]
    pub const fn new(grid_x: usize, alternate_orientations: bool) -> Self {
        Self {
            planner: SymmetryPlanner::new(grid_x),
            alternate_orientations,
        }
    }

    /// The symmetry planner used for every placement.
    #[inline]
    #[must_use]
    pub const fn planner(&self) -> &SymmetryPlanner {
        &self.planner
    }

    /// Fills the grid band by band, bottom to top. Each band is filled to
    /// completion before the next is snapshotted.
    ///
    /// The overhang filter is off for band passes.
    pub fn fill_bands<P: ScenePresenter>(
        &self,
        model: &mut BrickModel<P>,
        thickness: usize,
        pass: &PassSpec<'_>,
    ) -> PassStats {
        let depth = model.grid().dims().z;
        let mut stats = PassStats::default();
        if thickness == 0 {
            return stats;
        }

        for (band, z) in (0..depth).step_by(thickness).enumerate() {
            let mut window = SearchWindow::band(model.grid(), z..(z + thickness).min(depth));
            if window.open_count() == 0 {
                continue;
            }
            let start = if self.alternate_orientations && band % 2 == 1 {
                Orientation::NorthSouth
            } else {
                Orientation::EastWest
            };
            stats += self.fill_window(model, &mut window, pass, start, None);
        }
        stats
    }

    /// Fills the whole grid in one window.
    ///
    /// With `overhang` set, positions that would cap a column of the
    /// original model are rejected.
    pub fn fill_full<P: ScenePresenter>(
        &self,
        model: &mut BrickModel<P>,
        pass: &PassSpec<'_>,
        overhang: bool,
    ) -> PassStats {
        let mut window = SearchWindow::full(model.grid());
        if !overhang {
            return self.fill_window(model, &mut window, pass, Orientation::EastWest, None);
        }
        let reference = model.grid().reference().clone();
        let filter = OverhangFilter::new(&reference);
        self.fill_window(model, &mut window, pass, Orientation::EastWest, Some(&filter))
    }

    /// Greedy largest-first fill of one window.
    ///
    /// The window must mirror the grid's emptiness; it is narrowed after each
    /// commit.
    pub fn fill_window<P: ScenePresenter>(
        &self,
        model: &mut BrickModel<P>,
        window: &mut SearchWindow,
        pass: &PassSpec<'_>,
        start: Orientation,
        overhang: Option<&OverhangFilter<'_>>,
    ) -> PassStats {
        let mut queue = pass.pool.to_vec();
        sort_largest_first(&mut queue);
        queue.reverse();

        let mut stats = PassStats::default();
        while let Some(def) = queue.last().cloned() {
            let round = self.place_type(model, window, &def, pass, start, overhang);
            if round.placed == 0 {
                tracing::debug!("Evicted {} from {:?} pass", def.name(), pass.kind);
                stats.evicted += 1;
                queue.pop();
            } else {
                stats += round;
            }
        }
        stats
    }

    /// One round for one brick type: the first orientation with candidates
    /// wins. Returns zero placements when nothing fits.
    fn place_type<P: ScenePresenter>(
        &self,
        model: &mut BrickModel<P>,
        window: &mut SearchWindow,
        def: &Arc<BrickTypeDef>,
        pass: &PassSpec<'_>,
        start: Orientation,
        overhang: Option<&OverhangFilter<'_>>,
    ) -> PassStats {
        let mut stats = PassStats::default();

        for orientation in orientation_order(def, start) {
            let brick = match OrientedBrick::with_orientation(Arc::clone(def), orientation) {
                Ok(brick) => brick,
                Err(e) => {
                    tracing::warn!("Skipping {} {:?}: {}", def.name(), orientation, e);
                    continue;
                }
            };

            let mut candidates = fitting_positions(window, &brick, overhang);
            if candidates.is_empty() {
                continue;
            }
            model.rng().shuffle(&mut candidates);

            let plan = self
                .planner
                .plan(window, overhang, &brick, &candidates, model.rng());
            for placement in plan {
                match model.place(&placement.brick, placement.anchor, pass.material, pass.kind) {
                    Ok(_) => {
                        window.mark_filled(&placement.brick.footprint(placement.anchor));
                        stats.placed += 1;
                        if placement.mirrored {
                            stats.mirrored += 1;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Mirror of {} skipped: {}", def.name(), e);
                    }
                }
            }
            return stats;
        }
        stats
    }
}

/// Allowed orientations of `def`, with `start` moved to the front when it
/// applies.
fn orientation_order(def: &BrickTypeDef, start: Orientation) -> Vec<Orientation> {
    let mut order = def.allowed_orientations().to_vec();
    if let Some(i) = order.iter().position(|&o| o == start) {
        order[..=i].rotate_right(1);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::NullPresenter;
    use crate::random::{ScriptedRandom, SeededRandom};
    use brickwork_core::{Cell, Coord, Grid3, GridDims, VoxelGrid};

    fn model(dims: GridDims) -> BrickModel {
        let grid = VoxelGrid::from_occupancy(Grid3::filled(dims, true)).unwrap();
        BrickModel::new(grid, NullPresenter::default(), Box::new(SeededRandom::new(7)))
    }

    fn def(l: usize, w: usize, h: usize) -> Arc<BrickTypeDef> {
        Arc::new(BrickTypeDef::standard(format!("{l}x{w}x{h}"), l, w, h).unwrap())
    }

    #[test]
    fn test_orientation_order() {
        let long = def(4, 2, 1);
        assert_eq!(
            orientation_order(&long, Orientation::NorthSouth),
            vec![Orientation::NorthSouth, Orientation::EastWest]
        );
        assert_eq!(
            orientation_order(&long, Orientation::EastWest),
            vec![Orientation::EastWest, Orientation::NorthSouth]
        );
        assert_eq!(
            orientation_order(&def(2, 2, 1), Orientation::NorthSouth),
            vec![Orientation::Unoriented]
        );
    }

    #[test]
    fn test_band_fill_covers_grid() {
        let mut m = model(GridDims::new(4, 3, 2));
        let pool = [def(2, 1, 1), def(1, 1, 1)];
        let material = MaterialTag::default();
        let pass = PassSpec {
            pool: &pool,
            material: &material,
            kind: PlacementKind::Structural,
        };

        let stats = LayerScheduler::new(4, false).fill_bands(&mut m, 1, &pass);
        assert_eq!(m.grid().count(Cell::Empty), 0);
        assert_eq!(stats.placed, m.table().len());
        assert!(m.verify().is_empty());
    }

    #[test]
    fn test_oversized_type_is_evicted() {
        let mut m = model(GridDims::new(3, 3, 1));
        let pool = [def(4, 4, 1)];
        let material = MaterialTag::default();
        let pass = PassSpec {
            pool: &pool,
            material: &material,
            kind: PlacementKind::Structural,
        };

        let stats = LayerScheduler::new(3, false).fill_bands(&mut m, 1, &pass);
        assert_eq!(stats, PassStats { placed: 0, mirrored: 0, evicted: 1 });
        assert!(m.table().is_empty());
    }

    #[test]
    fn test_rotation_is_tried_before_eviction() {
        // A 1-wide, 3-deep grid only takes the 3x1 brick lying north-south.
        let mut m = model(GridDims::new(1, 3, 1));
        let pool = [def(3, 1, 1)];
        let material = MaterialTag::default();
        let pass = PassSpec {
            pool: &pool,
            material: &material,
            kind: PlacementKind::Structural,
        };

        let stats = LayerScheduler::new(1, false).fill_bands(&mut m, 1, &pass);
        assert_eq!(stats.placed, 1);
        let brick = m.table().iter().next().unwrap();
        assert_eq!(brick.brick().orientation(), Orientation::NorthSouth);
        assert_eq!(brick.anchor(), Coord::new(0, 0, 0));
    }

    #[test]
    fn test_thick_band_skips_short_top_band() {
        let mut m = model(GridDims::new(2, 1, 4));
        let pool = [def(1, 1, 3)];
        let material = MaterialTag::default();
        let pass = PassSpec {
            pool: &pool,
            material: &material,
            kind: PlacementKind::Structural,
        };

        let stats = LayerScheduler::new(2, false).fill_bands(&mut m, 3, &pass);
        assert_eq!(stats.placed, 2);
        assert_eq!(m.grid().count(Cell::Empty), 2);
        assert!(m.table().iter().all(|b| b.anchor().z == 0));
    }

    #[test]
    fn test_full_pass_mirrors_pairs() {
        let grid = VoxelGrid::from_occupancy(Grid3::filled(GridDims::new(6, 1, 1), true)).unwrap();
        let rng = Box::new(ScriptedRandom::first());
        let mut m = BrickModel::new(grid, NullPresenter::default(), rng);
        let pool = [def(1, 1, 1), def(2, 1, 1)];
        let material = MaterialTag::default();
        let pass = PassSpec {
            pool: &pool,
            material: &material,
            kind: PlacementKind::Surface,
        };

        // The first shuffled candidate is x = 1, mirrored to x = 3; the
        // single cells left at the edges pair up as well.
        let stats = LayerScheduler::new(6, false).fill_full(&mut m, &pass, false);
        assert_eq!(stats, PassStats { placed: 4, mirrored: 2, evicted: 2 });
        assert!(m.table().iter().all(|b| b.is_static()));
        assert_eq!(m.grid().count(Cell::Empty), 0);
    }
}
