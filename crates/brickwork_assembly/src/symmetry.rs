//! # Symmetry Planner
//!
//! Picks where to place a brick among its fitting positions, preferring
//! mirrored pairs about the grid's central X plane so the finished model
//! stays left/right symmetric.
//!
//! ## Rules
//!
//! 1. One candidate: take it.
//! 2. Bricks longer than half the grid's X extent are never mirrored.
//! 3. Candidates are examined in ascending Z. A candidate at `x` mirrors to
//!    `grid_x - x - length` at the same Y and Z. Cuboids need that exact
//!    position among the candidates; sloped bricks re-run the search in the
//!    mirrored facing (north/south, east/west swap).
//! 4. A mirrored pair is placed as two bricks, unless the original already
//!    straddles the centre column, in which case only the original is placed.
//! 5. Otherwise a candidate is chosen at random.

use std::collections::BTreeSet;
use std::sync::Arc;

use brickwork_core::search::{fitting_positions, OverhangFilter, SearchWindow};
use brickwork_core::{Coord, OrientedBrick};

use crate::random::RandomSource;

/// A brick and the anchor chosen for it.
#[derive(Clone, Debug)]
pub struct PlannedPlacement {
    /// The brick, in the orientation to place.
    pub brick: OrientedBrick,
    /// Minimum-corner anchor.
    pub anchor: Coord,
    /// True for the mirror half of a pair.
    pub mirrored: bool,
}

/// Chooses placements among fitting positions.
#[derive(Clone, Copy, Debug)]
pub struct SymmetryPlanner {
    grid_x: usize,
}

impl SymmetryPlanner {
    /// Planner for a grid `grid_x` cells wide.
    #[must_use]
    pub const fn new(grid_x: usize) -> Self {
        Self { grid_x }
    }

    /// X index of the centre column.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> usize {
        self.grid_x / 2
    }

    /// Returns one or two placements for `brick`, or nothing if there are no
    /// candidates.
    ///
    /// `window` and `overhang` must be the ones that produced `candidates`;
    /// they are reused to validate sloped mirrors.
    pub fn plan(
        &self,
        window: &SearchWindow,
        overhang: Option<&OverhangFilter<'_>>,
        brick: &OrientedBrick,
        candidates: &[Coord],
        rng: &mut dyn RandomSource,
    ) -> Vec<PlannedPlacement> {
        let single = |anchor: Coord| {
            vec![PlannedPlacement {
                brick: brick.clone(),
                anchor,
                mirrored: false,
            }]
        };

        match candidates {
            [] => return Vec::new(),
            [only] => return single(*only),
            _ => {}
        }

        if 2 * brick.length() <= self.grid_x {
            if let Some(pair) = self.find_pair(window, overhang, brick, candidates) {
                return pair;
            }
        }

        match rng.choose(candidates) {
            Some(&anchor) => single(anchor),
            None => Vec::new(),
        }
    }

    fn find_pair(
        &self,
        window: &SearchWindow,
        overhang: Option<&OverhangFilter<'_>>,
        brick: &OrientedBrick,
        candidates: &[Coord],
    ) -> Option<Vec<PlannedPlacement>> {
        let mut ordered = candidates.to_vec();
        ordered.sort_by_key(|c| c.z);

        let (mirror_brick, mirror_fits): (OrientedBrick, BTreeSet<Coord>) =
            if brick.def().is_sloped() {
                let mirrored = OrientedBrick::with_orientation(
                    Arc::clone(brick.def()),
                    brick.orientation().mirrored(),
                )
                .ok()?;
                let fits = fitting_positions(window, &mirrored, overhang).into_iter().collect();
                (mirrored, fits)
            } else {
                (brick.clone(), candidates.iter().copied().collect())
            };

        for anchor in ordered {
            let Some(mirror_x) = self.grid_x.checked_sub(anchor.x + brick.length()) else {
                continue;
            };
            let mirror = Coord::new(mirror_x, anchor.y, anchor.z);
            if !mirror_fits.contains(&mirror) {
                continue;
            }

            let original = PlannedPlacement {
                brick: brick.clone(),
                anchor,
                mirrored: false,
            };
            if (anchor.x..anchor.x + brick.length()).contains(&self.center()) {
                return Some(vec![original]);
            }
            return Some(vec![
                original,
                PlannedPlacement {
                    brick: mirror_brick,
                    anchor: mirror,
                    mirrored: true,
                },
            ]);
        }
        None
    }
}
