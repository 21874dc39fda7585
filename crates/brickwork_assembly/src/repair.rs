//! # Connectivity Repair
//!
//! Merges disconnected brick clusters until the model is one component or
//! no further progress is possible.
//!
//! ## Loop
//!
//! 1. Partition the brick graph. One component: done.
//! 2. Too many iterations without a new best component count: give up.
//! 3. Pick a brick from a minor component that has lateral neighbours,
//!    preferring non-static bricks, and its lowest neighbour.
//! 4. Remove both, then fill the region between them with bridge bricks
//!    that overlap both old footprints.
//! 5. Patch remaining gaps with a thick + thin band fill.
//! 6. Keep the step only if a bridge was placed, every removed cell is
//!    covered again and the component count dropped. Otherwise restore the
//!    removed pair. Go to 1.
//!
//! Termination is guaranteed: an accepted iteration lowers the component
//! count, a rolled-back one advances the stall counter.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use brickwork_core::search::{fitting_positions, SearchWindow};
use brickwork_core::{
    BrickCatalog, BrickId, BrickTypeDef, ComponentId, Coord, GridDims, OrientedBrick, VoxelGrid,
};

use crate::config::{BuildConfig, MaterialTag};
use crate::graph::Partition;
use crate::instance::{BrickInstance, PlacementKind};
use crate::model::BrickModel;
use crate::presenter::ScenePresenter;
use crate::scheduler::{LayerScheduler, PassSpec};

/// Terminal state of a repair run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Every brick belongs to one component.
    AllConnected,
    /// Repair stalled or ran out of candidates.
    GaveUp {
        /// The minority component left disconnected.
        component: BTreeSet<BrickId>,
    },
}

impl RepairOutcome {
    /// Returns true for [`RepairOutcome::AllConnected`].
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::AllConnected)
    }
}

/// Summary of one repair run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairReport {
    /// How the run ended.
    pub outcome: RepairOutcome,
    /// Remove-and-bridge iterations performed.
    pub iterations: usize,
    /// Bricks removed by accepted iterations.
    pub removed: usize,
    /// Bridge bricks placed by accepted iterations.
    pub bridges: usize,
    /// Bricks placed by the patch fills of accepted iterations.
    pub patched: usize,
    /// Iterations undone because they did not merge components without
    /// losing coverage.
    pub rolled_back: usize,
}

/// The repair state machine and its brick pools.
#[derive(Clone, Debug)]
pub struct ConnectivityRepair {
    scheduler: LayerScheduler,
    thick: Vec<Arc<BrickTypeDef>>,
    thin: Vec<Arc<BrickTypeDef>>,
    thick_band: usize,
    thin_band: usize,
    stall_limit: usize,
    materials: BTreeMap<ComponentId, MaterialTag>,
    default_material: MaterialTag,
}

impl ConnectivityRepair {
    /// Repair using the structural pools of `catalog`.
    #[must_use]
    pub fn new(catalog: &BrickCatalog, config: &BuildConfig, scheduler: LayerScheduler) -> Self {
        Self {
            scheduler,
            thick: catalog.structural_pool(config.thick_band),
            thin: catalog.structural_pool(config.thin_band),
            thick_band: config.thick_band,
            thin_band: config.thin_band,
            stall_limit: config.stall_limit,
            materials: config.material_map(),
            default_material: config.default_material.clone(),
        }
    }

    /// Runs until every brick is connected or repair gives up.
    pub fn run<P: ScenePresenter>(&self, model: &mut BrickModel<P>) -> RepairReport {
        let mut iterations = 0;
        let mut removed = 0;
        let mut bridges = 0;
        let mut patched = 0;
        let mut rolled_back = 0;
        let mut best = usize::MAX;
        let mut stalled = 0;

        let outcome = loop {
            let partition = model.components();
            let Some(main) = partition.largest() else {
                break RepairOutcome::AllConnected;
            };
            if partition.count() == 1 {
                break RepairOutcome::AllConnected;
            }

            if partition.count() < best {
                best = partition.count();
                stalled = 0;
            } else {
                stalled += 1;
                if stalled > self.stall_limit {
                    tracing::warn!(
                        "Connectivity repair stalled at {} components after {} iterations",
                        partition.count(),
                        iterations
                    );
                    break minority(&partition, main);
                }
            }

            let Some((first, second)) = select_pair(model, &partition, main) else {
                tracing::warn!("No disconnected brick has a lateral neighbour");
                break minority(&partition, main);
            };
            iterations += 1;

            let before: BTreeSet<BrickId> = model.table().ids().collect();
            let material = self.material_for(model, [first, second]);
            let originals = [model.remove(first), model.remove(second)];
            let first_cells = footprint(originals[0].as_ref());
            let second_cells = footprint(originals[1].as_ref());
            tracing::debug!(
                "Repair iteration {}: replacing {} and {} ({} components)",
                iterations,
                first,
                second,
                partition.count()
            );

            let region = bridge_region(&first_cells, &second_cells);
            let step_bridges = match bounding_box(&region) {
                Some((min, size)) => {
                    self.bridge(model, &first_cells, &second_cells, min, size, &material)
                }
                None => 0,
            };

            let thick = PassSpec {
                pool: &self.thick,
                material: &material,
                kind: PlacementKind::Patch,
            };
            let thin = PassSpec {
                pool: &self.thin,
                ..thick
            };
            let step_patched = self.scheduler.fill_bands(model, self.thick_band, &thick).placed
                + self.scheduler.fill_bands(model, self.thin_band, &thin).placed;

            let uncovered = first_cells
                .iter()
                .chain(&second_cells)
                .filter(|&&c| model.grid().is_empty(c))
                .count();
            let merged = model.components().count() < partition.count();
            if step_bridges == 0 || uncovered > 0 || !merged {
                tracing::debug!(
                    "Repair iteration {} rolled back: {} bridges, {} cells uncovered",
                    iterations,
                    step_bridges,
                    uncovered
                );
                roll_back(model, &before, originals);
                rolled_back += 1;
            } else {
                removed += 2;
                bridges += step_bridges;
                patched += step_patched;
            }
        };

        tracing::info!(
            "Connectivity repair finished after {} iterations: {} bridges, {} removed",
            iterations,
            bridges,
            removed
        );
        RepairReport {
            outcome,
            iterations,
            removed,
            bridges,
            patched,
            rolled_back,
        }
    }

    /// Material of the first removed cell that lies in a configured
    /// component, else the default.
    fn material_for<P: ScenePresenter>(
        &self,
        model: &BrickModel<P>,
        ids: [BrickId; 2],
    ) -> MaterialTag {
        let grid = model.grid();
        ids.iter()
            .filter_map(|&id| model.table().get(id))
            .flat_map(BrickInstance::cells)
            .find_map(|&c| self.materials.get(&grid.component(c)))
            .cloned()
            .unwrap_or_else(|| self.default_material.clone())
    }

    /// Places bridge bricks inside the box until none overlaps both old
    /// footprints. Returns the number placed.
    fn bridge<P: ScenePresenter>(
        &self,
        model: &mut BrickModel<P>,
        first: &BTreeSet<Coord>,
        second: &BTreeSet<Coord>,
        min: Coord,
        size: GridDims,
        material: &MaterialTag,
    ) -> usize {
        let grid: &VoxelGrid = model.grid();
        let mut window = SearchWindow::from_fn(min, size, |c| grid.is_empty(c));
        if window.open_count() == 0 {
            return 0;
        }

        let mut queue = if size.z == self.thick_band {
            self.thick.clone()
        } else {
            self.thin.clone()
        };
        queue.reverse();

        let mut placed = 0;
        while let Some(def) = queue.last().cloned() {
            let Some((brick, anchor)) = best_bridge(&window, &def, first, second) else {
                queue.pop();
                continue;
            };
            match model.place(&brick, anchor, material, PlacementKind::Bridge) {
                Ok(id) => {
                    tracing::debug!("Bridge {} placed as {} at {}", def.name(), id, anchor);
                    window.mark_filled(&brick.footprint(anchor));
                    placed += 1;
                }
                Err(e) => {
                    tracing::debug!("Bridge {} rejected: {}", def.name(), e);
                    queue.pop();
                }
            }
        }
        placed
    }
}

fn footprint(instance: Option<&BrickInstance>) -> BTreeSet<Coord> {
    instance
        .map(|b| b.cells().iter().copied().collect())
        .unwrap_or_default()
}

/// Undoes one iteration: removes every brick placed since `before` was
/// taken and puts the removed pair back where it was.
fn roll_back<P: ScenePresenter>(
    model: &mut BrickModel<P>,
    before: &BTreeSet<BrickId>,
    originals: [Option<BrickInstance>; 2],
) {
    let added: Vec<BrickId> = model.table().ids().filter(|id| !before.contains(id)).collect();
    for id in added {
        model.remove(id);
    }
    for original in originals.into_iter().flatten() {
        let restored = model.place(
            original.brick(),
            original.anchor(),
            original.material(),
            original.kind(),
        );
        if let Err(e) = restored {
            tracing::warn!("Could not restore brick {}: {}", original.id(), e);
        }
    }
}

fn minority(partition: &Partition, main: usize) -> RepairOutcome {
    let component = partition
        .groups()
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != main)
        .map(|(_, g)| g)
        .min_by_key(|g| g.len())
        .cloned()
        .unwrap_or_default();
    RepairOutcome::GaveUp { component }
}

/// Chooses the brick to dissolve and the neighbour to dissolve with it.
fn select_pair<P: ScenePresenter>(
    model: &mut BrickModel<P>,
    partition: &Partition,
    main: usize,
) -> Option<(BrickId, BrickId)> {
    let table = model.table();
    let has_neighbours =
        |id: BrickId| table.get(id).is_some_and(|b| !b.neighbours().is_empty());
    let movable =
        |id: BrickId| has_neighbours(id) && table.get(id).is_some_and(|b| !b.is_static());

    let minors: Vec<&BTreeSet<BrickId>> = partition
        .groups()
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != main)
        .map(|(_, g)| g)
        .collect();
    let preferred: Vec<Vec<BrickId>> = minors
        .iter()
        .map(|g| g.iter().copied().filter(|&id| movable(id)).collect::<Vec<_>>())
        .filter(|ids| !ids.is_empty())
        .collect();
    let fallback: Vec<BrickId> = minors
        .iter()
        .flat_map(|g| g.iter().copied())
        .filter(|&id| has_neighbours(id))
        .collect();

    let rng = model.rng();
    let brick = match rng.choose(&preferred) {
        Some(group) => *rng.choose(group)?,
        None => *rng.choose(&fallback)?,
    };

    let table = model.table();
    let live: Vec<&BrickInstance> = table
        .get(brick)?
        .neighbours()
        .iter()
        .filter_map(|&n| table.get(n))
        .collect();
    let dynamic: Vec<&BrickInstance> = live.iter().copied().filter(|b| !b.is_static()).collect();
    let pool = if dynamic.is_empty() { live } else { dynamic };

    let lowest = pool.iter().map(|b| b.min_z()).min()?;
    let ties: Vec<BrickId> = pool
        .iter()
        .filter(|b| b.min_z() == lowest)
        .map(|b| b.id())
        .collect();
    let neighbour = *model.rng().choose(&ties)?;
    Some((brick, neighbour))
}

/// Cells of both footprints that line up with a cell of the other one along
/// X or Y at the same height.
#[must_use]
pub fn bridge_region(first: &BTreeSet<Coord>, second: &BTreeSet<Coord>) -> BTreeSet<Coord> {
    let mut region = BTreeSet::new();
    for d in first {
        for n in second {
            if d.z != n.z {
                continue;
            }
            if d.x == n.x {
                region.extend(first.iter().filter(|c| c.x == d.x && c.z == d.z));
                region.extend(second.iter().filter(|c| c.x == n.x && c.z == n.z));
            } else if d.y == n.y {
                region.extend(first.iter().filter(|c| c.y == d.y && c.z == d.z));
                region.extend(second.iter().filter(|c| c.y == n.y && c.z == n.z));
            }
        }
    }
    region
}

/// Minimum corner and extents of the smallest box holding `cells`.
#[must_use]
pub fn bounding_box(cells: &BTreeSet<Coord>) -> Option<(Coord, GridDims)> {
    let first = *cells.iter().next()?;
    let (lo, hi) = cells.iter().fold((first, first), |(lo, hi), c| {
        (
            Coord::new(lo.x.min(c.x), lo.y.min(c.y), lo.z.min(c.z)),
            Coord::new(hi.x.max(c.x), hi.y.max(c.y), hi.z.max(c.z)),
        )
    });
    Some((
        lo,
        GridDims::new(hi.x - lo.x + 1, hi.y - lo.y + 1, hi.z - lo.z + 1),
    ))
}

/// Best bridge position for one type: the first orientation with an
/// eligible position, scored by (first coverage, second coverage).
fn best_bridge(
    window: &SearchWindow,
    def: &Arc<BrickTypeDef>,
    first: &BTreeSet<Coord>,
    second: &BTreeSet<Coord>,
) -> Option<(OrientedBrick, Coord)> {
    for &orientation in def.allowed_orientations() {
        let Ok(brick) = OrientedBrick::with_orientation(Arc::clone(def), orientation) else {
            continue;
        };
        let mut best: Option<((usize, usize), Coord)> = None;
        for anchor in fitting_positions(window, &brick, None) {
            let cells = brick.footprint(anchor);
            let score = (
                cells.iter().filter(|c| first.contains(c)).count(),
                cells.iter().filter(|c| second.contains(c)).count(),
            );
            if score.0 == 0 || score.1 == 0 {
                continue;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, anchor));
            }
        }
        if let Some((_, anchor)) = best {
            return Some((brick, anchor));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::NullPresenter;
    use crate::random::ScriptedRandom;
    use brickwork_core::{Cell, Grid3};

    fn cells(list: &[(usize, usize, usize)]) -> BTreeSet<Coord> {
        list.iter().map(|&(x, y, z)| Coord::new(x, y, z)).collect()
    }

    fn setup(dims: GridDims, names: &[(usize, usize)]) -> (BrickModel, BrickCatalog) {
        let grid = VoxelGrid::from_occupancy(Grid3::filled(dims, true)).unwrap();
        let catalog = BrickCatalog::new(
            names
                .iter()
                .map(|&(l, w)| BrickTypeDef::standard(format!("{l}x{w}x1"), l, w, 1).unwrap()),
        )
        .unwrap();
        let model = BrickModel::new(grid, NullPresenter::default(), scripted());
        (model, catalog)
    }

    fn scripted() -> Box<ScriptedRandom> {
        Box::new(ScriptedRandom::first())
    }

    fn place(
        model: &mut BrickModel,
        catalog: &BrickCatalog,
        name: &str,
        at: (usize, usize, usize),
    ) -> BrickId {
        let brick = OrientedBrick::new(Arc::clone(catalog.get(name).unwrap()));
        model
            .place(
                &brick,
                Coord::new(at.0, at.1, at.2),
                &MaterialTag::default(),
                PlacementKind::Structural,
            )
            .unwrap()
    }

    #[test]
    fn test_bridge_region_along_row() {
        let first = cells(&[(2, 0, 0), (3, 0, 0)]);
        let second = cells(&[(0, 0, 0), (1, 0, 0)]);
        let region = bridge_region(&first, &second);
        assert_eq!(region.len(), 4);
        assert_eq!(
            bounding_box(&region),
            Some((Coord::new(0, 0, 0), GridDims::new(4, 1, 1)))
        );
    }

    #[test]
    fn test_bridge_region_needs_alignment() {
        let first = cells(&[(0, 0, 0)]);
        let second = cells(&[(1, 1, 0), (1, 1, 1)]);
        assert!(bridge_region(&first, &second).is_empty());
        assert_eq!(bounding_box(&BTreeSet::new()), None);
    }

    #[test]
    fn test_split_layer_is_bridged() {
        // Two towers of two 2x1 bricks side by side.
        let (mut model, catalog) = setup(GridDims::new(4, 1, 2), &[(2, 1), (1, 1)]);
        place(&mut model, &catalog, "2x1x1", (0, 0, 0));
        place(&mut model, &catalog, "2x1x1", (2, 0, 0));
        place(&mut model, &catalog, "2x1x1", (0, 0, 1));
        place(&mut model, &catalog, "2x1x1", (2, 0, 1));
        assert_eq!(model.components().count(), 2);

        let config = BuildConfig::default();
        let repair = ConnectivityRepair::new(&catalog, &config, LayerScheduler::new(4, false));
        let report = repair.run(&mut model);

        assert_eq!(report.outcome, RepairOutcome::AllConnected);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.bridges, 1);
        assert_eq!(report.removed, 2);
        assert_eq!(report.rolled_back, 0);
        let bridge = model
            .table()
            .iter()
            .find(|b| b.kind() == PlacementKind::Bridge)
            .unwrap();
        assert_eq!(bridge.anchor(), Coord::new(1, 0, 0));
        assert_eq!(model.grid().count(Cell::Empty), 0);
        assert!(model.verify().is_empty());
    }

    #[test]
    fn test_stall_gives_up_with_minority() {
        // A single layer can never be joined vertically.
        let (mut model, catalog) = setup(GridDims::new(2, 1, 1), &[(1, 1)]);
        place(&mut model, &catalog, "1x1x1", (0, 0, 0));
        place(&mut model, &catalog, "1x1x1", (1, 0, 0));

        let config = BuildConfig {
            stall_limit: 3,
            ..BuildConfig::default()
        };
        let repair = ConnectivityRepair::new(&catalog, &config, LayerScheduler::new(2, false));
        let report = repair.run(&mut model);

        match report.outcome {
            RepairOutcome::GaveUp { component } => assert_eq!(component.len(), 1),
            RepairOutcome::AllConnected => panic!("single layer cannot connect"),
        }
        assert_eq!(report.iterations, 4);
        assert_eq!(report.rolled_back, 4);
        assert_eq!(report.bridges, 0);
        assert_eq!(report.removed, 0);
        assert_eq!(model.table().len(), 2);
        assert_eq!(model.grid().count(Cell::Empty), 0);
        assert!(model.verify().is_empty());
    }

    #[test]
    fn test_uncovered_step_is_rolled_back() {
        // Four 2x2 tiles on one layer: a 2x2 bridge always leaves two
        // 1-wide columns that no catalog brick can patch.
        let (mut model, catalog) = setup(GridDims::new(4, 4, 1), &[(2, 2)]);
        for at in [(0, 0, 0), (2, 0, 0), (0, 2, 0), (2, 2, 0)] {
            place(&mut model, &catalog, "2x2x1", at);
        }
        let before: BTreeSet<Coord> = model.table().iter().map(|b| b.anchor()).collect();

        let config = BuildConfig {
            stall_limit: 3,
            ..BuildConfig::default()
        };
        let repair = ConnectivityRepair::new(&catalog, &config, LayerScheduler::new(4, false));
        let report = repair.run(&mut model);

        assert!(matches!(report.outcome, RepairOutcome::GaveUp { .. }));
        assert_eq!(report.iterations, 4);
        assert_eq!(report.rolled_back, report.iterations);
        assert_eq!(report.removed, 0);
        assert_eq!(report.bridges, 0);
        assert_eq!(model.components().count(), 4);
        assert_eq!(model.grid().count(Cell::Empty), 0);
        let after: BTreeSet<Coord> = model.table().iter().map(|b| b.anchor()).collect();
        assert_eq!(after, before);
        assert!(model.verify().is_empty());
    }

    #[test]
    fn test_isolated_clusters_give_up_immediately() {
        // Columns at x = 0 and x = 2 with no model cells between them.
        let occupancy = Grid3::from_fn(GridDims::new(3, 1, 2), |c| c.x != 1);
        let grid = VoxelGrid::from_occupancy(occupancy).unwrap();
        let catalog =
            BrickCatalog::new([BrickTypeDef::standard("1x1x1", 1, 1, 1).unwrap()]).unwrap();
        let mut model = BrickModel::new(grid, NullPresenter::default(), scripted());
        for at in [(0, 0, 0), (0, 0, 1), (2, 0, 0), (2, 0, 1)] {
            place(&mut model, &catalog, "1x1x1", at);
        }

        let config = BuildConfig::default();
        let repair = ConnectivityRepair::new(&catalog, &config, LayerScheduler::new(3, false));
        let report = repair.run(&mut model);
        assert!(matches!(
            report.outcome,
            RepairOutcome::GaveUp { ref component } if component.len() == 2
        ));
        assert_eq!(report.iterations, 0);
        assert_eq!(model.table().len(), 4);
    }

    #[test]
    fn test_non_static_neighbour_is_preferred() {
        let (mut model, catalog) = setup(GridDims::new(3, 1, 1), &[(1, 1)]);
        let left = model
            .place(
                &OrientedBrick::new(Arc::clone(catalog.get("1x1x1").unwrap())),
                Coord::new(0, 0, 0),
                &MaterialTag::default(),
                PlacementKind::Surface,
            )
            .unwrap();
        let middle = place(&mut model, &catalog, "1x1x1", (1, 0, 0));
        let right = place(&mut model, &catalog, "1x1x1", (2, 0, 0));

        let partition = model.components();
        let main = partition.component_of(left).unwrap();
        let (brick, neighbour) = select_pair(&mut model, &partition, main).unwrap();
        assert_eq!(brick, middle);
        assert_eq!(neighbour, right);
    }
}
