//! # Brick Model
//!
//! The single owner of all mutable build state: the voxel grid, the instance
//! table, the id allocator, the presenter and the randomness source.
//!
//! ## Commit protocol
//!
//! 1. Validate the footprint against the grid (no mutation on failure)
//! 2. Write grid cells and owners
//! 3. Insert the instance and record adjacency
//! 4. Present; a presenter failure is logged and does not roll back 1-3

use brickwork_core::{BrickId, Cell, Coord, GridError, GridResult, OrientedBrick, VoxelGrid};

use crate::config::MaterialTag;
use crate::graph::{self, Partition};
use crate::instance::{BrickIdAllocator, BrickInstance, BrickTable, PlacementKind};
use crate::presenter::{NullPresenter, Placement, ScenePresenter};
use crate::random::RandomSource;

/// Running totals over the life of a model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelCounters {
    /// Bricks committed.
    pub placed: usize,
    /// Bricks removed.
    pub removed: usize,
    /// Presenter calls that failed.
    pub presenter_failures: usize,
}

/// A consistency problem found by [`BrickModel::verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// A cell has an owner but is not filled.
    OwnerWithoutFill(Coord),
    /// A cell is filled but has no owner.
    FillWithoutOwner(Coord),
    /// A cell is owned by an id that is not in the table.
    UnknownOwner {
        /// The cell.
        cell: Coord,
        /// The stale owner.
        owner: BrickId,
    },
    /// A cell is owned by an instance whose footprint does not cover it.
    OutsideFootprint {
        /// The owning instance.
        id: BrickId,
        /// The stray cell.
        cell: Coord,
    },
    /// An instance footprint cell is owned by someone else (or nobody).
    FootprintMismatch {
        /// The instance.
        id: BrickId,
        /// The disagreeing cell.
        cell: Coord,
    },
    /// An adjacency entry is not mirrored on the other side.
    AsymmetricLink {
        /// Instance holding the entry.
        from: BrickId,
        /// Referenced instance.
        to: BrickId,
    },
    /// An adjacency entry references a removed instance.
    DanglingLink {
        /// Instance holding the entry.
        from: BrickId,
        /// Missing instance.
        to: BrickId,
    },
}

/// All mutable state of one build.
pub struct BrickModel<P: ScenePresenter = NullPresenter> {
    grid: VoxelGrid,
    table: BrickTable,
    ids: BrickIdAllocator,
    presenter: P,
    rng: Box<dyn RandomSource>,
    counters: ModelCounters,
}

impl<P: ScenePresenter> BrickModel<P> {
    /// Creates a model over `grid`.
    #[must_use]
    pub fn new(grid: VoxelGrid, presenter: P, rng: Box<dyn RandomSource>) -> Self {
        Self {
            grid,
            table: BrickTable::new(),
            ids: BrickIdAllocator::new(),
            presenter,
            rng,
            counters: ModelCounters::default(),
        }
    }

    /// The voxel grid.
    #[inline]
    #[must_use]
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Live instances.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &BrickTable {
        &self.table
    }

    /// The presenter.
    #[inline]
    #[must_use]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// The build's randomness source.
    #[inline]
    pub fn rng(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    /// Running totals.
    #[inline]
    #[must_use]
    pub fn counters(&self) -> ModelCounters {
        self.counters
    }

    /// Splits the model into its grid, table and presenter.
    #[must_use]
    pub fn into_parts(self) -> (VoxelGrid, BrickTable, P) {
        (self.grid, self.table, self.presenter)
    }

    /// Commits `brick` at `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::CellUnavailable`] if any footprint cell is not
    /// empty. Nothing is mutated in that case and no id is consumed.
    /// Returns [`GridError::IdsExhausted`] once the id space is used up.
    pub fn place(
        &mut self,
        brick: &OrientedBrick,
        anchor: Coord,
        material: &MaterialTag,
        kind: PlacementKind,
    ) -> GridResult<BrickId> {
        let id = self.ids.peek().ok_or(GridError::IdsExhausted)?;
        let instance = BrickInstance::new(id, brick.clone(), anchor, material.clone(), kind);
        if instance.cells().is_empty() {
            return Err(GridError::CellUnavailable(anchor));
        }
        self.grid.occupy(instance.cells(), id)?;
        self.ids.allocate()?;

        self.table.insert(instance);
        graph::link(&self.grid, &mut self.table, id);
        self.counters.placed += 1;

        let placement = Placement {
            id,
            brick: brick.def().name(),
            anchor,
            orientation: brick.orientation(),
            rotation_angle: brick.rotation_angle(),
            material,
        };
        match self.presenter.present_placement(&placement) {
            Ok(handle) => {
                if let Some(instance) = self.table.get_mut(id) {
                    instance.handle = Some(handle);
                }
            }
            Err(e) => {
                self.counters.presenter_failures += 1;
                tracing::warn!("Presenter failed for brick {}: {}", id, e);
            }
        }

        tracing::debug!(
            "Placed {} {} at {} ({:?}, {:?})",
            brick.def().name(),
            id,
            anchor,
            brick.orientation(),
            kind
        );
        Ok(id)
    }

    /// Removes a brick: clears its cells, deletes the instance, purges every
    /// reference to it and retracts it from the presenter.
    pub fn remove(&mut self, id: BrickId) -> Option<BrickInstance> {
        let instance = self.table.remove(id)?;
        self.grid.release(id);
        graph::unlink(&mut self.table, id);
        self.counters.removed += 1;

        if let Some(handle) = instance.handle() {
            if let Err(e) = self.presenter.remove_presented(handle) {
                self.counters.presenter_failures += 1;
                tracing::warn!("Presenter failed to remove brick {}: {}", id, e);
            }
        }
        tracing::debug!("Removed {} {}", instance.brick().def().name(), id);
        Some(instance)
    }

    /// Re-tags a brick. Returns false for unknown ids.
    pub fn set_material(&mut self, id: BrickId, material: &MaterialTag) -> bool {
        let Some(instance) = self.table.get_mut(id) else {
            return false;
        };
        instance.set_material(material.clone());
        if let Some(handle) = instance.handle() {
            if let Err(e) = self.presenter.apply_material(handle, material) {
                self.counters.presenter_failures += 1;
                tracing::warn!("Presenter failed to re-tag brick {}: {}", id, e);
            }
        }
        true
    }

    /// Connected components of the current brick graph.
    #[must_use]
    pub fn components(&self) -> Partition {
        graph::components(&self.table)
    }

    /// Audits grid/table agreement and adjacency symmetry.
    ///
    /// An empty result means the model is consistent.
    #[must_use]
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (cell, owner) in self.grid.owners().iter() {
            let filled = self.grid.cell(cell) == Cell::Filled;
            match (owner, filled) {
                (Some(owner), true) => match self.table.get(*owner) {
                    None => violations.push(Violation::UnknownOwner { cell, owner: *owner }),
                    Some(instance) if !instance.cells().contains(&cell) => {
                        violations.push(Violation::OutsideFootprint { id: *owner, cell });
                    }
                    Some(_) => {}
                },
                (Some(_), false) => violations.push(Violation::OwnerWithoutFill(cell)),
                (None, true) => violations.push(Violation::FillWithoutOwner(cell)),
                (None, false) => {}
            }
        }

        for instance in self.table.iter() {
            let id = instance.id();
            for &cell in instance.cells() {
                if self.grid.owner(cell) != Some(id) {
                    violations.push(Violation::FootprintMismatch { id, cell });
                }
            }
            let relations = [
                (instance.connected(), true),
                (instance.neighbours(), false),
            ];
            for (set, vertical) in relations {
                for &other in set {
                    match self.table.get(other) {
                        None => violations.push(Violation::DanglingLink { from: id, to: other }),
                        Some(o) => {
                            let back = if vertical { o.connected() } else { o.neighbours() };
                            if !back.contains(&id) {
                                violations.push(Violation::AsymmetricLink { from: id, to: other });
                            }
                        }
                    }
                }
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::RecordingPresenter;
    use crate::random::ScriptedRandom;
    use brickwork_core::{BrickTypeDef, Grid3, GridDims};
    use std::sync::Arc;

    fn model(presenter: RecordingPresenter) -> BrickModel<RecordingPresenter> {
        let grid = VoxelGrid::from_occupancy(Grid3::filled(GridDims::new(4, 1, 2), true)).unwrap();
        BrickModel::new(grid, presenter, Box::new(ScriptedRandom::first()))
    }

    fn brick(l: usize) -> OrientedBrick {
        OrientedBrick::new(Arc::new(BrickTypeDef::standard(format!("{l}x1x1"), l, 1, 1).unwrap()))
    }

    #[test]
    fn test_place_and_remove() {
        let mut m = model(RecordingPresenter::new());
        let red = MaterialTag::new("red");
        let a = m.place(&brick(2), Coord::new(0, 0, 0), &red, PlacementKind::Structural).unwrap();
        let b = m.place(&brick(2), Coord::new(1, 0, 1), &red, PlacementKind::Structural).unwrap();

        assert_eq!(m.table().get(a).unwrap().connected().len(), 1);
        assert_eq!(m.presenter().live().len(), 2);
        assert!(m.verify().is_empty());

        m.remove(a).unwrap();
        assert!(m.table().get(b).unwrap().connected().is_empty());
        assert_eq!(m.presenter().live().len(), 1);
        assert_eq!(m.grid().count(Cell::Filled), 2);
        assert!(m.verify().is_empty());
        assert_eq!(m.counters().removed, 1);
    }

    #[test]
    fn test_rejected_placement_consumes_nothing() {
        let mut m = model(RecordingPresenter::new());
        let red = MaterialTag::new("red");
        m.place(&brick(2), Coord::new(0, 0, 0), &red, PlacementKind::Structural).unwrap();

        let err = m.place(&brick(2), Coord::new(1, 0, 0), &red, PlacementKind::Structural);
        assert!(err.is_err());
        assert_eq!(m.table().len(), 1);

        let next = m.place(&brick(2), Coord::new(2, 0, 0), &red, PlacementKind::Structural).unwrap();
        assert_eq!(next.get(), 2);
    }

    #[test]
    fn test_verify_flags_cell_outside_owner_footprint() {
        let mut m = model(RecordingPresenter::new());
        let red = MaterialTag::new("red");
        let id = m.place(&brick(2), Coord::new(0, 0, 0), &red, PlacementKind::Structural).unwrap();
        assert!(m.verify().is_empty());

        let stray = Coord::new(3, 0, 1);
        m.grid.occupy(&[stray], id).unwrap();
        assert_eq!(m.verify(), vec![Violation::OutsideFootprint { id, cell: stray }]);
    }

    #[test]
    fn test_presenter_failure_keeps_state() {
        let mut m = model(RecordingPresenter::rejecting(["2x1x1"]));
        let red = MaterialTag::new("red");
        let id = m.place(&brick(2), Coord::new(0, 0, 0), &red, PlacementKind::Structural).unwrap();

        assert!(m.table().get(id).unwrap().handle().is_none());
        assert_eq!(m.counters().presenter_failures, 1);
        assert_eq!(m.grid().owner(Coord::new(1, 0, 0)), Some(id));

        m.remove(id).unwrap();
        assert_eq!(m.counters().presenter_failures, 1);
        assert!(m.verify().is_empty());
    }

    #[test]
    fn test_set_material_reaches_presenter() {
        let mut m = model(RecordingPresenter::new());
        let id = m
            .place(&brick(1), Coord::new(0, 0, 0), &MaterialTag::new("red"), PlacementKind::Structural)
            .unwrap();
        assert!(m.set_material(id, &MaterialTag::new("black")));
        let handle = m.table().get(id).unwrap().handle().unwrap();
        assert_eq!(m.presenter().live()[&handle].material, MaterialTag::new("black"));
        assert!(!m.set_material(BrickId::from_raw(99).unwrap(), &MaterialTag::new("x")));
    }
}
