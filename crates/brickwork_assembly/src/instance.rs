//! # Brick Instances
//!
//! Placed bricks live in a central [`BrickTable`] keyed by [`BrickId`].
//! Adjacency is stored as id sets on each instance, never as references
//! between instances.
//!
//! Ids come from a [`BrickIdAllocator`] owned by the model: they start at 1,
//! increase monotonically and are never reused.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::num::NonZeroU32;

use brickwork_core::{BrickId, Coord, GridError, GridResult, OrientedBrick};

use crate::config::MaterialTag;
use crate::presenter::PresentHandle;

/// Hands out unique, increasing brick ids.
#[derive(Clone, Debug)]
pub struct BrickIdAllocator {
    next: Option<NonZeroU32>,
}

impl Default for BrickIdAllocator {
    fn default() -> Self {
        Self {
            next: Some(NonZeroU32::MIN),
        }
    }
}

impl BrickIdAllocator {
    /// Creates an allocator starting at id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next call to [`BrickIdAllocator::allocate`] returns, or
    /// `None` once the id space is used up.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<BrickId> {
        self.next.map(BrickId::new)
    }

    /// Returns a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::IdsExhausted`] after `u32::MAX` ids have been
    /// issued. Ids are never reissued.
    #[inline]
    pub fn allocate(&mut self) -> GridResult<BrickId> {
        let id = self.peek().ok_or(GridError::IdsExhausted)?;
        self.next = self.next.and_then(|n| n.checked_add(1));
        Ok(id)
    }
}

/// Which pass placed a brick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlacementKind {
    /// Sloped or smooth surface pass.
    Surface,
    /// Thick or thin structural pass.
    Structural,
    /// Dedicated pass for an excluded component.
    CarveOut,
    /// Bridge between two clusters during repair.
    Bridge,
    /// Gap fill after a repair step.
    Patch,
}

impl PlacementKind {
    /// Static bricks are avoided when repair picks bricks to remove.
    #[inline]
    #[must_use]
    pub const fn is_static(self) -> bool {
        matches!(self, Self::Surface | Self::CarveOut)
    }
}

/// A placed brick.
#[derive(Clone, Debug)]
pub struct BrickInstance {
    id: BrickId,
    brick: OrientedBrick,
    anchor: Coord,
    cells: Vec<Coord>,
    material: MaterialTag,
    kind: PlacementKind,
    pub(crate) connected: BTreeSet<BrickId>,
    pub(crate) neighbours: BTreeSet<BrickId>,
    pub(crate) handle: Option<PresentHandle>,
}

impl BrickInstance {
    /// Creates an instance with empty adjacency.
    #[must_use]
    pub fn new(
        id: BrickId,
        brick: OrientedBrick,
        anchor: Coord,
        material: MaterialTag,
        kind: PlacementKind,
    ) -> Self {
        let cells = brick.footprint(anchor);
        Self {
            id,
            brick,
            anchor,
            cells,
            material,
            kind,
            connected: BTreeSet::new(),
            neighbours: BTreeSet::new(),
            handle: None,
        }
    }

    /// Instance id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> BrickId {
        self.id
    }

    /// The oriented brick type.
    #[inline]
    #[must_use]
    pub fn brick(&self) -> &OrientedBrick {
        &self.brick
    }

    /// Minimum-corner anchor.
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Coord {
        self.anchor
    }

    /// Occupied cells, in coordinate order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    /// Lowest Z of the footprint.
    #[must_use]
    pub fn min_z(&self) -> usize {
        self.cells.iter().map(|c| c.z).min().unwrap_or(self.anchor.z)
    }

    /// Material tag.
    #[inline]
    #[must_use]
    pub fn material(&self) -> &MaterialTag {
        &self.material
    }

    pub(crate) fn set_material(&mut self, material: MaterialTag) {
        self.material = material;
    }

    /// Pass that placed the brick.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> PlacementKind {
        self.kind
    }

    /// See [`PlacementKind::is_static`].
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    /// Bricks stacked directly above or below.
    #[inline]
    #[must_use]
    pub fn connected(&self) -> &BTreeSet<BrickId> {
        &self.connected
    }

    /// Bricks touching sideways.
    #[inline]
    #[must_use]
    pub fn neighbours(&self) -> &BTreeSet<BrickId> {
        &self.neighbours
    }

    /// Presenter handle, if presentation succeeded.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<PresentHandle> {
        self.handle
    }
}

/// All live instances, iterated in id order.
#[derive(Clone, Debug, Default)]
pub struct BrickTable {
    bricks: BTreeMap<BrickId, BrickInstance>,
}

impl BrickTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an instance, replacing any previous one with the same id.
    pub fn insert(&mut self, instance: BrickInstance) {
        self.bricks.insert(instance.id, instance);
    }

    /// Removes an instance.
    pub fn remove(&mut self, id: BrickId) -> Option<BrickInstance> {
        self.bricks.remove(&id)
    }

    /// Looks up an instance.
    #[inline]
    #[must_use]
    pub fn get(&self, id: BrickId) -> Option<&BrickInstance> {
        self.bricks.get(&id)
    }

    /// Mutable lookup.
    #[inline]
    pub fn get_mut(&mut self, id: BrickId) -> Option<&mut BrickInstance> {
        self.bricks.get_mut(&id)
    }

    /// Returns true if the id is live.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: BrickId) -> bool {
        self.bricks.contains_key(&id)
    }

    /// Number of live instances.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bricks.len()
    }

    /// Returns true if no brick is placed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    /// Live instances in id order.
    #[inline]
    pub fn iter(&self) -> btree_map::Values<'_, BrickId, BrickInstance> {
        self.bricks.values()
    }

    /// Mutable iteration in id order.
    #[inline]
    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, BrickId, BrickInstance> {
        self.bricks.values_mut()
    }

    /// Live ids in order.
    pub fn ids(&self) -> impl Iterator<Item = BrickId> + '_ {
        self.bricks.keys().copied()
    }
}
