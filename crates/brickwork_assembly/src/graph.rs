//! # Connectivity Graph
//!
//! The graph is implicit: its edges are the `connected` sets of the live
//! instances in a [`BrickTable`].
//!
//! - **connected**: two bricks share a face along Z (one sits on the other)
//! - **neighbours**: two bricks share a face along X or Y
//!
//! Both relations are symmetric. Components are found by depth-first
//! traversal over `connected` only; lateral contact does not hold bricks
//! together.

use std::collections::BTreeSet;

use brickwork_core::{BrickId, VoxelGrid};

use crate::instance::BrickTable;

const FACE_OFFSETS: [(isize, isize, isize); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Records adjacency between a freshly placed brick and everything touching
/// it, in both directions.
///
/// `id` must already own its cells in `grid` and be present in `table`.
pub fn link(grid: &VoxelGrid, table: &mut BrickTable, id: BrickId) {
    let Some(instance) = table.get(id) else {
        return;
    };
    let dims = grid.dims();

    let mut vertical = BTreeSet::new();
    let mut lateral = BTreeSet::new();
    for &cell in instance.cells() {
        for (dx, dy, dz) in FACE_OFFSETS {
            let Some(next) = cell.offset(dx, dy, dz, dims) else {
                continue;
            };
            match grid.owner(next) {
                Some(other) if other != id => {
                    if dz == 0 {
                        lateral.insert(other);
                    } else {
                        vertical.insert(other);
                    }
                }
                _ => {}
            }
        }
    }

    for &other in &vertical {
        if let Some(o) = table.get_mut(other) {
            o.connected.insert(id);
        }
    }
    for &other in &lateral {
        if let Some(o) = table.get_mut(other) {
            o.neighbours.insert(id);
        }
    }
    if let Some(instance) = table.get_mut(id) {
        instance.connected.extend(vertical);
        instance.neighbours.extend(lateral);
    }
}

/// Removes every reference to `id` from every live instance.
pub fn unlink(table: &mut BrickTable, id: BrickId) {
    for instance in table.iter_mut() {
        instance.connected.remove(&id);
        instance.neighbours.remove(&id);
    }
}

/// Connected components of the `connected` relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    groups: Vec<BTreeSet<BrickId>>,
}

impl Partition {
    /// Components in discovery order (by smallest member id).
    #[inline]
    #[must_use]
    pub fn groups(&self) -> &[BTreeSet<BrickId>] {
        &self.groups
    }

    /// Number of components.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.groups.len()
    }

    /// Index of the largest component; the first one wins ties.
    #[must_use]
    pub fn largest(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, group) in self.groups.iter().enumerate() {
            if best.map_or(true, |b| group.len() > self.groups[b].len()) {
                best = Some(i);
            }
        }
        best
    }

    /// Index of the component holding `id`.
    #[must_use]
    pub fn component_of(&self, id: BrickId) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&id))
    }
}

/// Computes connected components over the live instances.
///
/// Traversal order is fixed by id order, so two calls with no intervening
/// mutation return identical partitions.
#[must_use]
pub fn components(table: &BrickTable) -> Partition {
    let mut visited = BTreeSet::new();
    let mut groups = Vec::new();

    for start in table.ids() {
        if visited.contains(&start) {
            continue;
        }
        let mut group = BTreeSet::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(id) = stack.pop() {
            group.insert(id);
            let Some(instance) = table.get(id) else {
                continue;
            };
            for &next in instance.connected() {
                if table.contains(next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        groups.push(group);
    }

    Partition { groups }
}
