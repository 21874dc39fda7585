//! # Catalog and Search Tests
//!
//! Exercises the public API end to end: catalog loading, orientation
//! changes and placement search over real grids.

use std::sync::Arc;

use brickwork_core::search::{correlation_at, fitting_positions, OverhangFilter, SearchWindow};
use brickwork_core::{
    BrickCatalog, BrickFamily, BrickId, Coord, Grid3, GridDims, Orientation, OrientedBrick,
    VoxelGrid,
};

fn solid(x: usize, y: usize, z: usize) -> VoxelGrid {
    VoxelGrid::from_occupancy(Grid3::filled(GridDims::new(x, y, z), true)).unwrap()
}

/// Test: every builtin type survives a full orientation cycle unchanged.
#[test]
fn test_builtin_orientation_cycles() {
    let catalog = BrickCatalog::builtin();
    for def in catalog.iter() {
        let original = OrientedBrick::new(Arc::clone(def));
        let mut brick = original.clone();
        let orientations = def.allowed_orientations();
        if orientations.len() < 2 {
            continue;
        }
        for &o in orientations.iter().skip(1) {
            brick.reorient(o).unwrap();
            assert_eq!(brick.kernel().cell_count(), def.cell_count(), "{}", def.name());
        }
        brick.reorient(orientations[0]).unwrap();
        assert_eq!(brick.kernel(), original.kernel(), "{}", def.name());
        assert_eq!(brick.length(), original.length());
        assert_eq!(brick.width(), original.width());
        assert_eq!(brick.origin(), original.origin());
    }
}

/// Test: a brick larger than the grid in every orientation never fits.
#[test]
fn test_oversized_brick_never_fits() {
    let grid = solid(3, 3, 3);
    let window = SearchWindow::full(&grid);
    let def = Arc::new(brickwork_core::BrickTypeDef::standard("big", 5, 4, 1).unwrap());
    for &o in def.allowed_orientations() {
        let brick = OrientedBrick::with_orientation(Arc::clone(&def), o).unwrap();
        assert!(fitting_positions(&window, &brick, None).is_empty());
    }
}

/// Test: sloped bricks only land on the model's top surface.
#[test]
fn test_slopes_respect_overhang() {
    // A 3x1x3 staircase: column x has height x + 1.
    let occupancy = Grid3::from_fn(GridDims::new(3, 1, 3), |c| c.z <= c.x);
    let grid = VoxelGrid::from_occupancy(occupancy).unwrap();
    let catalog = BrickCatalog::builtin();
    let filter = OverhangFilter::new(grid.reference());
    let window = SearchWindow::full(&grid);

    let slope = OrientedBrick::new(Arc::clone(catalog.get("3x1x3_slope").unwrap()));
    assert_eq!(
        fitting_positions(&window, &slope, Some(&filter)),
        vec![Coord::new(0, 0, 0)]
    );

    // The mirrored slope does not match a staircase rising along +X.
    let south =
        OrientedBrick::with_orientation(Arc::clone(slope.def()), Orientation::South).unwrap();
    assert!(fitting_positions(&window, &south, Some(&filter)).is_empty());
}

/// Test: a raw match under a taller column is dropped by the filter.
#[test]
fn test_overhang_drops_buried_positions() {
    let grid = solid(2, 2, 2);
    let window = SearchWindow::full(&grid);
    let filter = OverhangFilter::new(grid.reference());
    let def = Arc::new(brickwork_core::BrickTypeDef::smooth("tile", 2, 2, 1).unwrap());
    let tile = OrientedBrick::new(def);

    let raw = fitting_positions(&window, &tile, None);
    assert_eq!(raw, vec![Coord::new(0, 0, 0), Coord::new(0, 0, 1)]);
    let kept = fitting_positions(&window, &tile, Some(&filter));
    assert_eq!(kept, vec![Coord::new(0, 0, 1)]);
}

/// Test: correlation at a negative sloped origin still sees the anchor.
#[test]
fn test_correlation_with_negative_origin() {
    let grid = solid(2, 1, 2);
    let window = SearchWindow::full(&grid);
    let catalog = BrickCatalog::builtin();
    let slope = OrientedBrick::new(Arc::clone(catalog.get("2x1x2_slope").unwrap()));
    let o = slope.origin();
    assert_eq!((o.x, o.y, o.z), (-1, 0, -1));

    // Anchor (0,0,0) corresponds to match position anchor + origin.
    let p = [o.x as isize, o.y as isize, o.z as isize];
    assert_eq!(
        correlation_at(window.values(), slope.kernel(), o, p),
        slope.kernel().cell_count()
    );
}

/// Test: occupying cells closes them for later searches.
#[test]
fn test_search_sees_placements() {
    let mut grid = solid(4, 1, 1);
    let id = BrickId::from_raw(1).unwrap();
    grid.occupy(&[Coord::new(0, 0, 0), Coord::new(1, 0, 0)], id).unwrap();

    let def = Arc::new(brickwork_core::BrickTypeDef::standard("2x1", 2, 1, 1).unwrap());
    let window = SearchWindow::band(&grid, 0..1);
    let positions = fitting_positions(&window, &OrientedBrick::new(def), None);
    assert_eq!(positions, vec![Coord::new(2, 0, 0)]);
}

/// Test: the catalog splits into the families the passes expect.
#[test]
fn test_catalog_families() {
    let catalog = BrickCatalog::builtin();
    let smooth = catalog.family(BrickFamily::Smooth);
    assert!(smooth.iter().all(|b| b.height() == 1));
    let thin = catalog.structural_pool(1);
    assert_eq!(thin.first().map(|b| b.name()), Some("16x16x1"));
    assert_eq!(thin.last().map(|b| b.name()), Some("1x1x1"));
}
