//! # Build Pipeline
//!
//! Runs every stage of a build over one [`BrickModel`]:
//!
//! | Stage     | Window          | Pool               | Overhang | Kind           |
//! |-----------|-----------------|--------------------|----------|----------------|
//! | sloped    | full grid       | sloped family      | on       | Surface        |
//! | smooth    | full grid       | smooth family      | on       | Surface        |
//! | thick     | 3-high bands    | height-3 standard  | off      | Structural     |
//! | thin      | 1-high bands    | height-1 standard  | off      | Structural     |
//! | carve-out | full grid/group | thick, then thin   | off      | CarveOut       |
//! | repair    | bridge box, bands | thick, then thin | off      | Bridge, Patch  |
//!
//! After repair, bricks lying entirely inside one configured component are
//! re-tagged with that component's material.

use std::time::Instant;

use brickwork_core::{BrickCatalog, BrickFamily, ComponentId, Grid3, VoxelGrid};

use crate::config::{BuildConfig, MaterialTag};
use crate::error::AssemblyResult;
use crate::instance::PlacementKind;
use crate::model::{BrickModel, ModelCounters};
use crate::presenter::ScenePresenter;
use crate::random::{RandomSource, SeededRandom};
use crate::repair::{ConnectivityRepair, RepairReport};
use crate::scheduler::{LayerScheduler, PassSpec, PassStats};

/// Wall-clock time spent in each stage, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Sloped and smooth passes.
    pub surface_us: u64,
    /// Thick band pass.
    pub thick_us: u64,
    /// Thin band pass.
    pub thin_us: u64,
    /// All carve-out groups.
    pub carve_out_us: u64,
    /// Connectivity repair.
    pub repair_us: u64,
}

/// Everything a build did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// Sloped + smooth passes.
    pub surface: PassStats,
    /// Thick band pass.
    pub thick: PassStats,
    /// Thin band pass.
    pub thin: PassStats,
    /// Carve-out passes.
    pub carve_out: PassStats,
    /// Connectivity repair.
    pub repair: RepairReport,
    /// Bricks re-tagged by material reconciliation.
    pub retagged: usize,
    /// Live bricks at the end.
    pub bricks: usize,
    /// Components at the end.
    pub components: usize,
    /// Model totals.
    pub counters: ModelCounters,
    /// Stage durations.
    pub timings: StageTimings,
}

/// Turns voxel grids into brick models.
#[derive(Clone, Debug)]
pub struct BrickBuilder {
    catalog: BrickCatalog,
    config: BuildConfig,
}

impl BrickBuilder {
    /// Creates a builder.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AssemblyError::Config`] if `config` is invalid.
    pub fn new(catalog: BrickCatalog, config: BuildConfig) -> AssemblyResult<Self> {
        config.validate()?;
        Ok(Self { catalog, config })
    }

    /// The brick catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &BrickCatalog {
        &self.catalog
    }

    /// The build configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Builds from raw occupancy and component grids.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AssemblyError::Grid`] if the grids are empty or
    /// differ in shape.
    pub fn build_from<P: ScenePresenter>(
        &self,
        occupancy: Grid3<bool>,
        components: Grid3<ComponentId>,
        presenter: P,
    ) -> AssemblyResult<(BuildReport, BrickModel<P>)> {
        let grid = VoxelGrid::new(occupancy, components)?;
        Ok(self.build(grid, presenter))
    }

    /// Builds with the configured seed.
    pub fn build<P: ScenePresenter>(
        &self,
        grid: VoxelGrid,
        presenter: P,
    ) -> (BuildReport, BrickModel<P>) {
        let rng = Box::new(SeededRandom::new(self.config.seed));
        self.build_with(grid, presenter, rng)
    }

    /// Builds with an explicit randomness source.
    pub fn build_with<P: ScenePresenter>(
        &self,
        grid: VoxelGrid,
        presenter: P,
        rng: Box<dyn RandomSource>,
    ) -> (BuildReport, BrickModel<P>) {
        let config = &self.config;
        let scheduler = LayerScheduler::new(grid.dims().x, config.alternate_orientations);
        let mut model = BrickModel::new(grid, presenter, rng);
        let mut timings = StageTimings::default();

        let thick_pool = self.catalog.structural_pool(config.thick_band);
        let thin_pool = self.catalog.structural_pool(config.thin_band);
        let material = &config.default_material;

        // Surface
        let start = Instant::now();
        let mut surface = PassStats::default();
        if config.surface_passes {
            for family in [BrickFamily::Sloped, BrickFamily::Smooth] {
                let pool = self.catalog.family(family);
                let pass = PassSpec {
                    pool: &pool,
                    material,
                    kind: PlacementKind::Surface,
                };
                surface += scheduler.fill_full(&mut model, &pass, true);
            }
        }
        timings.surface_us = start.elapsed().as_micros() as u64;
        tracing::info!(
            "Surface passes: {} placed ({} mirrored)",
            surface.placed,
            surface.mirrored
        );

        // Thick
        let start = Instant::now();
        let pass = PassSpec {
            pool: &thick_pool,
            material,
            kind: PlacementKind::Structural,
        };
        let thick = scheduler.fill_bands(&mut model, config.thick_band, &pass);
        timings.thick_us = start.elapsed().as_micros() as u64;
        tracing::info!("Thick pass: {} placed, {} evicted", thick.placed, thick.evicted);

        // Thin
        let start = Instant::now();
        let pass = PassSpec {
            pool: &thin_pool,
            ..pass
        };
        let thin = scheduler.fill_bands(&mut model, config.thin_band, &pass);
        timings.thin_us = start.elapsed().as_micros() as u64;
        tracing::info!("Thin pass: {} placed, {} evicted", thin.placed, thin.evicted);

        // Carve-out
        let start = Instant::now();
        let mut carve_out = PassStats::default();
        let materials = config.material_map();
        for group in config.carve_out_groups() {
            let reopened = model.grid_mut().reopen_components(&group);
            let group_material = group
                .iter()
                .find_map(|c| materials.get(c))
                .unwrap_or(material);
            for pool in [&thick_pool, &thin_pool] {
                let pass = PassSpec {
                    pool,
                    material: group_material,
                    kind: PlacementKind::CarveOut,
                };
                carve_out += scheduler.fill_full(&mut model, &pass, false);
            }
            tracing::debug!("Carve-out group {:?}: {} cells reopened", group, reopened);
        }
        timings.carve_out_us = start.elapsed().as_micros() as u64;
        if !config.carve_out_components.is_empty() {
            tracing::info!("Carve-out passes: {} placed", carve_out.placed);
        }

        // Repair
        let start = Instant::now();
        let repair = ConnectivityRepair::new(&self.catalog, config, scheduler).run(&mut model);
        timings.repair_us = start.elapsed().as_micros() as u64;

        let retagged = reconcile_materials(&mut model, config);
        let report = BuildReport {
            surface,
            thick,
            thin,
            carve_out,
            repair,
            retagged,
            bricks: model.table().len(),
            components: model.components().count(),
            counters: model.counters(),
            timings,
        };
        tracing::info!(
            "Build finished: {} bricks in {} components",
            report.bricks,
            report.components
        );
        (report, model)
    }
}

/// Re-tags bricks whose cells all lie in one configured component.
fn reconcile_materials<P: ScenePresenter>(
    model: &mut BrickModel<P>,
    config: &BuildConfig,
) -> usize {
    let materials = config.material_map();
    if materials.is_empty() {
        return 0;
    }

    let grid = model.grid();
    let updates: Vec<_> = model
        .table()
        .iter()
        .filter_map(|brick| {
            let (&first, rest) = brick.cells().split_first()?;
            let component = grid.component(first);
            if component.is_main() || rest.iter().any(|&c| grid.component(c) != component) {
                return None;
            }
            let material: &MaterialTag = materials.get(&component)?;
            (brick.material() != material).then(|| (brick.id(), material.clone()))
        })
        .collect();

    for (id, material) in &updates {
        model.set_material(*id, material);
    }
    updates.len()
}
