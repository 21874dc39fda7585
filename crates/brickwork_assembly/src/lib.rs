//! # Brickwork Assembly
//!
//! The placement engine: greedy layer filling, symmetric placement and
//! connectivity repair over a [`brickwork_core::VoxelGrid`].
//!
//! ## Design Principles
//!
//! 1. **One writer** - a [`BrickModel`] owns the grid, the instance table and
//!    the ID allocator; every mutation goes through it
//! 2. **Reproducible** - every random choice draws from one [`RandomSource`]
//! 3. **Validate, then commit** - placements are checked before any state
//!    changes; presenter failures never roll back committed state
//! 4. **Terminates** - repair ends in `AllConnected` or `GaveUp`, never loops
//!
//! ## Example
//!
//! ```rust,ignore
//! use brickwork_assembly::{BrickBuilder, BuildConfig, NullPresenter};
//! use brickwork_core::{BrickCatalog, VoxelGrid};
//!
//! let config = BuildConfig::from_toml_str(&std::fs::read_to_string("build.toml")?)?;
//! let builder = BrickBuilder::new(BrickCatalog::builtin(), config)?;
//!
//! let (report, model) = builder.build(VoxelGrid::from_occupancy(voxels)?, NullPresenter::default());
//! println!("{} bricks, {:?}", report.bricks, report.repair.outcome);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod graph;
pub mod instance;
pub mod model;
pub mod pipeline;
pub mod presenter;
pub mod random;
pub mod repair;
pub mod scheduler;
pub mod symmetry;

pub use config::{BuildConfig, ComponentMaterial, MaterialTag};
pub use error::{AssemblyError, AssemblyResult, PresenterError};
pub use graph::Partition;
pub use instance::{BrickIdAllocator, BrickInstance, BrickTable, PlacementKind};
pub use model::{BrickModel, ModelCounters, Violation};
pub use pipeline::{BrickBuilder, BuildReport, StageTimings};
pub use presenter::{
    NullPresenter, Placement, PresentHandle, PresentedBrick, PresenterEvent, RecordingPresenter,
    ScenePresenter,
};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use repair::{ConnectivityRepair, RepairOutcome, RepairReport};
pub use scheduler::{LayerScheduler, PassSpec, PassStats};
pub use symmetry::{PlannedPlacement, SymmetryPlanner};
