//! # Assembly Error Types
//!
//! All errors that can occur while setting up or running a build.

use brickwork_core::{CatalogError, GridError};
use thiserror::Error;

use crate::presenter::PresentHandle;

/// Errors that can occur in the placement engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// The brick catalog is malformed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The input grids are malformed, or a grid mutation was rejected.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Invalid build configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failures reported by a scene presenter.
///
/// These never abort a build: the engine logs them and keeps the already
/// committed grid and graph state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresenterError {
    /// The presenter could not realize a brick.
    #[error("presenter could not place brick {brick}: {reason}")]
    PlacementFailed {
        /// Catalog name of the brick.
        brick: String,
        /// Presenter-specific reason.
        reason: String,
    },

    /// The presenter does not know the handle.
    #[error("unknown presented handle {0:?}")]
    UnknownHandle(PresentHandle),

    /// Any other presenter failure.
    #[error("presenter failure: {0}")]
    Other(String),
}

/// Result type for assembly operations.
pub type AssemblyResult<T> = Result<T, AssemblyError>;
