//! # Scene Presenter
//!
//! The seam between the placement engine and whatever realizes bricks
//! visually. The engine never depends on presentation succeeding: a failed
//! call is logged and the committed grid and graph state stays as is.

use std::collections::BTreeMap;

use brickwork_core::{BrickId, Coord, Orientation};

use crate::config::MaterialTag;
use crate::error::PresenterError;

/// Opaque presenter-side handle of a realized brick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PresentHandle(pub u64);

/// Everything a presenter needs to realize one brick.
#[derive(Clone, Copy, Debug)]
pub struct Placement<'a> {
    /// Engine-side instance id.
    pub id: BrickId,
    /// Catalog name of the brick type.
    pub brick: &'a str,
    /// Minimum-corner anchor in grid coordinates.
    pub anchor: Coord,
    /// Orientation of the brick.
    pub orientation: Orientation,
    /// Display rotation angle in degrees.
    pub rotation_angle: i32,
    /// Material tag.
    pub material: &'a MaterialTag,
}

/// Realizes and retracts bricks in a host scene.
pub trait ScenePresenter {
    /// Realizes a committed brick.
    ///
    /// # Errors
    ///
    /// Returns a [`PresenterError`] if the brick could not be realized.
    fn present_placement(&mut self, placement: &Placement<'_>) -> Result<PresentHandle, PresenterError>;

    /// Retracts a previously presented brick.
    ///
    /// # Errors
    ///
    /// Returns a [`PresenterError`] if the handle is unknown.
    fn remove_presented(&mut self, handle: PresentHandle) -> Result<(), PresenterError>;

    /// Re-tags a presented brick with a new material.
    ///
    /// # Errors
    ///
    /// Returns a [`PresenterError`] if the handle is unknown.
    fn apply_material(
        &mut self,
        handle: PresentHandle,
        material: &MaterialTag,
    ) -> Result<(), PresenterError> {
        let _ = (handle, material);
        Ok(())
    }
}

/// Presenter that realizes nothing and accepts everything.
#[derive(Clone, Debug, Default)]
pub struct NullPresenter {
    next: u64,
}

impl ScenePresenter for NullPresenter {
    fn present_placement(&mut self, _placement: &Placement<'_>) -> Result<PresentHandle, PresenterError> {
        self.next += 1;
        Ok(PresentHandle(self.next))
    }

    fn remove_presented(&mut self, _handle: PresentHandle) -> Result<(), PresenterError> {
        Ok(())
    }
}

/// A brick as seen by a [`RecordingPresenter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentedBrick {
    /// Engine-side instance id.
    pub id: BrickId,
    /// Catalog name.
    pub brick: String,
    /// Anchor.
    pub anchor: Coord,
    /// Orientation.
    pub orientation: Orientation,
    /// Display angle.
    pub rotation_angle: i32,
    /// Current material.
    pub material: MaterialTag,
}

/// One presenter call, in the order it was received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenterEvent {
    /// A brick was presented.
    Placed(PresentHandle),
    /// A brick was retracted.
    Removed(PresentHandle),
    /// A brick changed material.
    Material(PresentHandle),
}

/// Presenter that keeps the live scene in memory.
///
/// Bricks whose catalog name is listed in `reject` fail to present, which
/// lets tests exercise the failure path.
#[derive(Clone, Debug, Default)]
pub struct RecordingPresenter {
    next: u64,
    live: BTreeMap<PresentHandle, PresentedBrick>,
    events: Vec<PresenterEvent>,
    reject: Vec<String>,
}

impl RecordingPresenter {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder that fails to present the named brick types.
    #[must_use]
    pub fn rejecting(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            reject: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Bricks currently in the scene.
    #[must_use]
    pub fn live(&self) -> &BTreeMap<PresentHandle, PresentedBrick> {
        &self.live
    }

    /// Every call received so far.
    #[must_use]
    pub fn events(&self) -> &[PresenterEvent] {
        &self.events
    }
}

impl ScenePresenter for RecordingPresenter {
    fn present_placement(&mut self, placement: &Placement<'_>) -> Result<PresentHandle, PresenterError> {
        if self.reject.iter().any(|name| name == placement.brick) {
            return Err(PresenterError::PlacementFailed {
                brick: placement.brick.to_owned(),
                reason: "rejected by presenter".into(),
            });
        }
        self.next += 1;
        let handle = PresentHandle(self.next);
        self.live.insert(
            handle,
            PresentedBrick {
                id: placement.id,
                brick: placement.brick.to_owned(),
                anchor: placement.anchor,
                orientation: placement.orientation,
                rotation_angle: placement.rotation_angle,
                material: placement.material.clone(),
            },
        );
        self.events.push(PresenterEvent::Placed(handle));
        Ok(handle)
    }

    fn remove_presented(&mut self, handle: PresentHandle) -> Result<(), PresenterError> {
        self.live
            .remove(&handle)
            .ok_or(PresenterError::UnknownHandle(handle))?;
        self.events.push(PresenterEvent::Removed(handle));
        Ok(())
    }

    fn apply_material(
        &mut self,
        handle: PresentHandle,
        material: &MaterialTag,
    ) -> Result<(), PresenterError> {
        let brick = self
            .live
            .get_mut(&handle)
            .ok_or(PresenterError::UnknownHandle(handle))?;
        brick.material = material.clone();
        self.events.push(PresenterEvent::Material(handle));
        Ok(())
    }
}
