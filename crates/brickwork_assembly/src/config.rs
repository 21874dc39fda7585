//! # Build Configuration
//!
//! Knobs for a single build, loadable from TOML:
//!
//! ```toml
//! seed = 7
//! stall_limit = 500
//! alternate_orientations = true
//! default_material = "red"
//! carve_out_components = [[1, 2], [5]]
//!
//! [[component_material]]
//! component = 1
//! material = "black"
//! ```

use std::collections::BTreeMap;
use std::fmt;

use brickwork_core::ComponentId;
use serde::Deserialize;

use crate::error::{AssemblyError, AssemblyResult};

/// Opaque material tag attached to every brick instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct MaterialTag(pub String);

impl MaterialTag {
    /// Creates a tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for MaterialTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Material override for one excluded component.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentMaterial {
    /// Component id (non-zero).
    pub component: u16,
    /// Material for bricks inside that component.
    pub material: MaterialTag,
}

/// Configuration for one build.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Seed of the build's single randomness source.
    pub seed: u64,
    /// Repair iterations without progress before giving up.
    pub stall_limit: usize,
    /// Band thickness of the thin pass.
    pub thin_band: usize,
    /// Band thickness of the thick pass.
    pub thick_band: usize,
    /// Alternate the starting cuboid orientation between bands.
    pub alternate_orientations: bool,
    /// Run the sloped and smooth surface passes.
    pub surface_passes: bool,
    /// Material of main-body bricks.
    pub default_material: MaterialTag,
    /// Material overrides per component.
    #[serde(rename = "component_material")]
    pub component_materials: Vec<ComponentMaterial>,
    /// Component groups filled in dedicated passes, in order.
    pub carve_out_components: Vec<Vec<u16>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            stall_limit: 500,
            thin_band: 1,
            thick_band: 3,
            alternate_orientations: false,
            surface_passes: true,
            default_material: MaterialTag::new("default"),
            component_materials: Vec::new(),
            carve_out_components: Vec::new(),
        }
    }
}

impl BuildConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::Config`] for malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> AssemblyResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| AssemblyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::Config`] for a zero band thickness, a zero
    /// stall limit, or a carve-out group that is empty or names the main
    /// body.
    pub fn validate(&self) -> AssemblyResult<()> {
        if self.thin_band == 0 || self.thick_band == 0 {
            return Err(AssemblyError::Config(format!(
                "band thickness must be non-zero (thin {}, thick {})",
                self.thin_band, self.thick_band
            )));
        }
        if self.stall_limit == 0 {
            return Err(AssemblyError::Config("stall_limit must be non-zero".into()));
        }
        for group in &self.carve_out_components {
            if group.is_empty() || group.contains(&0) {
                return Err(AssemblyError::Config(format!(
                    "carve-out group {group:?} must list non-zero component ids"
                )));
            }
        }
        if self.component_materials.iter().any(|m| m.component == 0) {
            return Err(AssemblyError::Config(
                "component materials cannot override the main body".into(),
            ));
        }
        Ok(())
    }

    /// Component id -> material lookup.
    #[must_use]
    pub fn material_map(&self) -> BTreeMap<ComponentId, MaterialTag> {
        self.component_materials
            .iter()
            .map(|m| (ComponentId(m.component), m.material.clone()))
            .collect()
    }

    /// Carve-out groups as component ids.
    #[must_use]
    pub fn carve_out_groups(&self) -> Vec<Vec<ComponentId>> {
        self.carve_out_components
            .iter()
            .map(|g| g.iter().map(|&c| ComponentId(c)).collect())
            .collect()
    }
}
