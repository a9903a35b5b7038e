//! Thermal-side data: solid layer properties, gases and gaps, boundary
//! environments and the assembled insulating glass unit.

pub mod environment;
pub mod gas;
pub mod igu;

use serde::{Deserialize, Serialize};

pub use environment::{BoundaryModel, Environment, Environments};
pub use gas::{Gap, Gas, GasFill, GasMixture, Pillar};
pub use igu::{DeflectionConfig, DeflectionState, GapLayer, Igu, ShadingOpenness, SolidLayer};

/// Density of soda-lime glass [kg/m^3].
pub const GLASS_DENSITY: f64 = 2500.0;
/// Young's modulus of soda-lime glass [Pa].
pub const GLASS_YOUNGS_MODULUS: f64 = 7.2e10;
/// Poisson ratio of soda-lime glass [-].
pub const GLASS_POISSON_RATIO: f64 = 0.22;

/// Fractions of a shading layer open to airflow at each edge and the face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningFractions {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub front: Option<f64>,
}

/// Thermal description of one product layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalData {
    /// Thermal conductivity [W/(m*K)].
    #[serde(default)]
    pub conductivity: Option<f64>,
    /// Thickness [m].
    #[serde(default)]
    pub thickness: Option<f64>,
    /// Orients the declared infrared values of the paired optical data.
    #[serde(default)]
    pub flipped: bool,
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub youngs_modulus: Option<f64>,
    #[serde(default)]
    pub openings: OpeningFractions,
}

impl ThermalData {
    pub fn new(conductivity: f64, thickness: f64) -> Self {
        Self {
            conductivity: Some(conductivity),
            thickness: Some(thickness),
            flipped: false,
            density: None,
            youngs_modulus: None,
            openings: OpeningFractions::default(),
        }
    }

    pub fn with_openings(mut self, openings: OpeningFractions) -> Self {
        self.openings = openings;
        self
    }

    pub fn density(&self) -> f64 {
        self.density.unwrap_or(GLASS_DENSITY)
    }

    pub fn youngs_modulus(&self) -> f64 {
        self.youngs_modulus.unwrap_or(GLASS_YOUNGS_MODULUS)
    }
}
