//! Insulating glass unit as handed to a thermal backend.

use serde::{Deserialize, Serialize};

use super::gas::{GasMixture, Pillar};

/// Effective openness of a shading layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingOpenness {
    /// Open area fraction of the face.
    pub front: f64,
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolidLayer {
    /// Thickness used by the thermal model [m]; effective thickness for shades.
    pub thickness: f64,
    pub conductivity: f64,
    pub emissivity_front: f64,
    pub emissivity_back: f64,
    pub ir_transmittance_front: f64,
    pub ir_transmittance_back: f64,
    pub density: f64,
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    /// Fraction of incident direct solar irradiance absorbed as heat.
    pub solar_absorptance: f64,
    /// Present for shading layers only.
    pub shading: Option<ShadingOpenness>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GapLayer {
    pub thickness: f64,
    pub mixture: GasMixture,
    pub pillar: Option<Pillar>,
}

/// Ordered solid/gap stack, outdoor side first.
#[derive(Debug, Clone, PartialEq)]
pub struct Igu {
    pub solids: Vec<SolidLayer>,
    pub gaps: Vec<GapLayer>,
    /// [m]
    pub width: f64,
    /// [m]
    pub height: f64,
    /// Tilt from horizontal [deg], 90 for vertical glazing.
    pub tilt: f64,
}

impl Igu {
    pub fn total_thickness(&self) -> f64 {
        self.solids.iter().map(|s| s.thickness).sum::<f64>()
            + self.gaps.iter().map(|g| g.thickness).sum::<f64>()
    }
}

/// How gap widths respond to temperature, pressure and load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeflectionConfig {
    Disabled,
    /// Gaps were sealed at this temperature [K] and pressure [Pa].
    Construction { temperature: f64, pressure: f64 },
    /// Mean deflected gap widths measured on the unit [m].
    Measured(Vec<f64>),
}

impl Default for DeflectionConfig {
    fn default() -> Self {
        Self::Disabled
    }
}

/// Deflection configuration plus loads applied to each solid layer [Pa].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeflectionState {
    pub config: DeflectionConfig,
    #[serde(default)]
    pub applied_loads: Vec<f64>,
}

impl DeflectionState {
    pub fn is_enabled(&self) -> bool {
        !matches!(self.config, DeflectionConfig::Disabled)
    }
}
