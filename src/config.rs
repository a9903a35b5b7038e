use serde::{Deserialize, Serialize};

/// Tunable constants used while resolving wavelengths and building materials.
///
/// None of these values is a law of physics. The defaults reproduce the
/// behavior of established fenestration tools and may be adjusted per standard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcOptions {
    /// Slack in micrometers allowed when comparing measured wavelength
    /// coverage against the range a method requires.
    pub coverage_tolerance: f64,
    /// Visible-to-solar weighting used when a dual-band BSDF material is
    /// needed for a method that spans both bands.
    pub dual_band_ratio: f64,
    /// Wavelength span in micrometers assigned to the single-band material
    /// built for the thermal-infrared fallback.
    pub thermal_ir_span: (f64, f64),
}

impl CalcOptions {
    pub fn new() -> Self {
        Self {
            coverage_tolerance: 1e-3,
            dual_band_ratio: 0.49,
            thermal_ir_span: (5.0, 100.0),
        }
    }
}

impl Default for CalcOptions {
    fn default() -> Self {
        Self::new()
    }
}
