//! Per-layer optical product data.
//!
//! A product layer carries one of several measured representations. The set is
//! closed: every consumer matches on [`OpticalKind`] exhaustively, so adding a
//! representation is a compile error everywhere it is not handled.
//!
//! Wavelengths are in micrometers and thicknesses in meters.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::wavelength::LambdaRange;
use crate::error::Error;

/// Solar wavelength span assumed for products measured as two broad bands.
pub const DUAL_BAND_DOMAIN: LambdaRange = LambdaRange { min: 0.3, max: 2.5 };

/// Band edges used as the sample set of a dual-band product.
pub const DUAL_BAND_EDGES: [f64; 4] = [0.30, 0.38, 0.78, 2.50];

/// One measured row of an N-band product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthRow {
    pub wavelength: f64,
    pub tf: f64,
    pub tb: f64,
    pub rf: f64,
    pub rb: f64,
    /// External quantum efficiency, front side (photovoltaic products only).
    #[serde(default)]
    pub eqe_front: Option<f64>,
    /// External quantum efficiency, back side (photovoltaic products only).
    #[serde(default)]
    pub eqe_back: Option<f64>,
}

impl WavelengthRow {
    pub fn new(wavelength: f64, tf: f64, tb: f64, rf: f64, rb: f64) -> Self {
        Self {
            wavelength,
            tf,
            tb,
            rf,
            rb,
            eqe_front: None,
            eqe_back: None,
        }
    }

    pub fn with_eqe(mut self, front: f64, back: f64) -> Self {
        self.eqe_front = Some(front);
        self.eqe_back = Some(back);
        self
    }

    /// Same measurement seen from the other side.
    pub fn flipped(&self) -> Self {
        Self {
            wavelength: self.wavelength,
            tf: self.tb,
            tb: self.tf,
            rf: self.rb,
            rb: self.rf,
            eqe_front: self.eqe_back,
            eqe_back: self.eqe_front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialClass {
    Monolithic,
    Coated,
    AppliedFilm,
    Laminate,
    Interlayer,
    ShadeMaterial,
}

/// Electrical characteristics of a photovoltaic layer at one operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerProperties {
    /// Short-circuit current density [A/m^2].
    pub jsc: f64,
    /// Open-circuit voltage [V].
    pub voc: f64,
    /// Fill factor [-].
    pub ff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBandData {
    pub rows: Vec<WavelengthRow>,
    pub material_class: MaterialClass,
}

impl NBandData {
    pub fn new(rows: Vec<WavelengthRow>, material_class: MaterialClass) -> Self {
        Self {
            rows,
            material_class,
        }
    }

    pub fn wavelengths(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.wavelength).collect()
    }

    fn has_eqe(&self) -> bool {
        self.rows
            .iter()
            .any(|r| r.eqe_front.is_some() || r.eqe_back.is_some())
    }
}

/// Hemispheric transmittance/reflectance for one band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandProperties {
    pub tf: f64,
    pub tb: f64,
    pub rf: f64,
    pub rb: f64,
}

impl BandProperties {
    pub fn new(tf: f64, tb: f64, rf: f64, rb: f64) -> Self {
        Self { tf, tb, rf, rb }
    }

    pub fn flipped(&self) -> Self {
        Self {
            tf: self.tb,
            tb: self.tf,
            rf: self.rb,
            rb: self.rf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DualBandHemisphericData {
    pub solar: BandProperties,
    pub visible: BandProperties,
}

/// Klems bases used to discretize the hemisphere for BSDF data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BsdfBasis {
    Quarter,
    Half,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BsdfHemisphere {
    pub basis: BsdfBasis,
}

impl BsdfHemisphere {
    pub fn new(basis: BsdfBasis) -> Self {
        Self { basis }
    }

    /// Number of incoming (and outgoing) directions of the basis.
    pub fn direction_count(&self) -> usize {
        match self.basis {
            BsdfBasis::Quarter => 41,
            BsdfBasis::Half => 73,
            BsdfBasis::Full => 145,
        }
    }
}

/// Direction-resolved transmittance and reflectance for one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BsdfMatrices {
    pub tf: Array2<f64>,
    pub tb: Array2<f64>,
    pub rf: Array2<f64>,
    pub rb: Array2<f64>,
}

impl BsdfMatrices {
    pub fn flipped(&self) -> Self {
        Self {
            tf: self.tb.clone(),
            tb: self.tf.clone(),
            rf: self.rb.clone(),
            rb: self.rf.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualBandBsdfData {
    pub solar: BsdfMatrices,
    pub visible: BsdfMatrices,
    pub hemisphere: BsdfHemisphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionMethod {
    Uniform,
    Directional,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenetianGeometry {
    /// Slat width [m].
    pub slat_width: f64,
    /// Distance between slats [m].
    pub slat_spacing: f64,
    /// Radius of slat curvature [m], zero for flat slats.
    pub slat_curvature: f64,
    /// Slat tilt [deg], zero when slats are horizontal.
    pub slat_tilt: f64,
    pub segments_per_slat: usize,
    pub distribution: DistributionMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WovenGeometry {
    pub thread_diameter: f64,
    pub thread_spacing: f64,
    pub shade_thickness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerforationShape {
    Circular,
    Square,
    Rectangular,
}

impl FromStr for PerforationShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circular" | "circle" => Ok(Self::Circular),
            "square" => Ok(Self::Square),
            "rectangular" | "rectangle" => Ok(Self::Rectangular),
            _ => Err(Error::unsupported("perforation shape", s)),
        }
    }
}

impl fmt::Display for PerforationShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Circular => "circular",
            Self::Square => "square",
            Self::Rectangular => "rectangular",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerforatedGeometry {
    pub spacing_x: f64,
    pub spacing_y: f64,
    /// Hole diameter for circular perforations, hole width otherwise [m].
    pub dimension_x: f64,
    /// Hole height, only read for rectangular perforations [m].
    pub dimension_y: f64,
    pub shade_thickness: f64,
    pub shape: PerforationShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpticalKind {
    NBand(NBandData),
    DualBandHemispheric(DualBandHemisphericData),
    DualBandBsdf(DualBandBsdfData),
    Venetian {
        material: Arc<OpticalData>,
        geometry: VenetianGeometry,
    },
    Woven {
        material: Arc<OpticalData>,
        geometry: WovenGeometry,
    },
    Perforated {
        material: Arc<OpticalData>,
        geometry: PerforatedGeometry,
    },
    PerfectlyDiffuse {
        material: Arc<OpticalData>,
    },
}

/// Optical description of one product layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalData {
    pub kind: OpticalKind,
    #[serde(default)]
    pub thickness: Option<f64>,
    #[serde(default)]
    pub ir_transmittance_front: Option<f64>,
    #[serde(default)]
    pub ir_transmittance_back: Option<f64>,
    #[serde(default)]
    pub emissivity_front: Option<f64>,
    #[serde(default)]
    pub emissivity_back: Option<f64>,
    #[serde(default)]
    pub permeability_factor: f64,
    #[serde(default)]
    pub flipped: bool,
    /// Photovoltaic operating points; the first entry is the one used.
    #[serde(default)]
    pub power_properties: Vec<PowerProperties>,
}

impl OpticalData {
    pub fn new(kind: OpticalKind) -> Self {
        Self {
            kind,
            thickness: None,
            ir_transmittance_front: None,
            ir_transmittance_back: None,
            emissivity_front: None,
            emissivity_back: None,
            permeability_factor: 0.0,
            flipped: false,
            power_properties: Vec::new(),
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = Some(thickness);
        self
    }

    /// Sets the thermal-infrared transmittance and emissivity of both sides.
    pub fn with_infrared(mut self, tf: f64, tb: f64, ef: f64, eb: f64) -> Self {
        self.ir_transmittance_front = Some(tf);
        self.ir_transmittance_back = Some(tb);
        self.emissivity_front = Some(ef);
        self.emissivity_back = Some(eb);
        self
    }

    pub fn with_permeability(mut self, permeability_factor: f64) -> Self {
        self.permeability_factor = permeability_factor;
        self
    }

    pub fn with_power_properties(mut self, power: PowerProperties) -> Self {
        self.power_properties.push(power);
        self
    }

    /// Measured wavelength domain. Composites report their base material's.
    ///
    /// Returns `None` for N-band products without rows.
    pub fn wavelength_domain(&self) -> Option<LambdaRange> {
        match &self.kind {
            OpticalKind::NBand(data) => {
                let first = data.rows.first()?;
                let last = data.rows.last()?;
                Some(LambdaRange::new(first.wavelength, last.wavelength))
            }
            OpticalKind::DualBandHemispheric(_) | OpticalKind::DualBandBsdf(_) => {
                Some(DUAL_BAND_DOMAIN)
            }
            OpticalKind::Venetian { material, .. }
            | OpticalKind::Woven { material, .. }
            | OpticalKind::Perforated { material, .. }
            | OpticalKind::PerfectlyDiffuse { material } => material.wavelength_domain(),
        }
    }

    /// Wavelengths at which the product was measured.
    pub fn measured_wavelengths(&self) -> Vec<f64> {
        match &self.kind {
            OpticalKind::NBand(data) => data.wavelengths(),
            OpticalKind::DualBandHemispheric(_) | OpticalKind::DualBandBsdf(_) => {
                DUAL_BAND_EDGES.to_vec()
            }
            OpticalKind::Venetian { material, .. }
            | OpticalKind::Woven { material, .. }
            | OpticalKind::Perforated { material, .. }
            | OpticalKind::PerfectlyDiffuse { material } => material.measured_wavelengths(),
        }
    }

    /// Whether the layer can only be represented on a BSDF hemisphere.
    pub fn requires_bsdf(&self) -> bool {
        !matches!(
            self.kind,
            OpticalKind::NBand(_) | OpticalKind::DualBandHemispheric(_)
        )
    }

    pub fn is_photovoltaic(&self) -> bool {
        if !self.power_properties.is_empty() {
            return true;
        }
        match &self.kind {
            OpticalKind::NBand(data) => data.has_eqe(),
            _ => false,
        }
    }

    /// All four thermal-infrared values, when the product declares them.
    pub fn infrared(&self) -> Option<[f64; 4]> {
        Some([
            self.ir_transmittance_front?,
            self.ir_transmittance_back?,
            self.emissivity_front?,
            self.emissivity_back?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_glass() -> OpticalData {
        OpticalData::new(OpticalKind::NBand(NBandData::new(
            vec![
                WavelengthRow::new(0.3, 0.0, 0.0, 0.05, 0.05),
                WavelengthRow::new(0.5, 0.9, 0.9, 0.08, 0.08),
                WavelengthRow::new(2.5, 0.8, 0.8, 0.07, 0.07),
            ],
            MaterialClass::Monolithic,
        )))
    }

    #[test]
    fn test_nband_domain_is_first_and_last_row() {
        let range = clear_glass().wavelength_domain().unwrap();
        assert!((range.min - 0.3).abs() < 1e-12);
        assert!((range.max - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_nband_has_no_domain() {
        let data = OpticalData::new(OpticalKind::NBand(NBandData::new(
            vec![],
            MaterialClass::Monolithic,
        )));
        assert!(data.wavelength_domain().is_none());
    }

    #[test]
    fn test_composite_domain_equals_base_material() {
        let base = Arc::new(clear_glass());
        let woven = OpticalData::new(OpticalKind::Woven {
            material: base.clone(),
            geometry: WovenGeometry {
                thread_diameter: 0.001,
                thread_spacing: 0.003,
                shade_thickness: 0.001,
            },
        });
        assert_eq!(woven.wavelength_domain(), base.wavelength_domain());
        assert!(woven.requires_bsdf());
        assert!(!base.requires_bsdf());
    }

    #[test]
    fn test_perforation_shape_parsing() {
        assert_eq!(
            "Circular".parse::<PerforationShape>().unwrap(),
            PerforationShape::Circular
        );
        assert_eq!(
            " square ".parse::<PerforationShape>().unwrap(),
            PerforationShape::Square
        );
        let err = "hexagonal".parse::<PerforationShape>().unwrap_err();
        assert!(err.to_string().contains("hexagonal"));
    }

    #[test]
    fn test_photovoltaic_detection() {
        let plain = clear_glass();
        assert!(!plain.is_photovoltaic());

        let pv = OpticalData::new(OpticalKind::NBand(NBandData::new(
            vec![WavelengthRow::new(0.5, 0.1, 0.1, 0.1, 0.1).with_eqe(0.8, 0.0)],
            MaterialClass::Monolithic,
        )));
        assert!(pv.is_photovoltaic());
    }

    #[test]
    fn test_infrared_requires_all_values() {
        let mut data = clear_glass().with_infrared(0.0, 0.0, 0.84, 0.84);
        assert_eq!(data.infrared(), Some([0.0, 0.0, 0.84, 0.84]));
        data.emissivity_back = None;
        assert!(data.infrared().is_none());
    }

    #[test]
    fn test_row_flip_swaps_sides() {
        let row = WavelengthRow::new(0.5, 0.1, 0.2, 0.3, 0.4).with_eqe(0.5, 0.6);
        let f = row.flipped();
        assert_eq!((f.tf, f.tb, f.rf, f.rb), (0.2, 0.1, 0.4, 0.3));
        assert_eq!((f.eqe_front, f.eqe_back), (Some(0.6), Some(0.5)));
    }
}
