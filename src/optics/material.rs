//! Solver-ready materials and scattering layers.
//!
//! These are the values the factory produces and the optical backend
//! consumes. Measured rows are already oriented (flips applied) and restricted
//! to the method's wavelength range.

use super::data::{
    BandProperties, BsdfHemisphere, BsdfMatrices, MaterialClass, PowerProperties,
    VenetianGeometry, WavelengthRow, WovenGeometry,
};
use super::spectrum::Series;
use super::standard::Integration;
use super::wavelength::LambdaRange;

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    /// Measured spectral rows over a resolved range.
    SampleData {
        rows: Vec<WavelengthRow>,
        range: LambdaRange,
        integration: Integration,
        class: MaterialClass,
    },
    /// Solar and visible hemispheric values, sampled on `wavelengths`.
    DualBand {
        solar: BandProperties,
        visible: BandProperties,
        wavelengths: Vec<f64>,
        range: LambdaRange,
    },
    /// Constant properties over a range.
    SingleBand {
        properties: BandProperties,
        range: LambdaRange,
    },
    SingleBandBsdf {
        matrices: BsdfMatrices,
        range: LambdaRange,
    },
    DualBandBsdf {
        solar: BsdfMatrices,
        visible: BsdfMatrices,
        /// Visible-to-solar weighting.
        ratio: f64,
        range: LambdaRange,
    },
    /// A spectral material that also converts absorbed light to electricity.
    Photovoltaic {
        base: Box<Material>,
        eqe_front: Series,
        eqe_back: Series,
        power: PowerProperties,
    },
}

impl Material {
    pub fn range(&self) -> LambdaRange {
        match self {
            Material::SampleData { range, .. }
            | Material::DualBand { range, .. }
            | Material::SingleBand { range, .. }
            | Material::SingleBandBsdf { range, .. }
            | Material::DualBandBsdf { range, .. } => *range,
            Material::Photovoltaic { base, .. } => base.range(),
        }
    }

    pub fn power_properties(&self) -> Option<&PowerProperties> {
        match self {
            Material::Photovoltaic { power, .. } => Some(power),
            _ => None,
        }
    }
}

/// Rectangular perforation cell after shape-specific conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerforatedCell {
    pub spacing_x: f64,
    pub spacing_y: f64,
    pub opening_x: f64,
    pub opening_y: f64,
    pub thickness: f64,
}

impl PerforatedCell {
    /// Open area fraction of one cell.
    pub fn openness(&self) -> f64 {
        let cell = self.spacing_x * self.spacing_y;
        if cell <= 0.0 {
            return 0.0;
        }
        (self.opening_x * self.opening_y / cell).clamp(0.0, 1.0)
    }
}

/// Geometric transform applied on top of a BSDF material.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerGeometry {
    /// Specular material discretized on the hemisphere.
    Specular,
    /// Direction-resolved measurements used as-is.
    Measured,
    PerfectlyDiffuse,
    Venetian(VenetianGeometry),
    Woven(WovenGeometry),
    Perforated(PerforatedCell),
}

impl LayerGeometry {
    /// Geometric openness at normal incidence, when the geometry defines one.
    pub fn openness(&self) -> Option<f64> {
        match self {
            LayerGeometry::Specular | LayerGeometry::Measured | LayerGeometry::PerfectlyDiffuse => {
                None
            }
            LayerGeometry::Venetian(v) => {
                if v.slat_spacing <= 0.0 {
                    return Some(0.0);
                }
                let blocked = v.slat_width * v.slat_tilt.to_radians().sin().abs();
                Some((1.0 - blocked / v.slat_spacing).clamp(0.0, 1.0))
            }
            LayerGeometry::Woven(w) => {
                if w.thread_spacing <= 0.0 {
                    return Some(0.0);
                }
                let open = ((w.thread_spacing - w.thread_diameter) / w.thread_spacing).max(0.0);
                Some(open * open)
            }
            LayerGeometry::Perforated(cell) => Some(cell.openness()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScatteringLayer {
    Specular(Material),
    Bsdf {
        material: Material,
        hemisphere: BsdfHemisphere,
        geometry: LayerGeometry,
    },
}

impl ScatteringLayer {
    pub fn material(&self) -> &Material {
        match self {
            ScatteringLayer::Specular(material) | ScatteringLayer::Bsdf { material, .. } => {
                material
            }
        }
    }

    pub fn is_bsdf(&self) -> bool {
        matches!(self, ScatteringLayer::Bsdf { .. })
    }

    pub fn power_properties(&self) -> Option<&PowerProperties> {
        self.material().power_properties()
    }
}
