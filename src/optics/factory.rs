//! Material and scattering-layer factory.
//!
//! For one product layer and one method the factory decides whether the
//! measured data covers the wavelengths the method needs. Covered layers are
//! built from their measurements; the thermal-infrared method alone may fall
//! back to a single-band material built from the declared infrared values.

use super::data::{
    BandProperties, BsdfHemisphere, BsdfMatrices, DualBandBsdfData, NBandData, OpticalData, OpticalKind,
    PerforatedGeometry, PerforationShape,
};
use super::material::{LayerGeometry, Material, PerforatedCell, ScatteringLayer};
use super::standard::{Method, MethodType};
use super::wavelength::{self, LambdaRange, SpectralSampling};
use crate::config::CalcOptions;
use crate::error::{Error, Result};

/// Outcome of comparing a method's requirement with a layer's measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage {
    Covered(LambdaRange),
    Uncovered {
        required: LambdaRange,
        measured: LambdaRange,
    },
}

enum Resolved {
    Range(LambdaRange),
    Fallback(Material),
}

/// Converts a perforation description into a rectangular cell.
///
/// A circular hole of diameter `d` maps onto a `d x d` opening, so circular,
/// square and `d x d` rectangular perforations share one openness.
pub fn perforated_cell(geometry: &PerforatedGeometry) -> Result<PerforatedCell> {
    let (opening_x, opening_y) = match geometry.shape {
        PerforationShape::Circular | PerforationShape::Square => {
            (geometry.dimension_x, geometry.dimension_x)
        }
        PerforationShape::Rectangular => (geometry.dimension_x, geometry.dimension_y),
    };
    if opening_x <= 0.0 || opening_y <= 0.0 {
        return Err(Error::invalid(format!(
            "{} perforation needs positive hole dimensions",
            geometry.shape
        )));
    }
    if opening_x > geometry.spacing_x || opening_y > geometry.spacing_y {
        return Err(Error::invalid(format!(
            "{} perforation of {opening_x} x {opening_y} m does not fit a {} x {} m cell",
            geometry.shape, geometry.spacing_x, geometry.spacing_y
        )));
    }
    Ok(PerforatedCell {
        spacing_x: geometry.spacing_x,
        spacing_y: geometry.spacing_y,
        opening_x,
        opening_y,
        thickness: geometry.shade_thickness,
    })
}

/// Builds materials and layers for one calculation configuration.
pub struct LayerFactory<'a> {
    pub options: &'a CalcOptions,
    pub sampling: &'a SpectralSampling,
    pub hemisphere: Option<BsdfHemisphere>,
}

impl<'a> LayerFactory<'a> {
    pub fn new(
        options: &'a CalcOptions,
        sampling: &'a SpectralSampling,
        hemisphere: Option<BsdfHemisphere>,
    ) -> Self {
        Self {
            options,
            sampling,
            hemisphere,
        }
    }

    pub fn coverage(&self, method: &Method, layer: &OpticalData) -> Result<Coverage> {
        let required = wavelength::lambda_range(method, layer)?;
        let measured = layer.wavelength_domain().ok_or_else(|| {
            Error::missing("measured wavelength domain", format!("method {}", method.name))
        })?;
        if required.is_valid() && measured.covers(&required, self.options.coverage_tolerance) {
            Ok(Coverage::Covered(required))
        } else {
            Ok(Coverage::Uncovered { required, measured })
        }
    }

    /// Material for `layer` under `method`.
    ///
    /// `participants` is the number of layers evaluated together; a lone
    /// dual-band BSDF layer under a single-band method keeps only that band.
    pub fn create_material(
        &self,
        layer: &OpticalData,
        method: &Method,
        participants: usize,
    ) -> Result<Material> {
        self.material(layer, method, participants, layer.flipped)
    }

    fn material(
        &self,
        layer: &OpticalData,
        method: &Method,
        participants: usize,
        flipped: bool,
    ) -> Result<Material> {
        match &layer.kind {
            // Composites are built from their base material.
            OpticalKind::Venetian { material, .. }
            | OpticalKind::Woven { material, .. }
            | OpticalKind::Perforated { material, .. }
            | OpticalKind::PerfectlyDiffuse { material } => {
                self.material(material, method, participants, flipped ^ material.flipped)
            }
            OpticalKind::NBand(nband) => {
                let range = match self.resolve(layer, method, flipped)? {
                    Resolved::Range(range) => range,
                    Resolved::Fallback(material) => return Ok(material),
                };
                let material = sample_data_material(nband, range, method, flipped);
                if layer.is_photovoltaic() {
                    photovoltaic_material(layer, nband, material, flipped)
                } else {
                    Ok(material)
                }
            }
            OpticalKind::DualBandHemispheric(dual) => {
                if layer.is_photovoltaic() {
                    return Err(Error::unsupported(
                        "photovoltaic material",
                        "dual-band hemispheric data",
                    ));
                }
                let range = match self.resolve(layer, method, flipped)? {
                    Resolved::Range(range) => range,
                    Resolved::Fallback(material) => return Ok(material),
                };
                let wavelengths = wavelength::sample_wavelengths(method, layer, self.sampling)?
                    .into_iter()
                    .filter(|&w| range.contains(w, self.options.coverage_tolerance))
                    .collect();
                let (solar, visible) = if flipped {
                    (dual.solar.flipped(), dual.visible.flipped())
                } else {
                    (dual.solar, dual.visible)
                };
                Ok(Material::DualBand {
                    solar,
                    visible,
                    wavelengths,
                    range,
                })
            }
            OpticalKind::DualBandBsdf(bsdf) => {
                if layer.is_photovoltaic() {
                    return Err(Error::unsupported(
                        "photovoltaic material",
                        "dual-band BSDF data",
                    ));
                }
                match self.resolve(layer, method, flipped)? {
                    Resolved::Range(range) => {
                        Ok(self.bsdf_material(bsdf, method, participants, range, flipped))
                    }
                    Resolved::Fallback(material) => Ok(material),
                }
            }
        }
    }

    /// Range to build over, or the thermal-infrared fallback material.
    fn resolve(&self, layer: &OpticalData, method: &Method, flipped: bool) -> Result<Resolved> {
        match self.coverage(method, layer)? {
            Coverage::Covered(range) => Ok(Resolved::Range(range)),
            Coverage::Uncovered { required, measured } if method.is_thermal_infrared() => {
                log::warn!(
                    "thermal IR data {measured} does not cover {required}, using declared infrared values"
                );
                Ok(Resolved::Fallback(
                    self.thermal_ir_material(layer, method, flipped)?,
                ))
            }
            Coverage::Uncovered { required, measured } => Err(Error::Coverage {
                method: method.name.clone(),
                required,
                measured,
            }),
        }
    }

    fn bsdf_material(
        &self,
        bsdf: &DualBandBsdfData,
        method: &Method,
        participants: usize,
        range: LambdaRange,
        flipped: bool,
    ) -> Material {
        let orient = |m: &BsdfMatrices| if flipped { m.flipped() } else { m.clone() };
        let single_band = match method.method_type() {
            Some(MethodType::Solar) if participants == 1 => Some(&bsdf.solar),
            Some(MethodType::Photopic) if participants == 1 => Some(&bsdf.visible),
            _ => None,
        };
        match single_band {
            Some(matrices) => Material::SingleBandBsdf {
                matrices: orient(matrices),
                range,
            },
            None => Material::DualBandBsdf {
                solar: orient(&bsdf.solar),
                visible: orient(&bsdf.visible),
                ratio: self.options.dual_band_ratio,
                range,
            },
        }
    }

    fn thermal_ir_material(
        &self,
        layer: &OpticalData,
        method: &Method,
        flipped: bool,
    ) -> Result<Material> {
        let context = || format!("method {}", method.name);
        let tf = layer
            .ir_transmittance_front
            .ok_or_else(|| Error::missing("infrared transmittance front", context()))?;
        let tb = layer
            .ir_transmittance_back
            .ok_or_else(|| Error::missing("infrared transmittance back", context()))?;
        let ef = layer
            .emissivity_front
            .ok_or_else(|| Error::missing("emissivity front", context()))?;
        let eb = layer
            .emissivity_back
            .ok_or_else(|| Error::missing("emissivity back", context()))?;
        let properties = BandProperties::new(tf, tb, 1.0 - tf - ef, 1.0 - tb - eb);
        let (min, max) = self.options.thermal_ir_span;
        Ok(Material::SingleBand {
            properties: if flipped {
                properties.flipped()
            } else {
                properties
            },
            range: LambdaRange::new(min, max),
        })
    }

    /// Scattering layer for `layer` under `method`.
    ///
    /// Specular products stay specular unless `as_bsdf` is set, which is the
    /// case when another layer of the same stack needs a BSDF representation.
    pub fn create_layer(
        &self,
        layer: &OpticalData,
        method: &Method,
        participants: usize,
        as_bsdf: bool,
    ) -> Result<ScatteringLayer> {
        let material = self.create_material(layer, method, participants)?;
        let geometry = match layer_geometry(layer)? {
            Some(geometry) => geometry,
            None if as_bsdf => LayerGeometry::Specular,
            None => return Ok(ScatteringLayer::Specular(material)),
        };
        let hemisphere = self.hemisphere.ok_or_else(|| {
            Error::missing("BSDF hemisphere", format!("method {}", method.name))
        })?;
        Ok(ScatteringLayer::Bsdf {
            material,
            hemisphere,
            geometry,
        })
    }
}

/// Geometric transform of a product layer, `None` for specular products.
pub fn layer_geometry(layer: &OpticalData) -> Result<Option<LayerGeometry>> {
    Ok(match &layer.kind {
        OpticalKind::NBand(_) | OpticalKind::DualBandHemispheric(_) => None,
        OpticalKind::DualBandBsdf(_) => Some(LayerGeometry::Measured),
        OpticalKind::Venetian { geometry, .. } => Some(LayerGeometry::Venetian(*geometry)),
        OpticalKind::Woven { geometry, .. } => Some(LayerGeometry::Woven(*geometry)),
        OpticalKind::Perforated { geometry, .. } => {
            Some(LayerGeometry::Perforated(perforated_cell(geometry)?))
        }
        OpticalKind::PerfectlyDiffuse { .. } => Some(LayerGeometry::PerfectlyDiffuse),
    })
}

fn sample_data_material(
    nband: &NBandData,
    range: LambdaRange,
    method: &Method,
    flipped: bool,
) -> Material {
    let rows = nband
        .rows
        .iter()
        .map(|row| if flipped { row.flipped() } else { *row })
        .collect();
    Material::SampleData {
        rows,
        range,
        integration: method.integration,
        class: nband.material_class,
    }
}

fn photovoltaic_material(
    layer: &OpticalData,
    nband: &NBandData,
    base: Material,
    flipped: bool,
) -> Result<Material> {
    let power = *layer
        .power_properties
        .first()
        .ok_or_else(|| Error::missing("power properties", "photovoltaic layer"))?;
    let rows = nband
        .rows
        .iter()
        .map(|row| if flipped { row.flipped() } else { *row });
    let (eqe_front, eqe_back) = rows
        .map(|row| {
            (
                (row.wavelength, row.eqe_front.unwrap_or(0.0)),
                (row.wavelength, row.eqe_back.unwrap_or(0.0)),
            )
        })
        .unzip();
    Ok(Material::Photovoltaic {
        base: Box::new(base),
        eqe_front,
        eqe_back,
        power,
    })
}
