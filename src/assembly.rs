//! Multi-layer assembly.
//!
//! Turns per-layer materials into an optical stack description for one
//! method, and product layers plus gaps into the insulating glass unit the
//! thermal backend solves.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{OpticalStack, StackKind};
use crate::config::CalcOptions;
use crate::error::{Error, Result};
use crate::optics::data::{BsdfHemisphere, OpticalData, OpticalKind};
use crate::optics::factory::{self, LayerFactory};
use crate::optics::material::ScatteringLayer;
use crate::optics::spectrum;
use crate::optics::standard::Method;
use crate::optics::wavelength::{self, LambdaRange, SpectralSampling};
use crate::thermal::igu::{GapLayer, Igu, ShadingOpenness, SolidLayer};
use crate::thermal::{GLASS_POISSON_RATIO, Gap, ThermalData};

/// Optical and thermal description of one product layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLayer {
    pub optical: Arc<OpticalData>,
    pub thermal: Arc<ThermalData>,
}

impl ProductLayer {
    pub fn new(optical: OpticalData, thermal: ThermalData) -> Self {
        Self {
            optical: Arc::new(optical),
            thermal: Arc::new(thermal),
        }
    }
}

/// Long-wave properties of a solid layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfraredProperties {
    pub transmittance_front: f64,
    pub transmittance_back: f64,
    pub emissivity_front: f64,
    pub emissivity_back: f64,
}

impl InfraredProperties {
    pub fn flipped(&self) -> Self {
        Self {
            transmittance_front: self.transmittance_back,
            transmittance_back: self.transmittance_front,
            emissivity_front: self.emissivity_back,
            emissivity_back: self.emissivity_front,
        }
    }
}

/// Infrared values declared on the product, oriented by the thermal flip.
///
/// `None` unless all four values are present.
pub fn declared_infrared(product: &ProductLayer) -> Option<InfraredProperties> {
    let [tf, tb, ef, eb] = product.optical.infrared()?;
    let declared = InfraredProperties {
        transmittance_front: tf,
        transmittance_back: tb,
        emissivity_front: ef,
        emissivity_back: eb,
    };
    Some(if product.thermal.flipped {
        declared.flipped()
    } else {
        declared
    })
}

/// Scattering layers of a stack for one method, outdoor layer first.
///
/// When any layer needs a BSDF representation, every layer is built as a
/// BSDF layer.
pub fn scattering_layers(
    factory: &LayerFactory,
    method: &Method,
    layers: &[&OpticalData],
) -> Result<Vec<Arc<ScatteringLayer>>> {
    let as_bsdf = layers.iter().any(|layer| layer.requires_bsdf());
    layers
        .iter()
        .map(|layer| {
            factory
                .create_layer(layer, method, layers.len(), as_bsdf)
                .map(Arc::new)
        })
        .collect()
}

/// Solver-ready description of a stack for `method`.
///
/// The range is the intersection of the layers' material ranges, so layers
/// that fell back to declared infrared values contribute the thermal-infrared
/// span. Source and detector spectra are evaluated once on the merged grid.
pub fn optical_stack(
    method: &Method,
    layers: &[&OpticalData],
    scattering: Vec<Arc<ScatteringLayer>>,
    sampling: &SpectralSampling,
    options: &CalcOptions,
    hemisphere: Option<BsdfHemisphere>,
) -> Result<OpticalStack> {
    if scattering.len() != layers.len() {
        return Err(Error::invalid(format!(
            "{} scattering layers for {} product layers",
            scattering.len(),
            layers.len()
        )));
    }
    let kind = if scattering.iter().any(|layer| layer.is_bsdf()) {
        StackKind::Bsdf(hemisphere.ok_or_else(|| {
            Error::missing("BSDF hemisphere", format!("method {}", method.name))
        })?)
    } else {
        StackKind::Specular
    };

    let mut ranges = scattering.iter().map(|layer| layer.material().range());
    let first = ranges
        .next()
        .ok_or_else(|| Error::invalid("an optical stack needs at least one layer"))?;
    let range = ranges.fold(first, |acc, r| acc.intersect(&r));
    if !range.is_valid() {
        return Err(coverage_error(method, layers)?);
    }

    let tolerance = options.coverage_tolerance;
    let mut wavelengths =
        wavelength::multi_layer_sample_wavelengths(method, layers, sampling, &range, tolerance)?;
    if wavelengths.len() < 2 && method.is_thermal_infrared() {
        wavelengths = vec![range.min, range.max];
    }
    if wavelengths.is_empty() {
        return Err(Error::invalid(format!(
            "method {} has no sample wavelengths inside {range}",
            method.name
        )));
    }

    log::debug!(
        "stack for {}: {} layers, {range}, {} wavelengths",
        method.name,
        layers.len(),
        wavelengths.len()
    );
    Ok(OpticalStack {
        method: method.name.clone(),
        layers: scattering,
        kind,
        range,
        source: spectrum::materialize(&method.source, &wavelengths),
        detector: spectrum::materialize(&method.detector, &wavelengths),
        wavelengths,
        integration: method.integration,
    })
}

fn coverage_error(method: &Method, layers: &[&OpticalData]) -> Result<Error> {
    let required = wavelength::multi_layer_lambda_range(method, layers)?;
    let measured = layers
        .iter()
        .filter_map(|layer| layer.wavelength_domain())
        .reduce(|acc, domain| acc.intersect(&domain))
        .unwrap_or(LambdaRange::new(0.0, 0.0));
    Ok(Error::Coverage {
        method: method.name.clone(),
        required,
        measured,
    })
}

/// Thermal solid for product layer `index`.
pub fn solid_layer(
    index: usize,
    product: &ProductLayer,
    infrared: InfraredProperties,
    solar_absorptance: f64,
) -> Result<SolidLayer> {
    let optical = &product.optical;
    let thermal = &product.thermal;
    let context = || format!("layer {index}");
    let conductivity = thermal
        .conductivity
        .ok_or_else(|| Error::missing("conductivity", context()))?;
    let thickness = thermal
        .thickness
        .or(optical.thickness)
        .ok_or_else(|| Error::missing("thickness", context()))?;

    let effective_thickness = match &optical.kind {
        OpticalKind::Venetian { geometry, .. } => {
            let tilt = geometry.slat_tilt.to_radians();
            geometry.slat_width * tilt.cos().abs() + thickness * tilt.sin().abs()
        }
        OpticalKind::Woven { geometry, .. } => geometry.shade_thickness,
        OpticalKind::Perforated { geometry, .. } => geometry.shade_thickness,
        _ => thickness,
    };

    let is_shade = optical.requires_bsdf() && !matches!(optical.kind, OpticalKind::DualBandBsdf(_));
    let shading = if is_shade || optical.permeability_factor > 0.0 {
        let openings = &thermal.openings;
        let geometric = factory::layer_geometry(optical)?.and_then(|g| g.openness());
        Some(ShadingOpenness {
            front: openings
                .front
                .or(geometric)
                .unwrap_or(optical.permeability_factor),
            top: openings.top.unwrap_or(0.0),
            bottom: openings.bottom.unwrap_or(0.0),
            left: openings.left.unwrap_or(0.0),
            right: openings.right.unwrap_or(0.0),
        })
    } else {
        None
    };

    Ok(SolidLayer {
        thickness: effective_thickness,
        conductivity,
        emissivity_front: infrared.emissivity_front,
        emissivity_back: infrared.emissivity_back,
        ir_transmittance_front: infrared.transmittance_front,
        ir_transmittance_back: infrared.transmittance_back,
        density: thermal.density(),
        youngs_modulus: thermal.youngs_modulus(),
        poisson_ratio: GLASS_POISSON_RATIO,
        solar_absorptance,
        shading,
    })
}

/// Alternating solid/gap/solid unit, outdoor side first.
pub fn assemble_igu(
    solids: Vec<SolidLayer>,
    gaps: &[Gap],
    width: f64,
    height: f64,
    tilt: f64,
) -> Result<Igu> {
    if solids.len() != gaps.len() + 1 {
        return Err(Error::invalid(format!(
            "{} solid layers need {} gaps, got {}",
            solids.len(),
            solids.len().saturating_sub(1),
            gaps.len()
        )));
    }
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::invalid(format!(
            "glazing dimensions must be positive, got {width} x {height} m"
        )));
    }
    let gaps = gaps
        .iter()
        .enumerate()
        .map(|(i, gap)| {
            if gap.thickness <= 0.0 {
                return Err(Error::invalid(format!(
                    "gap {i} has non-positive thickness {}",
                    gap.thickness
                )));
            }
            Ok(GapLayer {
                thickness: gap.thickness,
                mixture: gap.gas.resolve()?,
                pillar: gap.pillar,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Igu {
        solids,
        gaps,
        width,
        height,
        tilt,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::data::{
        BsdfBasis, DistributionMethod, MaterialClass, NBandData, VenetianGeometry, WavelengthRow,
    };
    use crate::optics::material::{LayerGeometry, Material};
    use crate::optics::standard::WavelengthBoundary;
    use crate::thermal::{Gas, GasFill};

    fn glass(min: f64, max: f64) -> OpticalData {
        OpticalData::new(OpticalKind::NBand(NBandData::new(
            vec![
                WavelengthRow::new(min, 0.8, 0.8, 0.08, 0.08),
                WavelengthRow::new(max, 0.8, 0.8, 0.08, 0.08),
            ],
            MaterialClass::Monolithic,
        )))
        .with_thickness(0.003)
        .with_infrared(0.0, 0.0, 0.84, 0.84)
    }

    fn data_method(name: &str) -> Method {
        Method::new(name, 0.0, 0.0).with_boundaries(
            WavelengthBoundary::WavelengthSet,
            WavelengthBoundary::WavelengthSet,
        )
    }

    fn venetian() -> OpticalData {
        OpticalData::new(OpticalKind::Venetian {
            material: Arc::new(glass(0.3, 2.5)),
            geometry: VenetianGeometry {
                slat_width: 0.016,
                slat_spacing: 0.012,
                slat_curvature: 0.0,
                slat_tilt: 45.0,
                segments_per_slat: 5,
                distribution: DistributionMethod::Uniform,
            },
        })
    }

    fn ir() -> InfraredProperties {
        InfraredProperties {
            transmittance_front: 0.0,
            transmittance_back: 0.0,
            emissivity_front: 0.84,
            emissivity_back: 0.84,
        }
    }

    #[test]
    fn test_bsdf_layer_turns_whole_stack_bsdf() {
        let opts = CalcOptions::default();
        let sampling = SpectralSampling::default();
        let hemisphere = Some(BsdfHemisphere::new(BsdfBasis::Quarter));
        let factory = LayerFactory::new(&opts, &sampling, hemisphere);
        let method = Method::new("SOLAR", 0.3, 2.5);
        let g = glass(0.3, 2.5);
        let v = venetian();
        let layers = scattering_layers(&factory, &method, &[&g, &v]).unwrap();
        assert!(layers.iter().all(|l| l.is_bsdf()));
        assert!(matches!(
            *layers[0],
            ScatteringLayer::Bsdf {
                geometry: LayerGeometry::Specular,
                ..
            }
        ));

        let stack = optical_stack(&method, &[&g, &v], layers, &sampling, &opts, hemisphere).unwrap();
        assert!(matches!(stack.kind, StackKind::Bsdf(_)));
    }

    #[test]
    fn test_thermal_ir_fallback_stack_spans_infrared() {
        let opts = CalcOptions::default();
        let sampling = SpectralSampling::default();
        let factory = LayerFactory::new(&opts, &sampling, None);
        let method = Method::new("THERMAL IR", 5.0, 0.0).with_boundaries(
            WavelengthBoundary::Number(5.0),
            WavelengthBoundary::WavelengthSet,
        );
        let g = glass(0.3, 2.5);
        let layers = scattering_layers(&factory, &method, &[&g, &g]).unwrap();
        assert!(matches!(layers[0].material(), Material::SingleBand { .. }));
        let stack = optical_stack(&method, &[&g, &g], layers, &sampling, &opts, None).unwrap();
        assert_eq!(stack.range, LambdaRange::new(5.0, 100.0));
        assert_eq!(stack.wavelengths, vec![5.0, 100.0]);
        assert_eq!(stack.kind, StackKind::Specular);
    }

    #[test]
    fn test_disjoint_layers_are_a_coverage_error() {
        let opts = CalcOptions::default();
        let sampling = SpectralSampling::default();
        let factory = LayerFactory::new(&opts, &sampling, None);
        let method = data_method("SOLAR");
        let a = glass(0.3, 0.5);
        let b = glass(0.6, 2.5);
        let layers = scattering_layers(&factory, &method, &[&a, &b]).unwrap();
        let err = optical_stack(&method, &[&a, &b], layers, &sampling, &opts, None).unwrap_err();
        match err {
            Error::Coverage {
                required, measured, ..
            } => {
                assert!(!required.is_valid());
                assert!(!measured.is_valid());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_stack_grid_is_merged_and_clipped() {
        let opts = CalcOptions::default();
        let sampling = SpectralSampling::default();
        let factory = LayerFactory::new(&opts, &sampling, None);
        let method = data_method("SOLAR");
        let a = glass(0.3, 2.5);
        let b = glass(0.4, 2.0);
        let layers = scattering_layers(&factory, &method, &[&a, &b]).unwrap();
        let stack = optical_stack(&method, &[&a, &b], layers, &sampling, &opts, None).unwrap();
        assert_eq!(stack.range, LambdaRange::new(0.4, 2.0));
        assert_eq!(stack.wavelengths, vec![0.4, 2.0]);
        assert_eq!(stack.source.len(), 2);
    }

    #[test]
    fn test_venetian_effective_thickness_and_openness() {
        let product = ProductLayer::new(venetian(), ThermalData::new(160.0, 0.0001));
        let solid = solid_layer(1, &product, ir(), 0.2).unwrap();
        let tilt = 45f64.to_radians();
        let expected = 0.016 * tilt.cos() + 0.0001 * tilt.sin();
        assert!((solid.thickness - expected).abs() < 1e-12);
        let shading = solid.shading.unwrap();
        let open = 1.0 - 0.016 * tilt.sin() / 0.012;
        assert!((shading.front - open.clamp(0.0, 1.0)).abs() < 1e-12);
        assert_eq!(solid.solar_absorptance, 0.2);
    }

    #[test]
    fn test_missing_conductivity_is_named() {
        let thermal = ThermalData {
            conductivity: None,
            ..ThermalData::new(1.0, 0.003)
        };
        let product = ProductLayer::new(glass(0.3, 2.5), thermal);
        let err = solid_layer(2, &product, ir(), 0.0).unwrap_err();
        assert_eq!(err.to_string(), "missing conductivity for layer 2");
    }

    #[test]
    fn test_declared_infrared_follows_thermal_flip() {
        let mut thermal = ThermalData::new(1.0, 0.003);
        thermal.flipped = true;
        let optical = glass(0.3, 2.5).with_infrared(0.0, 0.1, 0.84, 0.2);
        let product = ProductLayer::new(optical, thermal);
        let ir = declared_infrared(&product).unwrap();
        assert_eq!(ir.emissivity_front, 0.2);
        assert_eq!(ir.transmittance_front, 0.1);
    }

    #[test]
    fn test_igu_needs_one_gap_fewer_than_solids() {
        let product = ProductLayer::new(glass(0.3, 2.5), ThermalData::new(1.0, 0.003));
        let solid = solid_layer(0, &product, ir(), 0.0).unwrap();
        let err = assemble_igu(vec![solid.clone(), solid.clone()], &[], 1.0, 1.0, 90.0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        let mixed = Gap::new(
            0.0127,
            GasFill::Mixture(vec![(Gas::Argon, 90.0), (Gas::Air, 10.0)]),
        );
        let igu = assemble_igu(vec![solid.clone(), solid], &[mixed], 1.0, 1.0, 90.0).unwrap();
        assert_eq!(igu.gaps[0].mixture.components[0], (Gas::Argon, 0.9));
        assert!((igu.total_thickness() - 0.0187).abs() < 1e-12);
    }
}
