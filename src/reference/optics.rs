//! Specular multi-layer optics.
//!
//! Each wavelength is solved independently: layers are combined pairwise with
//! the inter-reflection series, and layer absorptances come from a
//! net-radiation balance. Spectral results are weighted by source, detector
//! and integration band widths. The model is angle independent.

use anyhow::{Result, bail, ensure};

use crate::backend::{
    AbsorptanceComponents, DirectionalResults, LayerAbsorptance, OpticalBackend, OpticalResults,
    OpticalStack, OpticalSystem, SideResults, StackKind, SystemResults,
};
use crate::optics::data::{BandProperties, WavelengthRow};
use crate::optics::material::Material;
use crate::optics::spectrum;
use crate::optics::wavelength::{LambdaRange, VISIBLE_MAX, VISIBLE_MIN};

/// Photon energy times wavelength [eV*um].
const HC_EV_UM: f64 = 1.239_84;

/// Backend for stacks of specular layers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceOptics;

impl OpticalBackend for ReferenceOptics {
    fn assemble(&self, stack: &OpticalStack) -> Result<Box<dyn OpticalSystem>> {
        if let StackKind::Bsdf(_) = stack.kind {
            bail!("reference optics handles specular stacks only");
        }
        ensure!(!stack.layers.is_empty(), "optical stack has no layers");
        ensure!(
            !stack.wavelengths.is_empty(),
            "optical stack for {} has no sample wavelengths",
            stack.method
        );

        let weights = spectrum::integration_weights(&stack.wavelengths, &stack.integration);
        let mut samples = Vec::with_capacity(stack.wavelengths.len());
        for (i, &wavelength) in stack.wavelengths.iter().enumerate() {
            let weight = weights[i]
                * spectrum::interpolate(&stack.source, wavelength)
                * spectrum::interpolate(&stack.detector, wavelength);
            let layers = stack
                .layers
                .iter()
                .map(|layer| LayerSample::at(layer.material(), wavelength))
                .collect::<Result<Vec<_>>>()?;
            samples.push(SpectralSample::solve(wavelength, weight, &layers));
        }
        log::debug!(
            "assembled specular system for {} with {} layers at {} wavelengths",
            stack.method,
            stack.layers.len(),
            samples.len()
        );
        Ok(Box::new(SpecularSystem { samples }))
    }
}

/// Layer properties at a single wavelength.
#[derive(Debug, Clone, Copy)]
struct LayerSample {
    properties: BandProperties,
    /// Fraction of absorbed power converted to electricity, front and back.
    conversion: (f64, f64),
}

impl LayerSample {
    fn at(material: &Material, wavelength: f64) -> Result<Self> {
        let properties = match material {
            Material::SampleData { rows, .. } => interpolate_rows(rows, wavelength),
            Material::DualBand { solar, visible, .. } => {
                if (VISIBLE_MIN..VISIBLE_MAX).contains(&wavelength) {
                    *visible
                } else {
                    *solar
                }
            }
            Material::SingleBand { properties, .. } => *properties,
            Material::SingleBandBsdf { .. } | Material::DualBandBsdf { .. } => {
                bail!("BSDF material in a specular stack")
            }
            Material::Photovoltaic {
                base,
                eqe_front,
                eqe_back,
                power,
            } => {
                let base = LayerSample::at(base, wavelength)?;
                let factor = power.voc * power.ff * wavelength / HC_EV_UM;
                let front = spectrum::interpolate(eqe_front, wavelength) * factor;
                let back = spectrum::interpolate(eqe_back, wavelength) * factor;
                return Ok(Self {
                    properties: base.properties,
                    conversion: (front.clamp(0.0, 1.0), back.clamp(0.0, 1.0)),
                });
            }
        };
        Ok(Self {
            properties,
            conversion: (0.0, 0.0),
        })
    }

    fn flipped(&self) -> Self {
        Self {
            properties: self.properties.flipped(),
            conversion: (self.conversion.1, self.conversion.0),
        }
    }
}

fn interpolate_rows(rows: &[WavelengthRow], wavelength: f64) -> BandProperties {
    let of = |row: &WavelengthRow| BandProperties::new(row.tf, row.tb, row.rf, row.rb);
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return BandProperties::new(0.0, 0.0, 0.0, 0.0);
    };
    if wavelength <= first.wavelength {
        return of(first);
    }
    if wavelength >= last.wavelength {
        return of(last);
    }
    let i = rows.partition_point(|row| row.wavelength <= wavelength);
    let (a, b) = (&rows[i - 1], &rows[i]);
    let span = b.wavelength - a.wavelength;
    if span.abs() < f64::EPSILON {
        return of(a);
    }
    let t = (wavelength - a.wavelength) / span;
    let lerp = |x: f64, y: f64| x + (y - x) * t;
    BandProperties::new(
        lerp(a.tf, b.tf),
        lerp(a.tb, b.tb),
        lerp(a.rf, b.rf),
        lerp(a.rb, b.rb),
    )
}

/// Two layers in series, `a` facing outdoors.
fn combine(a: &BandProperties, b: &BandProperties) -> BandProperties {
    let denom = (1.0 - a.rb * b.rf).max(f64::EPSILON);
    BandProperties::new(
        a.tf * b.tf / denom,
        a.tb * b.tb / denom,
        a.rf + a.tf * a.tb * b.rf / denom,
        b.rb + b.tb * b.tf * a.rb / denom,
    )
}

/// Properties of every sub-stack starting at layer `j`, with an empty
/// (non-reflecting) stack appended.
fn tail_stacks(layers: &[BandProperties]) -> Vec<BandProperties> {
    let n = layers.len();
    let mut tails = vec![BandProperties::new(1.0, 1.0, 0.0, 0.0); n + 1];
    for j in (0..n).rev() {
        tails[j] = combine(&layers[j], &tails[j + 1]);
    }
    tails
}

/// Absorbed fraction per layer for unit flux incident on the first layer.
fn absorptances(layers: &[BandProperties]) -> Vec<f64> {
    let tails = tail_stacks(layers);
    let mut absorbed = Vec::with_capacity(layers.len());
    let mut incoming = 1.0;
    for (j, layer) in layers.iter().enumerate() {
        let reflected = tails[j].rf * incoming;
        let denom = (1.0 - layer.rb * tails[j + 1].rf).max(f64::EPSILON);
        let transmitted = layer.tf * incoming / denom;
        let returned = tails[j + 1].rf * transmitted;
        absorbed.push((incoming - reflected + returned - transmitted).max(0.0));
        incoming = transmitted;
    }
    absorbed
}

#[derive(Debug, Clone)]
struct SpectralSample {
    wavelength: f64,
    weight: f64,
    system: BandProperties,
    /// (total, electricity) per layer for front incidence.
    front: Vec<(f64, f64)>,
    /// (total, electricity) per layer for back incidence.
    back: Vec<(f64, f64)>,
}

impl SpectralSample {
    fn solve(wavelength: f64, weight: f64, layers: &[LayerSample]) -> Self {
        let properties: Vec<BandProperties> = layers.iter().map(|l| l.properties).collect();
        let system = tail_stacks(&properties)[0];

        let front = absorptances(&properties)
            .into_iter()
            .zip(layers)
            .map(|(a, l)| (a, a * l.conversion.0))
            .collect();

        let reversed: Vec<LayerSample> = layers.iter().rev().map(LayerSample::flipped).collect();
        let reversed_properties: Vec<BandProperties> =
            reversed.iter().map(|l| l.properties).collect();
        let mut back: Vec<(f64, f64)> = absorptances(&reversed_properties)
            .into_iter()
            .zip(&reversed)
            .map(|(a, l)| (a, a * l.conversion.0))
            .collect();
        back.reverse();

        Self {
            wavelength,
            weight,
            system,
            front,
            back,
        }
    }
}

struct SpecularSystem {
    samples: Vec<SpectralSample>,
}

impl OpticalSystem for SpecularSystem {
    fn results(&self, range: LambdaRange, _theta: f64, _phi: f64) -> Result<OpticalResults> {
        let tolerance = 1e-9;
        let selected: Vec<&SpectralSample> = self
            .samples
            .iter()
            .filter(|s| range.contains(s.wavelength, tolerance))
            .collect();
        let total_weight: f64 = selected.iter().map(|s| s.weight).sum();
        ensure!(
            total_weight > 0.0,
            "no weighted samples inside {range}"
        );
        let average = |f: &dyn Fn(&SpectralSample) -> f64| {
            selected.iter().map(|s| s.weight * f(s)).sum::<f64>() / total_weight
        };

        let side = |t: f64, r: f64| SideResults {
            transmittance: specular(t),
            reflectance: specular(r),
        };
        let system = SystemResults {
            front: side(average(&|s| s.system.tf), average(&|s| s.system.rf)),
            back: side(average(&|s| s.system.tb), average(&|s| s.system.rb)),
        };

        let layer_count = self.samples.first().map_or(0, |s| s.front.len());
        let layers = (0..layer_count)
            .map(|j| {
                let front = components(
                    average(&|s| s.front[j].0),
                    average(&|s| s.front[j].1),
                );
                let back = components(average(&|s| s.back[j].0), average(&|s| s.back[j].1));
                LayerAbsorptance {
                    front_direct: front,
                    front_diffuse: front,
                    back_direct: back,
                    back_diffuse: back,
                }
            })
            .collect();

        Ok(OpticalResults {
            system,
            layers,
            bsdf: None,
        })
    }
}

/// A specular layer scatters nothing: all transmitted or reflected light stays
/// in the direct beam, and diffuse incidence behaves like direct incidence.
fn specular(value: f64) -> DirectionalResults<f64> {
    DirectionalResults {
        direct_direct: value,
        direct_diffuse: 0.0,
        direct_hemispherical: value,
        diffuse_diffuse: value,
    }
}

fn components(total: f64, electricity: f64) -> AbsorptanceComponents {
    AbsorptanceComponents {
        total,
        heat: total - electricity,
        electricity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::optics::data::{MaterialClass, PowerProperties};
    use crate::optics::material::ScatteringLayer;
    use crate::optics::standard::Integration;

    fn single_band(tf: f64, rf: f64) -> Arc<ScatteringLayer> {
        Arc::new(ScatteringLayer::Specular(Material::SingleBand {
            properties: BandProperties::new(tf, tf, rf, rf),
            range: LambdaRange::new(0.3, 2.5),
        }))
    }

    fn stack(layers: Vec<Arc<ScatteringLayer>>) -> OpticalStack {
        let wavelengths = vec![0.5, 1.0, 1.5];
        OpticalStack {
            method: "SOLAR".to_string(),
            layers,
            kind: StackKind::Specular,
            range: LambdaRange::new(0.5, 1.5),
            source: wavelengths.iter().map(|&w| (w, 1.0)).collect(),
            detector: wavelengths.iter().map(|&w| (w, 1.0)).collect(),
            wavelengths,
            integration: Integration::default(),
        }
    }

    #[test]
    fn test_two_layer_series() {
        let system = ReferenceOptics
            .assemble(&stack(vec![single_band(0.8, 0.1), single_band(0.8, 0.1)]))
            .unwrap();
        let r = system.results(LambdaRange::new(0.5, 1.5), 0.0, 0.0).unwrap();
        let t = r.system.front.transmittance.direct_direct;
        assert!((t - 0.64 / 0.99).abs() < 1e-12);

        // Energy is conserved for front incidence.
        let absorbed: f64 = r.layers.iter().map(|l| l.front_direct.total).sum();
        let rf = r.system.front.reflectance.direct_direct;
        assert!((t + rf + absorbed - 1.0).abs() < 1e-12);
        assert_eq!(r.layers.len(), 2);
        assert!(r.layers[0].front_direct.total > r.layers[1].front_direct.total);
    }

    #[test]
    fn test_back_incidence_mirrors_symmetric_stack() {
        let system = ReferenceOptics
            .assemble(&stack(vec![single_band(0.7, 0.2), single_band(0.9, 0.05)]))
            .unwrap();
        let r = system.results(LambdaRange::new(0.5, 1.5), 0.0, 0.0).unwrap();
        let front = r.system.front.transmittance.direct_direct;
        let back = r.system.back.transmittance.direct_direct;
        assert!((front - back).abs() < 1e-12);
        let absorbed: f64 = r.layers.iter().map(|l| l.back_direct.total).sum();
        let rb = r.system.back.reflectance.direct_direct;
        assert!((back + rb + absorbed - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bsdf_stack() {
        use crate::optics::data::{BsdfBasis, BsdfHemisphere};
        let mut s = stack(vec![single_band(0.8, 0.1)]);
        s.kind = StackKind::Bsdf(BsdfHemisphere::new(BsdfBasis::Quarter));
        assert!(ReferenceOptics.assemble(&s).is_err());
    }

    #[test]
    fn test_spectral_rows_are_interpolated() {
        let rows = vec![
            WavelengthRow::new(0.4, 0.2, 0.2, 0.1, 0.1),
            WavelengthRow::new(0.6, 0.6, 0.6, 0.1, 0.1),
        ];
        let p = interpolate_rows(&rows, 0.5);
        assert!((p.tf - 0.4).abs() < 1e-12);
        assert!((interpolate_rows(&rows, 0.9).tf - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_photovoltaic_split() {
        let base = Material::SampleData {
            rows: vec![
                WavelengthRow::new(0.5, 0.0, 0.0, 0.0, 0.0),
                WavelengthRow::new(1.5, 0.0, 0.0, 0.0, 0.0),
            ],
            range: LambdaRange::new(0.5, 1.5),
            integration: Integration::default(),
            class: MaterialClass::Monolithic,
        };
        let layer = Arc::new(ScatteringLayer::Specular(Material::Photovoltaic {
            base: Box::new(base),
            eqe_front: vec![(0.5, 0.8), (1.5, 0.8)],
            eqe_back: vec![(0.5, 0.0), (1.5, 0.0)],
            power: PowerProperties {
                jsc: 200.0,
                voc: 0.6,
                ff: 0.75,
            },
        }));
        let system = ReferenceOptics.assemble(&stack(vec![layer])).unwrap();
        let r = system.results(LambdaRange::new(0.5, 1.5), 0.0, 0.0).unwrap();
        let front = r.layers[0].front_direct;
        assert!((front.total - 1.0).abs() < 1e-12);
        assert!(front.electricity > 0.0);
        assert!((front.heat + front.electricity - front.total).abs() < 1e-12);
        assert_eq!(r.layers[0].back_direct.electricity, 0.0);
    }
}
