//! Wavelength range and sample-set resolution.
//!
//! A method declares its wavelength limits either as literal numbers or as
//! "whatever the wavelength set says". The wavelength set in turn comes from a
//! literal list, from the tabulated source spectrum, or from the measured data
//! of the layers being evaluated. For a stack of layers only the intersection
//! of the per-layer ranges is usable.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::data::OpticalData;
use super::spectrum;
use super::standard::{Method, WavelengthBoundary, WavelengthSet};
use crate::error::{Error, Result};

pub const SOLAR_MIN: f64 = 0.30;
pub const VISIBLE_MIN: f64 = 0.38;
pub const VISIBLE_MAX: f64 = 0.78;
pub const SOLAR_MAX: f64 = 2.50;

/// Resolved `[min, max]` wavelength pair in micrometers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LambdaRange {
    pub min: f64,
    pub max: f64,
}

impl LambdaRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// An empty or inverted range cannot be integrated over.
    pub fn is_valid(&self) -> bool {
        self.max > self.min
    }

    /// Tightest range covered by both `self` and `other`.
    pub fn intersect(&self, other: &LambdaRange) -> LambdaRange {
        LambdaRange::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// Whether `self` (measured coverage) spans `required` within `tolerance`.
    pub fn covers(&self, required: &LambdaRange, tolerance: f64) -> bool {
        self.min <= required.min + tolerance && self.max >= required.max - tolerance
    }

    pub fn contains(&self, wavelength: f64, tolerance: f64) -> bool {
        wavelength >= self.min - tolerance && wavelength <= self.max + tolerance
    }

    pub fn approx_eq(&self, other: &LambdaRange, tolerance: f64) -> bool {
        (self.min - other.min).abs() <= tolerance && (self.max - other.max).abs() <= tolerance
    }
}

impl fmt::Display for LambdaRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}] um", self.min, self.max)
    }
}

/// How the sample wavelengths of a calculation are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralRangePolicy {
    /// The method's own wavelength set.
    Full,
    /// The fixed ISO 9050 wavelength list.
    Iso9050,
    /// A small number of representative visible and solar bands.
    Condensed,
}

/// Sample-set policy plus the band counts used by [`SpectralRangePolicy::Condensed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpectralSampling {
    pub policy: SpectralRangePolicy,
    pub visible_bands: usize,
    pub solar_bands: usize,
}

impl SpectralSampling {
    pub fn new(policy: SpectralRangePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn condensed(visible_bands: usize, solar_bands: usize) -> Self {
        Self {
            policy: SpectralRangePolicy::Condensed,
            visible_bands,
            solar_bands,
        }
    }
}

impl Default for SpectralSampling {
    fn default() -> Self {
        Self {
            policy: SpectralRangePolicy::Full,
            visible_bands: 5,
            solar_bands: 10,
        }
    }
}

#[derive(Clone, Copy)]
enum End {
    First,
    Last,
}

/// The method's wavelength set as applied to one layer.
fn wavelength_set(method: &Method, layer: &OpticalData) -> Result<Vec<f64>> {
    let set = match &method.wavelength_set {
        WavelengthSet::File(values) => values.clone(),
        // Parametric sources are materialized on the measured grid.
        WavelengthSet::Source => spectrum::tabulated_wavelengths(&method.source)
            .unwrap_or_else(|| layer.measured_wavelengths()),
        WavelengthSet::Data => layer.measured_wavelengths(),
    };
    if set.is_empty() {
        return Err(Error::missing(
            "wavelength set",
            format!("method {}", method.name),
        ));
    }
    Ok(set)
}

fn boundary(
    boundary: WavelengthBoundary,
    end: End,
    method: &Method,
    layer: &OpticalData,
) -> Result<f64> {
    match boundary {
        WavelengthBoundary::Number(value) => Ok(value),
        WavelengthBoundary::WavelengthSet => {
            if let WavelengthSet::Data = method.wavelength_set {
                let domain = layer.wavelength_domain().ok_or_else(|| {
                    Error::missing("measured wavelength domain", method.name.clone())
                })?;
                return Ok(match end {
                    End::First => domain.min,
                    End::Last => domain.max,
                });
            }
            let set = wavelength_set(method, layer)?;
            let value = match end {
                End::First => set.first(),
                End::Last => set.last(),
            };
            value
                .copied()
                .ok_or_else(|| Error::missing("wavelength set", method.name.clone()))
        }
    }
}

/// Wavelength range of `method` applied to a single layer.
///
/// The returned range may be invalid (`max <= min`); callers decide whether
/// that is fatal.
pub fn lambda_range(method: &Method, layer: &OpticalData) -> Result<LambdaRange> {
    Ok(LambdaRange::new(
        boundary(method.min_wavelength, End::First, method, layer)?,
        boundary(method.max_wavelength, End::Last, method, layer)?,
    ))
}

/// Wavelength range usable by every layer of a stack: the largest minimum and
/// the smallest maximum.
pub fn multi_layer_lambda_range(method: &Method, layers: &[&OpticalData]) -> Result<LambdaRange> {
    let mut ranges = layers.iter().map(|layer| lambda_range(method, layer));
    let first = ranges
        .next()
        .ok_or_else(|| Error::invalid("a wavelength range needs at least one layer"))??;
    ranges.try_fold(first, |acc, range| Ok(acc.intersect(&range?)))
}

/// Band edges of the condensed spectrum.
///
/// One band below the visible, `visible_bands` evenly spaced visible bands and
/// the remaining solar bands spread over the near infrared.
pub fn condensed_wavelengths(visible_bands: usize, solar_bands: usize) -> Vec<f64> {
    let visible_bands = visible_bands.max(1);
    let infrared_bands = solar_bands.saturating_sub(visible_bands + 1).max(1);
    let mut wavelengths = vec![SOLAR_MIN];
    let step = (VISIBLE_MAX - VISIBLE_MIN) / visible_bands as f64;
    wavelengths.extend((0..=visible_bands).map(|i| VISIBLE_MIN + step * i as f64));
    let step = (SOLAR_MAX - VISIBLE_MAX) / infrared_bands as f64;
    wavelengths.extend((1..=infrared_bands).map(|i| VISIBLE_MAX + step * i as f64));
    wavelengths
}

/// Wavelength list of ISO 9050.
pub fn iso_9050_wavelengths() -> Vec<f64> {
    let mut wavelengths: Vec<f64> = (0..=20).map(|i| 0.300 + 0.005 * i as f64).collect();
    wavelengths.extend((1..=60).map(|i| 0.400 + 0.010 * i as f64));
    wavelengths.extend((1..=30).map(|i| 1.000 + 0.050 * i as f64));
    wavelengths
}

/// Sample wavelengths of `method` for one layer, before range clipping.
pub fn sample_wavelengths(
    method: &Method,
    layer: &OpticalData,
    sampling: &SpectralSampling,
) -> Result<Vec<f64>> {
    match sampling.policy {
        SpectralRangePolicy::Full => wavelength_set(method, layer),
        SpectralRangePolicy::Iso9050 => Ok(iso_9050_wavelengths()),
        SpectralRangePolicy::Condensed => Ok(condensed_wavelengths(
            sampling.visible_bands,
            sampling.solar_bands,
        )),
    }
}

/// Sorted union of several wavelength sets, merging values closer than `tolerance`.
pub fn merge_wavelengths(sets: &[Vec<f64>], tolerance: f64) -> Vec<f64> {
    let mut all: Vec<f64> = sets.iter().flatten().copied().collect();
    all.sort_by(f64::total_cmp);
    all.dedup_by(|b, a| (*b - *a).abs() <= tolerance);
    all
}

/// Common sample grid of a stack, clipped to `range`.
pub fn multi_layer_sample_wavelengths(
    method: &Method,
    layers: &[&OpticalData],
    sampling: &SpectralSampling,
    range: &LambdaRange,
    tolerance: f64,
) -> Result<Vec<f64>> {
    let sets = layers
        .iter()
        .map(|layer| sample_wavelengths(method, layer, sampling))
        .collect::<Result<Vec<_>>>()?;
    Ok(merge_wavelengths(&sets, tolerance)
        .into_iter()
        .filter(|&w| range.contains(w, tolerance))
        .collect())
}
