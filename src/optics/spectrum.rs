//! Spectrum materialization and spectral integration helpers.

use super::standard::{Integration, IntegrationRule, SpectrumSpec};

/// First radiation constant for spectral exitance [W*um^4/m^2].
const C1: f64 = 3.741_771_852e8;
/// Second radiation constant [um*K].
const C2: f64 = 14_387.768_8;

/// Tabulated spectral series as (wavelength, value) pairs, sorted by wavelength.
pub type Series = Vec<(f64, f64)>;

/// Linear interpolation in a sorted series, clamped at both ends.
pub fn interpolate(series: &[(f64, f64)], x: f64) -> f64 {
    let Some(&(x0, y0)) = series.first() else {
        return 0.0;
    };
    if x <= x0 {
        return y0;
    }
    let Some(&(xn, yn)) = series.last() else {
        return 0.0;
    };
    if x >= xn {
        return yn;
    }
    let i = series.partition_point(|&(xi, _)| xi <= x);
    let (xa, ya) = series[i - 1];
    let (xb, yb) = series[i];
    if (xb - xa).abs() < f64::EPSILON {
        return ya;
    }
    ya + (yb - ya) * (x - xa) / (xb - xa)
}

/// Planck spectral exitance at `wavelength` [um] and `temperature` [K].
pub fn blackbody(wavelength: f64, temperature: f64) -> f64 {
    if wavelength <= 0.0 || temperature <= 0.0 {
        return 0.0;
    }
    C1 / (wavelength.powi(5) * ((C2 / (wavelength * temperature)).exp() - 1.0))
}

/// Krochmann relative damage factor, `exp(-0.012 * nm)`.
pub fn krochmann(wavelength: f64) -> f64 {
    (-12.0 * wavelength).exp()
}

/// Wavelengths defined by a tabulated spectrum, if the spectrum is tabulated.
pub fn tabulated_wavelengths(spec: &SpectrumSpec) -> Option<Vec<f64>> {
    match spec {
        SpectrumSpec::Data(rows) => Some(rows.iter().map(|&(w, _)| w).collect()),
        _ => None,
    }
}

/// Evaluates a spectrum at each of `wavelengths`.
///
/// `SpectrumSpec::None` is a flat, unit weighting.
pub fn materialize(spec: &SpectrumSpec, wavelengths: &[f64]) -> Series {
    wavelengths
        .iter()
        .map(|&w| {
            let value = match spec {
                SpectrumSpec::None => 1.0,
                SpectrumSpec::Blackbody { temperature } => blackbody(w, *temperature),
                SpectrumSpec::UvAction { a, b } => (a - b * w).exp(),
                SpectrumSpec::Krochmann => krochmann(w),
                SpectrumSpec::Data(rows) => interpolate(rows, w),
            };
            (w, value)
        })
        .collect()
}

/// Per-sample integration weights (effective band widths).
///
/// The rectangular rule assigns each sample the interval to its right, so the
/// last sample carries no weight. With linearly interpolated data the centroid
/// rule coincides with the trapezoidal one.
pub fn integration_weights(wavelengths: &[f64], integration: &Integration) -> Vec<f64> {
    let n = wavelengths.len();
    if n < 2 {
        return vec![integration.normalization; n];
    }
    let widths: Vec<f64> = wavelengths.windows(2).map(|w| w[1] - w[0]).collect();
    let weights = match integration.rule {
        IntegrationRule::Rectangular => {
            let mut w = widths.clone();
            w.push(0.0);
            w
        }
        IntegrationRule::Trapezoidal | IntegrationRule::RectangularCentroid => (0..n)
            .map(|i| {
                let left = if i > 0 { widths[i - 1] } else { 0.0 };
                let right = if i < n - 1 { widths[i] } else { 0.0 };
                0.5 * (left + right)
            })
            .collect(),
    };
    weights
        .into_iter()
        .map(|w| w * integration.normalization)
        .collect()
}
