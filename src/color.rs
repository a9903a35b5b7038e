//! Colorimetry from the three tristimulus methods.
//!
//! The optical backend reports each tristimulus method as a source and
//! detector weighted average. Scaling those averages by the method's spectral
//! weight, relative to the Y method's, gives CIE tristimulus values with the
//! illuminant white at `Y = 100`.

use crate::backend::{OpticalStack, SystemResults};
use crate::error::{Error, Result};
use crate::optics::spectrum;
use crate::optics::wavelength::LambdaRange;

/// Results of one tristimulus method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TristimulusInput {
    pub range: LambdaRange,
    /// Source times detector integrated over the method's grid.
    pub spectral_weight: f64,
    pub results: SystemResults<f64>,
}

/// Source times detector times band width, summed over the stack grid.
pub fn spectral_weight(stack: &OpticalStack) -> f64 {
    let weights = spectrum::integration_weights(&stack.wavelengths, &stack.integration);
    stack
        .wavelengths
        .iter()
        .zip(weights)
        .filter(|&(&w, _)| stack.range.contains(w, 1e-9))
        .map(|(&w, weight)| {
            weight * spectrum::interpolate(&stack.source, w) * spectrum::interpolate(&stack.detector, w)
        })
        .sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trichromatic {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// 8-bit sRGB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorValues {
    pub trichromatic: Trichromatic,
    pub lab: Lab,
    pub rgb: Rgb,
}

pub type ColorResults = SystemResults<ColorValues>;

/// Color of every transmittance and reflectance of the system.
///
/// All three methods must share one wavelength range.
pub fn color_results(
    x: &TristimulusInput,
    y: &TristimulusInput,
    z: &TristimulusInput,
    tolerance: f64,
) -> Result<ColorResults> {
    if !x.range.approx_eq(&y.range, tolerance) || !x.range.approx_eq(&z.range, tolerance) {
        return Err(Error::ColorRangeMismatch {
            x: x.range,
            y: y.range,
            z: z.range,
        });
    }
    if y.spectral_weight <= 0.0 {
        return Err(Error::invalid(
            "tristimulus Y method has no spectral weight",
        ));
    }
    let white = Trichromatic {
        x: 100.0 * x.spectral_weight / y.spectral_weight,
        y: 100.0,
        z: 100.0 * z.spectral_weight / y.spectral_weight,
    };
    Ok(x.results
        .zip(y.results)
        .zip(z.results)
        .map(|((rx, ry), rz)| {
            let trichromatic = Trichromatic {
                x: rx * white.x,
                y: ry * white.y,
                z: rz * white.z,
            };
            ColorValues {
                trichromatic,
                lab: lab(&trichromatic, &white),
                rgb: srgb(&trichromatic),
            }
        }))
}

/// CIE 1976 L*a*b* relative to `white`.
pub fn lab(color: &Trichromatic, white: &Trichromatic) -> Lab {
    let f = |t: f64| {
        const DELTA: f64 = 6.0 / 29.0;
        if t > DELTA.powi(3) {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };
    let ratio = |v: f64, w: f64| if w > 0.0 { v / w } else { 0.0 };
    let fx = f(ratio(color.x, white.x));
    let fy = f(ratio(color.y, white.y));
    let fz = f(ratio(color.z, white.z));
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// sRGB for D65-referenced tristimulus values on the `Y = 100` scale.
pub fn srgb(color: &Trichromatic) -> Rgb {
    let (x, y, z) = (color.x / 100.0, color.y / 100.0, color.z / 100.0);
    let linear = [
        3.2406 * x - 1.5372 * y - 0.4986 * z,
        -0.9689 * x + 1.8758 * y + 0.0415 * z,
        0.0557 * x - 0.2040 * y + 1.0570 * z,
    ];
    let encode = |c: f64| {
        let c = c.clamp(0.0, 1.0);
        let v = if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgb {
        r: encode(linear[0]),
        g: encode(linear[1]),
        b: encode(linear[2]),
    }
}
