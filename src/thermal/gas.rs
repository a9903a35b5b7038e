use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fill gases with linear conductivity fits `k = a + b * T` (ISO 15099, T in K).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gas {
    Air,
    Argon,
    Krypton,
    Xenon,
}

impl Gas {
    /// Thermal conductivity [W/(m*K)] at `temperature` [K].
    pub fn conductivity(&self, temperature: f64) -> f64 {
        let (a, b) = match self {
            Gas::Air => (2.873e-3, 7.760e-5),
            Gas::Argon => (2.285e-3, 5.149e-5),
            Gas::Krypton => (9.443e-4, 2.826e-5),
            Gas::Xenon => (4.538e-4, 1.723e-5),
        };
        a + b * temperature
    }
}

/// A single gas or a percentage-weighted blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GasFill {
    Single(Gas),
    /// (gas, percent) pairs; percentages must sum to 100.
    Mixture(Vec<(Gas, f64)>),
}

/// Resolved gas blend as (gas, fraction) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct GasMixture {
    pub components: Vec<(Gas, f64)>,
}

impl GasMixture {
    /// Fraction-weighted conductivity [W/(m*K)].
    pub fn conductivity(&self, temperature: f64) -> f64 {
        self.components
            .iter()
            .map(|(gas, fraction)| fraction * gas.conductivity(temperature))
            .sum()
    }
}

impl GasFill {
    pub fn resolve(&self) -> Result<GasMixture> {
        match self {
            GasFill::Single(gas) => Ok(GasMixture {
                components: vec![(*gas, 1.0)],
            }),
            GasFill::Mixture(parts) => {
                if parts.is_empty() {
                    return Err(Error::invalid("gas mixture has no components"));
                }
                if let Some((gas, pct)) = parts.iter().find(|(_, pct)| *pct < 0.0) {
                    return Err(Error::invalid(format!(
                        "gas mixture component {gas:?} has negative share {pct}%"
                    )));
                }
                let total: f64 = parts.iter().map(|(_, pct)| pct).sum();
                if (total - 100.0).abs() > 1e-6 {
                    return Err(Error::invalid(format!(
                        "gas mixture percentages sum to {total}, expected 100"
                    )));
                }
                Ok(GasMixture {
                    components: parts.iter().map(|&(gas, pct)| (gas, pct / 100.0)).collect(),
                })
            }
        }
    }
}

/// Support pillars bridging a (typically evacuated) gap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pillar {
    Cylindrical {
        conductivity: f64,
        /// Center-to-center distance on a square grid [m].
        spacing: f64,
        radius: f64,
    },
    Rectangular {
        conductivity: f64,
        spacing: f64,
        length: f64,
        width: f64,
    },
}

impl Pillar {
    /// Conductance per unit glazing area [W/(m^2*K)].
    ///
    /// Uses `2 k a / s^2` with `a` the contact radius; rectangular pillars use
    /// the radius of the disc with the same contact area.
    pub fn conductance(&self) -> f64 {
        let (k, s, a) = match *self {
            Pillar::Cylindrical {
                conductivity,
                spacing,
                radius,
            } => (conductivity, spacing, radius),
            Pillar::Rectangular {
                conductivity,
                spacing,
                length,
                width,
            } => (
                conductivity,
                spacing,
                (length * width / std::f64::consts::PI).sqrt(),
            ),
        };
        if s <= 0.0 {
            return 0.0;
        }
        2.0 * k * a / (s * s)
    }
}

/// Gap definition between two solid layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// Thickness [m].
    pub thickness: f64,
    pub gas: GasFill,
    #[serde(default)]
    pub pillar: Option<Pillar>,
}

impl Gap {
    pub fn new(thickness: f64, gas: GasFill) -> Self {
        Self {
            thickness,
            gas,
            pillar: None,
        }
    }

    pub fn air(thickness: f64) -> Self {
        Self::new(thickness, GasFill::Single(Gas::Air))
    }

    pub fn with_pillar(mut self, pillar: Pillar) -> Self {
        self.pillar = Some(pillar);
        self
    }
}
