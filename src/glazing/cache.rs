//! Derived state of a glazing system.
//!
//! Scattering layers are keyed by [`LayerCacheKey`] and survive angle changes.
//! Optical systems, the IGU and thermal systems form a snapshot valid for one
//! incidence angle only.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{OpticalSystem, SystemType, ThermalSystem};
use crate::optics::data::BsdfHemisphere;
use crate::optics::material::ScatteringLayer;
use crate::optics::standard::Method;
use crate::optics::wavelength::{LambdaRange, SpectralRangePolicy, SpectralSampling};
use crate::thermal::Igu;

/// Identity of a calculation as far as scattering layers are concerned: two
/// requests with equal keys can share the same layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerCacheKey {
    pub method: String,
    pub policy: SpectralRangePolicy,
    pub visible_bands: usize,
    pub solar_bands: usize,
    /// Zero without a BSDF hemisphere.
    pub bsdf_directions: usize,
}

impl LayerCacheKey {
    pub fn new(
        method: &Method,
        sampling: &SpectralSampling,
        hemisphere: Option<BsdfHemisphere>,
    ) -> Self {
        Self {
            method: method.name.clone(),
            policy: sampling.policy,
            visible_bands: sampling.visible_bands,
            solar_bands: sampling.solar_bands,
            bsdf_directions: hemisphere.map_or(0, |h| h.direction_count()),
        }
    }
}

/// Number of times each kind of derived state was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub layer_builds: usize,
    pub optical_builds: usize,
    pub igu_builds: usize,
    pub thermal_builds: usize,
}

/// An optical system together with what was known about its stack.
pub(crate) struct AssembledOptics {
    pub(crate) system: Box<dyn OpticalSystem>,
    pub(crate) range: LambdaRange,
    /// Source times detector integrated over the stack grid.
    pub(crate) spectral_weight: f64,
}

/// State valid for one incidence angle.
#[derive(Default)]
pub(crate) struct Snapshot {
    /// Incidence angle (theta, phi) the state below was built for.
    angle: Option<(f64, f64)>,
    pub(crate) optical: HashMap<LayerCacheKey, AssembledOptics>,
    pub(crate) igu: Option<Igu>,
    pub(crate) thermal: HashMap<SystemType, Box<dyn ThermalSystem>>,
}

#[derive(Default)]
pub(crate) struct SystemCache {
    pub(crate) layers: HashMap<LayerCacheKey, Vec<Arc<ScatteringLayer>>>,
    pub(crate) snapshot: Snapshot,
    pub(crate) stats: CacheStats,
}

impl SystemCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drops every derived value, scattering layers included.
    pub(crate) fn invalidate_all(&mut self) {
        self.layers.clear();
        self.invalidate_snapshot();
    }

    /// Drops the angle snapshot and keeps scattering layers.
    pub(crate) fn invalidate_snapshot(&mut self) {
        self.snapshot = Snapshot::default();
    }

    /// Drops thermal systems only.
    pub(crate) fn invalidate_thermal(&mut self) {
        self.snapshot.thermal.clear();
    }

    /// Makes the snapshot refer to (`theta`, `phi`).
    ///
    /// A snapshot built for another angle is handed back so that a failed
    /// request can [`restore`](Self::restore) it.
    pub(crate) fn enter_angle(&mut self, theta: f64, phi: f64) -> Option<Snapshot> {
        if self.snapshot.angle == Some((theta, phi)) {
            return None;
        }
        if let Some((old_theta, old_phi)) = self.snapshot.angle {
            log::debug!("incidence moved from ({old_theta}, {old_phi}) to ({theta}, {phi})");
        }
        let previous = std::mem::take(&mut self.snapshot);
        self.snapshot.angle = Some((theta, phi));
        Some(previous)
    }

    /// Reinstates a snapshot returned by [`enter_angle`](Self::enter_angle),
    /// discarding whatever was built since.
    pub(crate) fn restore(&mut self, previous: Snapshot) {
        log::debug!("request failed, restoring snapshot for {:?}", previous.angle);
        self.snapshot = previous;
    }
}
