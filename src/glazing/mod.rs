//! The glazing system: configuration plus lazily built solver state.
//!
//! Every accessor asks the cache whether state for the requested incidence
//! angle exists and builds only what is missing. Mutators invalidate exactly
//! the state they affect.

mod cache;

use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::assembly::{self, InfraredProperties, ProductLayer};
use crate::backend::{
    DeflectionResults, LayerAbsorptance, OpticalBackend, OpticalResults, SystemType,
    ThermalBackend, ThermalRequest, ThermalSystem,
};
use crate::color::{self, ColorResults, TristimulusInput};
use crate::config::CalcOptions;
use crate::error::{Error, Result};
use crate::optics::data::{BsdfHemisphere, OpticalData};
use crate::optics::factory::LayerFactory;
use crate::optics::standard::{Method, MethodType, Standard};
use crate::optics::wavelength::SpectralSampling;
use crate::reference::{ReferenceOptics, ReferenceThermal};
use crate::thermal::environment::{nfrc_shgc_environments, nfrc_u_environments};
use crate::thermal::{DeflectionConfig, DeflectionState, Environments, Gap, Igu};

use cache::{AssembledOptics, SystemCache};
pub use cache::{CacheStats, LayerCacheKey};

/// Seal conditions assumed when deflection is enabled without explicit ones.
const DEFAULT_SEAL_TEMPERATURE: f64 = 293.15;
const DEFAULT_SEAL_PRESSURE: f64 = 101_325.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GlazingSystemConfig {
    /// Product layers, outdoor side first.
    pub layers: Vec<ProductLayer>,
    pub gaps: Vec<Gap>,
    pub standard: Standard,
    /// [m]
    pub width: f64,
    /// [m]
    pub height: f64,
    /// Tilt from horizontal [deg].
    pub tilt: f64,
    pub u_environments: Environments,
    pub shgc_environments: Environments,
    pub sampling: SpectralSampling,
    pub bsdf_hemisphere: Option<BsdfHemisphere>,
    pub deflection: DeflectionState,
    pub options: CalcOptions,
}

impl GlazingSystemConfig {
    /// A vertical 1 m x 1 m glazing under NFRC conditions.
    pub fn new(layers: Vec<ProductLayer>, gaps: Vec<Gap>, standard: Standard) -> Self {
        Self {
            layers,
            gaps,
            standard,
            width: 1.0,
            height: 1.0,
            tilt: 90.0,
            u_environments: nfrc_u_environments(),
            shgc_environments: nfrc_shgc_environments(),
            sampling: SpectralSampling::default(),
            bsdf_hemisphere: None,
            deflection: DeflectionState::default(),
            options: CalcOptions::default(),
        }
    }

    fn environments(&self, system_type: SystemType) -> &Environments {
        match system_type {
            SystemType::U => &self.u_environments,
            SystemType::Shgc => &self.shgc_environments,
        }
    }
}

pub struct GlazingSystem {
    config: GlazingSystemConfig,
    optics: Box<dyn OpticalBackend>,
    thermal: Box<dyn ThermalBackend>,
    cache: SystemCache,
}

impl GlazingSystem {
    /// Glazing system solved with the reference backends.
    pub fn new(config: GlazingSystemConfig) -> Result<Self> {
        Self::with_backends(
            config,
            Box::new(ReferenceOptics),
            Box::new(ReferenceThermal::new()),
        )
    }

    pub fn with_backends(
        config: GlazingSystemConfig,
        optics: Box<dyn OpticalBackend>,
        thermal: Box<dyn ThermalBackend>,
    ) -> Result<Self> {
        if config.layers.is_empty() {
            return Err(Error::invalid("a glazing system needs at least one layer"));
        }
        if config.layers.len() != config.gaps.len() + 1 {
            return Err(Error::invalid(format!(
                "{} layers need {} gaps, got {}",
                config.layers.len(),
                config.layers.len() - 1,
                config.gaps.len()
            )));
        }
        if config.width <= 0.0 || config.height <= 0.0 {
            return Err(Error::invalid(format!(
                "glazing dimensions must be positive, got {} x {} m",
                config.width, config.height
            )));
        }
        Ok(Self {
            config,
            optics,
            thermal,
            cache: SystemCache::new(),
        })
    }

    pub fn config(&self) -> &GlazingSystemConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ----- Results -----

    /// System and per-layer optical results of `method_name` at (`theta`, `phi`).
    pub fn optical_method_results(
        &mut self,
        method_name: &str,
        theta: f64,
        phi: f64,
    ) -> Result<OpticalResults> {
        let method = self.config.standard.method(method_name)?.clone();
        self.at_angle(theta, phi, |system| system.method_results(&method, theta, phi))
    }

    pub fn layer_absorptances(
        &mut self,
        method_name: &str,
        theta: f64,
        phi: f64,
    ) -> Result<Vec<LayerAbsorptance>> {
        Ok(self.optical_method_results(method_name, theta, phi)?.layers)
    }

    pub fn color(&mut self, theta: f64, phi: f64) -> Result<ColorResults> {
        self.at_angle(theta, phi, |system| {
            let x = system.tristimulus(MethodType::TristimulusX, theta, phi)?;
            let y = system.tristimulus(MethodType::TristimulusY, theta, phi)?;
            let z = system.tristimulus(MethodType::TristimulusZ, theta, phi)?;
            color::color_results(&x, &y, &z, system.config.options.coverage_tolerance)
        })
    }

    /// U-factor [W/(m^2*K)] under the U environments.
    pub fn u(&mut self, theta: f64, phi: f64) -> Result<f64> {
        self.at_angle(theta, phi, |system| {
            Ok(system.thermal_system(SystemType::U, theta, phi)?.u())
        })
    }

    /// Solar heat gain coefficient under the SHGC environments.
    pub fn shgc(&mut self, theta: f64, phi: f64) -> Result<f64> {
        let method = self
            .config
            .standard
            .method_by_type(MethodType::Solar)?
            .clone();
        self.at_angle(theta, phi, |system| {
            let transmittance = system
                .method_results(&method, theta, phi)?
                .system
                .front
                .transmittance
                .direct_hemispherical;
            Ok(system
                .thermal_system(SystemType::Shgc, theta, phi)?
                .shgc(transmittance))
        })
    }

    /// Front and back surface temperatures of each solid layer [K].
    pub fn layer_temperatures(
        &mut self,
        system_type: SystemType,
        theta: f64,
        phi: f64,
    ) -> Result<Vec<f64>> {
        self.at_angle(theta, phi, |system| {
            Ok(system
                .thermal_system(system_type, theta, phi)?
                .layer_temperatures())
        })
    }

    /// Heat flow into the room [W/m^2].
    pub fn heat_flow(&mut self, system_type: SystemType, theta: f64, phi: f64) -> Result<f64> {
        self.at_angle(theta, phi, |system| {
            Ok(system.thermal_system(system_type, theta, phi)?.heat_flow())
        })
    }

    pub fn solid_layers_effective_conductivities(
        &mut self,
        system_type: SystemType,
        theta: f64,
        phi: f64,
    ) -> Result<Vec<f64>> {
        self.at_angle(theta, phi, |system| {
            Ok(system
                .thermal_system(system_type, theta, phi)?
                .solid_effective_conductivities())
        })
    }

    pub fn gap_layers_effective_conductivities(
        &mut self,
        system_type: SystemType,
        theta: f64,
        phi: f64,
    ) -> Result<Vec<f64>> {
        self.at_angle(theta, phi, |system| {
            Ok(system
                .thermal_system(system_type, theta, phi)?
                .gap_effective_conductivities())
        })
    }

    pub fn deflection_results(
        &mut self,
        system_type: SystemType,
        theta: f64,
        phi: f64,
    ) -> Result<DeflectionResults> {
        self.at_angle(theta, phi, |system| {
            Ok(system.thermal_system(system_type, theta, phi)?.deflection())
        })
    }

    // ----- Mutators -----

    pub fn set_width(&mut self, width: f64) -> Result<()> {
        if width <= 0.0 {
            return Err(Error::invalid(format!("width must be positive, got {width}")));
        }
        self.config.width = width;
        self.cache.invalidate_snapshot();
        Ok(())
    }

    pub fn set_height(&mut self, height: f64) -> Result<()> {
        if height <= 0.0 {
            return Err(Error::invalid(format!("height must be positive, got {height}")));
        }
        self.config.height = height;
        self.cache.invalidate_snapshot();
        Ok(())
    }

    pub fn set_tilt(&mut self, tilt: f64) {
        self.config.tilt = tilt;
        self.cache.invalidate_snapshot();
    }

    pub fn set_u_environments(&mut self, environments: Environments) {
        self.config.u_environments = environments;
        self.cache.invalidate_thermal();
    }

    pub fn set_shgc_environments(&mut self, environments: Environments) {
        self.config.shgc_environments = environments;
        self.cache.invalidate_thermal();
    }

    /// Orients layer `index` back to front (or restores it).
    ///
    /// Shared descriptors are copied before they are changed.
    pub fn flip_layer(&mut self, index: usize, flipped: bool) -> Result<()> {
        let layer = self.layer_mut(index)?;
        Arc::make_mut(&mut layer.optical).flipped = flipped;
        Arc::make_mut(&mut layer.thermal).flipped = flipped;
        self.cache.invalidate_all();
        Ok(())
    }

    pub fn swap_layer(&mut self, index: usize, layer: ProductLayer) -> Result<()> {
        *self.layer_mut(index)? = layer;
        self.cache.invalidate_all();
        Ok(())
    }

    /// Replaces gap `index`, counted from the outdoor side.
    pub fn set_gap(&mut self, index: usize, gap: Gap) -> Result<()> {
        let count = self.config.gaps.len();
        if index >= count {
            return Err(Error::GapIndex { index, count });
        }
        if gap.thickness <= 0.0 {
            return Err(Error::invalid(format!(
                "gap {index} has non-positive thickness {}",
                gap.thickness
            )));
        }
        gap.gas.resolve()?;
        self.config.gaps[index] = gap;
        self.cache.invalidate_snapshot();
        Ok(())
    }

    pub fn set_solid_layer_conductivity(&mut self, index: usize, conductivity: f64) -> Result<()> {
        let layer = self.layer_mut(index)?;
        Arc::make_mut(&mut layer.thermal).conductivity = Some(conductivity);
        self.cache.invalidate_snapshot();
        Ok(())
    }

    pub fn set_spectral_range_policy(&mut self, sampling: SpectralSampling) {
        self.config.sampling = sampling;
        self.cache.invalidate_snapshot();
    }

    pub fn set_bsdf_hemisphere(&mut self, hemisphere: Option<BsdfHemisphere>) {
        self.config.bsdf_hemisphere = hemisphere;
        self.cache.invalidate_snapshot();
    }

    /// Turns deflection on with default seal conditions, or off.
    ///
    /// Enabling keeps an already configured deflection model.
    pub fn enable_deflection(&mut self, enable: bool) {
        let deflection = &mut self.config.deflection;
        if !enable {
            deflection.config = DeflectionConfig::Disabled;
        } else if !deflection.is_enabled() {
            deflection.config = DeflectionConfig::Construction {
                temperature: DEFAULT_SEAL_TEMPERATURE,
                pressure: DEFAULT_SEAL_PRESSURE,
            };
        }
        self.cache.invalidate_thermal();
    }

    /// Temperature [K] and pressure [Pa] at which the gaps were sealed.
    pub fn set_deflection_properties(&mut self, temperature: f64, pressure: f64) -> Result<()> {
        if temperature <= 0.0 || pressure <= 0.0 {
            return Err(Error::invalid(format!(
                "seal conditions must be positive, got {temperature} K and {pressure} Pa"
            )));
        }
        self.config.deflection.config = DeflectionConfig::Construction {
            temperature,
            pressure,
        };
        self.cache.invalidate_thermal();
        Ok(())
    }

    /// Mean deflected width of every gap [m].
    pub fn set_measured_deflected_gaps(&mut self, widths: Vec<f64>) -> Result<()> {
        if widths.len() != self.config.gaps.len() {
            return Err(Error::invalid(format!(
                "{} measured gap widths for {} gaps",
                widths.len(),
                self.config.gaps.len()
            )));
        }
        self.config.deflection.config = DeflectionConfig::Measured(widths);
        self.cache.invalidate_thermal();
        Ok(())
    }

    /// Loads applied to each solid layer [Pa], positive toward the room.
    pub fn set_applied_loads(&mut self, loads: Vec<f64>) -> Result<()> {
        if loads.len() > self.config.layers.len() {
            return Err(Error::invalid(format!(
                "{} applied loads for {} layers",
                loads.len(),
                self.config.layers.len()
            )));
        }
        self.config.deflection.applied_loads = loads;
        self.cache.invalidate_thermal();
        Ok(())
    }

    // ----- Internals -----

    /// Runs `request` against the snapshot for (`theta`, `phi`).
    ///
    /// When the request fails after switching angles, the snapshot of the
    /// previous angle is put back.
    fn at_angle<T>(
        &mut self,
        theta: f64,
        phi: f64,
        request: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = self.cache.enter_angle(theta, phi);
        let result = request(self);
        if let (Err(_), Some(previous)) = (&result, previous) {
            self.cache.restore(previous);
        }
        result
    }

    fn layer_mut(&mut self, index: usize) -> Result<&mut ProductLayer> {
        let count = self.config.layers.len();
        self.config
            .layers
            .get_mut(index)
            .ok_or(Error::LayerIndex { index, count })
    }

    fn method_results(&mut self, method: &Method, theta: f64, phi: f64) -> Result<OpticalResults> {
        let assembled = self.optics(method, theta, phi)?;
        Ok(assembled.system.results(assembled.range, theta, phi)?)
    }

    fn tristimulus(
        &mut self,
        method_type: MethodType,
        theta: f64,
        phi: f64,
    ) -> Result<TristimulusInput> {
        let method = self.config.standard.method_by_type(method_type)?.clone();
        let assembled = self.optics(&method, theta, phi)?;
        Ok(TristimulusInput {
            range: assembled.range,
            spectral_weight: assembled.spectral_weight,
            results: assembled.system.results(assembled.range, theta, phi)?.system,
        })
    }

    /// Optical system of `method` for the current angle, built on a miss.
    fn optics(&mut self, method: &Method, theta: f64, phi: f64) -> Result<&AssembledOptics> {
        let key = LayerCacheKey::new(method, &self.config.sampling, self.config.bsdf_hemisphere);
        let config = &self.config;
        let cache = &mut self.cache;
        let optical: Vec<&OpticalData> = config.layers.iter().map(|l| l.optical.as_ref()).collect();
        let entry = match cache.snapshot.optical.entry(key) {
            Entry::Occupied(entry) => return Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => entry,
        };

        let layers = match cache.layers.entry(entry.key().clone()) {
            Entry::Occupied(layers) => layers.get().clone(),
            Entry::Vacant(slot) => {
                let factory =
                    LayerFactory::new(&config.options, &config.sampling, config.bsdf_hemisphere);
                let built = assembly::scattering_layers(&factory, method, &optical)?;
                cache.stats.layer_builds += 1;
                log::debug!("built {} scattering layers for {}", built.len(), method.name);
                slot.insert(built).clone()
            }
        };

        let stack = assembly::optical_stack(
            method,
            &optical,
            layers,
            &config.sampling,
            &config.options,
            config.bsdf_hemisphere,
        )?;
        let system = self.optics.assemble(&stack)?;
        cache.stats.optical_builds += 1;
        log::debug!("built optical system for {} at ({theta}, {phi})", method.name);
        Ok(&*entry.insert(AssembledOptics {
            system,
            range: stack.range,
            spectral_weight: color::spectral_weight(&stack),
        }))
    }

    /// Thermal system of `system_type` for the current angle, built on a miss.
    fn thermal_system(
        &mut self,
        system_type: SystemType,
        theta: f64,
        phi: f64,
    ) -> Result<&dyn ThermalSystem> {
        let igu = match self.cache.snapshot.igu.take() {
            Some(igu) => igu,
            None => {
                let igu = self.build_igu(theta, phi)?;
                self.cache.stats.igu_builds += 1;
                log::debug!("built IGU with {} solid layers", igu.solids.len());
                igu
            }
        };

        let config = &self.config;
        let cache = &mut self.cache;
        let igu = &*cache.snapshot.igu.insert(igu);
        match cache.snapshot.thermal.entry(system_type) {
            Entry::Occupied(entry) => Ok(&**entry.into_mut()),
            Entry::Vacant(entry) => {
                let request = ThermalRequest {
                    igu,
                    environments: config.environments(system_type),
                    deflection: &config.deflection,
                    system_type,
                };
                let system = self.thermal.build(&request)?;
                cache.stats.thermal_builds += 1;
                log::debug!("built {system_type:?} thermal system");
                Ok(&**entry.insert(system))
            }
        }
    }

    fn build_igu(&mut self, theta: f64, phi: f64) -> Result<Igu> {
        let absorptances = self.solar_absorptances(theta, phi)?;
        let solids = self
            .config
            .layers
            .iter()
            .zip(absorptances)
            .enumerate()
            .map(|(i, (product, absorptance))| {
                let infrared = self.infrared(product)?;
                assembly::solid_layer(i, product, infrared, absorptance)
            })
            .collect::<Result<Vec<_>>>()?;
        assembly::assemble_igu(
            solids,
            &self.config.gaps,
            self.config.width,
            self.config.height,
            self.config.tilt,
        )
    }

    /// Front direct solar absorptance released as heat, per layer.
    fn solar_absorptances(&mut self, theta: f64, phi: f64) -> Result<Vec<f64>> {
        let count = self.config.layers.len();
        if !self.config.standard.has_method(MethodType::Solar) {
            log::debug!(
                "standard {} has no SOLAR method, layers absorb no solar radiation",
                self.config.standard.name
            );
            return Ok(vec![0.0; count]);
        }
        let method = self
            .config
            .standard
            .method_by_type(MethodType::Solar)?
            .clone();
        let results = self.method_results(&method, theta, phi)?;
        Ok(results
            .layers
            .iter()
            .map(|layer| layer.front_direct.heat)
            .collect())
    }

    /// Infrared properties of one product: declared values when complete,
    /// otherwise diffuse results of the thermal-infrared method.
    fn infrared(&self, product: &ProductLayer) -> Result<InfraredProperties> {
        if let Some(declared) = assembly::declared_infrared(product) {
            return Ok(declared);
        }
        let config = &self.config;
        let method = config.standard.method_by_type(MethodType::ThermalInfrared)?;
        let factory = LayerFactory::new(&config.options, &config.sampling, config.bsdf_hemisphere);
        let optical = [product.optical.as_ref()];
        let layers = assembly::scattering_layers(&factory, method, &optical)?;
        let stack = assembly::optical_stack(
            method,
            &optical,
            layers,
            &config.sampling,
            &config.options,
            config.bsdf_hemisphere,
        )?;
        let results = self.optics.assemble(&stack)?.results(stack.range, 0.0, 0.0)?;
        let front = results.system.front;
        let back = results.system.back;
        let tf = front.transmittance.diffuse_diffuse;
        let tb = back.transmittance.diffuse_diffuse;
        Ok(InfraredProperties {
            transmittance_front: tf,
            transmittance_back: tb,
            emissivity_front: 1.0 - tf - front.reflectance.diffuse_diffuse,
            emissivity_back: 1.0 - tb - back.reflectance.diffuse_diffuse,
        })
    }
}
