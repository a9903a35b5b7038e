//! Seams to the optical and thermal solvers.
//!
//! The core assembles solver-ready descriptions ([`OpticalStack`],
//! [`ThermalRequest`]) and hands them to a backend. Backends report failures
//! through `anyhow`, the same way the simulation modules of this code base do;
//! the core wraps them into [`crate::Error::Solver`].

mod results;

use std::sync::Arc;

use anyhow::Result;

use crate::optics::data::BsdfHemisphere;
use crate::optics::material::ScatteringLayer;
use crate::optics::spectrum::Series;
use crate::optics::standard::Integration;
use crate::optics::wavelength::LambdaRange;
use crate::thermal::Environments;
use crate::thermal::igu::{DeflectionState, Igu};

pub use results::{
    AbsorptanceComponents, DeflectionResults, DirectionalResults, LayerAbsorptance,
    OpticalResults, SideResults, SystemResults,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    Specular,
    Bsdf(BsdfHemisphere),
}

/// Multi-layer optical system description for one method.
#[derive(Debug, Clone)]
pub struct OpticalStack {
    pub method: String,
    /// Outdoor layer first.
    pub layers: Vec<Arc<ScatteringLayer>>,
    pub kind: StackKind,
    pub range: LambdaRange,
    /// Common sample grid of all layers.
    pub wavelengths: Vec<f64>,
    pub source: Series,
    pub detector: Series,
    pub integration: Integration,
}

/// A constructed multi-layer optical system.
pub trait OpticalSystem {
    /// System and per-layer results over `range` at incidence (`theta`, `phi`) in degrees.
    fn results(&self, range: LambdaRange, theta: f64, phi: f64) -> Result<OpticalResults>;
}

pub trait OpticalBackend {
    fn assemble(&self, stack: &OpticalStack) -> Result<Box<dyn OpticalSystem>>;
}

/// Which set of boundary conditions a thermal system is solved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemType {
    U,
    Shgc,
}

#[derive(Debug, Clone, Copy)]
pub struct ThermalRequest<'a> {
    pub igu: &'a Igu,
    pub environments: &'a Environments,
    pub deflection: &'a DeflectionState,
    pub system_type: SystemType,
}

/// A solved thermal system.
pub trait ThermalSystem {
    /// U-factor [W/(m^2*K)].
    fn u(&self) -> f64;
    /// Solar heat gain coefficient given the system's total solar transmittance.
    fn shgc(&self, total_solar_transmittance: f64) -> f64;
    /// Front and back surface temperature of each solid layer [K].
    fn layer_temperatures(&self) -> Vec<f64>;
    /// Heat flow into the room [W/m^2].
    fn heat_flow(&self) -> f64;
    fn solid_effective_conductivities(&self) -> Vec<f64>;
    fn gap_effective_conductivities(&self) -> Vec<f64>;
    fn deflection(&self) -> DeflectionResults;
}

pub trait ThermalBackend {
    fn build(&self, request: &ThermalRequest) -> Result<Box<dyn ThermalSystem>>;
}
