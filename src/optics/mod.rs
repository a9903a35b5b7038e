//! Optical product data, calculation standards and the per-layer material
//! factory.

pub mod data;
pub mod factory;
pub mod material;
pub mod spectrum;
pub mod standard;
pub mod wavelength;

pub use data::{OpticalData, OpticalKind};
pub use standard::{Method, MethodType, Standard};
pub use wavelength::{LambdaRange, SpectralRangePolicy, SpectralSampling};
