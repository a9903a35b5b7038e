pub mod assembly;
pub mod backend;
pub mod color;
pub mod config;
pub mod error;
pub mod glazing;
pub mod optics;
pub mod reference;
pub mod thermal;

// Prelude
pub use assembly::ProductLayer;
pub use backend::{OpticalBackend, OpticalResults, SystemType, ThermalBackend};
pub use color::ColorResults;
pub use config::CalcOptions;
pub use error::{Error, Result};
pub use glazing::{CacheStats, GlazingSystem, GlazingSystemConfig, LayerCacheKey};
pub use optics::{
    LambdaRange, Method, MethodType, OpticalData, OpticalKind, SpectralRangePolicy,
    SpectralSampling, Standard,
};
pub use thermal::{Environment, Environments, Gap, ThermalData};
