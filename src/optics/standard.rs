//! Standards and their calculation methods.
//!
//! A standard is a named collection of methods. Each method declares how its
//! wavelength range and sample set are chosen, which source and detector
//! spectra weight the integration, and which integration rule applies.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Well-known methods looked up by type rather than by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodType {
    Solar,
    Photopic,
    ThermalInfrared,
    Tuv,
    Spf,
    Tdw,
    Tkr,
    TristimulusX,
    TristimulusY,
    TristimulusZ,
}

impl MethodType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Solar => "SOLAR",
            Self::Photopic => "PHOTOPIC",
            Self::ThermalInfrared => "THERMAL IR",
            Self::Tuv => "TUV",
            Self::Spf => "SPF",
            Self::Tdw => "TDW",
            Self::Tkr => "TKR",
            Self::TristimulusX => "COLOR_TRISTIMX",
            Self::TristimulusY => "COLOR_TRISTIMY",
            Self::TristimulusZ => "COLOR_TRISTIMZ",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::Solar,
            Self::Photopic,
            Self::ThermalInfrared,
            Self::Tuv,
            Self::Spf,
            Self::Tdw,
            Self::Tkr,
            Self::TristimulusX,
            Self::TristimulusY,
            Self::TristimulusZ,
        ]
        .into_iter()
        .find(|t| t.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Spectral weighting function of a source or a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpectrumSpec {
    None,
    /// Planck emission at the given temperature [K].
    Blackbody { temperature: f64 },
    /// `exp(a - b * wavelength)` with wavelength in micrometers.
    UvAction { a: f64, b: f64 },
    /// Krochmann damage function.
    Krochmann,
    /// Tabulated (wavelength, value) pairs.
    Data(Vec<(f64, f64)>),
}

/// Where a method's sample wavelengths come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WavelengthSet {
    File(Vec<f64>),
    Source,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WavelengthBoundary {
    Number(f64),
    /// Take the boundary from the first or last entry of the wavelength set.
    WavelengthSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationRule {
    Rectangular,
    RectangularCentroid,
    Trapezoidal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub rule: IntegrationRule,
    /// Normalization coefficient applied by rules that support it.
    pub normalization: f64,
}

impl Default for Integration {
    fn default() -> Self {
        Self {
            rule: IntegrationRule::Rectangular,
            normalization: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub source: SpectrumSpec,
    pub detector: SpectrumSpec,
    pub wavelength_set: WavelengthSet,
    pub integration: Integration,
    pub min_wavelength: WavelengthBoundary,
    pub max_wavelength: WavelengthBoundary,
}

impl Method {
    /// A method sampled at the measured data between two fixed wavelengths.
    pub fn new(name: &str, min_wavelength: f64, max_wavelength: f64) -> Self {
        Self {
            name: name.to_string(),
            source: SpectrumSpec::None,
            detector: SpectrumSpec::None,
            wavelength_set: WavelengthSet::Data,
            integration: Integration::default(),
            min_wavelength: WavelengthBoundary::Number(min_wavelength),
            max_wavelength: WavelengthBoundary::Number(max_wavelength),
        }
    }

    pub fn with_source(mut self, source: SpectrumSpec) -> Self {
        self.source = source;
        self
    }

    pub fn with_detector(mut self, detector: SpectrumSpec) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_wavelength_set(mut self, set: WavelengthSet) -> Self {
        self.wavelength_set = set;
        self
    }

    pub fn with_integration(mut self, integration: Integration) -> Self {
        self.integration = integration;
        self
    }

    pub fn with_boundaries(mut self, min: WavelengthBoundary, max: WavelengthBoundary) -> Self {
        self.min_wavelength = min;
        self.max_wavelength = max;
        self
    }

    pub fn method_type(&self) -> Option<MethodType> {
        MethodType::from_name(&self.name)
    }

    pub fn is_thermal_infrared(&self) -> bool {
        self.method_type() == Some(MethodType::ThermalInfrared)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standard {
    pub name: String,
    methods: HashMap<String, Method>,
}

impl Standard {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            methods: HashMap::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.add(method);
        self
    }

    /// Adds a method, replacing any method with the same name.
    pub fn add(&mut self, method: Method) {
        self.methods.insert(method.name.clone(), method);
    }

    pub fn method(&self, name: &str) -> Result<&Method> {
        self.methods
            .get(name)
            .or_else(|| {
                // Fall back to a case-insensitive match on the display name.
                self.methods
                    .values()
                    .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
            })
            .ok_or_else(|| Error::MethodNotFound {
                standard: self.name.clone(),
                method: name.to_string(),
            })
    }

    pub fn method_by_type(&self, method_type: MethodType) -> Result<&Method> {
        self.method(method_type.display_name())
    }

    pub fn has_method(&self, method_type: MethodType) -> bool {
        self.method_by_type(method_type).is_ok()
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_type() {
        let std = Standard::new("NFRC")
            .with_method(Method::new("SOLAR", 0.3, 2.5))
            .with_method(Method::new("PHOTOPIC", 0.38, 0.78));
        assert_eq!(std.method("SOLAR").unwrap().name, "SOLAR");
        assert_eq!(std.method("photopic").unwrap().name, "PHOTOPIC");
        assert!(std.has_method(MethodType::Solar));
        assert!(!std.has_method(MethodType::Tdw));
        assert_eq!(std.method_names(), vec!["PHOTOPIC", "SOLAR"]);
    }

    #[test]
    fn test_missing_method_names_standard_and_method() {
        let std = Standard::new("NFRC 2020");
        let err = std.method_by_type(MethodType::Spf).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("NFRC 2020"), "{msg}");
        assert!(msg.contains("SPF"), "{msg}");
    }

    #[test]
    fn test_method_type_round_trip_names() {
        assert_eq!(
            MethodType::from_name("thermal ir"),
            Some(MethodType::ThermalInfrared)
        );
        assert!(Method::new("THERMAL IR", 5.0, 40.0).is_thermal_infrared());
        assert_eq!(MethodType::from_name("unknown"), None);
    }
}
