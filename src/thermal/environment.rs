//! Indoor and outdoor boundary conditions.

use serde::{Deserialize, Serialize};

/// How the film coefficient at a boundary is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundaryModel {
    /// Convective and radiative parts are both calculated.
    CalculateH,
    /// Convective part is given [W/(m^2*K)], radiative part is calculated.
    SetH(f64),
    /// Combined film coefficient is given [W/(m^2*K)].
    HPrescribed(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    /// Air temperature [K].
    pub air_temperature: f64,
    /// Air pressure [Pa].
    pub pressure: f64,
    /// Mean radiant temperature [K].
    pub radiation_temperature: f64,
    /// Emissivity of the surroundings [-].
    pub emissivity: f64,
    /// Air speed [m/s].
    pub air_speed: f64,
    /// Direct solar irradiance on the glazing [W/m^2].
    pub direct_solar_radiation: f64,
    pub model: BoundaryModel,
}

impl Environment {
    pub fn new(air_temperature: f64, pressure: f64) -> Self {
        Self {
            air_temperature,
            pressure,
            radiation_temperature: air_temperature,
            emissivity: 1.0,
            air_speed: 0.0,
            direct_solar_radiation: 0.0,
            model: BoundaryModel::CalculateH,
        }
    }

    pub fn with_air_speed(mut self, air_speed: f64) -> Self {
        self.air_speed = air_speed;
        self
    }

    pub fn with_solar(mut self, direct_solar_radiation: f64) -> Self {
        self.direct_solar_radiation = direct_solar_radiation;
        self
    }

    pub fn with_model(mut self, model: BoundaryModel) -> Self {
        self.model = model;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environments {
    pub outside: Environment,
    pub inside: Environment,
}

/// NFRC 100 winter conditions used for the U-factor.
pub fn nfrc_u_environments() -> Environments {
    Environments {
        outside: Environment::new(255.15, 101_325.0).with_air_speed(5.5),
        inside: Environment::new(294.15, 101_325.0),
    }
}

/// NFRC 200 summer conditions used for the SHGC.
pub fn nfrc_shgc_environments() -> Environments {
    Environments {
        outside: Environment::new(305.15, 101_325.0)
            .with_air_speed(2.75)
            .with_solar(783.0),
        inside: Environment::new(297.15, 101_325.0),
    }
}
