use crate::optics::data::BsdfMatrices;

/// One value per incidence/emergence combination.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirectionalResults<T> {
    pub direct_direct: T,
    pub direct_diffuse: T,
    pub direct_hemispherical: T,
    pub diffuse_diffuse: T,
}

impl<T> DirectionalResults<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DirectionalResults<U> {
        DirectionalResults {
            direct_direct: f(self.direct_direct),
            direct_diffuse: f(self.direct_diffuse),
            direct_hemispherical: f(self.direct_hemispherical),
            diffuse_diffuse: f(self.diffuse_diffuse),
        }
    }

    pub fn zip<U>(self, other: DirectionalResults<U>) -> DirectionalResults<(T, U)> {
        DirectionalResults {
            direct_direct: (self.direct_direct, other.direct_direct),
            direct_diffuse: (self.direct_diffuse, other.direct_diffuse),
            direct_hemispherical: (self.direct_hemispherical, other.direct_hemispherical),
            diffuse_diffuse: (self.diffuse_diffuse, other.diffuse_diffuse),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideResults<T> {
    pub transmittance: DirectionalResults<T>,
    pub reflectance: DirectionalResults<T>,
}

impl<T> SideResults<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> SideResults<U> {
        SideResults {
            transmittance: self.transmittance.map(&mut f),
            reflectance: self.reflectance.map(&mut f),
        }
    }

    pub fn zip<U>(self, other: SideResults<U>) -> SideResults<(T, U)> {
        SideResults {
            transmittance: self.transmittance.zip(other.transmittance),
            reflectance: self.reflectance.zip(other.reflectance),
        }
    }
}

/// Front and back results of a whole system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemResults<T> {
    pub front: SideResults<T>,
    pub back: SideResults<T>,
}

impl<T> SystemResults<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> SystemResults<U> {
        SystemResults {
            front: self.front.map(&mut f),
            back: self.back.map(&mut f),
        }
    }

    pub fn zip<U>(self, other: SystemResults<U>) -> SystemResults<(T, U)> {
        SystemResults {
            front: self.front.zip(other.front),
            back: self.back.zip(other.back),
        }
    }
}

/// Absorbed fraction split into the part released as heat and the part
/// converted to electricity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbsorptanceComponents {
    pub total: f64,
    pub heat: f64,
    pub electricity: f64,
}

impl AbsorptanceComponents {
    pub fn heat_only(total: f64) -> Self {
        Self {
            total,
            heat: total,
            electricity: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerAbsorptance {
    pub front_direct: AbsorptanceComponents,
    pub front_diffuse: AbsorptanceComponents,
    pub back_direct: AbsorptanceComponents,
    pub back_diffuse: AbsorptanceComponents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpticalResults {
    pub system: SystemResults<f64>,
    /// Outdoor layer first.
    pub layers: Vec<LayerAbsorptance>,
    /// Direction-resolved system matrices, for BSDF systems only.
    pub bsdf: Option<BsdfMatrices>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeflectionResults {
    /// Center-of-pane deflection per solid layer, positive toward the room [m].
    pub max_layer_deflections: Vec<f64>,
    pub mean_layer_deflections: Vec<f64>,
    /// Net load on each solid layer [Pa].
    pub panes_load: Vec<f64>,
    pub max_gap_widths: Vec<f64>,
    pub mean_gap_widths: Vec<f64>,
}
