#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fenestration::backend::{
    LayerAbsorptance, OpticalBackend, OpticalResults, OpticalStack, OpticalSystem, SystemResults,
    ThermalBackend, ThermalRequest, ThermalSystem,
};
use fenestration::optics::data::{MaterialClass, NBandData, WavelengthRow};
use fenestration::optics::standard::SpectrumSpec;
use fenestration::reference::{ReferenceOptics, ReferenceThermal};
use fenestration::{
    Gap, GlazingSystem, GlazingSystemConfig, Method, OpticalData, OpticalKind, ProductLayer,
    Standard, ThermalData,
};

pub const CLEAR_THICKNESS: f64 = 0.003;
pub const AIR_GAP: f64 = 0.0127;

fn detector(peak: f64) -> SpectrumSpec {
    SpectrumSpec::Data(vec![
        (0.38, 0.05),
        (0.50, 0.5 * peak),
        (0.60, peak),
        (0.78, 0.02),
    ])
}

/// Solar, photopic, thermal-infrared and tristimulus methods.
pub fn test_standard() -> Standard {
    Standard::new("TEST NFRC")
        .with_method(
            Method::new("SOLAR", 0.3, 2.5).with_source(SpectrumSpec::Blackbody {
                temperature: 5778.0,
            }),
        )
        .with_method(Method::new("PHOTOPIC", 0.38, 0.78).with_detector(detector(1.0)))
        .with_method(Method::new("THERMAL IR", 5.0, 40.0))
        .with_method(Method::new("COLOR_TRISTIMX", 0.38, 0.78).with_detector(detector(0.9)))
        .with_method(Method::new("COLOR_TRISTIMY", 0.38, 0.78).with_detector(detector(1.0)))
        .with_method(Method::new("COLOR_TRISTIMZ", 0.38, 0.78).with_detector(detector(0.6)))
}

/// Rows of a 3 mm clear pane, flat across the visible.
pub fn clear_rows() -> Vec<WavelengthRow> {
    [
        (0.30, 0.00, 0.05),
        (0.38, 0.90, 0.08),
        (0.50, 0.90, 0.08),
        (0.60, 0.90, 0.08),
        (0.78, 0.90, 0.08),
        (1.00, 0.80, 0.07),
        (1.50, 0.75, 0.07),
        (2.00, 0.70, 0.06),
        (2.50, 0.60, 0.06),
    ]
    .into_iter()
    .map(|(w, t, r)| WavelengthRow::new(w, t, t, r, r))
    .collect()
}

pub fn clear_optical() -> OpticalData {
    OpticalData::new(OpticalKind::NBand(NBandData::new(
        clear_rows(),
        MaterialClass::Monolithic,
    )))
    .with_thickness(CLEAR_THICKNESS)
    .with_infrared(0.0, 0.0, 0.84, 0.84)
}

pub fn clear_glass() -> ProductLayer {
    ProductLayer::new(clear_optical(), ThermalData::new(1.0, CLEAR_THICKNESS))
}

/// Clear pane with a low-e coating on its back face.
pub fn low_e_glass() -> ProductLayer {
    let optical = clear_optical().with_infrared(0.0, 0.0, 0.84, 0.10);
    ProductLayer::new(optical, ThermalData::new(1.0, CLEAR_THICKNESS))
}

pub fn double_clear_config() -> GlazingSystemConfig {
    GlazingSystemConfig::new(
        vec![clear_glass(), clear_glass()],
        vec![Gap::air(AIR_GAP)],
        test_standard(),
    )
}

pub fn double_clear() -> GlazingSystem {
    GlazingSystem::new(double_clear_config()).unwrap()
}

/// Backend calls observed by the counting test doubles.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub optical: Rc<Cell<usize>>,
    pub thermal: Rc<Cell<usize>>,
}

pub struct CountingOptics {
    calls: Rc<Cell<usize>>,
}

impl OpticalBackend for CountingOptics {
    fn assemble(&self, stack: &OpticalStack) -> anyhow::Result<Box<dyn OpticalSystem>> {
        self.calls.set(self.calls.get() + 1);
        ReferenceOptics.assemble(stack)
    }
}

pub struct CountingThermal {
    calls: Rc<Cell<usize>>,
    /// One-based call number that fails, if any.
    fail_on: Option<usize>,
}

impl ThermalBackend for CountingThermal {
    fn build(&self, request: &ThermalRequest) -> anyhow::Result<Box<dyn ThermalSystem>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(self.calls.get()) {
            anyhow::bail!("thermal solver failed on call {}", self.calls.get());
        }
        ReferenceThermal::new().build(request)
    }
}

/// Glazing system whose backends count every call.
pub fn counted(config: GlazingSystemConfig) -> (GlazingSystem, Calls) {
    counted_with_thermal_failure(config, None)
}

/// Like [`counted`], with the thermal backend failing on call `fail_on`.
pub fn counted_with_thermal_failure(
    config: GlazingSystemConfig,
    fail_on: Option<usize>,
) -> (GlazingSystem, Calls) {
    let calls = Calls::default();
    let system = GlazingSystem::with_backends(
        config,
        Box::new(CountingOptics {
            calls: calls.optical.clone(),
        }),
        Box::new(CountingThermal {
            calls: calls.thermal.clone(),
            fail_on,
        }),
    )
    .unwrap();
    (system, calls)
}

/// Optical stacks handed to a [`RecordingOptics`] backend.
pub type Stacks = Rc<RefCell<Vec<OpticalStack>>>;

/// Optical backend that accepts any stack, BSDF stacks included, and keeps a
/// copy of it. Its systems report zero transmittance and reflectance.
pub struct RecordingOptics {
    stacks: Stacks,
}

struct BlankSystem {
    layers: usize,
}

impl OpticalSystem for BlankSystem {
    fn results(
        &self,
        _range: fenestration::LambdaRange,
        _theta: f64,
        _phi: f64,
    ) -> anyhow::Result<OpticalResults> {
        Ok(OpticalResults {
            system: SystemResults::default(),
            layers: vec![LayerAbsorptance::default(); self.layers],
            bsdf: None,
        })
    }
}

impl OpticalBackend for RecordingOptics {
    fn assemble(&self, stack: &OpticalStack) -> anyhow::Result<Box<dyn OpticalSystem>> {
        self.stacks.borrow_mut().push(stack.clone());
        Ok(Box::new(BlankSystem {
            layers: stack.layers.len(),
        }))
    }
}

/// Glazing system whose optical stacks are recorded instead of solved.
pub fn recorded(config: GlazingSystemConfig) -> (GlazingSystem, Stacks) {
    let stacks = Stacks::default();
    let system = GlazingSystem::with_backends(
        config,
        Box::new(RecordingOptics {
            stacks: stacks.clone(),
        }),
        Box::new(ReferenceThermal::new()),
    )
    .unwrap();
    (system, stacks)
}
