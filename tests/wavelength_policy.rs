mod common;

use common::{AIR_GAP, CLEAR_THICKNESS, clear_glass, clear_rows, double_clear, test_standard};
use fenestration::optics::data::{MaterialClass, NBandData, WavelengthRow};
use fenestration::{
    Error, Gap, GlazingSystem, GlazingSystemConfig, OpticalData, OpticalKind, ProductLayer,
    SpectralRangePolicy, SpectralSampling, ThermalData,
};

fn glass_from_rows(rows: Vec<WavelengthRow>) -> ProductLayer {
    let optical = OpticalData::new(OpticalKind::NBand(NBandData::new(
        rows,
        MaterialClass::Monolithic,
    )))
    .with_thickness(CLEAR_THICKNESS);
    ProductLayer::new(optical, ThermalData::new(1.0, CLEAR_THICKNESS))
}

fn double(outer: ProductLayer, inner: ProductLayer) -> GlazingSystem {
    GlazingSystem::new(GlazingSystemConfig::new(
        vec![outer, inner],
        vec![Gap::air(AIR_GAP)],
        test_standard(),
    ))
    .unwrap()
}

fn solar_transmittance(system: &mut GlazingSystem) -> f64 {
    system
        .optical_method_results("SOLAR", 0.0, 0.0)
        .unwrap()
        .system
        .front
        .transmittance
        .direct_hemispherical
}

#[test]
fn test_policy_change_keeps_layers_of_other_policies() {
    let mut system = double_clear();
    let full = solar_transmittance(&mut system);
    assert_eq!(system.cache_stats().layer_builds, 1);

    system.set_spectral_range_policy(SpectralSampling::condensed(5, 10));
    let condensed = solar_transmittance(&mut system);
    assert!(condensed > 0.0 && condensed < 1.0);
    assert_eq!(system.cache_stats().layer_builds, 2);

    system.set_spectral_range_policy(SpectralSampling::default());
    assert_eq!(solar_transmittance(&mut system), full);
    assert_eq!(system.cache_stats().layer_builds, 2);
    assert_eq!(system.cache_stats().optical_builds, 3);
}

#[test]
fn test_iso_9050_policy_samples_the_solar_range() {
    let mut system = double_clear();
    system.set_spectral_range_policy(SpectralSampling::new(SpectralRangePolicy::Iso9050));
    let t = solar_transmittance(&mut system);
    assert!(t > 0.5 && t < 0.8, "t = {t}");
    assert_eq!(
        system.config().sampling.policy,
        SpectralRangePolicy::Iso9050
    );
}

#[test]
fn test_short_measurement_fails_solar_but_serves_photopic() {
    let rows: Vec<WavelengthRow> = clear_rows()
        .into_iter()
        .filter(|r| r.wavelength <= 1.0)
        .collect();
    let mut system = double(glass_from_rows(rows), clear_glass());

    let err = system.optical_method_results("SOLAR", 0.0, 0.0).unwrap_err();
    match &err {
        Error::Coverage {
            method,
            required,
            measured,
        } => {
            assert_eq!(method, "SOLAR");
            assert!((required.max - 2.5).abs() < 1e-12);
            assert!((measured.max - 1.0).abs() < 1e-12);
        }
        other => panic!("expected a coverage error, got {other}"),
    }
    assert!(err.to_string().contains("SOLAR"));

    let photopic = system.optical_method_results("PHOTOPIC", 0.0, 0.0).unwrap();
    assert!(photopic.system.front.transmittance.direct_direct > 0.7);
}

#[test]
fn test_thermal_ir_falls_back_to_declared_values() {
    let mut system = double_clear();
    let results = system
        .optical_method_results("THERMAL IR", 0.0, 0.0)
        .unwrap();
    let front = results.system.front;
    assert!(front.transmittance.diffuse_diffuse.abs() < 1e-12);
    assert!((front.reflectance.diffuse_diffuse - 0.16).abs() < 1e-12);
}

#[test]
fn test_measured_infrared_replaces_declared_values() {
    let mut rows = clear_rows();
    rows.push(WavelengthRow::new(5.0, 0.0, 0.0, 0.16, 0.16));
    rows.push(WavelengthRow::new(40.0, 0.0, 0.0, 0.16, 0.16));
    rows.push(WavelengthRow::new(50.0, 0.0, 0.0, 0.16, 0.16));
    let mut measured = double(glass_from_rows(rows.clone()), glass_from_rows(rows));
    let mut declared = double_clear();

    let u_measured = measured.u(0.0, 0.0).unwrap();
    let u_declared = declared.u(0.0, 0.0).unwrap();
    assert!((u_measured - u_declared).abs() < 1e-9);
}

#[test]
fn test_missing_infrared_data_is_reported() {
    let mut system = double(glass_from_rows(clear_rows()), clear_glass());
    let err = system.u(0.0, 0.0).unwrap_err();
    assert!(matches!(err, Error::MissingData { .. }));
    assert!(err.to_string().contains("THERMAL IR"), "{err}");
}
