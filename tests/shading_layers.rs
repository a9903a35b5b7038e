mod common;

use std::sync::Arc;

use common::{AIR_GAP, clear_glass, recorded, test_standard};
use fenestration::backend::StackKind;
use fenestration::optics::data::{
    BsdfBasis, BsdfHemisphere, BsdfMatrices, DistributionMethod, DualBandBsdfData, MaterialClass,
    NBandData, PerforatedGeometry, PerforationShape, VenetianGeometry, WavelengthRow,
    WovenGeometry,
};
use fenestration::optics::material::{LayerGeometry, Material, ScatteringLayer};
use fenestration::{Error, Gap, GlazingSystemConfig, OpticalData, OpticalKind, ProductLayer, ThermalData};
use ndarray::Array2;

/// Opaque aluminium sheet used as the base material of every shade below.
fn aluminium() -> Arc<OpticalData> {
    let rows = [0.30, 0.38, 0.78, 1.50, 2.50]
        .into_iter()
        .map(|w| WavelengthRow::new(w, 0.0, 0.0, 0.7, 0.7))
        .collect();
    Arc::new(
        OpticalData::new(OpticalKind::NBand(NBandData::new(rows, MaterialClass::Monolithic)))
            .with_thickness(0.0001),
    )
}

fn venetian_geometry() -> VenetianGeometry {
    VenetianGeometry {
        slat_width: 0.016,
        slat_spacing: 0.012,
        slat_curvature: 0.0,
        slat_tilt: 0.0,
        segments_per_slat: 5,
        distribution: DistributionMethod::Directional,
    }
}

fn shade(kind: OpticalKind) -> ProductLayer {
    ProductLayer::new(OpticalData::new(kind), ThermalData::new(160.0, 0.0001))
}

fn glass_and(layer: ProductLayer) -> GlazingSystemConfig {
    GlazingSystemConfig::new(
        vec![clear_glass(), layer],
        vec![Gap::air(AIR_GAP)],
        test_standard(),
    )
}

fn quarter() -> Option<BsdfHemisphere> {
    Some(BsdfHemisphere::new(BsdfBasis::Quarter))
}

#[test]
fn test_venetian_stack_requires_hemisphere() {
    let (mut system, stacks) = recorded(glass_and(shade(OpticalKind::Venetian {
        material: aluminium(),
        geometry: venetian_geometry(),
    })));
    let err = system.optical_method_results("SOLAR", 0.0, 0.0).unwrap_err();
    assert!(matches!(err, Error::MissingData { .. }));
    assert!(err.to_string().contains("BSDF hemisphere"), "{err}");
    assert!(stacks.borrow().is_empty());
    assert_eq!(system.cache_stats().layer_builds, 0);
}

#[test]
fn test_venetian_stack_is_built_on_the_hemisphere() {
    let (mut system, stacks) = recorded(glass_and(shade(OpticalKind::Venetian {
        material: aluminium(),
        geometry: venetian_geometry(),
    })));
    system.set_bsdf_hemisphere(quarter());
    let results = system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    assert_eq!(results.layers.len(), 2);

    let stacks = stacks.borrow();
    assert_eq!(stacks.len(), 1);
    let stack = &stacks[0];
    assert_eq!(stack.kind, StackKind::Bsdf(BsdfHemisphere::new(BsdfBasis::Quarter)));
    assert!(stack.layers.iter().all(|layer| layer.is_bsdf()));
    assert!(matches!(
        *stack.layers[0],
        ScatteringLayer::Bsdf {
            geometry: LayerGeometry::Specular,
            ..
        }
    ));
    let ScatteringLayer::Bsdf { geometry, .. } = &*stack.layers[1] else {
        panic!("shade should be a BSDF layer");
    };
    assert_eq!(*geometry, LayerGeometry::Venetian(venetian_geometry()));
}

#[test]
fn test_hemisphere_change_builds_new_layers() {
    let (mut system, stacks) = recorded(glass_and(shade(OpticalKind::PerfectlyDiffuse {
        material: aluminium(),
    })));
    system.set_bsdf_hemisphere(quarter());
    system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    assert_eq!(system.cache_stats().layer_builds, 1);

    let full = BsdfHemisphere::new(BsdfBasis::Full);
    system.set_bsdf_hemisphere(Some(full));
    system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    assert_eq!(system.cache_stats().layer_builds, 2);
    {
        let stacks = stacks.borrow();
        assert_eq!(stacks[1].kind, StackKind::Bsdf(full));
        assert!(matches!(
            &*stacks[1].layers[1],
            ScatteringLayer::Bsdf {
                hemisphere,
                geometry: LayerGeometry::PerfectlyDiffuse,
                ..
            } if *hemisphere == full
        ));
    }

    // Layers built for the quarter basis are still cached.
    system.set_bsdf_hemisphere(quarter());
    system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    assert_eq!(system.cache_stats().layer_builds, 2);
    assert_eq!(system.cache_stats().optical_builds, 3);
}

#[test]
fn test_woven_and_perforated_shades_share_the_stack_grid() {
    let woven = shade(OpticalKind::Woven {
        material: aluminium(),
        geometry: WovenGeometry {
            thread_diameter: 0.0005,
            thread_spacing: 0.002,
            shade_thickness: 0.0005,
        },
    });
    let perforated = shade(OpticalKind::Perforated {
        material: aluminium(),
        geometry: PerforatedGeometry {
            spacing_x: 0.02,
            spacing_y: 0.02,
            dimension_x: 0.005,
            dimension_y: 0.0,
            shade_thickness: 0.001,
            shape: PerforationShape::Circular,
        },
    });
    for layer in [woven, perforated] {
        let (mut system, stacks) = recorded(glass_and(layer));
        system.set_bsdf_hemisphere(quarter());
        system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
        let stacks = stacks.borrow();
        let stack = &stacks[0];
        assert!(stack.layers.iter().all(|layer| layer.is_bsdf()));
        assert_eq!(stack.wavelengths.first(), Some(&0.30));
        assert_eq!(stack.wavelengths.last(), Some(&2.50));
        assert_eq!(stack.source.len(), stack.wavelengths.len());
    }
}

#[test]
fn test_perforated_openness_reaches_the_stack() {
    let perforated = shade(OpticalKind::Perforated {
        material: aluminium(),
        geometry: PerforatedGeometry {
            spacing_x: 0.02,
            spacing_y: 0.02,
            dimension_x: 0.005,
            dimension_y: 0.0,
            shade_thickness: 0.001,
            shape: PerforationShape::Circular,
        },
    });
    let (mut system, stacks) = recorded(glass_and(perforated));
    system.set_bsdf_hemisphere(quarter());
    system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    let stacks = stacks.borrow();
    let ScatteringLayer::Bsdf {
        geometry: LayerGeometry::Perforated(cell),
        ..
    } = &*stacks[0].layers[1]
    else {
        panic!("perforated shade should keep its cell");
    };
    assert!((cell.openness() - 0.0625).abs() < 1e-12);
}

#[test]
fn test_dual_band_bsdf_layer_keeps_both_bands_in_a_stack() {
    let matrices = |t| BsdfMatrices {
        tf: Array2::from_elem((41, 41), t),
        tb: Array2::from_elem((41, 41), t),
        rf: Array2::from_elem((41, 41), 0.1),
        rb: Array2::from_elem((41, 41), 0.1),
    };
    let measured = shade(OpticalKind::DualBandBsdf(DualBandBsdfData {
        solar: matrices(0.01),
        visible: matrices(0.02),
        hemisphere: BsdfHemisphere::new(BsdfBasis::Quarter),
    }));
    let (mut system, stacks) = recorded(glass_and(measured));

    let err = system.optical_method_results("SOLAR", 0.0, 0.0).unwrap_err();
    assert!(err.to_string().contains("BSDF hemisphere"), "{err}");

    system.set_bsdf_hemisphere(quarter());
    system.optical_method_results("SOLAR", 0.0, 0.0).unwrap();
    let stacks = stacks.borrow();
    let ScatteringLayer::Bsdf {
        material, geometry, ..
    } = &*stacks[0].layers[1]
    else {
        panic!("measured BSDF should be a BSDF layer");
    };
    assert_eq!(*geometry, LayerGeometry::Measured);
    assert!(matches!(material, Material::DualBandBsdf { .. }));
}
