// tests/engine.rs
//
// Engine-level behaviour: mesh setup, parameters, stepping, errors.
// Run only these: cargo test --test engine

use llg_engine::config::{RunConfig, SolverConfig};
use llg_engine::llg::StepperState;
use llg_engine::mesh::Mesh;
use llg_engine::vector_field::VectorField;
use llg_engine::{Engine, EngineBuilder, EngineError, ErrorKind, QuantityId};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// 4 x 4 x 1 permalloy-like film, exchange and damping on, demag on.
fn film() -> Engine {
    let mut b = EngineBuilder::new();
    b.set_mesh(4, 4, 1, 4e-9, 4e-9, 2e-9).unwrap();
    let mut e = b.build().unwrap();
    let mat = e.material_mut();
    mat.set_msat_all(8e5);
    mat.aex_mut().set_all(13e-12);
    mat.alpha_mut().set_all(0.1);
    e
}

#[test]
fn grid_and_world_size_are_reported_in_xyz_order() {
    let mut b = EngineBuilder::new();
    b.set_mesh(4, 2, 1, 1e-9, 2e-9, 3e-9).unwrap();
    assert_eq!(b.grid_size().unwrap(), [4, 2, 1]);
    let w = b.world_size().unwrap();
    assert!(approx_eq(w[0], 4e-9, 1e-24));
    assert!(approx_eq(w[1], 4e-9, 1e-24));
    assert!(approx_eq(w[2], 3e-9, 1e-24));

    let e = b.build().unwrap();
    assert_eq!((e.nx(), e.ny(), e.nz()), (4, 2, 1));
    assert_eq!(e.cell_size(), [1e-9, 2e-9, 3e-9]);
}

#[test]
fn mesh_can_only_be_set_once() {
    let mut b = EngineBuilder::new();
    b.set_mesh(4, 4, 1, 1e-9, 1e-9, 1e-9).unwrap();
    let err = b.set_mesh(8, 8, 1, 1e-9, 1e-9, 1e-9).unwrap_err();
    assert!(matches!(err, EngineError::MeshAlreadySet));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(b.set_cell_size(2e-9, 2e-9, 2e-9).is_err());
}

#[test]
fn invalid_mesh_dimensions_are_rejected() {
    let mut b = EngineBuilder::new();
    assert_eq!(
        b.set_mesh(1, 4, 1, 1e-9, 1e-9, 1e-9).unwrap_err().kind(),
        ErrorKind::Configuration
    );
    assert!(b.set_mesh(4, 0, 1, 1e-9, 1e-9, 1e-9).is_err());
    assert!(b.set_mesh(4, 4, 1, -1e-9, 1e-9, 1e-9).is_err());
    assert!(b.set_mesh(4, 4, 1, 1e-9, f64::NAN, 1e-9).is_err());
}

#[test]
fn mesh_accessors_before_set_are_uninitialized() {
    let b = EngineBuilder::new();
    assert_eq!(b.grid_size().unwrap_err().kind(), ErrorKind::Uninitialized);
    assert!(b.build().is_err());
}

#[test]
fn parameters_read_back_per_region() {
    let mut e = film();
    e.material_mut().aex_mut().set_region(3, 1e-11).unwrap();
    assert_eq!(e.material().aex().get(3).unwrap(), 1e-11);
    assert_eq!(e.material().aex().get(0).unwrap(), 13e-12);
    assert!(!e.material().aex().is_uniform());

    let err = e.material_mut().aex_mut().set_region(256, 1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(e.regions_mut().set_all(300).is_err());
}

#[test]
fn reduced_anisotropy_tracks_ku1_and_msat() {
    let mut e = film();
    let mat = e.material_mut();
    mat.set_ku1(0, 1e3).unwrap();
    mat.set_ku1(1, 2e3).unwrap();
    mat.set_msat(1, 8e5).unwrap();
    assert!(approx_eq(mat.ku1_red().get(0).unwrap(), 1.25e-3, 1e-18));
    assert!(approx_eq(mat.ku1_red().get(1).unwrap(), 2.5e-3, 1e-18));

    mat.set_msat(1, 4e5).unwrap();
    assert!(approx_eq(mat.ku1_red().get(1).unwrap(), 5e-3, 1e-18));
}

#[test]
fn one_step_keeps_unit_length_and_b_eff_is_pure_demag() {
    let mut e = film();
    e.material_mut().aex_mut().set_all(0.0);
    e.set_m_fn(|x, y, _| [1.0, 0.3 * (x * 1e8).sin(), 0.2 + y * 1e7]);

    let b_eff = e.fetch(QuantityId::BEff).unwrap().into_vector().unwrap();
    let b_demag = e.fetch(QuantityId::BDemag).unwrap().into_vector().unwrap();
    assert_eq!(b_eff, b_demag);
    assert!(b_demag.max_norm() > 0.0);

    e.step().unwrap();
    assert!(e.time() > 0.0);
    assert_eq!(e.stepper_state(), StepperState::Accepted);
    for v in &e.m().data {
        let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        assert!(approx_eq(n, 1.0, 1e-12), "|m| = {n}");
    }
}

#[test]
fn uniform_out_of_plane_film_with_default_parameters() {
    let mut b = EngineBuilder::new();
    b.set_mesh(4, 4, 1, 1e-9, 1e-9, 1e-9).unwrap();
    let mut e = b.build().unwrap();
    e.material_mut().set_msat_all(8e5);
    e.set_m_uniform([0.0, 0.0, 1.0]);

    e.step().unwrap();
    assert!(e.time() > 0.0);

    let b_eff = e.fetch(QuantityId::BEff).unwrap().into_vector().unwrap();
    let b_demag = e.fetch(QuantityId::BDemag).unwrap().into_vector().unwrap();
    assert_eq!(b_eff, b_demag);
    assert!(b_demag.data.iter().all(|v| v[2] < 0.0));

    let torque = e.fetch(QuantityId::Torque).unwrap().into_vector().unwrap();
    assert_eq!(torque.max_norm(), 0.0);

    for v in &e.m().data {
        let n = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        assert!(approx_eq(n, 1.0, 1e-12), "|m| = {n}");
    }
}

#[test]
fn zero_msat_fails_before_building_the_demag_kernel() {
    let mut e = film();
    e.material_mut().set_msat_all(0.0);
    e.set_m_uniform([1.0, 0.0, 0.0]);
    let err = e.step().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Physical);
    assert!(err.to_string().contains("Msat"));
    assert!(!e.demag_kernel_built());
    assert_eq!(e.time(), 0.0);
}

#[test]
fn unused_region_with_zero_msat_is_fine() {
    let mut e = film();
    e.material_mut().set_msat(7, 0.0).unwrap();
    e.set_m_uniform([1.0, 0.0, 0.0]);
    e.step().unwrap();
    assert!(e.demag_kernel_built());
}

#[test]
fn stepping_without_magnetization_is_uninitialized() {
    let mut e = film();
    let err = e.step().unwrap_err();
    assert!(matches!(err, EngineError::MagnetizationNotSet));
    assert_eq!(err.kind(), ErrorKind::Uninitialized);
    assert_eq!(e.tick(), 0);
}

#[test]
fn unreachable_tolerance_is_an_integration_error() {
    let mut e = film();
    e.set_demag_enabled(false);
    e.set_b_ext([0.0, 0.0, 10.0]);
    e.set_m_uniform([1.0, 0.0, 0.0]);
    e.configure_solver(SolverConfig {
        dt: 1e-12,
        max_err: 1e-12,
        headroom: 0.8,
        dt_min: 1e-12,
        dt_max: 1e-12,
        ..SolverConfig::default()
    })
    .unwrap();

    let before = e.m().clone();
    let err = e.step().unwrap_err();
    assert!(matches!(err, EngineError::StepUnderflow { .. }));
    assert_eq!(err.kind(), ErrorKind::Integration);
    assert_eq!(e.m(), &before);
    assert_eq!(e.time(), 0.0);
}

#[test]
fn invalid_solver_settings_are_rejected() {
    let mut e = film();
    let bad = SolverConfig {
        headroom: 0.0,
        ..SolverConfig::default()
    };
    assert_eq!(
        e.configure_solver(bad).unwrap_err().kind(),
        ErrorKind::Configuration
    );
}

#[test]
fn run_lands_on_the_target_time() {
    let mut e = film();
    e.set_demag_enabled(false);
    e.set_b_ext([0.0, 0.0, 0.05]);
    e.set_m_uniform([1.0, 0.0, 0.0]);
    e.run(2.5e-12).unwrap();
    assert!(approx_eq(e.time(), 2.5e-12, 1e-24), "t = {}", e.time());
    let steps = e.accepted_steps();
    assert!(steps > 1);

    e.run(1e-12).unwrap();
    assert!(approx_eq(e.time(), 3.5e-12, 1e-24));
    assert!(e.accepted_steps() > steps);

    assert!(e.run(-1.0).is_err());
}

#[test]
fn steps_counts_accepted_steps() {
    let mut e = film();
    e.set_m_uniform([1.0, 1.0, 0.0]);
    e.steps(5).unwrap();
    assert_eq!(e.accepted_steps(), 5);
    // One stage-2 evaluation per attempt; stage 1 is reused across retries.
    assert_eq!(e.tick(), 2 * e.accepted_steps() + e.rejected_steps());
}

#[test]
fn set_m_normalises_and_checks_the_mesh() {
    let mut e = film();
    let mut m = VectorField::new(*e.mesh());
    m.set_uniform([0.0, 3.0, 4.0]);
    e.set_m(&m).unwrap();
    let v = e.m().data[5];
    assert_eq!(v[0], 0.0);
    assert!(approx_eq(v[1], 0.6, 1e-15));
    assert!(approx_eq(v[2], 0.8, 1e-15));

    let other = VectorField::new(Mesh::new(8, 4, 1, 1e-9, 1e-9, 1e-9).unwrap());
    assert!(e.set_m(&other).is_err());
}

#[test]
fn post_step_hook_can_pin_the_magnetization() {
    let mut e = film();
    e.set_demag_enabled(false);
    e.set_b_ext([0.0, 0.0, 0.1]);
    e.set_m_uniform([1.0, 0.0, 0.0]);
    e.add_post_step(|m, _| m.data[0] = [1.0, 0.0, 0.0]);
    e.steps(3).unwrap();
    assert_eq!(e.m().data[0], [1.0, 0.0, 0.0]);
    assert_ne!(e.m().data[15], [1.0, 0.0, 0.0]);
}

#[test]
fn engine_from_json_config() {
    let cfg = RunConfig::from_json(
        r#"{
            "geometry": { "nx": 8, "ny": 4, "nz": 1, "dx": 2e-9, "dy": 2e-9, "dz": 1e-9 },
            "material": { "ms": 1.1e6, "aex": 16e-12, "alpha": 0.05, "ku1": 1.1e5 },
            "fields": { "b_ext": [0.0, 0.0, 0.02], "j": [0.0, 0.0, 0.0], "demag": false },
            "solver": { "dt": 5e-14 }
        }"#,
    )
    .unwrap();
    let mut e = Engine::from_config(&cfg).unwrap();
    assert_eq!(e.grid_size(), [8, 4, 1]);
    assert_eq!(e.material().msat().get(9).unwrap(), 1.1e6);
    assert!(approx_eq(e.material().ku1_red().get(0).unwrap(), 0.1, 1e-15));
    assert!(!e.demag_enabled());
    assert_eq!(e.dt(), 5e-14);
    assert_eq!(e.solver_settings().max_err, SolverConfig::default().max_err);

    e.set_m_uniform([0.0, 0.1, 1.0]);
    e.step().unwrap();
    assert!(!e.demag_kernel_built());
}
