extern crate deepspace_ins as ins;

use ins::linalg::{DMatrix, Vector3};
use ins::prelude::*;
use ins::sim::{InitialConditions, StepRecord};

use crate::init_logger;

/// A tumbling spacecraft in low Earth orbit with a star tracker and a gravimeter.
fn orbital_scenario(covariance_update: CovarianceUpdate) -> ScenarioConfig {
    let gravity = GravityModel::earth_j2();
    ScenarioConfig::builder()
        .name("tumbling LEO")
        .duration(20.minutes())
        .imu("classical")
        .initial_state(InitialConditions {
            position_m: Vector3::new(7000e3, 0.0, 0.0),
            velocity_m_s: Vector3::new(0.0, 7546.05, 0.0),
            attitude_rad: Vector3::new(0.1, -0.2, 0.3),
        })
        .control(
            ControlInput::body_thrust(Vector3::new(0.01, 0.0, 0.0))
                .with_angular_rate(Vector3::new(1e-3, 0.0, 2e-3)),
        )
        .gravity(gravity)
        .aiding(vec![
            AidingSensorConfig::star_tracker(StarTrackerConfig::standard(), 1.minutes()),
            AidingSensorConfig::gravimeter(
                GravimeterConfig::new("gravimeter", GravityMode::Vector, 1e-6),
                30.seconds(),
            ),
        ])
        .filter(FilterOptions {
            covariance_update,
            ..Default::default()
        })
        .build()
}

/// Checks the covariance and attitude invariants after a step, and returns the trace of the covariance.
///
/// On steps without any measurement update, the covariance only went through the time update, so its trace may not
/// have decreased since the previous step.
fn check_step(sim: &Simulation, record: &StepRecord, prev_trace: f64) -> f64 {
    let covar = sim.filter().covar();
    assert!((covar - covar.transpose()).norm() < 1e-9);

    let trace = covar.trace();
    if record.updates == 0 {
        assert!(
            trace >= prev_trace * (1.0 - 1e-12),
            "trace decreased from {prev_trace:e} to {trace:e} at {} s",
            record.elapsed_s
        );
    }

    let eigenvalues =
        DMatrix::from_column_slice(15, 15, covar.as_slice()).symmetric_eigenvalues();
    let tolerance = 1e-9 * covar.amax();
    assert!(
        eigenvalues.iter().all(|eig| *eig >= -tolerance),
        "negative eigenvalue at {}: {eigenvalues}",
        record.elapsed_s
    );

    assert!((record.truth.attitude.quaternion().norm() - 1.0).abs() < 1e-6);
    assert!((record.estimate.attitude.quaternion().norm() - 1.0).abs() < 1e-6);
    assert!(record.sigmas.iter().all(|sigma| sigma.is_finite()));
    trace
}

#[test]
fn covariance_stays_symmetric_and_psd() {
    init_logger();

    for covariance_update in [CovarianceUpdate::Joseph, CovarianceUpdate::Simplified] {
        let mut sim = Simulation::new(&orbital_scenario(covariance_update)).unwrap();
        let mut updates = 0;
        let mut trace = sim.filter().covar().trace();
        while !sim.is_done() {
            let record = sim.step().unwrap();
            trace = check_step(&sim, &record, trace);
            updates += record.updates;
        }
        // 20 star tracker and 40 gravimeter epochs
        assert_eq!(updates, 60);
        assert_eq!(sim.filter().num_updates(), 60);
    }
}

#[test]
fn star_tracker_bounds_attitude_uncertainty() {
    init_logger();

    let result = run(&orbital_scenario(CovarianceUpdate::Joseph)).unwrap();
    let last = result.final_record().unwrap();
    // Attitude sigmas are at or below the tracker accuracy after an update
    let sigma_att = ins::sensors::StarTrackerConfig::standard().sigma_rad();
    let after_update = &result.records[1200];
    assert_eq!(after_update.updates, 2);
    for i in 0..3 {
        assert!(after_update.sigmas[ins::ATT + i] <= sigma_att);
    }
    assert!(last.attitude_error_rad < 1e-3);
}
