extern crate deepspace_ins as ins;

use ins::prelude::*;
use ins::sensors::TriadErrors;

use crate::init_logger;

#[test]
fn coast_is_deterministic() {
    init_logger();

    let mut config = ScenarioConfig::coast("classical");
    config.duration = 10.minutes();

    let first = run(&config).unwrap();
    let second = run(&config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.records.len(), 601);
    assert_eq!(first.records[0].elapsed_s, 0.0);

    config.seed = 43;
    let other = run(&config).unwrap();
    assert_ne!(
        first.summary.final_rms_position_error_m,
        other.summary.final_rms_position_error_m
    );
}

#[test]
fn accel_bias_only_coast() {
    init_logger();

    let turn_on = 100.0 * ins::sensors::MICRO_G_TO_M_S2;
    let profile = SensorProfile {
        name: "turn-on bias only".to_string(),
        accel: TriadErrors {
            turn_on_bias: turn_on,
            ..Default::default()
        },
        gyro: TriadErrors::default(),
    };
    let config = ScenarioConfig::coast(profile);

    let sim = Simulation::new(&config).unwrap();
    let bias = sim.imu().accel_bias();
    assert!(bias.norm() > 0.0);
    let result = sim.run().unwrap();

    let t_s = 3600.0_f64;
    let expected = 0.5 * bias.norm() * t_s.powi(2);
    let got = result.summary.final_rms_position_error_m;
    println!("bias only: {got:.3} m, expected {expected:.3} m");
    assert!((got - expected).abs() / expected < 0.01);

    // Error grows quadratically
    let half = &result.records[1800];
    assert!((half.position_error_m - 0.5 * bias.norm() * 1800.0_f64.powi(2)).abs() / expected < 0.01);
}

#[test]
fn quantum_improvement_factor() {
    init_logger();

    let classical = run(&ScenarioConfig::coast("classical")).unwrap();
    let quantum = run(&ScenarioConfig::coast("quantum")).unwrap();

    println!("{classical}");
    println!("{quantum}");

    let classical_err = classical.summary.final_rms_position_error_m;
    let quantum_err = quantum.summary.final_rms_position_error_m;

    let improvement = classical_err / quantum_err;
    println!("improvement factor: {improvement:.2}");
    assert!((improvement - 100.0).abs() < 10.0);

    assert_eq!(classical.summary.update_count, 0);
    assert!(classical.summary.max_rms_position_error_m >= classical_err);
}

#[test]
fn classical_coast_error_statistics() {
    init_logger();

    let profile = SensorProfile::classical();
    let t_s = 3600.0_f64;
    // Per axis variance of the position drift from the accelerometer: turn-on bias, bias random walk and white noise.
    // Attitude and scale factor contributions are below one percent of this.
    let per_axis_var = profile.accel.turn_on_bias.powi(2) * t_s.powi(4) / 4.0
        + profile.accel.bias_instability.powi(2) * t_s.powi(5) / 20.0
        + profile.accel.noise_density.powi(2) * t_s.powi(3) / 3.0;
    let expected_mean_sq = 3.0 * per_axis_var;

    let seeds = (1..=20).collect::<Vec<u64>>();
    let sweep = seed_sweep(&ScenarioConfig::coast(profile), &seeds);
    assert_eq!(sweep.num_failures(), 0);

    let mean_sq = sweep
        .successes()
        .map(|(_, result)| result.summary.final_rms_position_error_m.powi(2))
        .sum::<f64>()
        / seeds.len() as f64;
    let ratio = mean_sq / expected_mean_sq;
    println!(
        "mean square final error {mean_sq:e} m², expected {expected_mean_sq:e} m² (ratio {ratio:.3})"
    );
    // Chi-square with 60 degrees of freedom, these bounds are well past three sigma
    assert!(ratio > 0.4 && ratio < 1.8, "{ratio}");

    let stats = sweep.final_position_error_stats().unwrap();
    assert!(stats.mean > 10e3 && stats.mean < 60e3, "{stats}");
}
