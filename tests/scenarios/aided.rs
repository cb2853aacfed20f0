extern crate deepspace_ins as ins;

use ins::prelude::*;
use ins::sensors::Availability;

use crate::init_logger;

#[test]
fn star_tracker_barely_helps_position() {
    init_logger();

    let coast = run(&ScenarioConfig::coast("classical")).unwrap();
    let aided = run(&ScenarioConfig::with_star_tracker("classical", 1.minutes())).unwrap();

    println!("{coast}");
    println!("{aided}");

    assert_eq!(aided.summary.update_count, 60);
    assert_eq!(aided.summary.skipped_update_count, 0);

    // Attitude is bounded by the star tracker
    assert!(aided.summary.final_attitude_error_rad < coast.summary.final_attitude_error_rad);
    assert!(aided.summary.final_attitude_error_rad < 1e-3);

    // But the position error is dominated by the accelerometer
    let coast_err = coast.summary.final_rms_position_error_m;
    let aided_err = aided.summary.final_rms_position_error_m;
    assert!((aided_err - coast_err).abs() / coast_err < 0.05);
}

#[test]
fn cadence_sweep_in_order() {
    init_logger();

    let intervals = [10.minutes(), 2.minutes(), 30.minutes()];
    let sweep = cadence_sweep(SensorProfile::quantum(), &intervals);
    assert_eq!(sweep.num_failures(), 0);

    let updates = sweep
        .successes()
        .map(|(interval, result)| {
            assert!(result.name.contains(&format!("{interval}")));
            result.summary.update_count
        })
        .collect::<Vec<usize>>();
    assert_eq!(updates, vec![6, 30, 2]);

    let stats = sweep.final_position_error_stats().unwrap();
    assert_eq!(stats.count, 3);
    assert!(stats.min <= stats.mean && stats.mean <= stats.max);
}

#[test]
fn dropouts_are_counted_and_reproducible() {
    init_logger();

    let mut config = ScenarioConfig::with_star_tracker("quantum", 10.seconds());
    config.duration = 30.minutes();
    config.aiding[0].availability = Availability {
        outages: Vec::new(),
        dropout_probability: 0.3,
    };

    let first = run(&config).unwrap();
    let second = run(&config).unwrap();
    assert_eq!(first, second);

    let epochs = first.summary.update_count + first.summary.skipped_update_count;
    assert_eq!(epochs, 180);
    let dropped = first.summary.skipped_update_count as f64 / epochs as f64;
    assert!(dropped > 0.15 && dropped < 0.45, "{dropped}");
}
