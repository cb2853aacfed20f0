extern crate deepspace_ins as ins;

use ins::io::Cadence;
use ins::prelude::*;
use ins::sim::AidingSensorKind;

use crate::{data_path, init_logger};

#[test]
fn load_scenario() {
    init_logger();

    let config = ScenarioConfig::load(data_path("scenarios/classical_star_tracker.yaml")).unwrap();
    assert_eq!(config.name, "classical with star tracker");
    assert_eq!(config.duration, 1.hours());
    assert_eq!(config.aiding.len(), 1);
    assert_eq!(config.aiding[0].cadence, Cadence::Every(1.minutes()));
    match &config.aiding[0].sensor {
        AidingSensorKind::StarTracker(tracker) => assert_eq!(*tracker, StarTrackerConfig::standard()),
        other => panic!("expected a star tracker, got {other:?}"),
    }

    // Same as the preset, except for the name and the outage
    let mut preset = ScenarioConfig::with_star_tracker("classical", 1.minutes());
    preset.name = config.name.clone();
    preset.aiding[0].availability = config.aiding[0].availability.clone();
    assert_eq!(config, preset);

    // Epochs from 20 to 24 minutes fall in the outage
    let mut short = config.clone();
    short.duration = 30.minutes();
    let result = run(&short).unwrap();
    assert_eq!(result.summary.update_count + result.summary.skipped_update_count, 30);
    assert_eq!(result.summary.skipped_update_count, 5);
}

#[test]
fn load_named_profiles() {
    let profiles = SensorProfile::load_named(data_path("scenarios/imu_profiles.yaml")).unwrap();
    assert_eq!(profiles.len(), 2);
    for (name, profile) in &profiles {
        assert_eq!(name, &profile.name);
        assert!(profile.validate().is_ok());
    }

    let mut config = ScenarioConfig::coast(profiles["tactical"].clone());
    config.duration = 5.minutes();
    let result = run(&config).unwrap();
    assert_eq!(result.profile, "tactical");
}

#[test]
fn missing_file() {
    let err = ScenarioConfig::load(data_path("scenarios/does_not_exist.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));

    let err = ScenarioConfig::loads("duration: [1, 2]\nimu: classical").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}
