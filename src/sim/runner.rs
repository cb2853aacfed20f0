/*
    Deepspace INS, inertial navigation error analysis
    Copyright (C) 2024 The deepspace-ins developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{ScenarioConfig, ScenarioResult, StepRecord};
use crate::dynamics::SpacecraftKinematics;
use crate::errors::{DivergenceSnafu, SensorNoiseSnafu};
use crate::estimation::{ErrorStateEkf, ProcessNoise};
use crate::io::{Cadence, NoiseConfigSnafu};
use crate::propagators::{Propagator, RK4Fixed};
use crate::sensors::{AidingSensor, ImuModel, SensorProfile};
use crate::time::Duration;
use crate::{NavError, NominalEstimate, TrueState};
use snafu::ResultExt;
use std::fmt;
use std::time::Instant;

/// An aiding sensor and its measurement schedule.
struct AidingChannel {
    sensor: Box<dyn AidingSensor>,
    cadence: Cadence,
    last_epoch: Duration,
}

/// Stepwise execution of a scenario.
///
/// Each step propagates the truth, samples the IMU, runs the filter time update and then processes every aiding
/// sensor whose epoch is due. An epoch is due when the time since the previous epoch of that sensor reaches its
/// cadence. A sensor gap still consumes the epoch: the update is skipped and counted.
pub struct Simulation {
    config: ScenarioConfig,
    profile: SensorProfile,
    propagator: Propagator<SpacecraftKinematics, RK4Fixed>,
    truth: TrueState,
    imu: ImuModel,
    filter: ErrorStateEkf,
    channels: Vec<AidingChannel>,
    num_steps: usize,
    steps_taken: usize,
}

impl Simulation {
    /// Validates the scenario and initializes the truth, the IMU, the filter and the aiding sensors.
    ///
    /// The IMU draws from the stream seeded with the scenario seed, aiding sensor `i` from the stream seeded with
    /// `seed + 1 + i`.
    pub fn new(config: &ScenarioConfig) -> Result<Self, NavError> {
        let profile = config.validate()?;

        let imu = ImuModel::new(profile.clone(), config.seed).context(NoiseConfigSnafu)?;

        let mut truth = config.initial_state.to_true_state();
        truth.accel_bias_m_s2 = imu.accel_bias();
        truth.gyro_bias_rad_s = imu.gyro_bias();

        let filter = ErrorStateEkf::new(
            NominalEstimate::from_truth(&truth),
            config.initial_uncertainty.to_covariance(),
            ProcessNoise::from_profile(&profile),
            config.gravity,
            config.filter,
        );

        let channels = config
            .aiding
            .iter()
            .enumerate()
            .map(|(i, aiding)| {
                let seed = config.seed.wrapping_add(1 + i as u64);
                let sensor = aiding.build(config.gravity, seed);
                debug!("{sensor} every {} (seed {seed})", aiding.cadence);
                AidingChannel {
                    sensor,
                    cadence: aiding.cadence,
                    last_epoch: truth.elapsed,
                }
            })
            .collect();

        info!("{config}");
        info!("{profile}");

        Ok(Self {
            config: config.clone(),
            profile,
            propagator: Propagator::rk4(SpacecraftKinematics::new(config.gravity)),
            truth,
            imu,
            filter,
            channels,
            num_steps: config.num_steps(),
            steps_taken: 0,
        })
    }

    pub fn truth(&self) -> &TrueState {
        &self.truth
    }

    pub fn filter(&self) -> &ErrorStateEkf {
        &self.filter
    }

    pub fn imu(&self) -> &ImuModel {
        &self.imu
    }

    pub fn profile(&self) -> &SensorProfile {
        &self.profile
    }

    /// Number of steps of the full scenario
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    pub fn is_done(&self) -> bool {
        self.steps_taken >= self.num_steps
    }

    /// Record of the current truth, estimate and one sigma bounds, without any measurement.
    ///
    /// Before the first step, this logs the initial conditions and the prior uncertainty.
    pub fn snapshot(&self) -> StepRecord {
        StepRecord::new(
            self.truth,
            *self.filter.nominal(),
            self.filter.sigmas(),
            0,
            0,
        )
    }

    /// Advances the scenario by one step.
    pub fn step(&mut self) -> Result<StepRecord, NavError> {
        let step = self.config.step;
        self.truth = self
            .propagator
            .propagate(&self.truth, &self.config.control, step);
        let elapsed = self.truth.elapsed;

        let sample = self
            .imu
            .measure(&self.truth, step)
            .context(SensorNoiseSnafu { elapsed })?;
        // The truth carries the biases which corrupted this sample
        self.truth.accel_bias_m_s2 = self.imu.accel_bias();
        self.truth.gyro_bias_rad_s = self.imu.gyro_bias();

        self.filter
            .predict(&sample, step)
            .context(DivergenceSnafu { elapsed })?;

        let mut updates = 0;
        let mut skipped = 0;
        for channel in &mut self.channels {
            if !channel.cadence.is_due(elapsed - channel.last_epoch) {
                continue;
            }
            channel.last_epoch = elapsed;

            match channel.sensor.observe(&self.truth) {
                Some(observation) => {
                    let residual = self
                        .filter
                        .update(channel.sensor.measurement_model(), observation)
                        .context(DivergenceSnafu { elapsed })?;
                    debug!("{} at {elapsed}: ratio {:.3}", channel.sensor.name(), residual.ratio);
                    trace!("{residual}");
                    updates += 1;
                }
                None => {
                    debug!("{} gap at {elapsed}, update skipped", channel.sensor.name());
                    skipped += 1;
                }
            }
        }

        self.steps_taken += 1;
        Ok(StepRecord::new(
            self.truth,
            *self.filter.nominal(),
            self.filter.sigmas(),
            updates,
            skipped,
        ))
    }

    /// Runs all of the remaining steps. The records start with a snapshot of the current state, so a full run
    /// returns one more record than it has steps.
    pub fn run(mut self) -> Result<ScenarioResult, NavError> {
        let start = Instant::now();
        let mut records =
            Vec::with_capacity(self.num_steps - self.steps_taken.min(self.num_steps) + 1);
        records.push(self.snapshot());
        while !self.is_done() {
            let record = self.step()?;
            if self.steps_taken % 600 == 0 {
                debug!(
                    "{}: position error {:.3} m (σ {:.3} m)",
                    self.truth.elapsed,
                    record.position_error_m,
                    record.position_sigma_m()
                );
            }
            records.push(record);
        }

        let result = ScenarioResult::new(
            self.config.name.clone(),
            self.profile.name.clone(),
            self.config.seed,
            records,
        );
        info!(
            "{} done in {:.3} s: {}",
            result.name,
            start.elapsed().as_secs_f64(),
            result.summary
        );
        Ok(result)
    }
}

impl fmt::Display for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at step {}/{}",
            self.config.name, self.steps_taken, self.num_steps
        )
    }
}

/// Runs a scenario from start to finish.
pub fn run(config: &ScenarioConfig) -> Result<ScenarioResult, NavError> {
    Simulation::new(config)?.run()
}

#[cfg(test)]
mod ut_runner {
    use super::*;
    use crate::sensors::{Availability, StarTrackerConfig};
    use crate::sim::AidingSensorConfig;
    use crate::time::TimeUnits;

    #[test]
    fn cadence_and_gaps() {
        let mut config = ScenarioConfig::coast("quantum");
        config.duration = 10.minutes();
        config.aiding.push(
            AidingSensorConfig::star_tracker(StarTrackerConfig::standard(), 1.minutes())
                .with_availability(Availability::always().with_outage(150.seconds(), 270.seconds())),
        );

        let result = run(&config).unwrap();
        assert_eq!(result.records.len(), 601);
        // Epochs at 1, 2, ... 10 minutes, those at 3 and 4 minutes fall in the outage
        assert_eq!(result.summary.update_count, 8);
        assert_eq!(result.summary.skipped_update_count, 2);
        assert_eq!(result.records[60].elapsed_s, 60.0);
        assert_eq!(result.records[60].updates, 1);
        assert_eq!(result.records[180].skipped, 1);
        assert_eq!(result.records[59].updates + result.records[59].skipped, 0);
    }

    #[test]
    fn initial_conditions_are_recorded() {
        let mut config = ScenarioConfig::coast("classical");
        config.duration = 5.seconds();
        let prior = config.initial_uncertainty.to_covariance();

        let result = run(&config).unwrap();
        assert_eq!(result.records.len(), 6);

        let first = &result.records[0];
        assert_eq!(first.elapsed_s, 0.0);
        assert_eq!(first.position_error_m, 0.0);
        assert_eq!(first.velocity_error_m_s, 0.0);
        assert_eq!(first.updates + first.skipped, 0);
        assert_eq!(first.truth.velocity_m_s, config.initial_state.velocity_m_s);
        for i in 0..15 {
            assert!((first.sigmas[i] - prior[(i, i)].sqrt()).abs() < 1e-15);
        }
        assert_eq!(result.records[5].elapsed_s, 5.0);
    }

    #[test]
    fn partial_last_step_is_not_run() {
        let mut config = ScenarioConfig::coast("classical");
        config.duration = 2500.milliseconds();
        let mut sim = Simulation::new(&config).unwrap();
        assert_eq!(sim.num_steps(), 2);
        sim.step().unwrap();
        sim.step().unwrap();
        assert!(sim.is_done());
        assert_eq!(sim.truth().elapsed, 2.seconds());
        assert_eq!(sim.filter().nominal().elapsed, 2.seconds());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ScenarioConfig::coast("classical");
        config.step = Duration::ZERO;
        assert!(matches!(
            Simulation::new(&config),
            Err(NavError::Configuration { .. })
        ));
    }
}
