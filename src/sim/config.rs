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

use crate::dynamics::{ControlInput, GravityModel};
use crate::estimation::FilterOptions;
use crate::io::{
    duration_from_str, duration_to_str, Cadence, ConfigError, ConfigRepr, InvalidConfigSnafu,
};
use crate::linalg::{UnitQuaternion, Vector3};
use crate::sensors::{
    AidingSensor, Availability, Gravimeter, GravimeterConfig, ProfileSpec, SensorProfile,
    StarTracker, StarTrackerConfig,
};
use crate::state::{ErrorCovariance, ErrorVector, ACC_BIAS, ATT, GYR_BIAS, POS, VEL};
use crate::time::{Duration, Unit};
use crate::TrueState;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

fn default_name() -> String {
    "scenario".to_string()
}

fn default_step() -> Duration {
    Unit::Second * 1.0
}

fn default_seed() -> u64 {
    42
}

/// Complete description of one navigation scenario.
///
/// Build it in code with the typed builder, from one of the presets, or load it from YAML:
///
/// ```yaml
/// name: classical with star tracker
/// duration: 1 h
/// step: 1 s
/// imu: classical
/// seed: 42
/// control:
///   acceleration_m_s2: [0.1, 0.0, 0.0]
/// aiding:
///   - sensor:
///       type: star_tracker
///       name: standard
///       accuracy_arcsec: 5.0
///       max_rate_hz: 10.0
///       fov_deg: 20.0
///     cadence: 1 min
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct ScenarioConfig {
    #[builder(default = default_name(), setter(into))]
    #[serde(default = "default_name")]
    pub name: String,
    /// Total simulated time
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub duration: Duration,
    /// Fixed integration and filter step
    #[builder(default = default_step())]
    #[serde(
        default = "default_step",
        serialize_with = "duration_to_str",
        deserialize_with = "duration_from_str"
    )]
    pub step: Duration,
    /// IMU profile, by name or fully specified
    #[builder(setter(into))]
    pub imu: ProfileSpec,
    /// Seed of the IMU stream, each aiding sensor uses the following seeds
    #[builder(default = default_seed())]
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[builder(default)]
    #[serde(default)]
    pub initial_state: InitialConditions,
    #[builder(default)]
    #[serde(default)]
    pub initial_uncertainty: InitialUncertainty,
    #[builder(default)]
    #[serde(default)]
    pub control: ControlInput,
    #[builder(default)]
    #[serde(default)]
    pub gravity: GravityModel,
    #[builder(default)]
    #[serde(default)]
    pub aiding: Vec<AidingSensorConfig>,
    #[builder(default)]
    #[serde(default)]
    pub filter: FilterOptions,
}

impl ConfigRepr for ScenarioConfig {}

impl ScenarioConfig {
    /// One hour of deep space coast on the IMU alone: 1000 m/s initial velocity, 0.1 m/s² constant body thrust, no gravity.
    pub fn coast<P: Into<ProfileSpec>>(profile: P) -> Self {
        let imu = profile.into();
        let name = match &imu {
            ProfileSpec::Named(name) => format!("{name} coast"),
            ProfileSpec::Custom(profile) => format!("{} coast", profile.name),
        };
        Self::builder()
            .name(name)
            .duration(Unit::Hour * 1.0)
            .imu(imu)
            .control(ControlInput::body_thrust(Vector3::new(0.1, 0.0, 0.0)))
            .build()
    }

    /// The coast scenario aided by a standard star tracker at the provided interval.
    pub fn with_star_tracker<P: Into<ProfileSpec>>(profile: P, interval: Duration) -> Self {
        let mut scenario = Self::coast(profile);
        scenario.name = format!("{} with star tracker every {interval}", scenario.name);
        scenario.aiding.push(AidingSensorConfig::star_tracker(
            StarTrackerConfig::standard(),
            interval,
        ));
        scenario
    }

    /// Number of filter steps in this scenario, i.e. floor(duration / step).
    pub fn num_steps(&self) -> usize {
        (self.duration.total_nanoseconds() / self.step.total_nanoseconds()) as usize
    }

    /// Checks every parameter and resolves the IMU profile.
    pub fn validate(&self) -> Result<SensorProfile, ConfigError> {
        ensure!(
            self.step > Duration::ZERO,
            InvalidConfigSnafu {
                msg: format!("step must be positive, got {}", self.step)
            }
        );
        ensure!(
            self.duration >= self.step,
            InvalidConfigSnafu {
                msg: format!(
                    "duration {} is shorter than the step {}",
                    self.duration, self.step
                )
            }
        );
        self.initial_uncertainty.validate()?;
        for sensor in &self.aiding {
            sensor.validate(self.step)?;
        }
        self.imu.resolve()
    }
}

impl fmt::Display for ScenarioConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} in steps of {} (seed {}, {} aiding sensor(s), {})",
            self.name,
            self.duration,
            self.step,
            self.seed,
            self.aiding.len(),
            self.gravity
        )
    }
}

/// Initial truth of the spacecraft.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub position_m: Vector3<f64>,
    pub velocity_m_s: Vector3<f64>,
    /// Roll, pitch and yaw of the body frame with respect to the inertial frame.
    pub attitude_rad: Vector3<f64>,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            velocity_m_s: Vector3::new(1000.0, 0.0, 0.0),
            attitude_rad: Vector3::zeros(),
        }
    }
}

impl InitialConditions {
    pub fn to_true_state(&self) -> TrueState {
        TrueState::new(
            self.position_m,
            self.velocity_m_s,
            UnitQuaternion::from_euler_angles(
                self.attitude_rad[0],
                self.attitude_rad[1],
                self.attitude_rad[2],
            ),
        )
    }
}

/// One sigma initial uncertainty of the filter, per axis.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialUncertainty {
    pub position_m: f64,
    pub velocity_m_s: f64,
    pub attitude_rad: f64,
    pub accel_bias_m_s2: f64,
    pub gyro_bias_rad_s: f64,
}

impl Default for InitialUncertainty {
    fn default() -> Self {
        Self {
            position_m: 10.0,
            velocity_m_s: 0.1,
            attitude_rad: 0.01,
            accel_bias_m_s2: 1e-4,
            gyro_bias_rad_s: 1e-5,
        }
    }
}

impl InitialUncertainty {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (what, sigma) in [
            ("position", self.position_m),
            ("velocity", self.velocity_m_s),
            ("attitude", self.attitude_rad),
            ("accelerometer bias", self.accel_bias_m_s2),
            ("gyroscope bias", self.gyro_bias_rad_s),
        ] {
            ensure!(
                sigma.is_finite() && sigma >= 0.0,
                InvalidConfigSnafu {
                    msg: format!("initial {what} uncertainty must be non-negative, got {sigma}")
                }
            );
        }
        Ok(())
    }

    /// Diagonal initial covariance of the error state.
    pub fn to_covariance(&self) -> ErrorCovariance {
        let mut sigmas = ErrorVector::zeros();
        for i in 0..3 {
            sigmas[POS + i] = self.position_m;
            sigmas[VEL + i] = self.velocity_m_s;
            sigmas[ATT + i] = self.attitude_rad;
            sigmas[ACC_BIAS + i] = self.accel_bias_m_s2;
            sigmas[GYR_BIAS + i] = self.gyro_bias_rad_s;
        }
        ErrorCovariance::from_diagonal(&sigmas.component_mul(&sigmas))
    }
}

/// Kind of aiding sensor and its characteristics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AidingSensorKind {
    StarTracker(StarTrackerConfig),
    Gravimeter(GravimeterConfig),
}

/// An aiding sensor of the scenario, with when it is used and when it can observe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AidingSensorConfig {
    pub sensor: AidingSensorKind,
    #[serde(default)]
    pub cadence: Cadence,
    #[serde(default)]
    pub availability: Availability,
}

impl AidingSensorConfig {
    pub fn star_tracker(config: StarTrackerConfig, interval: Duration) -> Self {
        Self {
            sensor: AidingSensorKind::StarTracker(config),
            cadence: Cadence::Every(interval),
            availability: Availability::always(),
        }
    }

    pub fn gravimeter(config: GravimeterConfig, interval: Duration) -> Self {
        Self {
            sensor: AidingSensorKind::Gravimeter(config),
            cadence: Cadence::Every(interval),
            availability: Availability::always(),
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn name(&self) -> &str {
        match &self.sensor {
            AidingSensorKind::StarTracker(config) => &config.name,
            AidingSensorKind::Gravimeter(config) => &config.name,
        }
    }

    /// Ensures the sensor is well defined and that its cadence is not faster than the filter step.
    pub fn validate(&self, step: Duration) -> Result<(), ConfigError> {
        match &self.sensor {
            AidingSensorKind::StarTracker(config) => {
                config.validate()?;
                if let Some(interval) = self.cadence.interval() {
                    if interval < config.min_interval() {
                        warn!(
                            "{} cadence {interval} is faster than its maximum rate of {} Hz",
                            config.name, config.max_rate_hz
                        );
                    }
                }
            }
            AidingSensorKind::Gravimeter(config) => config.validate()?,
        }
        if let Some(interval) = self.cadence.interval() {
            ensure!(
                interval >= step,
                InvalidConfigSnafu {
                    msg: format!(
                        "{} cadence {interval} is shorter than the step {step}",
                        self.name()
                    )
                }
            );
        }
        self.availability.validate()
    }

    /// Instantiates the sensor. The gravimeter observes the scenario's gravity field.
    pub fn build(&self, field: GravityModel, seed: u64) -> Box<dyn AidingSensor> {
        match &self.sensor {
            AidingSensorKind::StarTracker(config) => Box::new(StarTracker::new(
                config.clone(),
                self.availability.clone(),
                seed,
            )),
            AidingSensorKind::Gravimeter(config) => Box::new(Gravimeter::new(
                config.clone(),
                field,
                self.availability.clone(),
                seed,
            )),
        }
    }
}
