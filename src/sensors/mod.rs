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

use crate::estimation::MeasurementModel;
use crate::io::{duration_from_str, duration_to_str, ConfigError, InvalidConfigSnafu};
use crate::linalg::DVector;
use crate::TrueState;
use hifitime::Duration;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// IMU noise profiles, in SI units, with their datasheet conversions.
pub mod profile;
pub use profile::{ProfileSpec, SensorProfile, TriadErrors, DEG_PER_HOUR_TO_RAD_S, MICRO_G_TO_M_S2, PPM};

/// The strapdown IMU model.
pub mod imu;
pub use imu::ImuModel;

pub mod star_tracker;
pub use star_tracker::{StarTracker, StarTrackerConfig, ARCSEC_TO_RAD};

pub mod gravimeter;
pub use gravimeter::{Gravimeter, GravimeterConfig};

pub use crate::estimation::GravityMode;

/// An aiding sensor produces observations of the truth for the navigation filter.
pub trait AidingSensor: fmt::Display + Send {
    /// Returns the name of this sensor
    fn name(&self) -> &str;

    /// The observation model the filter uses to process this sensor's measurements.
    fn measurement_model(&self) -> &MeasurementModel;

    /// Observes the truth, returning None when the sensor is unavailable at this time (occlusion or dropout).
    fn observe(&mut self, truth: &TrueState) -> Option<DVector<f64>>;
}

/// A window of time during which a sensor cannot observe, e.g. the Sun in a star tracker's field of view.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outage {
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub start: Duration,
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub end: Duration,
}

impl Outage {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self { start, end }
    }

    /// Returns whether the provided elapsed time falls in [start; end).
    pub fn contains(&self, elapsed: Duration) -> bool {
        self.start <= elapsed && elapsed < self.end
    }
}

/// When a sensor is able to produce a measurement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Availability {
    /// Deterministic occlusion windows.
    pub outages: Vec<Outage>,
    /// Probability in [0; 1) that any single measurement is dropped.
    pub dropout_probability: f64,
}

impl Availability {
    /// A sensor which never misses a measurement.
    pub fn always() -> Self {
        Self::default()
    }

    pub fn with_outage(mut self, start: Duration, end: Duration) -> Self {
        self.outages.push(Outage::new(start, end));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            (0.0..1.0).contains(&self.dropout_probability),
            InvalidConfigSnafu {
                msg: format!(
                    "dropout probability must be in [0; 1), got {}",
                    self.dropout_probability
                )
            }
        );
        for outage in &self.outages {
            ensure!(
                outage.start < outage.end,
                InvalidConfigSnafu {
                    msg: format!("outage must end after it starts, got {} to {}", outage.start, outage.end)
                }
            );
        }
        Ok(())
    }

    /// Returns whether a measurement at this elapsed time is available.
    /// The random dropout is only drawn outside of outages and when its probability is non zero.
    pub fn is_available<R: Rng>(&self, elapsed: Duration, rng: &mut R) -> bool {
        if self.outages.iter().any(|outage| outage.contains(elapsed)) {
            return false;
        }
        if self.dropout_probability > 0.0 {
            rng.gen::<f64>() >= self.dropout_probability
        } else {
            true
        }
    }
}
