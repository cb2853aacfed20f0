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

use super::{AidingSensor, Availability};
use crate::estimation::MeasurementModel;
use crate::io::{ConfigError, ConfigRepr, InvalidConfigSnafu, UnknownNameSnafu};
use crate::linalg::DVector;
use crate::time::{Duration, Unit};
use crate::TrueState;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// One arcsecond in radians.
pub const ARCSEC_TO_RAD: f64 = 4.848136811095360e-6;

/// Characteristics of a star tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StarTrackerConfig {
    pub name: String,
    /// One sigma accuracy per axis, in arcseconds.
    pub accuracy_arcsec: f64,
    /// Fastest update rate the unit supports, in Hz.
    pub max_rate_hz: f64,
    /// Field of view, in degrees.
    pub fov_deg: f64,
}

impl ConfigRepr for StarTrackerConfig {}

impl StarTrackerConfig {
    /// Names of the built-in star trackers.
    pub const NAMES: [&'static str; 2] = ["standard", "high_accuracy"];

    /// A typical star tracker: 5″, 10 Hz, 20° field of view.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            accuracy_arcsec: 5.0,
            max_rate_hz: 10.0,
            fov_deg: 20.0,
        }
    }

    /// A high accuracy star tracker: 1″, 20 Hz, 15° field of view.
    pub fn high_accuracy() -> Self {
        Self {
            name: "high_accuracy".to_string(),
            accuracy_arcsec: 1.0,
            max_rate_hz: 20.0,
            fov_deg: 15.0,
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "standard" => Ok(Self::standard()),
            "high_accuracy" => Ok(Self::high_accuracy()),
            _ => UnknownNameSnafu {
                kind: "star tracker",
                name,
                available: Self::NAMES.join(", "),
            }
            .fail(),
        }
    }

    pub fn sigma_rad(&self) -> f64 {
        self.accuracy_arcsec * ARCSEC_TO_RAD
    }

    /// Shortest time between two measurements.
    pub fn min_interval(&self) -> Duration {
        Unit::Second * (1.0 / self.max_rate_hz)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.accuracy_arcsec.is_finite() && self.accuracy_arcsec >= 0.0,
            InvalidConfigSnafu {
                msg: format!(
                    "star tracker {} accuracy must be non-negative, got {}",
                    self.name, self.accuracy_arcsec
                )
            }
        );
        ensure!(
            self.max_rate_hz.is_finite() && self.max_rate_hz > 0.0,
            InvalidConfigSnafu {
                msg: format!(
                    "star tracker {} rate must be positive, got {}",
                    self.name, self.max_rate_hz
                )
            }
        );
        Ok(())
    }
}

impl fmt::Display for StarTrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} star tracker ({}″, {} Hz, {}° FOV)",
            self.name, self.accuracy_arcsec, self.max_rate_hz, self.fov_deg
        )
    }
}

/// A star tracker measures the inertial attitude of the spacecraft.
pub struct StarTracker {
    config: StarTrackerConfig,
    model: MeasurementModel,
    availability: Availability,
    rng: Pcg64Mcg,
}

impl StarTracker {
    pub fn new(config: StarTrackerConfig, availability: Availability, seed: u64) -> Self {
        let model = MeasurementModel::StarTracker {
            sigma_rad: config.sigma_rad(),
        };
        Self {
            config,
            model,
            availability,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &StarTrackerConfig {
        &self.config
    }
}

impl AidingSensor for StarTracker {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn measurement_model(&self) -> &MeasurementModel {
        &self.model
    }

    fn observe(&mut self, truth: &TrueState) -> Option<DVector<f64>> {
        if !self.availability.is_available(truth.elapsed, &mut self.rng) {
            trace!("{} unavailable at {}", self.config.name, truth.elapsed);
            return None;
        }
        Some(self.model.simulate(truth, &mut self.rng))
    }
}

impl fmt::Display for StarTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.config)
    }
}

#[cfg(test)]
mod ut_star_tracker {
    use super::*;
    use crate::linalg::{UnitQuaternion, Vector3};
    use crate::time::TimeUnits;
    use rstest::rstest;

    #[rstest]
    #[case("standard", 5.0)]
    #[case("HIGH_ACCURACY", 1.0)]
    fn builtin_trackers(#[case] name: &str, #[case] arcsec: f64) {
        let config = StarTrackerConfig::from_name(name).unwrap();
        assert_eq!(config.accuracy_arcsec, arcsec);
        assert_eq!(config.sigma_rad(), arcsec * ARCSEC_TO_RAD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_tracker() {
        let err = StarTrackerConfig::from_name("hubble").unwrap_err();
        assert!(format!("{err}").contains("standard, high_accuracy"));
    }

    #[test]
    fn min_interval() {
        assert_eq!(StarTrackerConfig::standard().min_interval(), 100.milliseconds());
    }

    #[test]
    fn outage_yields_no_observation() {
        let truth = TrueState::new(
            Vector3::zeros(),
            Vector3::zeros(),
            UnitQuaternion::from_euler_angles(0.0, 0.5, 1.0),
        );
        let mut tracker = StarTracker::new(
            StarTrackerConfig::standard(),
            Availability::always().with_outage(Duration::ZERO, 1.minutes()),
            0,
        );
        assert!(tracker.observe(&truth).is_none());

        let mut later = truth;
        later.elapsed = 1.minutes();
        let z = tracker.observe(&later).unwrap();
        assert_eq!(z.len(), 3);
        let observed = UnitQuaternion::from_scaled_axis(Vector3::new(z[0], z[1], z[2]));
        assert!(observed.angle_to(&truth.attitude) < 10.0 * tracker.config().sigma_rad());
    }
}
