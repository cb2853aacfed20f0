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

use super::{AidingSensor, Availability, GravityMode};
use crate::dynamics::GravityModel;
use crate::estimation::MeasurementModel;
use crate::io::{ConfigError, ConfigRepr, InvalidConfigSnafu};
use crate::linalg::DVector;
use crate::TrueState;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// A gravimeter (gravity gradiometer or quantum gravimeter) configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GravimeterConfig {
    pub name: String,
    #[serde(default)]
    pub mode: GravityMode,
    /// One sigma noise per component, in m/s².
    pub noise_sigma_m_s2: f64,
}

impl ConfigRepr for GravimeterConfig {}

impl GravimeterConfig {
    pub fn new(name: &str, mode: GravityMode, noise_sigma_m_s2: f64) -> Self {
        Self {
            name: name.to_string(),
            mode,
            noise_sigma_m_s2,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            self.noise_sigma_m_s2.is_finite() && self.noise_sigma_m_s2 >= 0.0,
            InvalidConfigSnafu {
                msg: format!(
                    "gravimeter {} noise must be non-negative, got {}",
                    self.name, self.noise_sigma_m_s2
                )
            }
        );
        Ok(())
    }
}

/// Measures the local gravitational acceleration of the provided field.
pub struct Gravimeter {
    config: GravimeterConfig,
    model: MeasurementModel,
    availability: Availability,
    rng: Pcg64Mcg,
}

impl Gravimeter {
    pub fn new(
        config: GravimeterConfig,
        field: GravityModel,
        availability: Availability,
        seed: u64,
    ) -> Self {
        let model = MeasurementModel::Gravity {
            field,
            mode: config.mode,
            sigma_m_s2: config.noise_sigma_m_s2,
        };
        Self {
            config,
            model,
            availability,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }
}

impl AidingSensor for Gravimeter {
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

impl fmt::Display for Gravimeter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} gravimeter: {}", self.config.name, self.model)
    }
}

#[cfg(test)]
mod ut_gravimeter {
    use super::*;
    use crate::linalg::{UnitQuaternion, Vector3};

    #[test]
    fn magnitude_observation() {
        let truth = TrueState::new(
            Vector3::new(7000e3, 0.0, 0.0),
            Vector3::zeros(),
            UnitQuaternion::identity(),
        );
        let field = GravityModel::earth_two_body();
        let mut gravimeter = Gravimeter::new(
            GravimeterConfig::new("grav", GravityMode::Magnitude, 1e-6),
            field,
            Availability::always(),
            3,
        );
        let z = gravimeter.observe(&truth).unwrap();
        assert_eq!(z.len(), 1);
        let expected = field.acceleration(&truth.position_m).norm();
        assert!((z[0] - expected).abs() < 1e-5);
        assert_eq!(gravimeter.name(), "grav");
    }

    #[test]
    fn negative_noise_is_invalid() {
        assert!(GravimeterConfig::new("grav", GravityMode::Vector, -1.0)
            .validate()
            .is_err());
    }
}
