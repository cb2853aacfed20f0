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

use crate::io::{ConfigError, ConfigRepr, InvalidConfigSnafu, UnknownNameSnafu};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// Standard gravity, in m/s², per micro-g.
pub const MICRO_G_TO_M_S2: f64 = 9.80665e-6;
/// One degree per hour in rad/s.
pub const DEG_PER_HOUR_TO_RAD_S: f64 = 4.848136811095360e-6;
/// One part per million.
pub const PPM: f64 = 1e-6;

/// Error characteristics of one sensor triad (three identical orthogonal axes), in SI units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriadErrors {
    /// White noise density: m/s²/√Hz for an accelerometer, rad/s/√Hz for a gyroscope.
    pub noise_density: f64,
    /// Bias instability, driving the bias random walk, in units/√s.
    pub bias_instability: f64,
    /// One sigma of the turn-on bias, drawn once at power up.
    pub turn_on_bias: f64,
    /// One sigma of the scale factor error (dimensionless).
    pub scale_factor: f64,
}

impl TriadErrors {
    fn validate(&self, triad: &str) -> Result<(), ConfigError> {
        for (what, value) in [
            ("noise density", self.noise_density),
            ("bias instability", self.bias_instability),
            ("turn-on bias", self.turn_on_bias),
            ("scale factor", self.scale_factor),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                InvalidConfigSnafu {
                    msg: format!("{triad} {what} must be non-negative and finite, got {value}")
                }
            );
        }
        Ok(())
    }
}

/// Noise profile of an IMU. Classical and quantum-class units differ only by these numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub name: String,
    pub accel: TriadErrors,
    pub gyro: TriadErrors,
}

impl ConfigRepr for SensorProfile {}

impl SensorProfile {
    /// Names of the built-in profiles.
    pub const NAMES: [&'static str; 2] = ["classical", "quantum"];

    /// Builds a profile from datasheet units.
    ///
    /// # Arguments
    ///
    /// * `accel_noise_ug_rthz` - accelerometer white noise in μg/√Hz
    /// * `accel_bias_instability_ug` - accelerometer bias instability in μg
    /// * `accel_turn_on_ug` - accelerometer turn-on bias in μg
    /// * `accel_scale_ppm` - accelerometer scale factor error in ppm
    /// * `gyro_arw_deg_rthr` - gyroscope angle random walk in °/√h
    /// * `gyro_bias_instability_deg_hr` - gyroscope bias instability in °/h
    /// * `gyro_turn_on_deg_hr` - gyroscope turn-on bias in °/h
    /// * `gyro_scale_ppm` - gyroscope scale factor error in ppm
    #[allow(clippy::too_many_arguments)]
    pub fn from_datasheet(
        name: &str,
        accel_noise_ug_rthz: f64,
        accel_bias_instability_ug: f64,
        accel_turn_on_ug: f64,
        accel_scale_ppm: f64,
        gyro_arw_deg_rthr: f64,
        gyro_bias_instability_deg_hr: f64,
        gyro_turn_on_deg_hr: f64,
        gyro_scale_ppm: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            accel: TriadErrors {
                noise_density: accel_noise_ug_rthz * MICRO_G_TO_M_S2,
                bias_instability: accel_bias_instability_ug * MICRO_G_TO_M_S2,
                turn_on_bias: accel_turn_on_ug * MICRO_G_TO_M_S2,
                scale_factor: accel_scale_ppm * PPM,
            },
            gyro: TriadErrors {
                // °/√h → rad/√s: (π/180)/√3600
                noise_density: gyro_arw_deg_rthr * DEG_PER_HOUR_TO_RAD_S * 60.0,
                bias_instability: gyro_bias_instability_deg_hr * DEG_PER_HOUR_TO_RAD_S,
                turn_on_bias: gyro_turn_on_deg_hr * DEG_PER_HOUR_TO_RAD_S,
                scale_factor: gyro_scale_ppm * PPM,
            },
        }
    }

    /// Navigation grade IMU: 100 μg/√Hz, 10 μg, 0.01 °/√h, 0.01 °/h.
    pub fn classical() -> Self {
        Self::from_datasheet("classical", 100.0, 10.0, 100.0, 100.0, 0.01, 0.01, 0.1, 100.0)
    }

    /// Quantum-class IMU (cold atom interferometry): 1 μg/√Hz, 0.1 μg, 1e-4 °/√h, 1e-4 °/h.
    pub fn quantum() -> Self {
        Self::from_datasheet("quantum", 1.0, 0.1, 1.0, 1.0, 0.0001, 0.0001, 0.001, 1.0)
    }

    /// A profile without any error: the IMU outputs the truth.
    pub fn perfect() -> Self {
        Self {
            name: "perfect".to_string(),
            accel: TriadErrors::default(),
            gyro: TriadErrors::default(),
        }
    }

    /// Returns one of the built-in profiles by name, case insensitive.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "classical" => Ok(Self::classical()),
            "quantum" => Ok(Self::quantum()),
            _ => UnknownNameSnafu {
                kind: "IMU profile",
                name,
                available: Self::NAMES.join(", "),
            }
            .fail(),
        }
    }

    /// Ensures that every parameter is non-negative and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.accel.validate("accelerometer")?;
        self.gyro.validate("gyroscope")
    }
}

impl fmt::Display for SensorProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} IMU: accel {:.3e} m/s²/√Hz (bias inst. {:.3e} m/s²), gyro {:.3e} rad/s/√Hz (bias inst. {:.3e} rad/s)",
            self.name,
            self.accel.noise_density,
            self.accel.bias_instability,
            self.gyro.noise_density,
            self.gyro.bias_instability
        )
    }
}

/// Selection of an IMU profile in a scenario, either by name or fully specified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileSpec {
    Named(String),
    Custom(SensorProfile),
}

impl ProfileSpec {
    /// Resolves this selection into a validated profile.
    pub fn resolve(&self) -> Result<SensorProfile, ConfigError> {
        let profile = match self {
            Self::Named(name) => SensorProfile::from_name(name)?,
            Self::Custom(profile) => profile.clone(),
        };
        profile.validate()?;
        Ok(profile)
    }
}

impl From<SensorProfile> for ProfileSpec {
    fn from(profile: SensorProfile) -> Self {
        Self::Custom(profile)
    }
}

impl From<&str> for ProfileSpec {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}
