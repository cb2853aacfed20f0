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

use crate::sensors::SensorProfile;
use crate::state::{ErrorCovariance, ErrorVector, ACC_BIAS, ATT, GYR_BIAS, VEL};
use std::fmt;

/// Continuous process noise of the inertial error dynamics, derived from the IMU noise profile.
///
/// The spectral densities are diag(0, N_a², N_ω², σ_ba², σ_bω²) over [δp, δv, δθ, δb_a, δb_ω]: velocity random walk from
/// the accelerometer noise, angle random walk from the gyroscope noise, and the bias random walks. The discrete noise
/// is the first order Q_d = Q·Δt, positive semi-definite by construction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProcessNoise {
    diag: ErrorVector,
}

impl ProcessNoise {
    /// No process noise at all.
    pub fn zero() -> Self {
        Self {
            diag: ErrorVector::zeros(),
        }
    }

    pub fn from_profile(profile: &SensorProfile) -> Self {
        let mut diag = ErrorVector::zeros();
        for i in 0..3 {
            diag[VEL + i] = profile.accel.noise_density.powi(2);
            diag[ATT + i] = profile.gyro.noise_density.powi(2);
            diag[ACC_BIAS + i] = profile.accel.bias_instability.powi(2);
            diag[GYR_BIAS + i] = profile.gyro.bias_instability.powi(2);
        }
        Self { diag }
    }

    /// Spectral densities on the diagonal of Q.
    pub fn spectral_densities(&self) -> &ErrorVector {
        &self.diag
    }

    /// Discrete process noise over a step of `dt_s` seconds.
    pub fn to_discrete(&self, dt_s: f64) -> ErrorCovariance {
        ErrorCovariance::from_diagonal(&(self.diag * dt_s))
    }
}

impl fmt::Display for ProcessNoise {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fmt_cov = self
            .diag
            .iter()
            .map(|q| format!("{q:.1e}"))
            .collect::<Vec<String>>();
        write!(f, "Process noise: diag({})", fmt_cov.join(", "))
    }
}
