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

use std::fmt;
use std::ops::{Mul, MulAssign};

use rand::Rng;
use serde_derive::{Deserialize, Serialize};

use super::{check_non_negative, check_step, normal, NoiseError, Stochastics};

/// White noise of a continuous process, characterized by its spectral density.
///
/// For an accelerometer the density is in m/s²/√Hz (i.e. m/s/√s, the velocity random walk), for a gyroscope it is in
/// rad/s/√Hz (i.e. rad/√s, the angle random walk).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WhiteNoise {
    /// Noise density, i.e. the square root of the two-sided power spectral density.
    pub density: f64,
}

impl WhiteNoise {
    /// Zero noise process.
    pub const ZERO: Self = Self { density: 0.0 };

    /// Initializes a new white noise process from its density, rejecting negative densities.
    pub fn new(density: f64) -> Result<Self, NoiseError> {
        check_non_negative("white noise density", density)?;
        Ok(Self { density })
    }

    /// Returns the integral of this process over `dt_s` seconds, i.e. N·√Δt·n where n ~ N(0, 1).
    pub fn increment<R: Rng>(&self, dt_s: f64, rng: &mut R) -> Result<f64, NoiseError> {
        check_step(dt_s)?;
        Ok(normal(self.density * dt_s.sqrt(), rng))
    }
}

impl Stochastics for WhiteNoise {
    /// Variance of the process averaged over Δt, i.e. N²/Δt.
    fn variance(&self, dt_s: f64) -> f64 {
        self.density.powi(2) / dt_s
    }

    /// Discrete sample of the continuous process averaged over the step, N/√Δt·n.
    fn sample<R: Rng>(&mut self, dt_s: f64, rng: &mut R) -> Result<f64, NoiseError> {
        check_step(dt_s)?;
        Ok(normal(self.density / dt_s.sqrt(), rng))
    }
}

impl fmt::Display for WhiteNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "white noise with density {:e}/√Hz", self.density)
    }
}

impl Mul<f64> for WhiteNoise {
    type Output = Self;

    /// Scale the white noise density by a constant.
    fn mul(mut self, rhs: f64) -> Self::Output {
        self.density *= rhs;
        self
    }
}

impl MulAssign<f64> for WhiteNoise {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}
