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

use hifitime::Duration;
use rand::Rng;
use rand_distr::StandardNormal;
use snafu::prelude::*;

pub mod gauss_markov;
pub mod white;

pub use gauss_markov::GaussMarkov;
pub use white::WhiteNoise;

/// Trait for any kind of stochastic modeling of sensor errors.
///
/// Every generator draws from the random number generator it is handed, so that a seeded stream
/// and a fixed call order reproduce bit-identical sequences.
pub trait Stochastics {
    /// Return the variance of a single sample of this model drawn over a step of `dt_s` seconds.
    fn variance(&self, dt_s: f64) -> f64;

    /// Returns a new sample of these stochastics, drawn over a step of `dt_s` seconds.
    fn sample<R: Rng>(&mut self, dt_s: f64, rng: &mut R) -> Result<f64, NoiseError>;
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NoiseError {
    #[snafu(display("noise time step must be positive and finite, got {dt_s} s"))]
    NonPositiveStep { dt_s: f64 },
    #[snafu(display("{what} must be non-negative and finite, got {value}"))]
    NegativeParameter { what: &'static str, value: f64 },
    #[snafu(display("Gauss-Markov time constant must be positive, got {tau}"))]
    NonPositiveTimeConstant { tau: Duration },
}

pub(crate) fn check_step(dt_s: f64) -> Result<(), NoiseError> {
    ensure!(dt_s.is_finite() && dt_s > 0.0, NonPositiveStepSnafu { dt_s });
    Ok(())
}

pub(crate) fn check_non_negative(what: &'static str, value: f64) -> Result<(), NoiseError> {
    ensure!(
        value.is_finite() && value >= 0.0,
        NegativeParameterSnafu { what, value }
    );
    Ok(())
}

/// Draws a standard normal deviate and scales it by `sigma`.
pub(crate) fn normal<R: Rng>(sigma: f64, rng: &mut R) -> f64 {
    let n: f64 = rng.sample(StandardNormal);
    sigma * n
}
