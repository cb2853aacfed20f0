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

use crate::NominalEstimate;
use hifitime::Duration;
use snafu::prelude::*;

/// The 15-state error-state Extended Kalman Filter.
pub mod ekf;
pub use ekf::{CovarianceUpdate, ErrorStateEkf, FilterOptions};

/// Observation models which map a state onto a star tracker or gravimeter measurement.
pub mod measurement;
pub use measurement::{GravityMode, Measurement, MeasurementModel, Sensitivity};

/// Discrete process noise of the inertial error dynamics.
pub mod process_noise;
pub use process_noise::ProcessNoise;

mod residual;
pub use residual::Residual;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilterError {
    #[snafu(display(
        "innovation covariance is singular at {elapsed}: reciprocal condition {rcond:.3e} below {tolerance:.3e}"
    ))]
    SingularInnovationCovariance {
        elapsed: Duration,
        rcond: f64,
        tolerance: f64,
        last_good: Box<NominalEstimate>,
    },
    #[snafu(display("non-finite {what} after the {stage} at {elapsed}"))]
    NonFinite {
        stage: &'static str,
        what: &'static str,
        elapsed: Duration,
        last_good: Box<NominalEstimate>,
    },
    #[snafu(display("{kind} observation has {got} components but the model expects {expected}"))]
    DimensionMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
}

impl FilterError {
    /// Returns the last estimate known to be finite, if this error carries one.
    pub fn last_good_estimate(&self) -> Option<&NominalEstimate> {
        match self {
            Self::SingularInnovationCovariance { last_good, .. } => Some(&**last_good),
            Self::NonFinite { last_good, .. } => Some(&**last_good),
            Self::DimensionMismatch { .. } => None,
        }
    }
}
