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

use crate::linalg::DVector;
use hifitime::Duration;
use std::fmt;

/// Stores the result of a measurement update.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    /// Time of the measurement
    pub elapsed: Duration,
    /// Kind of measurement which caused this residual
    pub kind: &'static str,
    /// The prefit residual in the units of the measurement type
    pub prefit: DVector<f64>,
    /// The postfit residual in the units of the measurement type
    pub postfit: DVector<f64>,
    /// The prefit residual ratio computed as the Mahalanobis distance, i.e. it is always positive
    /// and computed as `r' * (H*P*H' + R)^-1 * r`, where `r` is the prefit residual.
    pub ratio: f64,
    /// Each prefit component divided by the square root of the matching diagonal entry of the innovation covariance.
    pub sigma_ratios: DVector<f64>,
    /// The measurement noise (one sigma) of each component.
    pub msr_noise: DVector<f64>,
}

impl Residual {
    /// Largest absolute sigma ratio across the components.
    pub fn max_sigma_ratio(&self) -> f64 {
        self.sigma_ratios.amax()
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Residual of {} at {}: ratio = {:.3}\nPrefit {} Postfit {}",
            self.kind, self.elapsed, self.ratio, &self.prefit, &self.postfit
        )
    }
}

impl fmt::LowerExp for Residual {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Prefit {:e} Postfit {:e}", &self.prefit, &self.postfit)
    }
}
