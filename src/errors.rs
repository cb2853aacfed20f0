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

use crate::estimation::FilterError;
use crate::io::ConfigError;
use crate::noise::NoiseError;
use crate::NominalEstimate;
use hifitime::Duration;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum NavError {
    #[snafu(display("scenario rejected before the first step: {source}"))]
    Configuration { source: ConfigError },
    #[snafu(display("sensor noise generation failed after {elapsed}: {source}"))]
    SensorNoise { elapsed: Duration, source: NoiseError },
    #[snafu(display("navigation filter diverged after {elapsed}: {source}"))]
    Divergence {
        elapsed: Duration,
        source: FilterError,
    },
}

impl NavError {
    /// Returns the last estimate known to be finite if this error is a filter divergence.
    pub fn last_good_estimate(&self) -> Option<&NominalEstimate> {
        match self {
            Self::Divergence { source, .. } => source.last_good_estimate(),
            _ => None,
        }
    }
}

impl From<ConfigError> for NavError {
    fn from(source: ConfigError) -> Self {
        Self::Configuration { source }
    }
}
