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

/*! # deepspace-ins

Strapdown inertial navigation error analysis for deep space flight. A spacecraft coasts (or thrusts) while
an IMU, either a classical navigation grade unit or a quantum-class unit, feeds a 15-state error-state Extended
Kalman Filter. Star tracker and gravimeter updates can be scheduled to bound the drift.

The entry point is [`sim::run`], which turns a [`sim::ScenarioConfig`] into a [`sim::ScenarioResult`].
*/

/// Seeded white noise and bias processes.
pub mod noise;

/// IMU, star tracker and gravimeter models, and the noise profiles which parametrize them.
pub mod sensors;

/// Gravity fields and the translational and attitude kinematics of the spacecraft.
pub mod dynamics;

/// Fixed step Runge Kutta integration of the dynamics.
pub mod propagators;

/// The error-state Extended Kalman Filter and its measurement models.
pub mod estimation;

/// Scenario configuration, the simulation loop, and parallel sweeps.
pub mod sim;

/// Configuration loading and serialization helpers.
pub mod io;

mod state;
pub use self::state::*;

mod errors;
/// Functions which may fail return an error instead of panicking.
pub use self::errors::NavError;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
    pub use na::{Quaternion, Rotation3, UnitQuaternion};
}

/// Re-export the most used items of this crate.
pub mod prelude {
    pub use crate::dynamics::{ControlFrame, ControlInput, GravityModel};
    pub use crate::estimation::{CovarianceUpdate, ErrorStateEkf, FilterError, FilterOptions};
    pub use crate::io::{Cadence, ConfigError, ConfigRepr};
    pub use crate::sensors::{
        GravimeterConfig, GravityMode, ImuModel, SensorProfile, StarTrackerConfig,
    };
    pub use crate::sim::{
        cadence_sweep, run, seed_sweep, AidingSensorConfig, ScenarioConfig, ScenarioResult,
        Simulation,
    };
    pub use crate::time::{Duration, TimeUnits, Unit};
    pub use crate::{ImuSample, NavError, NominalEstimate, TrueState};
}
