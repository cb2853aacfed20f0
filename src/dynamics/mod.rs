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

use crate::linalg::{SVector, UnitQuaternion, Vector3};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Point mass and J2 gravity fields, with their gradient.
pub mod gravity;
pub use gravity::GravityModel;

/// Translational motion and attitude kinematics of a rigid spacecraft.
pub mod kinematics;
pub use kinematics::SpacecraftKinematics;

/// Size of the integrated vector: position (3), velocity (3), attitude quaternion (4, stored as i, j, k, w).
pub const KINEMATIC_SIZE: usize = 10;
pub type KinematicVector = SVector<f64, KINEMATIC_SIZE>;

/// The `Dynamics` trait handles the equations of motion integrated by a propagator.
pub trait Dynamics {
    /// Defines the equations of motion of these dynamics, `delta_t_s` seconds into the step.
    fn eom(
        &self,
        delta_t_s: f64,
        state_vec: &KinematicVector,
        control: &ControlInput,
    ) -> KinematicVector;

    /// Optionally performs some final changes after each successful integration of the equations of motion.
    fn finally(&self, next_state: KinematicVector) -> KinematicVector {
        next_state
    }
}

/// Frame in which a control acceleration is expressed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlFrame {
    /// Fixed to the spacecraft, e.g. a main engine along the body X axis.
    #[default]
    Body,
    Inertial,
}

/// Commanded non-gravitational acceleration and body rate, held constant over the scenario.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlInput {
    pub acceleration_m_s2: Vector3<f64>,
    pub frame: ControlFrame,
    /// Body rate with respect to the inertial frame, expressed in the body frame.
    pub angular_rate_rad_s: Vector3<f64>,
}

impl Default for ControlInput {
    fn default() -> Self {
        Self {
            acceleration_m_s2: Vector3::zeros(),
            frame: ControlFrame::Body,
            angular_rate_rad_s: Vector3::zeros(),
        }
    }
}

impl ControlInput {
    /// Constant thrust acceleration along a body fixed direction, without rotation.
    pub fn body_thrust(acceleration_m_s2: Vector3<f64>) -> Self {
        Self {
            acceleration_m_s2,
            ..Default::default()
        }
    }

    /// Returns a copy of this control with the provided body rate.
    pub fn with_angular_rate(mut self, angular_rate_rad_s: Vector3<f64>) -> Self {
        self.angular_rate_rad_s = angular_rate_rad_s;
        self
    }

    /// Control acceleration in the inertial frame, given the current attitude.
    pub fn inertial_acceleration(&self, attitude: &UnitQuaternion<f64>) -> Vector3<f64> {
        match self.frame {
            ControlFrame::Body => attitude * self.acceleration_m_s2,
            ControlFrame::Inertial => self.acceleration_m_s2,
        }
    }

    /// Control acceleration in the body frame, i.e. the specific force an ideal accelerometer would sense.
    pub fn body_specific_force(&self, attitude: &UnitQuaternion<f64>) -> Vector3<f64> {
        match self.frame {
            ControlFrame::Body => self.acceleration_m_s2,
            ControlFrame::Inertial => attitude.inverse_transform_vector(&self.acceleration_m_s2),
        }
    }
}

impl fmt::Display for ControlInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:?} frame acceleration [{:e}, {:e}, {:e}] m/s², body rate [{:e}, {:e}, {:e}] rad/s",
            self.frame,
            self.acceleration_m_s2[0],
            self.acceleration_m_s2[1],
            self.acceleration_m_s2[2],
            self.angular_rate_rad_s[0],
            self.angular_rate_rad_s[1],
            self.angular_rate_rad_s[2],
        )
    }
}
