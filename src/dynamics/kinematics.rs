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

use super::{ControlInput, Dynamics, GravityModel, KinematicVector};
use crate::linalg::{Quaternion, UnitQuaternion, Vector4};
use crate::TrueState;
use std::fmt;

/// The attitude quaternion is renormalized when its norm drifts further than this from one.
pub const ATTITUDE_NORM_TOLERANCE: f64 = 1e-8;

/// Rigid body kinematics: r̈ = g(r) + a_control and q̇ = ½ q ⊗ [0, ω].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SpacecraftKinematics {
    pub gravity: GravityModel,
}

impl SpacecraftKinematics {
    pub fn new(gravity: GravityModel) -> Self {
        Self { gravity }
    }

    /// Packs the integrated part of the state.
    pub fn to_vector(state: &TrueState) -> KinematicVector {
        let mut vec = KinematicVector::zeros();
        vec.fixed_rows_mut::<3>(0).copy_from(&state.position_m);
        vec.fixed_rows_mut::<3>(3).copy_from(&state.velocity_m_s);
        vec.fixed_rows_mut::<4>(6).copy_from(&state.attitude.coords);
        vec
    }

    /// Unpacks an integrated vector into `state`. The quaternion must already be normalized.
    pub fn set_from_vector(state: &mut TrueState, vec: &KinematicVector) {
        state.position_m = vec.fixed_rows::<3>(0).into_owned();
        state.velocity_m_s = vec.fixed_rows::<3>(3).into_owned();
        state.attitude = UnitQuaternion::new_unchecked(Quaternion::from_vector(
            vec.fixed_rows::<4>(6).into_owned(),
        ));
    }
}

impl Dynamics for SpacecraftKinematics {
    fn eom(
        &self,
        _delta_t_s: f64,
        state_vec: &KinematicVector,
        control: &ControlInput,
    ) -> KinematicVector {
        let position = state_vec.fixed_rows::<3>(0).into_owned();
        let velocity = state_vec.fixed_rows::<3>(3).into_owned();
        let q = Quaternion::from_vector(state_vec.fixed_rows::<4>(6).into_owned());

        // Intermediate stages are not unit quaternions, only their direction matters to rotate the thrust.
        let attitude = UnitQuaternion::from_quaternion(q);
        let acceleration = self.gravity.acceleration(&position) + control.inertial_acceleration(&attitude);

        let q_dot: Vector4<f64> = (q * Quaternion::from_imag(control.angular_rate_rad_s)).coords * 0.5;

        let mut d_x = KinematicVector::zeros();
        d_x.fixed_rows_mut::<3>(0).copy_from(&velocity);
        d_x.fixed_rows_mut::<3>(3).copy_from(&acceleration);
        d_x.fixed_rows_mut::<4>(6).copy_from(&q_dot);
        d_x
    }

    fn finally(&self, mut next_state: KinematicVector) -> KinematicVector {
        let norm = next_state.fixed_rows::<4>(6).norm();
        if (norm - 1.0).abs() > ATTITUDE_NORM_TOLERANCE {
            trace!("renormalizing attitude quaternion (norm = {norm})");
            next_state.fixed_rows_mut::<4>(6).unscale_mut(norm);
        }
        next_state
    }
}

impl fmt::Display for SpacecraftKinematics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Spacecraft kinematics in {}", self.gravity)
    }
}
