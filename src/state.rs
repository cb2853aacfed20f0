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

use crate::io::{duration_from_str, duration_to_str};
use crate::linalg::{SMatrix, SVector, UnitQuaternion, Vector3};
use hifitime::Duration;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Size of the error state δx = [δp, δv, δθ, δb_a, δb_ω].
pub const ERROR_STATE_SIZE: usize = 15;
/// Offset of the position error in the error state.
pub const POS: usize = 0;
/// Offset of the velocity error in the error state.
pub const VEL: usize = 3;
/// Offset of the attitude error (small rotation vector, body frame) in the error state.
pub const ATT: usize = 6;
/// Offset of the accelerometer bias error in the error state.
pub const ACC_BIAS: usize = 9;
/// Offset of the gyroscope bias error in the error state.
pub const GYR_BIAS: usize = 12;

pub type ErrorVector = SVector<f64, ERROR_STATE_SIZE>;
pub type ErrorCovariance = SMatrix<f64, ERROR_STATE_SIZE, ERROR_STATE_SIZE>;

/// The simulated truth of the spacecraft. The attitude rotates body frame vectors into the inertial frame.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrueState {
    /// Time elapsed since the start of the scenario
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub elapsed: Duration,
    pub position_m: Vector3<f64>,
    pub velocity_m_s: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
    pub accel_bias_m_s2: Vector3<f64>,
    pub gyro_bias_rad_s: Vector3<f64>,
    /// Non-gravitational acceleration in the body frame applied over the last step.
    pub specific_force_m_s2: Vector3<f64>,
    /// Body rate applied over the last step.
    pub angular_rate_rad_s: Vector3<f64>,
}

impl TrueState {
    /// Initializes a state at rest in the kinematic sense: no bias, no force, no rotation.
    pub fn new(
        position_m: Vector3<f64>,
        velocity_m_s: Vector3<f64>,
        attitude: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            elapsed: Duration::ZERO,
            position_m,
            velocity_m_s,
            attitude,
            accel_bias_m_s2: Vector3::zeros(),
            gyro_bias_rad_s: Vector3::zeros(),
            specific_force_m_s2: Vector3::zeros(),
            angular_rate_rad_s: Vector3::zeros(),
        }
    }
}

impl fmt::Display for TrueState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[truth @ {}] r = [{:.3}, {:.3}, {:.3}] m\tv = [{:.6}, {:.6}, {:.6}] m/s",
            self.elapsed,
            self.position_m[0],
            self.position_m[1],
            self.position_m[2],
            self.velocity_m_s[0],
            self.velocity_m_s[1],
            self.velocity_m_s[2],
        )
    }
}

/// The navigation filter's best estimate of the full state.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NominalEstimate {
    #[serde(serialize_with = "duration_to_str", deserialize_with = "duration_from_str")]
    pub elapsed: Duration,
    pub position_m: Vector3<f64>,
    pub velocity_m_s: Vector3<f64>,
    pub attitude: UnitQuaternion<f64>,
    pub accel_bias_m_s2: Vector3<f64>,
    pub gyro_bias_rad_s: Vector3<f64>,
}

impl NominalEstimate {
    /// Initializes the estimate on the truth kinematics, with zero bias estimates.
    pub fn from_truth(truth: &TrueState) -> Self {
        Self {
            elapsed: truth.elapsed,
            position_m: truth.position_m,
            velocity_m_s: truth.velocity_m_s,
            attitude: truth.attitude,
            accel_bias_m_s2: Vector3::zeros(),
            gyro_bias_rad_s: Vector3::zeros(),
        }
    }

    /// Folds an error state correction into this estimate.
    /// Position, velocity and biases are additive, the attitude is corrected as q ← q ⊗ δq(δθ).
    pub fn inject(&mut self, dx: &ErrorVector) {
        self.position_m += dx.fixed_rows::<3>(POS);
        self.velocity_m_s += dx.fixed_rows::<3>(VEL);
        self.attitude *= UnitQuaternion::from_scaled_axis(dx.fixed_rows::<3>(ATT).into_owned());
        self.attitude.renormalize();
        self.accel_bias_m_s2 += dx.fixed_rows::<3>(ACC_BIAS);
        self.gyro_bias_rad_s += dx.fixed_rows::<3>(GYR_BIAS);
    }

    /// Returns whether every component of this estimate is finite.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|x| x.is_finite())
            && self.velocity_m_s.iter().all(|x| x.is_finite())
            && self.attitude.coords.iter().all(|x| x.is_finite())
            && self.accel_bias_m_s2.iter().all(|x| x.is_finite())
            && self.gyro_bias_rad_s.iter().all(|x| x.is_finite())
    }

    /// Estimation error (estimate minus truth) laid out as the error state.
    /// The attitude error is the rotation vector of q_true⁻¹ ⊗ q̂.
    pub fn error_from(&self, truth: &TrueState) -> ErrorVector {
        let mut err = ErrorVector::zeros();
        err.fixed_rows_mut::<3>(POS)
            .copy_from(&(self.position_m - truth.position_m));
        err.fixed_rows_mut::<3>(VEL)
            .copy_from(&(self.velocity_m_s - truth.velocity_m_s));
        err.fixed_rows_mut::<3>(ATT)
            .copy_from(&(truth.attitude.inverse() * self.attitude).scaled_axis());
        err.fixed_rows_mut::<3>(ACC_BIAS)
            .copy_from(&(self.accel_bias_m_s2 - truth.accel_bias_m_s2));
        err.fixed_rows_mut::<3>(GYR_BIAS)
            .copy_from(&(self.gyro_bias_rad_s - truth.gyro_bias_rad_s));
        err
    }
}

impl fmt::Display for NominalEstimate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[estimate @ {}] r = [{:.3}, {:.3}, {:.3}] m\tv = [{:.6}, {:.6}, {:.6}] m/s",
            self.elapsed,
            self.position_m[0],
            self.position_m[1],
            self.position_m[2],
            self.velocity_m_s[0],
            self.velocity_m_s[1],
            self.velocity_m_s[2],
        )
    }
}

/// One IMU output: biased, scaled and noisy body frame specific force and angular rate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ImuSample {
    pub elapsed: Duration,
    pub specific_force_m_s2: Vector3<f64>,
    pub angular_rate_rad_s: Vector3<f64>,
}
