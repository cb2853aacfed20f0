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

use crate::linalg::{DimName, Matrix3, Vector3, U4};
use hyperdual::linalg::norm;
use hyperdual::{hyperspace_from_vector, Float, OHyperdual};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Gravitational parameter of the Earth, in m³/s².
pub const EARTH_MU_M3_S2: f64 = 3.986004418e14;
/// Second zonal harmonic of the Earth.
pub const EARTH_J2: f64 = 1.08263e-3;
/// Equatorial radius of the Earth, in meters.
pub const EARTH_RADIUS_M: f64 = 6.378137e6;

/// Below this radius (in meters) the central field is singular and the acceleration is set to zero.
const MIN_RADIUS_M: f64 = 1e-6;
/// Below this acceleration the gravity direction is undefined.
const MIN_ACCEL_M_S2: f64 = 1e-6;

type Dual = OHyperdual<f64, U4>;

/// Gravity field acting on the spacecraft. Every variant is evaluated through the same code path, flat space
/// simply returns zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum GravityModel {
    /// Deep space coast, no gravity at all.
    #[default]
    FlatSpace,
    /// Point mass central body.
    TwoBody { mu_m3_s2: f64 },
    /// Point mass central body with the J2 oblateness perturbation.
    J2 {
        mu_m3_s2: f64,
        j2: f64,
        radius_m: f64,
    },
}

impl GravityModel {
    pub fn earth_two_body() -> Self {
        Self::TwoBody {
            mu_m3_s2: EARTH_MU_M3_S2,
        }
    }

    pub fn earth_j2() -> Self {
        Self::J2 {
            mu_m3_s2: EARTH_MU_M3_S2,
            j2: EARTH_J2,
            radius_m: EARTH_RADIUS_M,
        }
    }

    /// Gravitational acceleration in m/s² at the provided inertial position.
    pub fn acceleration(&self, position_m: &Vector3<f64>) -> Vector3<f64> {
        if self.is_flat(position_m) {
            return Vector3::zeros();
        }

        let r = position_m.norm();
        let mut accel = position_m * (-self.mu() / r.powi(3));

        if let Self::J2 {
            mu_m3_s2,
            j2,
            radius_m,
        } = *self
        {
            let factor = 1.5 * j2 * mu_m3_s2 * radius_m.powi(2) / r.powi(5);
            let z2_r2 = position_m.z.powi(2) / r.powi(2);
            accel += Vector3::new(
                factor * position_m.x * (5.0 * z2_r2 - 1.0),
                factor * position_m.y * (5.0 * z2_r2 - 1.0),
                factor * position_m.z * (5.0 * z2_r2 - 3.0),
            );
        }

        accel
    }

    /// Returns the acceleration and its gradient ∂g/∂r, computed with hyperdual numbers.
    pub fn acceleration_and_gradient(&self, position_m: &Vector3<f64>) -> (Vector3<f64>, Matrix3<f64>) {
        if self.is_flat(position_m) {
            return (Vector3::zeros(), Matrix3::zeros());
        }

        let radius: Vector3<Dual> = hyperspace_from_vector(position_m);
        let accel = self.dual_acceleration(&radius);

        // Extract result into Vector3 and Matrix3
        let mut fx = Vector3::zeros();
        let mut grad = Matrix3::zeros();
        for i in 0..3 {
            fx[i] = accel[i].real();
            for j in 1..U4::dim() {
                grad[(i, j - 1)] = accel[i][j];
            }
        }

        (fx, grad)
    }

    /// Gradient of the gravity magnitude with respect to position, i.e. ĝᵀ·∂g/∂r, and the magnitude itself.
    /// Both are zero where gravity vanishes.
    pub fn magnitude_and_gradient(&self, position_m: &Vector3<f64>) -> (f64, Vector3<f64>) {
        if self.is_flat(position_m) {
            return (0.0, Vector3::zeros());
        }

        let radius: Vector3<Dual> = hyperspace_from_vector(position_m);
        let accel = self.dual_acceleration(&radius);
        if Vector3::new(accel[0].real(), accel[1].real(), accel[2].real()).norm() < MIN_ACCEL_M_S2 {
            return (0.0, Vector3::zeros());
        }

        let magnitude = norm(&accel);
        let mut grad = Vector3::zeros();
        for j in 1..U4::dim() {
            grad[j - 1] = magnitude[j];
        }

        (magnitude.real(), grad)
    }

    fn dual_acceleration(&self, radius: &Vector3<Dual>) -> Vector3<Dual> {
        let rmag = norm(radius);
        let mut accel = radius * (Dual::from_real(-self.mu()) / rmag.powi(3));

        if let Self::J2 {
            mu_m3_s2,
            j2,
            radius_m,
        } = *self
        {
            let one = Dual::from_real(1.0);
            let three = Dual::from_real(3.0);
            let five = Dual::from_real(5.0);

            let factor = Dual::from_real(1.5 * j2 * mu_m3_s2 * radius_m.powi(2)) / rmag.powi(5);
            let z2_r2 = radius[2] * radius[2] / (rmag * rmag);

            accel[0] += factor * radius[0] * (five * z2_r2 - one);
            accel[1] += factor * radius[1] * (five * z2_r2 - one);
            accel[2] += factor * radius[2] * (five * z2_r2 - three);
        }

        accel
    }

    fn mu(&self) -> f64 {
        match *self {
            Self::FlatSpace => 0.0,
            Self::TwoBody { mu_m3_s2 } => mu_m3_s2,
            Self::J2 { mu_m3_s2, .. } => mu_m3_s2,
        }
    }

    fn is_flat(&self, position_m: &Vector3<f64>) -> bool {
        matches!(self, Self::FlatSpace) || position_m.norm() < MIN_RADIUS_M
    }
}

impl fmt::Display for GravityModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FlatSpace => write!(f, "flat space"),
            Self::TwoBody { mu_m3_s2 } => write!(f, "two body (μ = {mu_m3_s2:e} m³/s²)"),
            Self::J2 {
                mu_m3_s2,
                j2,
                radius_m,
            } => write!(
                f,
                "two body + J2 (μ = {mu_m3_s2:e} m³/s², J2 = {j2:e}, R = {radius_m} m)"
            ),
        }
    }
}
