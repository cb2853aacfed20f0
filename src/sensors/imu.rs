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

use super::{SensorProfile, TriadErrors};
use crate::linalg::Vector3;
use crate::noise::{normal, GaussMarkov, NoiseError, Stochastics, WhiteNoise};
use crate::{ImuSample, TrueState};
use hifitime::Duration;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::fmt;

/// Three orthogonal axes of one kind of inertial sensor.
#[derive(Clone, Debug)]
struct Triad {
    scale_error: Vector3<f64>,
    biases: [GaussMarkov; 3],
    white: WhiteNoise,
}

impl Triad {
    fn new(
        errors: &TriadErrors,
        turn_on: Vector3<f64>,
        scale_error: Vector3<f64>,
    ) -> Result<Self, NoiseError> {
        Ok(Self {
            scale_error,
            biases: [
                GaussMarkov::random_walk(errors.bias_instability, turn_on[0])?,
                GaussMarkov::random_walk(errors.bias_instability, turn_on[1])?,
                GaussMarkov::random_walk(errors.bias_instability, turn_on[2])?,
            ],
            white: WhiteNoise::new(errors.noise_density)?,
        })
    }

    fn bias(&self) -> Vector3<f64> {
        Vector3::new(self.biases[0].bias, self.biases[1].bias, self.biases[2].bias)
    }

    fn walk<R: Rng>(&mut self, dt_s: f64, rng: &mut R) -> Result<(), NoiseError> {
        for process in self.biases.iter_mut() {
            process.next_bias(dt_s, rng)?;
        }
        Ok(())
    }

    /// y = (1 + s)·y_true + b + w
    fn output<R: Rng>(
        &mut self,
        truth: &Vector3<f64>,
        dt_s: f64,
        rng: &mut R,
    ) -> Result<Vector3<f64>, NoiseError> {
        let mut y = truth.component_mul(&self.scale_error.add_scalar(1.0)) + self.bias();
        for i in 0..3 {
            y[i] += self.white.sample(dt_s, rng)?;
        }
        Ok(y)
    }
}

/// A strapdown IMU: an accelerometer triad and a gyroscope triad with their own biases, scale factor errors and noise.
///
/// Turn-on biases and scale factor errors are drawn once at construction. Each measurement then advances the bias
/// random walks before corrupting the true specific force and angular rate. All draws come from a single stream
/// seeded at construction, in a fixed order, so a given seed always yields the same sequence of samples.
#[derive(Clone, Debug)]
pub struct ImuModel {
    profile: SensorProfile,
    rng: Pcg64Mcg,
    accel: Triad,
    gyro: Triad,
}

impl ImuModel {
    pub fn new(profile: SensorProfile, seed: u64) -> Result<Self, NoiseError> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);

        let accel_turn_on = Vector3::from_fn(|_, _| normal(profile.accel.turn_on_bias, &mut rng));
        let gyro_turn_on = Vector3::from_fn(|_, _| normal(profile.gyro.turn_on_bias, &mut rng));
        let accel_scale = Vector3::from_fn(|_, _| normal(profile.accel.scale_factor, &mut rng));
        let gyro_scale = Vector3::from_fn(|_, _| normal(profile.gyro.scale_factor, &mut rng));

        let accel = Triad::new(&profile.accel, accel_turn_on, accel_scale)?;
        let gyro = Triad::new(&profile.gyro, gyro_turn_on, gyro_scale)?;

        debug!(
            "{} IMU seeded with {seed}: accel turn-on bias {:e} m/s², gyro turn-on bias {:e} rad/s",
            profile.name,
            accel.bias().norm(),
            gyro.bias().norm()
        );

        Ok(Self {
            profile,
            rng,
            accel,
            gyro,
        })
    }

    /// Samples the IMU over a step: the biases random walk first, then both triads are read.
    pub fn measure(&mut self, truth: &TrueState, step: Duration) -> Result<ImuSample, NoiseError> {
        let dt_s = step.to_seconds();

        self.accel.walk(dt_s, &mut self.rng)?;
        self.gyro.walk(dt_s, &mut self.rng)?;

        let specific_force_m_s2 = self
            .accel
            .output(&truth.specific_force_m_s2, dt_s, &mut self.rng)?;
        let angular_rate_rad_s = self
            .gyro
            .output(&truth.angular_rate_rad_s, dt_s, &mut self.rng)?;

        Ok(ImuSample {
            elapsed: truth.elapsed,
            specific_force_m_s2,
            angular_rate_rad_s,
        })
    }

    pub fn profile(&self) -> &SensorProfile {
        &self.profile
    }

    /// Current true accelerometer bias, in m/s².
    pub fn accel_bias(&self) -> Vector3<f64> {
        self.accel.bias()
    }

    /// Current true gyroscope bias, in rad/s.
    pub fn gyro_bias(&self) -> Vector3<f64> {
        self.gyro.bias()
    }

    pub fn accel_scale_error(&self) -> Vector3<f64> {
        self.accel.scale_error
    }

    pub fn gyro_scale_error(&self) -> Vector3<f64> {
        self.gyro.scale_error
    }
}

impl fmt::Display for ImuModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\n\taccel bias = {:e} m/s²\tgyro bias = {:e} rad/s",
            self.profile,
            self.accel_bias(),
            self.gyro_bias()
        )
    }
}
