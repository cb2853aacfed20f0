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

use crate::io::{maybe_duration_from_str, maybe_duration_to_str};
use hifitime::Duration;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

use super::{
    check_non_negative, check_step, normal, NoiseError, NonPositiveTimeConstantSnafu, Stochastics,
};

/// A first order Gauss-Markov process for modeling slowly varying sensor biases.
///
/// The discrete model is
///
/// b ← b·exp(−Δt/τ) + σ_b·√Δt·n, with n ~ N(0, 1)
///
/// where σ_b is the bias instability in units per √s. Without a time constant (τ = ∞), the decay vanishes and the process
/// is a pure random walk, which is how IMU bias instability is modeled by default.
///
/// # Implementation notes
///
/// 1. There is no epoch in this process: only the step size matters.
/// 2. The driving noise is σ_b·√Δt for both the random walk and the first order process.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GaussMarkov {
    /// Time constant of the process, the process is a random walk if unset.
    #[serde(
        serialize_with = "maybe_duration_to_str",
        deserialize_with = "maybe_duration_from_str",
        default
    )]
    pub tau: Option<Duration>,
    /// Standard deviation of the driving white noise, per √s.
    pub bias_sigma: f64,
    /// Latest bias
    #[serde(skip)]
    pub bias: f64,
}

impl fmt::Display for GaussMarkov {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> fmt::Result {
        match self.tau {
            None => write!(
                f,
                "Random walk with σ = {:e}: bias = {:e}",
                self.bias_sigma, self.bias
            ),
            Some(tau) => write!(
                f,
                "First order Gauss-Markov process with τ = {} and σ = {:e}: bias = {:e}",
                tau, self.bias_sigma, self.bias
            ),
        }
    }
}

impl GaussMarkov {
    /// Zero noise process.
    pub const ZERO: Self = Self {
        tau: None,
        bias_sigma: 0.0,
        bias: 0.0,
    };

    /// Initializes a random walk (τ = ∞) starting at `init_bias`.
    pub fn random_walk(bias_sigma: f64, init_bias: f64) -> Result<Self, NoiseError> {
        check_non_negative("bias instability", bias_sigma)?;
        Ok(Self {
            tau: None,
            bias_sigma,
            bias: init_bias,
        })
    }

    /// Initializes a first order Gauss-Markov process with time constant `tau`, starting at `init_bias`.
    pub fn first_order(tau: Duration, bias_sigma: f64, init_bias: f64) -> Result<Self, NoiseError> {
        ensure!(tau > Duration::ZERO, NonPositiveTimeConstantSnafu { tau });
        check_non_negative("bias instability", bias_sigma)?;
        Ok(Self {
            tau: Some(tau),
            bias_sigma,
            bias: init_bias,
        })
    }

    /// Returns whether this process is a pure random walk.
    pub fn is_random_walk(&self) -> bool {
        self.tau.is_none()
    }

    /// Advances the bias by `dt_s` seconds and returns the new bias.
    pub fn next_bias<R: Rng>(&mut self, dt_s: f64, rng: &mut R) -> Result<f64, NoiseError> {
        check_step(dt_s)?;
        let decay = match self.tau {
            None => 1.0,
            Some(tau) => (-dt_s / tau.to_seconds()).exp(),
        };

        self.bias = self.bias * decay + normal(self.bias_sigma * dt_s.sqrt(), rng);

        Ok(self.bias)
    }
}

impl Stochastics for GaussMarkov {
    /// Variance added to the bias over a single step.
    fn variance(&self, dt_s: f64) -> f64 {
        self.bias_sigma.powi(2) * dt_s
    }

    fn sample<R: Rng>(&mut self, dt_s: f64, rng: &mut R) -> Result<f64, NoiseError> {
        self.next_bias(dt_s, rng)
    }
}

#[test]
fn random_walk_test() {
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    let mut rng = Pcg64Mcg::seed_from_u64(0);

    // After n unit steps, the walk has a standard deviation of σ√n: check it across many independent walks.
    let n_walks = 2_000;
    let n_steps = 100;
    let finals = (0..n_walks)
        .map(|_| {
            let mut walk = GaussMarkov::random_walk(0.1, 0.0).unwrap();
            for _ in 0..n_steps {
                walk.next_bias(1.0, &mut rng).unwrap();
            }
            walk.bias
        })
        .collect::<Vec<f64>>();

    let var = finals.iter().map(|b| b.powi(2)).sum::<f64>() / n_walks as f64;
    let expected = 0.1 * (n_steps as f64).sqrt();
    assert!((var.sqrt() - expected).abs() / expected < 0.05);
}

#[test]
fn fogm_decay_test() {
    use hifitime::TimeUnits;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    let mut rng = Pcg64Mcg::seed_from_u64(0);
    let mut gm = GaussMarkov::first_order(100.seconds(), 0.0, 1.0).unwrap();
    for _ in 0..100 {
        gm.next_bias(1.0, &mut rng).unwrap();
    }
    // Without driving noise, the bias decays by e after τ.
    assert!((gm.bias - (-1.0_f64).exp()).abs() < 1e-12);
}

#[test]
fn zero_noise_test() {
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    let mut gm = GaussMarkov::random_walk(0.0, 1.5e-4).unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(0);
    for _ in 0..1000 {
        assert_eq!(gm.next_bias(1.0, &mut rng).unwrap(), 1.5e-4);
    }
}

#[test]
fn invalid_parameters_test() {
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    assert!(GaussMarkov::random_walk(-1.0, 0.0).is_err());
    assert!(GaussMarkov::first_order(Duration::ZERO, 0.1, 0.0).is_err());

    let mut rng = Pcg64Mcg::seed_from_u64(0);
    let mut gm = GaussMarkov::ZERO;
    assert_eq!(
        gm.next_bias(0.0, &mut rng),
        Err(NoiseError::NonPositiveStep { dt_s: 0.0 })
    );
}

#[test]
fn serde_test() {
    use std::str::FromStr;

    // Note that we set the initial bias to zero because it is not serialized.
    let gm = GaussMarkov::random_walk(0.1, 0.0).unwrap();
    let serialized = serde_yaml::to_string(&gm).unwrap();
    println!("{serialized}");
    let gm_deser: GaussMarkov = serde_yaml::from_str(&serialized).unwrap();
    assert_eq!(gm_deser, gm);

    let s = r#"
    tau: 1 h
    bias_sigma: 0.1
    "#;

    let gm_deser: GaussMarkov = serde_yaml::from_str(s).unwrap();
    let gm = GaussMarkov::first_order(Duration::from_str("1 h").unwrap(), 0.1, 0.0).unwrap();

    assert_eq!(gm_deser, gm);

    let walk: GaussMarkov = serde_yaml::from_str("bias_sigma: 0.2").unwrap();
    assert!(walk.is_random_walk());
}
