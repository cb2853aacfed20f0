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

use super::{DimensionMismatchSnafu, FilterError};
use crate::dynamics::GravityModel;
use crate::linalg::{Const, DMatrix, DVector, Dyn, Matrix3, OMatrix, UnitQuaternion, Vector3};
use crate::noise::normal;
use crate::state::{ATT, ERROR_STATE_SIZE, POS};
use crate::{NominalEstimate, TrueState};
use hifitime::Duration;
use rand::Rng;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// Measurement sensitivity matrix, one row per observation component.
pub type Sensitivity = OMatrix<f64, Dyn, Const<ERROR_STATE_SIZE>>;

/// What a gravimeter reports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GravityMode {
    /// Full inertial gravity vector (three components).
    #[default]
    Vector,
    /// Gravity magnitude only (one component).
    Magnitude,
}

/// Observation model of an aiding sensor.
///
/// Each variant provides the predicted observation h(x̂), the sensitivity H = ∂h/∂δx over the error state and the
/// noise covariance R, so the filter update does not need to know which sensor it is processing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MeasurementModel {
    /// Inertial attitude, reported as a rotation vector. H selects δθ and R = σ²I₃.
    StarTracker { sigma_rad: f64 },
    /// Local gravitational acceleration, sensitive to position through the gravity gradient.
    Gravity {
        field: GravityModel,
        mode: GravityMode,
        sigma_m_s2: f64,
    },
}

impl MeasurementModel {
    /// Number of components of one observation.
    pub fn dimension(&self) -> usize {
        match self {
            Self::StarTracker { .. } => 3,
            Self::Gravity { mode, .. } => match mode {
                GravityMode::Vector => 3,
                GravityMode::Magnitude => 1,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::StarTracker { .. } => "star tracker attitude",
            Self::Gravity { mode, .. } => match mode {
                GravityMode::Vector => "gravity vector",
                GravityMode::Magnitude => "gravity magnitude",
            },
        }
    }

    fn sigma(&self) -> f64 {
        match self {
            Self::StarTracker { sigma_rad } => *sigma_rad,
            Self::Gravity { sigma_m_s2, .. } => *sigma_m_s2,
        }
    }

    fn evaluate(&self, position_m: &Vector3<f64>, attitude: &UnitQuaternion<f64>) -> DVector<f64> {
        match self {
            Self::StarTracker { .. } => DVector::from_column_slice(attitude.scaled_axis().as_slice()),
            Self::Gravity { field, mode, .. } => match mode {
                GravityMode::Vector => {
                    DVector::from_column_slice(field.acceleration(position_m).as_slice())
                }
                GravityMode::Magnitude => {
                    DVector::from_element(1, field.acceleration(position_m).norm())
                }
            },
        }
    }

    /// Noise free observation of the truth.
    pub fn observe(&self, truth: &TrueState) -> DVector<f64> {
        self.evaluate(&truth.position_m, &truth.attitude)
    }

    /// Predicted observation h(x̂) of the nominal estimate.
    pub fn predict(&self, nominal: &NominalEstimate) -> DVector<f64> {
        self.evaluate(&nominal.position_m, &nominal.attitude)
    }

    /// Sensitivity of the observation to the error state, evaluated at the nominal estimate.
    pub fn sensitivity(&self, nominal: &NominalEstimate) -> Sensitivity {
        let mut h_tilde = Sensitivity::zeros(self.dimension());
        match self {
            Self::StarTracker { .. } => {
                h_tilde
                    .fixed_view_mut::<3, 3>(0, ATT)
                    .copy_from(&Matrix3::identity());
            }
            Self::Gravity { field, mode, .. } => match mode {
                GravityMode::Vector => {
                    let (_, grad) = field.acceleration_and_gradient(&nominal.position_m);
                    h_tilde.fixed_view_mut::<3, 3>(0, POS).copy_from(&grad);
                }
                GravityMode::Magnitude => {
                    let (_, grad) = field.magnitude_and_gradient(&nominal.position_m);
                    h_tilde
                        .fixed_view_mut::<1, 3>(0, POS)
                        .copy_from(&grad.transpose());
                }
            },
        }
        h_tilde
    }

    /// Measurement noise covariance R.
    pub fn noise_covariance(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal_element(self.dimension(), self.dimension(), self.sigma().powi(2))
    }

    fn check_dimension(&self, observation: &DVector<f64>) -> Result<(), FilterError> {
        ensure!(
            observation.len() == self.dimension(),
            DimensionMismatchSnafu {
                kind: self.kind(),
                expected: self.dimension(),
                got: observation.len()
            }
        );
        Ok(())
    }

    /// Difference between an observation and the prediction, z ⊖ h(x̂).
    /// The attitude residual is taken on the rotation manifold, as the body frame rotation from q̂ to the observed attitude.
    pub fn innovation(
        &self,
        observation: &DVector<f64>,
        nominal: &NominalEstimate,
    ) -> Result<DVector<f64>, FilterError> {
        self.check_dimension(observation)?;
        Ok(match self {
            Self::StarTracker { .. } => {
                let observed = UnitQuaternion::from_scaled_axis(Vector3::new(
                    observation[0],
                    observation[1],
                    observation[2],
                ));
                let delta = nominal.attitude.inverse() * observed;
                DVector::from_column_slice(delta.scaled_axis().as_slice())
            }
            Self::Gravity { .. } => observation - self.predict(nominal),
        })
    }

    /// Bundles an observation with everything the filter needs to process it.
    pub fn linearize(
        &self,
        observation: DVector<f64>,
        nominal: &NominalEstimate,
    ) -> Result<Measurement, FilterError> {
        let innovation = self.innovation(&observation, nominal)?;

        Ok(Measurement {
            elapsed: nominal.elapsed,
            kind: self.kind(),
            computed: self.predict(nominal),
            innovation,
            sensitivity: self.sensitivity(nominal),
            noise: self.noise_covariance(),
            observation,
        })
    }

    /// Synthesizes a noisy observation of the truth.
    /// The star tracker attitude is perturbed by a small body frame rotation, the gravimeter additively.
    pub fn simulate<R: Rng>(&self, truth: &TrueState, rng: &mut R) -> DVector<f64> {
        let sigma = self.sigma();
        match self {
            Self::StarTracker { .. } => {
                let error = Vector3::from_fn(|_, _| normal(sigma, &mut *rng));
                let measured = truth.attitude * UnitQuaternion::from_scaled_axis(error);
                DVector::from_column_slice(measured.scaled_axis().as_slice())
            }
            Self::Gravity { .. } => {
                let mut observation = self.observe(truth);
                for component in observation.iter_mut() {
                    *component += normal(sigma, &mut *rng);
                }
                observation
            }
        }
    }
}

impl fmt::Display for MeasurementModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (σ = {:e})", self.kind(), self.sigma())
    }
}

/// One processed observation: what was observed, what was expected, and the linearization around the estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub kind: &'static str,
    /// The observation z.
    pub observation: DVector<f64>,
    /// The computed observation h(x̂).
    pub computed: DVector<f64>,
    /// The prefit residual y = z ⊖ h(x̂).
    pub innovation: DVector<f64>,
    pub sensitivity: Sensitivity,
    pub noise: DMatrix<f64>,
}

#[cfg(test)]
mod ut_measurement {
    use super::*;
    use crate::state::ErrorVector;
    use crate::state::VEL;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn nominal_leo() -> NominalEstimate {
        let truth = TrueState::new(
            Vector3::new(7000e3, 1000e3, 2000e3),
            Vector3::new(0.0, 7.5e3, 0.0),
            UnitQuaternion::from_euler_angles(0.3, 0.2, -0.1),
        );
        NominalEstimate::from_truth(&truth)
    }

    /// Central finite differences of the innovation over the error state, perturbing the estimate the same way the
    /// filter corrects it. Since y = z ⊖ h(x̂), the sensitivity is minus the derivative of the innovation.
    fn finite_difference(model: &MeasurementModel, nominal: &NominalEstimate, step: f64) -> Sensitivity {
        let z = model.predict(nominal);
        let mut fd = Sensitivity::zeros(model.dimension());
        for j in 0..ERROR_STATE_SIZE {
            let mut dx = ErrorVector::zeros();
            dx[j] = step;
            let mut plus = *nominal;
            plus.inject(&dx);
            let mut minus = *nominal;
            minus.inject(&(-dx));
            let col = (model.innovation(&z, &minus).unwrap() - model.innovation(&z, &plus).unwrap()) / (2.0 * step);
            fd.set_column(j, &col);
        }
        fd
    }

    #[test]
    fn gravity_vector_sensitivity() {
        let model = MeasurementModel::Gravity {
            field: GravityModel::earth_j2(),
            mode: GravityMode::Vector,
            sigma_m_s2: 1e-6,
        };
        let nominal = nominal_leo();
        let h_tilde = model.sensitivity(&nominal);
        let fd = finite_difference(&model, &nominal, 1.0);
        assert!((&h_tilde - &fd).amax() / h_tilde.amax() < 1e-5);
        // Only position matters
        assert_eq!(h_tilde.columns(VEL, ERROR_STATE_SIZE - VEL).amax(), 0.0);
    }

    #[test]
    fn gravity_magnitude_sensitivity() {
        let model = MeasurementModel::Gravity {
            field: GravityModel::earth_j2(),
            mode: GravityMode::Magnitude,
            sigma_m_s2: 1e-6,
        };
        let nominal = nominal_leo();
        let h_tilde = model.sensitivity(&nominal);
        assert_eq!(h_tilde.nrows(), 1);
        let fd = finite_difference(&model, &nominal, 1.0);
        assert!((&h_tilde - &fd).amax() / h_tilde.amax() < 1e-5);
    }

    #[test]
    fn gravity_in_flat_space_is_unobservable() {
        let model = MeasurementModel::Gravity {
            field: GravityModel::FlatSpace,
            mode: GravityMode::Magnitude,
            sigma_m_s2: 1e-6,
        };
        assert_eq!(model.sensitivity(&nominal_leo()).amax(), 0.0);
        assert_eq!(model.predict(&nominal_leo())[0], 0.0);
    }

    #[test]
    fn star_tracker_innovation() {
        let model = MeasurementModel::StarTracker {
            sigma_rad: 5.0 * crate::sensors::ARCSEC_TO_RAD,
        };
        let nominal = nominal_leo();
        let mut truth = TrueState::new(nominal.position_m, nominal.velocity_m_s, nominal.attitude);
        let tilt = Vector3::new(1e-4, -2e-4, 3e-5);
        truth.attitude = nominal.attitude * UnitQuaternion::from_scaled_axis(tilt);

        let msr = model.linearize(model.observe(&truth), &nominal).unwrap();
        for i in 0..3 {
            assert!((msr.innovation[i] - tilt[i]).abs() < 1e-12);
        }
        assert_eq!(msr.noise, DMatrix::from_diagonal_element(3, 3, (5.0 * crate::sensors::ARCSEC_TO_RAD).powi(2)));

        // H selects the attitude error
        let h_tilde = model.sensitivity(&nominal);
        assert_eq!(h_tilde.columns(ATT, 3).into_owned(), DMatrix::identity(3, 3));
        let fd = finite_difference(&model, &nominal, 1e-6);
        assert!((&h_tilde - &fd).amax() < 1e-6);
    }

    #[test]
    fn star_tracker_noise_level() {
        let sigma = 1e-5;
        let model = MeasurementModel::StarTracker { sigma_rad: sigma };
        let nominal = nominal_leo();
        let truth = TrueState::new(nominal.position_m, nominal.velocity_m_s, nominal.attitude);
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let n = 5_000;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let z = model.simulate(&truth, &mut rng);
            sum_sq += model.innovation(&z, &nominal).unwrap().norm_squared();
        }
        let rms_per_axis = (sum_sq / (3 * n) as f64).sqrt();
        assert!((rms_per_axis - sigma).abs() / sigma < 0.05);
    }

    #[test]
    fn dimension_mismatch() {
        let model = MeasurementModel::StarTracker { sigma_rad: 1e-5 };
        let err = model
            .linearize(DVector::zeros(1), &nominal_leo())
            .unwrap_err();
        assert_eq!(
            err,
            FilterError::DimensionMismatch {
                kind: "star tracker attitude",
                expected: 3,
                got: 1
            }
        );

        // A short observation is rejected rather than indexed out of bounds
        let err = model
            .innovation(&DVector::zeros(2), &nominal_leo())
            .unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { got: 2, .. }));

        let gravity = MeasurementModel::Gravity {
            field: GravityModel::earth_j2(),
            mode: GravityMode::Magnitude,
            sigma_m_s2: 1e-6,
        };
        assert!(gravity.innovation(&DVector::zeros(3), &nominal_leo()).is_err());
        assert_eq!(gravity.innovation(&DVector::zeros(1), &nominal_leo()).unwrap().len(), 1);
    }
}
