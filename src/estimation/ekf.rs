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

use super::{
    FilterError, Measurement, MeasurementModel, NonFiniteSnafu, ProcessNoise, Residual,
    SingularInnovationCovarianceSnafu,
};
use crate::dynamics::GravityModel;
use crate::linalg::{DMatrix, DVector, Matrix3, UnitQuaternion, Vector3};
use crate::state::{ErrorCovariance, ErrorVector, ACC_BIAS, ATT, GYR_BIAS, POS, VEL};
use crate::{ImuSample, NominalEstimate};
use hifitime::Duration;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

/// How the covariance is updated after a measurement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceUpdate {
    /// (I − KH)P(I − KH)ᵀ + KRKᵀ, which keeps P symmetric positive semi-definite.
    #[default]
    Joseph,
    /// (I − KH)P
    Simplified,
}

/// Tuning of the error-state filter.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub covariance_update: CovarianceUpdate,
    /// Smallest reciprocal condition number of the innovation covariance accepted in an update.
    pub conditioning_tolerance: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            covariance_update: CovarianceUpdate::Joseph,
            conditioning_tolerance: 1e-12,
        }
    }
}

/// The 15-state error-state Extended Kalman Filter.
///
/// The nominal estimate is mechanized with the bias compensated IMU output, and the filter tracks the covariance of
/// δx = [δp, δv, δθ, δb_a, δb_ω], the difference between the truth and that nominal. After each measurement update
/// the error state is injected into the nominal, so the error state mean is always zero between updates.
#[derive(Clone, Debug)]
pub struct ErrorStateEkf {
    nominal: NominalEstimate,
    covar: ErrorCovariance,
    process_noise: ProcessNoise,
    gravity: GravityModel,
    opts: FilterOptions,
    num_predictions: usize,
    num_updates: usize,
}

impl ErrorStateEkf {
    pub fn new(
        nominal: NominalEstimate,
        initial_covar: ErrorCovariance,
        process_noise: ProcessNoise,
        gravity: GravityModel,
        opts: FilterOptions,
    ) -> Self {
        Self {
            nominal,
            covar: symmetrize(&initial_covar),
            process_noise,
            gravity,
            opts,
            num_predictions: 0,
            num_updates: 0,
        }
    }

    pub fn nominal(&self) -> &NominalEstimate {
        &self.nominal
    }

    pub fn covar(&self) -> &ErrorCovariance {
        &self.covar
    }

    /// One sigma uncertainty of each error state component.
    pub fn sigmas(&self) -> ErrorVector {
        self.covar.diagonal().map(|var| var.max(0.0).sqrt())
    }

    pub fn options(&self) -> FilterOptions {
        self.opts
    }

    pub fn num_predictions(&self) -> usize {
        self.num_predictions
    }

    pub fn num_updates(&self) -> usize {
        self.num_updates
    }

    /// First order error state transition matrix Φ = I + FΔt over one step.
    ///
    /// `dcm` rotates body vectors into the inertial frame, `f_hat` and `w_hat` are the bias compensated specific force
    /// and body rate, `gravity_gradient` is ∂g/∂r at the nominal position.
    pub fn transition(
        dcm: &Matrix3<f64>,
        f_hat: &Vector3<f64>,
        w_hat: &Vector3<f64>,
        gravity_gradient: &Matrix3<f64>,
        dt_s: f64,
    ) -> ErrorCovariance {
        let mut f_mat = ErrorCovariance::zeros();
        f_mat
            .fixed_view_mut::<3, 3>(POS, VEL)
            .copy_from(&Matrix3::identity());
        f_mat
            .fixed_view_mut::<3, 3>(VEL, POS)
            .copy_from(gravity_gradient);
        f_mat
            .fixed_view_mut::<3, 3>(VEL, ATT)
            .copy_from(&(-dcm * f_hat.cross_matrix()));
        f_mat.fixed_view_mut::<3, 3>(VEL, ACC_BIAS).copy_from(&(-dcm));
        f_mat
            .fixed_view_mut::<3, 3>(ATT, ATT)
            .copy_from(&(-w_hat.cross_matrix()));
        f_mat
            .fixed_view_mut::<3, 3>(ATT, GYR_BIAS)
            .copy_from(&(-Matrix3::identity()));

        ErrorCovariance::identity() + f_mat * dt_s
    }

    /// Time update: mechanizes the nominal estimate with the IMU sample and propagates the covariance.
    ///
    /// On a non-finite result the filter is left as it was before the call.
    pub fn predict(&mut self, sample: &ImuSample, step: Duration) -> Result<(), FilterError> {
        let dt_s = step.to_seconds();
        let last_good = self.nominal;
        let last_covar = self.covar;

        let f_hat = sample.specific_force_m_s2 - self.nominal.accel_bias_m_s2;
        let w_hat = sample.angular_rate_rad_s - self.nominal.gyro_bias_rad_s;
        let dcm = self.nominal.attitude.to_rotation_matrix().into_inner();
        let (gravity, gravity_gradient) = self
            .gravity
            .acceleration_and_gradient(&self.nominal.position_m);
        let accel = dcm * f_hat + gravity;

        let stm = Self::transition(&dcm, &f_hat, &w_hat, &gravity_gradient, dt_s);

        self.nominal.position_m += self.nominal.velocity_m_s * dt_s + 0.5 * dt_s.powi(2) * accel;
        self.nominal.velocity_m_s += accel * dt_s;
        self.nominal.attitude *= UnitQuaternion::from_scaled_axis(w_hat * dt_s);
        self.nominal.attitude.renormalize();
        self.nominal.elapsed = sample.elapsed;

        let covar_bar = stm * self.covar * stm.transpose() + self.process_noise.to_discrete(dt_s);
        self.covar = symmetrize(&covar_bar);

        self.check_finite("time update", last_good, last_covar)?;
        self.num_predictions += 1;
        Ok(())
    }

    /// Linearizes the observation of the provided model around the current nominal and processes it.
    pub fn update(
        &mut self,
        model: &MeasurementModel,
        observation: DVector<f64>,
    ) -> Result<Residual, FilterError> {
        let msr = model.linearize(observation, &self.nominal)?;
        self.measurement_update(&msr)
    }

    /// Measurement update: computes the gain, injects the error state correction into the nominal and updates the
    /// covariance.
    pub fn measurement_update(&mut self, msr: &Measurement) -> Result<Residual, FilterError> {
        let last_good = self.nominal;
        let last_covar = self.covar;

        let h_tilde = &msr.sensitivity;
        let h_tilde_t = h_tilde.transpose();
        let p_ht = self.covar * &h_tilde_t;
        let s_k = h_tilde * &p_ht + &msr.noise;

        let rcond = reciprocal_condition(&s_k);
        ensure!(
            rcond >= self.opts.conditioning_tolerance,
            SingularInnovationCovarianceSnafu {
                elapsed: msr.elapsed,
                rcond,
                tolerance: self.opts.conditioning_tolerance,
                last_good: Box::new(last_good),
            }
        );

        let s_k_inv = s_k.clone().try_inverse().ok_or_else(|| {
            FilterError::SingularInnovationCovariance {
                elapsed: msr.elapsed,
                rcond,
                tolerance: self.opts.conditioning_tolerance,
                last_good: Box::new(last_good),
            }
        })?;

        let prefit = msr.innovation.clone();
        // Mahalanobis distance of the prefit, always positive.
        let ratio = prefit.dot(&(&s_k_inv * &prefit));
        let sigma_ratios = DVector::from_fn(prefit.len(), |i, _| prefit[i] / s_k[(i, i)].sqrt());

        let gain = &p_ht * &s_k_inv;
        let state_hat: ErrorVector = &gain * &prefit;
        let postfit = &prefit - h_tilde * &state_hat;

        let first_term = ErrorCovariance::identity() - &gain * h_tilde;
        let covar = match self.opts.covariance_update {
            CovarianceUpdate::Joseph => {
                first_term * self.covar * first_term.transpose()
                    + &gain * &msr.noise * gain.transpose()
            }
            CovarianceUpdate::Simplified => first_term * self.covar,
        };

        self.nominal.inject(&state_hat);
        self.covar = symmetrize(&covar);
        self.check_finite("measurement update", last_good, last_covar)?;
        self.num_updates += 1;

        Ok(Residual {
            elapsed: msr.elapsed,
            kind: msr.kind,
            prefit,
            postfit,
            ratio,
            sigma_ratios,
            msr_noise: msr.noise.diagonal().map(|var| var.sqrt()),
        })
    }

    fn check_finite(
        &mut self,
        stage: &'static str,
        last_good: NominalEstimate,
        last_covar: ErrorCovariance,
    ) -> Result<(), FilterError> {
        let what = if !self.nominal.is_finite() {
            "state"
        } else if self.covar.iter().any(|x| !x.is_finite()) {
            "covariance"
        } else {
            return Ok(());
        };

        let elapsed = self.nominal.elapsed;
        self.nominal = last_good;
        self.covar = last_covar;
        error!("non-finite {what} after the {stage} at {elapsed}");
        NonFiniteSnafu {
            stage,
            what,
            elapsed,
            last_good: Box::new(last_good),
        }
        .fail()
    }
}

impl fmt::Display for ErrorStateEkf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sigmas = self.sigmas();
        write!(
            f,
            "{}\tσ_r = {:.3e} m\tσ_v = {:.3e} m/s\tσ_θ = {:.3e} rad",
            self.nominal,
            sigmas.fixed_rows::<3>(POS).norm(),
            sigmas.fixed_rows::<3>(VEL).norm(),
            sigmas.fixed_rows::<3>(ATT).norm()
        )
    }
}

/// Ratio of the smallest to the largest singular value, NaN when the matrix is not finite.
fn reciprocal_condition(s_k: &DMatrix<f64>) -> f64 {
    if s_k.iter().any(|x| !x.is_finite()) {
        return f64::NAN;
    }
    let singular_values = s_k.clone().svd(false, false).singular_values;
    let largest = singular_values.max();
    if largest > 0.0 {
        singular_values.min() / largest
    } else {
        0.0
    }
}

fn symmetrize(covar: &ErrorCovariance) -> ErrorCovariance {
    (covar + covar.transpose()) * 0.5
}

#[cfg(test)]
mod ut_ekf {
    use super::*;
    use crate::dynamics::ControlInput;
    use crate::dynamics::SpacecraftKinematics;
    use crate::propagators::Propagator;
    use crate::sensors::SensorProfile;
    use crate::time::TimeUnits;
    use crate::TrueState;

    fn initial_covar() -> ErrorCovariance {
        let mut sigmas = ErrorVector::zeros();
        for i in 0..3 {
            sigmas[POS + i] = 10.0;
            sigmas[VEL + i] = 0.1;
            sigmas[ATT + i] = 0.01;
            sigmas[ACC_BIAS + i] = 1e-4;
            sigmas[GYR_BIAS + i] = 1e-5;
        }
        ErrorCovariance::from_diagonal(&sigmas.component_mul(&sigmas))
    }

    fn coast_truth() -> TrueState {
        TrueState::new(
            Vector3::zeros(),
            Vector3::new(1000.0, 0.0, 0.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        )
    }

    fn filter(profile: &SensorProfile, opts: FilterOptions) -> ErrorStateEkf {
        ErrorStateEkf::new(
            NominalEstimate::from_truth(&coast_truth()),
            initial_covar(),
            ProcessNoise::from_profile(profile),
            GravityModel::FlatSpace,
            opts,
        )
    }

    fn is_psd(covar: &ErrorCovariance) -> bool {
        DMatrix::from_column_slice(covar.nrows(), covar.ncols(), covar.as_slice())
            .symmetric_eigenvalues()
            .iter()
            .all(|eig| *eig >= -1e-12 * covar.amax())
    }

    #[test]
    fn perfect_imu_mechanization_follows_truth() {
        let prop = Propagator::rk4(SpacecraftKinematics::default());
        let control = ControlInput::body_thrust(Vector3::new(0.1, 0.0, 0.0));
        let mut kf = filter(&SensorProfile::perfect(), FilterOptions::default());
        let mut truth = coast_truth();

        for _ in 0..600 {
            truth = prop.propagate(&truth, &control, 1.seconds());
            let sample = ImuSample {
                elapsed: truth.elapsed,
                specific_force_m_s2: truth.specific_force_m_s2,
                angular_rate_rad_s: truth.angular_rate_rad_s,
            };
            kf.predict(&sample, 1.seconds()).unwrap();
        }

        let err = kf.nominal().error_from(&truth);
        assert!(err.fixed_rows::<3>(POS).norm() < 1e-6, "{err}");
        assert!(err.fixed_rows::<3>(VEL).norm() < 1e-9, "{err}");
        assert_eq!(kf.nominal().elapsed, 10.minutes());
        assert_eq!(kf.num_predictions(), 600);
    }

    #[test]
    fn covariance_grows_and_stays_symmetric() {
        let mut kf = filter(&SensorProfile::classical(), FilterOptions::default());
        let sample = ImuSample {
            elapsed: 1.seconds(),
            specific_force_m_s2: Vector3::new(0.1, 0.0, 0.0),
            angular_rate_rad_s: Vector3::new(0.0, 0.0, 1e-3),
        };

        let mut prev_trace = kf.covar().trace();
        for _ in 0..100 {
            kf.predict(&sample, 1.seconds()).unwrap();
            let covar = kf.covar();
            assert_eq!(*covar, covar.transpose());
            assert!(is_psd(covar));
            assert!(covar.trace() >= prev_trace * (1.0 - 1e-12));
            prev_trace = covar.trace();
        }
    }

    #[test]
    fn transition_blocks() {
        let dcm = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3)
            .to_rotation_matrix()
            .into_inner();
        let f_hat = Vector3::new(0.1, 0.0, 0.0);
        let w_hat = Vector3::new(0.0, 0.0, 1e-3);
        let grad = Matrix3::from_diagonal_element(-1e-6);
        let stm = ErrorStateEkf::transition(&dcm, &f_hat, &w_hat, &grad, 2.0);

        assert_eq!(stm.fixed_view::<3, 3>(POS, VEL).into_owned(), Matrix3::identity() * 2.0);
        assert_eq!(stm.fixed_view::<3, 3>(VEL, POS).into_owned(), grad * 2.0);
        assert_eq!(stm.fixed_view::<3, 3>(VEL, ACC_BIAS).into_owned(), -dcm * 2.0);
        assert_eq!(
            stm.fixed_view::<3, 3>(ATT, GYR_BIAS).into_owned(),
            -Matrix3::identity() * 2.0
        );
        // Biases are constant in the linearized dynamics
        assert_eq!(
            stm.fixed_view::<6, 6>(ACC_BIAS, ACC_BIAS).into_owned(),
            crate::linalg::Matrix6::identity()
        );
    }

    #[test]
    fn star_tracker_update_reduces_attitude_uncertainty() {
        let mut kf = filter(&SensorProfile::classical(), FilterOptions::default());
        let model = MeasurementModel::StarTracker { sigma_rad: 1e-5 };
        let mut truth = coast_truth();
        let tilt = Vector3::new(2e-3, -1e-3, 5e-4);
        truth.attitude *= UnitQuaternion::from_scaled_axis(tilt);

        let sigma_before = kf.sigmas()[ATT];
        let resid = kf.update(&model, model.observe(&truth)).unwrap();

        assert!(kf.sigmas()[ATT] < 1e-3 * sigma_before);
        assert!(kf.sigmas()[ATT] <= 1e-5);
        assert!(kf.nominal().attitude.angle_to(&truth.attitude) < 1e-7);
        assert!(resid.postfit.norm() < 1e-3 * resid.prefit.norm());
        assert!(resid.ratio > 0.0);
        assert_eq!(resid.kind, "star tracker attitude");
        assert_eq!(kf.num_updates(), 1);
        assert!(is_psd(kf.covar()));
    }

    #[test]
    fn joseph_and_simplified_agree() {
        let model = MeasurementModel::Gravity {
            field: GravityModel::earth_j2(),
            mode: crate::estimation::GravityMode::Vector,
            sigma_m_s2: 1e-7,
        };
        let truth = TrueState::new(
            Vector3::new(7000e3, 0.0, 0.0),
            Vector3::new(0.0, 7.5e3, 0.0),
            UnitQuaternion::identity(),
        );
        let observation = model.observe(&truth);

        let mut covars = Vec::new();
        for covariance_update in [CovarianceUpdate::Joseph, CovarianceUpdate::Simplified] {
            let mut kf = ErrorStateEkf::new(
                NominalEstimate::from_truth(&truth),
                initial_covar(),
                ProcessNoise::zero(),
                GravityModel::earth_j2(),
                FilterOptions {
                    covariance_update,
                    ..Default::default()
                },
            );
            kf.update(&model, observation.clone()).unwrap();
            covars.push(*kf.covar());
        }

        assert!((covars[0] - covars[1]).amax() / covars[0].amax() < 1e-8);
        // Position is observed through the gravity gradient
        assert!(covars[0][(POS, POS)] < 100.0);
    }

    #[test]
    fn singular_innovation_is_an_error() {
        let truth = coast_truth();
        let mut kf = ErrorStateEkf::new(
            NominalEstimate::from_truth(&truth),
            ErrorCovariance::zeros(),
            ProcessNoise::zero(),
            GravityModel::FlatSpace,
            FilterOptions::default(),
        );
        let model = MeasurementModel::StarTracker { sigma_rad: 0.0 };

        let err = kf.update(&model, model.observe(&truth)).unwrap_err();
        assert!(matches!(err, FilterError::SingularInnovationCovariance { .. }));
        assert_eq!(err.last_good_estimate(), Some(&NominalEstimate::from_truth(&truth)));
        assert_eq!(kf.num_updates(), 0);
    }

    #[test]
    fn non_finite_sample_restores_the_filter() {
        let mut kf = filter(&SensorProfile::classical(), FilterOptions::default());
        let before = *kf.nominal();
        let covar_before = *kf.covar();
        let sample = ImuSample {
            elapsed: 1.seconds(),
            specific_force_m_s2: Vector3::new(f64::NAN, 0.0, 0.0),
            angular_rate_rad_s: Vector3::zeros(),
        };

        let err = kf.predict(&sample, 1.seconds()).unwrap_err();
        assert!(matches!(
            err,
            FilterError::NonFinite {
                stage: "time update",
                ..
            }
        ));
        assert_eq!(err.last_good_estimate(), Some(&before));
        assert_eq!(*kf.nominal(), before);
        assert_eq!(*kf.covar(), covar_before);
    }
}
