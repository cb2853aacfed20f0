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

use crate::state::{ErrorVector, ATT, POS, VEL};
use crate::{NominalEstimate, TrueState};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Everything logged at the end of one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub elapsed_s: f64,
    pub truth: TrueState,
    pub estimate: NominalEstimate,
    /// Square root of the diagonal of the covariance, laid out as the error state.
    pub sigmas: ErrorVector,
    /// Norm of the position error (root sum square of the per axis errors).
    pub position_error_m: f64,
    pub velocity_error_m_s: f64,
    /// Angle between the true and estimated attitudes.
    pub attitude_error_rad: f64,
    /// Number of measurement updates processed during this step.
    pub updates: usize,
    /// Number of measurement epochs skipped during this step because the sensor could not observe.
    pub skipped: usize,
}

impl StepRecord {
    pub fn new(
        truth: TrueState,
        estimate: NominalEstimate,
        sigmas: ErrorVector,
        updates: usize,
        skipped: usize,
    ) -> Self {
        let err = estimate.error_from(&truth);
        Self {
            elapsed_s: truth.elapsed.to_seconds(),
            truth,
            estimate,
            sigmas,
            position_error_m: err.fixed_rows::<3>(POS).norm(),
            velocity_error_m_s: err.fixed_rows::<3>(VEL).norm(),
            attitude_error_rad: err.fixed_rows::<3>(ATT).norm(),
            updates,
            skipped,
        }
    }

    /// One sigma position uncertainty, root sum square of the per axis sigmas.
    pub fn position_sigma_m(&self) -> f64 {
        self.sigmas.fixed_rows::<3>(POS).norm()
    }

    pub fn velocity_sigma_m_s(&self) -> f64 {
        self.sigmas.fixed_rows::<3>(VEL).norm()
    }
}

/// Scalar metrics of a scenario.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub final_rms_position_error_m: f64,
    pub max_rms_position_error_m: f64,
    pub final_rms_velocity_error_m_s: f64,
    pub final_attitude_error_rad: f64,
    pub update_count: usize,
    pub skipped_update_count: usize,
}

impl Summary {
    pub fn from_records(records: &[StepRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.max_rms_position_error_m =
                summary.max_rms_position_error_m.max(record.position_error_m);
            summary.update_count += record.updates;
            summary.skipped_update_count += record.skipped;
        }
        if let Some(last) = records.last() {
            summary.final_rms_position_error_m = last.position_error_m;
            summary.final_rms_velocity_error_m_s = last.velocity_error_m_s;
            summary.final_attitude_error_rad = last.attitude_error_rad;
        }
        summary
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "final position error {:.3} m (max {:.3} m), final velocity error {:.6} m/s, final attitude error {:.3e} rad, {} update(s), {} skipped",
            self.final_rms_position_error_m,
            self.max_rms_position_error_m,
            self.final_rms_velocity_error_m_s,
            self.final_attitude_error_rad,
            self.update_count,
            self.skipped_update_count
        )
    }
}

/// Time series and summary of one scenario run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    /// Name of the IMU profile used
    pub profile: String,
    pub seed: u64,
    pub records: Vec<StepRecord>,
    pub summary: Summary,
}

impl ScenarioResult {
    pub fn new(name: String, profile: String, seed: u64, records: Vec<StepRecord>) -> Self {
        let summary = Summary::from_records(&records);
        Self {
            name,
            profile,
            seed,
            records,
            summary,
        }
    }

    pub fn final_record(&self) -> Option<&StepRecord> {
        self.records.last()
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({} IMU, seed {}, {} records): {}",
            self.name,
            self.profile,
            self.seed,
            self.records.len(),
            self.summary
        )
    }
}

#[cfg(test)]
mod ut_results {
    use super::*;
    use crate::linalg::{UnitQuaternion, Vector3};
    use crate::time::TimeUnits;

    #[test]
    fn summary_of_records() {
        let mut truth = TrueState::new(Vector3::zeros(), Vector3::zeros(), UnitQuaternion::identity());
        let mut records = Vec::new();
        for (i, err) in [3.0, 12.0, 5.0].iter().enumerate() {
            truth.elapsed = (i as i64 + 1).seconds();
            let mut estimate = NominalEstimate::from_truth(&truth);
            estimate.position_m += Vector3::new(0.0, *err * 0.6, *err * 0.8);
            records.push(StepRecord::new(truth, estimate, ErrorVector::zeros(), i % 2, 0));
        }
        records[2].skipped = 1;

        let summary = Summary::from_records(&records);
        assert!((summary.final_rms_position_error_m - 5.0).abs() < 1e-12);
        assert!((summary.max_rms_position_error_m - 12.0).abs() < 1e-12);
        assert_eq!(summary.update_count, 1);
        assert_eq!(summary.skipped_update_count, 1);
        assert_eq!(records[2].elapsed_s, 3.0);

        assert_eq!(Summary::from_records(&[]), Summary::default());
    }
}
