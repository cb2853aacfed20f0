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

use std::fmt;
use std::marker::PhantomData;

use super::rk_methods::{RK, RK4Fixed};
use crate::dynamics::{ControlInput, Dynamics, KinematicVector, SpacecraftKinematics};
use crate::time::Duration;
use crate::TrueState;

/// A fixed step propagator of the spacecraft truth, parametrized by its dynamics and its Runge Kutta method.
#[derive(Clone, Debug)]
pub struct Propagator<D: Dynamics, M: RK> {
    pub dynamics: D,
    _method: PhantomData<M>,
}

impl<D: Dynamics> Propagator<D, RK4Fixed> {
    /// A classical RK4 propagator, the default for the truth.
    pub fn rk4(dynamics: D) -> Self {
        Self::new(dynamics)
    }
}

impl<D: Dynamics, M: RK> Propagator<D, M> {
    pub fn new(dynamics: D) -> Self {
        Self {
            dynamics,
            _method: PhantomData,
        }
    }

    /// Advances the truth by one step under a constant control input.
    ///
    /// The returned state records the body frame specific force and the body rate applied over the step, as seen at
    /// the start of the step.
    pub fn propagate(&self, state: &TrueState, control: &ControlInput, step: Duration) -> TrueState {
        let next_vec = self.derive(
            &SpacecraftKinematics::to_vector(state),
            control,
            step.to_seconds(),
        );

        let mut next = *state;
        SpacecraftKinematics::set_from_vector(&mut next, &next_vec);
        next.elapsed = state.elapsed + step;
        next.specific_force_m_s2 = control.body_specific_force(&state.attitude);
        next.angular_rate_rad_s = control.angular_rate_rad_s;
        next
    }

    /// Propagates for the provided duration, in steps of `step` and a final partial step if needed.
    pub fn for_duration(
        &self,
        state: &TrueState,
        control: &ControlInput,
        duration: Duration,
        step: Duration,
    ) -> TrueState {
        let end = state.elapsed + duration;
        let mut current = *state;
        while current.elapsed < end {
            let remaining = end - current.elapsed;
            let this_step = if remaining < step { remaining } else { step };
            current = self.propagate(&current, control, this_step);
        }
        current
    }

    fn derive(&self, state: &KinematicVector, control: &ControlInput, step_s: f64) -> KinematicVector {
        let mut k: Vec<KinematicVector> = Vec::with_capacity(M::STAGES);
        k.push(self.dynamics.eom(0.0, state, control));

        let mut a_idx: usize = 0;
        for i in 0..(M::STAGES - 1) {
            // Let's compute the c_i by summing the relevant items from the list of coefficients.
            // \sum_{j=1}^{i-1} a_ij  ∀ i ∈ [2, s]
            let mut ci: f64 = 0.0;
            // The wi stores the a_{s1} * k_1 + a_{s2} * k_2 + ... + a_{s, s-1} * k_{s-1} +
            let mut wi = KinematicVector::zeros();
            for kj in &k[0..i + 1] {
                let a_ij = M::A_COEFFS[a_idx];
                ci += a_ij;
                wi += a_ij * kj;
                a_idx += 1;
            }

            let ki = self
                .dynamics
                .eom(ci * step_s, &(state + step_s * wi), control);
            k.push(ki);
        }

        let mut next_state = *state;
        for (i, ki) in k.iter().enumerate() {
            next_state += step_s * M::B_COEFFS[i] * ki;
        }

        self.dynamics.finally(next_state)
    }
}

impl<D: Dynamics + fmt::Display, M: RK> fmt::Display for Propagator<D, M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RK{} propagator of {}", M::ORDER, self.dynamics)
    }
}
