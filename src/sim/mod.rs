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

extern crate indicatif;
extern crate rayon;

/// Scenario definition, presets and validation.
mod config;
pub use config::{
    AidingSensorConfig, AidingSensorKind, InitialConditions, InitialUncertainty, ScenarioConfig,
};

/// Per step records and the summary of a run.
mod results;
pub use results::{ScenarioResult, StepRecord, Summary};

mod runner;
pub use runner::{run, Simulation};

/// Parallel sweeps over the star tracker cadence or the seed.
mod sweep;
pub use sweep::{
    cadence_sweep, default_cadences, seed_sweep, SweepResults, SweepRun, SweepStats,
    DEFAULT_CADENCES_S,
};
