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

use super::{run, ScenarioConfig, ScenarioResult};
use crate::sensors::ProfileSpec;
use crate::time::{Duration, Unit};
use crate::NavError;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;

/// Star tracker intervals of the default cadence sweep, in seconds.
pub const DEFAULT_CADENCES_S: [f64; 8] = [10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0];

/// The default cadence sweep, from every ten seconds to once an hour.
pub fn default_cadences() -> Vec<Duration> {
    DEFAULT_CADENCES_S
        .iter()
        .map(|seconds| Unit::Second * *seconds)
        .collect()
}

/// One run of a sweep and the parameter which distinguishes it.
pub struct SweepRun<P> {
    pub parameter: P,
    pub result: Result<ScenarioResult, NavError>,
}

/// All of the runs of a sweep, in the order of the parameters provided.
pub struct SweepResults<P> {
    pub name: String,
    pub runs: Vec<SweepRun<P>>,
}

impl<P> SweepResults<P> {
    /// Iterates over the runs which completed.
    pub fn successes(&self) -> impl Iterator<Item = (&P, &ScenarioResult)> {
        self.runs
            .iter()
            .filter_map(|run| run.result.as_ref().ok().map(|result| (&run.parameter, result)))
    }

    pub fn num_failures(&self) -> usize {
        self.runs.iter().filter(|run| run.result.is_err()).count()
    }

    /// Statistics of the final position error over the successful runs.
    pub fn final_position_error_stats(&self) -> Option<SweepStats> {
        SweepStats::from_samples(
            &self
                .successes()
                .map(|(_, result)| result.summary.final_rms_position_error_m)
                .collect::<Vec<f64>>(),
        )
    }
}

impl<P: fmt::Display> fmt::Display for SweepResults<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} ({} runs)", self.name, self.runs.len())?;
        for run in &self.runs {
            match &run.result {
                Ok(result) => writeln!(f, "  {}: {}", run.parameter, result.summary)?,
                Err(e) => writeln!(f, "  {}: {e}", run.parameter)?,
            }
        }
        Ok(())
    }
}

/// Sample statistics of a sweep metric.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, zero for a single sample.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SweepStats {
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let count = samples.len();
        let mean = samples.iter().sum::<f64>() / count as f64;
        let std_dev = if count > 1 {
            (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            0.0
        };
        Some(Self {
            count,
            mean,
            std_dev,
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

impl fmt::Display for SweepStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:.3} ± {:.3} (min {:.3}, max {:.3}, {} samples)",
            self.mean, self.std_dev, self.min, self.max, self.count
        )
    }
}

// Just the template for the progress bar
fn progress_bar(num_runs: usize, name: &str) -> ProgressBar {
    let pb = ProgressBar::new(num_runs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:100.cyan/blue} {pos:>7}/{len:7} {msg}")
            .map(|style| style.progress_chars("##-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(name.to_string());
    pb
}

fn sweep<P: Copy + Sync + Send + fmt::Display>(
    name: String,
    scenarios: Vec<(P, ScenarioConfig)>,
) -> SweepResults<P> {
    let pb = progress_bar(scenarios.len(), &name);
    let start = Instant::now();

    let runs = scenarios
        .par_iter()
        .progress_with(pb)
        .map(|(parameter, config)| {
            let result = run(config);
            if let Err(e) = &result {
                warn!("{name} run {parameter} failed: {e}");
            }
            SweepRun {
                parameter: *parameter,
                result,
            }
        })
        .collect::<Vec<SweepRun<P>>>();

    info!(
        "{name}: {} runs in {:.3} s",
        runs.len(),
        start.elapsed().as_secs_f64()
    );
    SweepResults { name, runs }
}

/// Runs the star tracker scenario of the provided IMU profile at each interval, in parallel.
pub fn cadence_sweep<P: Into<ProfileSpec>>(profile: P, intervals: &[Duration]) -> SweepResults<Duration> {
    let imu = profile.into();
    let scenarios = intervals
        .iter()
        .map(|interval| {
            (
                *interval,
                ScenarioConfig::with_star_tracker(imu.clone(), *interval),
            )
        })
        .collect::<Vec<_>>();
    let name = match &imu {
        ProfileSpec::Named(name) => format!("{name} star tracker cadence sweep"),
        ProfileSpec::Custom(profile) => format!("{} star tracker cadence sweep", profile.name),
    };
    sweep(name, scenarios)
}

/// Runs the provided scenario once per seed, in parallel.
pub fn seed_sweep(config: &ScenarioConfig, seeds: &[u64]) -> SweepResults<u64> {
    let scenarios = seeds
        .iter()
        .map(|seed| {
            let mut scenario = config.clone();
            scenario.seed = *seed;
            (*seed, scenario)
        })
        .collect::<Vec<_>>();
    sweep(format!("{} seed sweep", config.name), scenarios)
}

#[cfg(test)]
mod ut_sweep {
    use super::*;
    use crate::time::TimeUnits;

    #[test]
    fn stats() {
        let stats = SweepStats::from_samples(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert!((stats.std_dev - (5.0_f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!(SweepStats::from_samples(&[]).is_none());
    }

    #[test]
    fn default_cadences_are_sorted() {
        let cadences = default_cadences();
        assert_eq!(cadences.len(), 8);
        assert_eq!(cadences[0], 10.seconds());
        assert_eq!(cadences[7], 1.hours());
    }

    #[test]
    fn seed_sweep_keeps_order() {
        let mut config = ScenarioConfig::coast("quantum");
        config.duration = 30.seconds();
        let seeds = [5, 1, 3];
        let results = seed_sweep(&config, &seeds);
        assert_eq!(results.num_failures(), 0);
        let order = results.runs.iter().map(|run| run.parameter).collect::<Vec<u64>>();
        assert_eq!(order, seeds);
        for (seed, result) in results.successes() {
            assert_eq!(*seed, result.seed);
            assert_eq!(result.records.len(), 31);
        }
        assert_eq!(results.final_position_error_stats().unwrap().count, 3);
    }
}
