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

use crate::noise::NoiseError;
use hifitime::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("failed to read configuration file: {source}"))]
    ReadError { source: std::io::Error },
    #[snafu(display("failed to parse YAML configuration: {source}"))]
    ParseError { source: serde_yaml::Error },
    #[snafu(display("invalid configuration: {msg}"))]
    InvalidConfig { msg: String },
    #[snafu(display("unknown {kind} `{name}`, available: {available}"))]
    UnknownName {
        kind: &'static str,
        name: String,
        available: String,
    },
    #[snafu(display("noise model rejected: {source}"))]
    NoiseConfig { source: NoiseError },
}

impl PartialEq for ConfigError {
    /// No two configuration errors match
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

pub trait ConfigRepr: Debug + Sized + Serialize + DeserializeOwned {
    /// Builds the configuration representation from the path to a yaml
    fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided path to a yaml
    fn load_many<P>(path: P) -> Result<Vec<Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds a map of names to "selves" from the provided path to a yaml
    fn load_named<P>(path: P) -> Result<BTreeMap<String, Self>, ConfigError>
    where
        P: AsRef<Path>,
    {
        let file = File::open(path).context(ReadSnafu)?;
        let reader = BufReader::new(file);

        serde_yaml::from_reader(reader).context(ParseSnafu)
    }

    /// Builds "Self" from the provided string of a yaml
    fn loads(data: &str) -> Result<Self, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Builds a sequence of "Selves" from the provided string of a yaml
    fn loads_many(data: &str) -> Result<Vec<Self>, ConfigError> {
        debug!("Loading YAML:\n{data}");
        serde_yaml::from_str(data).context(ParseSnafu)
    }

    /// Serializes self into a YAML string
    fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).context(ParseSnafu)
    }
}

/// How often an aiding sensor produces a measurement epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Cadence {
    /// The sensor is never used: the filter coasts on the IMU alone.
    #[default]
    Never,
    /// An epoch is due whenever this much time elapsed since the previous epoch.
    Every(Duration),
}

impl Cadence {
    /// Returns the update interval, if any.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Every(interval) => Some(*interval),
        }
    }

    /// Returns whether an epoch is due given the time elapsed since the previous one.
    pub fn is_due(&self, since_last: Duration) -> bool {
        match self {
            Self::Never => false,
            Self::Every(interval) => since_last >= *interval,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Every(interval) => write!(f, "{interval}"),
        }
    }
}

impl FromStr for Cadence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("never") || trimmed.eq_ignore_ascii_case("coast") {
            return Ok(Self::Never);
        }
        let interval = Duration::from_str(trimmed).map_err(|e| ConfigError::InvalidConfig {
            msg: format!("cadence `{trimmed}` is neither `never` nor a duration: {e}"),
        })?;
        ensure!(
            interval > Duration::ZERO,
            InvalidConfigSnafu {
                msg: format!("cadence must be positive, got {interval}")
            }
        );
        Ok(Self::Every(interval))
    }
}

impl Serialize for Cadence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{self}"))
    }
}

impl<'de> Deserialize<'de> for Cadence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cadence::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub(crate) fn duration_to_str<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("{duration}"))
}

/// A deserializer from Duration string
pub(crate) fn duration_from_str<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Duration::from_str(&s).map_err(serde::de::Error::custom)
}

pub(crate) fn maybe_duration_to_str<S>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if let Some(duration) = duration {
        duration_to_str(duration, serializer)
    } else {
        serializer.serialize_none()
    }
}

pub(crate) fn maybe_duration_from_str<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) => Duration::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod ut_io {
    use super::Cadence;
    use hifitime::{Duration, TimeUnits};
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("never", Cadence::Never)]
    #[case("Coast", Cadence::Never)]
    #[case("60 s", Cadence::Every(60.seconds()))]
    #[case("1 min", Cadence::Every(1.minutes()))]
    #[case("1 h", Cadence::Every(1.hours()))]
    fn cadence_parsing(#[case] repr: &str, #[case] expected: Cadence) {
        assert_eq!(Cadence::from_str(repr).unwrap(), expected);
    }

    #[test]
    fn cadence_rejects_garbage() {
        assert!(Cadence::from_str("sometimes").is_err());
        assert!(Cadence::from_str("0 s").is_err());
    }

    #[test]
    fn cadence_due() {
        let every = Cadence::Every(60.seconds());
        assert!(!every.is_due(59.seconds()));
        assert!(every.is_due(60.seconds()));
        assert!(every.is_due(61.seconds()));
        assert!(!Cadence::Never.is_due(Duration::MAX));
    }

    #[test]
    fn cadence_serde() {
        let every = Cadence::Every(2.minutes());
        let yaml = serde_yaml::to_string(&every).unwrap();
        let back: Cadence = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, every);

        let never: Cadence = serde_yaml::from_str("never").unwrap();
        assert_eq!(never, Cadence::Never);
    }
}
