// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time policy: how a record's timestamp is rendered.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;

/// RFC 3339 with up to nanosecond fraction, the default time format.
pub const RFC3339_NANO: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Sub-second precision of timestamps.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampLevel {
    /// Whole seconds.
    Default,
    Milli,
    Micro,
    #[default]
    Nano,
}

impl StampLevel {
    /// All stamp levels, in precision order.
    pub const ALL: [StampLevel; 4] = [
        StampLevel::Default,
        StampLevel::Milli,
        StampLevel::Micro,
        StampLevel::Nano,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StampLevel::Default => "default",
            StampLevel::Milli => "milli",
            StampLevel::Micro => "micro",
            StampLevel::Nano => "nano",
        }
    }

    /// Number of fractional digits rendered for this precision.
    pub fn digits(&self) -> usize {
        match self {
            StampLevel::Default => 0,
            StampLevel::Milli => 3,
            StampLevel::Micro => 6,
            StampLevel::Nano => 9,
        }
    }

    /// Return `timestamp` as an integer count of this level's unit since the unix epoch.
    pub fn unix(&self, timestamp: Timestamp) -> i64 {
        match self {
            StampLevel::Default => timestamp.as_second(),
            StampLevel::Milli => timestamp.as_millisecond(),
            StampLevel::Micro => timestamp.as_microsecond(),
            StampLevel::Nano => i64::try_from(timestamp.as_nanosecond()).unwrap_or(i64::MAX),
        }
    }

    /// Fractional digits of `timestamp` at this precision, dot included; empty for `Default`.
    pub(crate) fn fraction(&self, timestamp: Timestamp) -> String {
        let nanos = timestamp.subsec_nanosecond().unsigned_abs();
        match self {
            StampLevel::Default => String::new(),
            StampLevel::Milli => format!(".{:03}", nanos / 1_000_000),
            StampLevel::Micro => format!(".{:06}", nanos / 1_000),
            StampLevel::Nano => format!(".{nanos:09}"),
        }
    }
}

impl fmt::Display for StampLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StampLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        StampLevel::ALL
            .iter()
            .find(|level| level.as_str() == name)
            .copied()
            .ok_or_else(|| Error::config("Invalid timestamp level name").with_context("value", s))
    }
}

/// How timestamps are rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Render in UTC instead of the system time zone.
    pub is_utc: bool,
    /// Render an integer unix timestamp (in the unit of `stamp_level`) instead of a formatted time.
    pub is_stamp: bool,
    pub stamp_level: StampLevel,
    /// A [`jiff::fmt::strftime`] format string.
    pub format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            is_utc: false,
            is_stamp: false,
            stamp_level: StampLevel::Nano,
            format: RFC3339_NANO.to_string(),
        }
    }
}

impl TimeConfig {
    /// The zone used to render timestamps.
    pub fn time_zone(&self) -> TimeZone {
        if self.is_utc {
            TimeZone::UTC
        } else {
            TimeZone::system()
        }
    }

    pub fn zoned(&self, timestamp: Timestamp) -> Zoned {
        timestamp.to_zoned(self.time_zone())
    }

    /// Render `timestamp` with the configured format.
    pub fn render(&self, timestamp: Timestamp) -> String {
        self.zoned(timestamp).strftime(&self.format).to_string()
    }

    /// Integer unix timestamp in the configured unit.
    pub fn stamp(&self, timestamp: Timestamp) -> i64 {
        self.stamp_level.unix(timestamp)
    }
}
