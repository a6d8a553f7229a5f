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

//! The level scale shared by every backend.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;

/// A log level.
///
/// Lower values are more severe. `Print` is never filtered and carries no level prefix or key.
/// `Meta` is not a loggable level; it only exists so every slot of the scale has a color and a
/// syslog severity.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Panic = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    #[default]
    Info = 4,
    Debug = 5,
    Trace = 6,
    Print = 7,
    Meta = 8,
}

impl Level {
    /// All levels that can be configured as the threshold of a logger.
    pub const SETTABLE: [Level; 8] = [
        Level::Panic,
        Level::Fatal,
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
        Level::Print,
    ];

    /// Return the lowercase name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Panic => "panic",
            Level::Fatal => "fatal",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
            Level::Print => "print",
            Level::Meta => "meta",
        }
    }

    /// Return the numeric position of this level on the scale.
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Whether this level can be used as a logger threshold.
    pub fn is_settable(&self) -> bool {
        *self != Level::Meta
    }

    /// Whether records at this level carry a level prefix or `level` key.
    pub fn is_prefixed(&self) -> bool {
        *self < Level::Print
    }

    /// Whether records at this level go to the error stream.
    pub fn is_error(&self) -> bool {
        *self <= Level::Error
    }

    /// Return the names of every settable level.
    pub fn names() -> Vec<&'static str> {
        Level::SETTABLE.iter().map(Level::as_str).collect()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Level {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, crate::Error> {
        Level::SETTABLE
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| Error::config("Invalid log level").with_context("value", value))
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Level::SETTABLE
            .iter()
            .find(|level| level.as_str() == name)
            .copied()
            .ok_or_else(|| Error::config("Invalid log level name").with_context("value", s))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug => Level::Debug,
            log::Level::Trace => Level::Trace,
        }
    }
}

impl Level {
    /// The closest `log` crate filter for this threshold.
    pub(crate) fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Level::Panic | Level::Fatal | Level::Error => log::LevelFilter::Error,
            Level::Warn => log::LevelFilter::Warn,
            Level::Info => log::LevelFilter::Info,
            Level::Debug => log::LevelFilter::Debug,
            Level::Trace | Level::Print | Level::Meta => log::LevelFilter::Trace,
        }
    }
}
