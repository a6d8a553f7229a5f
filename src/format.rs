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

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;

/// The on-the-wire format of a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Format {
    Text = 0,
    Json = 1,
    #[serde(rename = "fmtlog", alias = "logfmt")]
    Logfmt = 2,
    Gelf = 3,
    Syslog = 4,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Text,
        Format::Json,
        Format::Logfmt,
        Format::Gelf,
        Format::Syslog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Json => "json",
            Format::Logfmt => "fmtlog",
            Format::Gelf => "gelf",
            Format::Syslog => "syslog",
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Whether records of this format go to a network endpoint rather than stdio.
    pub fn is_remote(&self) -> bool {
        matches!(self, Format::Gelf | Format::Syslog)
    }

    pub fn names() -> Vec<&'static str> {
        Format::ALL.iter().map(Format::as_str).collect()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Format {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Format::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| Error::config("Invalid log format").with_context("value", value))
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name == "logfmt" {
            return Ok(Format::Logfmt);
        }
        Format::ALL
            .iter()
            .find(|format| format.as_str() == name)
            .copied()
            .ok_or_else(|| Error::config("Invalid log format name").with_context("value", s))
    }
}
