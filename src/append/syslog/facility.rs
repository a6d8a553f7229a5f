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

use fasyslog::Facility;
use fasyslog::Severity;

use crate::Error;
use crate::Level;

/// Parse a facility name or number in `0..=23`. An empty string means `daemon`.
///
/// Names are matched case-insensitively.
pub fn parse_facility(s: &str) -> Result<Facility, Error> {
    if s.is_empty() {
        return Ok(Facility::DAEMON);
    }
    let parsed = match s.parse::<u8>() {
        Ok(n) => Facility::try_from(n),
        Err(_) => Facility::try_from(s),
    };
    parsed.map_err(|()| Error::config("Invalid syslog facility").with_context("facility", s))
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Panic => Severity::EMERGENCY,
            Level::Fatal => Severity::CRITICAL,
            Level::Error => Severity::ERROR,
            Level::Warn => Severity::WARNING,
            Level::Info => Severity::INFORMATIONAL,
            Level::Trace => Severity::NOTICE,
            Level::Debug | Level::Print | Level::Meta => Severity::DEBUG,
        }
    }
}

/// Combine a facility and a severity into a priority value.
pub fn priority(facility: Facility, severity: Severity) -> u16 {
    (u16::from(facility.code()) << 3) | u16::from(severity.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(parse_facility("kern").unwrap(), Facility::KERN);
        assert_eq!(parse_facility("authpriv").unwrap(), Facility::AUTHPRIV);
        assert_eq!(parse_facility("local3").unwrap(), Facility::LOCAL3);
        assert_eq!(parse_facility("LOCAL0").unwrap(), Facility::LOCAL0);
        assert_eq!(parse_facility("ntp").unwrap().code(), 12);
    }

    #[test]
    fn test_numbers_and_defaults() {
        assert_eq!(parse_facility("").unwrap(), Facility::DAEMON);
        assert_eq!(parse_facility("0").unwrap(), Facility::KERN);
        assert_eq!(parse_facility("23").unwrap(), Facility::LOCAL7);
        assert_eq!(parse_facility("13").unwrap().code(), 13);

        for bad in ["24", "-1", "256", "daemons", " daemon"] {
            let err = parse_facility(bad).unwrap_err();
            assert_eq!(err.message(), "Invalid syslog facility");
        }
    }

    #[test]
    fn test_priority() {
        assert_eq!(priority(Facility::DAEMON, Severity::from(Level::Info)), 30);
        assert_eq!(priority(Facility::SYSLOG, Severity::from(Level::Info)), 46);
        assert_eq!(priority(Facility::KERN, Severity::from(Level::Panic)), 0);
        assert_eq!(priority(Facility::LOCAL7, Severity::from(Level::Debug)), 191);
        assert_eq!(Severity::from(Level::Fatal), Severity::CRITICAL);
        assert_eq!(Severity::from(Level::Print), Severity::DEBUG);
        assert_eq!(Severity::from(Level::Meta), Severity::DEBUG);
    }

    #[test]
    fn test_trace_is_notice() {
        assert_eq!(Severity::from(Level::Trace), Severity::NOTICE);
        assert_eq!(priority(Facility::DAEMON, Severity::from(Level::Trace)), 29);
        assert_eq!(priority(Facility::LOCAL7, Severity::from(Level::Trace)), 189);
    }
}
