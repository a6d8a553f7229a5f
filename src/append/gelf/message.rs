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

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Formatter;
use crate::Layout;
use crate::Record;
use crate::append::syslog::Severity;
use crate::time::StampLevel;

/// The GELF protocol version written in every envelope.
pub const GELF_VERSION: &str = "1.1";

/// Default separator between the keys prefix and a colliding key, also used as the extra field
/// marker.
pub const DEFAULT_PREFIX_SEPARATOR: &str = "_";

/// A layout that renders a record as a GELF 1.1 envelope.
///
/// Output format:
///
/// ```json
/// {"_env":"prod","_user":"bob","host":"web-1","level":6,"short_message":"Hello info!","timestamp":1709622489.123,"version":"1.1"}
/// ```
///
/// The environment, labels and tag of the formatter become `_env`, `_labels` and `_tag`. A user
/// field named like one of them is written as `_fields_<key>`. Every other user field is written
/// with a leading `_` unless it has one already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GelfLayout {
    hostname: String,
    facility: String,
}

impl GelfLayout {
    pub fn new(hostname: impl Into<String>, facility: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            facility: facility.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn envelope(&self, record: &Record, formatter: &Formatter) -> Map<String, Value> {
        let keys = &formatter.keys;
        let names = &keys.names;
        let marker = keys.separator(DEFAULT_PREFIX_SEPARATOR);
        let collides = |key: &str| key == names.labels || key == names.env || key == names.tag;
        let prefixed = |key: &str| format!("{marker}{}{marker}{key}", keys.prefix);

        let mut map = Map::new();
        for (key, value) in record.fields() {
            let key = if collides(key) {
                prefixed(key)
            } else if key.starts_with('_') {
                key.clone()
            } else {
                format!("_{key}")
            };
            let key = if key == "_id" { prefixed("id") } else { key };
            map.insert(key, value.clone());
        }

        for (name, value) in [
            (&names.env, &formatter.environment),
            (&names.labels, &formatter.labels.string),
            (&names.tag, &formatter.tag),
        ] {
            if !value.is_empty() {
                map.insert(format!("{marker}{name}"), value.clone().into());
            }
        }

        map.insert("version".to_string(), GELF_VERSION.into());
        map.insert("host".to_string(), self.hostname.clone().into());
        map.insert("short_message".to_string(), record.message().into());
        map.insert(
            "timestamp".to_string(),
            timestamp(formatter.time.stamp_level, record.timestamp()).into(),
        );
        map.insert(
            "level".to_string(),
            Severity::from(record.level()).code().into(),
        );
        if !self.facility.is_empty() {
            map.insert("facility".to_string(), self.facility.clone().into());
        }
        map
    }
}

impl Layout for GelfLayout {
    fn format(&self, record: &Record, formatter: &Formatter) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(&self.envelope(record, formatter))
            .map_err(|err| Error::format("failed to encode GELF message").with_source(err))
    }
}

/// Seconds since the unix epoch as a float, at the resolution of `level`.
pub fn timestamp(level: StampLevel, ts: Timestamp) -> f64 {
    let stamp = level.unix(ts) as f64;
    match level {
        StampLevel::Default => stamp,
        StampLevel::Milli => stamp / 1e3,
        StampLevel::Micro => stamp / 1e6,
        StampLevel::Nano => stamp / 1e9,
    }
}
