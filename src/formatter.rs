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

//! The configuration shared by every backend.
//!
//! A [`Formatter`] survives backend swaps: switching from text to syslog keeps the level, labels,
//! environment, tag and time policy.
//!
//! # Examples
//!
//! ```
//! use logfacade::Formatter;
//!
//! let formatter: Formatter = serde_json::from_str(
//!     r#"{"level": "debug", "environment": "prod", "labels": {"string": "a,b"}}"#,
//! )
//! .unwrap();
//! assert_eq!(formatter.labels.to_vec(), ["a", "b"]);
//! ```

use serde::Deserialize;
use serde::Serialize;

use crate::Level;
use crate::time::TimeConfig;

/// Default separator of the labels string.
pub const LABELS_SEPARATOR: &str = ",";

/// Default prefix for user keys that collide with reserved keys.
pub const KEYS_PREFIX: &str = "fields";

/// Shared configuration of a logger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Formatter {
    /// Records above this level are dropped. `print` records are never dropped.
    pub level: Level,
    pub labels: Labels,
    pub environment: String,
    pub tag: String,
    pub time: TimeConfig,
    pub keys: Keys,
    /// Whether write and close failures are mirrored to stderr.
    pub stderr: bool,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            level: Level::default(),
            labels: Labels::default(),
            environment: String::new(),
            tag: String::new(),
            time: TimeConfig::default(),
            keys: Keys::default(),
            stderr: true,
        }
    }
}

impl Formatter {
    /// Whether a record at `level` passes the threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level == Level::Print || (level.is_settable() && level <= self.level)
    }

    /// Whether `key` is one of the keys this formatter writes itself.
    pub fn is_reserved(&self, key: &str) -> bool {
        let names = &self.keys.names;
        [
            &names.level,
            &names.labels,
            &names.msg,
            &names.time,
            &names.timestamp,
            &names.env,
            &names.tag,
        ]
        .into_iter()
        .any(|name| name == key)
    }

    /// Return `key`, prefixed when it collides with a reserved key.
    pub fn field_key(&self, key: &str, default_separator: &str) -> String {
        if self.is_reserved(key) {
            self.keys.prefixed(key, default_separator)
        } else {
            key.to_string()
        }
    }
}

/// Labels attached to every record, kept as one separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub string: String,
    pub separator: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            string: String::new(),
            separator: LABELS_SEPARATOR.to_string(),
        }
    }
}

impl Labels {
    /// Join `labels` with the configured separator.
    pub fn join<S: AsRef<str>>(&self, labels: &[S]) -> String {
        labels
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Split `labels` on the configured separator.
    pub fn split(&self, labels: &str) -> Vec<String> {
        if labels.is_empty() {
            return vec![];
        }
        if self.separator.is_empty() {
            return vec![labels.to_string()];
        }
        labels.split(&self.separator).map(str::to_string).collect()
    }

    /// Split the current labels string.
    pub fn to_vec(&self) -> Vec<String> {
        self.split(&self.string)
    }

    pub fn is_empty(&self) -> bool {
        self.string.is_empty()
    }
}

/// Names of the keys written by the backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    pub level: String,
    pub labels: String,
    pub msg: String,
    pub time: String,
    pub timestamp: String,
    pub env: String,
    pub tag: String,
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            level: "level".to_string(),
            labels: "labels".to_string(),
            msg: "msg".to_string(),
            time: "time".to_string(),
            timestamp: "timestamp".to_string(),
            env: "env".to_string(),
            tag: "tag".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keys {
    pub names: KeyNames,
    pub prefix: String,
    /// Separator between `prefix` and a colliding key. `None` uses the backend default.
    pub prefix_separator: Option<String>,
}

impl Default for Keys {
    fn default() -> Self {
        Self {
            names: KeyNames::default(),
            prefix: KEYS_PREFIX.to_string(),
            prefix_separator: None,
        }
    }
}

impl Keys {
    pub fn separator<'a>(&'a self, default_separator: &'a str) -> &'a str {
        self.prefix_separator.as_deref().unwrap_or(default_separator)
    }

    pub fn prefixed(&self, key: &str, default_separator: &str) -> String {
        format!(
            "{}{}{key}",
            self.prefix,
            self.separator(default_separator)
        )
    }
}
