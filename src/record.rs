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

use std::borrow::Cow;

use jiff::Timestamp;
use serde_json::Map;
use serde_json::Value;

use crate::Level;

/// Structured key-values attached to a record.
pub type Fields = Map<String, Value>;

/// One log event, created per call and consumed by a single appender.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    level: Level,
    message: &'a str,
    fields: Option<&'a Fields>,
    timestamp: Timestamp,
}

impl<'a> Record<'a> {
    /// Create a record stamped with the current time.
    pub fn new(level: Level, message: &'a str) -> Self {
        Self {
            level,
            message,
            fields: None,
            timestamp: Timestamp::now(),
        }
    }

    pub fn with_fields(mut self, fields: &'a Fields) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &'a str {
        self.message
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Iterate over the user fields in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a String, &'a Value)> {
        self.fields.into_iter().flat_map(|fields| fields.iter())
    }

    pub fn has_fields(&self) -> bool {
        self.fields.is_some_and(|fields| !fields.is_empty())
    }
}

/// Render a field value as plain text: strings unquoted, everything else as JSON.
pub(crate) fn value_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed("null"),
        other => Cow::Owned(other.to_string()),
    }
}
