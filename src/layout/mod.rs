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

//! Layouts for formatting log records.

use std::fmt;

pub use json::JsonLayout;
pub use logfmt::LogfmtLayout;
pub use text::TextLayout;
pub use text::TextSettings;
#[cfg(feature = "colored")]
pub use text::level_color;

use crate::Error;
use crate::Formatter;
use crate::Record;
use crate::time::TimeConfig;

mod json;
mod logfmt;
mod text;

/// Default separator between the keys prefix and a colliding key for line layouts.
pub const DEFAULT_PREFIX_SEPARATOR: &str = ".";

/// A layout for formatting log records.
pub trait Layout: fmt::Debug + Send + Sync + 'static {
    /// Render `record` into one line, without the trailing newline.
    fn format(&self, record: &Record, formatter: &Formatter) -> Result<Vec<u8>, Error>;
}

impl<T: Layout> From<T> for Box<dyn Layout> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A rendered record time: either a unix stamp or a formatted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RecordTime {
    Stamp(i64),
    Text(String),
}

impl RecordTime {
    pub(crate) fn new(record: &Record, time: &TimeConfig, is_stamp: bool) -> Self {
        if is_stamp {
            RecordTime::Stamp(time.stamp(record.timestamp()))
        } else {
            RecordTime::Text(time.render(record.timestamp()))
        }
    }

    /// The formatter key this time is written under.
    pub(crate) fn key<'a>(&self, formatter: &'a Formatter) -> &'a str {
        match self {
            RecordTime::Stamp(_) => &formatter.keys.names.timestamp,
            RecordTime::Text(_) => &formatter.keys.names.time,
        }
    }
}

impl fmt::Display for RecordTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordTime::Stamp(stamp) => write!(f, "{stamp}"),
            RecordTime::Text(text) => f.write_str(text),
        }
    }
}
