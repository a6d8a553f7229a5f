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

use serde_json::Map;
use serde_json::Value;

use crate::Error;
use crate::Formatter;
use crate::Record;
use crate::layout::DEFAULT_PREFIX_SEPARATOR;
use crate::layout::Layout;
use crate::layout::RecordTime;

/// A JSON layout for formatting log records.
///
/// Output format:
///
/// ```json
/// {"env":"prod","labels":"a,b","level":"info","msg":"Hello info!","tag":"api","time":"2024-03-05T07:08:09.123456789+00:00","user":42}
/// ```
///
/// User fields named like a reserved key are written as `fields.<key>`.
///
/// # Examples
///
/// ```
/// use logfacade::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {}

impl JsonLayout {
    pub(crate) fn to_map(&self, record: &Record, formatter: &Formatter) -> Map<String, Value> {
        let mut map = Map::new();
        for (key, value) in record.fields() {
            map.insert(
                formatter.field_key(key, DEFAULT_PREFIX_SEPARATOR),
                value.clone(),
            );
        }

        let names = &formatter.keys.names;
        let level = record.level();
        if level.is_prefixed() {
            map.insert(names.level.clone(), level.as_str().into());
        }
        if !formatter.labels.is_empty() {
            map.insert(names.labels.clone(), formatter.labels.string.clone().into());
        }
        map.insert(names.msg.clone(), record.message().into());

        let time = RecordTime::new(record, &formatter.time, formatter.time.is_stamp);
        let key = time.key(formatter).to_string();
        match time {
            RecordTime::Stamp(stamp) => map.insert(key, stamp.into()),
            RecordTime::Text(text) => map.insert(key, text.into()),
        };

        if !formatter.environment.is_empty() {
            map.insert(names.env.clone(), formatter.environment.clone().into());
        }
        if !formatter.tag.is_empty() {
            map.insert(names.tag.clone(), formatter.tag.clone().into());
        }
        map
    }
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record, formatter: &Formatter) -> Result<Vec<u8>, Error> {
        let map = self.to_map(record, formatter);
        serde_json::to_vec(&map)
            .map_err(|err| Error::format("failed to encode record as JSON").with_source(err))
    }
}
