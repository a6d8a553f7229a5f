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

use std::fmt::Write;

use crate::Error;
use crate::Formatter;
use crate::Record;
use crate::layout::DEFAULT_PREFIX_SEPARATOR;
use crate::layout::Layout;
use crate::layout::RecordTime;
use crate::record::value_text;

/// A logfmt layout for formatting log records.
///
/// User fields come first, then the time, level, environment, tag, labels and message:
///
/// ```text
/// user=42 time=2024-03-05T07:08:09.123456789+00:00 level=info env=prod tag=api labels=a,b msg="Hello info!"
/// ```
///
/// Fields named like a reserved key are written under the keys prefix, `fields.msg` by default.
/// A field whose key is empty or holds a space, `=` or `"` is left out; the rest of the record is
/// still written.
///
/// # Examples
///
/// ```
/// use logfacade::layout::LogfmtLayout;
///
/// let logfmt_layout = LogfmtLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct LogfmtLayout {
    time_stamp: Option<bool>,
}

impl LogfmtLayout {
    /// Force the time to be rendered as a formatted string (`false`) or unix stamp (`true`),
    /// whatever the formatter says.
    pub fn pin_time_stamp(mut self, is_stamp: bool) -> Self {
        self.time_stamp = Some(is_stamp);
        self
    }

    /// Render `record` into one logfmt line.
    pub fn render(&self, record: &Record, formatter: &Formatter) -> Result<String, Error> {
        let mut encoder = KvEncoder::default();

        for (key, value) in record.fields() {
            let key = formatter.field_key(key, DEFAULT_PREFIX_SEPARATOR);
            if !is_valid_key(&key) {
                continue;
            }
            encoder.encode(&key, &value_text(value))?;
        }

        let is_stamp = self.time_stamp.unwrap_or(formatter.time.is_stamp);
        let time = RecordTime::new(record, &formatter.time, is_stamp);
        encoder.encode(time.key(formatter), &time.to_string())?;

        let names = &formatter.keys.names;
        let level = record.level();
        if level.is_prefixed() {
            encoder.encode(&names.level, level.as_str())?;
        }
        if !formatter.environment.is_empty() {
            encoder.encode(&names.env, &formatter.environment)?;
        }
        if !formatter.tag.is_empty() {
            encoder.encode(&names.tag, &formatter.tag)?;
        }
        if !formatter.labels.is_empty() {
            encoder.encode(&names.labels, &formatter.labels.string)?;
        }
        encoder.encode(&names.msg, record.message())?;

        Ok(encoder.text)
    }
}

impl Layout for LogfmtLayout {
    fn format(&self, record: &Record, formatter: &Formatter) -> Result<Vec<u8>, Error> {
        self.render(record, formatter).map(String::into_bytes)
    }
}

#[derive(Default)]
struct KvEncoder {
    text: String,
}

impl KvEncoder {
    // The encode logic follows https://github.com/go-logfmt/logfmt/blob/76262ea7/encode.go.
    fn encode(&mut self, key: &str, value: &str) -> Result<(), Error> {
        if !is_valid_key(key) {
            return Err(Error::format("key contains special chars").with_context("key", key));
        }

        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(key);
        self.text.push('=');
        if value.chars().any(is_special) {
            quote(&mut self.text, value).map_err(Error::from_fmt_error)?;
        } else {
            self.text.push_str(value);
        }
        Ok(())
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(is_special)
}

fn is_special(c: char) -> bool {
    c <= ' ' || c == '=' || c == '"' || c == char::REPLACEMENT_CHARACTER
}

fn quote(out: &mut String, value: &str) -> std::fmt::Result {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => write!(out, "\\u{:04x}", u32::from(c))?,
            c => out.push(c),
        }
    }
    out.push('"');
    Ok(())
}
