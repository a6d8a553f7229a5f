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

//! Syslog message headers and stream framing.

use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

use jiff::Timestamp;
use jiff::Zoned;
use jiff::tz::TimeZone;

use crate::Error;
use crate::connection::Scheme;
use crate::time::StampLevel;

/// RFC 5424 limits APP-NAME to 48 characters.
const APP_NAME_MAX_LENGTH: usize = 48;

const NIL_VALUE: &str = "-";

/// The header layout of a syslog message.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SyslogFormat {
    /// Local unix socket layout, without a hostname.
    Unix,
    /// [RFC 3164] (BSD syslog Protocol)
    ///
    /// [RFC 3164]: https://datatracker.ietf.org/doc/html/rfc3164
    Rfc3164,
    /// [RFC 5424] (The Syslog Protocol)
    ///
    /// [RFC 5424]: https://datatracker.ietf.org/doc/html/rfc5424
    #[default]
    Rfc5424,
}

impl SyslogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyslogFormat::Unix => "unix",
            SyslogFormat::Rfc3164 => "rfc3164",
            SyslogFormat::Rfc5424 => "rfc5424",
        }
    }
}

impl fmt::Display for SyslogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyslogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "rfc5424" => Ok(SyslogFormat::Rfc5424),
            "rfc3164" => Ok(SyslogFormat::Rfc3164),
            "unix" => Ok(SyslogFormat::Unix),
            _ => Err(Error::config("Invalid syslog format").with_context("format", s)),
        }
    }
}

/// One RFC 5424 structured data element: `[id key="value" ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdElement {
    pub id: String,
    pub params: Vec<(String, String)>,
}

impl SdElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for SdElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.id)?;
        for (key, value) in &self.params {
            write!(f, " {key}=\"")?;
            for c in value.chars() {
                if matches!(c, '"' | '\\' | ']') {
                    f.write_char('\\')?;
                }
                f.write_char(c)?;
            }
            f.write_char('"')?;
        }
        f.write_char(']')
    }
}

/// The parts of a syslog message that vary per write.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    pub priority: u16,
    pub timestamp: Timestamp,
    pub hostname: &'a str,
    pub app_name: &'a str,
    pub pid: u32,
    /// Rendered as a `TAG: ` content prefix for unix and RFC 3164, and as MSGID for RFC 5424.
    pub tag: &'a str,
    pub structured_data: &'a [SdElement],
    pub content: &'a str,
}

/// Renders [`Message`]s for one format, precision and time zone.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use jiff::Timestamp;
/// use logfacade::append::syslog::Message;
/// use logfacade::append::syslog::SyslogFormat;
/// use logfacade::append::syslog::SyslogFormatter;
/// use logfacade::time::StampLevel;
///
/// let formatter = SyslogFormatter::new(SyslogFormat::Rfc5424, StampLevel::Milli, true);
/// let line = formatter.format(&Message {
///     priority: 30,
///     timestamp: Timestamp::from_str("2024-03-05T07:08:09.123456789Z").unwrap(),
///     hostname: "host",
///     app_name: "app",
///     pid: 42,
///     tag: "",
///     structured_data: &[],
///     content: "msg=hi\n",
/// });
/// assert_eq!(line, "<30>1 2024-03-05T07:08:09.123Z host app 42 - - msg=hi\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogFormatter {
    format: SyslogFormat,
    precision: StampLevel,
    utc: bool,
}

impl SyslogFormatter {
    pub fn new(format: SyslogFormat, precision: StampLevel, utc: bool) -> Self {
        Self {
            format,
            precision,
            utc,
        }
    }

    pub fn format(&self, message: &Message) -> String {
        match self.format {
            SyslogFormat::Unix => format!(
                "<{}>{} {}[{}]: {}{}",
                message.priority,
                self.stamp(message.timestamp),
                message.app_name,
                message.pid,
                tag_prefix(message.tag),
                message.content
            ),
            SyslogFormat::Rfc3164 => format!(
                "<{}>{} {} {}[{}]: {}{}",
                message.priority,
                self.stamp(message.timestamp),
                message.hostname,
                message.app_name,
                message.pid,
                tag_prefix(message.tag),
                message.content
            ),
            SyslogFormat::Rfc5424 => {
                let data = if message.structured_data.is_empty() {
                    NIL_VALUE.to_string()
                } else {
                    message
                        .structured_data
                        .iter()
                        .map(ToString::to_string)
                        .collect()
                };
                format!(
                    "<{}>1 {} {} {} {} {} {} {}",
                    message.priority,
                    self.rfc3339(message.timestamp),
                    nil_if_empty(message.hostname),
                    nil_if_empty(&truncate_app_name(message.app_name)),
                    message.pid,
                    nil_if_empty(message.tag),
                    data,
                    message.content
                )
            }
        }
    }

    fn zoned(&self, timestamp: Timestamp) -> Zoned {
        let tz = if self.utc {
            TimeZone::UTC
        } else {
            TimeZone::system()
        };
        timestamp.to_zoned(tz)
    }

    /// `Mmm dd hh:mm:ss` with a fixed-width fraction.
    fn stamp(&self, timestamp: Timestamp) -> String {
        let zoned = self.zoned(timestamp);
        format!(
            "{}{}",
            zoned.strftime("%b %e %H:%M:%S"),
            self.precision.fraction(timestamp)
        )
    }

    fn rfc3339(&self, timestamp: Timestamp) -> String {
        let zoned = self.zoned(timestamp);
        let offset = if self.utc {
            "Z".to_string()
        } else {
            zoned.strftime("%:z").to_string()
        };
        format!(
            "{}{}{offset}",
            zoned.strftime("%Y-%m-%dT%H:%M:%S"),
            self.precision.fraction(timestamp)
        )
    }
}

fn tag_prefix(tag: &str) -> String {
    if tag.is_empty() {
        String::new()
    } else {
        format!("{tag}: ")
    }
}

fn nil_if_empty(value: &str) -> &str {
    if value.is_empty() { NIL_VALUE } else { value }
}

/// Keep the last 48 characters of `app_name`.
fn truncate_app_name(app_name: &str) -> String {
    let len = app_name.chars().count();
    app_name
        .chars()
        .skip(len.saturating_sub(APP_NAME_MAX_LENGTH))
        .collect()
}

/// Frame `message` for `scheme`: octet counting over TLS, unchanged otherwise.
pub fn frame(scheme: Scheme, message: String) -> String {
    match scheme {
        Scheme::TcpTls => format!("{} {message}", message.len()),
        _ => message,
    }
}
