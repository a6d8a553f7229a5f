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

use serde::Deserialize;
use serde::Serialize;

use crate::Append;
use crate::Error;
use crate::Format;
use crate::Formatter;
use crate::append::Gelf;
use crate::append::Stdio;
use crate::append::Syslog;
use crate::append::gelf::GelfSettings;
use crate::append::syslog::SyslogSettings;
use crate::layout::TextSettings;

/// A backend and its settings: everything needed to build an appender.
///
/// # Examples
///
/// ```
/// use logfacade::Backend;
/// use logfacade::Format;
///
/// let backend: Backend = serde_json::from_str(
///     r#"{"format": "syslog", "settings": {"connection": {"url": "udp://127.0.0.1"}}}"#,
/// )
/// .unwrap();
/// assert_eq!(backend.format(), Format::Syslog);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "settings", rename_all = "lowercase")]
pub enum Backend {
    Text(TextSettings),
    Json,
    #[serde(rename = "fmtlog", alias = "logfmt")]
    Logfmt,
    Gelf(GelfSettings),
    Syslog(SyslogSettings),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Text(TextSettings::default())
    }
}

impl Backend {
    pub fn format(&self) -> Format {
        match self {
            Backend::Text(_) => Format::Text,
            Backend::Json => Format::Json,
            Backend::Logfmt => Format::Logfmt,
            Backend::Gelf(_) => Format::Gelf,
            Backend::Syslog(_) => Format::Syslog,
        }
    }

    /// The backend of `format` with default settings.
    pub fn from_format(format: Format) -> Self {
        match format {
            Format::Text => Backend::Text(TextSettings::default()),
            Format::Json => Backend::Json,
            Format::Logfmt => Backend::Logfmt,
            Format::Gelf => Backend::Gelf(GelfSettings::default()),
            Format::Syslog => Backend::Syslog(SyslogSettings::default()),
        }
    }

    /// Build the appender, connecting to its endpoint for network backends.
    pub fn build(&self, formatter: &Formatter) -> Result<Box<dyn Append>, Error> {
        Ok(match self {
            Backend::Text(settings) => Stdio::text(settings).into(),
            Backend::Json => Stdio::json().into(),
            Backend::Logfmt => Stdio::logfmt().into(),
            Backend::Gelf(settings) => Gelf::new(settings)?
                .with_side_channel(formatter.stderr)
                .into(),
            Backend::Syslog(settings) => Syslog::new(settings)?.into(),
        })
    }
}
