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
use std::fmt::Write;

#[cfg(feature = "colored")]
use colored::Color;
#[cfg(feature = "colored")]
use colored::Colorize;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Formatter;
use crate::Level;
use crate::Record;
use crate::layout::Layout;
use crate::layout::RecordTime;
use crate::record::value_text;

/// Settings of the text backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    #[serde(alias = "is_colorize")]
    pub colorize: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self { colorize: true }
    }
}

/// A layout that formats log record as optionally colored text.
///
/// Output format:
///
/// ```text
/// [ERROR] 2024-08-11T22:44:57.172105+08:00 prod a,b api Hello error!: code=7, user=bob
/// [INFO] 2024-08-11T22:44:57.172276+08:00 Hello info!
/// 2024-08-11T22:44:57.172382+08:00 Hello print!
/// ```
///
/// Environment, labels and tag are only written when set. `print` records have no level prefix.
///
/// By default, output is colored per level when the `colored` feature is enabled. Colors are
/// disabled with [`TextLayout::no_color`].
///
/// # Examples
///
/// ```
/// use logfacade::layout::TextLayout;
///
/// let layout = TextLayout::default().no_color();
/// ```
#[derive(Debug, Clone)]
pub struct TextLayout {
    colorize: bool,
}

impl Default for TextLayout {
    fn default() -> Self {
        Self::new(&TextSettings::default())
    }
}

impl TextLayout {
    pub fn new(settings: &TextSettings) -> Self {
        Self {
            colorize: settings.colorize,
        }
    }

    /// Disable colored output.
    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn paint<'a>(&self, level: Level, text: &'a str) -> Cow<'a, str> {
        if !self.colorize {
            return Cow::Borrowed(text);
        }
        #[cfg(feature = "colored")]
        {
            Cow::Owned(text.color(level_color(level)).to_string())
        }
        #[cfg(not(feature = "colored"))]
        {
            let _ = level;
            Cow::Borrowed(text)
        }
    }
}

/// The color used for `level`.
#[cfg(feature = "colored")]
pub fn level_color(level: Level) -> Color {
    match level {
        Level::Panic => Color::Magenta,
        Level::Fatal => Color::BrightRed,
        Level::Error => Color::Red,
        Level::Warn => Color::BrightYellow,
        Level::Info => Color::BrightWhite,
        Level::Debug => Color::Cyan,
        Level::Trace => Color::Yellow,
        Level::Print => Color::White,
        Level::Meta => Color::BrightBlack,
    }
}

impl Layout for TextLayout {
    fn format(&self, record: &Record, formatter: &Formatter) -> Result<Vec<u8>, Error> {
        let level = record.level();
        let mut text = String::new();

        if level.is_prefixed() {
            let prefix = format!("[{}]", level.as_str().to_uppercase());
            text.push_str(&self.paint(level, &prefix));
            text.push(' ');
        }

        let mut body =
            RecordTime::new(record, &formatter.time, formatter.time.is_stamp).to_string();
        for part in [
            &formatter.environment,
            &formatter.labels.string,
            &formatter.tag,
        ] {
            if !part.is_empty() {
                body.push(' ');
                body.push_str(part);
            }
        }
        body.push(' ');
        body.push_str(record.message());
        text.push_str(&self.paint(Level::Print, &body));

        if record.has_fields() {
            text.push_str(&self.paint(Level::Print, ": "));
            let equals = self.paint(Level::Meta, "=");
            let separator = self.paint(Level::Print, ", ");
            for (i, (key, value)) in record.fields().enumerate() {
                if i > 0 {
                    text.push_str(&separator);
                }
                write!(
                    &mut text,
                    "{}{equals}{}",
                    self.paint(level, key),
                    self.paint(Level::Print, &value_text(value))
                )
                .map_err(Error::from_fmt_error)?;
            }
        }

        Ok(text.into_bytes())
    }
}
