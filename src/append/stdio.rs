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

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::Error;
use crate::Format;
use crate::Formatter;
use crate::Layout;
use crate::Record;
use crate::append::Append;
use crate::layout::JsonLayout;
use crate::layout::LogfmtLayout;
use crate::layout::TextLayout;
use crate::layout::TextSettings;
use crate::trap;

struct Streams {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
}

/// An appender that prints log records to stdout and stderr.
///
/// Error, fatal and panic records go to stderr; every other record goes to stdout. Writes to both
/// streams are serialized, so lines never interleave. After a panic record is written the appender
/// panics with the message; after a fatal record the process exits with status 1.
///
/// # Examples
///
/// ```
/// use logfacade::append::Stdio;
///
/// let json = Stdio::json();
/// ```
pub struct Stdio {
    format: Format,
    layout: Box<dyn Layout>,
    streams: Mutex<Streams>,
}

impl fmt::Debug for Stdio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stdio")
            .field("format", &self.format)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl Stdio {
    fn new(format: Format, layout: impl Into<Box<dyn Layout>>) -> Self {
        Self {
            format,
            layout: layout.into(),
            streams: Mutex::new(Streams {
                out: Box::new(io::stdout()),
                err: Box::new(io::stderr()),
            }),
        }
    }

    /// Create a text appender.
    pub fn text(settings: &TextSettings) -> Self {
        Self::new(Format::Text, TextLayout::new(settings))
    }

    /// Create a JSON appender, one object per line.
    pub fn json() -> Self {
        Self::new(Format::Json, JsonLayout::default())
    }

    /// Create a logfmt appender, one line per record.
    pub fn logfmt() -> Self {
        Self::new(Format::Logfmt, LogfmtLayout::default())
    }

    /// Replace the output and error streams.
    ///
    /// # Examples
    ///
    /// ```
    /// use logfacade::append::Stdio;
    ///
    /// let captured = Stdio::logfmt().with_writers(Vec::new(), Vec::new());
    /// ```
    pub fn with_writers(
        self,
        out: impl Write + Send + 'static,
        err: impl Write + Send + 'static,
    ) -> Self {
        Self {
            streams: Mutex::new(Streams {
                out: Box::new(out),
                err: Box::new(err),
            }),
            ..self
        }
    }

    fn write(&self, is_error: bool, bytes: &[u8]) -> io::Result<()> {
        let _guard = trap::output_lock();
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        let writer = if is_error {
            &mut streams.err
        } else {
            &mut streams.out
        };
        writer.write_all(bytes)?;
        writer.flush()
    }
}

impl Append for Stdio {
    fn format(&self) -> Format {
        self.format
    }

    fn append(&self, record: &Record, formatter: &Formatter) -> Result<(), Error> {
        let mut bytes = self.layout.format(record, formatter)?;
        bytes.push(b'\n');

        let level = record.level();
        self.write(level.is_error(), &bytes)
            .map_err(Error::from_io_error)?;
        trap::escalate(level, &record.message());
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let _guard = trap::output_lock();
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.out.flush().map_err(Error::from_io_error)?;
        streams.err.flush().map_err(Error::from_io_error)?;
        Ok(())
    }
}
