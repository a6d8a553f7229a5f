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

//! Backends that write log records to their destination.

use std::fmt;

use crate::Error;
use crate::Format;
use crate::Formatter;
use crate::Record;

pub mod gelf;
mod stdio;
pub mod syslog;

pub use self::gelf::Gelf;
pub use self::stdio::Stdio;
pub use self::syslog::Syslog;

/// An appender that can process log records.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// The format this appender writes.
    fn format(&self) -> Format;

    /// Write a log record to the append target.
    ///
    /// Level filtering is done by the caller; every record passed here is written.
    fn append(&self, record: &Record, formatter: &Formatter) -> Result<(), Error>;

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Release the destination. Closing twice is a no-op.
    ///
    /// Default to a no-op.
    fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Append> From<T> for Box<dyn Append> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// The system hostname, used when a network backend is not given one.
pub(crate) fn default_hostname() -> Result<String, Error> {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .map_err(|err| Error::config("failed to get the system hostname").with_source(err))
}

/// The file name of the running executable, or `-` when it cannot be determined.
pub(crate) fn default_app_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "-".to_string())
}
