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

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::Append;
use crate::Error;
use crate::Fields;
use crate::Format;
use crate::Formatter;
use crate::Level;
use crate::Record;
use crate::logger::Backend;
use crate::time::StampLevel;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

#[derive(Debug)]
struct State {
    formatter: Formatter,
    appender: Box<dyn Append>,
}

/// A logger handle: one active backend plus the shared [`Formatter`].
///
/// Cloning a logger is cheap and every clone shares the same backend and configuration. The
/// backend can be replaced at runtime with [`Logger::switch_backend`]; the formatter survives the
/// swap.
///
/// # Examples
///
/// ```
/// use logfacade::Backend;
/// use logfacade::Formatter;
/// use logfacade::Logger;
///
/// let logger = Logger::new(Backend::Json, Formatter::default()).unwrap();
/// logger.set_environment("staging");
/// logger.info("service started").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    state: Arc<RwLock<State>>,
    trap: Arc<dyn Trap>,
    pub(super) applied: Arc<AtomicBool>,
}

impl Logger {
    /// Build the appender of `backend` and wrap it.
    pub fn new(backend: Backend, formatter: Formatter) -> Result<Logger, Error> {
        let appender = backend.build(&formatter).inspect_err(|err| {
            if formatter.stderr {
                DefaultTrap::default().trap(err);
            }
        })?;
        Ok(Self::from_appender(appender, formatter))
    }

    /// Wrap an already built appender.
    pub fn from_appender(appender: impl Into<Box<dyn Append>>, formatter: Formatter) -> Logger {
        Self {
            state: Arc::new(RwLock::new(State {
                formatter,
                appender: appender.into(),
            })),
            trap: Arc::new(DefaultTrap::default()),
            applied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the trap that receives errors nobody else can see, such as close errors of a replaced
    /// backend. Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Trap) -> Self {
        self.trap = Arc::new(trap);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn side_channel(&self, err: &Error) {
        if self.read().formatter.stderr {
            self.trap.trap(err);
        }
    }

    /// A copy of the current formatter.
    pub fn formatter(&self) -> Formatter {
        self.read().formatter.clone()
    }

    // format

    pub fn format(&self) -> Format {
        self.read().appender.format()
    }

    pub fn format_name(&self) -> &'static str {
        self.format().as_str()
    }

    /// Replace the active backend.
    ///
    /// The new appender is built first; if that fails the current backend stays active and the
    /// error is returned. Otherwise the old appender is closed after the swap, and a close error
    /// goes to the side channel.
    pub fn switch_backend(&self, backend: Backend) -> Result<(), Error> {
        let formatter = self.formatter();
        let appender = backend.build(&formatter).inspect_err(|err| {
            if formatter.stderr {
                self.trap.trap(err);
            }
        })?;

        let old = std::mem::replace(&mut self.write().appender, appender);
        if let Err(err) = old.close() {
            self.side_channel(&err);
        }
        Ok(())
    }

    /// Switch to `format` with its default settings. A no-op when `format` is already active.
    pub fn set_format(&self, format: Format) -> Result<(), Error> {
        if self.format() == format {
            return Ok(());
        }
        self.switch_backend(Backend::from_format(format))
    }

    pub fn set_format_name(&self, name: &str) -> Result<(), Error> {
        self.set_format(name.parse()?)
    }

    // level

    pub fn level(&self) -> Level {
        self.read().formatter.level
    }

    /// Set the threshold. [`Level::Meta`] is rejected.
    pub fn set_level(&self, level: Level) -> Result<(), Error> {
        if !level.is_settable() {
            return Err(Error::config("Invalid log level").with_context("value", level));
        }
        self.write().formatter.level = level;
        if self.applied.load(Ordering::Acquire) {
            log::set_max_level(level.to_level_filter());
        }
        Ok(())
    }

    pub fn level_name(&self) -> &'static str {
        self.level().as_str()
    }

    pub fn set_level_name(&self, name: &str) -> Result<(), Error> {
        self.set_level(name.parse()?)
    }

    // labels

    pub fn labels(&self) -> String {
        self.read().formatter.labels.string.clone()
    }

    pub fn set_labels(&self, labels: impl Into<String>) {
        self.write().formatter.labels.string = labels.into();
    }

    pub fn labels_separator(&self) -> String {
        self.read().formatter.labels.separator.clone()
    }

    pub fn set_labels_separator(&self, separator: impl Into<String>) {
        self.write().formatter.labels.separator = separator.into();
    }

    /// Join `labels` with the current separator.
    pub fn labels_to_string<S: AsRef<str>>(&self, labels: &[S]) -> String {
        self.read().formatter.labels.join(labels)
    }

    /// Split `labels` on the current separator.
    pub fn labels_to_vec(&self, labels: &str) -> Vec<String> {
        self.read().formatter.labels.split(labels)
    }

    // environment and tag

    pub fn environment(&self) -> String {
        self.read().formatter.environment.clone()
    }

    pub fn set_environment(&self, environment: &str) {
        self.write().formatter.environment = environment.trim().to_string();
    }

    pub fn tag(&self) -> String {
        self.read().formatter.tag.clone()
    }

    pub fn set_tag(&self, tag: &str) {
        self.write().formatter.tag = tag.trim().to_string();
    }

    // time

    pub fn is_time_utc(&self) -> bool {
        self.read().formatter.time.is_utc
    }

    pub fn set_time_utc(&self, is_utc: bool) {
        self.write().formatter.time.is_utc = is_utc;
    }

    /// Whether the active backend writes unix stamps instead of formatted times.
    ///
    /// Syslog always writes formatted times and GELF always writes stamps, whatever was set.
    pub fn is_time_stamp(&self) -> bool {
        let state = self.read();
        match state.appender.format() {
            Format::Syslog => false,
            Format::Gelf => true,
            _ => state.formatter.time.is_stamp,
        }
    }

    /// Set the stamp flag. It is kept across backend swaps even where the backend ignores it.
    pub fn set_time_stamp(&self, is_stamp: bool) {
        self.write().formatter.time.is_stamp = is_stamp;
    }

    pub fn time_stamp_level(&self) -> StampLevel {
        self.read().formatter.time.stamp_level
    }

    pub fn set_time_stamp_level(&self, level: StampLevel) {
        self.write().formatter.time.stamp_level = level;
    }

    pub fn time_stamp_level_name(&self) -> &'static str {
        self.time_stamp_level().as_str()
    }

    pub fn set_time_stamp_level_name(&self, name: &str) -> Result<(), Error> {
        self.set_time_stamp_level(name.parse()?);
        Ok(())
    }

    pub fn time_format(&self) -> String {
        self.read().formatter.time.format.clone()
    }

    /// Set the [`jiff::fmt::strftime`] format of rendered times.
    pub fn set_time_format(&self, format: impl Into<String>) {
        self.write().formatter.time.format = format.into();
    }

    // emit

    /// Write a record at `level` unless the threshold drops it.
    pub fn emit(&self, level: Level, message: &str, fields: Option<&Fields>) -> Result<(), Error> {
        let state = self.read();
        if !state.formatter.enabled(level) {
            return Ok(());
        }

        let record = Record::new(level, message);
        let record = match fields {
            Some(fields) => record.with_fields(fields),
            None => record,
        };
        state.appender.append(&record, &state.formatter)
    }

    /// Write a panic record.
    ///
    /// The stdio backends panic once the record is written. The network backends only panic when
    /// the write fails and `stderr` mirroring is on.
    pub fn panic(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Panic, message.as_ref(), None)
    }

    pub fn panicv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Panic, message.as_ref(), Some(fields))
    }

    /// Write a fatal record.
    ///
    /// The stdio backends exit the process with status 1 once the record is written. The network
    /// backends only exit when the write fails and `stderr` mirroring is on.
    pub fn fatal(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Fatal, message.as_ref(), None)
    }

    pub fn fatalv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Fatal, message.as_ref(), Some(fields))
    }

    pub fn error(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Error, message.as_ref(), None)
    }

    pub fn errorv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Error, message.as_ref(), Some(fields))
    }

    pub fn warn(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Warn, message.as_ref(), None)
    }

    pub fn warnv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Warn, message.as_ref(), Some(fields))
    }

    pub fn info(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Info, message.as_ref(), None)
    }

    pub fn infov(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Info, message.as_ref(), Some(fields))
    }

    pub fn debug(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Debug, message.as_ref(), None)
    }

    pub fn debugv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Debug, message.as_ref(), Some(fields))
    }

    pub fn trace(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Trace, message.as_ref(), None)
    }

    pub fn tracev(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Trace, message.as_ref(), Some(fields))
    }

    /// Write a record that is never filtered and carries no level.
    pub fn print(&self, message: impl AsRef<str>) -> Result<(), Error> {
        self.emit(Level::Print, message.as_ref(), None)
    }

    pub fn printv(&self, message: impl AsRef<str>, fields: &Fields) -> Result<(), Error> {
        self.emit(Level::Print, message.as_ref(), Some(fields))
    }

    // lifecycle

    pub fn flush(&self) -> Result<(), Error> {
        self.read().appender.flush()
    }

    /// Close the active backend. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), Error> {
        self.read().appender.close()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Write;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::append::Stdio;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn take(&self) -> String {
            String::from_utf8(std::mem::take(&mut *self.0.lock().unwrap())).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(formatter: Formatter) -> (Logger, Buffer, Buffer) {
        let (out, err) = (Buffer::default(), Buffer::default());
        let stdio = Stdio::logfmt().with_writers(out.clone(), err.clone());
        (Logger::from_appender(stdio, formatter), out, err)
    }

    #[test]
    fn test_threshold_and_print() {
        let (logger, out, err) = captured(Formatter::default());
        logger.debug("hidden").unwrap();
        logger.info("shown").unwrap();
        logger.print("always").unwrap();
        logger.error("bad").unwrap();

        let first = out.take();
        assert!(!first.contains("hidden"));
        assert!(first.contains("level=info msg=shown"));
        assert!(first.contains("msg=always"));
        assert!(err.take().contains("level=error msg=bad"));

        logger.set_level(Level::Error).unwrap();
        logger.warn("dropped").unwrap();
        logger.print("still").unwrap();
        let second = out.take();
        assert!(!second.contains("dropped"));
        assert!(second.contains("msg=still"));
    }

    #[test]
    fn test_setters() {
        let (logger, out, _) = captured(Formatter::default());
        logger.set_environment("  prod ");
        logger.set_tag("api");
        logger.set_labels("a,b");
        assert_eq!(logger.environment(), "prod");
        assert_eq!(logger.labels_to_vec("x,y"), ["x", "y"]);
        assert!(logger.labels_to_vec("").is_empty());
        logger.set_labels_separator("|");
        assert_eq!(logger.labels_to_string(&["x", "y"]), "x|y");
        assert_eq!(logger.labels_separator(), "|");

        logger.set_level_name("trace").unwrap();
        assert_eq!(logger.level(), Level::Trace);
        assert_eq!(
            logger.set_level_name("loud").unwrap_err().message(),
            "Invalid log level name"
        );
        assert_eq!(
            logger.set_level(Level::Meta).unwrap_err().message(),
            "Invalid log level"
        );

        logger.set_time_stamp_level_name("milli").unwrap();
        assert_eq!(logger.time_stamp_level_name(), "milli");
        assert!(logger.set_time_stamp_level_name("pico").is_err());
        logger.set_time_format("%Y");
        assert_eq!(logger.time_format(), "%Y");

        let mut fields = Fields::new();
        fields.insert("user".to_string(), json!("bob"));
        logger.infov("hi", &fields).unwrap();
        let line = out.take();
        assert!(line.starts_with("user=bob time="), "{line}");
        assert!(line.ends_with("level=info env=prod tag=api labels=a,b msg=hi\n"), "{line}");
    }

    #[test]
    fn test_time_stamp_is_pinned_per_backend() {
        let (logger, _, _) = captured(Formatter::default());
        assert!(!logger.is_time_stamp());
        logger.set_time_stamp(true);
        assert!(logger.is_time_stamp());
        assert!(logger.formatter().time.is_stamp);
    }

    #[test]
    fn test_switch_backend_keeps_state() {
        let (logger, _, _) = captured(Formatter::default());
        logger.set_level(Level::Debug).unwrap();
        logger.set_tag("t");
        logger.set_time_utc(true);

        logger.set_format(Format::Logfmt).unwrap();
        logger.set_format_name("json").unwrap();
        assert_eq!(logger.format(), Format::Json);
        assert_eq!(logger.format_name(), "json");
        assert_eq!(logger.level(), Level::Debug);
        assert_eq!(logger.tag(), "t");
        assert!(logger.is_time_utc());
    }

    #[test]
    fn test_failed_switch_keeps_backend() {
        let mut formatter = Formatter::default();
        formatter.stderr = false;
        let (logger, out, _) = captured(formatter);

        let err = logger.set_format(Format::Syslog).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
        assert_eq!(logger.format(), Format::Logfmt);
        logger.info("still here").unwrap();
        assert!(out.take().contains("msg=\"still here\""));

        assert!(logger.set_format_name("fluent").is_err());
        assert_eq!(logger.format(), Format::Logfmt);
    }
}
