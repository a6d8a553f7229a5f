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

//! Appender for writing log records to syslog.
//!
//! # Examples
//!
//! ```rust, no_run
//! use logfacade::Logger;
//! use logfacade::Backend;
//! use logfacade::Formatter;
//! use logfacade::append::syslog::SyslogSettings;
//! use logfacade::connection::Connection;
//!
//! let settings = SyslogSettings {
//!     connection: Connection::from_url("udp://127.0.0.1:514"),
//!     format: "rfc3164".to_string(),
//!     ..SyslogSettings::default()
//! };
//! let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();
//! logger.info("This log will be written to syslog.").unwrap();
//! ```

use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

pub use self::facility::parse_facility;
pub use self::facility::priority;
pub use self::format::Message;
pub use self::format::SdElement;
pub use self::format::SyslogFormat;
pub use self::format::SyslogFormatter;
pub use self::format::frame;

use crate::Error;
use crate::Format;
use crate::Formatter;
use crate::Record;
use crate::append::Append;
use crate::append::default_app_name;
use crate::append::default_hostname;
use crate::connection::Connection;
use crate::connection::Scheme;
use crate::layout::LogfmtLayout;
use crate::net::Dialer;
use crate::net::Link;
use crate::net::Reconnection;
use crate::tls::TlsBundle;
use crate::trap;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

use self::sender::Sender;

mod facility;
mod format;
mod sender;

// re-exports to avoid version conflicts
mod exported {
    pub use fasyslog::Facility;
    pub use fasyslog::Severity;
}
pub use exported::*;

/// Default syslog port over UDP.
pub const DEFAULT_PORT_UDP: u16 = 514;
/// Default syslog port over TCP and TCP+TLS.
pub const DEFAULT_PORT_TCP: u16 = 6514;

/// TCP options of the syslog backend.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogTcp {
    pub tls: Option<TlsBundle>,
    pub reconnection: Reconnection,
}

/// Settings of the syslog backend.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyslogSettings {
    pub connection: Connection,
    /// Defaults to the system hostname.
    pub hostname: String,
    /// A facility name or number; empty means `daemon`.
    pub facility: String,
    /// Defaults to the executable name.
    pub app_name: String,
    /// `unix`, `rfc3164` or `rfc5424`; empty means `rfc5424`.
    pub format: String,
    pub tag: String,
    pub tcp: SyslogTcp,
}

/// An appender that writes log records to a syslog endpoint.
///
/// The message content is the logfmt rendering of the record. Time is always rendered as a
/// formatted string, whatever the formatter's `is_stamp` says.
#[derive(Debug)]
pub struct Syslog {
    format: SyslogFormat,
    facility: Facility,
    hostname: String,
    app_name: String,
    tag: String,
    pid: u32,
    scheme: Scheme,
    layout: LogfmtLayout,
    link: Mutex<Link<Sender>>,
    trap: Box<dyn Trap>,
}

impl Syslog {
    /// Validate `settings` and connect.
    pub fn new(settings: &SyslogSettings) -> Result<Self, Error> {
        let format = settings.format.parse::<SyslogFormat>()?;
        let facility = parse_facility(&settings.facility)?;
        let connection = settings
            .connection
            .clone()
            .resolve(DEFAULT_PORT_UDP, DEFAULT_PORT_TCP)?;
        let hostname = match settings.hostname.as_str() {
            "" => default_hostname()?,
            hostname => hostname.to_string(),
        };
        let app_name = match settings.app_name.as_str() {
            "" => default_app_name(),
            app_name => app_name.to_string(),
        };

        let dialer = Dialer::new(
            &connection,
            settings.tcp.tls.as_ref(),
            settings.tcp.reconnection,
        )?;
        let scheme = dialer.scheme();
        let link = Link::open(dialer)?;

        Ok(Self {
            format,
            facility,
            hostname,
            app_name,
            tag: settings.tag.clone(),
            pid: std::process::id(),
            scheme,
            layout: LogfmtLayout::default().pin_time_stamp(false),
            link: Mutex::new(link),
            trap: Box::new(DefaultTrap::default()),
        })
    }

    /// Set the trap that receives write errors. Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Trap) -> Self {
        self.trap = Box::new(trap);
        self
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    pub fn syslog_format(&self) -> SyslogFormat {
        self.format
    }

    /// The normalized URL of the endpoint.
    pub fn url(&self) -> String {
        self.lock().dialer().url().to_string()
    }

    /// Render `record` as a framed syslog message.
    fn build(&self, record: &Record, formatter: &Formatter) -> Result<String, Error> {
        let mut content = self.layout.render(record, formatter)?;
        content.push('\n');

        let message = SyslogFormatter::new(
            self.format,
            formatter.time.stamp_level,
            formatter.time.is_utc,
        )
        .format(&Message {
            priority: priority(self.facility, Severity::from(record.level())),
            timestamp: record.timestamp(),
            hostname: &self.hostname,
            app_name: &self.app_name,
            pid: self.pid,
            tag: &self.tag,
            structured_data: &[],
            content: &content,
        });
        Ok(frame(self.scheme, message))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Link<Sender>> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Append for Syslog {
    fn format(&self) -> Format {
        Format::Syslog
    }

    fn append(&self, record: &Record, formatter: &Formatter) -> Result<(), Error> {
        let message = self.build(record, formatter)?;
        let result = self.lock().send(message.as_bytes());
        if let Err(err) = &result {
            if formatter.stderr {
                trap::mirror(self.trap.as_ref(), record.level(), err);
            }
        }
        result
    }

    fn close(&self) -> Result<(), Error> {
        self.lock().close()
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::str::FromStr;

    use jiff::Timestamp;

    use super::*;
    use crate::ErrorKind;
    use crate::Level;

    fn listener() -> (UdpSocket, SyslogSettings) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = socket.local_addr().unwrap().port();
        let settings = SyslogSettings {
            connection: Connection::from_url(format!("udp://127.0.0.1:{port}")),
            hostname: "host".to_string(),
            app_name: "app".to_string(),
            ..SyslogSettings::default()
        };
        (socket, settings)
    }

    #[test]
    fn test_invalid_settings() {
        let (_socket, settings) = listener();

        let bad = SyslogSettings {
            format: "rfc9999".to_string(),
            ..settings.clone()
        };
        assert_eq!(Syslog::new(&bad).unwrap_err().message(), "Invalid syslog format");

        let bad = SyslogSettings {
            facility: "mars".to_string(),
            ..settings.clone()
        };
        assert_eq!(Syslog::new(&bad).unwrap_err().message(), "Invalid syslog facility");

        let bad = SyslogSettings {
            tcp: SyslogTcp {
                tls: None,
                reconnection: Reconnection::new(-1, 0),
            },
            ..settings
        };
        assert_eq!(Syslog::new(&bad).unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_build_message() {
        let (_socket, settings) = listener();
        let syslog = Syslog::new(&SyslogSettings {
            facility: "local0".to_string(),
            format: "rfc3164".to_string(),
            tag: "web".to_string(),
            ..settings
        })
        .unwrap();

        let mut formatter = Formatter::default();
        formatter.time.is_utc = true;
        formatter.time.is_stamp = true;
        formatter.time.stamp_level = crate::time::StampLevel::Default;
        formatter.time.format = "%H:%M:%S".to_string();

        let ts = Timestamp::from_str("2024-03-05T07:08:09Z").unwrap();
        let record = Record::new(Level::Warn, "disk low").with_timestamp(ts);
        let message = syslog.build(&record, &formatter).unwrap();
        assert_eq!(
            message,
            format!(
                "<132>Mar  5 07:08:09 host app[{}]: web: time=07:08:09 level=warn msg=\"disk low\"\n",
                std::process::id()
            )
        );
    }

    #[test]
    fn test_append_and_close() {
        let (socket, settings) = listener();
        let syslog = Syslog::new(&settings).unwrap();
        assert_eq!(syslog.url(), settings.connection.url);

        syslog
            .append(&Record::new(Level::Info, "hello"), &Formatter::default())
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = socket.recv(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("<30>1 "), "{text}");
        assert!(text.ends_with("level=info msg=hello\n"), "{text}");

        syslog.close().unwrap();
        syslog.close().unwrap();
        let err = syslog
            .append(&Record::new(Level::Info, "late"), &Formatter {
                stderr: false,
                ..Formatter::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write);
    }

    #[test]
    fn test_field_with_bad_key_is_dropped_not_the_record() {
        let (socket, settings) = listener();
        let syslog = Syslog::new(&settings).unwrap();

        let mut fields = crate::Fields::new();
        fields.insert("user id".to_string(), 7.into());
        fields.insert("session".to_string(), 9.into());
        let record = Record::new(Level::Info, "login").with_fields(&fields);
        syslog.append(&record, &Formatter::default()).unwrap();

        let mut buf = [0u8; 1024];
        let n = socket.recv(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.contains(" session=9 "), "{text}");
        assert!(!text.contains("user id"), "{text}");
        assert!(text.ends_with("level=info msg=login\n"), "{text}");
    }

    #[test]
    fn test_delivered_panic_record_does_not_escalate() {
        let (socket, settings) = listener();
        let syslog = Syslog::new(&settings).unwrap();
        syslog
            .append(&Record::new(Level::Panic, "meltdown"), &Formatter::default())
            .unwrap();
        syslog
            .append(&Record::new(Level::Fatal, "halt"), &Formatter::default())
            .unwrap();

        let mut buf = [0u8; 1024];
        let n = socket.recv(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("<24>1 "));
        let n = socket.recv(&mut buf).unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("<26>1 "));
    }

    #[test]
    fn test_facility_is_fasyslog() {
        let (_socket, settings) = listener();
        let syslog = Syslog::new(&SyslogSettings {
            facility: "4".to_string(),
            ..settings
        })
        .unwrap();
        assert_eq!(syslog.facility(), Facility::AUTH);
        assert_eq!(syslog.facility().label(), "AUTH");
    }
}
