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

//! Appender for writing log records as GELF messages.
//!
//! Over UDP a message is optionally compressed and split into chunks when it does not fit in one
//! datagram. Over TCP and TCP+TLS messages are delimited by a null byte.
//!
//! # Examples
//!
//! ```rust, no_run
//! use logfacade::Backend;
//! use logfacade::Formatter;
//! use logfacade::Logger;
//! use logfacade::append::gelf::CompressionType;
//! use logfacade::append::gelf::GelfSettings;
//! use logfacade::connection::Connection;
//!
//! let mut settings = GelfSettings {
//!     connection: Connection::from_url("udp://graylog:12201"),
//!     ..GelfSettings::default()
//! };
//! settings.udp.compression.kind = CompressionType::Gzip;
//!
//! let logger = Logger::new(Backend::Gelf(settings), Formatter::default()).unwrap();
//! logger.info("This log will be written to Graylog.").unwrap();
//! ```

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::PoisonError;

use flate2::write::GzEncoder;
use flate2::write::ZlibEncoder;
use serde::Deserialize;
use serde::Serialize;

pub use self::message::GELF_VERSION;
pub use self::message::GelfLayout;
pub use self::message::timestamp;

use crate::Error;
use crate::Format;
use crate::Formatter;
use crate::Layout;
use crate::Record;
use crate::append::Append;
use crate::append::default_hostname;
use crate::connection::Connection;
use crate::connection::Scheme;
use crate::net::Dialer;
use crate::net::Link;
use crate::net::Reconnection;
use crate::tls::TlsBundle;
use crate::trap;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

mod message;

/// Default GELF port, for UDP and TCP alike.
pub const DEFAULT_PORT: u16 = 12201;

/// Largest UDP datagram sent, chunk header included.
pub const CHUNK_SIZE: usize = 1420;
/// Most chunks one message may be split into.
pub const MAX_CHUNKS: usize = 128;

const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
const CHUNK_HEADER_LEN: usize = 12;

/// Compression algorithm for UDP payloads.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    Gzip,
    Zlib,
    #[default]
    None,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::Gzip => "gzip",
            CompressionType::Zlib => "zlib",
            CompressionType::None => "none",
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gzip" => Ok(CompressionType::Gzip),
            "zlib" => Ok(CompressionType::Zlib),
            "" | "none" => Ok(CompressionType::None),
            _ => Err(Error::config("Invalid compression type").with_context("type", s)),
        }
    }
}

/// UDP payload compression.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compression {
    #[serde(rename = "type")]
    pub kind: CompressionType,
    /// `0..=9`, or `-1` for the library default.
    pub level: i32,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            kind: CompressionType::None,
            level: -1,
        }
    }
}

impl Compression {
    pub fn check(&self) -> Result<(), Error> {
        if !(-1..=9).contains(&self.level) {
            return Err(
                Error::config("Compression level must be more -2 and less 10")
                    .with_context("level", self.level),
            );
        }
        Ok(())
    }

    fn flate_level(&self) -> flate2::Compression {
        match u32::try_from(self.level) {
            Ok(level) => flate2::Compression::new(level),
            Err(_) => flate2::Compression::default(),
        }
    }

    /// Compress `payload` with the configured algorithm.
    pub fn compress(&self, payload: Vec<u8>) -> Result<Vec<u8>, Error> {
        let compressed = match self.kind {
            CompressionType::None => return Ok(payload),
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), self.flate_level());
                encoder.write_all(&payload).and_then(|()| encoder.finish())
            }
            CompressionType::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), self.flate_level());
                encoder.write_all(&payload).and_then(|()| encoder.finish())
            }
        };
        compressed.map_err(|err| {
            Error::write("failed to compress GELF message")
                .with_context("type", self.kind)
                .with_source(err)
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfUdp {
    pub compression: Compression,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfTcp {
    pub reconnection: Reconnection,
    pub tls: Option<TlsBundle>,
}

/// Settings of the GELF backend.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfSettings {
    pub connection: Connection,
    /// Defaults to the system hostname.
    pub hostname: String,
    /// Written as the `facility` field when not empty.
    pub facility: String,
    pub udp: GelfUdp,
    pub tcp: GelfTcp,
}

/// Split `payload` into GELF chunks tagged with `id`.
///
/// A payload that fits in one datagram is returned as is.
pub fn chunks(payload: &[u8], id: [u8; 8]) -> Result<Vec<Vec<u8>>, Error> {
    if payload.len() <= CHUNK_SIZE {
        return Ok(vec![payload.to_vec()]);
    }

    let data_len = CHUNK_SIZE - CHUNK_HEADER_LEN;
    let count = payload.len().div_ceil(data_len);
    if count > MAX_CHUNKS {
        return Err(Error::write("GELF message is too large")
            .with_context("size", payload.len())
            .with_context("chunks", count));
    }

    Ok(payload
        .chunks(data_len)
        .enumerate()
        .map(|(seq, data)| {
            let mut chunk = Vec::with_capacity(CHUNK_HEADER_LEN + data.len());
            chunk.extend_from_slice(&CHUNK_MAGIC);
            chunk.extend_from_slice(&id);
            // both fit in a byte, count is at most MAX_CHUNKS
            chunk.push(seq as u8);
            chunk.push(count as u8);
            chunk.extend_from_slice(data);
            chunk
        })
        .collect())
}

/// An appender that writes log records to a GELF endpoint.
///
/// The timestamp is always the float unix time, whatever the formatter's `is_stamp` says.
#[derive(Debug)]
pub struct Gelf {
    layout: GelfLayout,
    compression: Compression,
    scheme: Scheme,
    link: Mutex<Link>,
    trap: Box<dyn Trap>,
    side_channel: bool,
}

impl Gelf {
    /// Validate `settings` and connect.
    pub fn new(settings: &GelfSettings) -> Result<Self, Error> {
        let connection = settings
            .connection
            .clone()
            .resolve(DEFAULT_PORT, DEFAULT_PORT)?;
        let scheme = connection.resolved_scheme()?;
        if scheme.is_unix() {
            return Err(Error::config("GELF scheme should be udp, tcp, tcp+tls")
                .with_context("scheme", scheme));
        }
        if scheme == Scheme::Udp {
            settings.udp.compression.check()?;
        }

        let dialer = Dialer::new(
            &connection,
            settings.tcp.tls.as_ref(),
            settings.tcp.reconnection,
        )?;
        let link = Link::open(dialer)?;
        let hostname = match settings.hostname.as_str() {
            "" => default_hostname()?,
            hostname => hostname.to_string(),
        };

        Ok(Self {
            layout: GelfLayout::new(hostname, settings.facility.clone()),
            compression: settings.udp.compression,
            scheme,
            link: Mutex::new(link),
            trap: Box::new(DefaultTrap::default()),
            side_channel: true,
        })
    }

    /// Set the trap that receives write and close errors. Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Trap) -> Self {
        self.trap = Box::new(trap);
        self
    }

    /// Whether close errors are trapped and swallowed (`true`) or returned (`false`).
    pub fn with_side_channel(mut self, enabled: bool) -> Self {
        self.side_channel = enabled;
        self
    }

    pub fn hostname(&self) -> &str {
        self.layout.hostname()
    }

    fn send(&self, payload: Vec<u8>) -> Result<(), Error> {
        let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
        match self.scheme {
            Scheme::Udp => {
                let payload = self.compression.compress(payload)?;
                for chunk in chunks(&payload, rand::random())? {
                    link.send(&chunk)?;
                }
                Ok(())
            }
            _ => {
                let mut payload = payload;
                payload.push(0);
                link.send(&payload)
            }
        }
    }
}

impl Append for Gelf {
    fn format(&self) -> Format {
        Format::Gelf
    }

    fn append(&self, record: &Record, formatter: &Formatter) -> Result<(), Error> {
        let payload = self.layout.format(record, formatter)?;
        let result = self.send(payload);
        if let Err(err) = &result {
            if formatter.stderr {
                trap::mirror(self.trap.as_ref(), record.level(), err);
            }
        }
        result
    }

    fn close(&self) -> Result<(), Error> {
        let result = self
            .link
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .close();
        match result {
            Err(err) if self.side_channel => {
                self.trap.trap(&err);
                Ok(())
            }
            result => result,
        }
    }
}
