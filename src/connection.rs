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

//! Connection descriptors and their normalization.
//!
//! A descriptor is either a URL (`udp://host:port`, `tcp+tls://host`, `unix:///dev/log`) or the
//! discrete `scheme`, `host`, `port` and `socket_path` fields. [`Connection::resolve`] validates
//! either form and fills in `address` and `url` so that both always agree with the other fields.
//!
//! # Examples
//!
//! ```
//! use logfacade::connection::Connection;
//! use logfacade::connection::Scheme;
//!
//! let conn = Connection::from_url("tcp://127.0.0.1").resolve(514, 6514).unwrap();
//! assert_eq!(conn.scheme, Some(Scheme::Tcp));
//! assert_eq!(conn.address, "127.0.0.1:6514");
//! assert_eq!(conn.url, "tcp://127.0.0.1:6514");
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;

/// Smallest valid port.
pub const PORT_MIN: i64 = 1;
/// Largest valid port.
pub const PORT_MAX: i64 = 65535;

/// Transport scheme of a connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    #[serde(rename = "udp")]
    Udp,
    #[serde(rename = "tcp")]
    Tcp,
    #[serde(rename = "tcp+tls")]
    TcpTls,
    #[serde(rename = "unix")]
    Unix,
    #[serde(rename = "unixgram")]
    Unixgram,
}

impl Scheme {
    pub const ALL: [Scheme; 5] = [
        Scheme::Udp,
        Scheme::Tcp,
        Scheme::TcpTls,
        Scheme::Unix,
        Scheme::Unixgram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Udp => "udp",
            Scheme::Tcp => "tcp",
            Scheme::TcpTls => "tcp+tls",
            Scheme::Unix => "unix",
            Scheme::Unixgram => "unixgram",
        }
    }

    /// Whether the scheme addresses a unix domain socket.
    pub fn is_unix(&self) -> bool {
        matches!(self, Scheme::Unix | Scheme::Unixgram)
    }

    /// Whether the scheme is a TCP stream, plain or encrypted.
    pub fn is_tcp(&self) -> bool {
        matches!(self, Scheme::Tcp | Scheme::TcpTls)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scheme::ALL
            .iter()
            .find(|scheme| scheme.as_str() == s)
            .copied()
            .ok_or_else(|| {
                Error::config("Scheme should be udp, tcp, tcp+tls, unix, unixgram")
                    .with_context("scheme", s)
            })
    }
}

/// A connection descriptor.
///
/// Timeouts are in milliseconds; zero disables them. `retry_wait`, `max_retry`,
/// `max_retry_wait`, `buffer_limit` and `is_async` are accepted for configuration compatibility
/// and are not used by the built-in appenders.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connection {
    pub url: String,
    pub scheme: Option<Scheme>,
    pub host: String,
    pub port: i64,
    pub address: String,
    pub socket_path: String,
    pub timeout: u64,
    pub write_timeout: u64,
    pub retry_wait: u64,
    pub max_retry: u64,
    pub max_retry_wait: u64,
    pub buffer_limit: u64,
    pub is_async: bool,
}

impl Connection {
    /// Create a descriptor from a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a descriptor from a scheme, host and port.
    pub fn from_host(scheme: Scheme, host: impl Into<String>, port: i64) -> Self {
        Self {
            scheme: Some(scheme),
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Create a descriptor for a unix domain socket.
    pub fn from_socket_path(scheme: Scheme, socket_path: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme),
            socket_path: socket_path.into(),
            ..Self::default()
        }
    }

    /// Validate and normalize this descriptor.
    ///
    /// `udp_port` and `tcp_port` fill in a missing port for UDP and for TCP-based schemes.
    pub fn resolve(mut self, udp_port: u16, tcp_port: u16) -> Result<Connection, Error> {
        if self.url.trim().is_empty() {
            self.resolve_fields(udp_port, tcp_port)?;
        } else {
            self.resolve_url(udp_port, tcp_port)?;
        }
        Ok(self)
    }

    /// The scheme of a resolved connection.
    pub fn resolved_scheme(&self) -> Result<Scheme, Error> {
        self.scheme
            .ok_or_else(|| Error::config("Connection scheme must be defined"))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout > 0).then(|| Duration::from_millis(self.write_timeout))
    }

    fn resolve_url(&mut self, udp_port: u16, tcp_port: u16) -> Result<(), Error> {
        let url = self.url.trim().to_string();
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(
                Error::config("Socket address should be in form scheme://address")
                    .with_context("url", &url),
            );
        };
        let scheme = scheme.parse::<Scheme>()?;
        self.scheme = Some(scheme);

        if scheme.is_unix() {
            let path = rest.split(['?', '#']).next().unwrap_or_default();
            check_socket_path(path)?;
            self.socket_path = path.to_string();
            self.host.clear();
            self.port = 0;
            self.address = path.to_string();
            self.url = format!("{scheme}://{path}");
            return Ok(());
        }

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let (host, port) = split_host_port(authority).map_err(|err| {
            err.with_context("url", &url)
                .with_context("expected", "scheme://host:port")
        })?;
        self.host = host;
        self.port = match port {
            Some(port) => port,
            None => i64::from(default_port(scheme, udp_port, tcp_port)),
        };
        self.check_host_port()?;
        self.build();
        Ok(())
    }

    fn resolve_fields(&mut self, udp_port: u16, tcp_port: u16) -> Result<(), Error> {
        let scheme = self.resolved_scheme()?;

        if scheme.is_unix() {
            check_socket_path(&self.socket_path)?;
            self.address = self.socket_path.clone();
            self.url = format!("{scheme}://{}", self.socket_path);
            return Ok(());
        }

        if self.port == 0 {
            self.port = i64::from(default_port(scheme, udp_port, tcp_port));
        }
        self.check_host_port()?;
        self.build();
        Ok(())
    }

    fn check_host_port(&self) -> Result<(), Error> {
        if self.host.is_empty() {
            return Err(Error::config("Host should be defined"));
        }
        if self.port < PORT_MIN || self.port > PORT_MAX {
            return Err(
                Error::config("Port should be more 0 and less 65536").with_context("port", self.port)
            );
        }
        Ok(())
    }

    fn build(&mut self) {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        self.address = format!("{host}:{}", self.port);
        if let Some(scheme) = self.scheme {
            self.url = format!("{scheme}://{}", self.address);
        }
    }
}

fn default_port(scheme: Scheme, udp_port: u16, tcp_port: u16) -> u16 {
    if scheme == Scheme::Udp {
        udp_port
    } else {
        tcp_port
    }
}

fn check_socket_path(path: &str) -> Result<(), Error> {
    if path.is_empty() {
        return Err(Error::config("Socket path should be defined"));
    }
    Path::new(path).metadata().map_err(|err| {
        Error::config("path does not exist")
            .with_context("path", path)
            .with_source(err)
    })?;
    Ok(())
}

/// Split `host[:port]`, accepting bracketed IPv6 literals.
fn split_host_port(authority: &str) -> Result<(String, Option<i64>), Error> {
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let Some((host, after)) = rest.split_once(']') else {
            return Err(Error::config("missing ']' in address"));
        };
        match after {
            "" => (host, None),
            _ => match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(Error::config("unexpected characters after ']' in address")),
            },
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, _)) if host.contains(':') => {
                return Err(Error::config("too many colons in address"));
            }
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    let port = match port {
        None | Some("") => None,
        Some(port) => Some(port.parse::<i64>().map_err(|err| {
            Error::config("invalid port in address")
                .with_context("port", port)
                .with_source(err)
        })?),
    };

    Ok((host.to_string(), port))
}
