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

//! Sockets shared by the syslog and GELF appenders.

use std::fmt;
use std::io;
use std::io::Write;
use std::net::Shutdown;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::net::UdpSocket;
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rustls::ClientConfig;
use rustls::ClientConnection;
use rustls::StreamOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::connection::Connection;
use crate::connection::Scheme;
use crate::tls;
use crate::tls::TlsBundle;

/// Reconnection policy for TCP-based schemes.
///
/// Zero values fall back to [`Reconnection::DEFAULT_MAX`] and [`Reconnection::DEFAULT_DELAY`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reconnection {
    /// Connection attempts made before giving up.
    pub max: i64,
    /// Wait between two attempts, in milliseconds.
    pub delay: i64,
}

impl Reconnection {
    pub const DEFAULT_MAX: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new(max: i64, delay: i64) -> Self {
        Self { max, delay }
    }

    /// Reject negative values.
    pub fn check(&self) -> Result<(), Error> {
        if self.max < 0 {
            return Err(
                Error::config("Max reconnection must be a positive integer")
                    .with_context("max", self.max),
            );
        }
        if self.delay < 0 {
            return Err(
                Error::config("Delay reconnection must be a positive integer")
                    .with_context("delay", self.delay),
            );
        }
        Ok(())
    }

    pub fn max_attempts(&self) -> u32 {
        match u32::try_from(self.max) {
            Ok(0) | Err(_) => Self::DEFAULT_MAX,
            Ok(max) => max,
        }
    }

    pub fn delay(&self) -> Duration {
        match u64::try_from(self.delay) {
            Ok(0) | Err(_) => Self::DEFAULT_DELAY,
            Ok(delay) => Duration::from_millis(delay),
        }
    }
}

/// Call `dial` up to `attempts` times, sleeping `delay` between two calls.
pub(crate) fn retry<T>(
    attempts: u32,
    delay: Duration,
    mut dial: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let mut last_error = None;
    for attempt in 0..attempts {
        if attempt > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }
        match dial() {
            Ok(t) => return Ok(t),
            Err(err) => last_error = Some(err),
        }
    }
    Err(last_error.unwrap_or_else(|| io::Error::other("no connection attempt was made")))
}

/// A connected socket a [`Link`] writes through.
pub(crate) trait Sink: Sized {
    /// Open one connection, without retrying.
    fn dial(dialer: &Dialer) -> io::Result<Self>;

    /// Write one complete message.
    fn send(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Whether the socket is connection oriented and worth reconnecting.
    fn is_stream(&self) -> bool;

    fn shutdown(self) -> io::Result<()>;
}

/// A socket dialed by hand, honoring the connect and write timeouts.
pub(crate) enum Transport {
    Udp(UdpSocket),
    Tcp(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
    #[cfg(unix)]
    Unix(UnixStream),
    #[cfg(unix)]
    Unixgram(UnixDatagram),
}

impl Sink for Transport {
    fn dial(dialer: &Dialer) -> io::Result<Self> {
        match dialer.scheme {
            Scheme::Udp => Ok(Transport::Udp(dialer.dial_udp()?)),
            Scheme::Tcp => Ok(Transport::Tcp(dialer.dial_tcp()?)),
            Scheme::TcpTls => {
                let config = dialer.tls_config()?;
                let server_name = tls::server_name(&dialer.host).map_err(io::Error::other)?;
                let mut sock = dialer.dial_tcp()?;
                let mut conn =
                    ClientConnection::new(config.clone(), server_name).map_err(io::Error::other)?;
                while conn.is_handshaking() {
                    conn.complete_io(&mut sock)?;
                }
                Ok(Transport::Tls(Box::new(StreamOwned::new(conn, sock))))
            }
            #[cfg(unix)]
            Scheme::Unix => {
                let stream = UnixStream::connect(&dialer.socket_path)?;
                stream.set_write_timeout(dialer.write_timeout)?;
                Ok(Transport::Unix(stream))
            }
            #[cfg(unix)]
            Scheme::Unixgram => {
                let socket = UnixDatagram::unbound()?;
                socket.connect(&dialer.socket_path)?;
                socket.set_write_timeout(dialer.write_timeout)?;
                Ok(Transport::Unixgram(socket))
            }
            #[cfg(not(unix))]
            Scheme::Unix | Scheme::Unixgram => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix domain sockets are not supported on this platform",
            )),
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Transport::Udp(socket) => socket.send(buf).map(drop),
            Transport::Tcp(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            Transport::Tls(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            #[cfg(unix)]
            Transport::Unix(stream) => {
                stream.write_all(buf)?;
                stream.flush()
            }
            #[cfg(unix)]
            Transport::Unixgram(socket) => socket.send(buf).map(drop),
        }
    }

    fn is_stream(&self) -> bool {
        match self {
            Transport::Udp(_) => false,
            Transport::Tcp(_) | Transport::Tls(_) => true,
            #[cfg(unix)]
            Transport::Unix(_) => true,
            #[cfg(unix)]
            Transport::Unixgram(_) => false,
        }
    }

    fn shutdown(self) -> io::Result<()> {
        let result = match self {
            Transport::Udp(_) => Ok(()),
            Transport::Tcp(stream) => stream.shutdown(Shutdown::Both),
            Transport::Tls(mut stream) => {
                stream.conn.send_close_notify();
                let _ = stream.flush();
                stream.sock.shutdown(Shutdown::Both)
            }
            #[cfg(unix)]
            Transport::Unix(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Transport::Unixgram(_) => Ok(()),
        };
        match result {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// Everything needed to (re)open a [`Sink`].
#[derive(Debug, Clone)]
pub(crate) struct Dialer {
    scheme: Scheme,
    url: String,
    host: String,
    address: String,
    socket_path: String,
    connect_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    tls: Option<Arc<ClientConfig>>,
    reconnection: Reconnection,
}

impl Dialer {
    /// Prepare a dialer for a resolved connection. TLS files are loaded here for `tcp+tls`.
    pub(crate) fn new(
        connection: &Connection,
        tls: Option<&TlsBundle>,
        reconnection: Reconnection,
    ) -> Result<Self, Error> {
        let scheme = connection.resolved_scheme()?;
        reconnection.check()?;
        let tls = match scheme {
            Scheme::TcpTls => {
                tls::server_name(&connection.host)?;
                Some(tls::build_client_config(tls)?)
            }
            _ => None,
        };

        Ok(Self {
            scheme,
            url: connection.url.clone(),
            host: connection.host.clone(),
            address: connection.address.clone(),
            socket_path: connection.socket_path.clone(),
            connect_timeout: connection.connect_timeout(),
            write_timeout: connection.write_timeout(),
            tls,
            reconnection,
        })
    }

    pub(crate) fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// The TLS server name.
    pub(crate) fn host(&self) -> &str {
        &self.host
    }

    /// `host:port` of the endpoint.
    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Whether the connection sets a connect or write timeout.
    pub(crate) fn has_timeouts(&self) -> bool {
        self.connect_timeout.is_some() || self.write_timeout.is_some()
    }

    pub(crate) fn tls_config(&self) -> io::Result<&Arc<ClientConfig>> {
        self.tls
            .as_ref()
            .ok_or_else(|| io::Error::other("TLS configuration is missing"))
    }

    /// Open a sink, retrying TCP-based schemes per the reconnection policy.
    pub(crate) fn connect<S: Sink>(&self) -> Result<S, Error> {
        let attempts = if self.scheme.is_tcp() {
            self.reconnection.max_attempts()
        } else {
            1
        };

        retry(attempts, self.reconnection.delay(), || S::dial(self)).map_err(|err| {
            Error::connect("Can not connect to endpoint")
                .with_context("url", &self.url)
                .with_context("attempts", attempts)
                .with_source(err)
        })
    }

    /// A UDP socket bound to an ephemeral port and connected to the endpoint.
    pub(crate) fn dial_udp(&self) -> io::Result<UdpSocket> {
        let addr = socket_addrs(&self.address)?
            .into_iter()
            .next()
            .ok_or_else(|| unresolved(&self.address))?;
        let local = if addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(addr)?;
        Ok(socket)
    }

    fn dial_tcp(&self) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            None => TcpStream::connect(self.address.as_str())?,
            Some(timeout) => {
                let mut last_error = None;
                let mut connected = None;
                for addr in socket_addrs(&self.address)? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_error = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => return Err(last_error.unwrap_or_else(|| unresolved(&self.address))),
                }
            }
        };
        stream.set_write_timeout(self.write_timeout)?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

fn socket_addrs(address: &str) -> io::Result<Vec<SocketAddr>> {
    Ok(address.to_socket_addrs()?.collect())
}

fn unresolved(address: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no address resolved for {address}"),
    )
}

/// A sink with its lifecycle: Unconnected, Connected, Closed.
pub(crate) struct Link<S: Sink = Transport> {
    dialer: Dialer,
    sink: Option<S>,
    closed: bool,
}

impl<S: Sink> fmt::Debug for Link<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("url", &self.dialer.url())
            .field("connected", &self.sink.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl<S: Sink> Link<S> {
    /// Dial right away; a failure here is a construction failure.
    pub(crate) fn open(dialer: Dialer) -> Result<Self, Error> {
        let sink = dialer.connect()?;
        Ok(Self {
            dialer,
            sink: Some(sink),
            closed: false,
        })
    }

    pub(crate) fn dialer(&self) -> &Dialer {
        &self.dialer
    }

    /// Send `buf`. A broken stream is reconnected and the write retried once.
    ///
    /// When an earlier reconnect failed there is no sink left, and this call dials again first.
    pub(crate) fn send(&mut self, buf: &[u8]) -> Result<(), Error> {
        if self.closed {
            return Err(Error::write("writer is closed").with_context("url", self.dialer.url()));
        }

        let first = match self.sink.as_mut() {
            Some(sink) => match sink.send(buf) {
                Ok(()) => return Ok(()),
                Err(err) if sink.is_stream() => Some(err),
                Err(err) => return Err(self.write_error(err)),
            },
            None => None,
        };
        if let Some(sink) = self.sink.take() {
            let _ = sink.shutdown();
        }

        let mut sink: S = self.dialer.connect().map_err(|err| {
            let error = match &first {
                Some(first) => Error::write("failed to reconnect after write error")
                    .with_context("write_error", first),
                None => Error::write("failed to reconnect"),
            };
            error
                .with_context("url", self.dialer.url())
                .with_source(err)
        })?;
        sink.send(buf).map_err(|err| self.write_error(err))?;
        self.sink = Some(sink);
        Ok(())
    }

    /// Release the socket. Calling this again is a no-op.
    pub(crate) fn close(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.sink.take() {
            Some(sink) => sink.shutdown().map_err(|err| {
                Error::close("failed to close connection")
                    .with_context("url", self.dialer.url())
                    .with_source(err)
            }),
            None => Ok(()),
        }
    }

    fn write_error(&self, err: io::Error) -> Error {
        Error::write("failed to write message")
            .with_context("url", self.dialer.url())
            .with_source(err)
    }
}
