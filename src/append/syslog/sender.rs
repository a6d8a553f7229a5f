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

use std::io;

use fasyslog::sender::SyslogSender;
use fasyslog::sender::UdpSender;

use crate::connection::Scheme;
use crate::net::Dialer;
use crate::net::Sink;
use crate::net::Transport;

/// The socket a syslog appender writes through.
///
/// Messages arrive fully formatted and framed, so the stream senders get an empty postfix.
/// fasyslog senders have no connect or write timeout: a stream connection that sets one is dialed
/// by hand instead.
pub(crate) enum Sender {
    Fasyslog(SyslogSender),
    Timed(Transport),
}

impl Sender {
    fn dial_fasyslog(dialer: &Dialer) -> io::Result<SyslogSender> {
        let sender = match dialer.scheme() {
            Scheme::Udp => SyslogSender::Udp(UdpSender::new(dialer.dial_udp()?)),
            Scheme::Tcp => {
                let mut sender = fasyslog::sender::tcp(dialer.address())?;
                sender.set_postfix("");
                SyslogSender::Tcp(sender)
            }
            Scheme::TcpTls => {
                let config = dialer.tls_config()?.clone();
                let mut sender =
                    fasyslog::sender::rustls_with(dialer.address(), dialer.host(), config)?;
                sender.set_postfix("");
                SyslogSender::RustlsSender(Box::new(sender))
            }
            #[cfg(unix)]
            Scheme::Unix => {
                let mut sender = fasyslog::sender::unix_stream(dialer.socket_path())?;
                sender.set_postfix("");
                SyslogSender::UnixStream(sender)
            }
            #[cfg(unix)]
            Scheme::Unixgram => {
                SyslogSender::UnixDatagram(fasyslog::sender::unix_datagram(dialer.socket_path())?)
            }
            #[cfg(not(unix))]
            Scheme::Unix | Scheme::Unixgram => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix domain sockets are not supported on this platform",
                ));
            }
        };
        Ok(sender)
    }
}

impl Sink for Sender {
    fn dial(dialer: &Dialer) -> io::Result<Self> {
        if dialer.has_timeouts() && dialer.scheme() != Scheme::Udp {
            return Transport::dial(dialer).map(Sender::Timed);
        }
        Self::dial_fasyslog(dialer).map(Sender::Fasyslog)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Sender::Fasyslog(sender) => {
                sender.send_formatted(buf)?;
                sender.flush()
            }
            Sender::Timed(transport) => transport.send(buf),
        }
    }

    fn is_stream(&self) -> bool {
        match self {
            Sender::Fasyslog(SyslogSender::Udp(_)) => false,
            #[cfg(unix)]
            Sender::Fasyslog(SyslogSender::UnixDatagram(_)) => false,
            Sender::Fasyslog(_) => true,
            Sender::Timed(transport) => transport.is_stream(),
        }
    }

    fn shutdown(self) -> io::Result<()> {
        match self {
            Sender::Fasyslog(mut sender) => sender.flush(),
            Sender::Timed(transport) => transport.shutdown(),
        }
    }
}
