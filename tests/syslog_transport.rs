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

use std::io::BufRead;
use std::io::BufReader;
use std::net::TcpListener;
use std::net::UdpSocket;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use logfacade::Backend;
use logfacade::ErrorKind;
use logfacade::Fields;
use logfacade::Formatter;
use logfacade::Logger;
use logfacade::Reconnection;
use logfacade::append::syslog::SyslogSettings;
use logfacade::append::syslog::SyslogTcp;
use logfacade::connection::Connection;
use logfacade::connection::Scheme;

mod common;

fn settings(connection: Connection) -> SyslogSettings {
    SyslogSettings {
        connection,
        hostname: "test-host".to_string(),
        facility: "syslog".to_string(),
        app_name: "Blablabla".to_string(),
        format: "rfc5424".to_string(),
        tag: "tag012321".to_string(),
        ..SyslogSettings::default()
    }
}

#[test]
fn test_syslog_tcp_rfc5424() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut lines = BufReader::new(stream).lines();
        lines.next().unwrap().unwrap()
    });

    let connection = Connection::from_host(Scheme::Tcp, "127.0.0.1", i64::from(port));
    let logger = Logger::new(Backend::Syslog(settings(connection)), Formatter::default()).unwrap();
    logger.set_environment("test");
    logger.info("hello over tcp").unwrap();
    logger.debug("below the threshold").unwrap();
    logger.close().unwrap();
    logger.close().unwrap();

    let line = server.join().unwrap();
    // facility syslog (5) and severity informational (6)
    assert!(line.starts_with("<46>1 "), "{line}");
    let fields: Vec<&str> = line.splitn(8, ' ').collect();
    assert_eq!(fields[2], "test-host");
    assert_eq!(fields[3], "Blablabla");
    assert_eq!(fields[4], std::process::id().to_string());
    assert_eq!(fields[5], "tag012321");
    assert_eq!(fields[6], "-");
    assert!(fields[7].starts_with("time="), "{line}");
    assert!(
        fields[7].ends_with("level=info env=test msg=\"hello over tcp\""),
        "{line}"
    );
}

#[test]
fn test_syslog_udp_rfc3164() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let url = format!("udp://{}", server.local_addr().unwrap());

    let mut settings = settings(Connection::from_url(url));
    settings.format = "rfc3164".to_string();
    settings.facility = "local0".to_string();
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();
    logger.error("disk failure").unwrap();

    let mut buf = [0u8; 2048];
    let len = server.recv(&mut buf).unwrap();
    let message = String::from_utf8_lossy(&buf[..len]).into_owned();
    // local0 (16) and severity error (3)
    assert!(message.starts_with("<131>"), "{message}");
    let pid = std::process::id();
    assert!(
        message.contains(&format!(" test-host Blablabla[{pid}]: tag012321: time=")),
        "{message}"
    );
    assert!(message.ends_with("level=error msg=\"disk failure\"\n"), "{message}");
    logger.close().unwrap();
}

#[test]
fn test_syslog_time_is_never_a_stamp() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let url = format!("udp://{}", server.local_addr().unwrap());

    let mut formatter = Formatter::default();
    formatter.time.is_stamp = true;
    let logger = Logger::new(Backend::Syslog(settings(Connection::from_url(url))), formatter).unwrap();
    assert!(!logger.is_time_stamp());
    logger.info("m").unwrap();

    let mut buf = [0u8; 2048];
    let len = server.recv(&mut buf).unwrap();
    let message = String::from_utf8_lossy(&buf[..len]).into_owned();
    assert!(message.contains(" time="), "{message}");
    assert!(!message.contains("timestamp="), "{message}");
}

#[test]
fn test_syslog_rejects_bad_settings() {
    let connection = Connection::from_url("udp://127.0.0.1:514");

    let mut bad = settings(connection.clone());
    bad.facility = "nowhere".to_string();
    let err = Logger::new(Backend::Syslog(bad), Formatter::default()).unwrap_err();
    assert_eq!(err.message(), "Invalid syslog facility");

    let mut bad = settings(connection);
    bad.format = "rfc9999".to_string();
    let err = Logger::new(Backend::Syslog(bad), Formatter::default()).unwrap_err();
    assert_eq!(err.message(), "Invalid syslog format");
}

#[test]
fn test_syslog_udp_skips_field_with_bad_key() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let url = format!("udp://{}", server.local_addr().unwrap());
    let settings = settings(Connection::from_url(url));
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();

    let mut fields = Fields::new();
    fields.insert("user id".to_string(), 7.into());
    logger.infov("login", &fields).unwrap();

    let mut buf = [0u8; 2048];
    let len = server.recv(&mut buf).unwrap();
    let message = String::from_utf8_lossy(&buf[..len]).into_owned();
    assert!(message.ends_with("level=info msg=login\n"), "{message}");
    assert!(!message.contains("user id"), "{message}");
}

#[test]
fn test_syslog_tls_with_encrypted_client_key() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let mut stream = common::accept_tls(&listener);
        let first = common::read_octet_frame(&mut stream);
        let second = common::read_octet_frame(&mut stream);
        (first, second)
    });

    let connection = Connection::from_host(Scheme::TcpTls, "127.0.0.1", i64::from(port));
    let mut settings = settings(connection);
    settings.tcp = SyslogTcp {
        tls: Some(common::encrypted_client_bundle()),
        reconnection: Reconnection::default(),
    };
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();
    logger.info("over tls").unwrap();
    logger.trace("hidden").unwrap();
    logger.warn("still encrypted").unwrap();
    logger.close().unwrap();

    let (first, second) = server.join().unwrap();
    // facility syslog (5) and severity informational (6), then warning (4)
    assert!(first.starts_with("<46>1 "), "{first}");
    assert!(first.ends_with("level=info msg=\"over tls\"\n"), "{first}");
    assert!(second.starts_with("<44>1 "), "{second}");
    assert!(second.ends_with("level=warn msg=\"still encrypted\"\n"), "{second}");
}

#[test]
fn test_syslog_tls_wrong_passphrase_is_config_error() {
    let mut bundle = common::encrypted_client_bundle();
    bundle.passphrase = "wrong".to_string();
    let mut settings = settings(Connection::from_host(Scheme::TcpTls, "127.0.0.1", 6514));
    settings.tcp.tls = Some(bundle);

    let err = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
    assert_eq!(err.message(), "failed to load TLS client key");
}

#[test]
fn test_syslog_tcp_reconnects_after_peer_drops() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (dropped_tx, dropped_rx) = mpsc::channel();
    let server = thread::spawn(move || {
        let (first, _) = listener.accept().unwrap();
        drop(first);
        dropped_tx.send(()).unwrap();

        let (second, _) = listener.accept().unwrap();
        let mut lines = BufReader::new(second).lines();
        loop {
            let line = lines.next().unwrap().unwrap();
            if line.contains("msg=after") {
                return line;
            }
        }
    });

    let connection = Connection::from_host(Scheme::Tcp, "127.0.0.1", i64::from(port));
    let mut settings = settings(connection);
    settings.tcp.reconnection = Reconnection::new(3, 10);
    let mut formatter = Formatter::default();
    formatter.stderr = false;
    let logger = Logger::new(Backend::Syslog(settings), formatter).unwrap();

    dropped_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(50));
    // lands on the closed peer, which answers with a reset
    logger.info("before").unwrap();
    thread::sleep(Duration::from_millis(100));
    logger.info("after").unwrap();
    logger.close().unwrap();

    let line = server.join().unwrap();
    assert!(line.starts_with("<46>1 "), "{line}");
}

#[test]
fn test_syslog_tcp_gives_up_after_max_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (first, _) = listener.accept().unwrap();
        drop(first);
        drop(listener);
    });

    let connection = Connection::from_host(Scheme::Tcp, "127.0.0.1", i64::from(port));
    let mut settings = settings(connection);
    settings.tcp.reconnection = Reconnection::new(2, 10);
    let mut formatter = Formatter::default();
    formatter.stderr = false;
    let logger = Logger::new(Backend::Syslog(settings), formatter).unwrap();
    server.join().unwrap();

    let mut failure = None;
    for i in 0..20 {
        if let Err(err) = logger.info(format!("attempt {i}")) {
            failure = Some(err);
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let err = failure.expect("writes to a vanished peer must fail");
    assert_eq!(err.kind(), ErrorKind::Write);
    assert_eq!(err.message(), "failed to reconnect after write error");
    assert!(err.to_string().contains("attempts: 2"), "{err}");

    let err = logger.info("again").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);
    assert_eq!(err.message(), "failed to reconnect");
}

#[cfg(unix)]
#[test]
fn test_syslog_unixgram() {
    use std::os::unix::net::UnixDatagram;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.sock");
    let server = UnixDatagram::bind(&path).unwrap();

    let mut settings = settings(Connection::from_socket_path(
        Scheme::Unixgram,
        path.to_str().unwrap(),
    ));
    settings.format = "unix".to_string();
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();
    logger.warn("local datagram").unwrap();
    logger.close().unwrap();

    let mut buf = [0u8; 2048];
    let len = server.recv(&mut buf).unwrap();
    let message = String::from_utf8_lossy(&buf[..len]).into_owned();
    // facility syslog (5) and severity warning (4)
    assert!(message.starts_with("<44>"), "{message}");
    let pid = std::process::id();
    assert!(message.contains(&format!(" Blablabla[{pid}]: tag012321: ")), "{message}");
    assert!(!message.contains("test-host"), "{message}");
    assert!(message.ends_with("level=warn msg=\"local datagram\"\n"), "{message}");
}

#[cfg(unix)]
#[test]
fn test_syslog_unix_stream() {
    use std::os::unix::net::UnixListener;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.sock");
    let listener = UnixListener::bind(&path).unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        BufReader::new(stream)
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    });

    let settings = settings(Connection::from_socket_path(
        Scheme::Unix,
        path.to_str().unwrap(),
    ));
    let logger = Logger::new(Backend::Syslog(settings), Formatter::default()).unwrap();
    logger.info("one").unwrap();
    logger.error("two").unwrap();
    logger.close().unwrap();

    let lines = server.join().unwrap();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].starts_with("<46>1 "), "{lines:?}");
    assert!(lines[0].ends_with("level=info msg=one"), "{lines:?}");
    assert!(lines[1].starts_with("<43>1 "), "{lines:?}");
    assert!(lines[1].ends_with("level=error msg=two"), "{lines:?}");
}

