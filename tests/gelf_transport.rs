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

use std::io::Read;
use std::net::TcpListener;
use std::net::UdpSocket;
use std::thread;

use flate2::read::GzDecoder;
use flate2::read::ZlibDecoder;
use logfacade::Backend;
use logfacade::ErrorKind;
use logfacade::Fields;
use logfacade::Formatter;
use logfacade::Logger;
use logfacade::Reconnection;
use logfacade::append::gelf::Compression;
use logfacade::append::gelf::CompressionType;
use logfacade::append::gelf::GelfSettings;
use logfacade::connection::Connection;
use logfacade::connection::Scheme;
use serde_json::Value;
use serde_json::json;

mod common;

fn settings(url: String) -> GelfSettings {
    GelfSettings {
        connection: Connection::from_url(url),
        hostname: "gelf-host".to_string(),
        ..GelfSettings::default()
    }
}

fn receive_udp(kind: CompressionType) -> Value {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    let mut settings = settings(format!("udp://{}", server.local_addr().unwrap()));
    settings.udp.compression = Compression { kind, level: 6 };

    let logger = Logger::new(Backend::Gelf(settings), Formatter::default()).unwrap();
    logger.set_tag("api");
    let mut fields = Fields::new();
    fields.insert("request".to_string(), json!(17));
    logger.warnv("slow request", &fields).unwrap();
    logger.close().unwrap();

    let mut buf = [0u8; 4096];
    let len = server.recv(&mut buf).unwrap();
    let datagram = &buf[..len];

    let mut payload = Vec::new();
    match kind {
        CompressionType::None => payload.extend_from_slice(datagram),
        CompressionType::Gzip => {
            GzDecoder::new(datagram).read_to_end(&mut payload).unwrap();
        }
        CompressionType::Zlib => {
            ZlibDecoder::new(datagram).read_to_end(&mut payload).unwrap();
        }
    }
    serde_json::from_slice(&payload).unwrap()
}

#[test]
fn test_gelf_udp_compression() {
    for kind in [
        CompressionType::None,
        CompressionType::Gzip,
        CompressionType::Zlib,
    ] {
        let message = receive_udp(kind);
        assert_eq!(message["version"], json!("1.1"), "{kind}");
        assert_eq!(message["host"], json!("gelf-host"));
        assert_eq!(message["short_message"], json!("slow request"));
        assert_eq!(message["level"], json!(4));
        assert_eq!(message["_request"], json!(17));
        assert_eq!(message["_tag"], json!("api"));
        assert!(message["timestamp"].is_f64());
    }
}

#[test]
fn test_gelf_tcp_null_terminated() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("tcp://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).unwrap();
        received
    });

    let logger = Logger::new(Backend::Gelf(settings(url)), Formatter::default()).unwrap();
    assert!(logger.is_time_stamp());
    logger.info("first").unwrap();
    logger.info("second").unwrap();
    logger.close().unwrap();

    let received = server.join().unwrap();
    let frames: Vec<&[u8]> = received
        .split(|byte| *byte == 0)
        .filter(|frame| !frame.is_empty())
        .collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(received.last(), Some(&0));
    let first: Value = serde_json::from_slice(frames[0]).unwrap();
    assert_eq!(first["short_message"], json!("first"));
    let second: Value = serde_json::from_slice(frames[1]).unwrap();
    assert_eq!(second["short_message"], json!("second"));
}

#[test]
fn test_gelf_unreachable_tcp_endpoint() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut settings = settings(format!("tcp://127.0.0.1:{port}"));
    settings.tcp.reconnection = Reconnection::new(2, 10);
    let mut formatter = Formatter::default();
    formatter.stderr = false;

    let err = Logger::new(Backend::Gelf(settings), formatter).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connect);
    assert!(err.to_string().contains("attempts: 2"), "{err}");
}

#[test]
fn test_gelf_rejects_bad_compression_level() {
    let mut bad = settings("udp://127.0.0.1:12201".to_string());
    bad.udp.compression.level = 10;
    let err = Logger::new(Backend::Gelf(bad), Formatter::default()).unwrap_err();
    assert_eq!(err.message(), "Compression level must be more -2 and less 10");
}

#[test]
fn test_gelf_tls_null_terminated() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let mut stream = common::accept_tls(&listener);
        let first = common::read_null_frame(&mut stream);
        let second = common::read_null_frame(&mut stream);
        (first, second)
    });

    let mut settings = GelfSettings {
        connection: Connection::from_host(Scheme::TcpTls, "127.0.0.1", i64::from(port)),
        hostname: "gelf-host".to_string(),
        ..GelfSettings::default()
    };
    settings.tcp.tls = Some(common::client_bundle());
    let logger = Logger::new(Backend::Gelf(settings), Formatter::default()).unwrap();
    logger.info("sealed").unwrap();
    logger.set_level(logfacade::Level::Trace).unwrap();
    logger.trace("traced").unwrap();
    logger.close().unwrap();

    let (first, second) = server.join().unwrap();
    let first: Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(first["short_message"], json!("sealed"));
    assert_eq!(first["level"], json!(6));
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert_eq!(second["short_message"], json!("traced"));
    assert_eq!(second["level"], json!(5));
}
