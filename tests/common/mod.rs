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

//! TLS fixtures shared by the transport tests.
//!
//! `tests/fixtures` holds a test CA, a server certificate for `localhost` and `127.0.0.1`, and a
//! client certificate whose key exists both in clear and encrypted with the passphrase
//! [`PASSPHRASE`].

#![allow(dead_code)]

use std::io::Read;
use std::net::TcpListener;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::Arc;

use logfacade::tls::TlsBundle;
use rustls::ServerConfig;
use rustls::ServerConnection;
use rustls::StreamOwned;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::pem::PemObject;

pub const PASSPHRASE: &str = "hunter2";

pub fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// A bundle trusting the test CA, authenticating with the encrypted client key.
pub fn encrypted_client_bundle() -> TlsBundle {
    TlsBundle {
        root_ca: fixture("ca.pem"),
        client_cert: fixture("client.pem"),
        client_key: fixture("client-encrypted.key"),
        passphrase: PASSPHRASE.to_string(),
        insecure: false,
    }
}

/// A bundle trusting the test CA, authenticating with the clear client key.
pub fn client_bundle() -> TlsBundle {
    TlsBundle {
        client_key: fixture("client.key"),
        passphrase: String::new(),
        ..encrypted_client_bundle()
    }
}

pub fn server_config() -> Arc<ServerConfig> {
    let certs = CertificateDer::pem_file_iter(fixture("server.pem"))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = PrivateKeyDer::from_pem_file(fixture("server.key")).unwrap();
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    Arc::new(config)
}

/// Accept one connection on `listener` and wrap it in a server-side TLS stream.
pub fn accept_tls(listener: &TcpListener) -> StreamOwned<ServerConnection, TcpStream> {
    let (stream, _) = listener.accept().unwrap();
    let conn = ServerConnection::new(server_config()).unwrap();
    StreamOwned::new(conn, stream)
}

/// Read one octet-counted frame, `<len> <message>`, and return the message.
pub fn read_octet_frame(reader: &mut impl Read) -> String {
    let mut len = String::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).unwrap();
        if byte[0] == b' ' {
            break;
        }
        assert!(byte[0].is_ascii_digit(), "unexpected frame byte {:?}", byte[0]);
        len.push(char::from(byte[0]));
    }
    let mut message = vec![0u8; len.parse().unwrap()];
    reader.read_exact(&mut message).unwrap();
    String::from_utf8(message).unwrap()
}

/// Read bytes up to, and without, the next NUL.
pub fn read_null_frame(reader: &mut impl Read) -> Vec<u8> {
    let mut frame = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        reader.read_exact(&mut byte).unwrap();
        if byte[0] == 0 {
            return frame;
        }
        frame.push(byte[0]);
    }
}
