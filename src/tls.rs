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

//! TLS client configuration for the `tcp+tls` scheme.

use std::fs;
use std::sync::Arc;

use rustls::ClientConfig;
use rustls::DigitallySignedStruct;
use rustls::RootCertStore;
use rustls::SignatureScheme;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::client::danger::ServerCertVerified;
use rustls::client::danger::ServerCertVerifier;
use rustls::crypto::CryptoProvider;
use rustls_pki_types::CertificateDer;
use rustls_pki_types::PrivateKeyDer;
use rustls_pki_types::PrivatePkcs8KeyDer;
use rustls_pki_types::ServerName;
use rustls_pki_types::UnixTime;
use rustls_pki_types::pem::PemObject;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;

/// Certificate files used to dial a `tcp+tls` endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsBundle {
    /// PEM file with the trusted root certificates.
    #[serde(alias = "root_ca_crt")]
    pub root_ca: String,
    /// PEM file with the client certificate chain.
    #[serde(alias = "client_crt")]
    pub client_cert: String,
    /// PEM file with the client private key.
    pub client_key: String,
    /// Decrypts `client_key` when it is an encrypted PKCS#8 key.
    pub passphrase: String,
    /// Skip server certificate verification.
    #[serde(alias = "is_insecure")]
    pub insecure: bool,
}

/// Validate that `bundle` is present and names every required file.
pub fn check(bundle: Option<&TlsBundle>) -> Result<&TlsBundle, Error> {
    let Some(bundle) = bundle else {
        return Err(Error::config("TLS block must be defined"));
    };

    if !bundle.insecure {
        for (name, path) in [
            ("root_ca", &bundle.root_ca),
            ("client_cert", &bundle.client_cert),
            ("client_key", &bundle.client_key),
        ] {
            if path.is_empty() {
                return Err(Error::config(format!("TLS file {name} must be defined")));
            }
        }
    }

    Ok(bundle)
}

/// Build a client configuration from `bundle`.
///
/// Every file is loaded here, once. A missing or malformed file is a configuration error.
pub fn build_client_config(bundle: Option<&TlsBundle>) -> Result<Arc<ClientConfig>, Error> {
    let bundle = check(bundle)?;
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|err| Error::config("failed to configure TLS versions").with_source(err))?;

    let builder = if bundle.insecure {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(InsecureVerifier { provider }))
    } else {
        let mut roots = RootCertStore::empty();
        for cert in load_certs(&bundle.root_ca)? {
            roots.add(cert).map_err(|err| {
                Error::config("failed to add root certificate")
                    .with_context("path", &bundle.root_ca)
                    .with_source(err)
            })?;
        }
        builder.with_root_certificates(roots)
    };

    let config = if bundle.client_cert.is_empty() || bundle.client_key.is_empty() {
        builder.with_no_client_auth()
    } else {
        let certs = load_certs(&bundle.client_cert)?;
        let key = load_key(&bundle.client_key, &bundle.passphrase)?;
        builder
            .with_client_auth_cert(certs, key)
            .map_err(|err| Error::config("invalid TLS client certificate").with_source(err))?
    };

    Ok(Arc::new(config))
}

/// The name the server certificate is checked against.
pub(crate) fn server_name(host: &str) -> Result<ServerName<'static>, Error> {
    ServerName::try_from(host.to_string()).map_err(|err| {
        Error::config("invalid TLS server name")
            .with_context("host", host)
            .with_source(err)
    })
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, Error> {
    let invalid = |reason: String| {
        Error::config("failed to load TLS certificates")
            .with_context("path", path)
            .with_context("reason", reason)
    };

    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|err| invalid(err.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| invalid(err.to_string()))?;
    if certs.is_empty() {
        return Err(invalid("no certificate found".to_string()));
    }
    Ok(certs)
}

fn load_key(path: &str, passphrase: &str) -> Result<PrivateKeyDer<'static>, Error> {
    let invalid = |reason: String| {
        Error::config("failed to load TLS client key")
            .with_context("path", path)
            .with_context("reason", reason)
    };

    if passphrase.is_empty() {
        return PrivateKeyDer::from_pem_file(path).map_err(|err| invalid(err.to_string()));
    }

    let pem = fs::read(path).map_err(|err| invalid(err.to_string()))?;
    let (label, der) =
        pkcs8::der::pem::decode_vec(&pem).map_err(|err| invalid(err.to_string()))?;
    if label != "ENCRYPTED PRIVATE KEY" {
        return Err(invalid(format!("expected an encrypted PKCS#8 key, got {label}")));
    }
    let info = pkcs8::EncryptedPrivateKeyInfo::try_from(der.as_slice())
        .map_err(|err| invalid(err.to_string()))?;
    let document = info
        .decrypt(passphrase)
        .map_err(|err| invalid(err.to_string()))?;
    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        document.as_bytes().to_vec(),
    )))
}

/// Accepts any server certificate; handshake signatures are still verified.
#[derive(Debug)]
struct InsecureVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InsecureVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
