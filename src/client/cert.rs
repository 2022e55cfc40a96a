//! Server certificate retrieval

use base64::Engine as _;
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::common::{Error, Result};

/// A certificate presented by a Conjur endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCertificate {
    /// PEM encoding, ready to be written to disk
    pub pem: String,
    /// SHA-256 fingerprint as colon-separated hex pairs
    pub fingerprint: String,
}

impl ServerCertificate {
    pub fn from_der(der: &[u8]) -> Self {
        Self {
            pem: pem_encode(der),
            fingerprint: fingerprint(der),
        }
    }
}

/// Encode a DER certificate as PEM
pub fn pem_encode(der: &[u8]) -> String {
    let body = base64::engine::general_purpose::STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in body.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// SHA-256 fingerprint in the `AB:CD:...` form browsers show
pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

/// Connect to `url` and capture the peer certificate from the handshake
pub(crate) async fn fetch(
    url: &Url,
    allow_self_signed: bool,
    timeout: Duration,
) -> Result<ServerCertificate> {
    let host = match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        _ => return Err(Error::certificate(url.as_str(), "URL has no host")),
    };

    let client = reqwest::Client::builder()
        .tls_info(true)
        .danger_accept_invalid_certs(allow_self_signed)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::certificate(&host, e))?;

    tracing::debug!("Fetching certificate from {}", host);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::certificate(&host, e))?;

    let der = response
        .extensions()
        .get::<reqwest::tls::TlsInfo>()
        .and_then(|info| info.peer_certificate())
        .ok_or_else(|| Error::certificate(&host, "no certificate presented"))?;

    Ok(ServerCertificate::from_der(der))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pem_wraps_at_64_columns() {
        let der = vec![0xAB; 100];
        let pem = pem_encode(&der);
        let lines: Vec<&str> = pem.lines().collect();
        assert_eq!(lines.first(), Some(&"-----BEGIN CERTIFICATE-----"));
        assert_eq!(lines.last(), Some(&"-----END CERTIFICATE-----"));
        assert!(lines[1..lines.len() - 1].iter().all(|l| l.len() <= 64));
        assert_eq!(lines[1].len(), 64);
    }

    #[test]
    fn fingerprint_is_colon_separated_sha256() {
        let fp = fingerprint(b"abc");
        assert!(fp.starts_with("BA:78:16:BF"));
        assert_eq!(fp.split(':').count(), 32);
    }
}
