//! Server certificate pinned on first contact

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rustls::pki_types::CertificateDer;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

const PEM_LINE_WIDTH: usize = 64;

/// DER encoded X.509 certificate
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self { der: der.into() }
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Encode as a single PEM `CERTIFICATE` block
    pub fn to_pem(&self) -> String {
        let encoded = BASE64.encode(&self.der);
        let mut pem = String::with_capacity(encoded.len() + encoded.len() / PEM_LINE_WIDTH + 64);
        pem.push_str("-----BEGIN CERTIFICATE-----\n");
        for line in encoded.as_bytes().chunks(PEM_LINE_WIDTH) {
            pem.push_str(&String::from_utf8_lossy(line));
            pem.push('\n');
        }
        pem.push_str("-----END CERTIFICATE-----\n");
        pem
    }

    /// Decode the first `CERTIFICATE` block of a PEM document
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let mut reader = pem;
        let der = rustls_pemfile::certs(&mut reader)
            .next()
            .ok_or_else(|| Error::InvalidCertificate("no certificate found in PEM data".to_string()))?
            .map_err(|e| Error::InvalidCertificate(e.to_string()))?;

        Ok(Self::from_der(der.as_ref()))
    }

    /// SHA-256 over the DER bytes, base64 encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.der);
        BASE64.encode(hasher.finalize())
    }

    pub(crate) fn to_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.der.clone())
    }
}
