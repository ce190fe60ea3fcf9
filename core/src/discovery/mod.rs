//! Locating a clipboard server and checking a derived key against it
//!
//! - [`expand_candidates`] turns user input into candidate base URLs
//! - [`HttpProbe`] queries `/info` and `/verify` over HTTP(S)
//! - TLS verifiers capture self-signed certificates on first contact and
//!   enforce the pinned certificate afterwards

mod address;
mod client;
mod tls;

use async_trait::async_trait;

use crate::crypto::{Certificate, Key};
use crate::Result;

pub use address::expand_candidates;
pub use client::HttpProbe;

/// Metadata reported by a clipboard server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Canonical address the server wants clients to use
    pub server_addr: String,
    /// Present iff the clipboard is password protected
    pub salt: Option<Vec<u8>>,
    /// Present iff the server certificate did not verify against the trusted roots
    pub cert: Option<Certificate>,
}

impl ServerInfo {
    pub fn requires_password(&self) -> bool {
        self.salt.is_some()
    }
}

/// Network operations the join handshake needs from a server
#[async_trait]
pub trait ServerProbe: Send + Sync {
    /// Query one candidate address for its metadata. No retries.
    async fn server_info(&self, addr: &str) -> Result<ServerInfo>;

    /// Succeeds iff `key` is accepted by the server at `server_addr`.
    ///
    /// With `cert` set, the TLS peer must present exactly that certificate.
    async fn verify(&self, server_addr: &str, cert: Option<&Certificate>, key: &Key) -> Result<()>;
}
