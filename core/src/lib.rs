//! pcopy core - network onboarding and transport bridging for a shared clipboard
//!
//! Two independent halves live here:
//!
//! - joining a remote clipboard: address guessing, a concurrent race for
//!   server metadata, password-based key derivation, verification and
//!   certificate pinning ([`join`], [`discovery`], [`crypto`])
//! - serving a raw TCP port by translating each connection into an
//!   in-process HTTP request against the clipboard's handler ([`bridge`])

pub mod bridge;
pub mod clipboard;
pub mod crypto;
pub mod discovery;
pub mod join;
pub mod protocol;

mod error;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Client-side configuration of one joined clipboard.
///
/// A config without a key belongs to an unauthenticated clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Canonical address as reported by the server
    pub server_addr: String,
    /// Symmetric key, absent when the clipboard is unsecured
    #[serde(default, with = "crypto::serde_utils::encoded_key", skip_serializing_if = "Option::is_none")]
    pub key: Option<crypto::Key>,
}

impl Config {
    pub fn new(server_addr: impl Into<String>, key: Option<crypto::Key>) -> Self {
        Self {
            server_addr: server_addr.into(),
            key,
        }
    }
}

// Re-export key types for convenience
pub use bridge::{BridgeConfig, BridgeHandle, RouterUpstream, TcpBridge, Upstream, UpstreamRequest, UpstreamResponse};
pub use clipboard::ConfigStore;
pub use crypto::{Certificate, Key};
pub use discovery::{ServerInfo, ServerProbe};
pub use join::{JoinOutcome, JoinRequest, PasswordSource};
