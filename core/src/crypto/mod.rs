//! Cryptographic primitives for joining a clipboard
//!
//! - PBKDF2-HMAC-SHA256 for password based key derivation
//! - HMAC-SHA256 for request authorization
//! - PEM/DER codec for pinned server certificates

mod cert;
mod key;
pub mod serde_utils;

pub use cert::Certificate;
pub use key::Key;
