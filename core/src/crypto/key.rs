//! Symmetric clipboard key: derivation, encoding and request signing

use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::protocol::constants::{HMAC_AUTH_SCHEME, KEY_DERIVATION_ITERATIONS, KEY_LEN_BYTES};
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Shared secret of a password protected clipboard, together with the salt it was derived with
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    bytes: Vec<u8>,
    salt: Vec<u8>,
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key")
            .field("salt", &BASE64.encode(&self.salt))
            .finish_non_exhaustive()
    }
}

impl Key {
    /// Derive a key from a password and the server's salt.
    ///
    /// Deterministic: the same password and salt always yield the same bytes.
    pub fn derive(password: &[u8], salt: &[u8]) -> Self {
        let mut bytes = vec![0u8; KEY_LEN_BYTES];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, KEY_DERIVATION_ITERATIONS, &mut bytes);
        Self {
            bytes,
            salt: salt.to_vec(),
        }
    }

    pub fn from_parts(bytes: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { bytes, salt }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Encode as `base64(salt):base64(key)`, the format used in config files and `PCOPY_KEY`
    pub fn encode(&self) -> String {
        format!("{}:{}", BASE64.encode(&self.salt), BASE64.encode(&self.bytes))
    }

    /// Decode a key previously produced by [`Key::encode`]
    pub fn decode(encoded: &str) -> Result<Self> {
        let mut parts = encoded.trim().split(':');
        let (salt, bytes) = match (parts.next(), parts.next(), parts.next()) {
            (Some(salt), Some(bytes), None) => (salt, bytes),
            _ => return Err(Error::InvalidKey("expected <salt>:<key>".to_string())),
        };

        let salt = BASE64
            .decode(salt)
            .map_err(|e| Error::InvalidKey(format!("bad salt encoding: {e}")))?;
        let bytes = BASE64
            .decode(bytes)
            .map_err(|e| Error::InvalidKey(format!("bad key encoding: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::InvalidKey("empty key".to_string()));
        }

        Ok(Self { bytes, salt })
    }

    /// Build an `Authorization` header value authenticating `method path` with this key
    pub fn auth_header(&self, method: &str, path: &str, ttl: Duration) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Crypto(e.to_string()))?
            .as_secs();
        self.auth_header_at(timestamp, method, path, ttl)
    }

    fn auth_header_at(&self, timestamp: u64, method: &str, path: &str, ttl: Duration) -> Result<String> {
        let ttl = ttl.as_secs();
        let mut mac = HmacSha256::new_from_slice(&self.bytes).map_err(|e| Error::Crypto(e.to_string()))?;
        mac.update(format!("{timestamp}:{ttl}:{method}:{path}").as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{HMAC_AUTH_SCHEME} {timestamp} {ttl} {}",
            BASE64.encode(signature)
        ))
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    fn random_salt() -> Vec<u8> {
        let mut salt = vec![0u8; 10];
        rand::thread_rng().fill_bytes(&mut salt);
        salt
    }

    #[test]
    fn test_derive_is_deterministic() {
        let salt = random_salt();
        let key1 = Key::derive(b"secret password", &salt);
        let key2 = Key::derive(b"secret password", &salt);
        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.as_bytes().len(), KEY_LEN_BYTES);
    }

    #[test]
    fn test_derive_depends_on_salt_and_password() {
        let salt = random_salt();
        let base = Key::derive(b"secret password", &salt);
        assert_ne!(base.as_bytes(), Key::derive(b"secret password", &random_salt()).as_bytes());
        assert_ne!(base.as_bytes(), Key::derive(b"other password", &salt).as_bytes());
    }

    #[test]
    fn test_derive_known_vector() {
        // PBKDF2-HMAC-SHA256("password", "salt", 10000, 32)
        let key = Key::derive(b"password", b"salt");
        let expected = "XsArkaS1nG9Z3V++TKZJ7OT6hWjNuLo2z0FCbogFUis=";
        assert_eq!(BASE64.encode(key.as_bytes()), expected);
    }

    #[test]
    fn test_encode_decode() {
        let key = Key::derive(b"pw", b"some salt");
        let encoded = key.encode();
        assert!(encoded.starts_with("c29tZSBzYWx0:"));

        let decoded: Key = encoded.parse().unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(Key::decode("no-separator").is_err());
        assert!(Key::decode("a:b:c").is_err());
        assert!(Key::decode("c2FsdA==:!!!").is_err());
        assert!(Key::decode("c2FsdA==:").is_err());
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = Key::from_parts(vec![0xAB; 32], b"salt".to_vec());
        let debug = format!("{key:?}");
        assert!(!debug.contains("171"));
        assert!(debug.contains("c2FsdA=="));
    }

    #[test]
    fn test_auth_header_format() {
        let key = Key::from_parts(b"key".to_vec(), Vec::new());
        let header = key
            .auth_header_at(1_600_000_000, "GET", "/verify", Duration::ZERO)
            .unwrap();

        let parts: Vec<&str> = header.split(' ').collect();
        assert_eq!(parts[..3], ["HMAC", "1600000000", "0"]);

        let mut mac = HmacSha256::new_from_slice(b"key").unwrap();
        mac.update(b"1600000000:0:GET:/verify");
        assert_eq!(parts[3], BASE64.encode(mac.finalize().into_bytes()));
    }
}
