//! Serde helpers for base64 fields and encoded keys

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serializer};

/// Serialize/deserialize an `Option<Vec<u8>>` as an optional base64 string.
/// An empty string deserializes to `None`.
///
/// Usage:
/// ```ignore
/// #[serde(default, with = "crate::crypto::serde_utils::base64_opt")]
/// pub salt: Option<Vec<u8>>,
/// ```
pub mod base64_opt {
    use super::*;

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Deserialize::deserialize(deserializer)?;
        match s.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => BASE64.decode(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Serialize/deserialize an `Option<Key>` in its `salt:key` string form.
pub mod encoded_key {
    use super::*;
    use crate::crypto::Key;

    pub fn serialize<S>(key: &Option<Key>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key {
            Some(key) => serializer.serialize_str(&key.encode()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Key>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: Option<String> = Deserialize::deserialize(deserializer)?;
        s.map(|s| Key::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
