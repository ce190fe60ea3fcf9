//! Server metadata message served at `/info`

use serde::{Deserialize, Serialize};

/// JSON body of the `/info` endpoint.
///
/// `salt` is present (and non-empty) iff the clipboard is password protected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub server_addr: String,
    #[serde(default, with = "crate::crypto::serde_utils::base64_opt", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
}

impl InfoResponse {
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_secured_server() {
        let info = InfoResponse::from_bytes(br#"{"serverAddr":"https://clip.example.com:2586","salt":"c2FsdHk="}"#).unwrap();
        assert_eq!(info.server_addr, "https://clip.example.com:2586");
        assert_eq!(info.salt.as_deref(), Some(&b"salty"[..]));
    }

    #[test]
    fn test_missing_or_empty_salt_means_unsecured() {
        let missing = InfoResponse::from_bytes(br#"{"serverAddr":"https://a"}"#).unwrap();
        assert!(missing.salt.is_none());

        let empty = InfoResponse::from_bytes(br#"{"serverAddr":"https://a","salt":""}"#).unwrap();
        assert!(empty.salt.is_none());
    }

    #[test]
    fn test_unsecured_server_omits_salt() {
        let info = InfoResponse {
            server_addr: "https://a".to_string(),
            salt: None,
        };
        let json = String::from_utf8(info.to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"serverAddr":"https://a"}"#);
    }
}
