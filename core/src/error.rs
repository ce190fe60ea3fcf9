use thiserror::Error;

/// pcopy error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("Failed to serialize/deserialize: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("TLS error: {0}")]
    Tls(String),

    /// Every candidate address failed; the message lists each one.
    #[error("failed.\n{message}")]
    Discovery { message: String },

    #[error("failed to join clipboard: {0}")]
    Verification(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("config file {} exists, you may want to specify a different clipboard name, or use --force to override", .0.display())]
    ConfigExists(std::path::PathBuf),

    /// Unexpected HTTP status, e.g. "413 Payload Too Large"
    #[error("{0}")]
    Status(String),

    #[error("{0}")]
    Bridge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
