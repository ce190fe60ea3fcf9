//! Centralized protocol constants
//!
//! All protocol-level constants are defined here to ensure consistency
//! between the join handshake, the TCP bridge and the CLI.

use std::time::Duration;

/// Dedicated pcopy port, tried before the standard HTTPS port
pub const DEFAULT_PORT: u16 = 2586;

/// Port of the raw TCP bridge (`nc <host> 9999`)
pub const DEFAULT_BRIDGE_PORT: u16 = 9999;

/// Local alias used when no clipboard name is given
pub const DEFAULT_CLIPBOARD: &str = "default";

/// Environment variable carrying a pre-encoded key (skips password prompt and verification)
pub const ENV_KEY: &str = "PCOPY_KEY";

/// Metadata endpoint queried during discovery
pub const INFO_PATH: &str = "/info";

/// Endpoint used to check a derived key against the server
pub const VERIFY_PATH: &str = "/verify";

/// Help text endpoint served to raw TCP clients that send `help`
pub const HELP_PATH: &str = "/nc";

/// Header telling the upstream handler not to redirect (browser-only behaviour).
/// Lowercase so it can be used with `HeaderName::from_static`.
pub const HEADER_NO_REDIRECT: &str = "x-no-redirect";

/// Per-address timeout for discovery and verification requests
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of bytes inspected before classifying a raw connection
pub const BRIDGE_BUFFER_SIZE: usize = 16 * 1024;

/// Silence after which a raw client is considered done sending
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Capacity of the in-memory pipe feeding the upstream request body
pub const BODY_PIPE_CAPACITY: usize = 64 * 1024;

/// First-line prefix selecting the target path on the raw TCP protocol
pub const LINE_PREFIX: &str = "pcopy:";

/// Literal command requesting help text on the raw TCP protocol
pub const HELP_COMMAND: &str = "help";

/// Key derivation parameters (PBKDF2-HMAC-SHA256)
pub const KEY_LEN_BYTES: usize = 32;
pub const KEY_DERIVATION_ITERATIONS: u32 = 10_000;

/// Authorization header scheme for HMAC-signed requests
pub const HMAC_AUTH_SCHEME: &str = "HMAC";
