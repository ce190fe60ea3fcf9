//! Joining a remote clipboard
//!
//! The raw address is expanded into candidates which are all queried
//! concurrently; the first server to answer wins and stragglers are ignored.
//! A password protected clipboard then needs a key, taken either from a
//! pre-encoded override (trusted as-is) or derived from a password and
//! verified against the server.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::crypto::Key;
use crate::discovery::{expand_candidates, HttpProbe, ServerInfo, ServerProbe};
use crate::protocol::constants::{DEFAULT_CLIPBOARD, ENV_KEY};
use crate::{Config, Error, Result};

/// Supplies the clipboard password when the server requires one.
///
/// Interactive prompts block; implementations should move that work off the
/// async runtime. Plain closures are accepted for non-interactive sources.
#[async_trait]
pub trait PasswordSource: Send + Sync {
    async fn read_password(&self) -> Result<Vec<u8>>;
}

#[async_trait]
impl<F> PasswordSource for F
where
    F: Fn() -> Result<Vec<u8>> + Send + Sync,
{
    async fn read_password(&self) -> Result<Vec<u8>> {
        self()
    }
}

/// What to join and under which local name
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub raw_addr: String,
    pub clipboard: String,
    /// Pre-encoded key, bypasses the password prompt and verification
    pub env_key: Option<String>,
}

impl JoinRequest {
    pub fn new(raw_addr: impl Into<String>) -> Self {
        Self {
            raw_addr: raw_addr.into(),
            clipboard: DEFAULT_CLIPBOARD.to_string(),
            env_key: None,
        }
    }

    pub fn with_clipboard(mut self, clipboard: impl Into<String>) -> Self {
        self.clipboard = clipboard.into();
        self
    }

    pub fn with_env_key(mut self, env_key: Option<String>) -> Self {
        self.env_key = env_key.filter(|key| !key.trim().is_empty());
        self
    }

    /// Pick up the key override from `PCOPY_KEY`
    pub fn with_key_from_env(self) -> Self {
        self.with_env_key(std::env::var(ENV_KEY).ok())
    }
}

/// Result of a successful join, ready to be persisted
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub clipboard: String,
    pub config: Config,
    pub info: ServerInfo,
}

struct ProbeResult {
    addr: String,
    result: Result<ServerInfo>,
}

/// Join orchestrator
#[derive(Clone)]
pub struct Joiner {
    probe: Arc<dyn ServerProbe>,
}

impl Joiner {
    pub fn new(probe: Arc<dyn ServerProbe>) -> Self {
        Self { probe }
    }

    /// Orchestrator backed by real HTTP(S) requests
    pub fn http() -> Self {
        Self::new(Arc::new(HttpProbe::new()))
    }

    /// Discover the server, resolve the key if one is required and build the config.
    ///
    /// Does not check for or write config files.
    pub async fn join(&self, request: &JoinRequest, passwords: &dyn PasswordSource) -> Result<JoinOutcome> {
        let info = self.read_server_info(&request.raw_addr).await?;

        let key = match &info.salt {
            Some(salt) => Some(self.resolve_key(request, &info, salt, passwords).await?),
            None => None,
        };

        tracing::info!(
            "joined clipboard '{}' at {} (secured: {}, pinned cert: {})",
            request.clipboard,
            info.server_addr,
            key.is_some(),
            info.cert.is_some()
        );

        Ok(JoinOutcome {
            clipboard: request.clipboard.clone(),
            config: Config::new(info.server_addr.clone(), key),
            info,
        })
    }

    /// Query every candidate address in parallel and return the first success.
    pub async fn read_server_info(&self, raw_addr: &str) -> Result<ServerInfo> {
        let candidates = expand_candidates(raw_addr);

        // Buffered for every candidate so losers never block on a dropped receiver
        let (tx, mut rx) = mpsc::channel(candidates.len().max(1));
        for addr in &candidates {
            let tx = tx.clone();
            let probe = self.probe.clone();
            let addr = addr.clone();
            tokio::spawn(async move {
                let result = probe.server_info(&addr).await;
                let _ = tx.send(ProbeResult { addr, result }).await;
            });
        }
        drop(tx);

        let mut failures = Vec::with_capacity(candidates.len());
        while let Some(ProbeResult { addr, result }) = rx.recv().await {
            match result {
                Ok(info) => {
                    tracing::debug!("{} answered first", addr);
                    return Ok(info);
                }
                Err(e) => {
                    tracing::debug!("{} failed: {}", addr, e);
                    failures.push((addr, e));
                }
            }
        }

        Err(Error::Discovery {
            message: describe_failures(&failures),
        })
    }

    async fn resolve_key(
        &self,
        request: &JoinRequest,
        info: &ServerInfo,
        salt: &[u8],
        passwords: &dyn PasswordSource,
    ) -> Result<Key> {
        if let Some(encoded) = &request.env_key {
            tracing::debug!("using key from {}", ENV_KEY);
            return Key::decode(encoded);
        }

        let password = passwords.read_password().await?;
        let key = Key::derive(&password, salt);
        self.probe
            .verify(&info.server_addr, info.cert.as_ref(), &key)
            .await
            .map_err(|e| Error::Verification(e.to_string()))?;

        Ok(key)
    }
}

/// Join using the HTTP(S) discovery client
pub async fn join(request: &JoinRequest, passwords: &dyn PasswordSource) -> Result<JoinOutcome> {
    Joiner::http().join(request, passwords).await
}

fn describe_failures(failures: &[(String, Error)]) -> String {
    match failures {
        [(addr, err)] => format!("Cannot connect to {addr}: {err}"),
        _ => {
            let lines: Vec<String> = failures
                .iter()
                .map(|(addr, err)| format!("- {addr}: {err}"))
                .collect();
            format!("Cannot connect to any of the servers we tried:\n{}", lines.join("\n"))
        }
    }
}
