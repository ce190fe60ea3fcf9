//! HTTP(S) discovery client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use rustls::ClientConfig;

use super::{tls, ServerInfo, ServerProbe};
use crate::crypto::{Certificate, Key};
use crate::protocol::constants::{DISCOVERY_TIMEOUT, INFO_PATH, VERIFY_PATH};
use crate::protocol::InfoResponse;
use crate::{Error, Result};

/// [`ServerProbe`] talking to a real clipboard server
#[derive(Debug, Clone)]
pub struct HttpProbe {
    timeout: Duration,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            timeout: DISCOVERY_TIMEOUT,
        }
    }

    fn client(&self, tls: ClientConfig) -> Result<Client> {
        Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Network(error_chain(&e)))
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerProbe for HttpProbe {
    async fn server_info(&self, addr: &str) -> Result<ServerInfo> {
        let (tls, untrusted) = tls::capturing_config()?;
        let client = self.client(tls)?;
        let url = format!("{}{}", addr.trim_end_matches('/'), INFO_PATH);
        tracing::debug!("querying server info at {}", url);

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(error_chain(&e)))?;
        if response.status() != StatusCode::OK {
            return Err(Error::Status(response.status().to_string()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(error_chain(&e)))?;
        let info = InfoResponse::from_bytes(&body)?;

        let cert = untrusted.lock().ok().and_then(|mut slot| slot.take());
        let server_addr = if info.server_addr.is_empty() {
            addr.to_string()
        } else {
            info.server_addr
        };

        Ok(ServerInfo {
            server_addr,
            salt: info.salt,
            cert,
        })
    }

    async fn verify(&self, server_addr: &str, cert: Option<&Certificate>, key: &Key) -> Result<()> {
        let tls = match cert {
            Some(cert) => tls::pinned_config(cert)?,
            None => tls::verified_config()?,
        };
        let client = self.client(tls)?;
        let url = format!("{}{}", server_addr.trim_end_matches('/'), VERIFY_PATH);
        let authorization = key.auth_header("GET", VERIFY_PATH, Duration::ZERO)?;

        let response = client
            .get(&url)
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| Error::Network(error_chain(&e)))?;
        if response.status() != StatusCode::OK {
            return Err(Error::Status(response.status().to_string()));
        }
        Ok(())
    }
}

// reqwest hides the interesting part (refused, TLS, timeout) in the source chain
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
