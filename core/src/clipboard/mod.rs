//! On-disk store for joined clipboards
//!
//! Each clipboard has a TOML config file `<name>.conf` and, when its server
//! uses a self-signed certificate, the pinned PEM certificate `<name>.crt`
//! next to it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::crypto::Certificate;
use crate::join::JoinOutcome;
use crate::protocol::constants::DEFAULT_CLIPBOARD;
use crate::{Config, Error, Result};

const CONFIG_SUFFIX: &str = "conf";
const CERT_SUFFIX: &str = "crt";

/// Directory of clipboard configs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform config dir, e.g. `~/.config/pcopy` on Linux
    pub fn default_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("pcopy"))
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))
    }

    pub fn config_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{CONFIG_SUFFIX}"))
    }

    pub fn cert_file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{CERT_SUFFIX}"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.config_file(name).exists()
    }

    pub fn write_config(&self, name: &str, config: &Config) -> Result<PathBuf> {
        let text = toml::to_string(config)
            .map_err(|e| Error::Config(format!("cannot serialize config: {e}")))?;
        let path = self.config_file(name);
        self.write_private(&path, text.as_bytes())?;
        Ok(path)
    }

    pub fn read_config(&self, name: &str) -> Result<Config> {
        let path = self.config_file(name);
        let text = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn write_cert(&self, name: &str, cert: &Certificate) -> Result<PathBuf> {
        let path = self.cert_file(name);
        self.write_private(&path, cert.to_pem().as_bytes())?;
        Ok(path)
    }

    /// Pinned certificate, or `None` if the clipboard has none
    pub fn read_cert(&self, name: &str) -> Result<Option<Certificate>> {
        let path = self.cert_file(name);
        match fs::read(&path) {
            Ok(pem) => Certificate::from_pem(&pem).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Write the config (and pinned cert, if any) of a successful join.
    ///
    /// Returns the config file path. An existing config is only replaced
    /// when `force` is set.
    pub fn persist(&self, outcome: &JoinOutcome, force: bool) -> Result<PathBuf> {
        let name = outcome.clipboard.as_str();
        let config_file = self.config_file(name);
        if !force && config_file.exists() {
            return Err(Error::ConfigExists(config_file));
        }

        let written = self.write_config(name, &outcome.config)?;
        match &outcome.info.cert {
            Some(cert) => {
                self.write_cert(name, cert)?;
            }
            None => {
                // A cert left over from a forced rejoin would pin the wrong server
                let cert_file = self.cert_file(name);
                match fs::remove_file(&cert_file) {
                    Ok(()) => tracing::debug!("removed stale certificate {}", cert_file.display()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(io_error(&cert_file, e)),
                }
            }
        }

        tracing::debug!("clipboard {} saved to {}", name, written.display());
        Ok(written)
    }

    /// First unused clipboard name for `server`: `default`, then the first
    /// host label (`nopaste` for `nopaste.net`), then `nopaste2`, `nopaste3`, ...
    pub fn suggest_alias(&self, server: &str) -> String {
        if !self.exists(DEFAULT_CLIPBOARD) {
            return DEFAULT_CLIPBOARD.to_string();
        }

        let label = host_label(server);
        if !self.exists(&label) {
            return label;
        }
        let mut n = 2u32;
        loop {
            let name = format!("{label}{n}");
            if !self.exists(&name) {
                return name;
            }
            n += 1;
        }
    }

    fn write_private(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        fs::write(path, contents).map_err(|e| io_error(path, e))?;
        set_permission_0600(path).map_err(|e| io_error(path, e))
    }
}

fn host_label(server: &str) -> String {
    let without_scheme = server.split_once("://").map_or(server, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    match host.split('.').next() {
        Some(label) if !label.is_empty() => label.to_lowercase(),
        _ => DEFAULT_CLIPBOARD.to_string(),
    }
}

fn io_error(path: &Path, e: io::Error) -> Error {
    Error::Io(io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
}

#[cfg(unix)]
fn set_permission_0600(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_permission_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}
