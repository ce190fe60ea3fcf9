//! Join command implementation.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::bail;
use async_trait::async_trait;
use pcopy_core::join::Joiner;
use pcopy_core::protocol::constants::DEFAULT_CLIPBOARD;
use pcopy_core::{ConfigStore, Error, JoinRequest, PasswordSource};

use crate::ui::print_instructions;

/// Arguments of `pcopy join`
pub struct JoinOptions {
    pub server: String,
    pub clipboard: Option<String>,
    pub force: bool,
    pub auto: bool,
    pub quiet: bool,
}

/// Join a remote clipboard and write its config.
pub async fn join_clipboard(options: JoinOptions) -> anyhow::Result<()> {
    if options.force && options.auto {
        bail!("cannot use both --auto and --force");
    }

    let store = ConfigStore::new(ConfigStore::default_dir()?);
    let clipboard = match options.clipboard {
        Some(clipboard) => clipboard,
        None if options.auto => store.suggest_alias(&options.server),
        None => DEFAULT_CLIPBOARD.to_string(),
    };

    // Fail before touching the network if we could not write the result anyway
    let config_file = store.config_file(&clipboard);
    if store.exists(&clipboard) && !options.force {
        return Err(Error::ConfigExists(config_file).into());
    }

    eprint!("Joining clipboard at {} ... ", options.server);
    io::stderr().flush()?;

    let request = JoinRequest::new(&options.server)
        .with_clipboard(&clipboard)
        .with_key_from_env();
    let outcome = Joiner::http().join(&request, &TerminalPassword).await?;
    let config_file = store.persist(&outcome, options.force)?;

    if options.quiet {
        eprintln!();
    } else {
        print_instructions(&config_file, &clipboard, outcome.info.cert.is_some());
    }

    Ok(())
}

/// Prompts on stderr; no echo when stdin is a terminal
struct TerminalPassword;

#[async_trait]
impl PasswordSource for TerminalPassword {
    async fn read_password(&self) -> pcopy_core::Result<Vec<u8>> {
        tokio::task::spawn_blocking(prompt_password)
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))?
    }
}

fn prompt_password() -> pcopy_core::Result<Vec<u8>> {
    eprint!("\r{}\rEnter password to join clipboard: ", " ".repeat(50));
    io::stderr().flush()?;

    let password = if io::stdin().is_terminal() {
        rpassword::read_password()?
    } else {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };
    eprint!("\r");

    Ok(password.into_bytes())
}
