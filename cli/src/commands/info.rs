//! Info command implementation.

use pcopy_core::ConfigStore;

use crate::ui::collapse_home;

/// Display a joined clipboard's config.
pub fn show_info(clipboard: &str) -> anyhow::Result<()> {
    let store = ConfigStore::new(ConfigStore::default_dir()?);
    let config = store.read_config(clipboard)?;
    let cert = store.read_cert(clipboard)?;

    println!("\n\x1b[1mClipboard '{}'\x1b[0m", clipboard);
    println!("═══════════════════════════════════════");
    println!("\x1b[1mServer:\x1b[0m      {}", config.server_addr);
    println!("\x1b[1mConfig:\x1b[0m      {}", collapse_home(&store.config_file(clipboard)));
    println!(
        "\x1b[1mSecured:\x1b[0m     {}",
        if config.key.is_some() { "yes" } else { "no" }
    );
    match cert {
        Some(cert) => println!("\x1b[1mPinned cert:\x1b[0m {}", cert.fingerprint()),
        None => println!("\x1b[1mPinned cert:\x1b[0m none"),
    }
    println!();

    Ok(())
}
