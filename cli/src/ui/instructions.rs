//! Post-join instructions.

use std::path::Path;

use pcopy_core::protocol::constants::DEFAULT_CLIPBOARD;

/// Print where the config went and how to use the clipboard.
pub fn print_instructions(config_file: &Path, clipboard: &str, cert_pinned: bool) {
    if clipboard == DEFAULT_CLIPBOARD {
        eprintln!(
            "\r\x1b[1;32m✓\x1b[0m Successfully joined clipboard, config written to {}",
            collapse_home(config_file)
        );
    } else {
        eprintln!(
            "\r\x1b[1;32m✓\x1b[0m Successfully joined clipboard as alias '{}', config written to {}",
            clipboard,
            collapse_home(config_file)
        );
    }

    if cert_pinned {
        eprintln!();
        eprintln!("\x1b[1;33mWarning:\x1b[0m The TLS certificate was self-signed and has been pinned.");
        eprintln!("Future communication will be secure, but joining could have been intercepted.");
    }

    let prefix = clipboard_prefix(clipboard);
    eprintln!();
    if Path::new("/usr/bin/pcp").exists() {
        eprintln!("You may now use 'pcp{prefix}' and 'ppaste{prefix}'. See 'pcopy -h' for usage details.");
    } else {
        eprintln!("You may now use 'pcopy copy{prefix}' and 'pcopy paste{prefix}'. See 'pcopy -h' for usage details.");
    }
}

fn clipboard_prefix(clipboard: &str) -> String {
    if clipboard == DEFAULT_CLIPBOARD {
        String::new()
    } else {
        format!(" {clipboard}:")
    }
}

/// Replace the home directory with `~`.
pub fn collapse_home(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            return Path::new("~").join(rest).display().to_string();
        }
    }
    path.display().to_string()
}
