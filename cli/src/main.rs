//! pcopy CLI - join a remote shared clipboard.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcopy")]
#[command(about = "Copy/paste across machines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a remote clipboard
    #[command(visible_alias = "add")]
    Join {
        /// Server address, e.g. pcopy.example.com or https://host:2586
        server: String,

        /// Local alias for the clipboard (default is 'default')
        clipboard: Option<String>,

        /// Overwrite config if it already exists
        #[arg(short, long, conflicts_with = "auto")]
        force: bool,

        /// Automatically choose clipboard alias
        #[arg(short, long)]
        auto: bool,

        /// Do not print instructions
        #[arg(short, long)]
        quiet: bool,
    },
    /// Show a joined clipboard's config
    Info {
        /// Clipboard alias
        #[arg(default_value = pcopy_core::protocol::constants::DEFAULT_CLIPBOARD)]
        clipboard: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pcopy=warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Join {
            server,
            clipboard,
            force,
            auto,
            quiet,
        } => {
            let options = commands::JoinOptions {
                server,
                clipboard,
                force,
                auto,
                quiet,
            };
            commands::join_clipboard(options).await?
        }
        Commands::Info { clipboard } => commands::show_info(&clipboard)?,
    }

    Ok(())
}
