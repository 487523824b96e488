mod shell;

use anyhow::{bail, Context, Result};
use auravault_core::{
    platform::{get_default_config_path, get_default_store_path},
    JsonFileStore, RecordStore, VaultConfig, VaultSession,
};
use clap::{Parser, Subcommand};
use rpassword::prompt_password;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

/// AuraVault CLI - a zero-knowledge secret vault
#[derive(Parser)]
#[command(name = "auravault", version)]
#[command(about = "Client-held, passphrase-encrypted secret vault", long_about = None)]
struct Cli {
    /// Record store file (defaults to the platform data directory)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new secret
    Add {
        /// Title for the secret (stored unencrypted)
        #[arg(long)]
        title: String,

        /// Secret content (will prompt if not provided)
        #[arg(long)]
        content: Option<String>,
    },

    /// List secret titles without unlocking
    List,

    /// Unlock and print all secrets
    Reveal,

    /// Change the vault passphrase
    Rotate,

    /// Interactive session with inactivity auto-lock
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config_path = cli.config.unwrap_or_else(get_default_config_path);
    let config = VaultConfig::load_or_default(&config_path)?;

    let store = JsonFileStore::new(cli.store.unwrap_or_else(get_default_store_path));
    info!("Using record store at {:?}", store.path());

    let mut session = VaultSession::new(store, &config);

    match cli.command {
        Commands::Add { title, content } => {
            unlock(&mut session)?;
            let content = match content {
                Some(content) => Zeroizing::new(content),
                None => prompt_secret("Secret content: ")?,
            };
            let added = session.add_secret(&title, &content)?;
            session.lock();
            println!("Added secret '{}' ({})", added.title, added.id);
        }
        Commands::List => {
            let summaries = session.list_records()?;
            if summaries.is_empty() {
                println!("Vault is empty");
            }
            for summary in summaries {
                println!(
                    "{}  {}  (updated {})",
                    summary.id,
                    summary.title,
                    summary.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Commands::Reveal => {
            unlock(&mut session)?;
            for record in session.decrypted_records() {
                println!("{}: {}", record.title, record.content);
            }
            session.lock();
        }
        Commands::Rotate => {
            let old = prompt_secret("Current passphrase: ")?;
            let new = prompt_secret("New passphrase: ")?;
            let confirm = prompt_secret("Confirm new passphrase: ")?;
            if *new != *confirm {
                bail!("New passphrases do not match.");
            }
            session.rotate_passphrase(&old, &new)?;
            println!("Passphrase changed.");
        }
        Commands::Session => {
            shell::run(session, config.auto_lock_timeout()).await?;
        }
    }

    Ok(())
}

fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let secret = prompt_password(prompt).context("failed to read from terminal")?;
    Ok(Zeroizing::new(secret))
}

fn unlock<S: RecordStore>(session: &mut VaultSession<S>) -> Result<()> {
    let passphrase = prompt_secret("Vault passphrase: ")?;
    session.unlock(&passphrase)?;
    Ok(())
}
