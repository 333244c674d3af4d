//! Keys command - manage authorized keys offline

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use hearth_core::remote::{KeyStore, MetadataTransport, RemoteAccessRegistry, decode_key_data};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Arguments for the keys command
#[derive(Args)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// List authorized keys
    #[command(alias = "ls")]
    List,

    /// Authorize a key
    Add {
        /// Base64-encoded key material
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        key: Option<String>,

        /// Read the key from a file (e.g. an OpenSSH .pub file)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Label for the key
        #[arg(long)]
        comment: Option<String>,
    },

    /// Revoke a key by id
    #[command(alias = "rm")]
    Remove {
        /// Key id
        id: Uuid,
    },
}

/// Run keys subcommand
pub async fn keys(args: KeysArgs, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let store = config
        .ssh
        .keys_path
        .clone()
        .map(KeyStore::new)
        .unwrap_or_else(KeyStore::at_default_path);
    let path = store.path().to_path_buf();
    let registry = RemoteAccessRegistry::load(store, Box::new(MetadataTransport))
        .with_context(|| format!("Failed to load keys from {}", path.display()))?;

    match args.command {
        KeysCommand::List => {
            let keys = registry.list_authorized_keys();
            if keys.is_empty() {
                println!("No authorized keys in {}", path.display());
                return Ok(());
            }

            println!("{:<38} {:<22} {}", "ID", "Added", "Comment");
            println!("{}", "-".repeat(76));
            for key in keys {
                println!(
                    "{:<38} {:<22} {}",
                    key.id,
                    key.created_at.format("%Y-%m-%d %H:%M:%S"),
                    key.comment.as_deref().unwrap_or("-")
                );
            }
        }
        KeysCommand::Add { key, file, comment } => {
            let key_data = match (key, file) {
                (_, Some(file)) => std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
                    .trim()
                    .as_bytes()
                    .to_vec(),
                (Some(key), None) => decode_key_data(&key).context("Invalid key")?,
                (None, None) => bail!("Provide a key or --file"),
            };
            if key_data.is_empty() {
                bail!("Key must not be empty");
            }

            let key = registry
                .try_add_authorized_key(key_data, comment)
                .context("Failed to save authorized key")?;
            println!("Added key {}", key.id);
        }
        KeysCommand::Remove { id } => {
            if registry
                .try_remove_authorized_key(id)
                .context("Failed to save authorized keys")?
            {
                println!("Removed key {}", id);
            } else {
                bail!("Key {} not found", id);
            }
        }
    }

    Ok(())
}
