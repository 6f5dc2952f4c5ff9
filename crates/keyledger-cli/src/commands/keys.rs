//! Keys command: the local key ring.
//!
//! Every key an identity has held lives under `<home>/keys` as
//! `<username>.<index>.key`, where `index` is the chain link the key signed.
//! A key generated for the next register or rotate waits as
//! `<username>.next.key` until the ledger accepts it.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use keyledger_core::KeyLink;
use keyledger_crypto::KeyPair;

use crate::theme::Theme;

/// On-disk key files for every local identity.
#[derive(Debug, Clone)]
pub(crate) struct KeyRing {
    dir: PathBuf,
}

impl KeyRing {
    /// Key ring rooted at `<home>/keys`.
    pub(crate) fn new(home: &Path) -> Self {
        Self {
            dir: home.join("keys"),
        }
    }

    fn link_path(&self, username: &str, index: u32) -> PathBuf {
        self.dir.join(format!("{username}.{index}.key"))
    }

    /// Path of the key waiting to be bound.
    pub(crate) fn pending_path(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{username}.next.key"))
    }

    /// The pending key, generated on first use.
    pub(crate) fn pending(&self, username: &str) -> anyhow::Result<KeyPair> {
        Ok(KeyPair::load_or_generate(self.pending_path(username))?)
    }

    /// Mark the pending key as the one that signed link `index`.
    pub(crate) fn commit_pending(&self, username: &str, index: u32) -> anyhow::Result<()> {
        let to = self.link_path(username, index);
        std::fs::rename(self.pending_path(username), &to)
            .with_context(|| format!("moving pending key to {}", to.display()))
    }

    /// Key that owns `link`, checked against the link's public key.
    pub(crate) fn owner_of(&self, username: &str, link: &KeyLink) -> anyhow::Result<KeyPair> {
        let path = self.link_path(username, link.index());
        if !path.exists() {
            bail!(
                "no local key for {username} link {} (expected {})",
                link.index(),
                path.display()
            );
        }
        let key = KeyPair::load_or_generate(&path)?;
        if key.export_public_key() != *link.owner() {
            bail!("{} does not hold the key for {username} link {}", path.display(), link.index());
        }
        Ok(key)
    }
}

/// Show or create the pending key for `username`.
pub(crate) fn generate_key(ring: &KeyRing, username: &str, force: bool) -> anyhow::Result<()> {
    let path = ring.pending_path(username);
    if path.exists() {
        if !force {
            println!("{}", Theme::info("A pending key already exists; use --force to replace it."));
        } else {
            println!("{}", Theme::warning("Replacing the pending key."));
            std::fs::remove_file(&path)?;
        }
    }

    let key = ring.pending(username)?;
    println!("\n{}", Theme::header("Pending key"));
    println!("  {}", Theme::kv("Username", username));
    println!("  {}", Theme::kv("Public key", &key.export_public_key().to_hex()));
    println!("  {}", Theme::kv("Key file", &path.display().to_string()));
    println!();
    Ok(())
}
