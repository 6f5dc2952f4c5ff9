//! Read-only queries: chain, whois and users.

use std::path::Path;

use colored::Colorize;
use keyledger_core::{CoreNode, TofuCoreNode, TofuKeyStore};
use keyledger_crypto::PublicKey;
use keyledger_ledger::decode_username_set;

use crate::theme::Theme;

/// Print the chain for `username` after checking it against the pins in
/// `pins`, then save the updated pins.
pub(crate) async fn show_chain<C: CoreNode>(
    node: C,
    pins: &Path,
    max_tail: usize,
    username: &str,
) -> anyhow::Result<()> {
    let client = TofuCoreNode::new(node, TofuKeyStore::load(pins, max_tail)?);
    let chain = match client.get_chain(username).await {
        Ok(chain) => chain,
        Err(e) => {
            println!("{}", Theme::error(&format!("Chain for {username} failed verification")));
            return Err(e.into());
        },
    };
    client.save(pins).await?;

    if chain.is_empty() {
        println!("{}", Theme::info(&format!("{username} is not registered")));
        return Ok(());
    }

    println!("\n{}", Theme::header(&format!("Key chain for {username}")));
    println!(
        "{:>5} {:>12} {:>17} {}",
        "INDEX".dimmed(),
        "KEY".dimmed(),
        "EXPIRES".dimmed(),
        "HANDED TO".dimmed()
    );
    println!("{}", Theme::separator());
    for link in &chain {
        let claim = link.open_claim()?;
        let successor = link
            .successor()?
            .map_or_else(|| Theme::dimmed("-"), |next| Theme::key(&next));
        println!(
            "{:>5} {:>12} {:>17} {}",
            link.index(),
            Theme::key(link.owner()),
            Theme::timestamp(&claim.expiry),
            successor
        );
    }
    println!();
    Ok(())
}

/// Print the username currently bound to a hex public key.
pub(crate) async fn whois(node: &dyn CoreNode, key_hex: &str) -> anyhow::Result<()> {
    let key = PublicKey::from_hex(key_hex)?;
    match node.get_username(&key).await? {
        Some(username) => println!("{}", Theme::kv(&key.short_hex(), &username)),
        None => println!("{}", Theme::info(&format!("{} is not bound to a username", key.short_hex()))),
    }
    Ok(())
}

/// Print every registered username.
pub(crate) async fn list_users(node: &dyn CoreNode) -> anyhow::Result<()> {
    let usernames = decode_username_set(&node.get_all_usernames_gzip().await?)?;
    if usernames.is_empty() {
        println!("{}", Theme::info("No usernames registered"));
        return Ok(());
    }
    println!("\n{}", Theme::header("Registered usernames"));
    for name in &usernames {
        println!("  {name}");
    }
    println!();
    Ok(())
}
