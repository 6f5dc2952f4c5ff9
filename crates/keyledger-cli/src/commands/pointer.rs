//! Pointer commands: read, write and delete a key's metadata pointer.

use anyhow::{anyhow, bail};
use keyledger_core::{CoreNode, MutablePointers, PointerDelete, PointerUpdate};
use keyledger_crypto::PublicKey;

use super::keys::KeyRing;
use crate::theme::Theme;

/// Resolve a `username` or a hex public key to the key it names.
pub(crate) async fn resolve_writer(node: &dyn CoreNode, who: &str) -> anyhow::Result<PublicKey> {
    if let Ok(key) = PublicKey::from_hex(who) {
        return Ok(key);
    }
    node.get_public_key(who)
        .await?
        .ok_or_else(|| anyhow!("{who} is neither a registered username nor a public key"))
}

/// Print the hash the writer's pointer currently holds.
pub(crate) async fn read(
    node: &dyn CoreNode,
    pointers: &dyn MutablePointers,
    who: &str,
) -> anyhow::Result<()> {
    let writer = resolve_writer(node, who).await?;
    match pointers.get_pointer(&writer).await? {
        Some(hash) => println!("{}", hex::encode(hash)),
        None => println!("{}", Theme::info(&format!("{who} has no pointer"))),
    }
    Ok(())
}

/// Move `username`'s pointer to `hash_hex`, from whatever it holds now.
pub(crate) async fn write(
    node: &dyn CoreNode,
    pointers: &dyn MutablePointers,
    ring: &KeyRing,
    username: &str,
    hash_hex: &str,
) -> anyhow::Result<()> {
    let hash = hex::decode(hash_hex)?;
    let last = node
        .get_chain(username)
        .await?
        .pop()
        .ok_or_else(|| anyhow!("{username} is not registered"))?;
    let key = ring.owner_of(username, &last)?;
    let writer = key.export_public_key();

    let update = PointerUpdate {
        previous: pointers.get_pointer(&writer).await?,
        current: hash,
    };
    if !pointers.set_pointer(&writer, &update.sign(&key)?).await? {
        println!("{}", Theme::error("Pointer changed underneath us or the hash was refused"));
        bail!("pointer update rejected");
    }
    println!("{}", Theme::success(&format!("Pointer for {username} now {hash_hex}")));
    Ok(())
}

/// Delete `username`'s pointer if it still holds what was just read.
pub(crate) async fn delete(
    node: &dyn CoreNode,
    pointers: &dyn MutablePointers,
    ring: &KeyRing,
    username: &str,
) -> anyhow::Result<()> {
    let last = node
        .get_chain(username)
        .await?
        .pop()
        .ok_or_else(|| anyhow!("{username} is not registered"))?;
    let key = ring.owner_of(username, &last)?;
    let writer = key.export_public_key();

    let Some(current) = pointers.get_pointer(&writer).await? else {
        println!("{}", Theme::info(&format!("{username} has no pointer")));
        return Ok(());
    };
    let signed = PointerDelete { current }.sign(&key)?;
    if !pointers.delete_pointer(&writer, &signed).await? {
        bail!("pointer delete rejected");
    }
    println!("{}", Theme::success(&format!("Deleted pointer for {username}")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keyledger_ledger::{Ledger, LedgerLimits};
    use keyledger_storage::MemoryKvStore;

    use super::*;
    use crate::commands::identity;

    #[tokio::test]
    async fn test_write_read_delete() {
        let home = tempfile::tempdir().unwrap();
        let ring = KeyRing::new(home.path());
        let ledger = Ledger::new(Arc::new(MemoryKvStore::new()), LedgerLimits::default());
        identity::register(&ledger, &ring, "alice", 30).await.unwrap();

        write(&ledger, &ledger, &ring, "alice", "aa01").await.unwrap();
        write(&ledger, &ledger, &ring, "alice", "bb02").await.unwrap();
        let writer = resolve_writer(&ledger, "alice").await.unwrap();
        assert_eq!(ledger.read_pointer(&writer).await.unwrap(), Some(vec![0xbb, 0x02]));
        read(&ledger, &ledger, &writer.to_hex()).await.unwrap();

        delete(&ledger, &ledger, &ring, "alice").await.unwrap();
        assert_eq!(ledger.read_pointer(&writer).await.unwrap(), None);
        assert!(write(&ledger, &ledger, &ring, "bob", "aa").await.is_err());
        assert!(read(&ledger, &ledger, "bob").await.is_err());
    }
}
