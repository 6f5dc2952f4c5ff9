//! Signature-gated compare-and-swap pointers.
//!
//! The stored value is the writer's signed [`PointerUpdate`] exactly as
//! submitted, so a reader can re-verify it. A losing concurrent writer gets
//! `false` and must re-read before trying again.

use keyledger_core::{PointerDelete, PointerUpdate};
use keyledger_crypto::PublicKey;
use keyledger_storage::{StorageError, WriteBatch};
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::schema::{NS_POINTERS, key_id};

impl Ledger {
    /// Stored signed update and the hash it points at.
    async fn load_pointer(
        &self,
        writer: &PublicKey,
    ) -> LedgerResult<Option<(Vec<u8>, PointerUpdate)>> {
        let id = key_id(writer);
        let Some(raw) = self.store.get(NS_POINTERS, &id).await? else {
            return Ok(None);
        };
        let update = PointerUpdate::open(writer, &raw)
            .map_err(|e| LedgerError::corrupt_record(NS_POINTERS, id, e))?;
        Ok(Some((raw, update)))
    }

    async fn commit_pointer(&self, writer: &PublicKey, batch: WriteBatch) -> LedgerResult<bool> {
        match self.store.commit(batch).await {
            Ok(()) => Ok(true),
            Err(StorageError::Conflict(_)) => {
                debug!(writer = %writer.short_hex(), "Pointer changed concurrently");
                Ok(false)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a signed [`PointerUpdate`] if its `previous` matches the
    /// stored hash (or the pointer is absent and `previous` is `None`).
    ///
    /// # Errors
    ///
    /// Storage failures or an undecodable stored pointer.
    pub async fn write_pointer(&self, writer: &PublicKey, signed: &[u8]) -> LedgerResult<bool> {
        let update = match PointerUpdate::open(writer, signed) {
            Ok(update) => update,
            Err(e) => {
                warn!(writer = %writer.short_hex(), error = %e, "Refused pointer update");
                return Ok(false);
            },
        };
        if update.current.is_empty() || update.current.len() > self.limits.max_hash_len {
            debug!(writer = %writer.short_hex(), len = update.current.len(), "Pointer hash length out of range");
            return Ok(false);
        }

        let stored = self.load_pointer(writer).await?;
        let stored_current = stored.as_ref().map(|(_, u)| u.current.as_slice());
        if update.previous.as_deref() != stored_current {
            debug!(writer = %writer.short_hex(), "Pointer CAS conflict");
            return Ok(false);
        }

        let id = key_id(writer);
        let mut batch = WriteBatch::new();
        batch
            .require(NS_POINTERS, &id, stored.map(|(raw, _)| raw))
            .put(NS_POINTERS, &id, signed.to_vec());
        self.commit_pointer(writer, batch).await
    }

    /// Delete the pointer if it still holds the signed hash.
    ///
    /// # Errors
    ///
    /// Storage failures or an undecodable stored pointer.
    pub async fn delete_pointer(&self, writer: &PublicKey, signed: &[u8]) -> LedgerResult<bool> {
        let delete = match PointerDelete::open(writer, signed) {
            Ok(delete) => delete,
            Err(e) => {
                warn!(writer = %writer.short_hex(), error = %e, "Refused pointer delete");
                return Ok(false);
            },
        };
        let Some((raw, stored)) = self.load_pointer(writer).await? else {
            return Ok(false);
        };
        if stored.current != delete.current {
            debug!(writer = %writer.short_hex(), "Pointer delete CAS conflict");
            return Ok(false);
        }

        let id = key_id(writer);
        let mut batch = WriteBatch::new();
        batch
            .require_equals(NS_POINTERS, &id, raw)
            .delete(NS_POINTERS, &id);
        self.commit_pointer(writer, batch).await
    }

    /// Current hash for `writer`.
    ///
    /// # Errors
    ///
    /// Storage failures or an undecodable stored pointer.
    pub async fn read_pointer(&self, writer: &PublicKey) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self
            .load_pointer(writer)
            .await?
            .map(|(_, update)| update.current))
    }
}
