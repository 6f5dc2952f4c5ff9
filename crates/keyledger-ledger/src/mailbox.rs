//! Follow-request mailboxes.
//!
//! Each recipient key has one bounded list of opaque blobs. Inserts and
//! removals are guarded on the mailbox they read, and retried a few times
//! when another writer got there first.

use keyledger_crypto::PublicKey;
use keyledger_storage::{StorageError, WriteBatch};
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, MAX_ATTEMPTS};
use crate::schema::{NS_MAILBOX, decode_mailbox, encode_list, encode_mailbox, key_id};

/// Outcome of one guarded attempt.
enum Attempt {
    Committed,
    Conflicted,
}

impl Ledger {
    async fn load_mailbox(&self, id: &str) -> LedgerResult<(Vec<Vec<u8>>, Option<Vec<u8>>)> {
        let raw = self.store.get(NS_MAILBOX, id).await?;
        let entries = match &raw {
            Some(bytes) => {
                decode_mailbox(bytes).map_err(|e| LedgerError::codec(NS_MAILBOX, id, &e))?
            },
            None => Vec::new(),
        };
        Ok((entries, raw))
    }

    async fn commit_mailbox(&self, batch: WriteBatch) -> LedgerResult<Attempt> {
        match self.store.commit(batch).await {
            Ok(()) => Ok(Attempt::Committed),
            Err(StorageError::Conflict(_)) => Ok(Attempt::Conflicted),
            Err(e) => Err(e.into()),
        }
    }

    /// Queue `blob` for `target`. Returns `false` when the mailbox is full
    /// or the blob is empty or larger than
    /// [`LedgerLimits::max_follow_request_len`](crate::LedgerLimits::max_follow_request_len).
    ///
    /// # Errors
    ///
    /// Storage failures, or [`LedgerError::Contention`] if the mailbox kept
    /// changing.
    pub async fn add_follow_request(&self, target: &PublicKey, blob: &[u8]) -> LedgerResult<bool> {
        if blob.is_empty() || blob.len() > self.limits.max_follow_request_len {
            debug!(len = blob.len(), "Rejected follow request size");
            return Ok(false);
        }
        let id = key_id(target);
        for _ in 0..MAX_ATTEMPTS {
            let (mut entries, raw) = self.load_mailbox(&id).await?;
            if entries.len() >= self.limits.max_pending_followers {
                debug!(target = %target.short_hex(), "Mailbox full");
                return Ok(false);
            }
            entries.push(blob.to_vec());

            let mut batch = WriteBatch::new();
            batch
                .require(NS_MAILBOX, &id, raw)
                .put(NS_MAILBOX, &id, encode_mailbox(&entries)?);
            if let Attempt::Committed = self.commit_mailbox(batch).await? {
                return Ok(true);
            }
        }
        Err(LedgerError::Contention(format!("mailbox {id}")))
    }

    /// Remove the request whose exact bytes `owner` signed.
    ///
    /// A bad signature and an absent request both return `false`.
    ///
    /// # Errors
    ///
    /// Storage failures, or [`LedgerError::Contention`].
    pub async fn remove_follow_request(
        &self,
        owner: &PublicKey,
        signed_blob: &[u8],
    ) -> LedgerResult<bool> {
        let Ok(blob) = owner.unsign_message(signed_blob) else {
            warn!(owner = %owner.short_hex(), "Follow request removal with bad signature");
            return Ok(false);
        };
        let id = key_id(owner);
        for _ in 0..MAX_ATTEMPTS {
            let (mut entries, raw) = self.load_mailbox(&id).await?;
            let before = entries.len();
            entries.retain(|entry| *entry != blob);
            if entries.len() == before {
                debug!(owner = %owner.short_hex(), "No matching follow request");
                return Ok(false);
            }

            let mut batch = WriteBatch::new();
            batch.require(NS_MAILBOX, &id, raw);
            if entries.is_empty() {
                batch.delete(NS_MAILBOX, &id);
            } else {
                batch.put(NS_MAILBOX, &id, encode_mailbox(&entries)?);
            }
            if let Attempt::Committed = self.commit_mailbox(batch).await? {
                return Ok(true);
            }
        }
        Err(LedgerError::Contention(format!("mailbox {id}")))
    }

    /// Pending requests for `owner`: a `u32` count then length-prefixed
    /// blobs.
    ///
    /// # Errors
    ///
    /// Storage failures or an undecodable mailbox.
    pub async fn follow_requests(&self, owner: &PublicKey) -> LedgerResult<Vec<u8>> {
        let (entries, _) = self.load_mailbox(&key_id(owner)).await?;
        Ok(encode_list(entries.iter())?)
    }
}
