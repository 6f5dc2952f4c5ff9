//! Service traits implemented by the ledger and by client-side wrappers.

use async_trait::async_trait;
use keyledger_crypto::PublicKey;

use crate::error::NodeResult;
use crate::link::KeyLink;

/// The identity ledger as seen by callers.
///
/// Rejected updates are `Ok(false)`; `Err` is reserved for storage faults
/// and corruption.
#[async_trait]
pub trait CoreNode: Send + Sync {
    /// Username currently bound to `key`, if any.
    async fn get_username(&self, key: &PublicKey) -> NodeResult<Option<String>>;

    /// Full chain for `username`; empty if unregistered.
    async fn get_chain(&self, username: &str) -> NodeResult<Vec<KeyLink>>;

    /// Current key for `username`.
    async fn get_public_key(&self, username: &str) -> NodeResult<Option<PublicKey>> {
        Ok(self
            .get_chain(username)
            .await?
            .last()
            .map(|link| *link.owner()))
    }

    /// Whether `username` has been claimed.
    async fn is_username_registered(&self, username: &str) -> NodeResult<bool> {
        Ok(!self.get_chain(username).await?.is_empty())
    }

    /// Apply a register, rotate or refresh tail.
    async fn update_chain(&self, username: &str, tail: &[KeyLink]) -> NodeResult<bool>;

    /// Gzipped, length-prefixed list of every registered username.
    async fn get_all_usernames_gzip(&self) -> NodeResult<Vec<u8>>;

    /// Queue an opaque follow request for `target`.
    async fn follow_request(&self, target: &PublicKey, blob: &[u8]) -> NodeResult<bool>;

    /// Remove one request; `signed_blob` is the exact blob signed by `owner`.
    async fn remove_follow_request(&self, owner: &PublicKey, signed_blob: &[u8])
    -> NodeResult<bool>;

    /// Pending requests for `owner`: a `u32` count then length-prefixed blobs.
    async fn get_follow_requests(&self, owner: &PublicKey) -> NodeResult<Vec<u8>>;
}

/// Signature-gated compare-and-swap pointers, one per writing key.
#[async_trait]
pub trait MutablePointers: Send + Sync {
    /// Apply a signed [`PointerUpdate`](crate::PointerUpdate).
    async fn set_pointer(&self, writer: &PublicKey, signed_update: &[u8]) -> NodeResult<bool>;

    /// Apply a signed [`PointerDelete`](crate::PointerDelete).
    async fn delete_pointer(&self, writer: &PublicKey, signed_delete: &[u8]) -> NodeResult<bool>;

    /// Current hash for `writer`.
    async fn get_pointer(&self, writer: &PublicKey) -> NodeResult<Option<Vec<u8>>>;
}

#[async_trait]
impl<T: CoreNode + ?Sized> CoreNode for std::sync::Arc<T> {
    async fn get_username(&self, key: &PublicKey) -> NodeResult<Option<String>> {
        (**self).get_username(key).await
    }

    async fn get_chain(&self, username: &str) -> NodeResult<Vec<KeyLink>> {
        (**self).get_chain(username).await
    }

    async fn get_public_key(&self, username: &str) -> NodeResult<Option<PublicKey>> {
        (**self).get_public_key(username).await
    }

    async fn is_username_registered(&self, username: &str) -> NodeResult<bool> {
        (**self).is_username_registered(username).await
    }

    async fn update_chain(&self, username: &str, tail: &[KeyLink]) -> NodeResult<bool> {
        (**self).update_chain(username, tail).await
    }

    async fn get_all_usernames_gzip(&self) -> NodeResult<Vec<u8>> {
        (**self).get_all_usernames_gzip().await
    }

    async fn follow_request(&self, target: &PublicKey, blob: &[u8]) -> NodeResult<bool> {
        (**self).follow_request(target, blob).await
    }

    async fn remove_follow_request(
        &self,
        owner: &PublicKey,
        signed_blob: &[u8],
    ) -> NodeResult<bool> {
        (**self).remove_follow_request(owner, signed_blob).await
    }

    async fn get_follow_requests(&self, owner: &PublicKey) -> NodeResult<Vec<u8>> {
        (**self).get_follow_requests(owner).await
    }
}
