//! [`CoreNode`] and [`MutablePointers`] for the ledger.

use async_trait::async_trait;
use keyledger_core::{CoreNode, KeyLink, MutablePointers, NodeResult};
use keyledger_crypto::PublicKey;

use crate::ledger::Ledger;

#[async_trait]
impl CoreNode for Ledger {
    async fn get_username(&self, key: &PublicKey) -> NodeResult<Option<String>> {
        Ok(self.username_for(key).await?)
    }

    async fn get_chain(&self, username: &str) -> NodeResult<Vec<KeyLink>> {
        Ok(self.chain(username).await?)
    }

    async fn update_chain(&self, username: &str, tail: &[KeyLink]) -> NodeResult<bool> {
        Ok(self.update(username, tail).await?)
    }

    async fn get_all_usernames_gzip(&self) -> NodeResult<Vec<u8>> {
        Ok(self.usernames_gzip().await?)
    }

    async fn follow_request(&self, target: &PublicKey, blob: &[u8]) -> NodeResult<bool> {
        Ok(self.add_follow_request(target, blob).await?)
    }

    async fn remove_follow_request(
        &self,
        owner: &PublicKey,
        signed_blob: &[u8],
    ) -> NodeResult<bool> {
        Ok(Ledger::remove_follow_request(self, owner, signed_blob).await?)
    }

    async fn get_follow_requests(&self, owner: &PublicKey) -> NodeResult<Vec<u8>> {
        Ok(self.follow_requests(owner).await?)
    }
}

#[async_trait]
impl MutablePointers for Ledger {
    async fn set_pointer(&self, writer: &PublicKey, signed_update: &[u8]) -> NodeResult<bool> {
        Ok(self.write_pointer(writer, signed_update).await?)
    }

    async fn delete_pointer(&self, writer: &PublicKey, signed_delete: &[u8]) -> NodeResult<bool> {
        Ok(Ledger::delete_pointer(self, writer, signed_delete).await?)
    }

    async fn get_pointer(&self, writer: &PublicKey) -> NodeResult<Option<Vec<u8>>> {
        Ok(self.read_pointer(writer).await?)
    }
}
