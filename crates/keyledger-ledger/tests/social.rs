//! Mailboxes and metadata pointers through the node traits.

use std::sync::Arc;

use keyledger_config::Config;
use keyledger_core::{CoreNode, MutablePointers, PointerDelete, PointerUpdate};
use keyledger_crypto::KeyPair;
use keyledger_ledger::{Ledger, LedgerLimits, decode_follow_requests};
use keyledger_storage::MemoryKvStore;

fn ledger_with(limits: LedgerLimits) -> Arc<Ledger> {
    Arc::new(Ledger::new(Arc::new(MemoryKvStore::new()), limits))
}

#[tokio::test]
async fn test_mailbox_bound_from_config() {
    let config = Config::default();
    let limits = LedgerLimits::from(&config.ledger);
    let max = limits.max_pending_followers;
    let ledger = ledger_with(limits);
    let node: &dyn CoreNode = &*ledger;
    let target = KeyPair::generate().export_public_key();

    for i in 0..max {
        let blob = format!("request-{i}");
        assert!(node.follow_request(&target, blob.as_bytes()).await.unwrap());
    }
    assert!(!node.follow_request(&target, b"one too many").await.unwrap());

    let pending = decode_follow_requests(&node.get_follow_requests(&target).await.unwrap()).unwrap();
    assert_eq!(pending.len(), max);
    assert_eq!(pending[0], b"request-0");
}

#[tokio::test]
async fn test_mailbox_drain_by_owner() {
    let ledger = ledger_with(LedgerLimits::default());
    let node: &dyn CoreNode = &*ledger;
    let owner = KeyPair::generate();
    let pk = owner.export_public_key();

    assert!(node.follow_request(&pk, b"from bob").await.unwrap());
    assert!(node.follow_request(&pk, b"from carol").await.unwrap());

    // Someone else cannot clear alice's mailbox.
    let forged = KeyPair::generate().sign_message(b"from bob");
    assert!(!node.remove_follow_request(&pk, &forged).await.unwrap());

    for blob in decode_follow_requests(&node.get_follow_requests(&pk).await.unwrap()).unwrap() {
        assert!(node.remove_follow_request(&pk, &owner.sign_message(&blob)).await.unwrap());
    }
    assert!(
        decode_follow_requests(&node.get_follow_requests(&pk).await.unwrap())
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_mailboxes_are_per_recipient() {
    let ledger = ledger_with(LedgerLimits {
        max_pending_followers: 1,
        ..LedgerLimits::default()
    });
    let node: &dyn CoreNode = &*ledger;
    let alice = KeyPair::generate().export_public_key();
    let bob = KeyPair::generate().export_public_key();

    assert!(node.follow_request(&alice, b"x").await.unwrap());
    assert!(node.follow_request(&bob, b"x").await.unwrap());
    assert!(!node.follow_request(&alice, b"y").await.unwrap());
}

#[tokio::test]
async fn test_pointer_lifecycle() {
    let ledger = ledger_with(LedgerLimits::default());
    let pointers: &dyn MutablePointers = &*ledger;
    let kp = KeyPair::generate();
    let pk = kp.export_public_key();
    let root_a = blake3::hash(b"tree a").as_bytes().to_vec();
    let root_b = blake3::hash(b"tree b").as_bytes().to_vec();

    assert_eq!(pointers.get_pointer(&pk).await.unwrap(), None);
    assert!(
        pointers
            .set_pointer(&pk, &PointerUpdate::create(root_a.clone()).sign(&kp).unwrap())
            .await
            .unwrap()
    );

    // Two writers both believe the pointer is at root_a; one wins.
    let to_b = PointerUpdate::replace(root_a.clone(), root_b.clone()).sign(&kp).unwrap();
    let to_c = PointerUpdate::replace(root_a.clone(), b"c".to_vec()).sign(&kp).unwrap();
    assert!(pointers.set_pointer(&pk, &to_b).await.unwrap());
    assert!(!pointers.set_pointer(&pk, &to_c).await.unwrap());
    assert_eq!(pointers.get_pointer(&pk).await.unwrap(), Some(root_b.clone()));

    let stale = PointerDelete {
        current: root_a,
    };
    assert!(!pointers.delete_pointer(&pk, &stale.sign(&kp).unwrap()).await.unwrap());
    let delete = PointerDelete {
        current: root_b,
    };
    assert!(pointers.delete_pointer(&pk, &delete.sign(&kp).unwrap()).await.unwrap());
    assert_eq!(pointers.get_pointer(&pk).await.unwrap(), None);
}

#[tokio::test]
async fn test_pointers_are_per_writer() {
    let ledger = ledger_with(LedgerLimits::default());
    let pointers: &dyn MutablePointers = &*ledger;
    let alice = KeyPair::generate();
    let bob = KeyPair::generate();

    let update = PointerUpdate::create(b"h".to_vec());
    assert!(
        pointers
            .set_pointer(&alice.export_public_key(), &update.sign(&alice).unwrap())
            .await
            .unwrap()
    );
    // Bob's own pointer is still absent, so a create succeeds for him too.
    assert!(
        pointers
            .set_pointer(&bob.export_public_key(), &update.sign(&bob).unwrap())
            .await
            .unwrap()
    );
    // Alice's signed bytes cannot be replayed against bob's pointer.
    let replay = PointerUpdate::replace(b"h".to_vec(), b"evil".to_vec()).sign(&alice).unwrap();
    assert!(!pointers.set_pointer(&bob.export_public_key(), &replay).await.unwrap());
}
