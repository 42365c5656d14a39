//! Concurrent imports sharing one service.

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use card_import_lib::models::{Collection, ImportRequest};
use tokio_test::assert_ok;

use super::test_helpers::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_imports_never_share_ids() {
    let h = Harness::with_collection();
    h.catalog.slow_max_id.store(true, Ordering::SeqCst);
    for key in ["itzy", "aespa", "ive"] {
        h.catalog
            .seed_collection(Collection::for_import(key, key, GROUP, false));
    }

    let mut handles = Vec::new();
    for key in [COLLECTION, "itzy", "aespa", "ive"] {
        let service = h.service.clone();
        let req = ImportRequest {
            collection_key: key.to_string(),
            ..request(images(&["1_alice.jpg", "2_bob.png", "3_charlie.gif"]))
        };
        handles.push(tokio::spawn(async move { service.import(req).await }));
    }

    for handle in handles {
        let result = assert_ok!(handle.await.unwrap());
        assert!(result.success);
        assert_eq!(result.cards_created, 3);
    }

    let cards = h.catalog.cards();
    assert_eq!(cards.len(), 12);
    let ids: HashSet<i64> = cards.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 12);
    assert_eq!(ids, (1..=12).collect());
}
