//! Handling of files whose card already exists.

use card_import_lib::models::{FindingKind, ImageExtension, OverwriteMode};

use super::test_helpers::*;

#[tokio::test]
async fn test_skip_reimport_is_idempotent() {
    let h = Harness::with_collection();
    let files = images(&["1_alice.jpg", "2_bob.png"]);

    let first = h.service.import(request(files.clone())).await.unwrap();
    assert_eq!(first.cards_created, 2);
    let puts_after_first = h.store.puts().len();

    let second = h.service.import(request(files)).await.unwrap();
    assert!(second.success);
    assert_eq!(second.cards_created, 0);
    assert_eq!(second.cards_skipped, 2);
    assert!(second.uploaded_keys.is_empty());
    assert_eq!(h.store.puts().len(), puts_after_first);
    assert_eq!(h.catalog.cards().len(), 2);
}

#[tokio::test]
async fn test_existing_card_match_ignores_case() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(5, "Alice", 1, ImageExtension::Jpg));

    let result = h
        .service
        .import(request(images(&["1_ALICE.jpg"])))
        .await
        .unwrap();

    assert_eq!(result.cards_skipped, 1);
    assert_eq!(result.cards_created, 0);
}

#[tokio::test]
async fn test_overwrite_replaces_existing_card() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(7, "alice", 1, ImageExtension::Jpg));
    h.store.seed(&key("1_alice.jpg"), b"old".to_vec());

    let result = h
        .service
        .import(request_with_mode(images(&["1_alice.jpg"]), OverwriteMode::Overwrite))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.cards_created, 1);
    assert_eq!(result.first_card_id, Some(8));

    let cards = h.catalog.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, 8);
    assert!(h.catalog.card(7).is_none());
    assert_eq!(h.store.object(&key("1_alice.jpg")).unwrap().0, b"1_alice.jpg".to_vec());
    // The backup of the replaced object is gone after commit
    assert_eq!(h.store.keys(), vec![key("1_alice.jpg")]);
}

#[tokio::test]
async fn test_overwrite_write_failure_keeps_old_card_and_object() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(7, "alice", 1, ImageExtension::Jpg));
    h.store.seed(&key("1_alice.jpg"), b"old".to_vec());
    h.catalog
        .fail_writes
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let result = h
        .service
        .import(request_with_mode(
            images(&["1_alice.jpg", "2_bob.png"]),
            OverwriteMode::Overwrite,
        ))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(h.catalog.card(7).is_some());

    // The replaced object holds its original bytes again, the new one is removed
    assert_eq!(h.store.object(&key("1_alice.jpg")).unwrap().0, b"old".to_vec());
    assert!(h.store.object(&key("2_bob.png")).is_none());
    assert_eq!(h.store.keys(), vec![key("1_alice.jpg")]);

    let compensation = result.compensation.unwrap();
    assert_eq!(compensation.deleted, vec![key("2_bob.png")]);
    assert_eq!(compensation.restored, vec![key("1_alice.jpg")]);
    assert!(compensation.is_complete());
}

#[tokio::test]
async fn test_overwrite_upload_failure_restores_replaced_object() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(7, "alice", 1, ImageExtension::Jpg));
    h.store.seed(&key("1_alice.jpg"), b"old".to_vec());
    h.store.fail_put_at(1);

    let result = h
        .service
        .import(request_with_mode(images(&["1_alice.jpg"]), OverwriteMode::Overwrite))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.compensation.unwrap().restored, vec![key("1_alice.jpg")]);
    assert_eq!(h.store.object(&key("1_alice.jpg")).unwrap().0, b"old".to_vec());
    assert_eq!(h.store.keys(), vec![key("1_alice.jpg")]);
}

#[tokio::test]
async fn test_update_changes_flags_in_place() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(3, "alice", 1, ImageExtension::Jpg));

    let result = h
        .service
        .import(request_with_mode(images(&["4_alice.gif"]), OverwriteMode::Update))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.cards_updated, 1);
    assert_eq!(result.cards_created, 0);
    assert!(result.uploaded_keys.is_empty());
    assert!(h.store.puts().is_empty());

    let card = h.catalog.card(3).unwrap();
    assert_eq!(card.level, 4);
    assert!(card.is_animated);
    // Extension and object stay those of the original jpg
    assert_eq!(card.extension, ImageExtension::Jpg);
    assert_eq!(h.catalog.cards().len(), 1);
}

#[tokio::test]
async fn test_update_without_changes_counts_as_skipped() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(3, "alice", 2, ImageExtension::Png));

    let result = h
        .service
        .import(request_with_mode(
            images(&["2_alice.png", "1_bob.jpg"]),
            OverwriteMode::Update,
        ))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.cards_skipped, 1);
    assert_eq!(result.cards_updated, 0);
    assert_eq!(result.cards_created, 1);
    assert_eq!(result.uploaded_keys, vec![key("1_bob.jpg")]);
}

#[tokio::test]
async fn test_second_update_of_same_card_is_reported() {
    let h = Harness::with_collection();
    h.catalog
        .seed_card(existing_card(3, "alice", 1, ImageExtension::Jpg));

    let result = h
        .service
        .import(request_with_mode(
            images(&["2_alice.jpg", "3_alice.jpg"]),
            OverwriteMode::Update,
        ))
        .await
        .unwrap();

    assert_eq!(result.cards_updated, 1);
    assert_eq!(result.files_skipped, vec!["3_alice.jpg".to_string()]);
    assert_eq!(
        result.cards_created + result.cards_updated + result.cards_skipped + result.files_failed,
        2
    );
    let finding = result.findings_for("3_alice.jpg").next().unwrap();
    assert_eq!(finding.kind, FindingKind::DuplicateName);

    // First file wins
    assert_eq!(h.catalog.card(3).unwrap().level, 2);
    assert!(!result.success);
}
