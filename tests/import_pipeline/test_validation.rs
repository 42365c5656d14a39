//! Validation outcomes observed through the whole pipeline.

use card_import_lib::models::{FailureKind, FileAsset, FindingKind, ImportPhase, Severity};

use super::test_helpers::*;

#[tokio::test]
async fn test_valid_names_recover_level_and_normalized_name() {
    let h = Harness::with_collection();
    let result = h
        .service
        .import(request(images(&[
            "1_alice.jpg",
            "2_Mary__Jane_.png",
            "5_  dahyun   kim.jpeg",
        ])))
        .await
        .unwrap();

    assert!(result.success);
    let cards = h.catalog.cards();
    let got: Vec<(i32, &str)> = cards.iter().map(|c| (c.level, c.name.as_str())).collect();
    assert_eq!(got, vec![(1, "alice"), (2, "mary jane"), (5, "dahyun kim")]);
    assert!(cards.iter().all(|c| c.name.trim() == c.name));
}

#[tokio::test]
async fn test_invalid_names_abort_before_side_effects() {
    for bad in ["alice.jpg", "0_alice.jpg", "6_alice.jpg", "1_alice.bmp", "1___.png"] {
        let h = Harness::with_collection();
        let result = h
            .service
            .import(request(images(&["1_bob.jpg", bad])))
            .await
            .unwrap();

        assert!(!result.success, "{}", bad);
        assert!(result.has_critical_findings());
        assert_eq!(result.phase, ImportPhase::Validating);
        assert_eq!(result.failure.as_ref().unwrap().kind, FailureKind::ValidationFailed);
        let finding = result.findings_for(bad).next().unwrap();
        assert_eq!(finding.kind, FindingKind::MalformedName);
        assert_eq!(finding.severity, Severity::Critical);

        assert!(result.uploaded_keys.is_empty());
        assert!(h.store.puts().is_empty());
        assert!(h.catalog.cards().is_empty());
    }
}

#[tokio::test]
async fn test_critical_finding_stops_before_collection_creation() {
    let h = Harness::new();
    let result = h
        .service
        .import(request(images(&["not-a-card.png"])))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(!result.collection_created);
    assert!(h.catalog.collection(COLLECTION).is_none());
}

#[tokio::test]
async fn test_oversized_file_is_critical() {
    let h = Harness::with_limits(card_import_lib::config::ImportLimits {
        max_file_size: 8,
        large_file_warning: 4,
        max_files_per_import: 10,
    });
    let files = vec![FileAsset::new("1_alice.jpg", "image/jpeg", vec![0u8; 9])];
    let result = h.service.import(request(files)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.findings[0].kind, FindingKind::SizeExceeded);
    assert!(h.store.puts().is_empty());
}

#[tokio::test]
async fn test_duplicate_second_occurrence_is_not_staged() {
    let h = Harness::with_collection();
    let result = h
        .service
        .import(request(images(&["1_alice.jpg", "1_alice.png"])))
        .await
        .unwrap();

    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].file_name, "1_alice.png");
    assert_eq!(result.findings[0].kind, FindingKind::DuplicateName);

    assert_eq!(result.cards_created, 1);
    assert_eq!(result.uploaded_keys, vec![key("1_alice.jpg")]);
    assert_eq!(result.files_skipped, vec!["1_alice.png".to_string()]);
    assert_eq!(result.summary.duplicates, vec!["1_alice.png".to_string()]);

    // A high finding keeps the import from full success
    assert_eq!(result.phase, ImportPhase::Committed);
    assert!(!result.success);
    assert!(result.partial_success);
    assert!(result.failure.is_none());
}

#[tokio::test]
async fn test_content_type_mismatch_does_not_block() {
    let h = Harness::with_collection();
    let files = vec![FileAsset::new("1_alice.png", "image/jpeg", vec![1, 2, 3])];
    let result = h.service.import(request(files)).await.unwrap();

    assert_eq!(result.findings[0].kind, FindingKind::ContentTypeMismatch);
    assert_eq!(result.findings[0].severity, Severity::Medium);
    assert!(result.success);
    assert_eq!(result.cards_created, 1);
    // Stored with the type implied by the extension
    assert_eq!(h.store.object(&key("1_alice.png")).unwrap().1, "image/png");
}

#[tokio::test]
async fn test_validate_only_touches_nothing() {
    let h = Harness::new();
    let mut req = request(images(&["1_alice.jpg", "1_alice.gif"]));
    req.validate_only = true;
    let result = h.service.import(req).await.unwrap();

    assert_eq!(result.phase, ImportPhase::Validating);
    assert!(!result.success);
    assert_eq!(result.findings.len(), 1);
    assert!(h.store.puts().is_empty());
    assert!(h.catalog.collection(COLLECTION).is_none());

    let mut clean = request(images(&["1_alice.jpg"]));
    clean.validate_only = true;
    let result = h.service.import(clean).await.unwrap();
    assert!(result.success);
    assert_eq!(result.cards_created, 0);
    assert!(h.catalog.cards().is_empty());
}

#[tokio::test]
async fn test_malformed_request_is_an_error() {
    let h = Harness::new();
    assert!(h.service.import(request(Vec::new())).await.is_err());

    let mut req = request(images(&["1_alice.jpg"]));
    req.group_tag = "../etc".to_string();
    assert!(h.service.import(req).await.is_err());
}
