//! Stage-by-stage tests against the in-memory repository and storage.

use avatar_migrate_core::{AssetRecord, MigrationError};
use avatar_migrate_db::AssetRepository;
use avatar_migrate_pipeline::stages::{
    copy_objects, delete_legacy_objects, select_by_prefix, update_paths,
    verify_no_legacy_references, Verification,
};
use avatar_migrate_pipeline::test_helpers::{
    seeded_storage, test_config, MockAssetRepository, MockStorage, StorageCall, LEGACY_BUCKET,
    PRODUCTION_BUCKET,
};
use avatar_migrate_storage::{Storage, StorageError};

const ROWS: &[(i64, &str)] = &[
    (4, "image/d.png"),
    (1, "image/a.png"),
    (3, "avatar/c.png"),
    (2, "image/nested/b.png"),
    (5, "imageX/e.png"),
];

#[tokio::test]
async fn selector_returns_prefixed_rows_in_id_order() {
    let repo = MockAssetRepository::with_rows(ROWS);

    let records = select_by_prefix(&repo, "image/").await.unwrap();

    assert_eq!(
        records.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![1, 2, 4]
    );
    assert!(records.windows(2).all(|w| w[0].id < w[1].id));
    assert!(records.iter().all(|r| r.path.starts_with("image/")));
}

#[tokio::test]
async fn selector_empty_result_is_valid() {
    let repo = MockAssetRepository::with_rows(&[(1, "avatar/a.png")]);
    assert!(select_by_prefix(&repo, "image/").await.unwrap().is_empty());
}

#[tokio::test]
async fn selector_propagates_query_errors() {
    let repo = MockAssetRepository::with_rows(ROWS);
    repo.fail_select(1);

    let err = select_by_prefix(&repo, "image/").await.unwrap_err();
    assert!(matches!(err, MigrationError::Query(_)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn copier_places_objects_under_new_prefix_with_same_bytes() {
    let storage = seeded_storage(ROWS);
    let config = test_config();
    let records = vec![
        AssetRecord::new(1, "image/a.png"),
        AssetRecord::new(2, "image/nested/b.png"),
    ];

    let copied = copy_objects(&storage, &config, &records).await.unwrap();

    assert_eq!(copied, 2);
    assert_eq!(
        storage.download(PRODUCTION_BUCKET, "avatar/a.png").await.unwrap(),
        b"image/a.png".to_vec()
    );
    assert_eq!(
        storage.download(PRODUCTION_BUCKET, "avatar/b.png").await.unwrap(),
        b"image/nested/b.png".to_vec()
    );
    // Copy never removes the source
    assert!(storage.has_object(LEGACY_BUCKET, "image/a.png"));
    assert_eq!(
        storage.copy_calls()[0],
        StorageCall::Copy {
            from_bucket: LEGACY_BUCKET.to_string(),
            from_key: "image/a.png".to_string(),
            to_bucket: PRODUCTION_BUCKET.to_string(),
            to_key: "avatar/a.png".to_string(),
        }
    );
}

#[tokio::test]
async fn copier_stops_at_first_failure_without_rollback() {
    let storage = seeded_storage(ROWS);
    storage.fail_on_key("image/d.png");
    let config = test_config();
    let records = vec![
        AssetRecord::new(1, "image/a.png"),
        AssetRecord::new(4, "image/d.png"),
        AssetRecord::new(5, "image/e.png"),
    ];

    let err = copy_objects(&storage, &config, &records).await.unwrap_err();

    match err {
        MigrationError::Copy { id, ref from, ref to, .. } => {
            assert_eq!(id, 4);
            assert_eq!(from, "legacy-bucket/image/d.png");
            assert_eq!(to, "production-bucket/avatar/d.png");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(storage.has_object(PRODUCTION_BUCKET, "avatar/a.png"));
    assert_eq!(storage.copy_calls().len(), 2);
}

#[tokio::test]
async fn copier_with_concurrency_reports_failing_record() {
    let storage = seeded_storage(ROWS);
    storage.fail_on_key("image/nested/b.png");
    let mut config = test_config();
    config.concurrency = 4;
    let records = select_by_prefix(&MockAssetRepository::with_rows(ROWS), "image/")
        .await
        .unwrap();

    let err = copy_objects(&storage, &config, &records).await.unwrap_err();

    assert_eq!(err.asset_id(), Some(2));
}

#[tokio::test]
async fn copier_refuses_records_sharing_a_filename() {
    let rows = [(1, "image/x/a.png"), (2, "image/y/a.png"), (3, "image/b.png")];
    let storage = seeded_storage(&rows);
    let config = test_config();
    let records: Vec<AssetRecord> = rows
        .iter()
        .map(|(id, path)| AssetRecord::new(*id, *path))
        .collect();

    let err = copy_objects(&storage, &config, &records).await.unwrap_err();

    match err {
        MigrationError::DuplicateTarget { ref key, ref ids } => {
            assert_eq!(key, "avatar/a.png");
            assert_eq!(ids, &vec![1, 2]);
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.exit_code(), 1);
    assert!(storage.calls().is_empty());
    assert!(!storage.has_object(PRODUCTION_BUCKET, "avatar/b.png"));
}

#[tokio::test]
async fn copier_checks_collisions_in_dry_run() {
    let mut config = test_config();
    config.dry_run = true;
    let records = vec![
        AssetRecord::new(4, "image/2019/me.jpg"),
        AssetRecord::new(9, "image/2020/me.jpg"),
    ];

    let err = copy_objects(&MockStorage::new(), &config, &records)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "DUPLICATE_TARGET");
    assert_eq!(err.asset_id(), Some(4));
}

#[tokio::test]
async fn copier_is_idempotent_by_destination_key() {
    let storage = seeded_storage(ROWS);
    let config = test_config();
    let records = vec![AssetRecord::new(1, "image/a.png")];

    copy_objects(&storage, &config, &records).await.unwrap();
    copy_objects(&storage, &config, &records).await.unwrap();

    assert_eq!(
        storage.get_object(PRODUCTION_BUCKET, "avatar/a.png"),
        Some(b"image/a.png".to_vec())
    );
}

#[tokio::test]
async fn updater_rewrites_paths_and_is_idempotent() {
    let repo = MockAssetRepository::with_rows(ROWS);
    let config = test_config();
    let records = select_by_prefix(&repo, "image/").await.unwrap();

    let first = update_paths(&repo, &config, &records).await.unwrap();
    assert_eq!(first.updated, 3);
    assert_eq!(first.unchanged, 0);

    for original in &records {
        let reselected = repo.find_by_id(original.id).await.unwrap().unwrap();
        assert_eq!(
            reselected.path,
            format!("avatar/{}", original.filename())
        );
    }
    assert_eq!(repo.path_of(2).as_deref(), Some("avatar/b.png"));

    // Running again over the already-updated rows changes nothing
    let updated_rows: Vec<AssetRecord> = [1, 2, 4]
        .iter()
        .map(|id| AssetRecord::new(*id, repo.path_of(*id).unwrap()))
        .collect();
    let second = update_paths(&repo, &config, &updated_rows).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(repo.path_of(1).as_deref(), Some("avatar/a.png"));
    assert_eq!(repo.update_calls().len(), 3);
}

#[tokio::test]
async fn updater_failure_keeps_earlier_rows_updated() {
    let repo = MockAssetRepository::with_rows(ROWS);
    repo.fail_update_for(2);
    let config = test_config();
    let records = select_by_prefix(&repo, "image/").await.unwrap();

    let err = update_paths(&repo, &config, &records).await.unwrap_err();

    assert!(matches!(err, MigrationError::Update { id: 2, .. }));
    assert_eq!(repo.path_of(1).as_deref(), Some("avatar/a.png"));
    assert_eq!(repo.path_of(2).as_deref(), Some("image/nested/b.png"));
    assert_eq!(repo.path_of(4).as_deref(), Some("image/d.png"));
}

#[tokio::test]
async fn verifier_checks_whole_table_not_just_batch() {
    let repo = MockAssetRepository::with_rows(&[(1, "avatar/a.png"), (9, "image/z.png")]);
    let config = test_config();
    let batch = vec![AssetRecord::new(1, "image/a.png")];

    match verify_no_legacy_references(&repo, &config, &batch).await.unwrap() {
        Verification::Dirty(leftovers) => {
            assert_eq!(leftovers, vec![AssetRecord::new(9, "image/z.png")]);
        }
        Verification::Clean(_) => panic!("row 9 should block the delete"),
    }
}

#[tokio::test]
async fn deleter_removes_original_keys_after_clean_check() {
    let storage = seeded_storage(ROWS);
    let repo = MockAssetRepository::with_rows(&[(1, "avatar/a.png"), (2, "avatar/b.png")]);
    let config = test_config();
    let batch = vec![
        AssetRecord::new(1, "image/a.png"),
        AssetRecord::new(2, "image/nested/b.png"),
    ];

    let clean = match verify_no_legacy_references(&repo, &config, &batch)
        .await
        .unwrap()
    {
        Verification::Clean(clean) => clean,
        Verification::Dirty(rows) => panic!("unexpected leftovers: {rows:?}"),
    };
    let deleted = delete_legacy_objects(&storage, &config, &batch, &clean)
        .await
        .unwrap();

    assert_eq!(deleted, 2);
    for key in ["image/a.png", "image/nested/b.png"] {
        let result = storage.download(LEGACY_BUCKET, key).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))), "{key}");
    }
    assert!(storage.has_object(LEGACY_BUCKET, "image/d.png"));
}

#[tokio::test]
async fn deleter_failure_is_identified() {
    let storage = MockStorage::new();
    storage.set_object(LEGACY_BUCKET, "image/a.png", vec![1]);
    storage.fail_on_key("image/a.png");
    let repo = MockAssetRepository::new();
    let config = test_config();
    let batch = vec![AssetRecord::new(7, "image/a.png")];

    let Verification::Clean(clean) = verify_no_legacy_references(&repo, &config, &batch)
        .await
        .unwrap()
    else {
        panic!("empty table must verify clean");
    };
    let err = delete_legacy_objects(&storage, &config, &batch, &clean)
        .await
        .unwrap_err();

    assert!(matches!(err, MigrationError::Delete { id: 7, .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn dry_run_issues_no_writes() {
    let repo = MockAssetRepository::with_rows(ROWS);
    let storage = seeded_storage(ROWS);
    let mut config = test_config();
    config.dry_run = true;
    let batch = select_by_prefix(&repo, "image/").await.unwrap();

    assert_eq!(copy_objects(&storage, &config, &batch).await.unwrap(), 0);
    let outcome = update_paths(&repo, &config, &batch).await.unwrap();
    assert_eq!(outcome.updated, 0);

    let Verification::Clean(clean) = verify_no_legacy_references(&repo, &config, &batch)
        .await
        .unwrap()
    else {
        panic!("batch rows are ignored in dry-run");
    };
    assert_eq!(
        delete_legacy_objects(&storage, &config, &batch, &clean)
            .await
            .unwrap(),
        0
    );

    assert!(storage.calls().is_empty());
    assert!(repo.update_calls().is_empty());
    assert_eq!(repo.path_of(1).as_deref(), Some("image/a.png"));
}
