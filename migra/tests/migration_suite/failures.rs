// FICHIER : migra/tests/migration_suite/failures.rs

use crate::{find, fixture, fixtures, fixtures_dir, init_test_env, BLOGS_SEED, BLOGS_UPDATE, MESSAGES};
use migra::json_db::collections::{Collection, CollectionKind, RuleKind, COLLECTIONS_BUCKET};
use migra::json_db::migrations::{loader, Direction, Migration, MigrationState, MigrationStep, Migrator};
use migra::json_db::storage::StorageEngine;
use migra::json_db::transactions::{wal, ActiveTransaction};
use migra::utils::AppError;
use serde_json::json;

fn failing_after_first_step() -> Migration {
    Migration::new(
        "1757100000_broken_blogs",
        vec![
            MigrationStep::SetRule {
                collection: "blogs".into(),
                rule: RuleKind::Create,
                value: Some("@request.auth.id != \"\"".into()),
            },
            MigrationStep::RemoveField {
                collection: "blogs".into(),
                field_id: "zzzzzzzz".into(),
            },
        ],
        vec![],
    )
}

#[tokio::test]
async fn failing_record_leaves_nothing_behind() {
    let env = init_test_env().await;
    env.migrator.apply(&fixture(BLOGS_SEED).await).await.unwrap();
    let before = find(&env, "blogs").await.unwrap();

    let broken = failing_after_first_step();
    let err = env.migrator.apply(&broken).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("1757100000_broken_blogs"));

    assert_eq!(find(&env, "blogs").await.unwrap(), before);
    assert!(!env.migrator.is_applied(&broken.id).await.unwrap());
}

#[tokio::test]
async fn earlier_records_stay_committed() {
    let env = init_test_env().await;
    let records = vec![
        fixture(BLOGS_SEED).await,
        failing_after_first_step(),
        fixture(MESSAGES).await,
    ];

    let err = env.migrator.run(&records, Direction::Up).await.unwrap_err();
    match &err {
        AppError::Migration { id, .. } => assert_eq!(id, "1757100000_broken_blogs"),
        other => panic!("erreur inattendue : {other}"),
    }

    assert!(env.migrator.is_applied(BLOGS_SEED).await.unwrap());
    assert!(!env.migrator.is_applied(MESSAGES).await.unwrap());
    assert!(find(&env, "messages").await.is_none());
}

#[tokio::test]
async fn missing_target_and_name_conflicts() {
    let env = init_test_env().await;

    // Pas de collection blogs : l'update échoue
    let err = env.migrator.apply(&fixture(BLOGS_UPDATE).await).await.unwrap_err();
    assert!(err.is_not_found());

    // Une autre collection occupe déjà le nom "Messages"
    let squatter = Collection::new("m3ss4g3s0000000", "Messages", CollectionKind::Base);
    let squat = Migration::new(
        "1757000000_squat_messages",
        vec![MigrationStep::CreateCollection {
            collection: Box::new(squatter),
        }],
        vec![],
    );
    env.migrator.apply(&squat).await.unwrap();

    let err = env.migrator.apply(&fixture(MESSAGES).await).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn edited_record_is_reported_modified() {
    let env = init_test_env().await;
    let dir = tempfile::tempdir().unwrap();
    for record in fixtures().await {
        let src = fixtures_dir().join(format!("{}.json", record.id));
        tokio::fs::copy(&src, dir.path().join(format!("{}.json", record.id)))
            .await
            .unwrap();
    }

    let records = loader::load_dir(dir.path()).await.unwrap();
    env.migrator.run(&records, Direction::Up).await.unwrap();

    let edited = json!({
        "up": [{ "op": "setRule", "collection": "qmac9ll75q9gbmc", "rule": "listRule", "value": "" }],
        "down": [{ "op": "setRule", "collection": "qmac9ll75q9gbmc", "rule": "listRule" }]
    });
    tokio::fs::write(
        dir.path().join(format!("{}.json", BLOGS_UPDATE)),
        serde_json::to_vec_pretty(&edited).unwrap(),
    )
    .await
    .unwrap();

    let records = loader::load_dir(dir.path()).await.unwrap();
    let report = env.migrator.status(&records).await.unwrap();
    assert_eq!(report.modified().collect::<Vec<_>>(), vec![BLOGS_UPDATE]);
    assert!(report
        .entries
        .iter()
        .any(|(id, s)| id == MESSAGES && matches!(s, MigrationState::Applied { .. })));
}

#[tokio::test]
async fn concurrent_runner_is_refused() {
    let env = init_test_env().await;
    let second = Migrator::open(StorageEngine::new(env.cfg.clone())).await;
    assert!(matches!(second, Err(AppError::Database(_))));
}

#[tokio::test]
async fn interrupted_commit_is_rolled_back_on_open() {
    let env = init_test_env().await;
    env.migrator.apply(&fixture(BLOGS_SEED).await).await.unwrap();
    let cfg = env.cfg.clone();
    let before = find(&env, "blogs").await.unwrap();
    drop(env.migrator);

    // WAL écrit, document modifié, marqueur jamais posé : crash simulé
    let mut changed = before.clone();
    changed.list_rule = Some("1 = 1".into());
    let mut tx = ActiveTransaction::new();
    tx.add_put(
        COLLECTIONS_BUCKET,
        &before.id,
        Some(serde_json::to_value(&before).unwrap()),
        serde_json::to_value(&changed).unwrap(),
    );
    wal::write_entry(&cfg, &tx.to_record())
        .await
        .unwrap();
    let storage = StorageEngine::new(cfg.clone());
    storage
        .write_document(COLLECTIONS_BUCKET, &before.id, &serde_json::to_value(&changed).unwrap())
        .await
        .unwrap();

    let migrator = Migrator::open(StorageEngine::new(cfg.clone())).await.unwrap();
    let tx = migrator.tx_manager().begin();
    let blogs = migrator
        .collections()
        .find_collection_by_name_or_id(&tx, "blogs")
        .await
        .unwrap();
    assert!(blogs.list_rule.is_none());
    assert!(wal::list_pending(&cfg).await.unwrap().is_empty());
}
