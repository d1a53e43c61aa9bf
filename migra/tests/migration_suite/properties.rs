// FICHIER : migra/tests/migration_suite/properties.rs

use crate::{comparable, find, fixture, fixtures, init_test_env, view, BLOGS_SEED, BLOGS_UPDATE, MESSAGES};
use migra::json_db::collections::COLLECTIONS_BUCKET;
use migra::json_db::migrations::{inverse, Direction, MIGRATIONS_BUCKET};

#[tokio::test]
async fn revert_restores_touched_attributes() {
    let env = init_test_env().await;
    env.migrator.apply(&fixture(BLOGS_SEED).await).await.unwrap();
    let before = find(&env, "blogs").await.unwrap();

    let update = fixture(BLOGS_UPDATE).await;
    env.migrator.apply(&update).await.unwrap();
    env.migrator.revert(&update).await.unwrap();

    let after = find(&env, "blogs").await.unwrap();
    assert_eq!(comparable(&after), comparable(&before));
    assert_eq!(after.created, before.created);
}

#[tokio::test]
async fn second_apply_is_a_noop() {
    let env = init_test_env().await;
    let records = fixtures().await;

    env.migrator.run(&records, Direction::Up).await.unwrap();
    let snapshot = find(&env, "blogs").await.unwrap();

    assert!(env.migrator.run(&records, Direction::Up).await.unwrap().is_empty());
    for record in &records {
        assert!(!env.migrator.apply(record).await.unwrap());
    }
    assert_eq!(find(&env, "blogs").await.unwrap(), snapshot);
    assert_eq!(env.migrator.applied().await.unwrap().len(), records.len());
}

#[tokio::test]
async fn create_then_delete_leaves_no_residue() {
    let env = init_test_env().await;
    let record = fixture(MESSAGES).await;

    env.migrator.apply(&record).await.unwrap();
    env.migrator.revert(&record).await.unwrap();

    let tm = env.migrator.tx_manager();
    let tx = view(&env);
    assert!(tm.list(&tx, COLLECTIONS_BUCKET).await.unwrap().is_empty());
    assert!(tm.list(&tx, MIGRATIONS_BUCKET).await.unwrap().is_empty());
    assert!(!env.cfg.document_path(COLLECTIONS_BUCKET, "c5h8xsxon7mwzi9").exists());

    // Ré-applicable après annulation
    assert!(env.migrator.apply(&record).await.unwrap());
}

#[tokio::test]
async fn shipped_records_are_their_own_inverse() {
    let env = init_test_env().await;
    // Magasin vide : chaque enregistrement part de l'état laissé par les précédents
    for (id, issues) in inverse::check_sequence(&env.migrator, &fixtures().await).await.unwrap() {
        assert!(issues.is_empty(), "{} : {:?}", id, issues);
    }
    assert!(env.migrator.applied().await.unwrap().is_empty());

    for record in fixtures().await {
        assert!(
            inverse::check_structural(&record).is_empty(),
            "{} : down ne s'apparie pas à up",
            record.id
        );
        let issues = inverse::check_roundtrip(&env.migrator, &record).await.unwrap();
        assert!(issues.is_empty(), "{} : {:?}", record.id, issues);

        env.migrator.apply(&record).await.unwrap();
        let issues = inverse::check_roundtrip(&env.migrator, &record).await.unwrap();
        assert!(issues.is_empty(), "{} (appliquée) : {:?}", record.id, issues);
    }
}
