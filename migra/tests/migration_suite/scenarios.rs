// FICHIER : migra/tests/migration_suite/scenarios.rs

use crate::{find, fixture, fixtures, init_test_env, BLOGS_SEED, BLOGS_UPDATE, MESSAGES};
use migra::json_db::collections::{FieldType, RuleKind};
use migra::json_db::migrations::Direction;

#[tokio::test]
async fn messages_created_then_removed() {
    let env = init_test_env().await;
    let record = fixture(MESSAGES).await;

    assert!(env.migrator.apply(&record).await.unwrap());

    let messages = find(&env, "messages").await.expect("messages doit exister");
    assert_eq!(messages.id, "c5h8xsxon7mwzi9");
    assert_eq!(messages.created, "2025-09-07 06:56:24.219Z");
    assert!(RuleKind::ALL.iter().all(|k| messages.rule(*k).is_none()));

    let fields: Vec<(&str, FieldType)> = messages
        .schema
        .fields()
        .iter()
        .map(|f| (f.name.as_str(), f.kind))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("name", FieldType::Text),
            ("email", FieldType::Email),
            ("subject", FieldType::Text),
            ("field", FieldType::Text),
        ]
    );

    assert!(env.migrator.revert(&record).await.unwrap());
    assert!(find(&env, "c5h8xsxon7mwzi9").await.is_none());
}

#[tokio::test]
async fn blogs_rules_published_and_slug_removed() {
    let env = init_test_env().await;
    env.migrator.apply(&fixture(BLOGS_SEED).await).await.unwrap();
    let update = fixture(BLOGS_UPDATE).await;

    env.migrator.apply(&update).await.unwrap();
    let blogs = find(&env, "qmac9ll75q9gbmc").await.unwrap();
    assert_eq!(blogs.list_rule.as_deref(), Some("status = \"published\""));
    assert_eq!(blogs.view_rule.as_deref(), Some("status = \"published\""));
    assert!(blogs.schema.get_field_by_id("ni1o0wjz").is_none());
    assert!(blogs.schema.get_field_by_name("slug").is_none());

    env.migrator.revert(&update).await.unwrap();
    let blogs = find(&env, "blogs").await.unwrap();
    assert!(blogs.list_rule.is_none());
    assert!(blogs.view_rule.is_none());

    let slug = blogs.schema.get_field_by_id("ni1o0wjz").expect("slug restauré");
    assert_eq!(slug.name, "slug");
    assert_eq!(slug.kind, FieldType::Text);
    assert!(slug.required);
    assert!(!slug.unique);
}

#[tokio::test]
async fn full_directory_up_then_down() {
    let env = init_test_env().await;
    let records = fixtures().await;

    let done = env.migrator.run(&records, Direction::Up).await.unwrap();
    assert_eq!(done, vec![BLOGS_SEED, BLOGS_UPDATE, MESSAGES]);

    let names: Vec<String> = env
        .migrator
        .collections()
        .list_collections(&crate::view(&env))
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["blogs", "messages"]);

    let done = env.migrator.run(&records, Direction::Down).await.unwrap();
    assert_eq!(done, vec![MESSAGES, BLOGS_UPDATE, BLOGS_SEED]);
    assert!(env.migrator.applied().await.unwrap().is_empty());
    assert!(find(&env, "blogs").await.is_none());
}
