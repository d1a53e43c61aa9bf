// FICHIER : migra/tests/migration_suite.rs

use migra::json_db::collections::{Collection, Schema};
use migra::json_db::migrations::{loader, Migration, Migrator};
use migra::json_db::storage::{JsonDbConfig, StorageEngine};
use migra::json_db::transactions::ActiveTransaction;
use migra::utils::fs::PathBuf;
use std::sync::Once;

// --- DÉCLARATION EXPLICITE DES MODULES ---

#[path = "migration_suite/scenarios.rs"]
pub mod scenarios;

#[path = "migration_suite/properties.rs"]
pub mod properties;

#[path = "migration_suite/failures.rs"]
pub mod failures;

// --- ENVIRONNEMENT DE TEST (Commun à tous) ---

static INIT: Once = Once::new();

pub const BLOGS_SEED: &str = "1756990000_created_blogs";
pub const BLOGS_UPDATE: &str = "1757007467_updated_blogs";
pub const MESSAGES: &str = "1757228184_created_messages";

pub struct TestEnv {
    pub cfg: JsonDbConfig,
    pub migrator: Migrator,
    pub _tmp_dir: tempfile::TempDir,
}

pub async fn init_test_env() -> TestEnv {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .with_test_writer()
            .try_init();
    });

    let tmp_dir = tempfile::tempdir().expect("create temp dir");
    let cfg = JsonDbConfig::new(tmp_dir.path().join("mg_data"));
    let migrator = Migrator::open(StorageEngine::new(cfg.clone()))
        .await
        .expect("open migrator");

    TestEnv {
        cfg,
        migrator,
        _tmp_dir: tmp_dir,
    }
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations")
}

/// Les enregistrements livrés avec le dépôt, triés.
pub async fn fixtures() -> Vec<Migration> {
    loader::load_dir(&fixtures_dir()).await.expect("load fixtures")
}

pub async fn fixture(id: &str) -> Migration {
    fixtures()
        .await
        .into_iter()
        .find(|m| m.id == id)
        .unwrap_or_else(|| panic!("fixture {} absente", id))
}

pub fn view(env: &TestEnv) -> ActiveTransaction {
    env.migrator.tx_manager().begin()
}

pub async fn find(env: &TestEnv, key: &str) -> Option<Collection> {
    env.migrator
        .collections()
        .find_collection_by_name_or_id(&view(env), key)
        .await
        .ok()
}

/// Forme comparable : sans `updated`, champs triés par id.
pub fn comparable(col: &Collection) -> Collection {
    let mut out = col.clone();
    out.updated.clear();
    let mut fields = out.schema.fields().to_vec();
    fields.sort_by(|a, b| a.id.cmp(&b.id));
    out.schema = Schema::new(fields);
    out
}
