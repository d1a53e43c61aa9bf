// Déclaration des modules disponibles dans le CLI

pub mod collections;
pub mod migrate;

use migra::json_db::migrations::Migrator;
use migra::json_db::storage::{JsonDbConfig, StorageEngine};
use migra::utils::AppConfig;
use std::path::PathBuf;

/// Chemins effectifs : arguments CLI, sinon configuration.
#[derive(Debug, Clone)]
pub struct Context {
    pub data_root: PathBuf,
    pub migrations_dir: PathBuf,
    pub cache_capacity: usize,
}

impl Context {
    pub fn resolve(config: &AppConfig, root: Option<PathBuf>, migrations: Option<PathBuf>) -> Self {
        Self {
            data_root: root.unwrap_or_else(|| config.data_root.clone()),
            migrations_dir: migrations.unwrap_or_else(|| config.migrations_dir.clone()),
            cache_capacity: config.cache_capacity,
        }
    }

    pub async fn open_migrator(&self) -> anyhow::Result<Migrator> {
        let storage = StorageEngine::with_capacity(
            JsonDbConfig::new(self.data_root.clone()),
            self.cache_capacity,
        );
        Ok(Migrator::open(storage).await?)
    }
}
