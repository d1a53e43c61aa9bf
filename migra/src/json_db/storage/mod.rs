// FICHIER : migra/src/json_db/storage/mod.rs

pub mod cache;
pub mod file_storage;

use crate::utils::config::DEFAULT_CACHE_CAPACITY;
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

// --- CONFIGURATION ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDbConfig {
    pub data_root: PathBuf,
}

impl JsonDbConfig {
    pub fn new(data_root: PathBuf) -> Self {
        Self { data_root }
    }

    /// Racine des buckets : {data_root}/collections
    pub fn collections_root(&self) -> PathBuf {
        self.data_root.join("collections")
    }

    pub fn bucket_path(&self, bucket: &str) -> PathBuf {
        self.collections_root().join(bucket)
    }

    /// Fichier d'un document : {bucket}/{id}.json
    pub fn document_path(&self, bucket: &str, id: &str) -> PathBuf {
        self.bucket_path(bucket).join(format!("{id}.json"))
    }

    pub fn wal_root(&self) -> PathBuf {
        self.data_root.join("wal")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.data_root.join(".migrate.lock")
    }
}

// --- MOTEUR DE STOCKAGE ---

#[derive(Debug, Clone)]
pub struct StorageEngine {
    pub config: JsonDbConfig,
    pub cache: cache::Cache<String, Value>,
}

fn cache_key(bucket: &str, id: &str) -> String {
    format!("{}/{}", bucket, id)
}

impl StorageEngine {
    pub fn new(config: JsonDbConfig) -> Self {
        Self::with_capacity(config, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(config: JsonDbConfig, capacity: usize) -> Self {
        Self {
            config,
            cache: cache::Cache::new(capacity),
        }
    }

    /// Écrit un document (Disque + Cache)
    pub async fn write_document(&self, bucket: &str, id: &str, doc: &Value) -> Result<()> {
        file_storage::write_document(&self.config, bucket, id, doc).await?;
        self.cache.put(cache_key(bucket, id), doc.clone());
        Ok(())
    }

    /// Lit un document (Cache d'abord, sinon Disque)
    pub async fn read_document(&self, bucket: &str, id: &str) -> Result<Option<Value>> {
        let key = cache_key(bucket, id);
        if let Some(doc) = self.cache.get(&key) {
            return Ok(Some(doc));
        }

        let doc_opt = file_storage::read_document(&self.config, bucket, id).await?;
        if let Some(doc) = &doc_opt {
            self.cache.put(key, doc.clone());
        }
        Ok(doc_opt)
    }

    pub async fn delete_document(&self, bucket: &str, id: &str) -> Result<()> {
        file_storage::delete_document(&self.config, bucket, id).await?;
        self.cache.remove(&cache_key(bucket, id));
        Ok(())
    }

    pub async fn list_ids(&self, bucket: &str) -> Result<Vec<String>> {
        file_storage::list_document_ids(&self.config, bucket).await
    }
}
