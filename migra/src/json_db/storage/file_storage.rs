// FICHIER : migra/src/json_db/storage/file_storage.rs

use crate::json_db::storage::JsonDbConfig;
use crate::utils::fs;
use crate::utils::{AppError, Result};
use serde_json::Value;

/// Crée l'arborescence physique du magasin (idempotent).
pub async fn create_db(config: &JsonDbConfig) -> Result<()> {
    fs::ensure_dir(&config.collections_root()).await?;
    fs::ensure_dir(&config.wal_root()).await?;
    Ok(())
}

pub async fn write_document(
    config: &JsonDbConfig,
    bucket: &str,
    id: &str,
    doc: &Value,
) -> Result<()> {
    fs::write_json_atomic(&config.document_path(bucket, id), doc).await
}

pub async fn read_document(config: &JsonDbConfig, bucket: &str, id: &str) -> Result<Option<Value>> {
    match fs::read_json(&config.document_path(bucket, id)).await {
        Ok(doc) => Ok(Some(doc)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn delete_document(config: &JsonDbConfig, bucket: &str, id: &str) -> Result<()> {
    fs::remove_file(&config.document_path(bucket, id)).await
}

pub async fn list_document_ids(config: &JsonDbConfig, bucket: &str) -> Result<Vec<String>> {
    fs::list_json_stems(&config.bucket_path(bucket)).await
}
