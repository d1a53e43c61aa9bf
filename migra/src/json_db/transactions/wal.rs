// FICHIER : migra/src/json_db/transactions/wal.rs

use crate::json_db::storage::JsonDbConfig;
use crate::json_db::transactions::TransactionRecord;
use crate::utils::fs;
use crate::utils::Result;
use std::path::PathBuf;

fn entry_path(config: &JsonDbConfig, tx_id: &str) -> PathBuf {
    config.wal_root().join(format!("{}.json", tx_id))
}

/// Écrit une transaction dans le journal (Write Ahead Log)
pub async fn write_entry(config: &JsonDbConfig, record: &TransactionRecord) -> Result<()> {
    fs::write_json_atomic(&entry_path(config, &record.id), record).await
}

pub async fn read_entry(config: &JsonDbConfig, tx_id: &str) -> Result<TransactionRecord> {
    fs::read_json(&entry_path(config, tx_id)).await
}

/// Supprime une entrée du WAL (Commit ou Rollback terminé)
pub async fn remove_entry(config: &JsonDbConfig, tx_id: &str) -> Result<()> {
    fs::remove_file(&entry_path(config, tx_id)).await
}

/// Ids des transactions restées en attente (crash pendant un commit)
pub async fn list_pending(config: &JsonDbConfig) -> Result<Vec<String>> {
    fs::list_json_stems(&config.wal_root()).await
}
