// FICHIER : migra/src/json_db/transactions/manager.rs

use crate::json_db::storage::{file_storage, StorageEngine};
use crate::json_db::transactions::{wal, ActiveTransaction, Operation, TransactionRecord};
use crate::utils::{AppError, Result};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Point d'entrée des lectures/écritures transactionnelles du magasin.
#[derive(Debug, Clone)]
pub struct TransactionManager {
    storage: StorageEngine,
}

impl TransactionManager {
    pub fn new(storage: StorageEngine) -> Self {
        Self { storage }
    }

    /// Crée l'arborescence si besoin puis rejoue le WAL laissé par un crash.
    pub async fn open(storage: StorageEngine) -> Result<Self> {
        file_storage::create_db(&storage.config).await?;
        let manager = Self::new(storage);
        let recovered = manager.recover().await?;
        if recovered > 0 {
            warn!(recovered, "♻️ Transactions interrompues annulées");
        }
        Ok(manager)
    }

    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    pub fn begin(&self) -> ActiveTransaction {
        ActiveTransaction::new()
    }

    // --- LECTURES (vue transactionnelle) ---

    pub async fn read(
        &self,
        tx: &ActiveTransaction,
        bucket: &str,
        id: &str,
    ) -> Result<Option<Value>> {
        match tx.staged(bucket, id) {
            Some(staged) => Ok(staged.cloned()),
            None => self.storage.read_document(bucket, id).await,
        }
    }

    /// Tous les documents d'un bucket vus par la transaction, triés par id.
    pub async fn list(&self, tx: &ActiveTransaction, bucket: &str) -> Result<Vec<(String, Value)>> {
        let mut ids = self.storage.list_ids(bucket).await?;
        for id in tx.touched_ids(bucket) {
            if !ids.iter().any(|i| i == id) {
                ids.push(id.to_string());
            }
        }
        ids.sort();

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.read(tx, bucket, &id).await? {
                out.push((id, doc));
            }
        }
        Ok(out)
    }

    // --- ÉCRITURES (staging) ---

    pub async fn stage_put(
        &self,
        tx: &mut ActiveTransaction,
        bucket: &str,
        id: &str,
        doc: Value,
    ) -> Result<()> {
        let old = self.read(tx, bucket, id).await?;
        tx.add_put(bucket, id, old, doc);
        Ok(())
    }

    pub async fn stage_delete(&self, tx: &mut ActiveTransaction, bucket: &str, id: &str) -> Result<()> {
        let old = self.read(tx, bucket, id).await?;
        tx.add_delete(bucket, id, old);
        Ok(())
    }

    // --- COMMIT ---

    /// WAL -> application -> purge du WAL. En cas d'échec pendant
    /// l'application, les opérations déjà écrites sont défaites.
    pub async fn commit(&self, tx: ActiveTransaction) -> Result<()> {
        if tx.is_empty() {
            return Ok(());
        }
        let record = tx.to_record();
        wal::write_entry(&self.storage.config, &record).await?;

        let mut applied = 0;
        for op in &record.operations {
            if let Err(e) = self.apply_operation(op).await {
                error!(tx = %record.id, error = %e, "❌ Commit interrompu, annulation");
                self.undo(&record.operations[..applied]).await?;
                wal::remove_entry(&self.storage.config, &record.id).await?;
                return Err(AppError::Database(format!(
                    "Commit de la transaction {} annulé : {}",
                    record.id, e
                )));
            }
            applied += 1;
        }

        wal::remove_entry(&self.storage.config, &record.id).await?;
        debug!(tx = %record.id, operations = applied, "Transaction validée");
        Ok(())
    }

    async fn apply_operation(&self, op: &Operation) -> Result<()> {
        match op {
            Operation::Put {
                bucket,
                id,
                new_document,
                ..
            } => self.storage.write_document(bucket, id, new_document).await,
            Operation::Delete { bucket, id, .. } => self.storage.delete_document(bucket, id).await,
        }
    }

    /// Restaure les images avant, de la dernière opération à la première.
    async fn undo(&self, operations: &[Operation]) -> Result<()> {
        for op in operations.iter().rev() {
            let (bucket, id) = op.key();
            match op.old_document() {
                Some(old) => self.storage.write_document(bucket, id, old).await?,
                None => self.storage.delete_document(bucket, id).await?,
            }
        }
        Ok(())
    }

    /// Annule les transactions restées `pending` dans le WAL.
    pub async fn recover(&self) -> Result<usize> {
        let pending = wal::list_pending(&self.storage.config).await?;
        for tx_id in &pending {
            let record: TransactionRecord = wal::read_entry(&self.storage.config, tx_id).await?;
            info!(tx = %tx_id, operations = record.operations.len(), "♻️ Rollback WAL");
            self.undo(&record.operations).await?;
            wal::remove_entry(&self.storage.config, tx_id).await?;
        }
        if !pending.is_empty() {
            self.storage.cache.clear();
        }
        Ok(pending.len())
    }
}
