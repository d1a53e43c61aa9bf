use super::{Operation, TransactionRecord};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Une transaction active en cours de construction (Staging Area).
/// Rien n'atteint le disque avant `TransactionManager::commit` ;
/// abandonner la valeur revient à annuler la transaction.
#[derive(Debug)]
pub struct ActiveTransaction {
    pub id: String,
    pub operations: Vec<Operation>,
    created_at: i64,
}

impl Default for ActiveTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveTransaction {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operations: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn add_put(&mut self, bucket: &str, id: &str, old: Option<Value>, new: Value) {
        self.operations.push(Operation::Put {
            bucket: bucket.to_string(),
            id: id.to_string(),
            old_document: old,
            new_document: new,
        });
    }

    pub fn add_delete(&mut self, bucket: &str, id: &str, old: Option<Value>) {
        self.operations.push(Operation::Delete {
            bucket: bucket.to_string(),
            id: id.to_string(),
            old_document: old,
        });
    }

    /// État vu par la transaction pour une clé :
    /// `None` = non touchée, `Some(None)` = supprimée, `Some(Some(doc))` = écrite.
    pub fn staged(&self, bucket: &str, id: &str) -> Option<Option<&Value>> {
        self.operations
            .iter()
            .rev()
            .find(|op| op.key() == (bucket, id))
            .map(|op| match op {
                Operation::Put { new_document, .. } => Some(new_document),
                Operation::Delete { .. } => None,
            })
    }

    /// Ids touchés dans un bucket, dans l'ordre de première apparition.
    pub fn touched_ids(&self, bucket: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for op in &self.operations {
            let (b, id) = op.key();
            if b == bucket && !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Convertit la transaction active en enregistrement immuable pour le WAL
    pub fn to_record(&self) -> TransactionRecord {
        TransactionRecord {
            id: self.id.clone(),
            operations: self.operations.clone(),
            started_at: self.created_at,
        }
    }
}
