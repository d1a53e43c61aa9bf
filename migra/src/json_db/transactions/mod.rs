//! Gestion des transactions : staging en mémoire, WAL, commit atomique.

pub mod lock;
pub mod manager;
pub mod transaction;
pub mod wal;

pub use manager::TransactionManager;
pub use transaction::ActiveTransaction;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opération élémentaire sur un bucket, avec son image avant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    Put {
        bucket: String,
        id: String,
        old_document: Option<Value>,
        new_document: Value,
    },
    #[serde(rename_all = "camelCase")]
    Delete {
        bucket: String,
        id: String,
        old_document: Option<Value>,
    },
}

impl Operation {
    pub fn key(&self) -> (&str, &str) {
        match self {
            Operation::Put { bucket, id, .. } | Operation::Delete { bucket, id, .. } => {
                (bucket.as_str(), id.as_str())
            }
        }
    }

    pub fn old_document(&self) -> Option<&Value> {
        match self {
            Operation::Put { old_document, .. } | Operation::Delete { old_document, .. } => {
                old_document.as_ref()
            }
        }
    }
}

/// Enregistrement immuable écrit dans le WAL. Sa seule présence signale
/// une transaction non terminée.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub operations: Vec<Operation>,
    pub started_at: i64,
}
