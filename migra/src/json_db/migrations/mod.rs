//! Système de migrations de schémas

pub mod inverse;
pub mod loader;
pub mod migrator;
pub mod version;

pub use migrator::{MigrationState, Migrator, StatusReport};
pub use version::MigrationVersion;

use crate::json_db::collections::{Collection, Field, RuleKind};
use crate::utils::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bucket du registre des migrations appliquées.
pub const MIGRATIONS_BUCKET: &str = "_migrations";

/// Enregistrement de migration : deux listes d'étapes, `down` défaisant `up`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Migration {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub up: Vec<MigrationStep>,
    pub down: Vec<MigrationStep>,
}

impl Migration {
    pub fn new(id: &str, up: Vec<MigrationStep>, down: Vec<MigrationStep>) -> Self {
        Self {
            id: id.to_string(),
            description: None,
            up,
            down,
        }
    }

    pub fn version(&self) -> Result<MigrationVersion> {
        MigrationVersion::parse(&self.id)
    }

    /// SHA-256 (hex) des étapes sérialisées. La description n'entre pas
    /// dans l'empreinte.
    pub fn checksum(&self) -> String {
        let body = serde_json::to_vec(&(&self.up, &self.down)).unwrap_or_default();
        hex::encode(Sha256::digest(&body))
    }

    pub fn steps(&self, direction: Direction) -> &[MigrationStep] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

/// Une étape élémentaire, au format `{"op": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MigrationStep {
    CreateCollection {
        collection: Box<Collection>,
    },
    DeleteCollection {
        collection: String,
    },
    AddField {
        collection: String,
        field: Field,
    },
    #[serde(rename_all = "camelCase")]
    RemoveField {
        collection: String,
        field_id: String,
    },
    SetRule {
        collection: String,
        rule: RuleKind,
        #[serde(default)]
        value: Option<String>,
    },
    RenameCollection {
        collection: String,
        name: String,
    },
    AddIndex {
        collection: String,
        index: String,
    },
    DropIndex {
        collection: String,
        index: String,
    },
}

impl MigrationStep {
    pub fn op_name(&self) -> &'static str {
        match self {
            MigrationStep::CreateCollection { .. } => "createCollection",
            MigrationStep::DeleteCollection { .. } => "deleteCollection",
            MigrationStep::AddField { .. } => "addField",
            MigrationStep::RemoveField { .. } => "removeField",
            MigrationStep::SetRule { .. } => "setRule",
            MigrationStep::RenameCollection { .. } => "renameCollection",
            MigrationStep::AddIndex { .. } => "addIndex",
            MigrationStep::DropIndex { .. } => "dropIndex",
        }
    }

    /// Clé (id ou nom) de la collection visée.
    pub fn target(&self) -> &str {
        match self {
            MigrationStep::CreateCollection { collection } => &collection.id,
            MigrationStep::DeleteCollection { collection }
            | MigrationStep::AddField { collection, .. }
            | MigrationStep::RemoveField { collection, .. }
            | MigrationStep::SetRule { collection, .. }
            | MigrationStep::RenameCollection { collection, .. }
            | MigrationStep::AddIndex { collection, .. }
            | MigrationStep::DropIndex { collection, .. } => collection,
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.op_name(), self.target())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Marqueur durable d'une migration appliquée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    pub id: String,
    pub checksum: String,
    pub applied_at: String,
    /// Rang d'application, départage deux marqueurs de la même milliseconde.
    #[serde(default)]
    pub seq: u64,
}
