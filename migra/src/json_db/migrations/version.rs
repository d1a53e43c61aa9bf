// FICHIER : migra/src/json_db/migrations/version.rs

use crate::utils::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifiant de migration `<secondes unix>_<nom>`, ordonné par horodatage
/// puis par nom.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MigrationVersion {
    timestamp: u64,
    name: String,
    raw: String,
}

impl MigrationVersion {
    pub fn parse(id: &str) -> Result<Self> {
        let Some((ts, name)) = id.split_once('_') else {
            return Err(AppError::Validation(format!(
                "Identifiant de migration '{}' invalide (attendu : <timestamp>_<nom>)",
                id
            )));
        };

        let timestamp: u64 = ts.parse().map_err(|_| {
            AppError::Validation(format!(
                "Horodatage '{}' invalide dans l'identifiant '{}'",
                ts, id
            ))
        })?;

        let valid_name =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(AppError::Validation(format!(
                "Nom '{}' invalide dans l'identifiant '{}'",
                name, id
            )));
        }

        Ok(Self {
            timestamp,
            name: name.to_string(),
            raw: id.to_string(),
        })
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// Tri des migrations
impl Ord for MigrationVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for MigrationVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// ============================================================================
// TESTS UNITAIRES
// ============================================================================
