// FICHIER : migra/src/json_db/migrations/inverse.rs

//! Vérifie qu'un `down` défait bien son `up`, statiquement (appariement
//! des étapes) et dynamiquement (aller-retour dans une transaction jamais
//! validée).

use super::migrator::Migrator;
use super::{Migration, MigrationStep};
use crate::json_db::collections::{Collection, Schema};
use crate::json_db::transactions::ActiveTransaction;
use crate::utils::{AppError, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InverseIssue {
    /// Index de l'étape `up` concernée, si l'anomalie est localisée.
    pub step: Option<usize>,
    pub message: String,
}

impl InverseIssue {
    fn at(step: usize, message: String) -> Self {
        Self {
            step: Some(step),
            message,
        }
    }

    fn global(message: String) -> Self {
        Self {
            step: None,
            message,
        }
    }
}

impl fmt::Display for InverseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(i) => write!(f, "étape {} : {}", i, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// --- VÉRIFICATION STATIQUE ---

/// `down` lu à l'envers doit apparier chaque étape de `up` avec son inverse.
pub fn check_structural(migration: &Migration) -> Vec<InverseIssue> {
    let mut issues = Vec::new();
    if migration.up.len() != migration.down.len() {
        issues.push(InverseIssue::global(format!(
            "{} étape(s) up pour {} étape(s) down",
            migration.up.len(),
            migration.down.len()
        )));
    }

    for (i, (up, down)) in migration
        .up
        .iter()
        .zip(migration.down.iter().rev())
        .enumerate()
    {
        if !is_inverse(up, down) {
            issues.push(InverseIssue::at(
                i,
                format!("{} n'est pas défait par {}", up, down),
            ));
        }
    }
    issues
}

fn same_key(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn is_inverse(up: &MigrationStep, down: &MigrationStep) -> bool {
    use MigrationStep::*;
    match (up, down) {
        (CreateCollection { collection: c }, DeleteCollection { collection: key })
        | (DeleteCollection { collection: key }, CreateCollection { collection: c }) => {
            same_key(&c.id, key) || same_key(&c.name, key)
        }
        (
            AddField {
                collection: a,
                field,
            },
            RemoveField {
                collection: b,
                field_id,
            },
        )
        | (
            RemoveField {
                collection: a,
                field_id,
            },
            AddField {
                collection: b,
                field,
            },
        ) => same_key(a, b) && field.id == *field_id,
        (
            SetRule {
                collection: a,
                rule: ra,
                ..
            },
            SetRule {
                collection: b,
                rule: rb,
                ..
            },
        ) => same_key(a, b) && ra == rb,
        (
            RenameCollection {
                collection: a,
                name,
            },
            RenameCollection { collection: b, .. },
        ) => same_key(a, b) || same_key(name, b),
        (AddIndex { collection: a, index: ia }, DropIndex { collection: b, index: ib })
        | (DropIndex { collection: a, index: ia }, AddIndex { collection: b, index: ib }) => {
            same_key(a, b) && ia.trim() == ib.trim()
        }
        _ => false,
    }
}

// --- VÉRIFICATION DYNAMIQUE ---

/// Joue `up` puis `down` (ou `down` puis `up` si la migration est déjà
/// appliquée) dans une transaction abandonnée ensuite, et compare chaque
/// collection à son état initial. Les horodatages et l'ordre des champs ne
/// comptent pas.
pub async fn check_roundtrip(
    migrator: &Migrator,
    migration: &Migration,
) -> Result<Vec<InverseIssue>> {
    let applied = migrator.is_applied(&migration.id).await?;
    let mut tx = migrator.tx_manager().begin();
    let issues = roundtrip_in(migrator, &mut tx, migration, applied)
        .await
        .map_err(|e| AppError::in_migration(&migration.id, e))?;
    // Jamais validée
    drop(tx);
    Ok(issues)
}

/// Aller-retour de chaque enregistrement, dans l'ordre donné, au sein d'une
/// seule transaction jamais validée. Les `up` des enregistrements non
/// appliqués y sont rejoués : chacun part de l'état que lui laisseraient ses
/// prédécesseurs. Un aller-retour impossible compte comme une anomalie.
pub async fn check_sequence(
    migrator: &Migrator,
    migrations: &[Migration],
) -> Result<Vec<(String, Vec<InverseIssue>)>> {
    let mut tx = migrator.tx_manager().begin();
    let mut out = Vec::with_capacity(migrations.len());

    for migration in migrations {
        let applied = migrator.is_applied(&migration.id).await?;
        let mark = tx.operations.len();

        let mut issues = match roundtrip_in(migrator, &mut tx, migration, applied).await {
            Ok(found) => found,
            Err(e) => {
                tx.operations.truncate(mark);
                vec![InverseIssue::global(format!("aller-retour impossible : {}", e))]
            }
        };

        if !applied {
            let mark = tx.operations.len();
            if let Err(e) = migrator.execute_steps(&mut tx, &migration.up).await {
                tx.operations.truncate(mark);
                issues.push(InverseIssue::global(format!("up non rejouable : {}", e)));
            }
        }
        debug!(id = %migration.id, issues = issues.len(), "Aller-retour vérifié");
        out.push((migration.id.clone(), issues));
    }
    drop(tx);
    Ok(out)
}

async fn roundtrip_in(
    migrator: &Migrator,
    tx: &mut ActiveTransaction,
    migration: &Migration,
    applied: bool,
) -> Result<Vec<InverseIssue>> {
    let (first, second) = if applied {
        (&migration.down, &migration.up)
    } else {
        (&migration.up, &migration.down)
    };

    let before = snapshot(migrator, tx).await?;
    migrator.execute_steps(tx, first).await?;
    migrator.execute_steps(tx, second).await?;
    let after = snapshot(migrator, tx).await?;
    Ok(compare(&before, &after))
}

async fn snapshot(migrator: &Migrator, tx: &ActiveTransaction) -> Result<BTreeMap<String, Value>> {
    let mut out = BTreeMap::new();
    for col in migrator.collections().list_collections(tx).await? {
        out.insert(col.id.clone(), normalized(col)?);
    }
    Ok(out)
}

fn normalized(mut col: Collection) -> Result<Value> {
    col.created.clear();
    col.updated.clear();
    let mut fields = col.schema.fields().to_vec();
    fields.sort_by(|a, b| a.id.cmp(&b.id));
    col.schema = Schema::new(fields);
    Ok(serde_json::to_value(col)?)
}

fn compare(before: &BTreeMap<String, Value>, after: &BTreeMap<String, Value>) -> Vec<InverseIssue> {
    let ids: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    let mut issues = Vec::new();
    for id in ids {
        match (before.get(id), after.get(id)) {
            (None, None) => {}
            (Some(_), None) => {
                issues.push(InverseIssue::global(format!("collection '{}' perdue", id)))
            }
            (None, Some(_)) => issues.push(InverseIssue::global(format!(
                "collection '{}' subsiste après l'aller-retour",
                id
            ))),
            (Some(b), Some(a)) => {
                for key in differing_keys(b, a) {
                    issues.push(InverseIssue::global(format!(
                        "collection '{}' : attribut '{}' non restauré",
                        id, key
                    )));
                }
            }
        }
    }
    issues
}

fn differing_keys(before: &Value, after: &Value) -> Vec<String> {
    let (Some(b), Some(a)) = (before.as_object(), after.as_object()) else {
        return vec!["*".to_string()];
    };
    let mut keys: Vec<String> = b
        .keys()
        .chain(a.keys())
        .filter(|k| b.get(*k) != a.get(*k))
        .cloned()
        .collect();
    keys.sort();
    keys.dedup();
    keys
}
