// FICHIER : migra/src/json_db/migrations/loader.rs

//! Lecture des fichiers `<id>.json` d'un dossier de migrations.

use super::{Migration, MigrationStep, MigrationVersion};
use crate::utils::fs::{self, Path, PathBuf};
use crate::utils::{AppError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Contenu d'un fichier ; l'identifiant est le nom du fichier.
#[derive(Debug, Serialize, Deserialize)]
struct MigrationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    up: Vec<MigrationStep>,
    #[serde(default)]
    down: Vec<MigrationStep>,
}

/// Charge toutes les migrations du dossier, triées par version.
/// Un dossier absent donne une liste vide.
pub async fn load_dir(dir: &Path) -> Result<Vec<Migration>> {
    let mut loaded = Vec::new();
    for stem in fs::list_json_stems(dir).await? {
        let path = dir.join(format!("{}.json", stem));
        let version = MigrationVersion::parse(&stem).map_err(|e| {
            AppError::Validation(format!("{} : {}", path.display(), e))
        })?;
        let file: MigrationFile = fs::read_json(&path).await.map_err(|e| {
            AppError::Validation(format!("Fichier de migration illisible {} : {}", path.display(), e))
        })?;

        debug!(id = %stem, up = file.up.len(), down = file.down.len(), "Migration chargée");
        loaded.push((
            version,
            Migration {
                id: stem,
                description: file.description,
                up: file.up,
                down: file.down,
            },
        ));
    }
    loaded.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(loaded.into_iter().map(|(_, m)| m).collect())
}

/// Crée un enregistrement vide `<maintenant>_<name>.json` et renvoie son chemin.
pub async fn create_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let id = format!("{}_{}", Utc::now().timestamp(), name);
    MigrationVersion::parse(&id)?;

    let path = dir.join(format!("{}.json", id));
    if fs::exists(&path).await {
        return Err(AppError::Conflict(format!(
            "Le fichier de migration {} existe déjà",
            path.display()
        )));
    }

    let empty = MigrationFile {
        description: None,
        up: Vec::new(),
        down: Vec::new(),
    };
    fs::write_json_atomic(&path, &empty).await?;
    info!(id = %id, path = ?path, "📝 Migration créée");
    Ok(path)
}
