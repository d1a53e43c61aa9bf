// FICHIER : migra/src/utils/fs.rs

use crate::utils::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

pub use std::path::{Path, PathBuf};

pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Crée le dossier s'il n'existe pas.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !exists(path).await {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}

#[instrument(skip(path), fields(path = ?path))]
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = match fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "Fichier JSON introuvable : {}",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_str(&content)?)
}

// --- ÉCRITURE ATOMIQUE ---

/// Écriture atomique sécurisée (write -> sync -> rename)
#[instrument(skip(content, path), fields(path = ?path))]
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(content).await?;
        // On force l'écriture physique avant le rename
        file.sync_all().await?;
    }

    fs::rename(&tmp_path, path).await?;
    Ok(())
}

pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_atomic(path, content.as_bytes()).await
}

/// Supprime un fichier ; absent = succès.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Liste les fichiers `*.json` d'un dossier (noms sans extension, triés).
/// Les fichiers commençant par `_` sont des métadonnées et sont ignorés.
pub async fn list_json_stems(dir: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    if !exists(dir).await {
        return Ok(out);
    }
    let mut entries = fs::read_dir(dir).await?;
    while let Some(e) = entries.next_entry().await? {
        let p = e.path();
        if p.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = p.file_stem().and_then(|s| s.to_str()) {
            if !stem.starts_with('_') {
                out.push(stem.to_string());
            }
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_atomic_write_and_read_json() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nested/doc.json");

        write_json_atomic(&file_path, &json!({"name": "messages"}))
            .await
            .unwrap();
        assert!(exists(&file_path).await);
        assert!(!exists(&file_path.with_extension("tmp")).await);

        let v: Value = read_json(&file_path).await.unwrap();
        assert_eq!(v["name"], "messages");
    }

    #[tokio::test]
    async fn test_read_json_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let res: Result<Value> = read_json(&dir.path().join("absent.json")).await;
        assert!(matches!(res, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_json_stems_skips_meta_and_other_files() {
        let dir = tempdir().unwrap();
        for name in ["b.json", "a.json", "_meta.json", "notes.txt"] {
            tokio::fs::write(dir.path().join(name), "{}").await.unwrap();
        }
        let stems = list_json_stems(dir.path()).await.unwrap();
        assert_eq!(stems, vec!["a", "b"]);

        remove_file(&dir.path().join("a.json")).await.unwrap();
        remove_file(&dir.path().join("a.json")).await.unwrap();
        assert_eq!(list_json_stems(dir.path()).await.unwrap(), vec!["b"]);
    }
}
