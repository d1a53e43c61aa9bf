// FICHIER : migra/src/json_db/transactions/lock.rs

//! Verrou inter-processus : un seul migrateur actif par magasin.

use crate::json_db::storage::JsonDbConfig;
use crate::utils::{AppError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Au-delà, un verrou est considéré comme abandonné par un processus mort.
const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
pub struct MigrationLock {
    path: PathBuf,
}

impl MigrationLock {
    pub fn acquire(config: &JsonDbConfig) -> Result<Self> {
        let path = config.lock_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match Self::create(&path) {
            Err(AppError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                if !Self::is_stale(&path) {
                    return Err(AppError::Database(format!(
                        "Migration déjà en cours (verrou {})",
                        path.display()
                    )));
                }
                tracing::warn!(path = ?path, "⚠️ Verrou de migration périmé, suppression");
                fs::remove_file(&path)?;
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "pid:{}", std::process::id())?;
        writeln!(file, "time:{}", chrono::Utc::now().to_rfc3339())?;
        Ok(Self { path: path.to_path_buf() })
    }

    fn is_stale(path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|modified| modified.elapsed().unwrap_or_default() > STALE_AFTER)
            .unwrap_or(false)
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = ?self.path, error = %e, "Libération du verrou impossible");
        }
    }
}
