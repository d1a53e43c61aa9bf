// FICHIER : migra/src/utils/config.rs

use crate::utils::env;
use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Singleton global pour la configuration
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Nom du fichier de configuration recherché dans le dossier courant.
pub const CONFIG_FILE_NAME: &str = "migra.json";

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Configuration globale du moteur.
///
/// Ordre de résolution : valeurs par défaut, puis fichier JSON, puis
/// variables d'environnement `MIGRA_*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dossier des logs JSON ; `None` = console uniquement.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

// --- HELPERS SERDE ---

fn default_data_root() -> PathBuf {
    PathBuf::from("mg_data")
}
fn default_migrations_dir() -> PathBuf {
    PathBuf::from("mg_migrations")
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            migrations_dir: default_migrations_dir(),
            log_level: default_log_level(),
            log_dir: None,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl AppConfig {
    /// Initialise le singleton. Sans effet si déjà initialisé.
    pub fn init(path: Option<&Path>) -> Result<()> {
        if CONFIG.get().is_some() {
            return Ok(());
        }
        let config = Self::load(path)?;
        // Une course entre deux init garde la première valeur, ce qui est sans conséquence
        let _ = CONFIG.set(config);
        Ok(())
    }

    pub fn get() -> &'static AppConfig {
        CONFIG.get_or_init(AppConfig::default)
    }

    /// Charge une configuration sans toucher au singleton.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else if explicit {
            return Err(AppError::Config(format!(
                "Fichier de configuration introuvable : {}",
                path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Lecture impossible de {} : {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("Configuration invalide ({}) : {}", path.display(), e))
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env::get_optional("MIGRA_DATA_ROOT") {
            self.data_root = PathBuf::from(v);
        }
        if let Some(v) = env::get_optional("MIGRA_MIGRATIONS_DIR") {
            self.migrations_dir = PathBuf::from(v);
        }
        self.log_level = env::get_or("MIGRA_LOG_LEVEL", &self.log_level);
        if let Some(v) = env::get_optional("MIGRA_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        if env::get_optional("MIGRA_CACHE_CAPACITY").is_some() {
            self.cache_capacity = env::get_parsed("MIGRA_CACHE_CAPACITY")?;
        }
        Ok(())
    }
}
