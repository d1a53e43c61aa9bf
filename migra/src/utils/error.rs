use serde::Serialize;
use std::io;

/// Type de résultat standard du moteur de migrations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs.
///
/// Les trois premières variantes forment la taxonomie exposée aux auteurs de
/// migrations ; les autres couvrent la plomberie (disque, JSON, config).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Introuvable : {0}")]
    NotFound(String),

    #[error("Conflit : {0}")]
    Conflict(String),

    #[error("Validation : {0}")]
    Validation(String),

    #[error("Migration {id} en échec : {source}")]
    Migration {
        id: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur Base de Données : {0}")]
    Database(String),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    /// Enveloppe une erreur avec l'identifiant de la migration fautive.
    pub fn in_migration(id: impl Into<String>, source: AppError) -> Self {
        AppError::Migration {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Erreur d'origine, sans l'enveloppe `Migration`.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Migration { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), AppError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), AppError::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root(), AppError::Validation(_))
    }
}

// Sérialisé comme une simple chaîne (rapports JSON du CLI)
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
