// FICHIER : migra/src/json_db/migrations/migrator.rs

use super::version::MigrationVersion;
use super::{AppliedMigration, Direction, Migration, MigrationStep, MIGRATIONS_BUCKET};
use crate::json_db::collections::manager::CollectionsManager;
use crate::json_db::collections::now_timestamp;
use crate::json_db::storage::StorageEngine;
use crate::json_db::transactions::lock::MigrationLock;
use crate::json_db::transactions::{ActiveTransaction, TransactionManager};
use crate::utils::{AppError, Result};

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Applique les migrations, une transaction par enregistrement.
/// Détient le verrou du magasin pendant toute sa durée de vie.
pub struct Migrator {
    tx_manager: TransactionManager,
    _lock: MigrationLock,
}

/// État d'un enregistrement vis-à-vis du registre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum MigrationState {
    Pending,
    #[serde(rename_all = "camelCase")]
    Applied { applied_at: String },
    /// Appliqué, mais le fichier a changé depuis.
    #[serde(rename_all = "camelCase")]
    Modified { applied_at: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub entries: Vec<(String, MigrationState)>,
    /// Entrées du registre sans fichier correspondant.
    pub orphans: Vec<String>,
}

impl StatusReport {
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, s)| *s == MigrationState::Pending)
            .map(|(id, _)| id.as_str())
    }

    pub fn modified(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, MigrationState::Modified { .. }))
            .map(|(id, _)| id.as_str())
    }
}

impl Migrator {
    /// Prend le verrou, puis ouvre le magasin (rejeu du WAL compris).
    pub async fn open(storage: StorageEngine) -> Result<Self> {
        let lock = MigrationLock::acquire(&storage.config)?;
        let tx_manager = TransactionManager::open(storage).await?;
        Ok(Self {
            tx_manager,
            _lock: lock,
        })
    }

    pub fn tx_manager(&self) -> &TransactionManager {
        &self.tx_manager
    }

    pub fn collections(&self) -> CollectionsManager<'_> {
        CollectionsManager::new(&self.tx_manager)
    }

    // --- REGISTRE ---

    /// Entrées du registre, triées par version.
    pub async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        let tx = self.tx_manager.begin();
        let mut out = self.ledger(&tx).await?;
        out.sort_by(|a, b| by_version(&a.id, &b.id));
        Ok(out)
    }

    /// Entrées du registre dans l'ordre où elles ont été appliquées.
    /// `applied_at` a un format fixe : l'ordre des chaînes est celui du temps.
    pub async fn applied_in_order(&self) -> Result<Vec<AppliedMigration>> {
        let tx = self.tx_manager.begin();
        let mut out = self.ledger(&tx).await?;
        out.sort_by(|a, b| {
            a.applied_at
                .cmp(&b.applied_at)
                .then(a.seq.cmp(&b.seq))
                .then_with(|| by_version(&a.id, &b.id))
        });
        Ok(out)
    }

    async fn ledger(&self, tx: &ActiveTransaction) -> Result<Vec<AppliedMigration>> {
        let mut out = Vec::new();
        for (_, doc) in self.tx_manager.list(tx, MIGRATIONS_BUCKET).await? {
            out.push(serde_json::from_value::<AppliedMigration>(doc)?);
        }
        Ok(out)
    }

    pub async fn is_applied(&self, id: &str) -> Result<bool> {
        let tx = self.tx_manager.begin();
        Ok(self.tx_manager.read(&tx, MIGRATIONS_BUCKET, id).await?.is_some())
    }

    // --- APPLICATION UNITAIRE ---

    /// Exécute `up` et écrit le marqueur dans la même transaction.
    /// `Ok(false)` si la migration était déjà appliquée.
    #[instrument(skip(self, migration), fields(id = %migration.id))]
    pub async fn apply(&self, migration: &Migration) -> Result<bool> {
        self.apply_inner(migration)
            .await
            .map_err(|e| AppError::in_migration(&migration.id, e))
    }

    async fn apply_inner(&self, migration: &Migration) -> Result<bool> {
        let mut tx = self.tx_manager.begin();
        if self
            .tx_manager
            .read(&tx, MIGRATIONS_BUCKET, &migration.id)
            .await?
            .is_some()
        {
            debug!("Déjà appliquée, ignorée");
            return Ok(false);
        }

        let seq = self
            .ledger(&tx)
            .await?
            .iter()
            .map(|a| a.seq)
            .max()
            .unwrap_or(0)
            + 1;
        self.execute_steps(&mut tx, &migration.up).await?;

        let marker = AppliedMigration {
            id: migration.id.clone(),
            checksum: migration.checksum(),
            applied_at: now_timestamp(),
            seq,
        };
        self.tx_manager
            .stage_put(&mut tx, MIGRATIONS_BUCKET, &migration.id, serde_json::to_value(&marker)?)
            .await?;
        self.tx_manager.commit(tx).await?;

        info!(steps = migration.up.len(), "🚀 Migration appliquée");
        Ok(true)
    }

    /// Exécute `down` et retire le marqueur dans la même transaction.
    /// `Ok(false)` si la migration n'était pas appliquée.
    #[instrument(skip(self, migration), fields(id = %migration.id))]
    pub async fn revert(&self, migration: &Migration) -> Result<bool> {
        self.revert_inner(migration)
            .await
            .map_err(|e| AppError::in_migration(&migration.id, e))
    }

    async fn revert_inner(&self, migration: &Migration) -> Result<bool> {
        let mut tx = self.tx_manager.begin();
        if self
            .tx_manager
            .read(&tx, MIGRATIONS_BUCKET, &migration.id)
            .await?
            .is_none()
        {
            debug!("Non appliquée, ignorée");
            return Ok(false);
        }

        self.execute_steps(&mut tx, &migration.down).await?;
        self.tx_manager
            .stage_delete(&mut tx, MIGRATIONS_BUCKET, &migration.id)
            .await?;
        self.tx_manager.commit(tx).await?;

        info!(steps = migration.down.len(), "⏪ Migration annulée");
        Ok(true)
    }

    // --- LOTS ---

    /// `Up` : applique les enregistrements en attente, ordre croissant.
    /// `Down` : annule les enregistrements appliqués, ordre décroissant.
    /// S'arrête à la première erreur ; les enregistrements déjà validés
    /// le restent. Renvoie les ids effectivement traités.
    pub async fn run(&self, migrations: &[Migration], direction: Direction) -> Result<Vec<String>> {
        let mut ordered = sorted(migrations)?;
        if direction == Direction::Down {
            ordered.reverse();
        }

        let mut done = Vec::new();
        for migration in ordered {
            let changed = match direction {
                Direction::Up => self.apply(migration).await?,
                Direction::Down => self.revert(migration).await?,
            };
            if changed {
                done.push(migration.id.clone());
            }
        }
        info!(%direction, count = done.len(), "Lot de migrations terminé");
        Ok(done)
    }

    /// Annule les `count` migrations appliquées le plus récemment
    /// (ordre d'application, pas ordre des fichiers).
    pub async fn rollback(&self, migrations: &[Migration], count: usize) -> Result<Vec<String>> {
        let applied = self.applied_in_order().await?;
        let mut done = Vec::new();
        for marker in applied.iter().rev().take(count) {
            let Some(migration) = migrations.iter().find(|m| m.id == marker.id) else {
                return Err(AppError::in_migration(
                    &marker.id,
                    AppError::NotFound(format!("fichier de la migration '{}'", marker.id)),
                ));
            };
            if self.revert(migration).await? {
                done.push(migration.id.clone());
            }
        }
        Ok(done)
    }

    pub async fn status(&self, migrations: &[Migration]) -> Result<StatusReport> {
        let applied = self.applied().await?;
        let mut report = StatusReport::default();

        for migration in sorted(migrations)? {
            let state = match applied.iter().find(|a| a.id == migration.id) {
                None => MigrationState::Pending,
                Some(a) if a.checksum != migration.checksum() => MigrationState::Modified {
                    applied_at: a.applied_at.clone(),
                },
                Some(a) => MigrationState::Applied {
                    applied_at: a.applied_at.clone(),
                },
            };
            report.entries.push((migration.id.clone(), state));
        }

        let known: HashSet<&str> = migrations.iter().map(|m| m.id.as_str()).collect();
        report.orphans = applied
            .into_iter()
            .filter(|a| !known.contains(a.id.as_str()))
            .map(|a| a.id)
            .collect();
        Ok(report)
    }

    /// Purge du registre les entrées orphelines, en une transaction.
    pub async fn history_sync(&self, migrations: &[Migration]) -> Result<Vec<String>> {
        let orphans = self.status(migrations).await?.orphans;
        let mut tx = self.tx_manager.begin();
        for id in &orphans {
            warn!(id = %id, "Entrée orpheline retirée du registre");
            self.tx_manager
                .stage_delete(&mut tx, MIGRATIONS_BUCKET, id)
                .await?;
        }
        self.tx_manager.commit(tx).await?;
        Ok(orphans)
    }

    // --- EXÉCUTION DES ÉTAPES ---

    pub(crate) async fn execute_steps(
        &self,
        tx: &mut ActiveTransaction,
        steps: &[MigrationStep],
    ) -> Result<()> {
        for step in steps {
            self.execute_step(tx, step).await?;
        }
        Ok(())
    }

    async fn execute_step(&self, tx: &mut ActiveTransaction, step: &MigrationStep) -> Result<()> {
        let mgr = self.collections();
        match step {
            MigrationStep::CreateCollection { collection } => {
                let mut col = (**collection).clone();
                mgr.create_collection(tx, &mut col).await?;
                debug!("   -> Collection créée : {}", col.name);
            }
            MigrationStep::DeleteCollection { collection } => {
                let col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                mgr.delete_collection(tx, &col).await?;
                debug!("   -> Collection supprimée : {}", col.name);
            }
            MigrationStep::AddField { collection, field } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                col.schema.add_field(field.clone());
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Champ ajouté : {}::{}", col.name, field.name);
            }
            MigrationStep::RemoveField {
                collection,
                field_id,
            } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                let removed = col.schema.remove_field(field_id).ok_or_else(|| {
                    AppError::NotFound(format!("champ '{}' dans '{}'", field_id, col.name))
                })?;
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Champ supprimé : {}::{}", col.name, removed.name);
            }
            MigrationStep::SetRule {
                collection,
                rule,
                value,
            } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                col.set_rule(*rule, value.clone());
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Règle {} : {}", rule.as_str(), col.name);
            }
            MigrationStep::RenameCollection { collection, name } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                let old = std::mem::replace(&mut col.name, name.clone());
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Collection renommée : {} -> {}", old, name);
            }
            MigrationStep::AddIndex { collection, index } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                if col.indexes.iter().any(|i| i.trim() == index.trim()) {
                    return Err(AppError::Conflict(format!(
                        "index déjà présent sur '{}' : {}",
                        col.name, index
                    )));
                }
                col.indexes.push(index.clone());
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Index créé sur {}", col.name);
            }
            MigrationStep::DropIndex { collection, index } => {
                let mut col = mgr.find_collection_by_name_or_id(tx, collection).await?;
                let pos = col
                    .indexes
                    .iter()
                    .position(|i| i.trim() == index.trim())
                    .ok_or_else(|| {
                        AppError::NotFound(format!("index sur '{}' : {}", col.name, index))
                    })?;
                col.indexes.remove(pos);
                mgr.save_collection(tx, &mut col).await?;
                debug!("   -> Index supprimé sur {}", col.name);
            }
        }
        Ok(())
    }
}

fn by_version(a: &str, b: &str) -> std::cmp::Ordering {
    match (MigrationVersion::parse(a), MigrationVersion::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

/// Trie par version ; refuse les identifiants invalides ou en double.
fn sorted(migrations: &[Migration]) -> Result<Vec<&Migration>> {
    let mut keyed = Vec::with_capacity(migrations.len());
    let mut seen = HashSet::new();
    for m in migrations {
        if !seen.insert(m.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Migration '{}' déclarée deux fois",
                m.id
            )));
        }
        keyed.push((m.version()?, m));
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, m)| m).collect())
}

// ============================================================================
// TESTS D'INTÉGRATION
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_db::collections::{Collection, CollectionKind, Field, RuleKind};
    use crate::json_db::storage::JsonDbConfig;
    use tempfile::tempdir;

    // Environnement de test isolé
    async fn create_test_env() -> (Migrator, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Impossible de créer dossier temp DB");
        let storage = StorageEngine::new(JsonDbConfig::new(temp_dir.path().to_path_buf()));
        let migrator = Migrator::open(storage).await.expect("open migrator");
        (migrator, temp_dir)
    }

    fn create_posts(id: &str) -> Migration {
        let mut posts = Collection::new("p0sts0000000001", "posts", CollectionKind::Base);
        posts.schema.add_field(Field::text("t1tle000", "title"));
        Migration::new(
            id,
            vec![MigrationStep::CreateCollection {
                collection: Box::new(posts),
            }],
            vec![MigrationStep::DeleteCollection {
                collection: "p0sts0000000001".into(),
            }],
        )
    }

    fn lock_posts(id: &str) -> Migration {
        let set = |value: Option<&str>| MigrationStep::SetRule {
            collection: "posts".into(),
            rule: RuleKind::Delete,
            value: value.map(String::from),
        };
        Migration::new(id, vec![set(Some("@request.auth.id != \"\""))], vec![set(None)])
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let (migrator, _dir) = create_test_env().await;
        let m = create_posts("1700000000_create_posts");

        assert!(migrator.apply(&m).await.unwrap());
        assert!(!migrator.apply(&m).await.unwrap());
        assert!(migrator.is_applied(&m.id).await.unwrap());

        let applied = migrator.applied().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].checksum, m.checksum());
    }

    #[tokio::test]
    async fn test_revert_without_apply_is_noop() {
        let (migrator, _dir) = create_test_env().await;
        let m = create_posts("1700000000_create_posts");
        assert!(!migrator.revert(&m).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_orders_and_reports() {
        let (migrator, _dir) = create_test_env().await;
        // Déclarées dans le désordre
        let records = vec![
            lock_posts("1700000100_lock_posts"),
            create_posts("1700000000_create_posts"),
        ];

        let done = migrator.run(&records, Direction::Up).await.unwrap();
        assert_eq!(done, vec!["1700000000_create_posts", "1700000100_lock_posts"]);
        assert!(migrator.run(&records, Direction::Up).await.unwrap().is_empty());

        let done = migrator.run(&records, Direction::Down).await.unwrap();
        assert_eq!(done, vec!["1700000100_lock_posts", "1700000000_create_posts"]);
        assert!(migrator.applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_names_the_record() {
        let (migrator, _dir) = create_test_env().await;
        let records = vec![lock_posts("1700000100_lock_posts")];

        let err = migrator.run(&records, Direction::Up).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(&err, AppError::Migration { id, .. } if id == "1700000100_lock_posts"));
        assert!(!migrator.is_applied("1700000100_lock_posts").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let (migrator, _dir) = create_test_env().await;
        let records = vec![
            create_posts("1700000000_create_posts"),
            create_posts("1700000000_create_posts"),
        ];
        let err = migrator.run(&records, Direction::Up).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_rollback_last_n() {
        let (migrator, _dir) = create_test_env().await;
        let records = vec![
            create_posts("1700000000_create_posts"),
            lock_posts("1700000100_lock_posts"),
        ];
        migrator.run(&records, Direction::Up).await.unwrap();

        let done = migrator.rollback(&records, 1).await.unwrap();
        assert_eq!(done, vec!["1700000100_lock_posts"]);
        assert!(migrator.is_applied("1700000000_create_posts").await.unwrap());

        // Un marqueur dont le fichier a disparu bloque le rollback
        let err = migrator.rollback(&records[1..], 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rollback_follows_application_order() {
        let (migrator, _dir) = create_test_env().await;
        let create = create_posts("1700000100_create_posts");
        // Fichier plus ancien arrivé après coup
        let late = lock_posts("1700000050_lock_posts");

        migrator.apply(&create).await.unwrap();
        migrator.apply(&late).await.unwrap();

        let order: Vec<String> = migrator
            .applied_in_order()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(order, vec!["1700000100_create_posts", "1700000050_lock_posts"]);

        let records = [create, late];
        let done = migrator.rollback(&records, 1).await.unwrap();
        assert_eq!(done, vec!["1700000050_lock_posts"]);
        assert!(migrator.is_applied("1700000100_create_posts").await.unwrap());

        let done = migrator.rollback(&records, 1).await.unwrap();
        assert_eq!(done, vec!["1700000100_create_posts"]);
    }

    #[tokio::test]
    async fn test_status_and_history_sync() {
        let (migrator, _dir) = create_test_env().await;
        let create = create_posts("1700000000_create_posts");
        let lock = lock_posts("1700000100_lock_posts");
        migrator.run(&[create.clone(), lock.clone()], Direction::Up).await.unwrap();

        // Fichier modifié après application + fichier disparu + nouveau fichier
        let mut edited = lock.clone();
        edited.up.clear();
        let pending = lock_posts("1700000200_relock_posts");
        let report = migrator
            .status(&[edited.clone(), pending.clone()])
            .await
            .unwrap();

        assert_eq!(report.modified().collect::<Vec<_>>(), vec!["1700000100_lock_posts"]);
        assert_eq!(report.pending().collect::<Vec<_>>(), vec!["1700000200_relock_posts"]);
        assert_eq!(report.orphans, vec!["1700000000_create_posts"]);

        let removed = migrator.history_sync(&[edited, pending]).await.unwrap();
        assert_eq!(removed, vec!["1700000000_create_posts"]);
        assert!(!migrator.is_applied("1700000000_create_posts").await.unwrap());
        // La collection elle-même n'est pas touchée
        let tx = migrator.tx_manager().begin();
        assert!(migrator
            .collections()
            .find_collection_by_name_or_id(&tx, "posts")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_second_migrator_is_locked_out() {
        let (migrator, dir) = create_test_env().await;
        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        assert!(Migrator::open(storage).await.is_err());
        drop(migrator);

        let storage = StorageEngine::new(JsonDbConfig::new(dir.path().to_path_buf()));
        assert!(Migrator::open(storage).await.is_ok());
    }
}
