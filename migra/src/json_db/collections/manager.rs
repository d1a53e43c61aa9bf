// FICHIER : migra/src/json_db/collections/manager.rs

use crate::json_db::collections::field::RelationOptions;
use crate::json_db::collections::{now_timestamp, Collection, FieldType, COLLECTIONS_BUCKET};
use crate::json_db::schema::validate_collection;
use crate::json_db::schema::validator::is_identifier;
use crate::json_db::transactions::{ActiveTransaction, TransactionManager};
use crate::utils::{AppError, Result};
use tracing::{debug, instrument};

/// DAO du magasin de schémas. Toutes les opérations passent par une
/// transaction : rien n'est persisté avant son commit.
#[derive(Debug, Clone, Copy)]
pub struct CollectionsManager<'a> {
    tx_manager: &'a TransactionManager,
}

impl<'a> CollectionsManager<'a> {
    pub fn new(tx_manager: &'a TransactionManager) -> Self {
        Self { tx_manager }
    }

    // --- MÉTHODES DE LECTURE ---

    /// Un id hors alphabet ne peut désigner aucun fichier du bucket.
    async fn get_by_id(&self, tx: &ActiveTransaction, id: &str) -> Result<Option<Collection>> {
        if !is_identifier(id) {
            return Ok(None);
        }
        match self.tx_manager.read(tx, COLLECTIONS_BUCKET, id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Toutes les collections vivantes, triées par nom.
    pub async fn list_collections(&self, tx: &ActiveTransaction) -> Result<Vec<Collection>> {
        let mut out = Vec::new();
        for (_, doc) in self.tx_manager.list(tx, COLLECTIONS_BUCKET).await? {
            out.push(serde_json::from_value::<Collection>(doc)?);
        }
        out.sort_by_key(|c| c.name.to_ascii_lowercase());
        Ok(out)
    }

    /// Recherche par id exact, puis par nom (insensible à la casse).
    pub async fn find_collection_by_name_or_id(
        &self,
        tx: &ActiveTransaction,
        key: &str,
    ) -> Result<Collection> {
        if let Some(col) = self.get_by_id(tx, key).await? {
            return Ok(col);
        }
        self.list_collections(tx)
            .await?
            .into_iter()
            .find(|c| c.matches_key(key))
            .ok_or_else(|| AppError::NotFound(format!("collection '{}'", key)))
    }

    // --- ÉCRITURES ---

    /// Valide puis enregistre (création ou mise à jour). `created` est
    /// conservé pour une collection existante, `updated` est rafraîchi.
    #[instrument(skip(self, tx, collection), fields(collection = %collection.name))]
    pub async fn save_collection(
        &self,
        tx: &mut ActiveTransaction,
        collection: &mut Collection,
    ) -> Result<()> {
        validate_collection(collection)?;

        let others = self.list_collections(tx).await?;
        if let Some(dup) = others
            .iter()
            .find(|c| c.id != collection.id && c.name.eq_ignore_ascii_case(&collection.name))
        {
            return Err(AppError::Conflict(format!(
                "nom '{}' déjà utilisé par la collection {}",
                collection.name, dup.id
            )));
        }
        self.check_relations(collection, &others)?;

        let now = now_timestamp();
        match others.iter().find(|c| c.id == collection.id) {
            Some(existing) => collection.created = existing.created.clone(),
            None if collection.created.is_empty() => collection.created = now.clone(),
            None => {}
        }
        collection.updated = now;

        let doc = serde_json::to_value(&*collection)?;
        self.tx_manager
            .stage_put(tx, COLLECTIONS_BUCKET, &collection.id, doc)
            .await?;
        debug!(id = %collection.id, "Collection enregistrée");
        Ok(())
    }

    /// Comme `save_collection`, mais refuse un id déjà présent.
    pub async fn create_collection(
        &self,
        tx: &mut ActiveTransaction,
        collection: &mut Collection,
    ) -> Result<()> {
        if let Some(existing) = self.get_by_id(tx, &collection.id).await? {
            return Err(AppError::Conflict(format!(
                "id '{}' déjà utilisé par la collection '{}'",
                collection.id, existing.name
            )));
        }
        self.save_collection(tx, collection).await
    }

    pub async fn delete_collection(
        &self,
        tx: &mut ActiveTransaction,
        collection: &Collection,
    ) -> Result<()> {
        let Some(existing) = self.get_by_id(tx, &collection.id).await? else {
            return Err(AppError::NotFound(format!("collection '{}'", collection.id)));
        };
        if existing.system {
            return Err(AppError::Validation(format!(
                "La collection système '{}' ne peut pas être supprimée",
                existing.name
            )));
        }

        let others = self.list_collections(tx).await?;
        for other in others.iter().filter(|c| c.id != existing.id) {
            if relation_targets(other).iter().any(|t| t == &existing.id) {
                return Err(AppError::Validation(format!(
                    "La collection '{}' est encore référencée par '{}'",
                    existing.name, other.name
                )));
            }
        }

        self.tx_manager
            .stage_delete(tx, COLLECTIONS_BUCKET, &existing.id)
            .await
    }

    /// Chaque relation doit viser une collection vivante (ou elle-même).
    fn check_relations(&self, collection: &Collection, others: &[Collection]) -> Result<()> {
        for target in relation_targets(collection) {
            let known = target == collection.id || others.iter().any(|c| c.id == target);
            if !known {
                return Err(AppError::NotFound(format!(
                    "collection cible '{}' de la relation dans '{}'",
                    target, collection.name
                )));
            }
        }
        Ok(())
    }
}

fn relation_targets(collection: &Collection) -> Vec<String> {
    collection
        .schema
        .fields()
        .iter()
        .filter(|f| f.kind == FieldType::Relation)
        .filter_map(|f| f.typed_options::<RelationOptions>().ok())
        .map(|o| o.collection_id)
        .collect()
}
