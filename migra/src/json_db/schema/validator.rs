// FICHIER : migra/src/json_db/schema/validator.rs

//! Validation structurelle des descripteurs de collections et de champs.
//! Les références inter-collections (relations) sont vérifiées par le
//! gestionnaire, qui seul voit le magasin.

use crate::json_db::collections::field::{
    DomainOptions, NumberOptions, RelationOptions, SelectOptions, TextOptions,
};
use crate::json_db::collections::{Collection, CollectionKind, Field, FieldType};
use crate::utils::{AppError, Result};
use regex::Regex;
use std::collections::HashSet;

/// Noms réservés aux colonnes implicites de chaque enregistrement.
const RESERVED_FIELD_NAMES: [&str; 6] = [
    "id",
    "created",
    "updated",
    "collectionId",
    "collectionName",
    "expand",
];

fn invalid(msg: String) -> AppError {
    AppError::Validation(msg)
}

pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate_collection(collection: &Collection) -> Result<()> {
    if !is_identifier(&collection.id) {
        return Err(invalid(format!(
            "Identifiant de collection invalide : '{}'",
            collection.id
        )));
    }
    if !is_identifier(&collection.name) {
        return Err(invalid(format!(
            "Nom de collection invalide : '{}'",
            collection.name
        )));
    }
    if collection.name.starts_with('_') && !collection.system {
        return Err(invalid(format!(
            "Le préfixe '_' est réservé aux collections système : '{}'",
            collection.name
        )));
    }

    if collection.kind == CollectionKind::View {
        let query = collection
            .options
            .get("query")
            .and_then(|q| q.as_str())
            .unwrap_or("");
        if query.trim().is_empty() {
            return Err(invalid(format!(
                "La vue '{}' doit définir options.query",
                collection.name
            )));
        }
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for field in collection.schema.fields() {
        validate_field(field)?;
        if !ids.insert(field.id.as_str()) {
            return Err(invalid(format!(
                "Identifiant de champ dupliqué '{}' dans '{}'",
                field.id, collection.name
            )));
        }
        if !names.insert(field.name.to_ascii_lowercase()) {
            return Err(invalid(format!(
                "Nom de champ dupliqué '{}' dans '{}'",
                field.name, collection.name
            )));
        }
    }

    let mut seen = HashSet::new();
    for index in &collection.indexes {
        let normalized = index.trim();
        if normalized.is_empty() {
            return Err(invalid(format!("Index vide dans '{}'", collection.name)));
        }
        if !seen.insert(normalized) {
            return Err(invalid(format!(
                "Index dupliqué dans '{}' : {}",
                collection.name, normalized
            )));
        }
    }

    Ok(())
}

pub fn validate_field(field: &Field) -> Result<()> {
    if !is_identifier(&field.id) {
        return Err(invalid(format!("Identifiant de champ invalide : '{}'", field.id)));
    }
    if !is_identifier(&field.name) {
        return Err(invalid(format!("Nom de champ invalide : '{}'", field.name)));
    }
    if RESERVED_FIELD_NAMES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(&field.name))
    {
        return Err(invalid(format!("Nom de champ réservé : '{}'", field.name)));
    }
    if !field.options.is_object() {
        return Err(invalid(format!(
            "Les options du champ '{}' doivent être un objet",
            field.name
        )));
    }

    match field.kind {
        FieldType::Text => {
            let opts: TextOptions = field.typed_options()?;
            if let (Some(min), Some(max)) = (opts.min, opts.max) {
                if min > max {
                    return Err(invalid(format!(
                        "min ({}) > max ({}) pour '{}'",
                        min, max, field.name
                    )));
                }
            }
            if !opts.pattern.is_empty() {
                Regex::new(&opts.pattern).map_err(|e| {
                    invalid(format!("Motif invalide pour '{}' : {}", field.name, e))
                })?;
            }
        }
        FieldType::Email | FieldType::Url => {
            let opts: DomainOptions = field.typed_options()?;
            let except = opts.except_domains.unwrap_or_default();
            let only = opts.only_domains.unwrap_or_default();
            if !except.is_empty() && !only.is_empty() {
                return Err(invalid(format!(
                    "exceptDomains et onlyDomains sont exclusifs pour '{}'",
                    field.name
                )));
            }
        }
        FieldType::Number => {
            let opts: NumberOptions = field.typed_options()?;
            if let (Some(min), Some(max)) = (opts.min, opts.max) {
                if min > max {
                    return Err(invalid(format!(
                        "min ({}) > max ({}) pour '{}'",
                        min, max, field.name
                    )));
                }
            }
        }
        FieldType::Select => {
            let opts: SelectOptions = field.typed_options()?;
            if opts.values.is_empty() {
                return Err(invalid(format!(
                    "Le champ select '{}' n'a aucune valeur",
                    field.name
                )));
            }
            if opts.max_select < 1 {
                return Err(invalid(format!(
                    "maxSelect doit être >= 1 pour '{}'",
                    field.name
                )));
            }
        }
        FieldType::Relation => {
            let opts: RelationOptions = field.typed_options()?;
            if opts.collection_id.is_empty() {
                return Err(invalid(format!(
                    "La relation '{}' ne cible aucune collection",
                    field.name
                )));
            }
            if let (Some(min), Some(max)) = (opts.min_select, opts.max_select) {
                if min > max {
                    return Err(invalid(format!(
                        "minSelect ({}) > maxSelect ({}) pour '{}'",
                        min, max, field.name
                    )));
                }
            }
        }
        _ => {}
    }

    Ok(())
}
