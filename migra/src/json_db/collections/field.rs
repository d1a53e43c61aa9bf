// FICHIER : migra/src/json_db/collections/field.rs

//! Champs d'une collection et leurs options typées.

use crate::utils::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Url,
    Number,
    Bool,
    Date,
    Select,
    Json,
    File,
    Relation,
    Editor,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Number => "number",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Json => "json",
            FieldType::File => "file",
            FieldType::Relation => "relation",
            FieldType::Editor => "editor",
        }
    }
}

/// Descripteur de champ : `{system, id, name, type, required, presentable, unique, options}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub system: bool,
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub presentable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default = "empty_options")]
    pub options: Value,
}

pub(crate) fn empty_options() -> Value {
    Value::Object(Map::new())
}

impl Field {
    pub fn new(id: &str, name: &str, kind: FieldType, options: Value) -> Self {
        Self {
            system: false,
            id: id.to_string(),
            name: name.to_string(),
            kind,
            required: false,
            presentable: false,
            unique: false,
            options,
        }
    }

    /// Champ texte avec les options par défaut de la plateforme.
    pub fn text(id: &str, name: &str) -> Self {
        Self::new(
            id,
            name,
            FieldType::Text,
            json!({ "min": null, "max": null, "pattern": "" }),
        )
    }

    pub fn email(id: &str, name: &str) -> Self {
        Self::new(
            id,
            name,
            FieldType::Email,
            json!({ "exceptDomains": null, "onlyDomains": null }),
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Interprète `options` selon le type attendu.
    pub fn typed_options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.options.clone()).map_err(|e| {
            AppError::Validation(format!(
                "Options invalides pour le champ '{}' ({}) : {}",
                self.name,
                self.kind.as_str(),
                e
            ))
        })
    }
}

// --- OPTIONS TYPÉES ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOptions {
    pub min: Option<u64>,
    pub max: Option<u64>,
    #[serde(default)]
    pub pattern: String,
}

/// Options partagées par `email` et `url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainOptions {
    pub except_domains: Option<Vec<String>>,
    pub only_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(default)]
    pub no_decimal: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectOptions {
    #[serde(default)]
    pub max_select: i64,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationOptions {
    pub collection_id: String,
    #[serde(default)]
    pub cascade_delete: bool,
    pub min_select: Option<u32>,
    pub max_select: Option<u32>,
}
