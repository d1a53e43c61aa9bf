//! Modèle des collections et gestionnaire (DAO) du magasin de schémas.

pub mod field;
pub mod manager;

pub use field::{Field, FieldType};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bucket de stockage des descripteurs de collections.
pub const COLLECTIONS_BUCKET: &str = "_collections";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    #[default]
    Base,
    View,
    Auth,
}

/// Les cinq règles d'accès d'une collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    #[serde(rename = "listRule")]
    List,
    #[serde(rename = "viewRule")]
    View,
    #[serde(rename = "createRule")]
    Create,
    #[serde(rename = "updateRule")]
    Update,
    #[serde(rename = "deleteRule")]
    Delete,
}

impl RuleKind {
    pub const ALL: [RuleKind; 5] = [
        RuleKind::List,
        RuleKind::View,
        RuleKind::Create,
        RuleKind::Update,
        RuleKind::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::List => "listRule",
            RuleKind::View => "viewRule",
            RuleKind::Create => "createRule",
            RuleKind::Update => "updateRule",
            RuleKind::Delete => "deleteRule",
        }
    }
}

/// Liste ordonnée des champs d'une collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Vec<Field>);

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_field_by_id(&self, id: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.id == id)
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Remplace sur place le champ de même id, sinon ajoute en fin.
    pub fn add_field(&mut self, field: Field) {
        match self.0.iter_mut().find(|f| f.id == field.id) {
            Some(existing) => *existing = field,
            None => self.0.push(field),
        }
    }

    /// Retire le champ et le renvoie ; `None` si l'id est inconnu.
    pub fn remove_field(&mut self, id: &str) -> Option<Field> {
        let pos = self.0.iter().position(|f| f.id == id)?;
        Some(self.0.remove(pos))
    }
}

/// Descripteur complet d'une collection, au format littéral de la plateforme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CollectionKind,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub indexes: Vec<String>,
    #[serde(default)]
    pub list_rule: Option<String>,
    #[serde(default)]
    pub view_rule: Option<String>,
    #[serde(default)]
    pub create_rule: Option<String>,
    #[serde(default)]
    pub update_rule: Option<String>,
    #[serde(default)]
    pub delete_rule: Option<String>,
    #[serde(default = "field::empty_options")]
    pub options: Value,
}

impl Collection {
    pub fn new(id: &str, name: &str, kind: CollectionKind) -> Self {
        Self {
            id: id.to_string(),
            created: String::new(),
            updated: String::new(),
            name: name.to_string(),
            kind,
            system: false,
            schema: Schema::default(),
            indexes: Vec::new(),
            list_rule: None,
            view_rule: None,
            create_rule: None,
            update_rule: None,
            delete_rule: None,
            options: field::empty_options(),
        }
    }

    pub fn rule(&self, kind: RuleKind) -> Option<&str> {
        match kind {
            RuleKind::List => self.list_rule.as_deref(),
            RuleKind::View => self.view_rule.as_deref(),
            RuleKind::Create => self.create_rule.as_deref(),
            RuleKind::Update => self.update_rule.as_deref(),
            RuleKind::Delete => self.delete_rule.as_deref(),
        }
    }

    pub fn set_rule(&mut self, kind: RuleKind, value: Option<String>) {
        let slot = match kind {
            RuleKind::List => &mut self.list_rule,
            RuleKind::View => &mut self.view_rule,
            RuleKind::Create => &mut self.create_rule,
            RuleKind::Update => &mut self.update_rule,
            RuleKind::Delete => &mut self.delete_rule,
        };
        *slot = value;
    }

    /// Vrai si `key` désigne cette collection (id exact ou nom sans casse).
    pub fn matches_key(&self, key: &str) -> bool {
        self.id == key || self.name.eq_ignore_ascii_case(key)
    }
}

/// Horodatage au format de la plateforme : `2025-09-07 06:56:24.219Z`.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}
