//! Records under validation and the kinds of records the constraint applies to.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Identifier of a stored record (node id or term id).
pub type RecordId = i64;

/// Record kinds the uniqueness constraint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Content node, grouped by content type
    Node,
    /// Taxonomy term, grouped by vocabulary
    TaxonomyTerm,
}

impl RecordKind {
    /// Parse an entity type name. Returns None for kinds outside the supported set.
    pub fn parse(entity_type: &str) -> Option<Self> {
        match entity_type {
            "node" => Some(RecordKind::Node),
            "taxonomy_term" => Some(RecordKind::TaxonomyTerm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Node => "node",
            RecordKind::TaxonomyTerm => "taxonomy_term",
        }
    }

    /// Human-readable label for the title property ("Title" or "Name").
    pub fn title_label(&self) -> &'static str {
        match self {
            RecordKind::Node => "Title",
            RecordKind::TaxonomyTerm => "Name",
        }
    }

    /// Canonical path of a record of this kind.
    pub fn canonical_url(&self, id: RecordId) -> String {
        match self {
            RecordKind::Node => format!("/node/{}", id),
            RecordKind::TaxonomyTerm => format!("/taxonomy/term/{}", id),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities the evaluator needs from a record under validation.
pub trait UniqueRecord {
    /// Record id, None for records not saved yet.
    fn id(&self) -> Option<RecordId>;

    /// Raw entity type name, possibly outside the supported set.
    fn entity_type(&self) -> &str;

    /// Content type or vocabulary.
    fn category(&self) -> &str;

    /// Title or name.
    fn label(&self) -> &str;

    fn is_published(&self) -> bool;

    /// String form of a field's value. Missing or malformed values yield
    /// an empty string.
    fn field_string(&self, field: &str) -> String;

    /// Supported kind of this record, if any.
    fn kind(&self) -> Option<RecordKind> {
        RecordKind::parse(self.entity_type())
    }
}

fn default_published() -> bool {
    true
}

/// A record being created or edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub entity_type: String,
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
}

impl CandidateRecord {
    /// Create a new, unsaved and published record.
    pub fn new(kind: RecordKind, category: impl Into<String>, title: impl Into<String>) -> Self {
        CandidateRecord {
            id: None,
            entity_type: kind.as_str().to_string(),
            category: category.into(),
            title: title.into(),
            published: true,
            fields: IndexMap::new(),
        }
    }

    /// Load a candidate record from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }
}

impl UniqueRecord for CandidateRecord {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn is_published(&self) -> bool {
        self.published
    }

    fn field_string(&self, field: &str) -> String {
        self.fields.get(field).map(stringify_value).unwrap_or_default()
    }
}

/// Best-effort string form of a raw field value.
///
/// Lists join their items with ", ". Objects contribute their `value` or
/// `target_id` property; anything else stringifies to an empty string.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .get("value")
            .or_else(|| map.get("target_id"))
            .filter(|inner| !inner.is_object())
            .map(stringify_value)
            .unwrap_or_default(),
    }
}
