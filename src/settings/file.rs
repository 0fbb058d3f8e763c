//! TOML settings file: constraint definitions plus field labels.
//!
//! ```toml
//! [[constraint]]
//! field = "field_allow_only_one"
//! kind = "node"
//! category = "article"
//!
//! [constraint.flags]
//! title = 1
//! case_sensitive = 0
//! field_isbn = 1
//!
//! [labels.node.article]
//! field_isbn = "ISBN"
//! ```

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AllowOnlyOneError, Result};
use crate::labels::{FieldLabelResolver, FieldLabels};
use crate::record::RecordKind;

use super::{RawFlags, SettingsRegistry, SettingsStore, UniquenessSettings};

#[derive(Debug, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    constraint: Vec<ConstraintEntry>,
    /// kind -> category -> field -> label
    #[serde(default)]
    labels: IndexMap<String, IndexMap<String, IndexMap<String, String>>>,
}

#[derive(Debug, Deserialize)]
struct ConstraintEntry {
    field: String,
    kind: String,
    category: String,
    #[serde(default)]
    flags: RawFlags,
}

fn parse_kind(kind: &str) -> Result<RecordKind> {
    RecordKind::parse(kind).ok_or_else(|| AllowOnlyOneError::UnsupportedKind(kind.to_string()))
}

/// Settings and labels loaded from a TOML document.
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    registry: SettingsRegistry,
    labels: FieldLabels,
}

impl SettingsFile {
    /// Load settings from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AllowOnlyOneError::SettingsNotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        Self::parse(&data)
    }

    /// Parse settings from TOML text.
    pub fn parse(data: &str) -> Result<Self> {
        let document: SettingsDocument = toml::from_str(data)?;

        let mut registry = SettingsRegistry::new();
        for entry in document.constraint {
            let kind = parse_kind(&entry.kind)?;
            let settings =
                UniquenessSettings::from_flags(entry.field, kind, entry.category, &entry.flags);
            debug!(
                constraint = %settings.field,
                kind = %settings.kind,
                category = %settings.category,
                fields = settings.selected_fields.len(),
                title = settings.include_title,
                "Loaded uniqueness settings"
            );
            if settings.is_inert() {
                warn!(
                    constraint = %settings.field,
                    category = %settings.category,
                    "Constraint selects no fields and no title"
                );
            }
            registry.insert(settings)?;
        }

        let mut labels = FieldLabels::new();
        for (kind, categories) in document.labels {
            let kind = parse_kind(&kind)?;
            for (category, fields) in categories {
                for (field, label) in fields {
                    labels.insert(kind, category.clone(), field, label);
                }
            }
        }

        Ok(SettingsFile { registry, labels })
    }

    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    pub fn labels(&self) -> &FieldLabels {
        &self.labels
    }
}

impl SettingsStore for SettingsFile {
    fn settings_for(&self, kind: RecordKind, category: &str) -> Vec<&UniquenessSettings> {
        self.registry.settings_for(kind, category)
    }
}

impl FieldLabelResolver for SettingsFile {
    fn label(&self, kind: RecordKind, category: &str, field: &str) -> String {
        self.labels.label(kind, category, field)
    }
}
