//! Display labels for fields, used in violation messages.

use std::collections::HashMap;

use crate::record::RecordKind;

/// Resolves a field identifier to its human-readable label.
pub trait FieldLabelResolver {
    fn label(&self, kind: RecordKind, category: &str, field: &str) -> String;
}

/// Label table keyed by (kind, category, field). Unknown fields fall back
/// to their identifier.
#[derive(Debug, Clone, Default)]
pub struct FieldLabels {
    labels: HashMap<(RecordKind, String, String), String>,
}

impl FieldLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        kind: RecordKind,
        category: impl Into<String>,
        field: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.labels
            .insert((kind, category.into(), field.into()), label.into());
    }

    pub fn with(
        mut self,
        kind: RecordKind,
        category: impl Into<String>,
        field: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.insert(kind, category, field, label);
        self
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FieldLabelResolver for FieldLabels {
    fn label(&self, kind: RecordKind, category: &str, field: &str) -> String {
        self.labels
            .get(&(kind, category.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }
}
