//! Uniqueness settings: which fields make up the comparison key of a category.
//!
//! Raw flag mappings (field identifiers mixed with the reserved `title`,
//! `case_sensitive` and `limit_validation_to_published` flags) are resolved
//! once, when settings are loaded, into [`UniquenessSettings`]. The evaluator
//! only ever sees the resolved form.

pub mod file;
pub mod flags;

pub use file::SettingsFile;
pub use flags::{FlagValue, RawFlags};

use tracing::warn;

use crate::error::{AllowOnlyOneError, Result};
use crate::record::RecordKind;

/// Resolved settings for one constraint field on one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquenessSettings {
    /// Identifier of the field carrying this configuration
    pub field: String,
    /// Kind of record the category belongs to
    pub kind: RecordKind,
    /// Content type or vocabulary
    pub category: String,
    /// Fields included in the comparison key, in configuration order
    pub selected_fields: Vec<String>,
    /// Whether the title takes part in the comparison
    pub include_title: bool,
    /// Whether title comparison is case sensitive (always false without title)
    pub title_case_sensitive: bool,
    /// Whether unpublished records are exempt and only published records match
    pub restrict_to_published: bool,
}

impl UniquenessSettings {
    /// Create settings that compare nothing.
    pub fn new(field: impl Into<String>, kind: RecordKind, category: impl Into<String>) -> Self {
        UniquenessSettings {
            field: field.into(),
            kind,
            category: category.into(),
            selected_fields: Vec::new(),
            include_title: false,
            title_case_sensitive: false,
            restrict_to_published: false,
        }
    }

    /// Resolve a raw flag mapping.
    pub fn from_flags(
        field: impl Into<String>,
        kind: RecordKind,
        category: impl Into<String>,
        raw: &RawFlags,
    ) -> Self {
        let mut settings = Self::new(field, kind, category);

        for (name, value) in raw {
            if value.is_unusual() {
                warn!(
                    constraint = %settings.field,
                    category = %settings.category,
                    flag = %name,
                    ?value,
                    "Flag is neither 0 nor 1"
                );
            }
        }

        settings.include_title = flags::is_title_enabled(raw);
        settings.title_case_sensitive = flags::is_title_case_sensitive(raw);
        settings.restrict_to_published = flags::is_restricted_to_published(raw);
        settings.selected_fields = flags::selected_fields(raw).map(str::to_string).collect();
        settings
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !flags::is_reserved(&field) && !self.selected_fields.contains(&field) {
            self.selected_fields.push(field);
        }
        self
    }

    pub fn with_title(mut self, case_sensitive: bool) -> Self {
        self.include_title = true;
        self.title_case_sensitive = case_sensitive;
        self
    }

    pub fn restricted_to_published(mut self) -> Self {
        self.restrict_to_published = true;
        self
    }

    /// True when these settings can never produce a comparison key.
    pub fn is_inert(&self) -> bool {
        !self.include_title && self.selected_fields.is_empty()
    }
}

/// Source of uniqueness settings, keyed by record kind and category.
pub trait SettingsStore {
    /// All settings that apply to the given category. Empty when the
    /// constraint is not configured there.
    fn settings_for(&self, kind: RecordKind, category: &str) -> Vec<&UniquenessSettings>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for &T {
    fn settings_for(&self, kind: RecordKind, category: &str) -> Vec<&UniquenessSettings> {
        (**self).settings_for(kind, category)
    }
}

/// In-memory settings store holding at most one entry per
/// (field, kind, category).
#[derive(Debug, Clone, Default)]
pub struct SettingsRegistry {
    entries: Vec<UniquenessSettings>,
}

impl SettingsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add settings, rejecting a second entry for the same field and category.
    pub fn insert(&mut self, settings: UniquenessSettings) -> Result<()> {
        let exists = self.entries.iter().any(|existing| {
            existing.field == settings.field
                && existing.kind == settings.kind
                && existing.category == settings.category
        });
        if exists {
            return Err(AllowOnlyOneError::DuplicateSettings {
                field: settings.field,
                kind: settings.kind.to_string(),
                category: settings.category,
            });
        }

        self.entries.push(settings);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniquenessSettings> {
        self.entries.iter()
    }
}

impl SettingsStore for SettingsRegistry {
    fn settings_for(&self, kind: RecordKind, category: &str) -> Vec<&UniquenessSettings> {
        self.entries
            .iter()
            .filter(|s| s.kind == kind && s.category == category)
            .collect()
    }
}
