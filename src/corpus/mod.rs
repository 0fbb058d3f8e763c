//! The corpus of existing records and the conflict query run against it.
//!
//! Backends implement [`Corpus`]. A query returns every record matching the
//! candidate's comparison key, never just the first one.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryCorpus;
pub use sqlite::SqliteCorpus;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::{ComparisonKey, TitleComponent};
use crate::record::{RecordId, RecordKind};

/// Lookup of records sharing a comparison key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictQuery {
    pub kind: RecordKind,
    pub category: String,
    /// Exact-equality conditions, field identifier -> value
    pub field_conditions: Vec<(String, String)>,
    pub title: Option<TitleComponent>,
    /// Record to leave out of the results (the candidate itself)
    pub exclude_id: Option<RecordId>,
    pub published_only: bool,
}

impl ConflictQuery {
    pub fn new(kind: RecordKind, category: impl Into<String>) -> Self {
        ConflictQuery {
            kind,
            category: category.into(),
            field_conditions: Vec::new(),
            title: None,
            exclude_id: None,
            published_only: false,
        }
    }

    /// Query with one condition per component of the key.
    pub fn for_key(kind: RecordKind, category: impl Into<String>, key: &ComparisonKey) -> Self {
        let mut query = Self::new(kind, category);
        query.title = key.title().cloned();
        query.field_conditions = key
            .field_values()
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        query
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.field_conditions.push((field.into(), value.into()));
        self
    }

    pub fn with_title(mut self, title: impl Into<String>, case_sensitive: bool) -> Self {
        self.title = Some(TitleComponent::new(title, case_sensitive));
        self
    }

    pub fn excluding(mut self, id: Option<RecordId>) -> Self {
        self.exclude_id = id;
        self
    }

    pub fn published_only(mut self, published_only: bool) -> Self {
        self.published_only = published_only;
        self
    }

    /// Whether a stored record satisfies every condition of this query.
    pub fn matches(&self, record: &StoredRecord) -> bool {
        if record.kind != self.kind || record.category != self.category {
            return false;
        }
        if self.exclude_id == Some(record.id) {
            return false;
        }
        if self.published_only && !record.published {
            return false;
        }
        if let Some(title) = &self.title {
            if !title.matches(&record.title) {
                return false;
            }
        }
        self.field_conditions
            .iter()
            .all(|(field, value)| record.fields.get(field) == Some(value))
    }
}

fn default_published() -> bool {
    true
}

/// An existing record as held by a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub category: String,
    pub title: String,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl StoredRecord {
    pub fn new(
        id: RecordId,
        kind: RecordKind,
        category: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        StoredRecord {
            id,
            kind,
            category: category.into(),
            title: title.into(),
            published: true,
            fields: IndexMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    pub fn to_conflict(&self) -> ConflictingRecord {
        ConflictingRecord::new(self.kind, self.id, self.title.clone())
    }
}

/// An existing record that conflicts with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingRecord {
    pub id: RecordId,
    pub title: String,
    pub url: String,
}

impl ConflictingRecord {
    pub fn new(kind: RecordKind, id: RecordId, title: impl Into<String>) -> Self {
        ConflictingRecord {
            id,
            title: title.into(),
            url: kind.canonical_url(id),
        }
    }
}

/// Searchable store of existing records.
///
/// Lookups are pure reads. Backend failures must surface as errors; an
/// empty result always means "no conflict".
pub trait Corpus {
    /// All records matching the query, ordered by id.
    fn find_conflicts(&self, query: &ConflictQuery) -> Result<Vec<ConflictingRecord>>;
}

impl<T: Corpus + ?Sized> Corpus for &T {
    fn find_conflicts(&self, query: &ConflictQuery) -> Result<Vec<ConflictingRecord>> {
        (**self).find_conflicts(query)
    }
}
