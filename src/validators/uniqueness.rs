//! Validator rejecting records whose configured field combination already exists.
//!
//! For each uniqueness setting on the record's category, the record's
//! comparison key is built and the corpus is searched for other records of
//! the same category sharing it. Every match becomes one violation.

use tracing::{debug, info, instrument};

use crate::corpus::{ConflictQuery, ConflictingRecord, Corpus};
use crate::error::Result;
use crate::key::ComparisonKey;
use crate::record::UniqueRecord;
use crate::settings::{SettingsStore, UniquenessSettings};

use super::{ValidationContext, Validator, Violation};

/// Validator enforcing uniqueness settings from a settings store.
pub struct UniquenessValidator<S> {
    settings: S,
}

impl<S: SettingsStore> UniquenessValidator<S> {
    /// Create a new uniqueness validator.
    pub fn new(settings: S) -> Self {
        Self { settings }
    }
}

impl<S: SettingsStore> Validator for UniquenessValidator<S> {
    fn name(&self) -> &'static str {
        "uniqueness"
    }

    #[instrument(
        skip_all,
        fields(
            entity_type = %record.entity_type(),
            category = %record.category(),
            id = ?record.id()
        )
    )]
    fn validate(
        &self,
        record: &dyn UniqueRecord,
        ctx: &ValidationContext<'_>,
    ) -> Result<Vec<Violation>> {
        let Some(kind) = record.kind() else {
            debug!("Record kind is not subject to uniqueness checks");
            return Ok(Vec::new());
        };

        let all_settings = self.settings.settings_for(kind, record.category());
        if all_settings.is_empty() {
            debug!("No uniqueness settings for category");
            return Ok(Vec::new());
        }

        let mut violations = Vec::new();
        for settings in all_settings {
            violations.extend(evaluate_constraint(self.name(), settings, record, ctx)?);
        }
        Ok(violations)
    }
}

/// Evaluate one uniqueness setting against a record.
pub fn evaluate_constraint(
    validator: &'static str,
    settings: &UniquenessSettings,
    record: &dyn UniqueRecord,
    ctx: &ValidationContext<'_>,
) -> Result<Vec<Violation>> {
    let key = ComparisonKey::build(settings, record, ctx.labels);
    if key.is_empty() {
        debug!(constraint = %settings.field, "Nothing to compare, skipping lookup");
        return Ok(Vec::new());
    }

    let conflicts = find_conflicts(settings, &key, record, ctx.corpus)?;
    if !conflicts.is_empty() {
        info!(
            constraint = %settings.field,
            conflicts = conflicts.len(),
            "Record conflicts with existing content"
        );
    }

    let labels = key.joined_labels();
    Ok(conflicts
        .into_iter()
        .map(|conflict| {
            Violation::new(
                validator,
                settings.field.clone(),
                conflict.id,
                conflict.url,
                conflict.title,
                labels.clone(),
            )
        })
        .collect())
}

/// Find existing records sharing a non-empty comparison key.
///
/// When restricted to published content an unpublished record is exempt
/// and the corpus is not consulted at all; a published record is only
/// compared against published records.
pub fn find_conflicts(
    settings: &UniquenessSettings,
    key: &ComparisonKey,
    record: &dyn UniqueRecord,
    corpus: &dyn Corpus,
) -> Result<Vec<ConflictingRecord>> {
    if settings.restrict_to_published && !record.is_published() {
        debug!(constraint = %settings.field, "Unpublished record is exempt");
        return Ok(Vec::new());
    }

    let query = ConflictQuery::for_key(settings.kind, settings.category.clone(), key)
        .excluding(record.id())
        .published_only(settings.restrict_to_published);
    corpus.find_conflicts(&query)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::corpus::{InMemoryCorpus, StoredRecord};
    use crate::error::AllowOnlyOneError;
    use crate::labels::FieldLabels;
    use crate::record::{CandidateRecord, RecordKind};
    use crate::settings::{FlagValue, RawFlags, SettingsRegistry};

    /// Corpus that counts lookups and can be told to fail.
    #[derive(Default)]
    struct ProbeCorpus {
        inner: InMemoryCorpus,
        lookups: Cell<usize>,
        fail: bool,
    }

    impl Corpus for ProbeCorpus {
        fn find_conflicts(&self, query: &ConflictQuery) -> Result<Vec<ConflictingRecord>> {
            self.lookups.set(self.lookups.get() + 1);
            if self.fail {
                return Err(AllowOnlyOneError::CorpusUnavailable {
                    operation: "find_conflicts".to_string(),
                    cause: "connection refused".to_string(),
                });
            }
            self.inner.find_conflicts(query)
        }
    }

    fn book(id: i64, title: &str, isbn: &str) -> StoredRecord {
        StoredRecord::new(id, RecordKind::Node, "book", title).with_field("field_isbn", isbn)
    }

    fn registry(settings: UniquenessSettings) -> SettingsRegistry {
        let mut registry = SettingsRegistry::new();
        registry.insert(settings).unwrap();
        registry
    }

    fn isbn_settings() -> UniquenessSettings {
        UniquenessSettings::new("field_unique", RecordKind::Node, "book").with_field("field_isbn")
    }

    fn labels() -> FieldLabels {
        FieldLabels::new().with(RecordKind::Node, "book", "field_isbn", "ISBN")
    }

    fn run(
        registry: &SettingsRegistry,
        corpus: &dyn Corpus,
        record: &CandidateRecord,
    ) -> Result<Vec<Violation>> {
        let labels = labels();
        let ctx = ValidationContext::new(corpus, &labels);
        UniquenessValidator::new(registry).validate(record, &ctx)
    }

    #[test]
    fn test_no_settings_no_violations() {
        let corpus = InMemoryCorpus::new().with(book(1, "Dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let violations = run(&SettingsRegistry::new(), &corpus, &record).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_unsupported_kind_no_violations() {
        let corpus = ProbeCorpus {
            inner: InMemoryCorpus::new().with(book(1, "Dune", "123")),
            ..Default::default()
        };
        let mut record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");
        record.entity_type = "user".to_string();

        let violations = run(&registry(isbn_settings()), &corpus, &record).unwrap();
        assert!(violations.is_empty());
        assert_eq!(corpus.lookups.get(), 0);
    }

    #[test]
    fn test_all_flags_false_skips_lookup() {
        let corpus = ProbeCorpus {
            inner: InMemoryCorpus::new().with(book(1, "Dune", "123")),
            ..Default::default()
        };
        let mut raw = RawFlags::new();
        raw.insert("title".to_string(), FlagValue::Int(0));
        raw.insert("field_isbn".to_string(), FlagValue::Int(0));
        let settings = UniquenessSettings::from_flags("field_unique", RecordKind::Node, "book", &raw);
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let violations = run(&registry(settings), &corpus, &record).unwrap();
        assert!(violations.is_empty());
        assert_eq!(corpus.lookups.get(), 0);
    }

    #[test]
    fn test_empty_values_skip_lookup() {
        let corpus = ProbeCorpus::default();
        let settings = isbn_settings().with_field("field_subtitle");
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "  ")
            .with_field("field_subtitle", "");

        let violations = run(&registry(settings), &corpus, &record).unwrap();
        assert!(violations.is_empty());
        assert_eq!(corpus.lookups.get(), 0);
    }

    #[test]
    fn test_case_sensitive_flag_has_no_effect_without_title() {
        let corpus = InMemoryCorpus::new()
            .with(book(1, "DUNE", "123"))
            .with(book(2, "dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let mut results = Vec::new();
        for case_sensitive in [0, 1] {
            let mut raw = RawFlags::new();
            raw.insert("title".to_string(), FlagValue::Int(0));
            raw.insert("case_sensitive".to_string(), FlagValue::Int(case_sensitive));
            raw.insert("field_isbn".to_string(), FlagValue::Int(1));
            let settings =
                UniquenessSettings::from_flags("field_unique", RecordKind::Node, "book", &raw);
            results.push(run(&registry(settings), &corpus, &record).unwrap());
        }

        assert_eq!(results[0].len(), 2);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_unpublished_record_is_exempt_when_restricted() {
        let corpus = ProbeCorpus {
            inner: InMemoryCorpus::new().with(book(1, "Dune", "123")),
            ..Default::default()
        };
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123")
            .unpublished();

        let violations =
            run(&registry(isbn_settings().restricted_to_published()), &corpus, &record).unwrap();
        assert!(violations.is_empty());
        assert_eq!(corpus.lookups.get(), 0);
    }

    #[test]
    fn test_published_record_only_conflicts_with_published_when_restricted() {
        let corpus = InMemoryCorpus::new()
            .with(book(1, "Dune", "123"))
            .with(book(2, "Dune", "123").unpublished());
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let restricted =
            run(&registry(isbn_settings().restricted_to_published()), &corpus, &record).unwrap();
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted[0].conflicting_id, 1);

        let unrestricted = run(&registry(isbn_settings()), &corpus, &record).unwrap();
        assert_eq!(unrestricted.len(), 2);
    }

    #[test]
    fn test_unpublished_record_is_checked_when_not_restricted() {
        let corpus = InMemoryCorpus::new().with(book(1, "Dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123")
            .unpublished();

        let violations = run(&registry(isbn_settings()), &corpus, &record).unwrap();
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_one_violation_per_conflicting_record() {
        let corpus = InMemoryCorpus::new()
            .with(book(1, "Dune", "123"))
            .with(book(2, "Dune Messiah", "123"))
            .with(book(3, "Children of Dune", "456"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let violations = run(&registry(isbn_settings()), &corpus, &record).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].conflicting_id, 1);
        assert_eq!(violations[0].url, "/node/1");
        assert_eq!(violations[0].title, "Dune");
        assert_eq!(violations[1].conflicting_id, 2);
        assert_eq!(violations[1].title, "Dune Messiah");
        for violation in &violations {
            assert_eq!(violation.labels, "ISBN");
            assert_eq!(violation.validator, "uniqueness");
            assert_eq!(violation.constraint, "field_unique");
        }
    }

    #[test]
    fn test_self_match_is_suppressed() {
        let corpus = InMemoryCorpus::new().with(book(7, "Dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_id(7)
            .with_field("field_isbn", "123");

        let violations = run(&registry(isbn_settings()), &corpus, &record).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_title_case_sensitivity() {
        let corpus = InMemoryCorpus::new().with(StoredRecord::new(1, RecordKind::Node, "book", "apple"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Apple");

        let insensitive = UniquenessSettings::new("field_unique", RecordKind::Node, "book")
            .with_title(false);
        let violations = run(&registry(insensitive), &corpus, &record).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].labels, "Title (not case sensitive)");

        let sensitive = UniquenessSettings::new("field_unique", RecordKind::Node, "book")
            .with_title(true);
        assert!(run(&registry(sensitive), &corpus, &record).unwrap().is_empty());
    }

    #[test]
    fn test_title_and_fields_are_combined() {
        let corpus = InMemoryCorpus::new()
            .with(book(1, "Dune", "123"))
            .with(book(2, "Other", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "dune")
            .with_field("field_isbn", "123");
        let settings = isbn_settings().with_title(false);

        let violations = run(&registry(settings), &corpus, &record).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].conflicting_id, 1);
        assert_eq!(violations[0].labels, "Title (not case sensitive), ISBN");
    }

    #[test]
    fn test_empty_field_is_left_out_of_key_and_labels() {
        let corpus = InMemoryCorpus::new().with(book(1, "Dune", "123").with_field("field_subtitle", "x"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123")
            .with_field("field_subtitle", "");
        let settings = isbn_settings().with_field("field_subtitle");

        let violations = run(&registry(settings), &corpus, &record).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].labels, "ISBN");
    }

    #[test]
    fn test_each_constraint_on_a_category_is_evaluated() {
        let corpus = InMemoryCorpus::new().with(book(1, "Dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");
        let mut registry = SettingsRegistry::new();
        registry.insert(isbn_settings()).unwrap();
        registry
            .insert(
                UniquenessSettings::new("field_unique_title", RecordKind::Node, "book")
                    .with_title(true),
            )
            .unwrap();

        let violations = run(&registry, &corpus, &record).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].constraint, "field_unique");
        assert_eq!(violations[1].constraint, "field_unique_title");
        assert_eq!(violations[1].labels, "Title (case sensitive)");
    }

    #[test]
    fn test_corpus_failure_is_an_error() {
        let corpus = ProbeCorpus {
            fail: true,
            ..Default::default()
        };
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");

        let err = run(&registry(isbn_settings()), &corpus, &record).unwrap_err();
        assert!(err.is_corpus_failure());
        assert_eq!(corpus.lookups.get(), 1);
    }

    #[test]
    fn test_validate_into_sink() {
        let corpus = InMemoryCorpus::new().with(book(1, "Dune", "123"));
        let record = CandidateRecord::new(RecordKind::Node, "book", "Dune")
            .with_field("field_isbn", "123");
        let registry = registry(isbn_settings());
        let labels = labels();
        let ctx = ValidationContext::new(&corpus, &labels);

        let mut sink: Vec<Violation> = Vec::new();
        let count = UniquenessValidator::new(&registry)
            .validate_into(&record, &ctx, &mut sink)
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(sink[0].conflicting_id, 1);
    }
}
