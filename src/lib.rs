pub mod corpus;
pub mod error;
pub mod key;
pub mod labels;
pub mod logging;
pub mod record;
pub mod report;
pub mod settings;
pub mod validators;

use std::fs;
use std::path::Path;

use crate::corpus::{SqliteCorpus, StoredRecord};
use crate::error::Result;
use crate::record::CandidateRecord;
use crate::settings::SettingsFile;
use crate::validators::{UniquenessValidator, ValidationContext, Validator, Violation};

/// Check a candidate record against an SQLite corpus using a settings file.
///
/// Returns the parsed candidate and the violations found. An empty list
/// means the record may be saved.
pub fn check_record(
    settings_path: &Path,
    corpus_path: &Path,
    record_path: &Path,
) -> Result<(CandidateRecord, Vec<Violation>)> {
    let settings = SettingsFile::from_file(settings_path)?;
    let corpus = SqliteCorpus::open_existing(corpus_path)?;
    let candidate = CandidateRecord::from_file(record_path)?;

    let ctx = ValidationContext::new(&corpus, &settings);
    let violations = UniquenessValidator::new(&settings).validate(&candidate, &ctx)?;

    Ok((candidate, violations))
}

/// Load existing records from a JSON array into an SQLite corpus, creating
/// the database if needed. Returns the number of records stored.
pub fn import_records(corpus_path: &Path, records_path: &Path) -> Result<usize> {
    let data = fs::read_to_string(records_path)?;
    let records: Vec<StoredRecord> = serde_json::from_str(&data)?;

    let corpus = SqliteCorpus::open(corpus_path)?;
    corpus.insert_all(&records)
}
