use crate::error::Result;

use super::{ConflictQuery, ConflictingRecord, Corpus, StoredRecord};

/// Corpus held in memory. Mostly useful for tests and small fixtures.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    records: Vec<StoredRecord>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record of the same kind and id.
    pub fn insert(&mut self, record: StoredRecord) {
        self.records
            .retain(|existing| !(existing.kind == record.kind && existing.id == record.id));
        self.records.push(record);
    }

    pub fn with(mut self, record: StoredRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<StoredRecord> for InMemoryCorpus {
    fn from_iter<I: IntoIterator<Item = StoredRecord>>(iter: I) -> Self {
        let mut corpus = InMemoryCorpus::new();
        for record in iter {
            corpus.insert(record);
        }
        corpus
    }
}

impl Corpus for InMemoryCorpus {
    fn find_conflicts(&self, query: &ConflictQuery) -> Result<Vec<ConflictingRecord>> {
        let mut matches: Vec<&StoredRecord> =
            self.records.iter().filter(|r| query.matches(r)).collect();
        matches.sort_by_key(|r| r.id);
        Ok(matches.into_iter().map(StoredRecord::to_conflict).collect())
    }
}
