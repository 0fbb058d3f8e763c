//! SQLite-backed corpus.
//!
//! Records live in `records`, their field values in `record_fields`. Each
//! field condition becomes an `EXISTS` sub-select. Case-insensitive title
//! comparison goes through the `casefold()` SQL function registered on the
//! connection, which applies [`fold_case`] rather than SQLite's ASCII-only
//! `NOCASE`/`LIKE` rules.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, warn};

use crate::error::{AllowOnlyOneError, Result};
use crate::key::fold_case;

use super::{ConflictQuery, ConflictingRecord, Corpus, StoredRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        kind TEXT NOT NULL,
        id INTEGER NOT NULL,
        category TEXT NOT NULL,
        title TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 1,
        PRIMARY KEY (kind, id)
    );
    CREATE TABLE IF NOT EXISTS record_fields (
        kind TEXT NOT NULL,
        record_id INTEGER NOT NULL,
        field TEXT NOT NULL,
        value TEXT NOT NULL,
        PRIMARY KEY (kind, record_id, field)
    );
    CREATE INDEX IF NOT EXISTS idx_records_category ON records (kind, category);
    CREATE INDEX IF NOT EXISTS idx_record_fields_value ON record_fields (kind, field, value);
";

/// Acquire the connection lock, recovering from a poisoned mutex.
fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("SQLite corpus mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

fn register_casefold(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|t| fold_case(&t)))
        },
    )?;
    Ok(())
}

/// Build the SQL text and positional parameters for a conflict query.
fn build_query(query: &ConflictQuery) -> (String, Vec<Value>) {
    let mut sql = String::from(
        "SELECT r.id, r.title FROM records r WHERE r.kind = ?1 AND r.category = ?2",
    );
    let mut params = vec![
        Value::Text(query.kind.as_str().to_string()),
        Value::Text(query.category.clone()),
    ];

    for (field, value) in &query.field_conditions {
        let idx = params.len() + 1;
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM record_fields f \
             WHERE f.kind = r.kind AND f.record_id = r.id AND f.field = ?{} AND f.value = ?{})",
            idx,
            idx + 1
        ));
        params.push(Value::Text(field.clone()));
        params.push(Value::Text(value.clone()));
    }

    if let Some(title) = &query.title {
        let idx = params.len() + 1;
        if title.case_sensitive {
            sql.push_str(&format!(" AND r.title = ?{}", idx));
        } else {
            sql.push_str(&format!(" AND casefold(r.title) = ?{}", idx));
        }
        params.push(Value::Text(title.normalized()));
    }

    if let Some(id) = query.exclude_id {
        let idx = params.len() + 1;
        sql.push_str(&format!(" AND r.id != ?{}", idx));
        params.push(Value::Integer(id));
    }

    if query.published_only {
        sql.push_str(" AND r.published = 1");
    }

    sql.push_str(" ORDER BY r.id");
    (sql, params)
}

fn insert_record(conn: &Connection, record: &StoredRecord) -> Result<()> {
    let kind = record.kind.as_str();
    conn.execute(
        "INSERT INTO records (kind, id, category, title, published) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (kind, id) DO UPDATE SET
             category = excluded.category,
             title = excluded.title,
             published = excluded.published",
        params![kind, record.id, record.category, record.title, record.published],
    )?;
    conn.execute(
        "DELETE FROM record_fields WHERE kind = ?1 AND record_id = ?2",
        params![kind, record.id],
    )?;
    for (field, value) in &record.fields {
        conn.execute(
            "INSERT INTO record_fields (kind, record_id, field, value) VALUES (?1, ?2, ?3, ?4)",
            params![kind, record.id, field, value],
        )?;
    }
    Ok(())
}

/// Corpus stored in an SQLite database.
pub struct SqliteCorpus {
    conn: Mutex<Connection>,
}

impl SqliteCorpus {
    /// Open or create a corpus database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open a corpus database that must already exist.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AllowOnlyOneError::CorpusNotFound(path.to_path_buf()));
        }
        Self::open(path)
    }

    /// Create an empty in-memory corpus.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        register_casefold(&conn)?;
        Ok(SqliteCorpus {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or replace a record and its field values.
    pub fn insert(&self, record: &StoredRecord) -> Result<()> {
        self.insert_all(std::slice::from_ref(record)).map(|_| ())
    }

    /// Insert or replace several records in one transaction.
    pub fn insert_all(&self, records: &[StoredRecord]) -> Result<usize> {
        let mut conn = acquire_lock(&self.conn);
        let tx = conn.transaction()?;
        for record in records {
            insert_record(&tx, record)?;
        }
        tx.commit()?;
        debug!(count = records.len(), "Stored records in corpus");
        Ok(records.len())
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Corpus for SqliteCorpus {
    fn find_conflicts(&self, query: &ConflictQuery) -> Result<Vec<ConflictingRecord>> {
        let (sql, params) = build_query(query);
        debug!(sql = %sql, params = params.len(), "Running conflict query");

        let conn = acquire_lock(&self.conn);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut conflicts = Vec::new();
        for row in rows {
            let (id, title) = row?;
            conflicts.push(ConflictingRecord::new(query.kind, id, title));
        }
        Ok(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn corpus() -> SqliteCorpus {
        let corpus = SqliteCorpus::in_memory().unwrap();
        corpus
            .insert_all(&[
                StoredRecord::new(1, RecordKind::Node, "book", "Apple")
                    .with_field("field_isbn", "123")
                    .with_field("field_edition", "1"),
                StoredRecord::new(2, RecordKind::Node, "book", "apple")
                    .with_field("field_isbn", "123")
                    .with_field("field_edition", "1"),
                StoredRecord::new(3, RecordKind::Node, "book", "Pear")
                    .with_field("field_isbn", "123")
                    .unpublished(),
                StoredRecord::new(4, RecordKind::Node, "magazine", "Apple")
                    .with_field("field_isbn", "123"),
                StoredRecord::new(5, RecordKind::TaxonomyTerm, "book", "Apple")
                    .with_field("field_isbn", "123"),
                StoredRecord::new(6, RecordKind::Node, "book", "ÉCOLE"),
            ])
            .unwrap();
        corpus
    }

    fn ids(conflicts: Vec<ConflictingRecord>) -> Vec<i64> {
        conflicts.into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_field_conditions() {
        let corpus = corpus();
        let query = ConflictQuery::new(RecordKind::Node, "book")
            .with_field("field_isbn", "123")
            .with_field("field_edition", "1");
        assert_eq!(ids(corpus.find_conflicts(&query).unwrap()), vec![1, 2]);

        let query = ConflictQuery::new(RecordKind::Node, "book").with_field("field_isbn", "123");
        assert_eq!(ids(corpus.find_conflicts(&query).unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn test_title_case_sensitivity() {
        let corpus = corpus();
        let insensitive = ConflictQuery::new(RecordKind::Node, "book").with_title("APPLE", false);
        assert_eq!(ids(corpus.find_conflicts(&insensitive).unwrap()), vec![1, 2]);

        let sensitive = ConflictQuery::new(RecordKind::Node, "book").with_title("Apple", true);
        assert_eq!(ids(corpus.find_conflicts(&sensitive).unwrap()), vec![1]);

        let unicode = ConflictQuery::new(RecordKind::Node, "book").with_title("école", false);
        assert_eq!(ids(corpus.find_conflicts(&unicode).unwrap()), vec![6]);
    }

    #[test]
    fn test_title_is_not_a_pattern() {
        let corpus = corpus();
        let query = ConflictQuery::new(RecordKind::Node, "book").with_title("%", false);
        assert!(corpus.find_conflicts(&query).unwrap().is_empty());
    }

    #[test]
    fn test_exclusion_and_published_only() {
        let corpus = corpus();
        let query = ConflictQuery::new(RecordKind::Node, "book")
            .with_field("field_isbn", "123")
            .excluding(Some(1))
            .published_only(true);
        let conflicts = corpus.find_conflicts(&query).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, 2);
        assert_eq!(conflicts[0].title, "apple");
        assert_eq!(conflicts[0].url, "/node/2");
    }

    #[test]
    fn test_term_urls() {
        let corpus = corpus();
        let query =
            ConflictQuery::new(RecordKind::TaxonomyTerm, "book").with_field("field_isbn", "123");
        let conflicts = corpus.find_conflicts(&query).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].url, "/taxonomy/term/5");
    }

    #[test]
    fn test_reinsert_replaces_fields() {
        let corpus = corpus();
        corpus
            .insert(&StoredRecord::new(1, RecordKind::Node, "book", "Apple").with_field("field_isbn", "999"))
            .unwrap();
        assert_eq!(corpus.len().unwrap(), 6);

        let query = ConflictQuery::new(RecordKind::Node, "book").with_field("field_edition", "1");
        assert_eq!(ids(corpus.find_conflicts(&query).unwrap()), vec![2]);
    }

    #[test]
    fn test_broken_backend_is_an_error() {
        let corpus = corpus();
        acquire_lock(&corpus.conn)
            .execute_batch("DROP TABLE record_fields;")
            .unwrap();

        let query = ConflictQuery::new(RecordKind::Node, "book").with_field("field_isbn", "123");
        let err = corpus.find_conflicts(&query).unwrap_err();
        assert!(err.is_corpus_failure());
    }

    #[test]
    fn test_build_query_parameters() {
        let query = ConflictQuery::new(RecordKind::Node, "book")
            .with_field("field_isbn", "123")
            .with_title("Dune", false)
            .excluding(Some(7))
            .published_only(true);
        let (sql, params) = build_query(&query);

        assert!(sql.contains("f.field = ?3 AND f.value = ?4"));
        assert!(sql.contains("casefold(r.title) = ?5"));
        assert!(sql.contains("r.id != ?6"));
        assert!(sql.contains("r.published = 1"));
        assert_eq!(params.len(), 6);
        assert_eq!(params[4], Value::Text("dune".to_string()));
        assert_eq!(params[5], Value::Integer(7));
    }
}
