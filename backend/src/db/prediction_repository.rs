use rusqlite::{Connection, OptionalExtension, params};
use shared::PredictionRecord;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        disease TEXT NOT NULL,
        confidence REAL NOT NULL,
        feedback TEXT
    )
"#;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
    #[error("Prediction {0} not found")]
    NotFound(i64),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Append-only log of predictions. Rows are only ever inserted, and later
/// touched solely to set their feedback column.
#[derive(Clone)]
pub struct PredictionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PredictionRepository {
    pub fn open(path: &Path) -> Result<Self, RepositoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::init(Connection::open_in_memory()?)
    }

    #[cfg(test)]
    pub(crate) fn drop_schema(&self) -> Result<(), RepositoryError> {
        self.with_conn(|conn| Ok(conn.execute_batch("DROP TABLE predictions")?))
    }

    fn init(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let conn = self.conn.lock().map_err(|_| RepositoryError::Poisoned)?;
        f(&conn)
    }

    pub fn record(
        &self,
        filename: &str,
        disease: &str,
        confidence: f32,
    ) -> Result<i64, RepositoryError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO predictions (filename, disease, confidence) VALUES (?1, ?2, ?3)",
                params![filename, disease, confidence as f64],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// No ownership check: any caller holding an id may overwrite its feedback.
    pub fn attach_feedback(&self, id: i64, feedback: &str) -> Result<(), RepositoryError> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE predictions SET feedback = ?1 WHERE id = ?2",
                params![feedback, id],
            )?;
            if updated == 0 {
                return Err(RepositoryError::NotFound(id));
            }
            Ok(())
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<PredictionRecord>, RepositoryError> {
        self.with_conn(|conn| {
            let rec = conn
                .query_row(
                    "SELECT id, filename, disease, confidence, feedback FROM predictions WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(PredictionRecord {
                            id: row.get(0)?,
                            filename: row.get(1)?,
                            disease: row.get(2)?,
                            confidence: row.get::<_, f64>(3)? as f32,
                            feedback: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(rec)
        })
    }

    pub fn count(&self) -> Result<i64, RepositoryError> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_prediction_reads_back_without_feedback() {
        let repo = PredictionRepository::open_in_memory().unwrap();
        let id = repo.record("leaf.png", "Early Blight", 0.75).unwrap();

        let rec = repo.get(id).unwrap().unwrap();
        assert_eq!(rec.filename, "leaf.png");
        assert_eq!(rec.disease, "Early Blight");
        assert_eq!(rec.confidence, 0.75);
        assert_eq!(rec.feedback, None);
    }

    #[test]
    fn ids_increase() {
        let repo = PredictionRepository::open_in_memory().unwrap();
        let first = repo.record("a.png", "healthy", 1.0).unwrap();
        let second = repo.record("b.png", "healthy", 1.0).unwrap();
        assert!(second > first);
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn feedback_on_unknown_id_is_not_found_and_mutates_nothing() {
        let repo = PredictionRepository::open_in_memory().unwrap();
        let id = repo.record("a.png", "Leaf Mold", 0.6).unwrap();

        let err = repo.attach_feedback(id + 100, "wrong").unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(missing) if missing == id + 100));
        assert_eq!(repo.get(id).unwrap().unwrap().feedback, None);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn feedback_overwrites_and_is_idempotent() {
        let repo = PredictionRepository::open_in_memory().unwrap();
        let id = repo.record("a.png", "Leaf Mold", 0.6).unwrap();

        repo.attach_feedback(id, "first").unwrap();
        repo.attach_feedback(id, "correct").unwrap();
        repo.attach_feedback(id, "correct").unwrap();

        let rec = repo.get(id).unwrap().unwrap();
        assert_eq!(rec.feedback.as_deref(), Some("correct"));
        assert_eq!(rec.disease, "Leaf Mold");
    }

    #[test]
    fn missing_table_is_a_database_error() {
        let repo = PredictionRepository::open_in_memory().unwrap();
        repo.drop_schema().unwrap();
        assert!(matches!(
            repo.record("a.png", "healthy", 1.0),
            Err(RepositoryError::Database(_))
        ));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("predictions.db");

        let id = {
            let repo = PredictionRepository::open(&path).unwrap();
            repo.record("kept.jpg", "Target Spot", 0.8).unwrap()
        };

        let reopened = PredictionRepository::open(&path).unwrap();
        assert_eq!(reopened.get(id).unwrap().unwrap().filename, "kept.jpg");
    }
}
