use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::gateways::StimulusHistoryStore;
use crate::models::{MuscleGroup, StimulusRecord};

/// SQLite-backed stimulus history
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Create or open a history database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Volatile database, used by tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stimulus_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                muscle TEXT NOT NULL,
                recorded_at DATETIME NOT NULL,
                intensity REAL NOT NULL,
                volume REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stimulus_muscle_date
                ON stimulus_records(muscle, recorded_at);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Total number of stored records across all muscles
    pub fn record_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM stimulus_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl StimulusHistoryStore for SqliteHistoryStore {
    fn load(&self, muscle: MuscleGroup) -> Result<Vec<StimulusRecord>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT recorded_at, intensity, volume FROM stimulus_records
             WHERE muscle = ?1 ORDER BY recorded_at ASC, id ASC",
        )?;

        let records = stmt
            .query_map(params![muscle.as_str()], |row| {
                Ok(StimulusRecord {
                    date: row.get::<_, DateTime<Utc>>(0)?,
                    intensity: row.get(1)?,
                    volume: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Loaded {} stimulus records for {}", records.len(), muscle);
        Ok(records)
    }

    fn append(&self, muscle: MuscleGroup, record: StimulusRecord) -> Result<(), StoreError> {
        if !record.intensity.is_finite() || !record.volume.is_finite() {
            return Err(StoreError::Corrupted {
                muscle: muscle.to_string(),
                reason: "non-finite intensity or volume".to_string(),
            });
        }

        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        conn.execute(
            "INSERT INTO stimulus_records (muscle, recorded_at, intensity, volume) VALUES (?1, ?2, ?3, ?4)",
            params![muscle.as_str(), record.date, record.intensity, record.volume],
        )?;
        Ok(())
    }

    fn replace(&self, muscle: MuscleGroup, records: &[StimulusRecord]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM stimulus_records WHERE muscle = ?1",
            params![muscle.as_str()],
        )?;
        for record in records {
            tx.execute(
                "INSERT INTO stimulus_records (muscle, recorded_at, intensity, volume) VALUES (?1, ?2, ?3, ?4)",
                params![muscle.as_str(), record.date, record.intensity, record.volume],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(hours_ago: i64, intensity: f64) -> StimulusRecord {
        StimulusRecord {
            date: Utc::now() - Duration::hours(hours_ago),
            intensity,
            volume: 24.0,
        }
    }

    #[test]
    fn test_append_and_load_sorted() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        store.append(MuscleGroup::Chest, record(2, 0.5)).unwrap();
        store.append(MuscleGroup::Chest, record(48, 0.9)).unwrap();
        store.append(MuscleGroup::Back, record(1, 0.7)).unwrap();

        let chest = store.load(MuscleGroup::Chest).unwrap();
        assert_eq!(chest.len(), 2);
        assert!(chest[0].date < chest[1].date);
        assert_eq!(chest[1].intensity, 0.5);
        assert_eq!(store.record_count().unwrap(), 3);
    }

    #[test]
    fn test_replace_overwrites_one_muscle() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        for h in 0..5 {
            store.append(MuscleGroup::Quadriceps, record(h, 0.6)).unwrap();
        }
        store.append(MuscleGroup::Calves, record(3, 0.4)).unwrap();

        store.replace(MuscleGroup::Quadriceps, &[record(1, 0.8)]).unwrap();

        assert_eq!(store.load(MuscleGroup::Quadriceps).unwrap().len(), 1);
        assert_eq!(store.load(MuscleGroup::Calves).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let store = SqliteHistoryStore::open_in_memory().unwrap();
        let result = store.append(MuscleGroup::Chest, record(1, f64::NAN));
        assert!(matches!(result, Err(StoreError::Corrupted { .. })));
    }
}
