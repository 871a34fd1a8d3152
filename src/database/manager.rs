use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use duckdb::{Connection, Result as DuckResult};
use log::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::error::StorageError;
use crate::types::{ForceSample, Reading};
use super::schema::DatabaseSchema;

pub struct DatabaseManager {
    conn: Connection,
}

impl DatabaseManager {
    pub fn new(config: &DatabaseConfig) -> DuckResult<Self> {
        // 确保数据目录存在
        if config.auto_create_dir {
            if let Some(dir) = Path::new(&config.path).parent() {
                if !dir.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(dir) {
                        error!("Failed to create data directory: {}", e);
                    }
                }
            }
        }

        let conn = Connection::open(&config.path)?;
        info!("Database connection established at: {}", config.path);
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> DuckResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DuckResult<Self> {
        DatabaseSchema::create_tables(&conn)?;
        Ok(DatabaseManager { conn })
    }

    /// 追加一条读数，返回新分配的 id
    pub fn append(&self, sample: &ForceSample, timestamp: DateTime<Utc>) -> DuckResult<i64> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO test_results (fx, fy, fz, timestamp_ms) VALUES (?, ?, ?, ?) RETURNING id"
        )?;
        stmt.query_row(
            duckdb::params![sample.fx, sample.fy, sample.fz, timestamp.timestamp_millis()],
            |row| row.get::<_, i64>(0),
        )
    }

    /// 按 id 升序返回全部读数
    pub fn list_all(&self) -> DuckResult<Vec<Reading>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, fx, fy, fz, timestamp_ms FROM test_results ORDER BY id"
        )?;

        let rows = stmt.query_map([], Self::reading_from_row)?;
        rows.collect()
    }

    fn reading_from_row(row: &duckdb::Row<'_>) -> DuckResult<Reading> {
        let timestamp_ms: i64 = row.get(4)?;
        Ok(Reading::new(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default(),
        ))
    }

    /// 最近的 `limit` 条读数，仍按 id 升序
    pub fn list_recent(&self, limit: usize) -> DuckResult<Vec<Reading>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, fx, fy, fz, timestamp_ms FROM (
                SELECT id, fx, fy, fz, timestamp_ms FROM test_results ORDER BY id DESC LIMIT {}
            ) ORDER BY id",
            limit
        ))?;
        let rows = stmt.query_map([], Self::reading_from_row)?;
        rows.collect()
    }

    pub fn count(&self) -> DuckResult<usize> {
        self.conn.query_row("SELECT COUNT(*) FROM test_results", [], |row| {
            Ok(row.get::<_, i64>(0)? as usize)
        })
    }

    /// 导出全部读数为 CSV，返回写入的行数
    pub fn export_csv(&self, path: &Path) -> Result<usize, StorageError> {
        let readings = self.list_all()?;
        if readings.is_empty() {
            warn!("No readings to export");
        }

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut file = std::io::BufWriter::new(fs::File::create(path)?);
        writeln!(file, "id,fx,fy,fz,timestamp")?;
        for reading in &readings {
            writeln!(
                file,
                "{},{},{},{},{}",
                reading.id,
                reading.fx,
                reading.fy,
                reading.fz,
                reading.timestamp.to_rfc3339()
            )?;
        }
        file.flush()?;

        info!("Exported {} readings to {}", readings.len(), path.display());
        Ok(readings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(v: f64) -> ForceSample {
        ForceSample::new(v, v * 2.0, v * 3.0)
    }

    #[test]
    fn empty_store_lists_nothing() {
        let db = DatabaseManager::open_in_memory().unwrap();
        assert!(db.list_all().unwrap().is_empty());
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn appended_reading_comes_last_with_greater_id() {
        let db = DatabaseManager::open_in_memory().unwrap();
        for i in 0..5 {
            db.append(&sample(i as f64), Utc::now()).unwrap();
        }
        let new_id = db.append(&sample(9.0), Utc::now()).unwrap();

        let readings = db.list_all().unwrap();
        assert_eq!(readings.len(), 6);
        let last = readings.last().unwrap();
        assert_eq!(last.id, new_id);
        assert_eq!(last.fz, 27.0);
        assert!(readings[..5].iter().all(|r| r.id < new_id));
        assert!(readings.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn recent_returns_newest_rows_in_id_order() {
        let db = DatabaseManager::open_in_memory().unwrap();
        for i in 0..10 {
            db.append(&sample(i as f64), Utc::now()).unwrap();
        }
        let recent = db.list_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.iter().map(|r| r.fx).collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
        assert!(recent.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(db.list_recent(50).unwrap().len(), 10);
    }

    #[test]
    fn ids_past_32_bit_range_are_stored() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE SEQUENCE test_results_seq START 4294967296", []).unwrap();
        let db = DatabaseManager::with_connection(conn).unwrap();

        let id = db.append(&sample(1.0), Utc::now()).unwrap();
        assert_eq!(id, 4_294_967_296);
        assert_eq!(db.list_all().unwrap()[0].id, id);
        assert_eq!(db.list_recent(1).unwrap()[0].id, id);
    }

    #[test]
    fn timestamp_survives_round_trip_at_millisecond_precision() {
        let db = DatabaseManager::open_in_memory().unwrap();
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        db.append(&sample(1.0), now).unwrap();
        assert_eq!(db.list_all().unwrap()[0].timestamp, now);
    }

    #[test]
    fn file_backed_store_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("nested/gecko.db").to_string_lossy().into_owned(),
            auto_create_dir: true,
            export_dir: String::new(),
        };
        let db = DatabaseManager::new(&config).unwrap();
        db.append(&sample(1.0), Utc::now()).unwrap();
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn exports_csv_with_header() {
        let db = DatabaseManager::open_in_memory().unwrap();
        db.append(&sample(1.5), Utc::now()).unwrap();
        db.append(&sample(-2.0), Utc::now()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export/results.csv");
        assert_eq!(db.export_csv(&path).unwrap(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,fx,fy,fz,timestamp");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains(",-2,-4,-6,"));
    }
}
