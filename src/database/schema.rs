use duckdb::{Connection, Result as DuckResult};
use log::info;

pub struct DatabaseSchema;

impl DatabaseSchema {
    pub fn create_tables(conn: &Connection) -> DuckResult<()> {
        conn.execute(
            "CREATE SEQUENCE IF NOT EXISTS test_results_seq",
            [],
        )?;

        // id 是唯一可靠的排序键
        conn.execute(
            "CREATE TABLE IF NOT EXISTS test_results (
                id BIGINT PRIMARY KEY DEFAULT nextval('test_results_seq'),
                fx DOUBLE,
                fy DOUBLE,
                fz DOUBLE,
                timestamp_ms BIGINT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        info!("Database tables created successfully");
        Ok(())
    }
}
