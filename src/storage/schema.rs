//! Database schema definitions
//!
//! The frontier needs a single relation: one row per known URL with a
//! visited flag.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every URL discovered on the crawled site
CREATE TABLE IF NOT EXISTS frontier (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    visited INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_frontier_visited ON frontier(visited);
"#;

/// Columns the frontier table must carry
pub const REQUIRED_COLUMNS: &[&str] = &["url", "visited"];

/// Initializes the database schema; safe to run on an existing database
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Lists the columns of the frontier table
pub fn frontier_columns(conn: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("PRAGMA table_info(frontier)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Returns the required columns missing from the frontier table
pub fn missing_columns(columns: &[String]) -> Vec<&'static str> {
    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect()
}
