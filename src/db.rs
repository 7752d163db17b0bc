use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

/// Bumped whenever `ensure_schema` learns a new upgrade step.
pub const SCHEMA_VERSION: i64 = 2;

pub fn open_db(db_path: &Path) -> anyhow::Result<Connection> {
    crate::config::ensure_db_dir(db_path)?;
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    ensure_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_db_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    ensure_schema(&conn)?;
    Ok(conn)
}

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    // SQLite leaves foreign keys off per connection; cascades depend on it.
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create courses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create subjects table")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_course ON subjects(course_id)",
        [],
    )?;

    // Older files carry an assignments table without name/max_grade/completed.
    // Upgrade in place so existing rows survive.
    if table_exists(conn, "assignments")? {
        ensure_assignments_columns(conn)?;
    }
    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            grade TEXT,
            max_grade TEXT,
            date TEXT,
            completed INTEGER DEFAULT 0,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create assignments table")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_subject ON assignments(subject_id)",
        [],
    )?;

    let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    if current < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
        tracing::info!(from = current, to = SCHEMA_VERSION, "schema version stamped");
    }

    Ok(())
}

fn ensure_assignments_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "assignments", "name")? {
        tracing::warn!("assignments table predates names; adding name column");
        conn.execute(
            "ALTER TABLE assignments ADD COLUMN name TEXT NOT NULL DEFAULT ''",
            [],
        )?;
    }
    if !table_has_column(conn, "assignments", "grade")? {
        conn.execute("ALTER TABLE assignments ADD COLUMN grade TEXT", [])?;
    }
    if !table_has_column(conn, "assignments", "max_grade")? {
        conn.execute("ALTER TABLE assignments ADD COLUMN max_grade TEXT", [])?;
    }
    if !table_has_column(conn, "assignments", "date")? {
        conn.execute("ALTER TABLE assignments ADD COLUMN date TEXT", [])?;
    }
    if !table_has_column(conn, "assignments", "completed")? {
        conn.execute(
            "ALTER TABLE assignments ADD COLUMN completed INTEGER DEFAULT 0",
            [],
        )?;
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> anyhow::Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
