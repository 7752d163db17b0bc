use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode};
use serde::Serialize;
use std::path::Path;

use crate::db;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} name must not be empty")]
    EmptyName { entity: &'static str },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("storage error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, msg) if f.code == ErrorCode::ConstraintViolation => {
                StoreError::Constraint(msg.clone().unwrap_or_else(|| f.to_string()))
            }
            _ => StoreError::Sqlite(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: i64,
    pub name: String,
    pub grade: String,
    pub max_grade: String,
    pub date: String,
    pub completed: bool,
}

/// SQLite-backed course/subject/assignment rows.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db(path)?,
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_db_in_memory()?,
        })
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ---- courses ----

    pub fn create_course(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName { entity: "course" });
        }
        self.conn
            .execute("INSERT INTO courses(name) VALUES(?)", [name])?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, "course added");
        Ok(id)
    }

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM courses ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Course {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_course(&self, id: i64) -> Result<()> {
        let n = self.conn.execute("DELETE FROM courses WHERE id = ?", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "course",
                id,
            });
        }
        tracing::debug!(id, "course deleted");
        Ok(())
    }

    // ---- subjects ----

    pub fn create_subject(&self, course_id: i64, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName { entity: "subject" });
        }
        self.conn.execute(
            "INSERT INTO subjects(course_id, name) VALUES(?, ?)",
            (course_id, name),
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, course_id, name, "subject added");
        Ok(id)
    }

    pub fn list_subjects_by_course(&self, course_id: i64) -> Result<Vec<Subject>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM subjects WHERE course_id = ? ORDER BY id")?;
        let rows = stmt
            .query_map([course_id], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_subject(&self, id: i64) -> Result<()> {
        let n = self.conn.execute("DELETE FROM subjects WHERE id = ?", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "subject",
                id,
            });
        }
        tracing::debug!(id, "subject deleted");
        Ok(())
    }

    // ---- assignments ----

    pub fn create_assignment(
        &self,
        subject_id: i64,
        name: &str,
        grade: &str,
        max_grade: &str,
        date: &str,
        completed: bool,
    ) -> Result<i64> {
        let name = name.trim();
        self.conn.execute(
            "INSERT INTO assignments(subject_id, name, grade, max_grade, date, completed)
             VALUES(?, ?, ?, ?, ?, ?)",
            (subject_id, name, grade, max_grade, date, completed),
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, subject_id, name, "assignment added");
        Ok(id)
    }

    pub fn list_assignments_by_subject(&self, subject_id: i64) -> Result<Vec<Assignment>> {
        let mut stmt = self.conn.prepare_cached(
            // Older files stored grade as INTEGER; read every free-text column as text.
            "SELECT id, name, CAST(grade AS TEXT), CAST(max_grade AS TEXT), CAST(date AS TEXT), completed
             FROM assignments
             WHERE subject_id = ?
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([subject_id], |row| {
                Ok(Assignment {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    grade: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    max_grade: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    date: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    completed: completed_flag(row.get::<_, Option<Value>>(5)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Full-row overwrite. Callers merge untouched fields from their last read.
    pub fn update_assignment(
        &self,
        id: i64,
        name: &str,
        grade: &str,
        max_grade: &str,
        date: &str,
        completed: bool,
    ) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE assignments
             SET name = ?, grade = ?, max_grade = ?, date = ?, completed = ?
             WHERE id = ?",
            (name, grade, max_grade, date, completed, id),
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment",
                id,
            });
        }
        tracing::debug!(id, "assignment updated");
        Ok(())
    }

    pub fn delete_assignment(&self, id: i64) -> Result<()> {
        let n = self
            .conn
            .execute("DELETE FROM assignments WHERE id = ?", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment",
                id,
            });
        }
        tracing::debug!(id, "assignment deleted");
        Ok(())
    }
}

/// Older files may hold text or reals in `completed`; a bad value must not
/// make the whole tree unreadable.
fn completed_flag(v: Option<Value>) -> bool {
    match v {
        Some(Value::Integer(n)) => n != 0,
        Some(Value::Real(f)) => f != 0.0,
        Some(Value::Text(t)) => {
            let t = t.trim();
            !(t.is_empty() || t == "0" || t.eq_ignore_ascii_case("false"))
        }
        Some(Value::Blob(_)) | Some(Value::Null) | None => false,
    }
}
