use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "COURSETRACK_DB";
pub const LOG_FILTER_ENV: &str = "COURSETRACK_LOG";
pub const DEFAULT_DB_FILE: &str = "courses.db";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Resolve the database file: explicit request path, then `COURSETRACK_DB`,
/// then `courses.db` in the working directory.
pub fn resolve_db_path(requested: Option<&str>) -> PathBuf {
    resolve_db_path_from(requested, std::env::var(DB_PATH_ENV).ok())
}

pub fn resolve_db_path_from(requested: Option<&str>, env: Option<String>) -> PathBuf {
    if let Some(p) = requested.map(str::trim).filter(|p| !p.is_empty()) {
        return PathBuf::from(p);
    }
    match env.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_DB_FILE),
    }
}

pub fn log_filter() -> String {
    std::env::var(LOG_FILTER_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        assert_eq!(
            resolve_db_path(Some("/tmp/x/tracker.db")),
            PathBuf::from("/tmp/x/tracker.db")
        );
    }

    #[test]
    fn blank_request_falls_back_to_env_then_default() {
        assert_eq!(
            resolve_db_path_from(Some("   "), None),
            PathBuf::from(DEFAULT_DB_FILE)
        );
        assert_eq!(resolve_db_path_from(None, None), PathBuf::from(DEFAULT_DB_FILE));
        assert_eq!(
            resolve_db_path_from(Some(""), Some(" /data/t.db ".to_string())),
            PathBuf::from("/data/t.db")
        );
    }

    #[test]
    fn env_path_is_used_unless_blank_and_loses_to_request() {
        assert_eq!(
            resolve_db_path_from(None, Some("/srv/courses.db".to_string())),
            PathBuf::from("/srv/courses.db")
        );
        assert_eq!(
            resolve_db_path_from(None, Some("  ".to_string())),
            PathBuf::from(DEFAULT_DB_FILE)
        );
        assert_eq!(
            resolve_db_path_from(Some("mine.db"), Some("/srv/courses.db".to_string())),
            PathBuf::from("mine.db")
        );
    }
}
