//! Shared utilities for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use wr_core::Task;

/// Parses a `YYYY-MM-DD` day.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {raw}. Use YYYY-MM-DD (e.g., 2025-01-15)"))
}

/// The day named by `--date`, or `today` when none was given.
pub fn resolve_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    raw.map_or(Ok(today), parse_date)
}

/// Reads the JSON task list. A missing file is an empty list.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "task file not found, starting empty");
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(count = tasks.len(), path = %path.display(), "loaded tasks");
    Ok(tasks)
}

/// Writes the task list as pretty JSON, creating the parent directory.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut json = serde_json::to_string_pretty(tasks).context("failed to serialize tasks")?;
    json.push('\n');
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use wr_core::TaskId;

    #[test]
    fn parses_iso_day() {
        let day = parse_date("2025-01-15").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        let err = parse_date("15/01/2025").unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn missing_date_falls_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(resolve_date(None, today).unwrap(), today);
        assert!(resolve_date(Some("soon"), today).is_err());
    }

    #[test]
    fn missing_task_file_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let tasks = load_tasks(&temp.path().join("tasks.json")).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn saved_tasks_load_back() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/tasks.json");
        let tasks = vec![Task::new(TaskId::new("t1").unwrap(), "Write report")];

        save_tasks(&path, &tasks).unwrap();
        assert_eq!(load_tasks(&path).unwrap(), tasks);
    }

    #[test]
    fn malformed_task_file_names_the_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tasks.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_tasks(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
