//! Tasks as owned by the persistence layer.
//!
//! The timeline only ever reads and writes a task's `startAt`/`endAt`; every
//! other field is carried through untouched.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{FolderId, TaskId, TaskPriority, TaskStatus};

/// A task record in its wire form (camelCase JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub due_date: Option<DateTime<Utc>>,

    /// Start of the scheduled range. `None` means unscheduled.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_at: Option<DateTime<Utc>>,

    /// End of the scheduled range.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub end_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
}

impl Task {
    /// Creates an unscheduled task with default status and priority.
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            due_date: None,
            start_at: None,
            end_at: None,
            folder_id: None,
        }
    }

    /// Returns true if the task has a start time.
    pub const fn is_scheduled(&self) -> bool {
        self.start_at.is_some()
    }

    /// The task's current schedule fields.
    pub const fn schedule(&self) -> SchedulePatch {
        SchedulePatch {
            start_at: self.start_at,
            end_at: self.end_at,
        }
    }

    /// Returns a copy with the schedule fields replaced.
    #[must_use]
    pub fn with_schedule(&self, patch: SchedulePatch) -> Self {
        Self {
            start_at: patch.start_at,
            end_at: patch.end_at,
            ..self.clone()
        }
    }
}

/// The schedule fields of a task, as written by the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePatch {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl SchedulePatch {
    /// A patch placing the task at `[start, end)`.
    pub const fn placed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_at: Some(start),
            end_at: Some(end),
        }
    }

    /// The unschedule patch: both fields cleared.
    pub const fn cleared() -> Self {
        Self {
            start_at: None,
            end_at: None,
        }
    }

    /// Compares schedules by millisecond value; sub-millisecond precision is
    /// not preserved by the server.
    pub fn matches(&self, other: &Self) -> bool {
        millis(self.start_at) == millis(other.start_at)
            && millis(self.end_at) == millis(other.end_at)
    }
}

fn millis(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_millis())
}

/// Parses a timestamp from the wire, accepting RFC 3339 or a zone-less ISO
/// 8601 value (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Deserializes an optional timestamp, mapping unparsable values to `None`.
///
/// Upstream data may be partially invalid; a task with a bad timestamp is
/// treated as unscheduled rather than failing the whole snapshot.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(raw)) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                tracing::warn!(value = %raw, "ignoring unparsable task timestamp");
            }
            parsed
        }
        Some(other) => {
            tracing::warn!(value = %other, "ignoring non-string task timestamp");
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    #[test]
    fn deserializes_wire_form() {
        let json = r#"{
            "id": "t1",
            "title": "Write report",
            "status": "in_progress",
            "priority": "urgent",
            "startAt": "2025-01-15T09:00:00Z",
            "endAt": "2025-01-15T10:00:00.000Z",
            "folderId": "work"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();

        assert_eq!(task.id.as_str(), "t1");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::Urgent);
        assert_eq!(task.start_at, Some(utc(9, 0)));
        assert_eq!(task.end_at, Some(utc(10, 0)));
        assert_eq!(task.folder_id.as_ref().map(FolderId::as_str), Some("work"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let task: Task = serde_json::from_str(r#"{"id": "t1", "title": "Inbox"}"#).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(!task.is_scheduled());
    }

    #[test]
    fn unparsable_timestamps_become_unscheduled() {
        let json = r#"{
            "id": "t1",
            "title": "x",
            "startAt": "yesterday-ish",
            "endAt": 42,
            "dueDate": null
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.start_at, None);
        assert_eq!(task.end_at, None);
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn zoneless_timestamp_reads_as_utc() {
        assert_eq!(parse_timestamp("2025-01-15T09:30:00"), Some(utc(9, 30)));
        assert_eq!(
            parse_timestamp("2025-01-15T09:30:00.250"),
            Some(utc(9, 30) + chrono::Duration::milliseconds(250))
        );
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn patch_matches_at_millisecond_precision() {
        let a = SchedulePatch::placed(utc(9, 0), utc(10, 0));
        let b = SchedulePatch::placed(
            utc(9, 0) + chrono::Duration::microseconds(400),
            utc(10, 0),
        );
        assert!(a.matches(&b));
        assert!(!a.matches(&SchedulePatch::cleared()));
        assert!(SchedulePatch::cleared().matches(&SchedulePatch::cleared()));
    }

    #[test]
    fn with_schedule_keeps_other_fields() {
        let mut task = Task::new(TaskId::new("t1").unwrap(), "Plan");
        task.priority = TaskPriority::High;
        let placed = task.with_schedule(SchedulePatch::placed(utc(9, 0), utc(9, 30)));
        assert_eq!(placed.priority, TaskPriority::High);
        assert_eq!(placed.title, "Plan");
        assert!(placed.is_scheduled());
    }
}
