//! Replay command: drives a day timeline through a scripted drag session.
//!
//! Writes committed by the timeline are queued on a simulated server and only
//! applied on a `flush` step, so a script can interleave background refreshes
//! with writes that are still in flight.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Deserialize;
use wr_core::grid::{format_clock, format_day_header, minutes_since_midnight};
use wr_core::{
    DragPayload, DragPointer, SchedulePatch, ScheduleSink, Task, TaskId, Timeline, Viewport,
};

use super::day;
use super::util::{load_tasks, resolve_date, save_tasks};
use crate::Config;

/// A scripted session.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Grid container position. Defaults to an unscrolled grid at the top of
    /// the client area.
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub steps: Vec<Step>,
}

/// One step of a script, discriminated on `event`.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Step {
    Start {
        payload: DragPayload,
        #[serde(default)]
        pointer: DragPointer,
    },
    Move {
        #[serde(default)]
        pointer: DragPointer,
    },
    End {
        #[serde(default)]
        pointer: DragPointer,
    },
    Cancel,
    #[serde(rename_all = "camelCase")]
    Unschedule {
        task_id: TaskId,
    },
    /// The server applies every queued write.
    Flush,
    /// The queued writes for a task fail.
    #[serde(rename_all = "camelCase")]
    Fail {
        task_id: TaskId,
    },
    /// The server's task list is fed back to the timeline.
    Refresh,
    Prev,
    Next,
    Today,
}

/// In-memory task store that receives the timeline's writes.
#[derive(Debug, Default)]
pub struct Server {
    tasks: Vec<Task>,
    queued: Vec<Task>,
}

impl Server {
    pub const fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            queued: Vec::new(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Applies queued writes in order. Returns how many were applied.
    pub fn flush(&mut self) -> usize {
        let count = self.queued.len();
        for write in std::mem::take(&mut self.queued) {
            match self.tasks.iter_mut().find(|task| task.id == write.id) {
                Some(slot) => *slot = write,
                None => self.tasks.push(write),
            }
        }
        count
    }

    /// Drops the queued writes for `id`. Returns how many were dropped.
    pub fn fail(&mut self, id: &TaskId) -> usize {
        let before = self.queued.len();
        self.queued.retain(|write| &write.id != id);
        before - self.queued.len()
    }
}

impl ScheduleSink for Server {
    fn placement_committed(&mut self, task: &Task, start_at: DateTime<Utc>, end_at: DateTime<Utc>) {
        self.queued
            .push(task.with_schedule(SchedulePatch::placed(start_at, end_at)));
    }

    fn unscheduled(&mut self, task: &Task) {
        self.queued.push(task.with_schedule(SchedulePatch::cleared()));
    }
}

/// Runs `steps` against `timeline`, writing one line per observable effect.
pub fn replay<W: Write, Tz: TimeZone>(
    writer: &mut W,
    timeline: &mut Timeline<Tz>,
    server: &mut Server,
    steps: &[Step],
    viewport: &Viewport,
    now: &DateTime<Tz>,
) -> Result<()> {
    for step in steps {
        tracing::trace!(?step, "replaying step");
        match step {
            Step::Start { payload, pointer } => {
                writeln!(writer, "start {}", describe(payload))?;
                timeline.drag_start(payload.clone(), pointer, Some(viewport));
            }
            Step::Move { pointer } => {
                if timeline.drag_move(pointer, Some(viewport)) {
                    match timeline.gestures().current() {
                        Some(gesture) => writeln!(
                            writer,
                            "preview {} {} - {}",
                            gesture.subject.task_id(),
                            format_clock(gesture.start_minutes),
                            format_clock(gesture.end_minutes)
                        )?,
                        None => writeln!(writer, "preview cleared")?,
                    }
                }
            }
            Step::End { pointer } => match timeline.drag_end(pointer, Some(viewport), server) {
                Some(task) => writeln!(
                    writer,
                    "placed {} {}",
                    task.id,
                    clock_range(timeline.timezone(), &task)
                )?,
                None => writeln!(writer, "drop ignored")?,
            },
            Step::Cancel => {
                timeline.drag_cancel();
                writeln!(writer, "cancelled")?;
            }
            Step::Unschedule { task_id } => match timeline.unschedule(task_id, server) {
                Some(_) => writeln!(writer, "unscheduled {task_id}")?,
                None => writeln!(writer, "unknown task {task_id}")?,
            },
            Step::Flush => {
                let applied = server.flush();
                writeln!(writer, "flushed {applied} writes")?;
            }
            Step::Fail { task_id } => {
                let dropped = server.fail(task_id);
                if timeline.commit_failed(task_id) {
                    writeln!(writer, "failed {task_id}: dropped {dropped} writes, reverted")?;
                } else {
                    writeln!(writer, "failed {task_id}: nothing pending")?;
                }
            }
            Step::Refresh => {
                let outcome = timeline.apply_server_snapshot(server.tasks().to_vec());
                writeln!(
                    writer,
                    "refresh: {} confirmed, {} held",
                    outcome.confirmed.len(),
                    outcome.held.len()
                )?;
            }
            Step::Prev => {
                timeline.prev_day();
                write_day(writer, timeline)?;
            }
            Step::Next => {
                timeline.next_day();
                write_day(writer, timeline)?;
            }
            Step::Today => {
                timeline.today(now);
                write_day(writer, timeline)?;
            }
        }
    }
    Ok(())
}

fn write_day<W: Write, Tz: TimeZone>(writer: &mut W, timeline: &Timeline<Tz>) -> Result<()> {
    writeln!(writer, "day {}", format_day_header(timeline.selected_date()))?;
    Ok(())
}

fn describe(payload: &DragPayload) -> String {
    match payload {
        DragPayload::Task { task } => format!("place {}", task.id),
        DragPayload::TimelineTask { task_id, .. } => format!("move {task_id}"),
        DragPayload::TimelineResize { task_id, .. } => format!("resize {task_id}"),
    }
}

/// `start - end` of a task's schedule as clock times in `tz`.
fn clock_range<Tz: TimeZone>(tz: &Tz, task: &Task) -> String {
    let clock = |ts: Option<DateTime<Utc>>| {
        ts.map_or_else(
            || "?".to_string(),
            |ts| format_clock(minutes_since_midnight(&ts.with_timezone(tz))),
        )
    };
    format!("{} - {}", clock(task.start_at), clock(task.end_at))
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    script_path: &Path,
    date: Option<&str>,
    tasks_path: Option<&Path>,
    write: bool,
) -> Result<()> {
    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", script_path.display()))?;

    let now = Local::now();
    let day = resolve_date(date, now.date_naive())?;
    let tasks_path = tasks_path.unwrap_or(&config.tasks_path);
    let tasks = load_tasks(tasks_path)?;

    let mut server = Server::new(tasks.clone());
    let mut timeline = Timeline::new(Local, day, config.grid, tasks);
    let viewport = script.viewport.unwrap_or(Viewport {
        container_top: 0.0,
        scroll_top: 0.0,
        height: config.viewport_height,
    });

    replay(writer, &mut timeline, &mut server, &script.steps, &viewport, &now)?;

    writeln!(writer)?;
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    day::render_text(
        writer,
        &day::build_report(&timeline, &now, timezone, config.viewport_height),
    )?;

    if write {
        let applied = server.flush();
        tracing::debug!(applied, "flushed outstanding writes before saving");
        save_tasks(tasks_path, server.tasks())?;
        writeln!(
            writer,
            "Saved {} tasks to {}",
            server.tasks().len(),
            tasks_path.display()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use wr_core::GridGeometry;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, m, 0).unwrap()
    }

    fn task(id: &str, title: &str, range: Option<((u32, u32), (u32, u32))>) -> Task {
        let mut task = Task::new(TaskId::new(id).unwrap(), title);
        if let Some(((sh, sm), (eh, em))) = range {
            task.start_at = Some(at(15, sh, sm));
            task.end_at = Some(at(15, eh, em));
        }
        task
    }

    fn seed() -> Vec<Task> {
        vec![
            task("A", "Standup", Some(((9, 0), (9, 30)))),
            task("B", "Review PR", Some(((9, 0), (10, 0)))),
            task("N", "Write report", None),
        ]
    }

    /// One pixel per minute with no padding.
    fn setup() -> (Timeline<Utc>, Server, Viewport) {
        let geometry = GridGeometry {
            hour_height: 60.0,
            vertical_padding: 0.0,
        };
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let viewport = Viewport {
            container_top: 0.0,
            scroll_top: 0.0,
            height: 600.0,
        };
        (Timeline::new(Utc, day, geometry, seed()), Server::new(seed()), viewport)
    }

    fn run_script(json: &str) -> (String, Timeline<Utc>, Server) {
        let script: Script = serde_json::from_str(json).unwrap();
        let (mut timeline, mut server, viewport) = setup();
        let mut output = Vec::new();
        let now = at(15, 10, 30);

        replay(&mut output, &mut timeline, &mut server, &script.steps, &viewport, &now).unwrap();
        writeln!(output).unwrap();
        let report = day::build_report(&timeline, &now, "UTC".to_string(), 600.0);
        day::render_text(&mut output, &report).unwrap();

        (String::from_utf8(output).unwrap(), timeline, server)
    }

    #[test]
    fn full_session_with_stale_refresh_and_failed_write() {
        let script = r#"{
            "steps": [
                {"event": "start", "payload": {"type": "task", "task": {"id": "N", "title": "Write report"}},
                 "pointer": {"rect": {"top": 0, "bottom": 30}}},
                {"event": "move", "pointer": {"rect": {"top": 127, "bottom": 157}, "over": "timeline-dropzone"}},
                {"event": "end", "pointer": {"rect": {"top": 127, "bottom": 157}, "over": "timeline-dropzone"}},
                {"event": "start", "payload": {"type": "timeline-task", "taskId": "B", "startMinutes": 540, "endMinutes": 600},
                 "pointer": {"rect": {"top": 540, "bottom": 600}, "over": "timeline-dropzone"}},
                {"event": "move", "pointer": {"rect": {"top": 842, "bottom": 902}, "over": "timeline-dropzone"}},
                {"event": "end", "pointer": {"rect": {"top": 842, "bottom": 902}, "over": "timeline-dropzone"}},
                {"event": "refresh"},
                {"event": "flush"},
                {"event": "refresh"},
                {"event": "unschedule", "taskId": "A"},
                {"event": "fail", "taskId": "A"},
                {"event": "next"},
                {"event": "next"},
                {"event": "today"}
            ]
        }"#;

        let (output, timeline, server) = run_script(script);

        assert_snapshot!(output.trim_end(), @r"
        start place N
        preview N 2:00 AM - 2:30 AM
        placed N 2:00 AM - 2:30 AM
        start move B
        preview B 2:00 PM - 3:00 PM
        placed B 2:00 PM - 3:00 PM
        refresh: 0 confirmed, 2 held
        flushed 2 writes
        refresh: 2 confirmed, 0 held
        unscheduled A
        failed A: dropped 1 writes, reverted
        day Thu, Jan 16
        day Fri, Jan 17
        day Wed, Jan 15

        Wed, Jan 15 (UTC)
         2:00 AM - 2:30 AM   [1/1]  Write report
         9:00 AM - 9:30 AM   [1/1]  Standup
         2:00 PM - 3:00 PM   [1/1]  Review PR
        Now: 10:30 AM
        ");

        assert_eq!(timeline.store().pending_len(), 0);
        assert_eq!(server.queued_len(), 0);
        let b = server.tasks().iter().find(|t| t.id.as_str() == "B").unwrap();
        assert_eq!(b.start_at, Some(at(15, 14, 0)));
    }

    #[test]
    fn drop_outside_grid_and_cancel_commit_nothing() {
        let script = r#"{
            "steps": [
                {"event": "start", "payload": {"type": "timeline-task", "taskId": "A", "startMinutes": 540, "endMinutes": 570},
                 "pointer": {"rect": {"top": 540, "bottom": 570}, "over": "timeline-dropzone"}},
                {"event": "end", "pointer": {"rect": {"top": 700, "bottom": 730}}},
                {"event": "start", "payload": {"type": "timeline-resize", "taskId": "B", "startMinutes": 540, "endMinutes": 600},
                 "pointer": {"rect": {"top": 540, "bottom": 600}, "over": "timeline-dropzone"}},
                {"event": "move", "pointer": {"rect": {"top": 540, "bottom": 700}, "over": "timeline-dropzone"}},
                {"event": "cancel"},
                {"event": "end", "pointer": {"rect": {"top": 540, "bottom": 700}, "over": "timeline-dropzone"}},
                {"event": "fail", "taskId": "A"}
            ]
        }"#;

        let (output, timeline, server) = run_script(script);

        assert_snapshot!(output.trim_end(), @r"
        start move A
        drop ignored
        start resize B
        preview B 9:00 AM - 11:45 AM
        cancelled
        drop ignored
        failed A: nothing pending

        Wed, Jan 15 (UTC)
         9:00 AM - 9:30 AM   [1/2]  Standup
         9:00 AM - 10:00 AM  [2/2]  Review PR
        Now: 10:30 AM
        ");

        assert_eq!(timeline.store().pending_len(), 0);
        assert_eq!(server.queued_len(), 0);
    }

    #[test]
    fn unknown_step_is_rejected() {
        let result = serde_json::from_str::<Script>(r#"{"steps": [{"event": "teleport"}]}"#);
        assert!(result.is_err());
    }
}
