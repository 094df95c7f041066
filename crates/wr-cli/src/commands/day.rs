//! Day command: one day's scheduled tasks laid out on the grid.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::Serialize;
use wr_core::grid::{format_clock, format_day_header, minutes_since_midnight};
use wr_core::{PositionedBlock, Timeline};

use super::util::{load_tasks, resolve_date};
use crate::Config;

/// Rendered state of one day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub date: NaiveDate,
    pub timezone: String,
    pub content_height: f64,
    /// Current minute of the day, when the day shown is today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_minutes: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscroll_target: Option<f64>,
    pub blocks: Vec<BlockView>,
}

/// A laid-out block with its pixel extent.
#[derive(Debug, Serialize)]
pub struct BlockView {
    #[serde(flatten)]
    pub block: PositionedBlock,
    pub top: f64,
    pub height: f64,
}

/// Collects the day currently selected on `timeline`.
pub fn build_report<Tz: TimeZone>(
    timeline: &Timeline<Tz>,
    now: &DateTime<Tz>,
    timezone: String,
    viewport_height: f64,
) -> DayReport {
    let geometry = timeline.geometry();
    let blocks = timeline
        .positioned_blocks()
        .into_iter()
        .map(|block| {
            let extent = geometry.block_extent(block.item.start_minutes, block.item.end_minutes);
            BlockView {
                block,
                top: extent.top,
                height: extent.height,
            }
        })
        .collect();

    let now_offset = timeline.now_offset(now);
    DayReport {
        date: timeline.selected_date(),
        timezone,
        content_height: geometry.content_height(),
        now_minutes: now_offset.map(|_| minutes_since_midnight(now)),
        now_offset,
        autoscroll_target: timeline.autoscroll_target(now, viewport_height),
        blocks,
    }
}

/// Writes the report as a plain-text agenda.
pub fn render_text<W: Write>(writer: &mut W, report: &DayReport) -> Result<()> {
    writeln!(
        writer,
        "{} ({})",
        format_day_header(report.date),
        report.timezone
    )?;

    if report.blocks.is_empty() {
        writeln!(writer, "No tasks scheduled.")?;
    }
    for view in &report.blocks {
        let item = &view.block.item;
        writeln!(
            writer,
            "{:>8} - {:<8}  [{}/{}]  {}",
            format_clock(item.start_minutes),
            format_clock(item.end_minutes),
            view.block.column + 1,
            view.block.columns,
            item.task.title
        )?;
    }

    if let Some(minutes) = report.now_minutes {
        writeln!(writer, "Now: {}", format_clock(minutes))?;
    }
    Ok(())
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    date: Option<&str>,
    tasks_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let now = Local::now();
    let day = resolve_date(date, now.date_naive())?;
    let tasks = load_tasks(tasks_path.unwrap_or(&config.tasks_path))?;
    let timeline = Timeline::new(Local, day, config.grid, tasks);

    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    let report = build_report(&timeline, &now, timezone, config.viewport_height);

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        render_text(writer, &report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use insta::assert_snapshot;
    use wr_core::{GridGeometry, Task, TaskId};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap()
    }

    fn task(id: &str, title: &str, start: (u32, u32), end: (u32, u32)) -> Task {
        let mut task = Task::new(TaskId::new(id).unwrap(), title);
        task.start_at = Some(at(start.0, start.1));
        task.end_at = Some(at(end.0, end.1));
        task
    }

    fn timeline(tasks: Vec<Task>) -> Timeline<Utc> {
        Timeline::new(
            Utc,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            GridGeometry::default(),
            tasks,
        )
    }

    #[test]
    fn day_agenda_shows_columns_and_now() {
        let timeline = timeline(vec![
            task("c", "Write report", (13, 0), (13, 45)),
            task("a", "Plan sprint", (9, 0), (10, 0)),
            task("b", "Review PR", (9, 30), (10, 30)),
        ]);
        let report = build_report(&timeline, &at(10, 30), "UTC".to_string(), 720.0);

        let mut output = Vec::new();
        render_text(&mut output, &report).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_snapshot!(output.trim_end(), @r"
        Wed, Jan 15 (UTC)
         9:00 AM - 10:00 AM  [1/2]  Plan sprint
         9:30 AM - 10:30 AM  [2/2]  Review PR
         1:00 PM - 1:45 PM   [1/1]  Write report
        Now: 10:30 AM
        ");
    }

    #[test]
    fn empty_day_on_another_date() {
        let timeline = timeline(vec![]);
        let tomorrow = Utc.with_ymd_and_hms(2025, 1, 16, 8, 0, 0).unwrap();
        let report = build_report(&timeline, &tomorrow, "UTC".to_string(), 720.0);

        let mut output = Vec::new();
        render_text(&mut output, &report).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert_snapshot!(output.trim_end(), @r"
        Wed, Jan 15 (UTC)
        No tasks scheduled.
        ");
    }

    #[test]
    fn json_report_carries_pixel_extents() {
        let timeline = timeline(vec![task("a", "Plan sprint", (9, 0), (10, 0))]);
        let report = build_report(&timeline, &at(10, 30), "UTC".to_string(), 720.0);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["date"], "2025-01-15");
        assert_eq!(json["nowMinutes"], 630);
        assert_eq!(json["nowOffset"], 768.0);
        assert_eq!(json["autoscrollTarget"], 408.0);
        assert_eq!(json["contentHeight"], 1752.0);

        let block = &json["blocks"][0];
        assert_eq!(block["task"]["id"], "a");
        assert_eq!(block["startMinutes"], 540);
        assert_eq!(block["endMinutes"], 600);
        assert_eq!(block["column"], 0);
        assert_eq!(block["columns"], 1);
        assert_eq!(block["top"], 660.0);
        assert_eq!(block["height"], 72.0);
    }
}
