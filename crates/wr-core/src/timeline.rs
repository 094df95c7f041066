//! The day timeline: ties the grid, layout, gesture interpreter and
//! reconciliation store together for one mounted grid.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::gesture::{DragPayload, DragPointer, GestureInterpreter, GestureSubject, Viewport};
use crate::grid::{
    DEFAULT_DURATION_MINUTES, GridGeometry, MIN_DURATION_MINUTES, MINUTES_PER_DAY, build_timestamp,
    clamp_to_day, minutes_since_midnight,
};
use crate::layout::{Positioned, PositionedBlock, ScheduledItem, layout_columns};
use crate::reconcile::{ReconcileStore, SnapshotOutcome};
use crate::task::{SchedulePatch, Task};
use crate::types::TaskId;

/// Receives committed schedule changes.
///
/// Calls are fire-and-forget: the implementor issues the write and later
/// feeds the resulting server list back through
/// [`Timeline::apply_server_snapshot`], or reports a failed write through
/// [`Timeline::commit_failed`].
pub trait ScheduleSink {
    /// `task` is the task as known before the placement.
    fn placement_committed(&mut self, task: &Task, start_at: DateTime<Utc>, end_at: DateTime<Utc>);

    fn unscheduled(&mut self, task: &Task);
}

/// What follows the pointer while dragging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOverlay {
    /// Preview of the block at its proposed range, rendered single-column.
    Block(PositionedBlock),
    /// An external task that has not reached the grid yet.
    Card(Task),
}

/// State of one mounted day grid.
#[derive(Debug, Clone)]
pub struct Timeline<Tz: TimeZone> {
    tz: Tz,
    selected_date: NaiveDate,
    store: ReconcileStore,
    gestures: GestureInterpreter,
}

impl<Tz: TimeZone> Timeline<Tz> {
    /// Creates a grid showing `day`, seeded with the last known server list.
    pub fn new(tz: Tz, day: NaiveDate, geometry: GridGeometry, tasks: Vec<Task>) -> Self {
        Self {
            tz,
            selected_date: day,
            store: ReconcileStore::new(tasks),
            gestures: GestureInterpreter::new(geometry),
        }
    }

    /// Zone the grid's days and clock times are read in.
    pub const fn timezone(&self) -> &Tz {
        &self.tz
    }

    pub const fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub const fn set_selected_date(&mut self, day: NaiveDate) {
        self.selected_date = day;
    }

    pub fn prev_day(&mut self) {
        self.selected_date = self.selected_date.pred_opt().unwrap_or(self.selected_date);
    }

    pub fn next_day(&mut self) {
        self.selected_date = self.selected_date.succ_opt().unwrap_or(self.selected_date);
    }

    /// Jumps to the date of `now`.
    pub fn today(&mut self, now: &DateTime<Tz>) {
        self.selected_date = now.date_naive();
    }

    pub const fn store(&self) -> &ReconcileStore {
        &self.store
    }

    pub const fn gestures(&self) -> &GestureInterpreter {
        &self.gestures
    }

    pub const fn geometry(&self) -> &GridGeometry {
        self.gestures.geometry()
    }

    pub const fn set_geometry(&mut self, geometry: GridGeometry) {
        self.gestures.set_geometry(geometry);
    }

    /// Folds a fresh server task list into the local state.
    pub fn apply_server_snapshot(&mut self, tasks: Vec<Task>) -> SnapshotOutcome {
        self.store.apply_server_snapshot(tasks)
    }

    /// Items to draw on the selected day, including the drag preview.
    ///
    /// A task being dragged is drawn only at its proposed range.
    pub fn scheduled_items(&self) -> Vec<ScheduledItem> {
        let gesture = self.gestures.current();
        let dragged = gesture.map(|g| g.subject.task_id());

        let mut items: Vec<ScheduledItem> = self
            .store
            .local_items()
            .iter()
            .filter(|task| Some(&task.id) != dragged)
            .filter_map(|task| self.resolve(task))
            .collect();

        if let Some(gesture) = gesture {
            let task = match &gesture.subject {
                GestureSubject::External(task) => Some(task.clone()),
                GestureSubject::Existing(id) => self.store.get(id).cloned(),
            };
            if let Some(task) = task {
                items.push(ScheduledItem {
                    task,
                    start_minutes: gesture.start_minutes,
                    end_minutes: gesture.end_minutes,
                    ghost: !gesture.is_resizing(),
                });
            }
        }

        items
    }

    /// Scheduled items laid out into columns.
    pub fn positioned_blocks(&self) -> Vec<PositionedBlock> {
        layout_columns(self.scheduled_items())
    }

    /// Resolves a task to its range on the selected day.
    ///
    /// Unscheduled tasks and tasks starting on another day yield `None`. An
    /// end on a later day runs to midnight; a missing or earlier end gives the
    /// default duration. Every range is at least the minimum duration, clamped
    /// to the day.
    fn resolve(&self, task: &Task) -> Option<ScheduledItem> {
        let start = task.start_at?.with_timezone(&self.tz);
        if start.date_naive() != self.selected_date {
            return None;
        }

        let start_minutes = clamp_to_day(minutes_since_midnight(&start));
        let raw_end = match task.end_at.map(|end| end.with_timezone(&self.tz)) {
            Some(end) if end.date_naive() == self.selected_date => minutes_since_midnight(&end),
            Some(end) if end.date_naive() > self.selected_date => MINUTES_PER_DAY,
            _ => start_minutes + DEFAULT_DURATION_MINUTES,
        };
        let end_minutes = clamp_to_day(raw_end.max(start_minutes + MIN_DURATION_MINUTES));

        Some(ScheduledItem {
            task: task.clone(),
            start_minutes,
            end_minutes,
            ghost: false,
        })
    }

    /// What to draw under the pointer during a drag.
    pub fn overlay(&self) -> Option<DragOverlay> {
        if let Some(gesture) = self.gestures.current().filter(|g| !g.is_resizing()) {
            let task = match &gesture.subject {
                GestureSubject::External(task) => Some(task.clone()),
                GestureSubject::Existing(id) => self.store.get(id).cloned(),
            };
            return task.map(|task| {
                DragOverlay::Block(Positioned {
                    item: ScheduledItem {
                        task,
                        start_minutes: gesture.start_minutes,
                        end_minutes: gesture.end_minutes,
                        ghost: false,
                    },
                    column: 0,
                    columns: 1,
                })
            });
        }

        self.gestures
            .dragged_external()
            .map(|task| DragOverlay::Card(task.clone()))
    }

    /// Pixel offset of the current-time line, when viewing today.
    pub fn now_offset(&self, now: &DateTime<Tz>) -> Option<f64> {
        (now.date_naive() == self.selected_date)
            .then(|| self.geometry().offset_for_minutes(minutes_since_midnight(now)))
    }

    /// Scroll position that centers the current time in a viewport of
    /// `viewport_height` pixels, when viewing today.
    pub fn autoscroll_target(&self, now: &DateTime<Tz>, viewport_height: f64) -> Option<f64> {
        self.now_offset(now)
            .map(|offset| (offset - viewport_height / 2.0).max(0.0))
    }

    pub fn drag_start(
        &mut self,
        payload: DragPayload,
        pointer: &DragPointer,
        viewport: Option<&Viewport>,
    ) {
        self.gestures.drag_start(payload, pointer, viewport);
    }

    /// Returns true if the preview changed and the grid should redraw.
    pub fn drag_move(&mut self, pointer: &DragPointer, viewport: Option<&Viewport>) -> bool {
        self.gestures.drag_move(pointer, viewport)
    }

    /// Finishes a drag, committing the final range if released over the grid.
    ///
    /// Returns the task as now displayed when a placement was committed.
    pub fn drag_end<S: ScheduleSink + ?Sized>(
        &mut self,
        pointer: &DragPointer,
        viewport: Option<&Viewport>,
        sink: &mut S,
    ) -> Option<Task> {
        let committed = self.gestures.drag_end(pointer, viewport)?;
        let task = match committed.subject {
            GestureSubject::External(task) => task,
            GestureSubject::Existing(id) => {
                let Some(task) = self.store.get(&id) else {
                    tracing::debug!(task = %id, "dragged task disappeared before drop");
                    return None;
                };
                task.clone()
            }
        };
        Some(self.place(&task, committed.start_minutes, committed.end_minutes, sink))
    }

    pub fn drag_cancel(&mut self) {
        self.gestures.drag_cancel();
    }

    /// Places `task` at `[start_minutes, end_minutes)` on the selected day.
    ///
    /// The range is clamped to the day with at least the minimum duration.
    /// The change is applied locally before the sink is notified.
    pub fn place<S: ScheduleSink + ?Sized>(
        &mut self,
        task: &Task,
        start_minutes: i32,
        end_minutes: i32,
        sink: &mut S,
    ) -> Task {
        let start_minutes = clamp_to_day(start_minutes).min(MINUTES_PER_DAY - MIN_DURATION_MINUTES);
        let end_minutes = clamp_to_day(end_minutes.max(start_minutes + MIN_DURATION_MINUTES));

        let start_at =
            build_timestamp(&self.tz, self.selected_date, start_minutes).with_timezone(&Utc);
        let end_at =
            build_timestamp(&self.tz, self.selected_date, end_minutes).with_timezone(&Utc);

        let updated = self
            .store
            .propose_mutation(task, SchedulePatch::placed(start_at, end_at));
        tracing::debug!(task = %task.id, %start_at, %end_at, "placement committed");
        sink.placement_committed(task, start_at, end_at);
        updated
    }

    /// Clears a task's schedule. The task leaves the grid but is not deleted.
    pub fn unschedule<S: ScheduleSink + ?Sized>(
        &mut self,
        id: &TaskId,
        sink: &mut S,
    ) -> Option<Task> {
        let task = self.store.get(id)?.clone();
        let updated = self.store.propose_mutation(&task, SchedulePatch::cleared());
        tracing::debug!(task = %id, "task unscheduled");
        sink.unscheduled(&task);
        Some(updated)
    }

    /// Rolls back the pending change for `id` after its write failed.
    pub fn commit_failed(&mut self, id: &TaskId) -> bool {
        let reverted = self.store.revert(id);
        if reverted {
            tracing::debug!(task = %id, "schedule write failed, local change reverted");
        }
        reverted
    }
}
