//! Drag and resize gesture interpretation.
//!
//! Converts the pointer-drag lifecycle of a generic drag-and-drop layer
//! (start, repeated moves, end or cancel) into a proposed minute range on the
//! grid. Three gesture kinds are recognized from the dragged payload:
//!
//! - **Placement**: a task dragged in from outside the grid. Positioned by the
//!   top edge of the dragged element and given the default duration.
//! - **Move**: an existing block dragged whole. Positioned by the top edge,
//!   keeping its duration.
//! - **Resize**: the bottom handle of an existing block. The start stays put
//!   and the end follows the bottom edge.
//!
//! Positions are recomputed from the absolute pointer rectangle on every move.
//! The cumulative pointer delta is only a fallback when no rectangle is
//! reported: combining a delta with independently re-rendered block positions
//! counts the movement twice.

use serde::{Deserialize, Serialize};

use crate::grid::{
    DEFAULT_DURATION_MINUTES, GridGeometry, MIN_DURATION_MINUTES, MINUTES_PER_DAY, clamp_to_day,
    snap_fractional, snap_to_quarter_hour,
};
use crate::task::Task;
use crate::types::TaskId;

/// Identifier of the grid's single drop zone.
pub const TIMELINE_DROP_ID: &str = "timeline-dropzone";

/// Data attached to a draggable element, discriminated on `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DragPayload {
    /// A task dragged in from an external list.
    Task { task: Task },

    /// A block already on the grid, dragged whole.
    #[serde(rename_all = "camelCase")]
    TimelineTask {
        task_id: TaskId,
        #[serde(default)]
        start_minutes: Option<i32>,
        #[serde(default)]
        end_minutes: Option<i32>,
    },

    /// The bottom resize handle of a block on the grid.
    #[serde(rename_all = "camelCase")]
    TimelineResize {
        task_id: TaskId,
        #[serde(default)]
        start_minutes: Option<i32>,
        #[serde(default)]
        end_minutes: Option<i32>,
    },
}

/// Client-space rectangle of the dragged element (translated if moved).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragRect {
    pub top: f64,
    pub bottom: f64,
}

/// Pointer state reported with every drag lifecycle callback.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPointer {
    /// Absolute position of the dragged element, if the drag layer reports one.
    #[serde(default)]
    pub rect: Option<DragRect>,

    /// Cumulative vertical pointer movement since drag start, in pixels.
    #[serde(default)]
    pub delta_y: f64,

    /// Drop target currently under the pointer.
    #[serde(default)]
    pub over: Option<String>,
}

impl DragPointer {
    /// True if the pointer is over the grid's drop zone.
    pub fn is_over_grid(&self) -> bool {
        self.over.as_deref() == Some(TIMELINE_DROP_ID)
    }
}

/// Client-space position of the mounted, scrollable grid container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Top of the container in client coordinates.
    pub container_top: f64,

    /// Current vertical scroll of the container.
    #[serde(default)]
    pub scroll_top: f64,

    /// Visible height of the container.
    #[serde(default)]
    pub height: f64,
}

/// What a gesture does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Placement,
    Move,
    Resize,
}

/// The task a gesture acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureSubject {
    /// A task already on the grid, looked up by id.
    Existing(TaskId),
    /// A task entering the grid, carried in full by the drag payload.
    External(Task),
}

impl GestureSubject {
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Existing(id) => id,
            Self::External(task) => &task.id,
        }
    }
}

/// The proposal of an in-flight gesture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureState {
    pub subject: GestureSubject,
    pub kind: GestureKind,
    pub start_minutes: i32,
    pub end_minutes: i32,
}

impl GestureState {
    /// True if the item is entering the grid for the first time.
    pub const fn is_new(&self) -> bool {
        matches!(self.kind, GestureKind::Placement)
    }

    pub const fn is_resizing(&self) -> bool {
        matches!(self.kind, GestureKind::Resize)
    }

    const fn same_range(&self, other: &Self) -> bool {
        self.start_minutes == other.start_minutes && self.end_minutes == other.end_minutes
    }
}

/// Result of evaluating the pointer against the grid.
enum Proposal {
    Range(GestureState),
    /// Pointer is not over the drop zone.
    OutsideGrid,
    /// Container or pointer geometry is not available.
    NoGeometry,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Top,
    Bottom,
}

/// Lifecycle of the single gesture slot.
#[derive(Debug, Clone, Default)]
enum Phase {
    #[default]
    Idle,
    Dragging {
        payload: DragPayload,
        proposal: Option<GestureState>,
        over_grid: bool,
    },
}

/// State machine over the drag lifecycle, holding at most one gesture.
#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    geometry: GridGeometry,
    phase: Phase,
}

impl GestureInterpreter {
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            phase: Phase::Idle,
        }
    }

    pub const fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Replaces the grid geometry, e.g. after the row height is re-measured.
    pub const fn set_geometry(&mut self, geometry: GridGeometry) {
        self.geometry = geometry;
    }

    /// The current proposal, if a gesture has produced one.
    pub const fn current(&self) -> Option<&GestureState> {
        match &self.phase {
            Phase::Dragging { proposal, .. } => proposal.as_ref(),
            Phase::Idle => None,
        }
    }

    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    /// The task being dragged in from outside the grid, if any.
    pub const fn dragged_external(&self) -> Option<&Task> {
        match &self.phase {
            Phase::Dragging {
                payload: DragPayload::Task { task },
                ..
            } => Some(task),
            _ => None,
        }
    }

    /// True while an external task hovers the drop zone.
    pub const fn is_drop_highlighted(&self) -> bool {
        matches!(
            self.phase,
            Phase::Dragging {
                payload: DragPayload::Task { .. },
                over_grid: true,
                ..
            }
        )
    }

    /// Begins a gesture.
    ///
    /// Blocks already on the grid get a proposal immediately. External tasks
    /// wait for the first move over the drop zone.
    pub fn drag_start(
        &mut self,
        payload: DragPayload,
        pointer: &DragPointer,
        viewport: Option<&Viewport>,
    ) {
        let proposal = match payload {
            DragPayload::Task { .. } => None,
            DragPayload::TimelineTask { .. } | DragPayload::TimelineResize { .. } => {
                match self.propose(&payload, pointer, viewport, true) {
                    Proposal::Range(state) => Some(state),
                    Proposal::OutsideGrid | Proposal::NoGeometry => None,
                }
            }
        };
        tracing::debug!(?payload, ?proposal, "drag started");
        self.phase = Phase::Dragging {
            payload,
            proposal,
            over_grid: pointer.is_over_grid(),
        };
    }

    /// Recomputes the proposal from the current pointer.
    ///
    /// Returns true if the proposal changed. Identical ranges leave the
    /// proposal untouched; missing geometry retains the previous proposal.
    pub fn drag_move(&mut self, pointer: &DragPointer, viewport: Option<&Viewport>) -> bool {
        let outcome = match &self.phase {
            Phase::Idle => return false,
            Phase::Dragging { payload, .. } => {
                self.propose(payload, pointer, viewport, pointer.is_over_grid())
            }
        };
        let Phase::Dragging {
            proposal,
            over_grid,
            ..
        } = &mut self.phase
        else {
            return false;
        };
        *over_grid = pointer.is_over_grid();

        match outcome {
            Proposal::Range(next) => {
                if proposal.as_ref().is_some_and(|prev| prev.same_range(&next)) {
                    return false;
                }
                tracing::trace!(
                    task = %next.subject.task_id(),
                    start = next.start_minutes,
                    end = next.end_minutes,
                    "gesture proposal updated"
                );
                *proposal = Some(next);
                true
            }
            Proposal::OutsideGrid => proposal.take().is_some(),
            Proposal::NoGeometry => false,
        }
    }

    /// Ends the gesture, returning the range to commit.
    ///
    /// Nothing is committed unless the pointer is released over the drop zone;
    /// where the pointer was earlier in the gesture does not matter.
    pub fn drag_end(
        &mut self,
        pointer: &DragPointer,
        viewport: Option<&Viewport>,
    ) -> Option<GestureState> {
        let Phase::Dragging {
            payload, proposal, ..
        } = std::mem::take(&mut self.phase)
        else {
            return None;
        };

        if !pointer.is_over_grid() {
            tracing::debug!(?payload, "dropped outside the grid");
            return None;
        }

        match self.propose(&payload, pointer, viewport, true) {
            Proposal::Range(state) => Some(state),
            Proposal::NoGeometry => proposal,
            Proposal::OutsideGrid => None,
        }
    }

    /// Abandons the gesture without committing anything.
    pub fn drag_cancel(&mut self) {
        if self.is_dragging() {
            tracing::debug!("drag cancelled");
        }
        self.phase = Phase::Idle;
    }

    fn propose(
        &self,
        payload: &DragPayload,
        pointer: &DragPointer,
        viewport: Option<&Viewport>,
        over_grid: bool,
    ) -> Proposal {
        let Some(viewport) = viewport else {
            return Proposal::NoGeometry;
        };
        if !over_grid {
            return Proposal::OutsideGrid;
        }

        let delta_minutes = snap_fractional(self.geometry.minutes_for_delta(pointer.delta_y));

        match payload {
            DragPayload::Task { task } => {
                let Some(pointer_start) = self.pointer_minutes(pointer, viewport, Edge::Top) else {
                    return Proposal::NoGeometry;
                };
                let start = clamp_to_day(pointer_start).min(MINUTES_PER_DAY - MIN_DURATION_MINUTES);
                let end = clamp_to_day(start + DEFAULT_DURATION_MINUTES);
                Proposal::Range(GestureState {
                    subject: GestureSubject::External(task.clone()),
                    kind: GestureKind::Placement,
                    start_minutes: start,
                    end_minutes: end,
                })
            }

            DragPayload::TimelineTask {
                task_id,
                start_minutes,
                end_minutes,
            } => {
                let (current_start, current_end) = current_range(*start_minutes, *end_minutes);
                let base_start = self
                    .pointer_minutes(pointer, viewport, Edge::Top)
                    .unwrap_or_else(|| snap_to_quarter_hour(current_start + delta_minutes));
                let duration =
                    (current_end - current_start).clamp(MIN_DURATION_MINUTES, MINUTES_PER_DAY);
                let start = clamp_to_day(base_start.min(MINUTES_PER_DAY - duration));
                let end = clamp_to_day(start + duration);
                Proposal::Range(GestureState {
                    subject: GestureSubject::Existing(task_id.clone()),
                    kind: GestureKind::Move,
                    start_minutes: start,
                    end_minutes: end,
                })
            }

            DragPayload::TimelineResize {
                task_id,
                start_minutes,
                end_minutes,
            } => {
                let (current_start, current_end) = current_range(*start_minutes, *end_minutes);
                let start = clamp_to_day(snap_to_quarter_hour(current_start))
                    .min(MINUTES_PER_DAY - MIN_DURATION_MINUTES);
                let min_end = start + MIN_DURATION_MINUTES;
                let proposed_end = self
                    .pointer_minutes(pointer, viewport, Edge::Bottom)
                    .unwrap_or_else(|| snap_to_quarter_hour(current_end + delta_minutes));
                let end = clamp_to_day(proposed_end.max(min_end));
                Proposal::Range(GestureState {
                    subject: GestureSubject::Existing(task_id.clone()),
                    kind: GestureKind::Resize,
                    start_minutes: start,
                    end_minutes: end,
                })
            }
        }
    }

    /// Snapped, clamped grid minute under one edge of the dragged element.
    fn pointer_minutes(
        &self,
        pointer: &DragPointer,
        viewport: &Viewport,
        edge: Edge,
    ) -> Option<i32> {
        let rect = pointer.rect?;
        let edge_y = match edge {
            Edge::Top => rect.top,
            Edge::Bottom => rect.bottom,
        };
        let y = edge_y - viewport.container_top + viewport.scroll_top;
        Some(clamp_to_day(snap_fractional(self.geometry.minutes_at_offset(y))))
    }
}

/// Range carried by an in-grid payload, clamped to the day. A missing start
/// is midnight and a missing end is start plus the default duration.
fn current_range(start: Option<i32>, end: Option<i32>) -> (i32, i32) {
    let start = clamp_to_day(start.unwrap_or(0));
    let end = clamp_to_day(end.unwrap_or(start + DEFAULT_DURATION_MINUTES));
    (start, end)
}
