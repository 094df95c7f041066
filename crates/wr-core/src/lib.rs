//! Core scheduling logic for the workrail day timeline.
//!
//! This crate contains the types and logic for:
//! - Grid: converting between timestamps, day minutes and pixel offsets
//! - Layout: placing overlapping blocks into side-by-side columns
//! - Gestures: turning drag and resize input into proposed ranges
//! - Reconciliation: optimistic local edits over server snapshots
//! - Timeline: one mounted day grid wiring the above together

pub mod gesture;
pub mod grid;
mod layout;
mod reconcile;
mod task;
mod timeline;
pub mod types;

pub use gesture::{
    DragPayload, DragPointer, DragRect, GestureInterpreter, GestureKind, GestureState,
    GestureSubject, TIMELINE_DROP_ID, Viewport,
};
pub use grid::{BlockExtent, GridGeometry};
pub use layout::{Positioned, PositionedBlock, ScheduledItem, TimeSpan, layout_columns};
pub use reconcile::{ReconcileStore, SnapshotOutcome};
pub use task::{SchedulePatch, Task, parse_timestamp};
pub use timeline::{DragOverlay, ScheduleSink, Timeline};
pub use types::{FolderId, TaskId, TaskPriority, TaskStatus, ValidationError};
