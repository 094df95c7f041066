//! Overlap layout for a day's blocks.
//!
//! Blocks that overlap in time are placed side by side. The day is first split
//! into clusters (maximal runs of transitively overlapping ranges), then each
//! cluster is colored with a greedy sweep: every block takes the lowest column
//! not held by a block that is still running. Sweeping in start order makes
//! the greedy coloring optimal, so a cluster uses exactly as many columns as
//! its largest set of mutually overlapping blocks.

use serde::Serialize;

use crate::task::Task;

/// A value occupying a half-open minute range `[start, end)` of one day.
pub trait TimeSpan {
    fn start_minutes(&self) -> i32;
    fn end_minutes(&self) -> i32;
}

/// A task resolved to a minute range on the day being viewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledItem {
    pub task: Task,
    pub start_minutes: i32,
    pub end_minutes: i32,
    /// True for the in-flight preview of a drag that has not been committed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ghost: bool,
}

impl TimeSpan for ScheduledItem {
    fn start_minutes(&self) -> i32 {
        self.start_minutes
    }

    fn end_minutes(&self) -> i32 {
        self.end_minutes
    }
}

/// An item labeled with its column within its cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Positioned<T> {
    #[serde(flatten)]
    pub item: T,
    /// Zero-based column index.
    pub column: usize,
    /// Column count shared by every item in the cluster.
    pub columns: usize,
}

/// A scheduled item ready to render.
pub type PositionedBlock = Positioned<ScheduledItem>;

/// Assigns every item a `(column, columns)` pair.
///
/// Items are returned ordered by start, then end; items with identical ranges
/// keep their input order.
pub fn layout_columns<T: TimeSpan>(items: Vec<T>) -> Vec<Positioned<T>> {
    let mut sorted = items;
    // Stable, so ties resolve by input order.
    sorted.sort_by_key(|item| (item.start_minutes(), item.end_minutes()));

    let mut positioned = Vec::with_capacity(sorted.len());
    let mut cluster: Vec<T> = Vec::new();
    let mut cluster_end = i32::MIN;

    for item in sorted {
        if !cluster.is_empty() && item.start_minutes() >= cluster_end {
            layout_cluster(std::mem::take(&mut cluster), &mut positioned);
            cluster_end = i32::MIN;
        }
        cluster_end = cluster_end.max(item.end_minutes());
        cluster.push(item);
    }
    if !cluster.is_empty() {
        layout_cluster(cluster, &mut positioned);
    }

    positioned
}

/// Colors one cluster (already in sweep order) and appends it to `out`.
fn layout_cluster<T: TimeSpan>(cluster: Vec<T>, out: &mut Vec<Positioned<T>>) {
    // (column, end_minutes) of blocks still running at the sweep position.
    let mut active: Vec<(usize, i32)> = Vec::new();
    let mut placed: Vec<(T, usize)> = Vec::with_capacity(cluster.len());
    let mut max_column = 0;

    for item in cluster {
        let start = item.start_minutes();
        active.retain(|&(_, end)| end > start);

        let column = (0..)
            .find(|candidate| !active.iter().any(|&(used, _)| used == *candidate))
            .unwrap_or(active.len());

        active.push((column, item.end_minutes()));
        max_column = max_column.max(column);
        placed.push((item, column));
    }

    let columns = max_column + 1;
    out.extend(placed.into_iter().map(|(item, column)| Positioned {
        item,
        column,
        columns,
    }));
}
