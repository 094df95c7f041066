//! Time grid model.
//!
//! Maps wall-clock timestamps to minute offsets within a single day
//! (`0..=1440`) and back, and maps minute offsets to pixel offsets on the
//! rendered grid.
//!
//! None of these functions clamp their minute arguments. Callers clamp
//! explicitly with [`clamp_to_day`] at each use site so the conversions stay
//! composable.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Granularity of pointer-driven placement.
pub const SNAP_MINUTES: i32 = 15;

/// Shortest range a placement or resize may produce.
pub const MIN_DURATION_MINUTES: i32 = 15;

/// Duration given to a task dropped onto the grid for the first time.
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

/// Rendered blocks are never shorter than this, in pixels.
const MIN_BLOCK_HEIGHT: f64 = 12.0;

/// Minutes since local midnight (`hours * 60 + minutes`) in the timestamp's zone.
#[expect(
    clippy::cast_possible_wrap,
    reason = "hour * 60 + minute is at most 1439"
)]
pub fn minutes_since_midnight<Tz: TimeZone>(ts: &DateTime<Tz>) -> i32 {
    (ts.hour() * 60 + ts.minute()) as i32
}

/// Clamps a minute offset to `[0, 1440]`.
pub const fn clamp_to_day(minutes: i32) -> i32 {
    if minutes < 0 {
        0
    } else if minutes > MINUTES_PER_DAY {
        MINUTES_PER_DAY
    } else {
        minutes
    }
}

/// Rounds to the nearest multiple of 15, halves rounding up.
pub fn snap_to_quarter_hour(minutes: i32) -> i32 {
    let step = i64::from(SNAP_MINUTES);
    let snapped = (i64::from(minutes) + step / 2).div_euclid(step) * step;
    // Only reachable just above i32::MIN.
    i32::try_from(snapped).unwrap_or(i32::MIN / SNAP_MINUTES * SNAP_MINUTES)
}

/// Snaps a fractional, pointer-derived minute value to the quarter-hour grid.
///
/// Non-finite input snaps to 0.
#[expect(
    clippy::cast_possible_truncation,
    reason = "quarters are clamped well inside i32 range before the cast"
)]
pub fn snap_fractional(minutes: f64) -> i32 {
    if !minutes.is_finite() {
        return 0;
    }
    let step = f64::from(SNAP_MINUTES);
    let quarters = (minutes / step + 0.5).floor().clamp(-1.0e8, 1.0e8);
    quarters as i32 * SNAP_MINUTES
}

/// Builds the timestamp at `minutes` past midnight of `day` in `tz`, with zero
/// seconds.
///
/// Minute 1440 is midnight of the following day. A local time that falls in
/// a DST gap resolves one hour later; an ambiguous one resolves to the earlier
/// instant.
pub fn build_timestamp<Tz: TimeZone>(tz: &Tz, day: NaiveDate, minutes: i32) -> DateTime<Tz> {
    let midnight = day.and_time(NaiveTime::MIN);
    let naive = midnight
        .checked_add_signed(Duration::minutes(i64::from(minutes)))
        .unwrap_or(midnight);

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        }
    }
}

/// True if both timestamps fall on the same calendar date in `Tz`.
pub fn is_same_day<Tz: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
    a.date_naive() == b.date_naive()
}

/// Formats a minute offset as a 12-hour clock time, e.g. `9:05 AM`.
pub fn format_clock(minutes: i32) -> String {
    let minutes = clamp_to_day(minutes);
    let hour = (minutes / 60) % 24;
    let minute = minutes % 60;
    let suffix = if hour >= 12 { "PM" } else { "AM" };
    format!("{}:{minute:02} {suffix}", display_hour(hour))
}

/// Label drawn beside an hour row, e.g. `12 am`, `3 pm`.
pub fn hour_label(hour: i32) -> String {
    let hour = hour.rem_euclid(24);
    let suffix = if hour >= 12 { "pm" } else { "am" };
    format!("{} {suffix}", display_hour(hour))
}

const fn display_hour(hour: i32) -> i32 {
    match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    }
}

/// Header title for a day, e.g. `Wed, Jan 15`.
pub fn format_day_header(day: NaiveDate) -> String {
    day.format("%a, %b %-d").to_string()
}

/// Pixel geometry of the rendered grid.
///
/// The grid is 24 hour rows of `hour_height` pixels, with `vertical_padding`
/// above the first row and below the last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGeometry {
    /// Measured height of one hour row, in pixels.
    pub hour_height: f64,

    /// Padding above midnight and below the end of the day, in pixels.
    pub vertical_padding: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            hour_height: 72.0,
            vertical_padding: 12.0,
        }
    }
}

/// Vertical placement of a block on the grid, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockExtent {
    pub top: f64,
    pub height: f64,
}

impl GridGeometry {
    /// Row height, falling back to the default when the measured height is
    /// unusable (zero, negative, or not yet measured).
    fn effective_hour_height(&self) -> f64 {
        if self.hour_height.is_finite() && self.hour_height > 0.0 {
            self.hour_height
        } else {
            Self::default().hour_height
        }
    }

    pub fn pixels_per_minute(&self) -> f64 {
        self.effective_hour_height() / 60.0
    }

    /// Pixel offset of a minute offset from the top of the grid content.
    pub fn offset_for_minutes(&self, minutes: i32) -> f64 {
        f64::from(minutes).mul_add(self.pixels_per_minute(), self.vertical_padding)
    }

    /// Unsnapped minute offset at a pixel offset from the top of the grid content.
    pub fn minutes_at_offset(&self, y: f64) -> f64 {
        (y - self.vertical_padding) / self.pixels_per_minute()
    }

    /// Minutes spanned by a vertical pointer movement.
    pub fn minutes_for_delta(&self, delta_y: f64) -> f64 {
        delta_y / self.pixels_per_minute()
    }

    /// Top and height of a block spanning `[start, end)`.
    pub fn block_extent(&self, start_minutes: i32, end_minutes: i32) -> BlockExtent {
        let ppm = self.pixels_per_minute();
        BlockExtent {
            top: self.offset_for_minutes(start_minutes),
            height: (f64::from(end_minutes - start_minutes) * ppm).max(MIN_BLOCK_HEIGHT),
        }
    }

    /// Total scrollable height of the grid content.
    pub fn content_height(&self) -> f64 {
        self.vertical_padding
            .mul_add(2.0, self.effective_hour_height() * 24.0)
    }
}
