//! # Coordinate Normalizer
//!
//! Two conventions meet here:
//!
//! ```text
//! storage  (persisted block rows)   x = row     y = column
//! engine   (grid renderer entries)  x = column  y = row
//! ```
//!
//! Every translation between the two swaps the axes explicitly. Spans are
//! never swapped: `w` is always a column span and `h` a row span.
//!
//! Nothing in this module fails. Out-of-range, fractional, non-finite or
//! absent values are clamped into the grid.

use crate::breakpoint::Breakpoint;
use crate::constants::{DEFAULT_ROWS, MAX_SIZE, MIN_SIZE};
use serde::{Deserialize, Serialize};

/// Rectangle in storage convention (`x` = row, `y` = column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl StorageRect {
    pub const fn new(row: i32, column: i32, w: i32, h: i32) -> Self {
        Self { x: row, y: column, w, h }
    }

    pub const fn row(&self) -> i32 {
        self.x
    }

    pub const fn column(&self) -> i32 {
        self.y
    }
}

/// Rectangle in engine convention (`x` = column, `y` = row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl GridRect {
    pub const fn new(column: i32, row: i32, w: i32, h: i32) -> Self {
        Self { x: column, y: row, w, h }
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    pub const fn overlaps(&self, other: &GridRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Unsanitized candidate in engine convention, as produced by drag events
/// or decoded from loosely typed input
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRect {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
}

impl From<GridRect> for RawRect {
    fn from(rect: GridRect) -> Self {
        Self {
            x: Some(f64::from(rect.x)),
            y: Some(f64::from(rect.y)),
            w: Some(f64::from(rect.w)),
            h: Some(f64::from(rect.h)),
        }
    }
}

/// Column and row limits of one breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub columns: i32,
    pub rows: i32,
}

impl GridBounds {
    pub const fn new(columns: i32, rows: i32) -> Self {
        Self { columns, rows }
    }

    pub const fn for_breakpoint(bp: Breakpoint, rows: i32) -> Self {
        Self {
            columns: bp.columns(),
            rows,
        }
    }
}

impl From<Breakpoint> for GridBounds {
    fn from(bp: Breakpoint) -> Self {
        Self::for_breakpoint(bp, DEFAULT_ROWS)
    }
}

/// Clamp a span to `[MIN_SIZE, min(max, MAX_SIZE)]`, rounding to the
/// nearest cell. Absent or non-finite input yields `MIN_SIZE`.
pub fn clamp_span(value: Option<f64>, max: i32) -> i32 {
    let ceiling = max.min(MAX_SIZE).max(MIN_SIZE);
    match value {
        Some(v) if v.is_finite() => (v.round() as i32).clamp(MIN_SIZE, ceiling),
        _ => MIN_SIZE,
    }
}

/// Clamp a position to `[0, max]`, flooring to a whole cell. Absent or
/// non-finite input yields 0.
pub fn clamp_coordinate(value: Option<f64>, max: i32) -> i32 {
    let ceiling = max.max(0);
    match value {
        Some(v) if v.is_finite() => (v.floor() as i32).clamp(0, ceiling),
        _ => 0,
    }
}

/// Sanitize an engine-convention candidate so it fits inside `bounds`
///
/// Spans are clamped first so positions can be limited to `columns - w`
/// and `rows - h`.
pub fn normalize_rect(raw: RawRect, bounds: GridBounds) -> GridRect {
    let w = clamp_span(raw.w, bounds.columns);
    let h = clamp_span(raw.h, bounds.rows);
    let x = clamp_coordinate(raw.x, bounds.columns - w);
    let y = clamp_coordinate(raw.y, bounds.rows - h);
    GridRect { x, y, w, h }
}

/// Storage → engine: the storage row becomes the engine `y`, the storage
/// column becomes the engine `x`
pub fn to_engine(rect: StorageRect, bounds: GridBounds) -> GridRect {
    normalize_rect(
        RawRect {
            x: Some(f64::from(rect.y)),
            y: Some(f64::from(rect.x)),
            w: Some(f64::from(rect.w)),
            h: Some(f64::from(rect.h)),
        },
        bounds,
    )
}

/// Engine → storage: the engine `y` becomes the storage row, the engine `x`
/// becomes the storage column
pub fn to_storage(rect: GridRect) -> StorageRect {
    StorageRect {
        x: rect.y,
        y: rect.x,
        w: rect.w,
        h: rect.h,
    }
}
