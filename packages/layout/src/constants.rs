//! Grid bounds shared by every breakpoint.

/// Smallest span a block can occupy, in cells
pub const MIN_SIZE: i32 = 1;

/// Largest span a block can occupy, in cells
pub const MAX_SIZE: i32 = 4;

/// Rows available to the grid
pub const DEFAULT_ROWS: i32 = 200;

pub const WIDE_COLUMNS: i32 = 4;
pub const NARROW_COLUMNS: i32 = 2;
