//! Vertical compaction.
//!
//! Items are visited in layout order (row, then column, then input
//! position). Each one floats up toward row 0 until it would touch an
//! already placed item, then sinks one row at a time while it still
//! overlaps one. The output never has two overlapping items unless the grid
//! runs out of rows.

use crate::coords::{GridBounds, GridRect};
use crate::layout::GridItem;

/// Compacts `items` in place toward row 0.
///
/// Items are visited by (row, column, input index). Block `ordering` plays no
/// part here; callers that want ordering to win must place items first.
pub fn compact_vertical(items: &mut [GridItem], bounds: GridBounds) {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].y, items[i].x, i));

    let mut placed: Vec<GridRect> = Vec::with_capacity(items.len());
    for i in order {
        let mut rect = items[i].rect();

        while rect.y > 0 && !collides(&placed, &GridRect { y: rect.y - 1, ..rect }) {
            rect.y -= 1;
        }

        while collides(&placed, &rect) && rect.bottom() < bounds.rows {
            rect.y += 1;
        }

        items[i].set_rect(rect);
        placed.push(rect);
    }
}

fn collides(placed: &[GridRect], rect: &GridRect) -> bool {
    placed.iter().any(|other| other.overlaps(rect))
}

/// True when no two items share a cell
pub fn is_overlap_free(items: &[GridItem]) -> bool {
    items.iter().enumerate().all(|(i, a)| {
        items[i + 1..]
            .iter()
            .all(|b| !a.rect().overlaps(&b.rect()))
    })
}
