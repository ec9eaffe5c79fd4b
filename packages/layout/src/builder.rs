//! # Responsive Layout Builder
//!
//! Builds a [`LayoutTable`] for every breakpoint from a flat list of block
//! descriptors.
//!
//! For each breakpoint and each block (in input order):
//! 1. An entry already present in the previous layout wins, re-normalized,
//!    so adjustments survive re-renders.
//! 2. Otherwise the stored storage rect is translated to engine
//!    coordinates.
//! 3. Blocks without a stored rect go to column 0, using their input index
//!    as the row and their kind's default size.
//!
//! Each breakpoint is then compacted so entries never overlap. The build is
//! deterministic: the same inputs always give the same table.

use crate::block::BlockDescriptor;
use crate::breakpoint::Breakpoint;
use crate::compact::compact_vertical;
use crate::constants::DEFAULT_ROWS;
use crate::coords::{normalize_rect, to_engine, GridBounds, GridRect, RawRect};
use crate::layout::{GridItem, LayoutTable};
use std::collections::HashSet;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    pub is_editable: bool,
    pub existing: Option<&'a LayoutTable>,
    pub rows: i32,
}

impl<'a> BuildOptions<'a> {
    pub fn editable() -> Self {
        Self {
            is_editable: true,
            existing: None,
            rows: DEFAULT_ROWS,
        }
    }

    pub fn read_only() -> Self {
        Self {
            is_editable: false,
            ..Self::editable()
        }
    }

    pub fn with_existing(self, existing: &'a LayoutTable) -> Self {
        Self {
            existing: Some(existing),
            ..self
        }
    }

    pub fn with_rows(self, rows: i32) -> Self {
        Self { rows, ..self }
    }
}

impl Default for BuildOptions<'_> {
    fn default() -> Self {
        Self::read_only()
    }
}

#[instrument(
    skip_all,
    fields(
        blocks = blocks.len(),
        editable = opts.is_editable,
        merged = opts.existing.is_some()
    )
)]
pub fn build_layouts(blocks: &[BlockDescriptor], opts: &BuildOptions<'_>) -> LayoutTable {
    let mut table = LayoutTable::new();

    for bp in Breakpoint::ALL {
        let bounds = GridBounds::for_breakpoint(bp, opts.rows);
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(blocks.len());

        for (index, block) in blocks.iter().enumerate() {
            if !seen.insert(block.id.as_str()) {
                debug!(block_id = %block.id, "Skipping duplicate block id");
                continue;
            }

            let rect = match opts.existing.and_then(|t| t.item(bp, &block.id)) {
                Some(previous) => normalize_rect(previous.rect().into(), bounds),
                None => derive_rect(block, index, bounds),
            };

            let mut item = GridItem::new(block.id.clone(), rect);
            item.set_editable(opts.is_editable);
            items.push(item);
        }

        compact_vertical(&mut items, bounds);
        debug!(breakpoint = %bp, items = items.len(), "Built breakpoint layout");
        table.set(bp, items);
    }

    table
}

fn derive_rect(block: &BlockDescriptor, index: usize, bounds: GridBounds) -> GridRect {
    match block.layout {
        Some(stored) => to_engine(stored, bounds),
        None => {
            let (w, h) = block.kind.default_size();
            normalize_rect(
                RawRect {
                    x: Some(0.0),
                    y: Some(index as f64),
                    w: Some(f64::from(w)),
                    h: Some(f64::from(h)),
                },
                bounds,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockKind;
    use crate::compact::is_overlap_free;
    use crate::coords::StorageRect;

    fn blocks() -> Vec<BlockDescriptor> {
        vec![
            BlockDescriptor::new("a", BlockKind::Section).with_layout(StorageRect::new(0, 0, 4, 1)),
            BlockDescriptor::new("b", BlockKind::Link).with_layout(StorageRect::new(1, 2, 1, 1)),
            BlockDescriptor::new("c", BlockKind::Image),
        ]
    }

    #[test]
    fn test_stored_layout_is_swapped() {
        let table = build_layouts(&blocks(), &BuildOptions::editable());
        let b = table.item(Breakpoint::Wide, "b").unwrap();
        assert_eq!((b.x, b.y), (2, 1));
    }

    #[test]
    fn test_every_breakpoint_has_every_block() {
        let table = build_layouts(&blocks(), &BuildOptions::editable());
        for bp in Breakpoint::ALL {
            assert_eq!(table.get(bp).len(), 3);
            assert!(is_overlap_free(table.get(bp)));
        }
    }

    #[test]
    fn test_missing_layout_uses_kind_default() {
        let table = build_layouts(&blocks(), &BuildOptions::editable());
        let c = table.item(Breakpoint::Wide, "c").unwrap();
        assert_eq!((c.w, c.h), BlockKind::Image.default_size());
        assert_eq!(c.x, 0);
    }

    #[test]
    fn test_narrow_clamps_wide_blocks() {
        let table = build_layouts(&blocks(), &BuildOptions::editable());
        let a = table.item(Breakpoint::Narrow, "a").unwrap();
        assert_eq!(a.w, 2);
        let b = table.item(Breakpoint::Narrow, "b").unwrap();
        assert!(b.x + b.w <= 2);
    }

    #[test]
    fn test_editable_flags() {
        let editable = build_layouts(&blocks(), &BuildOptions::editable());
        let read_only = build_layouts(&blocks(), &BuildOptions::read_only());
        for item in editable.get(Breakpoint::Wide) {
            assert!(item.is_draggable && !item.is_resizable && !item.is_static);
        }
        for item in read_only.get(Breakpoint::Narrow) {
            assert!(!item.is_draggable && !item.is_resizable && item.is_static);
        }
    }

    #[test]
    fn test_existing_layout_wins() {
        let first = build_layouts(&blocks(), &BuildOptions::editable());
        let mut moved = first.clone();
        let b = moved.item_mut(Breakpoint::Wide, "b").unwrap();
        b.x = 3;

        let rebuilt = build_layouts(&blocks(), &BuildOptions::editable().with_existing(&moved));
        assert_eq!(rebuilt.item(Breakpoint::Wide, "b").unwrap().x, 3);
    }

    #[test]
    fn test_existing_entry_is_renormalized() {
        let first = build_layouts(&blocks(), &BuildOptions::editable());
        let mut broken = first.clone();
        let b = broken.item_mut(Breakpoint::Wide, "b").unwrap();
        b.x = 9;
        b.w = 7;

        let rebuilt = build_layouts(&blocks(), &BuildOptions::editable().with_existing(&broken));
        let b = rebuilt.item(Breakpoint::Wide, "b").unwrap();
        assert_eq!(b.w, 4);
        assert_eq!(b.x, 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let opts = BuildOptions::editable();
        assert_eq!(build_layouts(&blocks(), &opts), build_layouts(&blocks(), &opts));
    }

    #[test]
    fn test_rebuild_from_own_output_is_stable() {
        let first = build_layouts(&blocks(), &BuildOptions::editable());
        let second = build_layouts(&blocks(), &BuildOptions::editable().with_existing(&first));
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_ids_are_skipped() {
        let mut input = blocks();
        input.push(BlockDescriptor::new("a", BlockKind::Text));
        let table = build_layouts(&input, &BuildOptions::editable());
        assert_eq!(table.get(Breakpoint::Wide).len(), 3);
    }
}
