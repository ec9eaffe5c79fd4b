//! Layout table: per-breakpoint grid entries in engine convention.

use crate::breakpoint::Breakpoint;
use crate::coords::{to_storage, GridRect, StorageRect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One grid-engine entry (`x` = column, `y` = row)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridItem {
    #[serde(rename = "i")]
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(rename = "isDraggable", default)]
    pub is_draggable: bool,
    #[serde(rename = "isResizable", default)]
    pub is_resizable: bool,
    #[serde(rename = "static", default)]
    pub is_static: bool,
}

impl GridItem {
    pub fn new(id: impl Into<String>, rect: GridRect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            is_draggable: false,
            is_resizable: false,
            is_static: true,
        }
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(self.x, self.y, self.w, self.h)
    }

    pub fn set_rect(&mut self, rect: GridRect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }

    /// Editing flags: draggable when editable, never free-resizable
    pub fn set_editable(&mut self, editable: bool) {
        self.is_draggable = editable;
        self.is_resizable = false;
        self.is_static = !editable;
    }
}

/// Storage-convention coordinates for one block, the unit sent to the
/// persistence layer (`x` = row, `y` = column)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPosition {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BlockPosition {
    pub fn new(id: impl Into<String>, rect: StorageRect) -> Self {
        Self {
            id: id.into(),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
        }
    }

    pub fn rect(&self) -> StorageRect {
        StorageRect::new(self.x, self.y, self.w, self.h)
    }
}

/// Per-breakpoint layout, entries kept in block input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutTable {
    layouts: BTreeMap<Breakpoint, Vec<GridItem>>,
}

impl LayoutTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bp: Breakpoint) -> &[GridItem] {
        self.layouts.get(&bp).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, bp: Breakpoint, items: Vec<GridItem>) {
        self.layouts.insert(bp, items);
    }

    pub fn item(&self, bp: Breakpoint, id: &str) -> Option<&GridItem> {
        self.get(bp).iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, bp: Breakpoint, id: &str) -> Option<&mut GridItem> {
        self.layouts
            .get_mut(&bp)
            .and_then(|items| items.iter_mut().find(|item| item.id == id))
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = Breakpoint> + '_ {
        self.layouts.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.values().all(Vec::is_empty)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layouts
            .values()
            .any(|items| items.iter().any(|item| item.id == id))
    }

    /// Drop a block's entry from every breakpoint
    pub fn remove_block(&mut self, id: &str) {
        for items in self.layouts.values_mut() {
            items.retain(|item| item.id != id);
        }
    }

    /// Canonical-breakpoint positions in storage convention, restricted to
    /// persisted ids
    pub fn canonical_payload(&self, persisted: &HashSet<String>) -> Vec<BlockPosition> {
        self.get(Breakpoint::CANONICAL)
            .iter()
            .filter(|item| persisted.contains(&item.id))
            .map(|item| BlockPosition::new(item.id.clone(), to_storage(item.rect())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LayoutTable {
        let mut table = LayoutTable::new();
        table.set(
            Breakpoint::Wide,
            vec![
                GridItem::new("a", GridRect::new(0, 0, 2, 1)),
                GridItem::new("b", GridRect::new(2, 0, 1, 1)),
            ],
        );
        table.set(
            Breakpoint::Narrow,
            vec![
                GridItem::new("a", GridRect::new(0, 0, 2, 1)),
                GridItem::new("b", GridRect::new(0, 1, 1, 1)),
            ],
        );
        table
    }

    #[test]
    fn test_remove_block_strips_every_breakpoint() {
        let mut table = table();
        table.remove_block("a");
        assert!(!table.contains("a"));
        assert_eq!(table.get(Breakpoint::Wide).len(), 1);
        assert_eq!(table.get(Breakpoint::Narrow).len(), 1);
    }

    #[test]
    fn test_canonical_payload_swaps_and_filters() {
        let table = table();
        let persisted: HashSet<String> = ["b".to_string()].into_iter().collect();
        let payload = table.canonical_payload(&persisted);
        assert_eq!(payload, vec![BlockPosition::new("b", StorageRect::new(0, 2, 1, 1))]);
    }

    #[test]
    fn test_grid_item_json_uses_engine_names() {
        let mut item = GridItem::new("a", GridRect::new(1, 2, 1, 1));
        item.set_editable(true);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["i"], "a");
        assert_eq!(json["isDraggable"], true);
        assert_eq!(json["isResizable"], false);
        assert_eq!(json["static"], false);
    }

    #[test]
    fn test_table_serializes_by_breakpoint_key() {
        let json = serde_json::to_value(table()).unwrap();
        assert!(json["lg"].is_array());
        assert!(json["sm"].is_array());
    }
}
