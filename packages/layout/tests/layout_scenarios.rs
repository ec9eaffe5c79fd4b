//! End-to-end layout scenarios: sequences of resize, drag and delete over a
//! small page.

use bio_layout::{
    build_layouts, delete_block, remove_from_layout, reorder_blocks, resize_block, Block,
    BlockContent, BlockDescriptor, BlockPosition, BuildOptions, Breakpoint, LinkData, SectionData,
    SizePreset, StorageRect,
};
use std::collections::HashSet;

fn section(id: &str, ordering: i64, row: i32) -> Block {
    Block::new(
        id,
        BlockContent::Section(SectionData {
            title: id.to_uppercase(),
        }),
    )
    .with_ordering(ordering)
    .with_created_at(format!("2024-05-0{}T12:00:00Z", ordering + 1))
    .with_layout(StorageRect::new(row, 0, 4, 1))
}

fn link(id: &str, ordering: i64, layout: StorageRect) -> Block {
    Block::new(
        id,
        BlockContent::Link(LinkData {
            url: format!("https://example.com/{id}"),
            ..LinkData::default()
        }),
    )
    .with_ordering(ordering)
    .with_created_at(format!("2024-05-0{}T12:00:00Z", ordering + 1))
    .with_layout(layout)
}

fn page() -> Vec<Block> {
    vec![
        section("a", 0, 0),
        section("b", 1, 1),
        section("c", 2, 2),
        link("l", 3, StorageRect::new(3, 2, 1, 1)),
    ]
}

fn persisted(blocks: &[Block]) -> HashSet<String> {
    blocks.iter().map(|b| b.id.clone()).collect()
}

fn descriptors(blocks: &[Block]) -> Vec<BlockDescriptor> {
    blocks.iter().map(BlockDescriptor::from).collect()
}

#[test]
fn test_resize_then_drag_produces_storage_payload() {
    let blocks = page();
    let descriptors = descriptors(&blocks);
    let persisted = persisted(&blocks);
    let opts = BuildOptions::editable();

    let initial = build_layouts(&descriptors, &opts);
    let l = initial.item(Breakpoint::Wide, "l").unwrap();
    assert_eq!((l.x, l.y, l.w, l.h), (2, 3, 1, 1));

    // 1×1 → 2×2 on the wide breakpoint
    let resized = resize_block(
        &descriptors,
        &initial,
        "l",
        SizePreset::Large,
        &persisted,
        &opts,
    )
    .unwrap();
    let l = resized.layout.item(Breakpoint::Wide, "l").unwrap();
    assert_eq!((l.w, l.h), (2, 2));

    // drag to column 0, row 3
    let mut dragged = resized.layout.clone();
    let l = dragged.item_mut(Breakpoint::Wide, "l").unwrap();
    l.x = 0;
    l.y = 3;

    let change = reorder_blocks(&descriptors, &dragged, &persisted, &opts);
    let entry = change.payload.iter().find(|p| p.id == "l").unwrap();
    assert_eq!(*entry, BlockPosition::new("l", StorageRect::new(3, 0, 2, 2)));
    assert_eq!((entry.x, entry.y, entry.w, entry.h), (3, 0, 2, 2));

    // sections are untouched
    let a = change.payload.iter().find(|p| p.id == "a").unwrap();
    assert_eq!(a.rect(), StorageRect::new(0, 0, 4, 1));
}

#[test]
fn test_drag_into_occupied_cell_does_not_overlap() {
    let blocks = page();
    let descriptors = descriptors(&blocks);
    let opts = BuildOptions::editable();

    let mut dragged = build_layouts(&descriptors, &opts);
    let l = dragged.item_mut(Breakpoint::Wide, "l").unwrap();
    l.x = 1;
    l.y = 1;

    let change = reorder_blocks(&descriptors, &dragged, &persisted(&blocks), &opts);
    assert!(bio_layout::is_overlap_free(change.layout.get(Breakpoint::Wide)));
}

#[test]
fn test_drag_past_right_edge_is_clamped() {
    let blocks = page();
    let descriptors = descriptors(&blocks);
    let opts = BuildOptions::editable();

    let mut dragged = build_layouts(&descriptors, &opts);
    let l = dragged.item_mut(Breakpoint::Wide, "l").unwrap();
    l.x = 11;

    let change = reorder_blocks(&descriptors, &dragged, &persisted(&blocks), &opts);
    let entry = change.payload.iter().find(|p| p.id == "l").unwrap();
    assert_eq!(entry.y, 3);
}

#[test]
fn test_drag_excludes_placeholders_from_payload() {
    let mut blocks = page();
    let persisted = persisted(&blocks);
    blocks.push(Block::new("placeholder-1", BlockContent::Divider));

    let opts = BuildOptions::editable();
    let descriptors = descriptors(&blocks);
    let layout = build_layouts(&descriptors, &opts);
    assert!(layout.contains("placeholder-1"));

    let change = reorder_blocks(&descriptors, &layout, &persisted, &opts);
    assert_eq!(change.payload.len(), 4);
    assert!(change.payload.iter().all(|p| p.id != "placeholder-1"));
}

#[test]
fn test_delete_then_rebuild() {
    let blocks = page();
    let opts = BuildOptions::editable();
    let layout = build_layouts(&descriptors(&blocks), &opts);

    let remaining = delete_block(&blocks, "b").unwrap();
    let orderings: Vec<_> = remaining.iter().map(|b| b.ordering).collect();
    assert_eq!(orderings, vec![Some(0), Some(1), Some(2)]);

    let stripped = remove_from_layout(&layout, "b");
    assert!(!stripped.contains("b"));

    let rebuilt = build_layouts(&descriptors(&remaining), &opts.with_existing(&stripped));
    let c = rebuilt.item(Breakpoint::Wide, "c").unwrap();
    assert_eq!(c.y, 1);
}

#[test]
fn test_narrow_layout_is_derived_not_persisted() {
    let blocks = page();
    let descriptors = descriptors(&blocks);
    let opts = BuildOptions::editable();

    let mut dragged = build_layouts(&descriptors, &opts);
    let l = dragged.item_mut(Breakpoint::Narrow, "l").unwrap();
    l.y = 0;

    let change = reorder_blocks(&descriptors, &dragged, &persisted(&blocks), &opts);
    let entry = change.payload.iter().find(|p| p.id == "l").unwrap();
    assert_eq!(entry.rect(), StorageRect::new(3, 2, 1, 1));
}
