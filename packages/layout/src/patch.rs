//! # Layout Diff/Patch Engine
//!
//! Pure operations over a page's block list and its layout table. Every
//! operation takes the current state by reference and returns the next
//! state; nothing is mutated in place.
//!
//! ## Semantics
//!
//! ### Add
//! - Appended at the end of the ordering
//! - Default size from the kind registry, column 0, first free row
//!
//! ### Delete
//! - Block and layout entry removed
//! - Remaining blocks resequenced to `0..n-1` (ordering, then `created_at`)
//!
//! ### Resize / Reorder
//! - Engine entries replaced, layout rebuilt so bounds and compaction are
//!   reapplied, canonical positions extracted for persisted blocks only
//!
//! ### Content
//! - Partial payload merged into one block, layout and ordering untouched

use crate::block::{
    Block, BlockContent, BlockDescriptor, BlockKind, ImageData, LinkData, MapData, SectionData,
    TextData, VideoData,
};
use crate::breakpoint::Breakpoint;
use crate::builder::{build_layouts, BuildOptions};
use crate::coords::{to_engine, to_storage, GridBounds, StorageRect};
use crate::layout::{BlockPosition, LayoutTable};
use bio_common::ServiceError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Block already exists: {0}")]
    DuplicateBlock(String),

    #[error("Cannot apply {patch} content to a {block} block")]
    KindMismatch { block: BlockKind, patch: BlockKind },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Unknown size preset: {0}")]
    UnknownPreset(String),
}

pub type PatchResult<T> = Result<T, PatchError>;

impl From<PatchError> for ServiceError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::BlockNotFound(id) => ServiceError::NotFound(id),
            PatchError::DuplicateBlock(id) => {
                ServiceError::Conflict(format!("block {id} already exists"))
            }
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

/// Discrete sizes a block can be resized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    /// 1×1
    Small,
    /// 2×1
    Wide,
    /// 1×2
    Tall,
    /// 2×2
    Large,
}

impl SizePreset {
    pub const ALL: [SizePreset; 4] = [
        SizePreset::Small,
        SizePreset::Wide,
        SizePreset::Tall,
        SizePreset::Large,
    ];

    /// `(w, h)` in cells
    pub const fn size(self) -> (i32, i32) {
        match self {
            SizePreset::Small => (1, 1),
            SizePreset::Wide => (2, 1),
            SizePreset::Tall => (1, 2),
            SizePreset::Large => (2, 2),
        }
    }

    pub fn from_size(w: i32, h: i32) -> Option<SizePreset> {
        SizePreset::ALL.into_iter().find(|p| p.size() == (w, h))
    }
}

impl fmt::Display for SizePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.size();
        write!(f, "{w}x{h}")
    }
}

impl FromStr for SizePreset {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || PatchError::UnknownPreset(s.to_string());
        let (w, h) = s.split_once(['x', '×']).ok_or_else(unknown)?;
        let w = w.trim().parse().map_err(|_| unknown())?;
        let h = h.trim().parse().map_err(|_| unknown())?;
        SizePreset::from_size(w, h).ok_or_else(unknown)
    }
}

/// Result of a layout-affecting operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutChange {
    /// Next in-memory layout for every breakpoint
    pub layout: LayoutTable,
    /// Canonical storage positions of persisted blocks, ready to send
    pub payload: Vec<BlockPosition>,
}

/// First storage row below every stored block
pub fn next_free_row(blocks: &[Block]) -> i32 {
    blocks
        .iter()
        .filter_map(|b| b.layout)
        .map(|rect| rect.x + rect.h)
        .max()
        .unwrap_or(0)
}

/// Append a block at the end of the ordering
///
/// A block arriving without a layout gets its kind's default size at
/// column 0 of the first free row.
pub fn add_block(blocks: &[Block], mut block: Block) -> PatchResult<Vec<Block>> {
    if blocks.iter().any(|b| b.id == block.id) {
        return Err(PatchError::DuplicateBlock(block.id));
    }

    let bounds = GridBounds::from(Breakpoint::CANONICAL);
    let layout = block.layout.unwrap_or_else(|| {
        let (w, h) = block.kind().default_size();
        StorageRect::new(next_free_row(blocks), 0, w, h)
    });
    block.layout = Some(to_storage(to_engine(layout, bounds)));

    let mut next = resequence(blocks.to_vec());
    block.ordering = Some(next.len() as i64);
    debug!(block_id = %block.id, kind = %block.kind(), ordering = next.len(), "Added block");
    next.push(block);
    Ok(next)
}

/// Total order used for resequencing: ordering (absent last), then
/// creation time
pub fn compare_blocks(a: &Block, b: &Block) -> Ordering {
    let key = |block: &Block| block.ordering.unwrap_or(i64::MAX);
    key(a)
        .cmp(&key(b))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Sort by [`compare_blocks`] (stable) and rewrite orderings to `0..n-1`
pub fn resequence(mut blocks: Vec<Block>) -> Vec<Block> {
    blocks.sort_by(compare_blocks);
    for (index, block) in blocks.iter_mut().enumerate() {
        block.ordering = Some(index as i64);
    }
    blocks
}

pub fn delete_block(blocks: &[Block], block_id: &str) -> PatchResult<Vec<Block>> {
    if !blocks.iter().any(|b| b.id == block_id) {
        return Err(PatchError::BlockNotFound(block_id.to_string()));
    }

    let remaining = blocks
        .iter()
        .filter(|b| b.id != block_id)
        .cloned()
        .collect();
    Ok(resequence(remaining))
}

/// Copy of `layout` without the block's entries
pub fn remove_from_layout(layout: &LayoutTable, block_id: &str) -> LayoutTable {
    let mut next = layout.clone();
    next.remove_block(block_id);
    next
}

/// Resize one block to a preset on every breakpoint
pub fn resize_block(
    blocks: &[BlockDescriptor],
    layout: &LayoutTable,
    block_id: &str,
    preset: SizePreset,
    persisted: &HashSet<String>,
    opts: &BuildOptions<'_>,
) -> PatchResult<LayoutChange> {
    if !blocks.iter().any(|b| b.id == block_id) {
        return Err(PatchError::BlockNotFound(block_id.to_string()));
    }

    let mut resized = build_layouts(blocks, &opts.with_existing(layout));
    let (w, h) = preset.size();
    for bp in Breakpoint::ALL {
        if let Some(item) = resized.item_mut(bp, block_id) {
            item.w = w;
            item.h = h;
        }
    }

    let layout = build_layouts(blocks, &opts.with_existing(&resized));
    let payload = layout.canonical_payload(persisted);
    debug!(block_id, preset = %preset, entries = payload.len(), "Resized block");
    Ok(LayoutChange { layout, payload })
}

/// Accept the engine's post-drag layout
pub fn reorder_blocks(
    blocks: &[BlockDescriptor],
    engine_layout: &LayoutTable,
    persisted: &HashSet<String>,
    opts: &BuildOptions<'_>,
) -> LayoutChange {
    let layout = build_layouts(blocks, &opts.with_existing(engine_layout));
    let payload = layout.canonical_payload(persisted);
    debug!(entries = payload.len(), "Reordered blocks");
    LayoutChange { layout, payload }
}

/// Write canonical positions back onto the blocks' stored rects
pub fn apply_layout_payload(blocks: &[Block], positions: &[BlockPosition]) -> Vec<Block> {
    blocks
        .iter()
        .map(|block| {
            let mut block = block.clone();
            if let Some(position) = positions.iter().find(|p| p.id == block.id) {
                block.layout = Some(position.rect());
            }
            block
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub site_name: Option<String>,
    pub favicon_url: Option<String>,
    pub kind: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPatch {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePatch {
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub aspect_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoPatch {
    pub video_url: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPatch {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub zoom: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
}

/// Partial payload for one block kind; absent fields are left alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ContentPatch {
    Link(LinkPatch),
    Text(TextPatch),
    Image(ImagePatch),
    Video(VideoPatch),
    Map(MapPatch),
    Section(SectionPatch),
}

impl ContentPatch {
    pub fn kind(&self) -> BlockKind {
        match self {
            ContentPatch::Link(_) => BlockKind::Link,
            ContentPatch::Text(_) => BlockKind::Text,
            ContentPatch::Image(_) => BlockKind::Image,
            ContentPatch::Video(_) => BlockKind::Video,
            ContentPatch::Map(_) => BlockKind::Map,
            ContentPatch::Section(_) => BlockKind::Section,
        }
    }

    /// Full replacement patch carrying every field of `content`
    pub fn from_content(content: &BlockContent) -> Option<ContentPatch> {
        Some(match content.clone() {
            BlockContent::Link(l) => ContentPatch::Link(LinkPatch {
                url: Some(l.url),
                title: l.title,
                description: l.description,
                image_url: l.image_url,
                site_name: l.site_name,
                favicon_url: l.favicon_url,
                kind: l.kind,
                source: l.source,
            }),
            BlockContent::Text(t) => ContentPatch::Text(TextPatch {
                content: Some(t.content),
            }),
            BlockContent::Image(i) => ContentPatch::Image(ImagePatch {
                image_url: Some(i.image_url),
                link_url: i.link_url,
                aspect_ratio: i.aspect_ratio,
            }),
            BlockContent::Video(v) => ContentPatch::Video(VideoPatch {
                video_url: Some(v.video_url),
                thumbnail: v.thumbnail,
            }),
            BlockContent::Map(m) => ContentPatch::Map(MapPatch {
                lat: Some(m.lat),
                lng: Some(m.lng),
                zoom: Some(m.zoom),
            }),
            BlockContent::Section(s) => ContentPatch::Section(SectionPatch {
                title: Some(s.title),
            }),
            BlockContent::Divider => return None,
        })
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

/// Merge a partial payload into a block's content
pub fn merge_content(content: &BlockContent, patch: &ContentPatch) -> PatchResult<BlockContent> {
    let mut next = content.clone();
    match (&mut next, patch) {
        (
            BlockContent::Link(LinkData {
                url,
                title,
                description,
                image_url,
                site_name,
                favicon_url,
                kind,
                source,
            }),
            ContentPatch::Link(p),
        ) => {
            set(url, &p.url);
            set_opt(title, &p.title);
            set_opt(description, &p.description);
            set_opt(image_url, &p.image_url);
            set_opt(site_name, &p.site_name);
            set_opt(favicon_url, &p.favicon_url);
            set_opt(kind, &p.kind);
            set_opt(source, &p.source);
        }
        (BlockContent::Text(TextData { content }), ContentPatch::Text(p)) => {
            set(content, &p.content);
        }
        (
            BlockContent::Image(ImageData {
                image_url,
                link_url,
                aspect_ratio,
            }),
            ContentPatch::Image(p),
        ) => {
            set(image_url, &p.image_url);
            set_opt(link_url, &p.link_url);
            set_opt(aspect_ratio, &p.aspect_ratio);
        }
        (
            BlockContent::Video(VideoData {
                video_url,
                thumbnail,
            }),
            ContentPatch::Video(p),
        ) => {
            set(video_url, &p.video_url);
            set_opt(thumbnail, &p.thumbnail);
        }
        (BlockContent::Map(MapData { lat, lng, zoom }), ContentPatch::Map(p)) => {
            set(lat, &p.lat);
            set(lng, &p.lng);
            set(zoom, &p.zoom);
        }
        (BlockContent::Section(SectionData { title }), ContentPatch::Section(p)) => {
            set(title, &p.title);
        }
        _ => {
            return Err(PatchError::KindMismatch {
                block: content.kind(),
                patch: patch.kind(),
            })
        }
    }

    next.validate().map_err(PatchError::InvalidContent)?;
    Ok(next)
}

/// Merge a partial payload into one block of the list
pub fn patch_content(
    blocks: &[Block],
    block_id: &str,
    patch: &ContentPatch,
) -> PatchResult<Vec<Block>> {
    let index = blocks
        .iter()
        .position(|b| b.id == block_id)
        .ok_or_else(|| PatchError::BlockNotFound(block_id.to_string()))?;

    let mut next = blocks.to_vec();
    next[index].content = merge_content(&blocks[index].content, patch)?;
    Ok(next)
}
