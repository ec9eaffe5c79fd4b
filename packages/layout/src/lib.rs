//! # Bio Layout
//!
//! Block model and grid layout engine for link-in-bio pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ block: Block, Page, Profile, kind registry  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ coords: storage (row, col) ⇄ engine (col,   │
//! │         row), clamping to grid bounds       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ builder + compact: per-breakpoint layout    │
//! │         table, overlap-free                 │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ patch: add / delete / resize / reorder /    │
//! │        content, canonical payload           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Storage is row-major**: persisted `x` is a row, engine `x` is a column
//! 2. **Sanitize, never reject**: coordinates are clamped into the grid
//! 3. **Wide is canonical**: only the wide breakpoint is persisted
//! 4. **Pure operations**: every patch returns a new state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bio_layout::{build_layouts, BuildOptions, Breakpoint};
//!
//! let layout = build_layouts(&profile.descriptors(), &BuildOptions::editable());
//! let wide = layout.get(Breakpoint::Wide);
//! ```

pub mod block;
pub mod breakpoint;
pub mod builder;
pub mod compact;
pub mod constants;
pub mod coords;
pub mod layout;
pub mod patch;

pub use block::{
    default_size_for_type, Block, BlockContent, BlockDescriptor, BlockKind, ImageData, KindSpec,
    LinkData, MapData, Page, Profile, SectionData, TextData, UnknownKind, VideoData,
};
pub use breakpoint::Breakpoint;
pub use builder::{build_layouts, BuildOptions};
pub use compact::{compact_vertical, is_overlap_free};
pub use constants::{DEFAULT_ROWS, MAX_SIZE, MIN_SIZE};
pub use coords::{
    clamp_coordinate, clamp_span, normalize_rect, to_engine, to_storage, GridBounds, GridRect,
    RawRect, StorageRect,
};
pub use layout::{BlockPosition, GridItem, LayoutTable};
pub use patch::{
    add_block, apply_layout_payload, delete_block, patch_content, remove_from_layout,
    reorder_blocks, resequence, resize_block, ContentPatch, ImagePatch, LayoutChange,
    LinkPatch, MapPatch, PatchError, PatchResult, SectionPatch, SizePreset, TextPatch, VideoPatch,
};
