//! # Blocks and Pages
//!
//! The set of block kinds is closed. Each kind has a static [`KindSpec`]
//! (label and default size) and exactly one payload shape in
//! [`BlockContent`]. A block's kind is derived from its payload, so a block
//! can never carry a payload of the wrong shape.

use crate::coords::StorageRect;
use crate::constants::MIN_SIZE;
use bio_common::{Handle, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Link,
    Text,
    Image,
    Video,
    Map,
    Section,
    Divider,
}

/// Static registry entry for a block kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    pub kind: BlockKind,
    pub label: &'static str,
    /// Default `(w, h)` in cells when the block is added
    pub default_size: (i32, i32),
}

static KIND_SPECS: [KindSpec; 7] = [
    KindSpec {
        kind: BlockKind::Link,
        label: "Link",
        default_size: (1, 1),
    },
    KindSpec {
        kind: BlockKind::Text,
        label: "Text",
        default_size: (2, 1),
    },
    KindSpec {
        kind: BlockKind::Image,
        label: "Image",
        default_size: (2, 2),
    },
    KindSpec {
        kind: BlockKind::Video,
        label: "Video",
        default_size: (2, 2),
    },
    KindSpec {
        kind: BlockKind::Map,
        label: "Map",
        default_size: (2, 2),
    },
    KindSpec {
        kind: BlockKind::Section,
        label: "Section",
        default_size: (4, 1),
    },
    KindSpec {
        kind: BlockKind::Divider,
        label: "Divider",
        default_size: (4, 1),
    },
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown block type: {0}")]
pub struct UnknownKind(pub String);

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Link,
        BlockKind::Text,
        BlockKind::Image,
        BlockKind::Video,
        BlockKind::Map,
        BlockKind::Section,
        BlockKind::Divider,
    ];

    pub fn spec(self) -> &'static KindSpec {
        &KIND_SPECS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn default_size(self) -> (i32, i32) {
        self.spec().default_size
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BlockKind::Link => "link",
            BlockKind::Text => "text",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::Map => "map",
            BlockKind::Section => "section",
            BlockKind::Divider => "divider",
        }
    }

    /// Empty payload used for freshly added placeholders
    pub fn empty_content(self) -> BlockContent {
        match self {
            BlockKind::Link => BlockContent::Link(LinkData::default()),
            BlockKind::Text => BlockContent::Text(TextData::default()),
            BlockKind::Image => BlockContent::Image(ImageData::default()),
            BlockKind::Video => BlockContent::Video(VideoData::default()),
            BlockKind::Map => BlockContent::Map(MapData::default()),
            BlockKind::Section => BlockContent::Section(SectionData::default()),
            BlockKind::Divider => BlockContent::Divider,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Default size for a type name coming from untyped input; unknown names
/// get the smallest block
pub fn default_size_for_type(name: &str) -> (i32, i32) {
    name.parse::<BlockKind>()
        .map(BlockKind::default_size)
        .unwrap_or((MIN_SIZE, MIN_SIZE))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    /// Link flavour reported by the metadata scraper (e.g. "article")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Platform the link points at (e.g. "youtube")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub lat: f64,
    pub lng: f64,
    pub zoom: u8,
}

impl Default for MapData {
    fn default() -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            zoom: 12,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionData {
    pub title: String,
}

/// Kind-specific payload of a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum BlockContent {
    Link(LinkData),
    Text(TextData),
    Image(ImageData),
    Video(VideoData),
    Map(MapData),
    Section(SectionData),
    Divider,
}

impl BlockContent {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Link(_) => BlockKind::Link,
            BlockContent::Text(_) => BlockKind::Text,
            BlockContent::Image(_) => BlockKind::Image,
            BlockContent::Video(_) => BlockKind::Video,
            BlockContent::Map(_) => BlockKind::Map,
            BlockContent::Section(_) => BlockKind::Section,
            BlockContent::Divider => BlockKind::Divider,
        }
    }

    /// Check required fields before the payload is sent anywhere
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BlockContent::Link(link) if link.url.trim().is_empty() => {
                Err("link url is required".to_string())
            }
            BlockContent::Image(image) if image.image_url.trim().is_empty() => {
                Err("image url is required".to_string())
            }
            BlockContent::Video(video) if video.video_url.trim().is_empty() => {
                Err("video url is required".to_string())
            }
            BlockContent::Map(map) if !(-90.0..=90.0).contains(&map.lat) => {
                Err(format!("latitude {} is out of range", map.lat))
            }
            BlockContent::Map(map) if !(-180.0..=180.0).contains(&map.lng) => {
                Err(format!("longitude {} is out of range", map.lng))
            }
            _ => Ok(()),
        }
    }
}

/// A content unit on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,

    /// Position in the page's total order; `None` sorts last
    #[serde(default)]
    pub ordering: Option<i64>,

    /// ISO-8601 creation time, tie-break for ordering
    #[serde(default)]
    pub created_at: String,

    /// Stored layout in storage convention (x = row, y = column)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<StorageRect>,

    #[serde(flatten)]
    pub content: BlockContent,
}

impl Block {
    pub fn new(id: impl Into<String>, content: BlockContent) -> Self {
        Self {
            id: id.into(),
            ordering: None,
            created_at: String::new(),
            layout: None,
            content,
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }

    pub fn with_ordering(mut self, ordering: i64) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_layout(mut self, layout: StorageRect) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }
}

/// Minimal view of a block needed to lay it out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub id: String,
    pub kind: BlockKind,
    #[serde(default)]
    pub layout: Option<StorageRect>,
}

impl BlockDescriptor {
    pub fn new(id: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: StorageRect) -> Self {
        self.layout = Some(layout);
        self
    }
}

impl From<&Block> for BlockDescriptor {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id.clone(),
            kind: block.kind(),
            layout: block.layout,
        }
    }
}

/// The owner's container for blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub owner_id: UserId,
    #[serde(with = "bio_common::handle::canonical")]
    pub handle: Handle,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    /// Position among the owner's pages
    #[serde(default)]
    pub ordering: i64,
}

impl Page {
    pub fn is_owned_by(&self, user: Option<&UserId>) -> bool {
        user.is_some_and(|u| *u == self.owner_id)
    }
}

/// A page together with its blocks, the unit cached on the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub page: Page,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Profile {
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn descriptors(&self) -> Vec<BlockDescriptor> {
        self.blocks.iter().map(BlockDescriptor::from).collect()
    }
}
