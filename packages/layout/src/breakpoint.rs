use crate::constants::{NARROW_COLUMNS, WIDE_COLUMNS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Responsive breakpoints recognized by the grid
///
/// `Wide` is the canonical breakpoint: its layout is the one translated back
/// into storage coordinates. `Narrow` is always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Breakpoint {
    #[serde(rename = "lg")]
    Wide,
    #[serde(rename = "sm")]
    Narrow,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 2] = [Breakpoint::Wide, Breakpoint::Narrow];

    pub const CANONICAL: Breakpoint = Breakpoint::Wide;

    pub const fn columns(self) -> i32 {
        match self {
            Breakpoint::Wide => WIDE_COLUMNS,
            Breakpoint::Narrow => NARROW_COLUMNS,
        }
    }

    /// Minimum viewport width in pixels at which this breakpoint applies
    pub const fn min_width(self) -> u32 {
        match self {
            Breakpoint::Wide => 768,
            Breakpoint::Narrow => 0,
        }
    }

    /// Breakpoint that applies to a viewport of the given width
    pub fn for_width(width: u32) -> Breakpoint {
        Breakpoint::ALL
            .into_iter()
            .find(|bp| width >= bp.min_width())
            .unwrap_or(Breakpoint::Narrow)
    }

    pub const fn key(self) -> &'static str {
        match self {
            Breakpoint::Wide => "lg",
            Breakpoint::Narrow => "sm",
        }
    }

    pub fn from_key(key: &str) -> Option<Breakpoint> {
        Breakpoint::ALL.into_iter().find(|bp| bp.key() == key)
    }

    pub const fn is_canonical(self) -> bool {
        matches!(self, Breakpoint::Wide)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
