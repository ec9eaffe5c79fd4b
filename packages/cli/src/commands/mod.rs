pub mod check_handle;
pub mod init;
pub mod layout;
pub mod resize;

pub use check_handle::{check_handle, CheckHandleArgs};
pub use init::{init, InitArgs};
pub use layout::{layout, LayoutArgs};
pub use resize::{resize, ResizeArgs};

use anyhow::{Context, Result};
use bio_layout::Profile;
use std::fs;
use std::path::Path;

/// Read a profile exported as JSON
pub fn load_profile(path: &Path) -> Result<Profile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid profile {}", path.display()))
}
