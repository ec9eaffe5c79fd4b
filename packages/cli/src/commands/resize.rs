use super::load_profile;
use anyhow::Result;
use bio_editor::EditorConfig;
use bio_layout::{build_layouts, resize_block, BuildOptions, Profile, SizePreset};
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ResizeArgs {
    /// Profile JSON file
    pub profile: PathBuf,

    /// Block to resize
    pub block_id: String,

    /// Target size (1x1, 2x1, 1x2, 2x2)
    pub preset: String,
}

pub fn resize(args: ResizeArgs, config: &EditorConfig) -> Result<()> {
    let profile = load_profile(&args.profile)?;
    let preset: SizePreset = args.preset.parse()?;
    println!("{}", render(&profile, &args.block_id, preset, config)?);
    Ok(())
}

/// Canonical payload, in storage coordinates, after resizing one block
fn render(
    profile: &Profile,
    block_id: &str,
    preset: SizePreset,
    config: &EditorConfig,
) -> Result<String> {
    let descriptors = profile.descriptors();
    let persisted: HashSet<String> = profile.blocks.iter().map(|b| b.id.clone()).collect();
    let opts = BuildOptions::editable().with_rows(config.grid_rows);

    let current = build_layouts(&descriptors, &opts);
    let change = resize_block(&descriptors, &current, block_id, preset, &persisted, &opts)?;
    tracing::info!(block_id, preset = %preset, entries = change.payload.len(), "Resized block");

    Ok(serde_json::to_string_pretty(&change.payload)?)
}
