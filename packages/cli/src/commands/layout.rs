use super::load_profile;
use anyhow::{anyhow, Result};
use bio_editor::EditorConfig;
use bio_layout::{build_layouts, Breakpoint, BuildOptions, Profile};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct LayoutArgs {
    /// Profile JSON file
    pub profile: PathBuf,

    /// Only print one breakpoint (lg, sm)
    #[arg(short, long, conflicts_with = "width")]
    pub breakpoint: Option<String>,

    /// Pick the breakpoint for a viewport width in pixels
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Build the owner's draggable layout instead of the visitor's
    #[arg(long)]
    pub editable: bool,
}

pub fn layout(args: LayoutArgs, config: &EditorConfig) -> Result<()> {
    let profile = load_profile(&args.profile)?;
    println!("{}", render(&profile, &args, config)?);
    Ok(())
}

fn selected_breakpoint(args: &LayoutArgs) -> Result<Option<Breakpoint>> {
    if let Some(width) = args.width {
        return Ok(Some(Breakpoint::for_width(width)));
    }
    args.breakpoint
        .as_deref()
        .map(|key| {
            Breakpoint::from_key(key)
                .ok_or_else(|| anyhow!("Unknown breakpoint: {}. Use: lg or sm", key))
        })
        .transpose()
}

fn render(profile: &Profile, args: &LayoutArgs, config: &EditorConfig) -> Result<String> {
    let opts = if args.editable {
        BuildOptions::editable()
    } else {
        BuildOptions::read_only()
    }
    .with_rows(config.grid_rows);

    let table = build_layouts(&profile.descriptors(), &opts);
    tracing::info!(handle = %profile.page.handle, blocks = profile.blocks.len(), "Built layout");

    let json = match selected_breakpoint(args)? {
        Some(bp) => serde_json::to_string_pretty(table.get(bp))?,
        None => serde_json::to_string_pretty(&table)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::PROFILE;
    use serde_json::Value;

    fn args(breakpoint: Option<&str>, width: Option<u32>, editable: bool) -> LayoutArgs {
        LayoutArgs {
            profile: PathBuf::from("profile.json"),
            breakpoint: breakpoint.map(str::to_string),
            width,
            editable,
        }
    }

    fn profile() -> Profile {
        serde_json::from_str(PROFILE).unwrap()
    }

    fn item<'a>(items: &'a Value, id: &str) -> &'a Value {
        items
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["i"] == id)
            .unwrap()
    }

    #[test]
    fn test_render_single_breakpoint() {
        let json = render(&profile(), &args(Some("lg"), None, false), &EditorConfig::default())
            .unwrap();
        let items: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(items.as_array().unwrap().len(), 3);

        let l = item(&items, "l");
        assert_eq!((l["x"].as_i64(), l["y"].as_i64()), (Some(2), Some(1)));
    }

    #[test]
    fn test_render_width_picks_narrow() {
        let json = render(&profile(), &args(None, Some(375), false), &EditorConfig::default())
            .unwrap();
        let items: Value = serde_json::from_str(&json).unwrap();
        let a = item(&items, "a");
        assert_eq!(a["w"].as_i64(), Some(2));
    }

    #[test]
    fn test_render_all_breakpoints() {
        let json = render(&profile(), &args(None, None, true), &EditorConfig::default()).unwrap();
        let table: Value = serde_json::from_str(&json).unwrap();
        assert!(table.get("lg").is_some());
        assert!(table.get("sm").is_some());
    }

    #[test]
    fn test_unknown_breakpoint_is_an_error() {
        let result = render(&profile(), &args(Some("xl"), None, false), &EditorConfig::default());
        assert!(result.is_err());
    }
}
