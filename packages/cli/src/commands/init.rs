use anyhow::Result;
use bio_editor::{EditorConfig, DEFAULT_CONFIG_NAME};
use clap::Args;
use colored::Colorize;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Autosave quiet period in milliseconds
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Number of rows in the layout grid
    #[arg(long)]
    pub grid_rows: Option<i32>,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = EditorConfig::path_in(cwd);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let defaults = EditorConfig::default();
    let config = EditorConfig {
        debounce_ms: args.debounce_ms.unwrap_or(defaults.debounce_ms),
        grid_rows: args.grid_rows.unwrap_or(defaults.grid_rows),
        ..defaults
    };

    let path = config.save(cwd)?;
    tracing::info!(path = %path.display(), "Wrote config");

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("Next steps:");
    println!("  1. Export a profile as JSON");
    println!("  2. Run: bio layout profile.json");

    Ok(())
}
