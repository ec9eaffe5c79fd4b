mod commands;

use bio_editor::EditorConfig;
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check_handle, init, layout, resize, CheckHandleArgs, InitArgs, LayoutArgs, ResizeArgs,
};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Bio CLI - block layouts for link-in-bio pages
#[derive(Parser, Debug)]
#[command(name = "bio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level regardless of the config
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default bio.config.json
    Init(InitArgs),

    /// Validate and normalize a handle
    CheckHandle(CheckHandleArgs),

    /// Print the grid layout built from a profile file
    Layout(LayoutArgs),

    /// Resize a block and print the layout payload that would be saved
    Resize(ResizeArgs),
}

fn init_tracing(config: &EditorConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} cannot read current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let config = EditorConfig::load(&cwd).unwrap_or_else(|err| {
        eprintln!("{} {}, using defaults", "Warning:".yellow().bold(), err);
        EditorConfig::default()
    });
    init_tracing(&config, cli.verbose);

    let result = run(cli.command, &cwd, &config);

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn run(command: Command, cwd: &Path, config: &EditorConfig) -> anyhow::Result<()> {
    match command {
        Command::Init(args) => init(args, cwd),
        Command::CheckHandle(args) => check_handle(args),
        Command::Layout(args) => layout(args, config),
        Command::Resize(args) => resize(args, config),
    }
}
