use anyhow::{anyhow, Result};
use bio_common::{Handle, HandleRejection};
use clap::Args;
use colored::Colorize;

#[derive(Debug, Args)]
pub struct CheckHandleArgs {
    /// Handle as typed by the user, with or without a leading `@`
    pub raw: String,
}

pub fn check_handle(args: CheckHandleArgs) -> Result<()> {
    match normalize(&args.raw) {
        Ok(handle) => {
            println!("{} {}", "✓".green(), handle.canonical().bright_white());
            Ok(())
        }
        Err(rejection) => {
            println!("{} {}", "✗".red(), args.raw);
            Err(anyhow!(rejection))
        }
    }
}

fn normalize(raw: &str) -> Result<Handle, HandleRejection> {
    let handle = Handle::parse(raw)?;
    tracing::debug!(raw, handle = %handle, "Normalized handle");
    Ok(handle)
}
