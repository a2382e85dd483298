//! Status command listing manifest packages and their install state
use anyhow::Result;
use crossterm::style::Stylize;
use mason_core::install::state::{self, InstallationState};

use super::Context;

/// Print every manifest package with its on-disk state. Read-only.
pub async fn status(ctx: &Context) -> Result<()> {
    let descriptors = ctx.manifest_descriptors().await?;
    let name_width = descriptors
        .iter()
        .map(|d| d.name().len())
        .max()
        .unwrap_or(0)
        .max(12);

    println!();
    println!(
        "{}",
        format!(
            "{} (packages under {})",
            ctx.manifest_path.display(),
            ctx.config.packages_dir().display()
        )
        .dark_grey()
    );
    println!();

    if descriptors.is_empty() {
        println!("{}", "No packages declared".dark_grey());
        println!();
        return Ok(());
    }

    let mut installed = 0;
    for d in &descriptors {
        let state = state::inspect(d.dest_dir())?;
        let label = format!("{:<10}", state.as_str());
        if state.is_complete() {
            installed += 1;
        }
        let styled = match state {
            InstallationState::Complete => label.green(),
            InstallationState::EmptyStub => label.yellow(),
            InstallationState::Absent => label.dark_grey(),
        };

        let name = format!("{:<name_width$}", d.name().as_str());
        println!(
            "  {} {:<10} {:<9} {}",
            name.cyan(),
            d.version().as_str(),
            d.kind().as_str().dark_grey(),
            styled
        );
    }

    println!();
    println!(
        "{}",
        format!("{installed} of {} installed", descriptors.len()).dark_grey()
    );
    println!();
    Ok(())
}
