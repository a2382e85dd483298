//! `mason link`

use std::time::Instant;

use anyhow::{Context as _, Result};
use mason_core::{PackageKind, PackageSpec, link};

use super::Context;

/// Merge installed packages into the shared link tree.
pub async fn link(ctx: &Context, packages: &[PackageSpec], kind: PackageKind) -> Result<()> {
    let start_time = Instant::now();
    let descriptors = ctx.descriptors(packages, kind).await?;
    let link_root = ctx.config.link_root();

    let pairs = link::plan(&descriptors, &link_root);
    link::merge(&pairs)
        .with_context(|| format!("Failed to link packages into {}", link_root.display()))?;

    ctx.reporter
        .summary(pairs.len(), "link", start_time.elapsed().as_secs_f64());
    Ok(())
}
