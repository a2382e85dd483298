//! `mason install`

use anyhow::{Context as _, Result};
use mason_core::{HttpFetcher, Installer, Manifest, PackageKind, PackageSpec};
use tracing::info;

use super::Context;

/// Install every manifest package, or declare `packages` under `kind` and
/// install just those.
///
/// New declarations are saved before anything is fetched; a duplicate leaves
/// the manifest file untouched.
pub async fn install(ctx: &Context, packages: &[PackageSpec], kind: PackageKind) -> Result<()> {
    let descriptors = ctx.descriptors(packages, kind).await?;

    if !packages.is_empty() {
        let mut manifest = Manifest::load_or_default(&ctx.manifest_path)
            .await
            .with_context(|| format!("Failed to load manifest {}", ctx.manifest_path.display()))?;
        for spec in packages {
            manifest.add(spec.clone(), kind)?;
        }
        manifest.save(&ctx.manifest_path).await?;
        info!(count = packages.len(), path = %ctx.manifest_path.display(), "manifest updated");
    }

    if descriptors.is_empty() {
        println!("No packages declared in {}", ctx.manifest_path.display());
        return Ok(());
    }

    let fetcher = HttpFetcher::new(ctx.client.clone(), ctx.reporter.clone());
    let summary = Installer::new(fetcher, ctx.reporter.clone())
        .install_all(&descriptors)
        .await?;

    info!(
        fetched = summary.fetched,
        already_installed = summary.already_installed,
        "install finished"
    );
    Ok(())
}
