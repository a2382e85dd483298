//! Streaming `.tar.gz` extraction.
//!
//! Mason archives wrap their contents in a single top-level folder, which is
//! discarded: `protozero-1.5.1/include/protozero/varint.hpp` is written to
//! `<dest>/include/protozero/varint.hpp`.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_compression::tokio::bufread::GzipDecoder;
use futures::StreamExt;
use tokio::io::AsyncBufRead;
use tokio_tar::Archive;
use tracing::debug;

/// Drop the first component of an archive path.
///
/// Returns `Ok(None)` when nothing is left (the top-level folder itself).
///
/// # Errors
///
/// Returns [`io::ErrorKind::InvalidData`] if the remaining path is absolute or
/// climbs out of the destination with `..`.
pub fn strip_first_component(path: &Path) -> io::Result<Option<PathBuf>> {
    let mut stripped = PathBuf::new();
    for component in path.components().skip(1) {
        match component {
            Component::Normal(part) => stripped.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid path in archive: {}", path.display()),
                ));
            }
        }
    }

    if stripped.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(stripped))
    }
}

/// Whether a symlink at `entry` pointing to `link_name` resolves inside the
/// extraction root, judged lexically.
fn link_stays_inside(entry: &Path, link_name: &Path) -> bool {
    let mut depth = entry.parent().map_or(0, |p| p.components().count());
    for component in link_name.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

fn escapes(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("Archive entry escapes destination: {}", path.display()),
    )
}

/// Fail unless `path`, with symlinks resolved, lies under `root`.
async fn ensure_inside(root: &Path, path: &Path) -> io::Result<()> {
    let resolved = tokio::fs::canonicalize(path).await?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(escapes(path))
    }
}

/// Gunzip and untar `reader` into `dest`, stripping the leading component.
///
/// Nothing is written outside `dest`: symlink targets must stay inside it,
/// hard links must point at an earlier member, and every parent directory is
/// re-checked after symlinks are resolved.
///
/// `written` is bumped after every entry lands on disk so the caller can see
/// how far extraction got even when it fails. Returns the final count.
///
/// # Errors
///
/// Returns the first IO error from decompression, archive parsing, or
/// writing an entry, and [`io::ErrorKind::InvalidData`] for an entry that
/// would escape `dest`.
pub async fn unpack_stripped<R>(reader: R, dest: &Path, written: Arc<AtomicUsize>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin + Send,
{
    let root = tokio::fs::canonicalize(dest).await?;
    let mut archive = Archive::new(GzipDecoder::new(reader));
    let mut entries = archive.entries()?;

    while let Some(entry) = entries.next().await {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        let Some(relative) = strip_first_component(&path)? else {
            continue;
        };

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
            ensure_inside(&root, parent).await?;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_hard_link() {
            let link_name = entry.link_name()?.map(|l| l.into_owned());
            let source = link_name
                .as_deref()
                .map(strip_first_component)
                .transpose()?
                .flatten()
                .ok_or_else(|| escapes(&path))?;
            let source = dest.join(source);
            ensure_inside(&root, &source).await?;
            tokio::fs::hard_link(&source, &target).await?;
        } else {
            if entry_type.is_symlink() {
                let link_name = entry.link_name()?.map(|l| l.into_owned());
                if !link_name.is_some_and(|l| link_stays_inside(&relative, &l)) {
                    return Err(escapes(&path));
                }
            }
            entry.unpack(&target).await?;
        }

        let count = written.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(entry = %relative.display(), count, "extracted");
    }

    Ok(written.load(Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Member, archive, tarball};
    use flate2::Compression;
    use tempfile::tempdir;

    async fn unpack(data: &[u8], dest: &Path) -> io::Result<usize> {
        unpack_stripped(data, dest, Arc::new(AtomicUsize::new(0))).await
    }

    #[test]
    fn strips_top_level_folder() {
        assert_eq!(
            strip_first_component(Path::new("protozero-1.5.1/include/a.hpp")).unwrap(),
            Some(PathBuf::from("include/a.hpp"))
        );
        assert_eq!(
            strip_first_component(Path::new("./include/a.hpp")).unwrap(),
            Some(PathBuf::from("include/a.hpp"))
        );
    }

    #[test]
    fn top_level_folder_itself_is_skipped() {
        assert_eq!(strip_first_component(Path::new("protozero-1.5.1/")).unwrap(), None);
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let err = strip_first_component(Path::new("pkg/../../etc/passwd")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn unpacks_and_counts_entries() {
        let dir = tempdir().unwrap();
        let data = tarball(&[
            ("protozero-1.5.1/include/protozero/varint.hpp", b"// varint"),
            ("protozero-1.5.1/mason.ini", b"name=protozero"),
        ]);

        let written = Arc::new(AtomicUsize::new(0));
        let count = unpack_stripped(&data[..], dir.path(), written.clone())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(written.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("include/protozero/varint.hpp")).unwrap(),
            "// varint"
        );
        assert!(dir.path().join("mason.ini").exists());
    }

    #[tokio::test]
    async fn garbage_input_fails() {
        let dir = tempdir().unwrap();
        let written = Arc::new(AtomicUsize::new(0));
        let result = unpack_stripped(&b"this is not gzip"[..], dir.path(), written).await;
        assert!(result.is_err());
    }

    #[test]
    fn link_targets_are_judged_from_the_entry() {
        assert!(link_stays_inside(Path::new("lib/libz.so"), Path::new("libz.so.1")));
        assert!(link_stays_inside(Path::new("lib/libz.so"), Path::new("../include/zlib.h")));
        assert!(!link_stays_inside(Path::new("lib/libz.so"), Path::new("../../etc")));
        assert!(!link_stays_inside(Path::new("evil"), Path::new("/tmp/outside")));
    }

    #[tokio::test]
    async fn relative_symlinks_inside_dest_are_kept() {
        let dir = tempdir().unwrap();
        let data = archive(
            &[
                Member::File("zlib-1.2.8/lib/libz.so.1", b"ELF"),
                Member::Symlink("zlib-1.2.8/lib/libz.so", "libz.so.1"),
            ],
            Compression::default(),
        );

        assert_eq!(unpack(&data, dir.path()).await.unwrap(), 2);
        let link = dir.path().join("lib/libz.so");
        assert!(link.symlink_metadata().unwrap().is_symlink());
        assert_eq!(std::fs::read(&link).unwrap(), b"ELF");
    }

    #[tokio::test]
    async fn writing_through_an_absolute_symlink_is_rejected() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        let target = outside.path().to_str().unwrap().to_string();
        let data = archive(
            &[
                Member::Symlink("pkg/evil", &target),
                Member::File("pkg/evil/pwned", b"gotcha"),
            ],
            Compression::default(),
        );

        let err = unpack(&data, &dest).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!outside.path().join("pwned").exists());
        assert!(dest.join("evil").symlink_metadata().is_err());
    }

    #[tokio::test]
    async fn relative_symlink_climbing_out_is_rejected() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        let data = archive(
            &[
                Member::Symlink("pkg/up", "../outside"),
                Member::File("pkg/up/pwned", b"gotcha"),
            ],
            Compression::default(),
        );

        let err = unpack(&data, &dest).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!dir.path().join("outside/pwned").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_link_out_of_dest_is_not_followed() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        std::os::unix::fs::symlink(outside.path(), dest.join("include")).unwrap();
        let data = tarball(&[("pkg/include/a.hpp", b"// a")]);

        let err = unpack(&data, &dest).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!outside.path().join("a.hpp").exists());
    }

    #[tokio::test]
    async fn hard_links_resolve_against_dest() {
        let dir = tempdir().unwrap();
        let data = archive(
            &[
                Member::File("pkg/bin/tool", b"#!/bin/sh"),
                Member::Hardlink("pkg/bin/tool-alias", "pkg/bin/tool"),
            ],
            Compression::default(),
        );

        assert_eq!(unpack(&data, dir.path()).await.unwrap(), 2);
        assert_eq!(
            std::fs::read(dir.path().join("bin/tool-alias")).unwrap(),
            b"#!/bin/sh"
        );
    }

    #[tokio::test]
    async fn hard_link_out_of_dest_is_rejected() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dir.path().join("secret"), b"s").unwrap();
        let data = archive(
            &[Member::Hardlink("pkg/leak", "pkg/../secret")],
            Compression::default(),
        );

        let err = unpack(&data, &dest).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!dest.join("leak").exists());
    }
}
