//! `mason-versions.ini` parsing and editing.
//!
//! The manifest is a flat, INI-like list of `name=version` lines grouped
//! under a `[headers]` and an optional `[compiled]` section:
//!
//! ```text
//! [headers]
//! protozero=1.5.1
//! [compiled]
//! cairo=1.14.8
//! ```
//!
//! `[headers]` must be the first non-empty line, even when no header
//! packages are listed. Lines that are neither section markers nor
//! declarations are ignored.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::config::ConfigError;
use crate::error::MasonError;
use crate::locator::{Locator, PackageDescriptor};
use crate::types::{PackageKind, PackageName, Version};

/// Errors in the manifest text itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The first non-empty line was not `[headers]`.
    #[error("Headers must be declared before compiled packages.")]
    HeadersNotFirst,

    /// A declaration line did not split into exactly `name=version`.
    #[error("Invalid package syntax on line {line}: '{content}'")]
    InvalidPackageSyntax {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },
}

/// Errors loading, editing, or saving a manifest file.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The `name=version` pair is already declared.
    #[error("Package {name}={version} could not be saved, already exists in the manifest.")]
    DuplicatePackage {
        /// Package name.
        name: PackageName,
        /// Package version.
        version: Version,
    },
}

/// A `name=version` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    /// Package name.
    pub name: PackageName,
    /// Package version.
    pub version: Version,
}

impl PackageSpec {
    /// Create a spec from a name and version.
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: PackageName::new(name),
            version: Version::new(version),
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.version)
    }
}

impl std::str::FromStr for PackageSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_package_line(s)
    }
}

/// Parse a single `name=version` declaration.
///
/// # Errors
///
/// Returns [`ParseError::InvalidPackageSyntax`] unless splitting on `=`
/// yields exactly two non-empty parts.
///
/// # Example
///
/// ```
/// use mason_core::manifest::parse_package_line;
///
/// let spec = parse_package_line("protozero=1.5.1").unwrap();
/// assert_eq!(spec.name.as_str(), "protozero");
/// assert_eq!(spec.version.as_str(), "1.5.1");
/// assert!(parse_package_line("protozero").is_err());
/// ```
pub fn parse_package_line(line: &str) -> Result<PackageSpec, ParseError> {
    parse_declaration(line, 1)
}

fn parse_declaration(line: &str, line_no: usize) -> Result<PackageSpec, ParseError> {
    let invalid = || ParseError::InvalidPackageSyntax {
        line: line_no,
        content: line.to_string(),
    };

    let parts: Vec<&str> = line.split('=').map(str::trim).collect();
    match parts.as_slice() {
        [name, version] if !name.is_empty() && !version.is_empty() => {
            Ok(PackageSpec::new(name, version))
        }
        _ => Err(invalid()),
    }
}

/// One declared package and the section it was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The declaration.
    pub spec: PackageSpec,
    /// Section it belongs to.
    pub kind: PackageKind,
}

/// A parsed manifest, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::HeadersNotFirst`] if the first non-empty line is
    /// not `[headers]`, and [`ParseError::InvalidPackageSyntax`] for the first
    /// malformed declaration.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let first = text.lines().map(str::trim).find(|line| !line.is_empty());
        if first != Some(PackageKind::Header.section_marker()) {
            return Err(ParseError::HeadersNotFirst);
        }

        let mut kind = PackageKind::Header;
        let mut entries = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.contains('=') {
                let spec = parse_declaration(line, idx + 1)?;
                entries.push(ManifestEntry { spec, kind });
            } else if line == PackageKind::Compiled.section_marker() {
                kind = PackageKind::Compiled;
            } else if line == PackageKind::Header.section_marker() {
                kind = PackageKind::Header;
            }
        }

        Ok(Self { entries })
    }

    /// Read and parse a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] if the file cannot be read, or
    /// [`ManifestError::Parse`] if its contents are malformed.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&content)?)
    }

    /// Like [`Manifest::load`], but a missing file yields an empty manifest.
    ///
    /// # Errors
    ///
    /// Same as [`Manifest::load`] for anything other than a missing file.
    pub async fn load_or_default(path: &Path) -> Result<Self, ManifestError> {
        match Self::load(path).await {
            Err(ManifestError::Read { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Atomically persist the manifest: write a temp file, then rename.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Write`] if writing or renaming fails.
    pub async fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };

        let temp_path = path.with_extension("ini.tmp");
        fs::write(&temp_path, self.to_string())
            .await
            .map_err(write_err)?;
        fs::rename(&temp_path, path).await.map_err(write_err)?;
        Ok(())
    }

    /// All entries, in declaration order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Number of declared packages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no packages are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the exact `name=version` pair is declared in any section.
    pub fn contains(&self, spec: &PackageSpec) -> bool {
        self.entries.iter().any(|e| &e.spec == spec)
    }

    /// Declare a package at the end of its section.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::DuplicatePackage`] if the pair is already
    /// declared; the manifest is left unchanged.
    pub fn add(&mut self, spec: PackageSpec, kind: PackageKind) -> Result<(), ManifestError> {
        if self.contains(&spec) {
            return Err(ManifestError::DuplicatePackage {
                name: spec.name,
                version: spec.version,
            });
        }

        let insert_at = match kind {
            PackageKind::Header => self
                .entries
                .iter()
                .rposition(|e| e.kind == PackageKind::Header)
                .map_or(0, |i| i + 1),
            PackageKind::Compiled => self.entries.len(),
        };
        self.entries.insert(insert_at, ManifestEntry { spec, kind });
        Ok(())
    }

    /// Locate every entry, preserving declaration order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry that cannot be located (e.g. a compiled
    /// package on an unsupported host).
    pub fn descriptors(&self, locator: &Locator<'_>) -> Result<Vec<PackageDescriptor>, ConfigError> {
        self.entries
            .iter()
            .map(|e| locator.locate(&e.spec, e.kind))
            .collect()
    }

    fn section(&self, kind: PackageKind) -> impl Iterator<Item = &PackageSpec> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| &e.spec)
    }
}

impl fmt::Display for Manifest {
    /// Serializes with `[headers]` always first and `[compiled]` only when it
    /// has entries.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", PackageKind::Header.section_marker())?;
        for spec in self.section(PackageKind::Header) {
            writeln!(f, "{spec}")?;
        }

        let mut compiled = self.section(PackageKind::Compiled).peekable();
        if compiled.peek().is_some() {
            writeln!(f, "{}", PackageKind::Compiled.section_marker())?;
            for spec in compiled {
                writeln!(f, "{spec}")?;
            }
        }
        Ok(())
    }
}

/// Parse manifest text straight into located descriptors.
///
/// # Errors
///
/// Returns [`MasonError::Parse`] for malformed text and
/// [`MasonError::Config`] if an entry cannot be located.
pub fn parse(text: &str, locator: &Locator<'_>) -> Result<Vec<PackageDescriptor>, MasonError> {
    let manifest = Manifest::parse(text)?;
    Ok(manifest.descriptors(locator)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DEFAULT_BUCKET};
    use crate::platform::Platform;

    const SAMPLE: &str = "[headers]\nprotozero=1.5.1\ngeometry=0.9.2\n[compiled]\ncairo=1.14.8\n";

    #[test]
    fn parses_sections_in_order() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        let got: Vec<(String, PackageKind)> = manifest
            .entries()
            .iter()
            .map(|e| (e.spec.to_string(), e.kind))
            .collect();

        assert_eq!(
            got,
            vec![
                ("protozero=1.5.1".to_string(), PackageKind::Header),
                ("geometry=0.9.2".to_string(), PackageKind::Header),
                ("cairo=1.14.8".to_string(), PackageKind::Compiled),
            ]
        );
    }

    #[test]
    fn headers_only_manifest() {
        let manifest = Manifest::parse("[headers]\nprotozero=1.5.1").unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        let manifest = Manifest::parse("\n\n[headers]\nprotozero=1.5.1\n").unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn crlf_line_endings() {
        let manifest = Manifest::parse("[headers]\r\nprotozero=1.5.1\r\n").unwrap();
        assert_eq!(manifest.entries()[0].spec.version.as_str(), "1.5.1");
    }

    #[test]
    fn compiled_first_is_rejected() {
        let err = Manifest::parse("[compiled]\ncairo=1.14.8\n[headers]\n").unwrap_err();
        assert_eq!(err, ParseError::HeadersNotFirst);
    }

    #[test]
    fn missing_headers_marker_is_rejected_without_compiled() {
        assert_eq!(
            Manifest::parse("protozero=1.5.1\n").unwrap_err(),
            ParseError::HeadersNotFirst
        );
        assert_eq!(Manifest::parse("").unwrap_err(), ParseError::HeadersNotFirst);
    }

    #[test]
    fn unrelated_lines_are_ignored() {
        let manifest = Manifest::parse("[headers]\n# pinned\nprotozero=1.5.1\n[other]\n").unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn bad_declarations_report_line() {
        let err = Manifest::parse("[headers]\nprotozero=1.5.1\na=b=c\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidPackageSyntax {
                line: 3,
                content: "a=b=c".to_string()
            }
        );
        assert!(Manifest::parse("[headers]\n=1.0\n").is_err());
        assert!(Manifest::parse("[headers]\nname=\n").is_err());
    }

    #[test]
    fn package_line_round_trip() {
        let spec = parse_package_line("protozero=1.5.1").unwrap();
        assert_eq!(spec, PackageSpec::new("protozero", "1.5.1"));
        assert_eq!(spec.to_string(), "protozero=1.5.1");
        assert!(matches!(
            parse_package_line("protozero"),
            Err(ParseError::InvalidPackageSyntax { .. })
        ));
    }

    #[test]
    fn add_appends_to_its_section() {
        let mut manifest = Manifest::parse(SAMPLE).unwrap();
        manifest
            .add(PackageSpec::new("variant", "1.1.4"), PackageKind::Header)
            .unwrap();
        manifest
            .add(PackageSpec::new("libpng", "1.6.28"), PackageKind::Compiled)
            .unwrap();

        assert_eq!(
            manifest.to_string(),
            "[headers]\nprotozero=1.5.1\ngeometry=0.9.2\nvariant=1.1.4\n\
             [compiled]\ncairo=1.14.8\nlibpng=1.6.28\n"
        );
    }

    #[test]
    fn add_to_empty_manifest() {
        let mut manifest = Manifest::default();
        manifest
            .add(PackageSpec::new("cairo", "1.14.8"), PackageKind::Compiled)
            .unwrap();
        manifest
            .add(PackageSpec::new("protozero", "1.5.1"), PackageKind::Header)
            .unwrap();

        let text = manifest.to_string();
        assert_eq!(text, "[headers]\nprotozero=1.5.1\n[compiled]\ncairo=1.14.8\n");
        assert_eq!(Manifest::parse(&text).unwrap(), manifest);
    }

    #[test]
    fn duplicate_add_leaves_manifest_unchanged() {
        let mut manifest = Manifest::parse(SAMPLE).unwrap();
        let before = manifest.clone();

        let err = manifest
            .add(PackageSpec::new("cairo", "1.14.8"), PackageKind::Header)
            .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicatePackage { .. }));
        assert_eq!(manifest, before);
    }

    #[tokio::test]
    async fn duplicate_add_leaves_file_unmodified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mason-versions.ini");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut manifest = Manifest::load(&path).await.unwrap();
        assert!(
            manifest
                .add(PackageSpec::new("protozero", "1.5.1"), PackageKind::Header)
                .is_err()
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mason-versions.ini");

        let mut manifest = Manifest::load_or_default(&path).await.unwrap();
        assert!(manifest.is_empty());
        manifest
            .add(PackageSpec::new("protozero", "1.5.1"), PackageKind::Header)
            .unwrap();
        manifest.save(&path).await.unwrap();

        assert_eq!(Manifest::load(&path).await.unwrap(), manifest);
        assert!(!dir.path().join("mason-versions.ini.tmp").exists());
    }

    #[tokio::test]
    async fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join("nope.ini")).await.unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }

    #[test]
    fn parse_to_descriptors() {
        let config = Config::new(DEFAULT_BUCKET, "/work")
            .unwrap()
            .with_platform(Platform::Osx);
        let descriptors = parse(SAMPLE, &Locator::new(&config)).unwrap();

        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[0].remote_key(), "headers/protozero/1.5.1.tar.gz");
        assert_eq!(descriptors[2].remote_key(), "osx-x86_64/cairo/1.14.8.tar.gz");
    }

    #[test]
    fn parse_propagates_section_error() {
        let config = Config::new(DEFAULT_BUCKET, "/work").unwrap();
        let err = parse("[compiled]\ncairo=1.14.8\n", &Locator::new(&config)).unwrap_err();
        assert!(matches!(err, MasonError::Parse(ParseError::HeadersNotFirst)));
    }
}
