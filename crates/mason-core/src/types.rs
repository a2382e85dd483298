//! Newtypes shared across the install and link pipelines.

use std::fmt;
use std::str::FromStr;

/// A package name as declared in the manifest.
///
/// Names are kept exactly as written: the bucket layout is case sensitive,
/// so no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Create a new package name.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A package version string, stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(String);

impl Version {
    /// Create a new version from the given string.
    pub fn new(v: &str) -> Self {
        Self(v.to_string())
    }

    /// Return the version string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for Version {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which manifest section a package was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Header-only package, shared by every platform.
    Header,
    /// Prebuilt binary package, specific to the host platform.
    Compiled,
}

impl PackageKind {
    /// The manifest section marker for this kind (`[headers]` / `[compiled]`).
    pub fn section_marker(self) -> &'static str {
        match self {
            Self::Header => "[headers]",
            Self::Compiled => "[compiled]",
        }
    }

    /// Short lowercase name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Compiled => "compiled",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "header" | "headers" => Ok(Self::Header),
            "compiled" => Ok(Self::Compiled),
            _ => Err(format!("Unknown package type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_keep_their_case() {
        assert_eq!(PackageName::new("Boost").as_str(), "Boost");
    }

    #[test]
    fn kind_from_str_accepts_both_header_spellings() {
        assert_eq!("header".parse::<PackageKind>(), Ok(PackageKind::Header));
        assert_eq!("HEADERS".parse::<PackageKind>(), Ok(PackageKind::Header));
        assert_eq!("compiled".parse::<PackageKind>(), Ok(PackageKind::Compiled));
        assert!("binary".parse::<PackageKind>().is_err());
    }

    #[test]
    fn section_markers() {
        assert_eq!(PackageKind::Header.section_marker(), "[headers]");
        assert_eq!(PackageKind::Compiled.section_marker(), "[compiled]");
    }
}
