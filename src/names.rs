// src/names.rs

//! Names and references used throughout a release definition.
//!
//! Package names follow the distribution's package naming rules, slice
//! names are a stricter subset, and a slice is referred to across package
//! boundaries by its full `package_slice` key. Slice definition filenames
//! carry the package name as their stem.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Matches a slice definition file basename.
static FNAME_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z0-9](?:-?[.a-z0-9+]){1,})\.yaml$").unwrap());

/// Matches a slice name, without the leading package name.
static SNAME_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z](?:-?[a-z0-9]){2,}$").unwrap());

/// Matches a full slice reference in pkg_slice form.
static KNAME_EXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9](?:-?[.a-z0-9+]){1,})_([a-z](?:-?[a-z0-9]){2,})$").unwrap()
});

/// Reference to a slice of a particular package.
///
/// The canonical string form is `package_slice`. Package names cannot
/// contain underscores, so the first underscore always separates the two
/// parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SliceKey {
    pub package: String,
    pub slice: String,
}

impl SliceKey {
    pub fn new(package: impl Into<String>, slice: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            slice: slice.into(),
        }
    }

    /// Parse a `package_slice` reference.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = KNAME_EXP
            .captures(s)
            .ok_or_else(|| Error::Schema(format!("invalid slice reference: {s:?}")))?;
        Ok(Self {
            package: caps[1].to_string(),
            slice: caps[2].to_string(),
        })
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.package, self.slice)
    }
}

impl FromStr for SliceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Extract the package name from a slice definition filename, if the
/// filename is well formed.
pub fn package_from_filename(name: &str) -> Option<&str> {
    FNAME_EXP
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether a bare slice name is well formed.
pub fn valid_slice_name(name: &str) -> bool {
    SNAME_EXP.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slice_key() {
        let key = SliceKey::parse("libc6_libs").unwrap();
        assert_eq!(key.package, "libc6");
        assert_eq!(key.slice, "libs");
        assert_eq!(key.to_string(), "libc6_libs");

        let key = SliceKey::parse("g++-12_copyright").unwrap();
        assert_eq!(key.package, "g++-12");
        assert_eq!(key.slice, "copyright");

        let key: SliceKey = "python3.10_core".parse().unwrap();
        assert_eq!(key.package, "python3.10");
        assert_eq!(key.slice, "core");
    }

    #[test]
    fn test_parse_slice_key_invalid() {
        for bad in [
            "",
            "libc6",
            "libc6_",
            "_libs",
            "libc6_li",
            "libc6_LIBS",
            "LIBC6_libs",
            "libc6_libs_extra_extra",
            "libc6__libs",
            "-libc6_libs",
            "libc6_-libs",
            "libc6_libs-",
        ] {
            let err = SliceKey::parse(bad).unwrap_err();
            assert_eq!(err.to_string(), format!("invalid slice reference: {bad:?}"));
        }
    }

    #[test]
    fn test_package_from_filename() {
        assert_eq!(package_from_filename("libc6.yaml"), Some("libc6"));
        assert_eq!(package_from_filename("base-files.yaml"), Some("base-files"));
        assert_eq!(package_from_filename("g++-12.yaml"), Some("g++-12"));
        assert_eq!(package_from_filename("a.yaml"), None);
        assert_eq!(package_from_filename("libc6.yml"), None);
        assert_eq!(package_from_filename("Libc6.yaml"), None);
        assert_eq!(package_from_filename("lib_c.yaml"), None);
        assert_eq!(package_from_filename(".yaml"), None);
    }

    #[test]
    fn test_valid_slice_name() {
        assert!(valid_slice_name("libs"));
        assert!(valid_slice_name("config-files"));
        assert!(valid_slice_name("bins"));
        assert!(!valid_slice_name("li"));
        assert!(!valid_slice_name("1libs"));
        assert!(!valid_slice_name("libs_extra"));
        assert!(!valid_slice_name("Libs"));
        assert!(!valid_slice_name("-libs"));
    }

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            SliceKey::new("zlib1g", "libs"),
            SliceKey::new("libc6", "utils"),
            SliceKey::new("libc6", "libs"),
        ];
        keys.sort();
        assert_eq!(keys[0], SliceKey::new("libc6", "libs"));
        assert_eq!(keys[1], SliceKey::new("libc6", "utils"));
        assert_eq!(keys[2], SliceKey::new("zlib1g", "libs"));
    }
}
