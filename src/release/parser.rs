// src/release/parser.rs

//! Decoding of the declarative release format.
//!
//! Two document shapes exist: the top-level manifest listing archives and
//! public keys, and one document per package enumerating its slices and
//! their content paths. The raw serde shapes below mirror the documents
//! byte for byte; parsing then validates them into the model types.
//!
//! Unknown fields are tolerated everywhere so that newer definitions keep
//! loading on older engines; unknown *values* are rejected, with the one
//! exception of `generate`, which is only checked at selection time.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::arch::validate_arch;
use crate::error::{Error, Result};
use crate::names::{self, SliceKey};
use crate::paths;
use crate::pgp;
use crate::release::{
    Archive, GenerateKind, Package, PathInfo, PathKind, PathUntil, Release, Slice, SliceScripts,
};

/// Top-level release manifest document.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRelease {
    #[serde(default)]
    pub format: String,
    /// An archive with no body decodes as None and fails validation on
    /// its missing version.
    #[serde(default)]
    pub archives: BTreeMap<String, Option<RawArchive>>,
    #[serde(default, rename = "public-keys")]
    pub public_keys: BTreeMap<String, RawPubKey>,
    /// Compatibility alias used by the legacy chisel-v1 format.
    #[serde(default, rename = "v1-public-keys")]
    pub v1_public_keys: BTreeMap<String, RawPubKey>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawArchive {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub suites: Vec<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default, rename = "public-keys")]
    pub public_keys: Vec<String>,
    #[serde(default, rename = "v1-public-keys")]
    pub v1_public_keys: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawPubKey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub armor: String,
}

/// Per-package slice definition document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawPackage {
    #[serde(default)]
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub archive: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub essential: Vec<String>,
    /// A slice with no body at all is legal, hence the Option.
    #[serde(default)]
    pub slices: BTreeMap<String, Option<RawSlice>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawSlice {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub essential: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contents: BTreeMap<String, Option<RawPath>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mutate: String,
}

/// One content path declaration.
///
/// Field presence drives kind inference, so every field defaults to its
/// zero value, except `text` where presence itself is meaningful and an
/// empty string is a valid value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct RawPath {
    #[serde(default, rename = "make", skip_serializing_if = "is_false")]
    pub dir: bool,
    #[serde(default, skip_serializing_if = "Mode::is_inherit")]
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub copy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symlink: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub mutable: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub until: String,
    #[serde(default, skip_serializing_if = "RawArch::is_empty")]
    pub arch: RawArch,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generate: String,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl RawPath {
    /// Whether both declarations produce the same file or directory
    /// entry. `until`, `arch` and `generate` are not content and do not
    /// participate.
    fn same_content(&self, other: &RawPath) -> bool {
        self.dir == other.dir
            && self.mode == other.mode
            && self.copy == other.copy
            && self.text == other.text
            && self.symlink == other.symlink
            && self.mutable == other.mutable
    }
}

/// Unix permission bits as written in a path declaration.
///
/// YAML 1.2 has no leading-zero octal form, so the textual rendering is a
/// quoted octal string with a leading zero, and bare integers are taken
/// as already decoded (`0o644` in hand-written files).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Mode(pub u32);

impl Mode {
    pub fn is_inherit(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0{:o}", self.0)
    }
}

impl Serialize for Mode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ModeVisitor;

        impl Visitor<'_> for ModeVisitor {
            type Value = Mode;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an octal mode string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Mode, E> {
                u32::try_from(v)
                    .map(Mode)
                    .map_err(|_| E::custom(format!("mode {v} out of range")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Mode, E> {
                u32::try_from(v)
                    .map(Mode)
                    .map_err(|_| E::custom(format!("mode {v} out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Mode, E> {
                let digits = v.strip_prefix("0o").unwrap_or(v);
                u32::from_str_radix(digits, 8)
                    .map(Mode)
                    .map_err(|_| E::custom(format!("invalid mode {v:?}")))
            }
        }

        deserializer.deserialize_any(ModeVisitor)
    }
}

/// Architecture restriction: a single name or a list of names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawArch {
    pub list: Vec<String>,
}

impl RawArch {
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

impl Serialize for RawArch {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.list.len() == 1 {
            serializer.serialize_str(&self.list[0])
        } else {
            self.list.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for RawArch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ArchVisitor;

        impl<'de> Visitor<'de> for ArchVisitor {
            type Value = RawArch;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an architecture name or list of names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawArch, E> {
                Ok(RawArch {
                    list: vec![v.to_string()],
                })
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<RawArch, A::Error> {
                let mut list = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    list.push(name);
                }
                Ok(RawArch { list })
            }
        }

        deserializer.deserialize_any(ArchVisitor)
    }
}

/// Ubuntu codenames used to default the suites field by version.
fn version_codename(version: &str) -> Option<&'static str> {
    match version {
        "18.04" => Some("bionic"),
        "20.04" => Some("focal"),
        "22.04" => Some("jammy"),
        "22.10" => Some("kinetic"),
        _ => None,
    }
}

/// Parse and validate the top-level release manifest.
pub(crate) fn parse_release(base_dir: &Path, file_name: &str, data: &[u8]) -> Result<Release> {
    let mut raw: RawRelease = serde_yaml::from_slice(data).map_err(|e| Error::Syntax {
        file: file_name.to_string(),
        reason: format!("cannot parse release definition: {e}"),
    })?;

    if raw.format != "v1" && raw.format != "chisel-v1" {
        return Err(Error::Schema(format!(
            "{file_name}: unknown format {:?}",
            raw.format
        )));
    }
    let legacy = raw.format == "chisel-v1";

    // The legacy format spells the key tables v1-public-keys; fold them
    // onto the canonical fields so the validation below sees one shape.
    if legacy {
        raw.public_keys = std::mem::take(&mut raw.v1_public_keys);
        for archive in raw.archives.values_mut().flatten() {
            archive.public_keys = std::mem::take(&mut archive.v1_public_keys);
        }
    }

    if raw.archives.is_empty() {
        return Err(Error::Schema(format!("{file_name}: no archives defined")));
    }

    // Decode the key table and match each armor against its declared ID.
    let mut pub_keys = BTreeMap::new();
    for (key_name, raw_key) in &raw.public_keys {
        let cert = pgp::decode_pub_key(raw_key.armor.as_bytes()).map_err(|e| {
            Error::Crypto(format!(
                "{file_name}: cannot decode public key {key_name:?}: {e}"
            ))
        })?;
        let key_id = pgp::key_id(&cert);
        if raw_key.id != key_id {
            return Err(Error::Crypto(format!(
                "{file_name}: public key {key_name:?} armor has incorrect ID: expected {:?}, got {key_id:?}",
                raw_key.id
            )));
        }
        pub_keys.insert(key_name.as_str(), cert);
    }

    let mut release = Release {
        path: base_dir.to_path_buf(),
        packages: BTreeMap::new(),
        archives: BTreeMap::new(),
        default_archive: String::new(),
    };

    let empty_archive = RawArchive::default();
    let single_archive = raw.archives.len() == 1;
    for (archive_name, details) in &raw.archives {
        let details = details.as_ref().unwrap_or(&empty_archive);
        if details.version.is_empty() {
            return Err(Error::Schema(format!(
                "{file_name}: archive {archive_name:?} missing version field"
            )));
        }
        let mut suites = details.suites.clone();
        if suites.is_empty() {
            match version_codename(&details.version) {
                Some(codename) => suites.push(codename.to_string()),
                None => {
                    return Err(Error::Schema(format!(
                        "{file_name}: archive {archive_name:?} missing suites field"
                    )))
                }
            }
        }
        if details.components.is_empty() {
            return Err(Error::Schema(format!(
                "{file_name}: archive {archive_name:?} missing components field"
            )));
        }
        if details.default && !release.default_archive.is_empty() {
            return Err(Error::Schema(format!(
                "{file_name}: more than one default archive: {}, {archive_name}",
                release.default_archive
            )));
        }
        if details.default || single_archive {
            release.default_archive = archive_name.clone();
        }
        if details.public_keys.is_empty() {
            let field = if legacy { "v1-public-keys" } else { "public-keys" };
            return Err(Error::Schema(format!(
                "{file_name}: archive {archive_name:?} missing {field} field"
            )));
        }
        let mut archive_keys = Vec::with_capacity(details.public_keys.len());
        for key_name in &details.public_keys {
            let cert = pub_keys.get(key_name.as_str()).ok_or_else(|| {
                Error::Schema(format!(
                    "{file_name}: archive {archive_name:?} refers to undefined public key {key_name:?}"
                ))
            })?;
            archive_keys.push(cert.clone());
        }
        release.archives.insert(
            archive_name.clone(),
            Archive {
                name: archive_name.clone(),
                version: details.version.clone(),
                suites,
                components: details.components.clone(),
                pub_keys: archive_keys,
            },
        );
    }

    Ok(release)
}

/// Parse and validate one package's slice definitions.
pub(crate) fn parse_package(pkg_name: &str, pkg_path: &str, data: &[u8]) -> Result<Package> {
    let raw: RawPackage = serde_yaml::from_slice(data).map_err(|e| Error::Syntax {
        file: pkg_path.to_string(),
        reason: format!("cannot parse package {pkg_name:?} slice definitions: {e}"),
    })?;
    if raw.package != pkg_name {
        return Err(Error::Schema(format!(
            "{pkg_path}: filename and 'package' field ({:?}) disagree",
            raw.package
        )));
    }

    let mut pkg = Package {
        name: pkg_name.to_string(),
        path: pkg_path.to_string(),
        archive: raw.archive.clone(),
        slices: BTreeMap::new(),
    };

    let empty_slice = RawSlice::default();
    for (slice_name, raw_slice) in &raw.slices {
        if !names::valid_slice_name(slice_name) {
            return Err(Error::Schema(format!(
                "invalid slice name {slice_name:?} in {pkg_path}"
            )));
        }
        let raw_slice = raw_slice.as_ref().unwrap_or(&empty_slice);

        let mut slice = Slice {
            package: pkg_name.to_string(),
            name: slice_name.clone(),
            essential: Vec::new(),
            contents: BTreeMap::new(),
            scripts: SliceScripts {
                mutate: raw_slice.mutate.clone(),
            },
        };

        // Package-level essentials are inherited by every slice; a
        // reference back to the slice itself is simply skipped there,
        // while slice-level self-references are mistakes.
        for ref_name in &raw.essential {
            let key = SliceKey::parse(ref_name).map_err(|_| {
                Error::Dependency(format!(
                    "package {pkg_name:?} has invalid essential slice reference: {ref_name:?}"
                ))
            })?;
            if key.package == slice.package && key.slice == slice.name {
                continue;
            }
            if slice.essential.contains(&key) {
                return Err(Error::Dependency(format!(
                    "package {pkg_name} defined with redundant essential slice: {ref_name}"
                )));
            }
            slice.essential.push(key);
        }
        for ref_name in &raw_slice.essential {
            let key = SliceKey::parse(ref_name).map_err(|_| {
                Error::Dependency(format!(
                    "package {pkg_name:?} has invalid essential slice reference: {ref_name:?}"
                ))
            })?;
            if key.package == slice.package && key.slice == slice.name {
                return Err(Error::Dependency(format!(
                    "cannot add slice to itself as essential {ref_name:?} in {pkg_path}"
                )));
            }
            if slice.essential.contains(&key) {
                return Err(Error::Dependency(format!(
                    "slice {slice} defined with redundant essential slice: {ref_name}"
                )));
            }
            slice.essential.push(key);
        }

        for (cont_path, raw_path) in &raw_slice.contents {
            let info = parse_path(pkg_name, slice_name, cont_path, raw_path.as_ref())?;
            slice.contents.insert(cont_path.clone(), info);
        }

        pkg.slices.insert(slice_name.clone(), slice);
    }

    Ok(pkg)
}

/// Assign exactly one kind to a content path and validate its options.
fn parse_path(
    pkg_name: &str,
    slice_name: &str,
    cont_path: &str,
    raw: Option<&RawPath>,
) -> Result<PathInfo> {
    let is_dir = cont_path.ends_with('/');
    let compare_path = if is_dir {
        &cont_path[..cont_path.len() - 1]
    } else {
        cont_path
    };
    if !cont_path.starts_with('/') || paths::clean(cont_path) != compare_path {
        return Err(Error::PathOption(format!(
            "slice {pkg_name}_{slice_name} has invalid content path: {cont_path}"
        )));
    }

    let zero = RawPath::default();
    let mut kinds: Vec<PathKind> = Vec::new();

    if let Some(raw) = raw.filter(|raw| !raw.generate.is_empty()) {
        if !raw.same_content(&zero) || !raw.until.is_empty() {
            return Err(Error::PathOption(format!(
                "slice {pkg_name}_{slice_name} path {cont_path} has invalid generate options"
            )));
        }
        paths::validate_generate_path(cont_path).map_err(|e| {
            Error::PathOption(format!(
                "slice {pkg_name}_{slice_name} has invalid generate path: {e}"
            ))
        })?;
        kinds.push(PathKind::Generate(GenerateKind::from_label(&raw.generate)));
    } else if cont_path.contains(['*', '?']) {
        if let Some(raw) = raw {
            if !raw.same_content(&zero) {
                return Err(Error::PathOption(format!(
                    "slice {pkg_name}_{slice_name} path {cont_path} has invalid wildcard options"
                )));
            }
        }
        kinds.push(PathKind::Glob);
    }

    let mut mode = 0u32;
    let mut mutable = false;
    let mut until = PathUntil::None;
    let mut arch = Vec::new();
    if let Some(raw) = raw {
        mode = raw.mode.0;
        mutable = raw.mutable;
        if raw.dir {
            if !is_dir {
                return Err(Error::PathOption(format!(
                    "slice {pkg_name}_{slice_name} path {cont_path} must end in / for 'make' to be valid"
                )));
            }
            kinds.push(PathKind::Dir);
        }
        if let Some(text) = &raw.text {
            kinds.push(PathKind::Text(text.clone()));
        }
        if !raw.symlink.is_empty() {
            kinds.push(PathKind::Symlink(raw.symlink.clone()));
        }
        if !raw.copy.is_empty() {
            let source = if raw.copy == cont_path {
                None
            } else {
                Some(raw.copy.clone())
            };
            kinds.push(PathKind::Copy(source));
        }
        until = match raw.until.as_str() {
            "" => PathUntil::None,
            "mutate" => PathUntil::Mutate,
            other => {
                return Err(Error::Schema(format!(
                    "slice {pkg_name}_{slice_name} has invalid 'until' for path {cont_path}: {other:?}"
                )))
            }
        };
        for name in &raw.arch.list {
            if validate_arch(name).is_err() {
                return Err(Error::Schema(format!(
                    "slice {pkg_name}_{slice_name} has invalid 'arch' for path {cont_path}: {name:?}"
                )));
            }
        }
        arch = raw.arch.list.clone();
    }

    if kinds.is_empty() {
        kinds.push(PathKind::Copy(None));
    }
    if kinds.len() != 1 {
        let list: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
        return Err(Error::PathOption(format!(
            "conflict in slice {pkg_name}_{slice_name} definition for path {cont_path}: {}",
            list.join(", ")
        )));
    }
    let kind = kinds.remove(0);

    if mutable && !matches!(kind, PathKind::Text(_)) && (!matches!(kind, PathKind::Copy(_)) || is_dir)
    {
        return Err(Error::PathOption(format!(
            "slice {pkg_name}_{slice_name} mutable is not a regular file: {cont_path}"
        )));
    }

    Ok(PathInfo {
        kind,
        mode,
        mutable,
        until,
        arch,
    })
}
