// src/release/loader.rs

//! Discovery and assembly of a release definition directory.
//!
//! The release root carries the top-level manifest; per-package slice
//! definitions live under `slices/` at any depth, one file per package,
//! named after it.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::names;
use crate::release::{parser, Release};

/// Name of the top-level release manifest inside the release directory.
pub const RELEASE_FILENAME: &str = "chisel.yaml";

/// Name of the directory holding the per-package slice definitions.
const SLICES_DIR: &str = "slices";

/// Read and validate a complete release definition rooted at `dir`.
pub fn read_release(dir: impl AsRef<Path>) -> Result<Release> {
    let dir = dir.as_ref();
    let dir_label = dir.display().to_string();
    let log_dir = if dir_label.contains("/.cache/") {
        dir.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(dir_label)
    } else {
        dir_label
    };
    info!("Processing {log_dir} release...");

    let release = read_release_dir(dir)?;
    release.validate()?;
    Ok(release)
}

fn read_release_dir(base_dir: &Path) -> Result<Release> {
    let file_path = base_dir.join(RELEASE_FILENAME);
    let data =
        fs::read(&file_path).map_err(|e| Error::Io(format!("cannot read release definition: {e}")))?;
    let mut release = parser::parse_release(base_dir, RELEASE_FILENAME, &data)?;
    read_slices(&mut release, base_dir, &base_dir.join(SLICES_DIR))?;
    Ok(release)
}

fn read_slices(release: &mut Release, base_dir: &Path, dir_name: &Path) -> Result<()> {
    let entries = fs::read_dir(dir_name).map_err(|_| {
        Error::Io(format!(
            "cannot read {}/ directory",
            strip_base(base_dir, dir_name)
        ))
    })?;
    // Sorted traversal keeps diagnostics reproducible across platforms.
    let mut entries = entries
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::Io(format!("cannot read slice definition directory: {e}")))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            read_slices(release, base_dir, &path)?;
            continue;
        }
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.ends_with(".yaml") {
            continue;
        }
        let Some(pkg_name) = names::package_from_filename(&file_name) else {
            return Err(Error::Schema(format!(
                "invalid slice definition filename: {file_name:?}"
            )));
        };
        let rel_path = strip_base(base_dir, &path);
        if let Some(pkg) = release.packages.get(pkg_name) {
            return Err(Error::Schema(format!(
                "package {pkg_name:?} slices defined more than once: {} and {rel_path}",
                pkg.path
            )));
        }
        debug!("Reading {rel_path}...");
        let data = fs::read(&path)
            .map_err(|e| Error::Io(format!("cannot read slice definition file: {e}")))?;
        let mut pkg = parser::parse_package(pkg_name, &rel_path, &data)?;
        if pkg.archive.is_empty() {
            pkg.archive = release.default_archive.clone();
        }
        if !release.archives.contains_key(&pkg.archive) {
            return Err(Error::Schema(format!(
                "package {:?} refers to undefined archive {:?}",
                pkg.name, pkg.archive
            )));
        }
        release.packages.insert(pkg.name.clone(), pkg);
    }
    Ok(())
}

/// Render a path relative to the release root for diagnostics.
fn strip_base(base_dir: &Path, path: &Path) -> String {
    path.strip_prefix(base_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}
