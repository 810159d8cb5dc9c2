// src/release/select.rs

//! Selection of slices out of a loaded release.

use tracing::info;

use crate::error::{Error, Result};
use crate::names::SliceKey;
use crate::release::conflict::Claims;
use crate::release::{order, GenerateKind, PathKind, Release, Slice};

/// A validated, ordered set of slices from one release.
///
/// Slices appear in build-safe order: every essential of a selected
/// slice precedes it. The selection is still an abstract proposal in the
/// sense that the real content of packages is unknown here, so selected
/// paths could turn out to be missing at extraction time.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub release: &'a Release,
    pub slices: Vec<&'a Slice>,
}

/// Build a Selection for the requested slices, pulling in their
/// transitive essentials and re-checking path conflicts on the result.
pub fn select<'a>(release: &'a Release, slices: &[SliceKey]) -> Result<Selection<'a>> {
    info!("Selecting slices...");

    let sorted = order::order(&release.packages, slices)?;
    let selected: Vec<&Slice> = sorted
        .iter()
        .map(|key| &release.packages[&key.package].slices[&key.slice])
        .collect();

    let mut claims = Claims::default();
    for &slice in &selected {
        claims.claim(slice)?;
        for (path, info) in &slice.contents {
            // An unrecognized generate value only matters once its slice
            // is actually selected, so the check lives here rather than
            // in the parser.
            if let PathKind::Generate(GenerateKind::Unknown(value)) = &info.kind {
                return Err(Error::Selection(format!(
                    "slice {slice} has invalid 'generate' for path {path}: {value:?}, \
                     consider an update if available"
                )));
            }
        }
    }

    Ok(Selection {
        release,
        slices: selected,
    })
}
