// src/release/conflict.rs

//! Cross-slice content conflict detection.
//!
//! Two slices may claim the same path only when they provably produce the
//! same entry. Content extracted from the same package is guaranteed
//! identical, so copy and glob claims additionally require a shared
//! package: across packages nothing can be proven without downloading,
//! and generated entries (text, make) never match extracted ones.
//!
//! Conflict messages name the participants in lexicographic order so the
//! diagnostics are reproducible across runs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::names::SliceKey;
use crate::paths;
use crate::release::{PathKind, Release, Slice};

/// Paths claimed so far, with the slice that claimed each first.
#[derive(Debug, Default)]
pub(crate) struct Claims<'a> {
    paths: BTreeMap<&'a str, &'a Slice>,
    wild: BTreeMap<&'a str, &'a Slice>,
}

impl<'a> Claims<'a> {
    /// Record every content path of `slice`, failing on a disagreeing
    /// duplicate claim. The first record is kept unchanged; an agreeing
    /// duplicate is a no-op, since both produce the same entry.
    pub(crate) fn claim(&mut self, slice: &'a Slice) -> Result<()> {
        for (path, info) in &slice.contents {
            let path = path.as_str();
            if let Some(old) = self.paths.get(path) {
                let old_info = &old.contents[path];
                let cross_package = matches!(info.kind, PathKind::Copy(_) | PathKind::Glob)
                    && slice.package != old.package;
                if !info.same_content(old_info) || cross_package {
                    let (left, right) = ordered_keys(old, slice);
                    return Err(Error::PathConflict {
                        left,
                        right,
                        path: path.to_string(),
                    });
                }
            } else {
                self.paths.insert(path, slice);
                if info.kind.is_wildcard() {
                    self.wild.insert(path, slice);
                }
            }
        }
        Ok(())
    }

    /// No wildcard claim may cover a path claimed elsewhere, except for
    /// glob-over-glob or glob-over-copy matches within one package.
    pub(crate) fn check_wildcards(&self) -> Result<()> {
        for (&wild_path, &wild) in &self.wild {
            let wild_info = &wild.contents[wild_path];
            for (&other_path, &other) in &self.paths {
                if wild_path == other_path {
                    // Identical paths were reconciled during claiming;
                    // this is the exact same entry.
                    continue;
                }
                let other_info = &other.contents[other_path];
                if wild_info.kind == PathKind::Glob
                    && matches!(other_info.kind, PathKind::Glob | PathKind::Copy(_))
                    && wild.package == other.package
                {
                    continue;
                }
                if paths::overlap(other_path, wild_path) {
                    let mut left = (wild, wild_path);
                    let mut right = (other, other_path);
                    if participant(&left) > participant(&right) {
                        std::mem::swap(&mut left, &mut right);
                    }
                    return Err(Error::GlobConflict {
                        left: left.0.key(),
                        right: right.0.key(),
                        left_path: left.1.to_string(),
                        right_path: right.1.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Sort key for a wildcard-conflict participant.
fn participant<'a>(entry: &(&'a Slice, &'a str)) -> (&'a str, &'a str, &'a str) {
    (entry.0.package.as_str(), entry.0.name.as_str(), entry.1)
}

/// Order two conflicting slices for a reproducible message.
fn ordered_keys(a: &Slice, b: &Slice) -> (SliceKey, SliceKey) {
    if (a.package.as_str(), a.name.as_str()) > (b.package.as_str(), b.name.as_str()) {
        (b.key(), a.key())
    } else {
        (a.key(), b.key())
    }
}

/// Release-wide validation: both passes over every slice of every
/// package. Returns the full key list for the ordering check that
/// follows.
pub(crate) fn check(release: &Release) -> Result<Vec<SliceKey>> {
    let mut keys = Vec::new();
    let mut claims = Claims::default();
    for pkg in release.packages.values() {
        for slice in pkg.slices.values() {
            keys.push(slice.key());
            claims.claim(slice)?;
        }
    }
    claims.check_wildcards()?;
    Ok(keys)
}
