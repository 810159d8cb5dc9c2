// src/lib.rs

//! Paring — carve binary distribution packages into named slices.
//!
//! A release definition declares, per package, which named subsets
//! ("slices") of its content exist, what paths they provide, and which
//! other slices they depend on. This crate loads such a definition into
//! an immutable [`Release`], proves its structural invariants (path
//! conflicts across slices, cycles in the essential graph), and builds
//! ordered [`Selection`]s of slices for extraction.
//!
//! # Example
//!
//! ```no_run
//! let release = paring::read_release("/path/to/release")?;
//! let key = paring::SliceKey::parse("libc6_libs")?;
//! let selection = paring::select(&release, &[key])?;
//! for slice in &selection.slices {
//!     println!("{slice}");
//! }
//! # Ok::<(), paring::Error>(())
//! ```

pub mod arch;
mod error;
pub mod names;
pub mod paths;
pub mod pgp;
pub mod release;

pub use error::{Error, Result};
pub use names::SliceKey;
pub use release::{
    read_release, select, Archive, GenerateKind, Package, PathInfo, PathKind, PathUntil, Release,
    Selection, Slice, SliceScripts, RELEASE_FILENAME,
};
