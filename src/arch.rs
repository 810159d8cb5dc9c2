// src/arch.rs

//! Debian architecture identifiers.
//!
//! Content paths may be restricted to a set of architectures. The engine
//! only checks that each identifier is one dpkg would recognize; matching
//! against the target architecture happens at extraction time.

use crate::error::{Error, Result};

/// Architectures recognized in slice definitions.
const KNOWN_ARCHES: &[&str] = &[
    "amd64", "arm64", "armhf", "i386", "ppc64el", "riscv64", "s390x",
];

/// Check that `arch` is a recognized dpkg architecture identifier.
pub fn validate_arch(arch: &str) -> Result<()> {
    if KNOWN_ARCHES.contains(&arch) {
        Ok(())
    } else {
        Err(Error::Schema(format!("invalid architecture: {arch:?}")))
    }
}
