// tests/common/mod.rs

//! Shared helpers for building release trees on disk.

use std::fs;
use std::path::Path;

use sequoia_openpgp as openpgp;

use openpgp::serialize::SerializeInto;
use tempfile::TempDir;

/// Generate a throwaway signing key, returning its ID and armored form.
pub fn test_key() -> (String, String) {
    let (cert, _) = openpgp::cert::CertBuilder::new()
        .add_userid("test@example.com")
        .generate()
        .unwrap();
    let id = cert.keyid().to_hex();
    let armor = String::from_utf8(cert.armored().to_vec().unwrap()).unwrap();
    (id, armor)
}

/// A minimal manifest with one ubuntu archive referencing one key. The
/// suites field is left out on purpose: version 22.04 defaults it.
pub fn base_manifest(id: &str, armor: &str) -> String {
    let indented = armor
        .lines()
        .map(|line| format!("            {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "\
format: v1
archives:
    ubuntu:
        version: \"22.04\"
        components: [main, universe]
        public-keys: [test-key]
public-keys:
    test-key:
        id: {id}
        armor: |
{indented}
"
    )
}

/// Write a release tree into a fresh directory: the manifest at the root
/// plus one slices/<pkg>.yaml per entry.
pub fn write_release(manifest: &str, packages: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_release_into(dir.path(), manifest, packages);
    dir
}

pub fn write_release_into(dir: &Path, manifest: &str, packages: &[(&str, &str)]) {
    fs::write(dir.join("chisel.yaml"), manifest).unwrap();
    let slices = dir.join("slices");
    fs::create_dir_all(&slices).unwrap();
    for (name, content) in packages {
        fs::write(slices.join(format!("{name}.yaml")), content).unwrap();
    }
}
