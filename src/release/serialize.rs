// src/release/serialize.rs

//! Projection of the model back into the declarative document shapes.
//!
//! Used to embed slice definitions in generated manifests and to render
//! path records in diagnostics. Serializing a Package and parsing the
//! output yields an equivalent package definition.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::release::parser::{Mode, RawArch, RawPackage, RawPath, RawSlice};
use crate::release::{Package, PathInfo, PathKind, PathUntil, Slice};

impl PathInfo {
    /// Project the path back to its declaration record. A copy without a
    /// source stays bare: the kind alone encodes "same source path".
    pub(crate) fn to_raw(&self) -> RawPath {
        let mut raw = RawPath {
            mode: Mode(self.mode),
            mutable: self.mutable,
            until: match self.until {
                PathUntil::None => String::new(),
                PathUntil::Mutate => "mutate".to_string(),
            },
            arch: RawArch {
                list: self.arch.clone(),
            },
            ..RawPath::default()
        };
        match &self.kind {
            PathKind::Dir => raw.dir = true,
            PathKind::Copy(source) => raw.copy = source.clone().unwrap_or_default(),
            PathKind::Text(body) => raw.text = Some(body.clone()),
            PathKind::Symlink(target) => raw.symlink = target.clone(),
            PathKind::Glob => {}
            PathKind::Generate(kind) => raw.generate = kind.label().to_string(),
        }
        raw
    }
}

impl Slice {
    pub(crate) fn to_raw(&self) -> RawSlice {
        RawSlice {
            essential: self.essential.iter().map(|key| key.to_string()).collect(),
            contents: self
                .contents
                .iter()
                .map(|(path, info)| (path.clone(), Some(info.to_raw())))
                .collect(),
            mutate: self.scripts.mutate.clone(),
        }
    }
}

impl Package {
    /// Project the package back to its definition document. Essentials
    /// come out at the slice level, where merging left them.
    pub(crate) fn to_raw(&self) -> RawPackage {
        RawPackage {
            package: self.name.clone(),
            archive: self.archive.clone(),
            essential: Vec::new(),
            slices: self
                .slices
                .iter()
                .map(|(name, slice)| (name.clone(), Some(slice.to_raw())))
                .collect(),
        }
    }
}

impl Serialize for PathInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl Serialize for Slice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl Serialize for Package {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl fmt::Display for RawPath {
    /// Compact single-line rendering, e.g. `{copy: /bin/ls, mode: 0755}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.dir {
            parts.push("make: true".to_string());
        }
        if !self.copy.is_empty() {
            parts.push(format!("copy: {}", self.copy));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text: {text:?}"));
        }
        if !self.symlink.is_empty() {
            parts.push(format!("symlink: {}", self.symlink));
        }
        if !self.mode.is_inherit() {
            parts.push(format!("mode: {}", self.mode));
        }
        if self.mutable {
            parts.push("mutable: true".to_string());
        }
        if !self.until.is_empty() {
            parts.push(format!("until: {}", self.until));
        }
        match self.arch.list.as_slice() {
            [] => {}
            [single] => parts.push(format!("arch: {single}")),
            many => parts.push(format!("arch: [{}]", many.join(", "))),
        }
        if !self.generate.is_empty() {
            parts.push(format!("generate: {}", self.generate));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::parser::parse_package;

    const PACKAGE_YAML: &str = "\
package: mypkg
archive: ubuntu
slices:
    bins:
        essential:
            - mypkg_config
        contents:
            /usr/bin/hello: {copy: /usr/bin/hello-real, mode: \"0755\"}
            /usr/bin/*-extra: {}
            /usr/share/hello/: {make: true}
    config:
        contents:
            /etc/hello.conf: {text: \"hi\\n\", mutable: true}
            /etc/hello.link: {symlink: /etc/hello.conf}
            /var/lib/hello/**: {generate: manifest}
        mutate: |
            content.list(\"/etc\")
";

    #[test]
    fn test_round_trip() {
        let pkg = parse_package("mypkg", "slices/mypkg.yaml", PACKAGE_YAML.as_bytes()).unwrap();
        let text = serde_yaml::to_string(&pkg).unwrap();
        let reparsed = parse_package("mypkg", "slices/mypkg.yaml", text.as_bytes()).unwrap();
        assert_eq!(pkg, reparsed);
    }

    #[test]
    fn test_self_copy_stays_bare() {
        let yaml = "\
package: mypkg
slices:
    bins:
        contents:
            /usr/bin/hello: {copy: /usr/bin/hello}
";
        let pkg = parse_package("mypkg", "slices/mypkg.yaml", yaml.as_bytes()).unwrap();
        let raw = pkg.slices["bins"].contents["/usr/bin/hello"].to_raw();
        assert!(raw.copy.is_empty());
        assert_eq!(raw.to_string(), "{}");
    }

    #[test]
    fn test_display_compact() {
        let pkg = parse_package("mypkg", "slices/mypkg.yaml", PACKAGE_YAML.as_bytes()).unwrap();
        let raw = pkg.slices["bins"].contents["/usr/bin/hello"].to_raw();
        assert_eq!(raw.to_string(), "{copy: /usr/bin/hello-real, mode: 0755}");

        let raw = pkg.slices["config"].contents["/etc/hello.conf"].to_raw();
        assert_eq!(raw.to_string(), "{text: \"hi\\n\", mutable: true}");

        let raw = pkg.slices["config"].contents["/var/lib/hello/**"].to_raw();
        assert_eq!(raw.to_string(), "{generate: manifest}");

        let raw = pkg.slices["bins"].contents["/usr/share/hello/"].to_raw();
        assert_eq!(raw.to_string(), "{make: true}");
    }

    #[test]
    fn test_mode_rendering() {
        assert_eq!(Mode(0o755).to_string(), "0755");
        assert_eq!(Mode(0o644).to_string(), "0644");
        assert_eq!(Mode(0).to_string(), "00");
    }
}
