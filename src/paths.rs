// src/paths.rs

//! Lexical path handling.
//!
//! Content paths in slice definitions are plain strings: absolute, clean,
//! and possibly carrying wildcards. Nothing here touches a filesystem;
//! cleaning and matching are purely lexical so that validation gives the
//! same answer on every platform.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Lexically clean a slash-separated path: collapse duplicate slashes and
/// resolve `.` and `..` elements. The result never has a trailing slash
/// except for the root itself, and an empty input cleans to `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let bytes = path.as_bytes();
    let n = bytes.len();
    let mut out = String::with_capacity(n);
    let mut r = 0;
    let mut dotdot = 0;
    if rooted {
        out.push('/');
        r = 1;
        dotdot = 1;
    }
    while r < n {
        if bytes[r] == b'/' {
            r += 1;
        } else if bytes[r] == b'.' && (r + 1 == n || bytes[r + 1] == b'/') {
            r += 1;
        } else if bytes[r] == b'.'
            && r + 1 < n
            && bytes[r + 1] == b'.'
            && (r + 2 == n || bytes[r + 2] == b'/')
        {
            r += 2;
            if out.len() > dotdot {
                let mut w = out.len() - 1;
                while w > dotdot && out.as_bytes()[w] != b'/' {
                    w -= 1;
                }
                out.truncate(w);
            } else if !rooted {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str("..");
                dotdot = out.len();
            }
        } else {
            if (rooted && out.len() != 1) || (!rooted && !out.is_empty()) {
                out.push('/');
            }
            let start = r;
            while r < n && bytes[r] != b'/' {
                r += 1;
            }
            out.push_str(&path[start..r]);
        }
    }
    if out.is_empty() {
        return ".".to_string();
    }
    out
}

/// Check the shape of a generate path and return its directory prefix,
/// trailing slash included. The path must end in `/**` and the prefix may
/// not contain any other wildcard characters.
pub fn validate_generate_path(path: &str) -> Result<&str> {
    if !path.ends_with("/**") {
        return Err(Error::PathOption(format!("{path} does not end with /**")));
    }
    let dir = &path[..path.len() - 2];
    if dir.contains(['*', '?']) {
        return Err(Error::PathOption(format!(
            "{path} contains wildcard characters in addition to trailing **"
        )));
    }
    Ok(dir)
}

/// One unit of a compiled path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pat {
    /// A literal character.
    Lit(char),
    /// `?`: exactly one character within a segment.
    One,
    /// `*`: any run of characters within a segment.
    Run,
    /// `**`: any run of characters, crossing segments.
    Tree,
}

fn compile(pattern: &str) -> Vec<Pat> {
    let mut pats = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pats.push(Pat::Tree);
            }
            '*' => pats.push(Pat::Run),
            '?' => pats.push(Pat::One),
            c => pats.push(Pat::Lit(c)),
        }
    }
    pats
}

/// Whether the token can stand in for a character inside one segment.
fn in_segment(p: Pat) -> bool {
    !matches!(p, Pat::Lit('/'))
}

/// Whether two path patterns can match a common path.
///
/// Both operands may carry wildcards: `*` and `?` stay within one path
/// segment, `**` crosses segments. Two patterns overlap when some
/// concrete path is matched by both.
pub fn overlap(a: &str, b: &str) -> bool {
    let a = compile(a);
    let b = compile(b);
    let mut dead = HashSet::new();
    step(&a, &b, 0, 0, &mut dead)
}

fn step(a: &[Pat], b: &[Pat], i: usize, j: usize, dead: &mut HashSet<(usize, usize)>) -> bool {
    if i == a.len() && j == b.len() {
        return true;
    }
    if dead.contains(&(i, j)) {
        return false;
    }
    let found = advance(a, b, i, j, dead);
    if !found {
        dead.insert((i, j));
    }
    found
}

fn advance(a: &[Pat], b: &[Pat], i: usize, j: usize, dead: &mut HashSet<(usize, usize)>) -> bool {
    if i < a.len() && a[i] == Pat::Tree {
        return step(a, b, i + 1, j, dead) || (j < b.len() && step(a, b, i, j + 1, dead));
    }
    if j < b.len() && b[j] == Pat::Tree {
        return step(a, b, i, j + 1, dead) || (i < a.len() && step(a, b, i + 1, j, dead));
    }
    if i < a.len() && a[i] == Pat::Run {
        return step(a, b, i + 1, j, dead)
            || (j < b.len() && in_segment(b[j]) && step(a, b, i, j + 1, dead));
    }
    if j < b.len() && b[j] == Pat::Run {
        return step(a, b, i, j + 1, dead)
            || (i < a.len() && in_segment(a[i]) && step(a, b, i + 1, j, dead));
    }
    if i == a.len() || j == b.len() {
        return false;
    }
    match (a[i], b[j]) {
        (Pat::One, other) | (other, Pat::One) => {
            in_segment(other) && step(a, b, i + 1, j + 1, dead)
        }
        (Pat::Lit(x), Pat::Lit(y)) => x == y && step(a, b, i + 1, j + 1, dead),
        // Run and Tree were consumed above.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(clean(""), ".");
        assert_eq!(clean("/"), "/");
        assert_eq!(clean("//"), "/");
        assert_eq!(clean("/etc/hosts"), "/etc/hosts");
        assert_eq!(clean("/etc/hosts/"), "/etc/hosts");
        assert_eq!(clean("/etc//hosts"), "/etc/hosts");
        assert_eq!(clean("/etc/./hosts"), "/etc/hosts");
        assert_eq!(clean("/etc/../etc/hosts"), "/etc/hosts");
        assert_eq!(clean("/a/b/../.."), "/");
        assert_eq!(clean("/a/b/../../.."), "/");
        assert_eq!(clean("/.."), "/");
        assert_eq!(clean("a/c"), "a/c");
        assert_eq!(clean("a//c"), "a/c");
        assert_eq!(clean("a/../c"), "c");
        assert_eq!(clean("../a"), "../a");
        assert_eq!(clean("../../a/b"), "../../a/b");
        assert_eq!(clean("./a"), "a");
        assert_eq!(clean("."), ".");
    }

    #[test]
    fn test_validate_generate_path() {
        assert_eq!(validate_generate_path("/var/lib/x/**").unwrap(), "/var/lib/x/");
        assert_eq!(validate_generate_path("/**").unwrap(), "/");

        let err = validate_generate_path("/var/lib/x").unwrap_err();
        assert_eq!(err.to_string(), "/var/lib/x does not end with /**");
        let err = validate_generate_path("/var/lib/x/*").unwrap_err();
        assert_eq!(err.to_string(), "/var/lib/x/* does not end with /**");
        let err = validate_generate_path("/var/lib/x**").unwrap_err();
        assert_eq!(err.to_string(), "/var/lib/x** does not end with /**");
        let err = validate_generate_path("/var/*/x/**").unwrap_err();
        assert_eq!(
            err.to_string(),
            "/var/*/x/** contains wildcard characters in addition to trailing **"
        );
        let err = validate_generate_path("/var/li?/x/**").unwrap_err();
        assert_eq!(
            err.to_string(),
            "/var/li?/x/** contains wildcard characters in addition to trailing **"
        );
    }

    #[test]
    fn test_overlap_literal() {
        assert!(overlap("/etc/hosts", "/etc/hosts"));
        assert!(!overlap("/etc/hosts", "/etc/host"));
        assert!(!overlap("/etc/hosts", "/etc/hostsx"));
    }

    #[test]
    fn test_overlap_single_segment() {
        assert!(overlap("/usr/bin/*", "/usr/bin/ls"));
        assert!(overlap("/usr/bin/l?", "/usr/bin/ls"));
        assert!(overlap("/usr/bin/*.so", "/usr/bin/libx.so"));
        assert!(!overlap("/usr/bin/*", "/usr/bin/sub/ls"));
        assert!(!overlap("/usr/bin/?", "/usr/bin/"));
        assert!(!overlap("/usr/*", "/var/log"));
    }

    #[test]
    fn test_overlap_tree() {
        assert!(overlap("/usr/**", "/usr/bin/ls"));
        assert!(overlap("/usr/**", "/usr/share/doc/x/copyright"));
        assert!(overlap("/**", "/anything/at/all"));
        assert!(!overlap("/usr/**", "/var/log/syslog"));
    }

    #[test]
    fn test_overlap_both_wild() {
        assert!(overlap("/usr/bin/*", "/usr/*/ls"));
        assert!(overlap("/usr/bin/a*", "/usr/bin/*b"));
        assert!(overlap("/a/**", "/a/b/*"));
        assert!(overlap("/**", "/etc/**"));
        assert!(!overlap("/usr/bin/*", "/var/*"));
        assert!(!overlap("/a/*/c", "/a/b/d"));
    }
}
