// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path utilities for the virtual module id namespace.
//!
//! Module ids are `/`-delimited strings anchored with a leading `.`
//! (for example `./dist/app.js`); the anonymous root has the empty id.
//! These helpers are pure string algebra over that namespace and never
//! consult a real filesystem.

/// Returns the directory portion of a module id.
///
/// The empty id, and ids missing the `.` anchor, map to the root
/// directory marker `"./"`.
pub fn dirname(id: &str) -> String {
    if id.is_empty() || !id.starts_with('.') {
        return "./".to_string();
    }
    match id.rfind('/') {
        Some(pos) => id[..pos].to_string(),
        None => "./".to_string(),
    }
}

/// Normalizes `.`, `..`, and empty segments in a slash-delimited path.
///
/// A `.` segment is kept only while the segment stack is empty (the root
/// anchor position) and dropped everywhere else; empty segments from
/// repeated slashes are dropped. A `..` segment pops the stack; popping
/// past the anchor means the path escaped above the virtual root, and the
/// empty string is returned. Callers treat an empty result as a failed
/// candidate, never as an error.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" => continue,
            "." => {
                if segments.is_empty() {
                    segments.push(".");
                }
            }
            ".." => match segments.pop() {
                None | Some(".") => return String::new(),
                Some(_) => {}
            },
            seg => segments.push(seg),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirname() {
        assert_eq!(dirname(""), "./");
        assert_eq!(dirname("foo"), "./");
        assert_eq!(dirname("./app.js"), ".");
        assert_eq!(dirname("./foo/bar.js"), "./foo");
        assert_eq!(dirname("./a/b/c.json"), "./a/b");
        assert_eq!(dirname("."), "./");
    }

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("a/./b/../c"), "a/c");
        assert_eq!(normalize("./foo/bar"), "./foo/bar");
        assert_eq!(normalize(".//./foo"), "./foo");
        assert_eq!(normalize("./foo/../bar"), "./bar");
        assert_eq!(normalize("a//b///c"), "a/b/c");
    }

    #[test]
    fn test_normalize_escape() {
        assert_eq!(normalize("../a"), "");
        assert_eq!(normalize(".."), "");
        assert_eq!(normalize("./.."), "");
        assert_eq!(normalize("./foo/../../bar"), "");
    }

    #[test]
    fn test_normalize_anchor() {
        assert_eq!(normalize("."), ".");
        assert_eq!(normalize("./"), ".");
        // The anchor slot reopens once `..` empties the stack.
        assert_eq!(normalize("a/../."), ".");
        assert_eq!(normalize("a/../b"), "b");
    }

    #[test]
    fn test_normalize_idempotent() {
        for path in ["a/./b/../c", "./foo//bar", "../a", "./x/y/z"] {
            let once = normalize(path);
            assert_eq!(normalize(&once), once);
        }
    }
}
