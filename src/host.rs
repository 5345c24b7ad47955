// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Filesystem-backed module host.
//!
//! Mounts a real directory as the virtual module tree: the id `./a/b.js`
//! maps onto `<mount>/a/b.js`. Compiled units scan their source for
//! `require("...")` calls and load each dependency in source order, so the
//! CLI exercises the engine's real lazy/circular semantics over a
//! directory without embedding a script engine.

use regex::Regex;
use skylab_core::{
    ArrayRef, Loader, ModuleError, ModuleHost, ModuleScope, ObjectRef, Result, Value,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

/// A [`ModuleHost`] serving files under a mounted directory.
pub struct FsHost {
    mount: PathBuf,
}

impl FsHost {
    /// Mounts `dir` as the virtual root.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { mount: dir.into() }
    }

    /// Maps a virtual url onto a path under the mount.
    ///
    /// Urls reaching a host are already normalized by the engine, so a
    /// url either is the root anchor or starts with `./`; anything else
    /// has no filesystem counterpart.
    fn fs_path(&self, url: &str) -> Option<PathBuf> {
        match url.strip_prefix("./") {
            Some(rel) => Some(self.mount.join(rel)),
            None if url == "." => Some(self.mount.clone()),
            None => None,
        }
    }

    /// Extracts require requests from a source text, in source order.
    fn scan_requests(source: &str) -> Vec<String> {
        REQUIRE_RE
            .captures_iter(source)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

impl ModuleHost for FsHost {
    fn fetch_text(&self, url: &str) -> Option<String> {
        let path = self.fs_path(url)?;
        if !path.is_file() {
            return None;
        }
        std::fs::read_to_string(&path).ok()
    }

    fn compile(&self, url: &str) -> Result<Option<Loader>> {
        let Some(path) = self.fs_path(url) else {
            return Ok(None);
        };
        if !path.is_file() {
            return Ok(None);
        }
        let source = std::fs::read_to_string(&path)
            .map_err(|err| ModuleError::compile(url, err.to_string()))?;
        let requests = Self::scan_requests(&source);
        debug!("compiled '{}' with {} dependencies", url, requests.len());

        Ok(Some(Arc::new(move |scope: &ModuleScope| {
            let dependencies = ArrayRef::new();
            for request in &requests {
                scope.require(request)?;
                dependencies.push(Value::String(scope.module().resolve(request)?));
            }
            let exports = ObjectRef::new();
            exports.set("filename", Value::String(scope.filename().to_string()));
            exports.set("dependencies", Value::Array(dependencies));
            scope.set_exports(Value::Object(exports));
            Ok(())
        })))
    }
}

/// Maps a virtual id back onto its path under the mount, for display.
pub fn display_path(mount: &Path, id: &str) -> String {
    match id.strip_prefix("./") {
        Some(rel) => mount.join(rel).display().to_string(),
        None => id.to_string(),
    }
}
