// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host load primitive and the in-memory bundle host.
//!
//! The engine performs no I/O of its own: every byte of source fetching
//! and all compilation is delegated to a [`ModuleHost`] injected at tree
//! construction. Absence and failure are distinct: `None` means "no such
//! resource", while unparseable source or malformed JSON is a loud error.

use crate::error::{ModuleError, Result};
use crate::module::{Loader, ModuleScope};
use crate::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Source-loading primitive injected into a module tree.
pub trait ModuleHost: Send + Sync {
    /// Fetches raw text at `url`, or `None` if no such resource exists.
    fn fetch_text(&self, url: &str) -> Option<String>;

    /// Compiles the unit at `url` into a loader, or `None` if no such
    /// resource exists. Fails if the resource exists but cannot be
    /// compiled into an executable unit.
    fn compile(&self, url: &str) -> Result<Option<Loader>>;

    /// Fetches and parses JSON at `url`, or `None` if no such resource
    /// exists. Fails on malformed JSON.
    fn fetch_json(&self, url: &str) -> Result<Option<Value>> {
        match self.fetch_text(url) {
            None => Ok(None),
            Some(text) => {
                let json: serde_json::Value =
                    serde_json::from_str(&text).map_err(|err| ModuleError::json(url, err))?;
                Ok(Some(Value::from_json(&json)))
            }
        }
    }
}

/// An in-memory host serving a fixed bundle of units.
///
/// Text entries back [`ModuleHost::fetch_text`] (and therefore JSON
/// modules); loader entries back [`ModuleHost::compile`]. Bundles are
/// populated up front, before being handed to a module tree.
#[derive(Default)]
pub struct BundleHost {
    texts: RwLock<FxHashMap<String, String>>,
    units: RwLock<FxHashMap<String, Loader>>,
}

impl BundleHost {
    /// Creates an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers raw text at `url`; JSON payloads go here too.
    pub fn add_text(&self, url: impl Into<String>, text: impl Into<String>) {
        self.texts.write().insert(url.into(), text.into());
    }

    /// Registers an executable unit at `url`.
    pub fn add_unit(
        &self,
        url: impl Into<String>,
        body: impl Fn(&ModuleScope) -> Result<()> + Send + Sync + 'static,
    ) {
        self.units.write().insert(url.into(), Arc::new(body));
    }
}

impl ModuleHost for BundleHost {
    fn fetch_text(&self, url: &str) -> Option<String> {
        self.texts.read().get(url).cloned()
    }

    fn compile(&self, url: &str) -> Result<Option<Loader>> {
        if let Some(unit) = self.units.read().get(url) {
            return Ok(Some(unit.clone()));
        }
        if self.texts.read().contains_key(url) {
            // Text without an executable unit is a parse failure, not absence.
            return Err(ModuleError::compile(
                url,
                "no executable unit registered for this text",
            ));
        }
        Ok(None)
    }
}
