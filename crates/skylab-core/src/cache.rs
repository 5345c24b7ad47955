// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Three-state module cache, shared by reference across a module tree.
//!
//! Each resolved path is in one of three states: never attempted,
//! attempted and definitively missing, or realized. Negative entries are
//! never retried for the lifetime of the cache — only an exact path that
//! was itself attempted and found missing is negative, so requiring it
//! again after a later `define` under a sibling path still works.

use crate::module::ModuleData;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

enum Slot {
    Missing,
    Present(Arc<ModuleData>),
}

/// Cache lookup result for a candidate path.
pub(crate) enum CacheEntry {
    /// Never attempted; resolution may try the host.
    Unattempted,
    /// Attempted and definitively not found; never retried.
    Missing,
    /// A realized module.
    Present(Arc<ModuleData>),
}

/// Mapping from resolved path to realized module or negative marker.
pub(crate) struct ModuleCache {
    entries: RwLock<FxHashMap<String, Slot>>,
}

impl ModuleCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    pub(crate) fn lookup(&self, id: &str) -> CacheEntry {
        match self.entries.read().get(id) {
            None => CacheEntry::Unattempted,
            Some(Slot::Missing) => CacheEntry::Missing,
            Some(Slot::Present(data)) => CacheEntry::Present(data.clone()),
        }
    }

    pub(crate) fn register(&self, id: &str, data: Arc<ModuleData>) {
        self.entries
            .write()
            .insert(id.to_string(), Slot::Present(data));
    }

    pub(crate) fn mark_missing(&self, id: &str) {
        self.entries.write().insert(id.to_string(), Slot::Missing);
    }

    /// Ids of realized modules, sorted for stable iteration.
    pub(crate) fn realized_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Present(_)))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}
