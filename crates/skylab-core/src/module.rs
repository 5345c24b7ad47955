// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module entity, lazy exports, and the public require surface.
//!
//! A [`Module`] is a cheap handle: clones refer to the same underlying
//! module, and every module in a tree shares one cache and one host. A
//! module with a non-empty id registers itself in the shared cache at
//! construction time, before its content ever runs; that ordering is what
//! lets circular requires observe a live, partially populated exports
//! object instead of recursing forever.

use crate::cache::{CacheEntry, ModuleCache};
use crate::error::{ModuleError, Result};
use crate::host::ModuleHost;
use crate::path;
use crate::resolver;
use crate::value::{ObjectRef, Value};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A loader callable: populates a module's exports as a side effect when
/// invoked with the module's [`ModuleScope`].
pub type Loader = Arc<dyn Fn(&ModuleScope) -> Result<()> + Send + Sync>;

/// The content a module was constructed with, fixed for its lifetime.
#[derive(Clone, Default)]
pub enum ModuleContent {
    /// Executable body, run once on first exports access.
    Loader(Loader),
    /// Static exports, assigned verbatim on first access.
    Exports(Value),
    /// No backing content (anonymous roots and require anchors).
    #[default]
    None,
}

impl fmt::Debug for ModuleContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleContent::Loader(_) => f.write_str("Loader"),
            ModuleContent::Exports(value) => f.debug_tuple("Exports").field(value).finish(),
            ModuleContent::None => f.write_str("None"),
        }
    }
}

/// The exports slot state: the pending or memoized value, the content
/// still waiting to run, and whether the first access already happened.
#[derive(Debug)]
struct ExportsSlot {
    value: Value,
    content: ModuleContent,
    forced: bool,
}

impl ExportsSlot {
    fn pending(content: ModuleContent) -> Self {
        Self {
            value: Value::Object(ObjectRef::new()),
            content,
            forced: false,
        }
    }
}

/// The per-module state shared between all handles to one module.
///
/// Parent links deliberately point at `ModuleData`, not [`Module`]: the
/// tree (cache and host) must never be reachable from inside the cache,
/// or the whole structure would leak.
pub(crate) struct ModuleData {
    id: String,
    parent: Option<Arc<ModuleData>>,
    exports: RwLock<ExportsSlot>,
}

/// State shared across one module tree: the cache and the load host.
pub(crate) struct ModuleTree {
    pub(crate) cache: ModuleCache,
    pub(crate) host: Arc<dyn ModuleHost>,
}

static PROCESS_ROOT: OnceLock<Module> = OnceLock::new();

/// Handle to a module within its tree.
///
/// Cloning is cheap and clones compare equal; equality is identity, not
/// structural.
#[derive(Clone)]
pub struct Module {
    data: Arc<ModuleData>,
    tree: Arc<ModuleTree>,
}

impl Module {
    /// Creates the anonymous root of a fresh module tree.
    ///
    /// The root has the empty id, no parent, no content, and owns a new
    /// empty cache shared with every module later created in its tree.
    pub fn root(host: Arc<dyn ModuleHost>) -> Module {
        Module {
            data: Arc::new(ModuleData {
                id: String::new(),
                parent: None,
                exports: RwLock::new(ExportsSlot::pending(ModuleContent::None)),
            }),
            tree: Arc::new(ModuleTree {
                cache: ModuleCache::new(),
                host,
            }),
        }
    }

    /// Returns the process-wide root module, creating it on first call.
    ///
    /// The host passed by the first caller wins; later calls return the
    /// existing root and ignore their argument.
    pub fn process_root(host: Arc<dyn ModuleHost>) -> Module {
        PROCESS_ROOT.get_or_init(|| Module::root(host)).clone()
    }

    /// Returns the process-wide root module if one was already created.
    pub fn try_process_root() -> Option<Module> {
        PROCESS_ROOT.get().cloned()
    }

    /// Creates a module in `parent`'s tree.
    ///
    /// A non-empty id is registered in the shared cache immediately, so a
    /// circular require hitting this id mid-load finds this module instead
    /// of loading it again. An empty id creates an unregistered module
    /// that merely shares the parent's cache.
    pub fn new(id: impl Into<String>, parent: &Module, content: ModuleContent) -> Module {
        let id = id.into();
        let data = Arc::new(ModuleData {
            id,
            parent: Some(parent.data.clone()),
            exports: RwLock::new(ExportsSlot::pending(content)),
        });
        if !data.id.is_empty() {
            parent.tree.cache.register(&data.id, data.clone());
        }
        Module {
            data,
            tree: parent.tree.clone(),
        }
    }

    /// The module id: empty for an anonymous root, otherwise a
    /// `.`-anchored virtual path such as `./dist/app.js`.
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// The module that caused this one to be loaded, if any.
    pub fn parent(&self) -> Option<Module> {
        self.data.parent.as_ref().map(|data| Module {
            data: data.clone(),
            tree: self.tree.clone(),
        })
    }

    /// The module id with the leading anchor stripped (`/dist/app.js`).
    pub fn filename(&self) -> &str {
        self.data.id.strip_prefix('.').unwrap_or(&self.data.id)
    }

    /// The module's directory with the leading anchor stripped (`/dist`).
    pub fn dirname(&self) -> String {
        let dir = path::dirname(&self.data.id);
        match dir.strip_prefix('.') {
            Some(stripped) => stripped.to_string(),
            None => dir,
        }
    }

    /// Resolves `request` relative to this module and returns the target's
    /// exports, loading it first if this is the first reference anywhere in
    /// the tree.
    pub fn require(&self, request: &str) -> Result<Value> {
        resolver::lookup(self, request)?.exports()
    }

    /// Resolves `request` to a module id without forcing the target's
    /// exports.
    pub fn resolve(&self, request: &str) -> Result<String> {
        Ok(resolver::lookup(self, request)?.id().to_string())
    }

    /// Returns the module's exports, running its content on first access.
    ///
    /// The access flips the resolved flag before any content runs, and the
    /// exports lock is not held while a loader executes, so a loader may
    /// require other modules (or touch this module's own exports) freely.
    pub fn exports(&self) -> Result<Value> {
        let content = {
            let mut slot = self.data.exports.write();
            if slot.forced {
                return Ok(slot.value.clone());
            }
            slot.forced = true;
            std::mem::take(&mut slot.content)
        };
        match content {
            ModuleContent::None => {}
            ModuleContent::Exports(value) => {
                self.data.exports.write().value = value;
            }
            ModuleContent::Loader(body) => {
                let scope = ModuleScope::new(self);
                body(&scope)?;
            }
        }
        Ok(self.data.exports.read().value.clone())
    }

    /// Replaces the exports value.
    ///
    /// Before the first read this replaces the pending value that will
    /// eventually be returned; afterwards it replaces the memoized value.
    pub fn set_exports(&self, value: Value) {
        self.data.exports.write().value = value;
    }

    /// Pre-registers a virtual module with static exports under an
    /// absolute path, before anything requires it.
    ///
    /// Fails if `path` does not start with `/`, if the path was already
    /// defined, or if the path was already required and missed — the last
    /// case signals a load-order bug in the caller.
    pub fn define(&self, path: &str, exports: Value) -> Result<Module> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(ModuleError::InvalidPath(path.to_string()));
        }
        let id = format!(".{path}");
        match self.tree.cache.lookup(&id) {
            CacheEntry::Present(_) => Err(ModuleError::AlreadyDefined(path.to_string())),
            CacheEntry::Missing => Err(ModuleError::DefinedAfterRequire(path.to_string())),
            CacheEntry::Unattempted => {
                debug!("defined virtual module '{}'", id);
                Ok(Module::new(id, self, ModuleContent::Exports(exports)))
            }
        }
    }

    /// Returns a require operation bound to a fixed absolute path, for
    /// callers that need an anchored require without a live module.
    ///
    /// The anchor is not registered in the cache; it only gives the
    /// returned operation a resolution origin. Fails unless `path` starts
    /// with `/`.
    pub fn create_require(&self, path: &str) -> Result<Require> {
        if path.is_empty() || !path.starts_with('/') {
            return Err(ModuleError::InvalidPath(path.to_string()));
        }
        let anchor = Module {
            data: Arc::new(ModuleData {
                id: format!(".{path}"),
                parent: Some(self.data.clone()),
                exports: RwLock::new(ExportsSlot::pending(ModuleContent::None)),
            }),
            tree: self.tree.clone(),
        };
        Ok(Require { anchor })
    }

    /// Ids of all realized modules in this tree's cache, sorted.
    pub fn cached_ids(&self) -> Vec<String> {
        self.tree.cache.realized_ids()
    }

    pub(crate) fn tree(&self) -> &ModuleTree {
        &self.tree
    }

    /// Wraps cached module data in a handle belonging to this tree.
    pub(crate) fn from_data(&self, data: Arc<ModuleData>) -> Module {
        Module {
            data,
            tree: self.tree.clone(),
        }
    }
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.data.id)
            .finish_non_exhaustive()
    }
}

/// A require operation bound to a fixed virtual path.
#[derive(Debug, Clone)]
pub struct Require {
    anchor: Module,
}

impl Require {
    /// Resolves `request` against the bound path and returns its exports.
    pub fn require(&self, request: &str) -> Result<Value> {
        self.anchor.require(request)
    }

    /// Resolves `request` against the bound path to a module id.
    pub fn resolve(&self, request: &str) -> Result<String> {
        self.anchor.resolve(request)
    }
}

/// Context handed to a loader while it populates a module.
///
/// Bundles the module being loaded, a snapshot of its exports value as it
/// was when the loader was invoked, and the anchor-stripped filename and
/// dirname that loaders present as OS-like absolute paths.
pub struct ModuleScope {
    module: Module,
    exports: Value,
    filename: String,
    dirname: String,
}

impl ModuleScope {
    fn new(module: &Module) -> ModuleScope {
        ModuleScope {
            exports: module.data.exports.read().value.clone(),
            filename: module.filename().to_string(),
            dirname: module.dirname(),
            module: module.clone(),
        }
    }

    /// The module being loaded.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The exports value as it was when the loader was invoked.
    pub fn exports(&self) -> &Value {
        &self.exports
    }

    /// Requires `request` relative to the module being loaded.
    pub fn require(&self, request: &str) -> Result<Value> {
        self.module.require(request)
    }

    /// Replaces the module's exports value.
    pub fn set_exports(&self, value: Value) {
        self.module.set_exports(value);
    }

    /// The module path with the root anchor stripped (`/dist/app.js`).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The module directory with the root anchor stripped (`/dist`).
    pub fn dirname(&self) -> &str {
        &self.dirname
    }
}
