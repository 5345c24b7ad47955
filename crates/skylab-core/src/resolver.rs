// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution.
//!
//! Two entry points share one candidate-trial routine: relative requests
//! (leading `.`) resolve against the requester's directory, bare requests
//! walk the ancestor `node_modules` chain. Package descriptors are never
//! themselves a resolution result; their `main` field re-enters the trial
//! with the file postfix list, and its absence falls through to the index
//! postfixes at the same level.

use crate::cache::CacheEntry;
use crate::error::{ModuleError, Result};
use crate::module::{Module, ModuleContent};
use crate::path;
use tracing::{debug, trace, warn};

/// Postfixes tried for file-like requests, in order.
const FILE_POSTFIXES: &[&str] = &["", ".js", ".json", "/package.json", "/index.js", "/index.json"];

/// Postfixes tried for folder requests (trailing `/`), in order.
const FOLDER_POSTFIXES: &[&str] = &["/package.json", "/index.js", "/index.json"];

/// The package directory segment walked by bare resolution.
const PACKAGE_DIR: &str = "node_modules";

/// Redirect budget for chained `main` fields. A descriptor whose `main`
/// points back at its own directory would otherwise recurse forever.
const MAX_MAIN_HOPS: usize = 16;

/// Resolves `request` from `requester` to a realized module.
pub(crate) fn lookup(requester: &Module, request: &str) -> Result<Module> {
    if request.starts_with('.') {
        lookup_relative(requester, request)
    } else {
        lookup_bare(requester, request)
    }
}

/// Relative resolution: normalize against the requester's directory, then
/// run the candidate trial with the postfix list the request selects.
fn lookup_relative(requester: &Module, request: &str) -> Result<Module> {
    let base = path::dirname(requester.id());
    let candidate = path::normalize(&format!("{base}/{request}"));
    trace!("resolving '{}' from '{}' as '{}'", request, requester.id(), candidate);
    if candidate.is_empty() {
        // Escaped above the virtual root.
        return Err(ModuleError::not_found(request));
    }
    let postfixes = if request.ends_with('/') {
        FOLDER_POSTFIXES
    } else {
        FILE_POSTFIXES
    };
    match try_candidates(requester, &candidate, postfixes, 0)? {
        Some(module) => Ok(module),
        None => Err(ModuleError::not_found(request)),
    }
}

/// Bare resolution: a realized cache entry under the literal request wins
/// outright (pre-registered virtual modules live in the same namespace as
/// path-qualified ones); otherwise walk the ancestor directory chain
/// trying `node_modules/<request>` at each level.
fn lookup_bare(requester: &Module, request: &str) -> Result<Module> {
    if let CacheEntry::Present(data) = requester.tree().cache.lookup(request) {
        trace!("'{}' served from the literal cache entry", request);
        return Ok(requester.from_data(data));
    }

    let mut dir = path::normalize(&path::dirname(requester.id()));
    while !dir.is_empty() {
        let candidate = format!("{dir}/{PACKAGE_DIR}/{request}");
        if let Some(module) = try_candidates(requester, &candidate, FILE_POSTFIXES, 0)? {
            return Ok(module);
        }
        dir = path::normalize(&format!("{dir}/.."));
        // A node_modules directory is never itself a package root; skip
        // past it so node_modules/node_modules is never attempted.
        if dir == PACKAGE_DIR || dir.ends_with(&format!("/{PACKAGE_DIR}")) {
            dir = path::normalize(&format!("{dir}/.."));
        }
    }
    Err(ModuleError::not_found(request))
}

/// Tries `path + postfix` for each postfix in order, returning the first
/// realization. The `/package.json` postfix is indirect: the descriptor's
/// `main` field (when present) re-enters the trial with the file postfix
/// list; without one, the descriptor is a non-match and the remaining
/// postfixes apply.
fn try_candidates(
    requester: &Module,
    path: &str,
    postfixes: &[&str],
    hops: usize,
) -> Result<Option<Module>> {
    for postfix in postfixes {
        let url = format!("{path}{postfix}");
        if *postfix == "/package.json" {
            let Some(descriptor) = realize(requester, &url)? else {
                continue;
            };
            let main = descriptor
                .exports()?
                .as_object()
                .and_then(|obj| obj.get("main"))
                .and_then(|value| value.as_str().map(str::to_string));
            let Some(main) = main else {
                continue;
            };
            if hops >= MAX_MAIN_HOPS {
                warn!("'{}' exceeds the main-field redirect budget", url);
                continue;
            }
            let target = path::normalize(&format!("{path}/{main}"));
            if target.is_empty() {
                continue;
            }
            trace!("'{}' redirects via main to '{}'", url, target);
            if let Some(module) = try_candidates(requester, &target, FILE_POSTFIXES, hops + 1)? {
                return Ok(Some(module));
            }
            continue;
        }
        if let Some(module) = realize(requester, &url)? {
            return Ok(Some(module));
        }
    }
    Ok(None)
}

/// Cache-backed realization of a single url.
///
/// A cached value is returned verbatim, negative entries included. A miss
/// asks the host: `.json` urls are fetched and parsed into static exports,
/// anything else is compiled into a loader. A host that has neither marks
/// the url negative for the lifetime of the cache.
fn realize(requester: &Module, url: &str) -> Result<Option<Module>> {
    let tree = requester.tree();
    match tree.cache.lookup(url) {
        CacheEntry::Present(data) => return Ok(Some(requester.from_data(data))),
        CacheEntry::Missing => return Ok(None),
        CacheEntry::Unattempted => {}
    }
    if url.ends_with(".json") {
        if let Some(data) = tree.host.fetch_json(url)? {
            debug!("realized JSON module '{}'", url);
            return Ok(Some(Module::new(url, requester, ModuleContent::Exports(data))));
        }
    } else if let Some(loader) = tree.host.compile(url)? {
        debug!("realized module '{}'", url);
        return Ok(Some(Module::new(url, requester, ModuleContent::Loader(loader))));
    }
    trace!("negative caching '{}'", url);
    tree.cache.mark_missing(url);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BundleHost;
    use crate::value::Value;
    use std::sync::Arc;

    fn root_with(setup: impl FnOnce(&BundleHost)) -> Module {
        let host = BundleHost::new();
        setup(&host);
        Module::root(Arc::new(host))
    }

    #[test]
    fn test_relative_extension_postfix() {
        let root = root_with(|host| {
            host.add_unit("./foo.js", |scope| {
                scope.set_exports(Value::String("foo".to_string()));
                Ok(())
            });
        });
        let module = lookup(&root, "./foo").unwrap();
        assert_eq!(module.id(), "./foo.js");
    }

    #[test]
    fn test_relative_escape_is_not_found() {
        let root = root_with(|_| {});
        let err = lookup(&root, "../outside").unwrap_err();
        assert_eq!(err.to_string(), "Cannot find module '../outside'");
    }

    #[test]
    fn test_folder_postfixes_skip_file_candidates() {
        let root = root_with(|host| {
            host.add_unit("./dir.js", |_| Ok(()));
            host.add_unit("./dir/index.js", |scope| {
                scope.set_exports(Value::String("index".to_string()));
                Ok(())
            });
        });
        // A trailing slash selects the folder list, so ./dir.js is never a
        // candidate.
        assert_eq!(lookup(&root, "./dir/").unwrap().id(), "./dir/index.js");
        assert_eq!(lookup(&root, "./dir").unwrap().id(), "./dir.js");
    }

    #[test]
    fn test_package_main_is_re_resolved() {
        let root = root_with(|host| {
            host.add_text("./pkg/package.json", r#"{"main": "./lib/entry"}"#);
            host.add_unit("./pkg/lib/entry.js", |_| Ok(()));
        });
        assert_eq!(lookup(&root, "./pkg").unwrap().id(), "./pkg/lib/entry.js");
    }

    #[test]
    fn test_package_without_main_falls_through_to_index() {
        let root = root_with(|host| {
            host.add_text("./pkg/package.json", r#"{"name": "pkg"}"#);
            host.add_text("./pkg/index.json", r#"{"from": "index"}"#);
        });
        assert_eq!(lookup(&root, "./pkg").unwrap().id(), "./pkg/index.json");
    }

    #[test]
    fn test_main_redirect_cycle_is_bounded() {
        let root = root_with(|host| {
            host.add_text("./loop/package.json", r#"{"main": "."}"#);
        });
        let err = lookup(&root, "./loop").unwrap_err();
        assert_eq!(err.to_string(), "Cannot find module './loop'");
    }

    #[test]
    fn test_bare_walks_ancestors() {
        let root = root_with(|host| {
            host.add_unit("./node_modules/leftpad/index.js", |scope| {
                scope.set_exports(Value::String("leftpad".to_string()));
                Ok(())
            });
        });
        let requester = Module::new("./app/deep/mod.js", &root, ModuleContent::None);
        let module = lookup(&requester, "leftpad").unwrap();
        assert_eq!(module.id(), "./node_modules/leftpad/index.js");
    }

    #[test]
    fn test_bare_literal_cache_short_circuit() {
        let root = root_with(|_| {});
        let widgets = Module::new(
            "widgets",
            &root,
            ModuleContent::Exports(Value::String("native".to_string())),
        );
        let found = lookup(&root, "widgets").unwrap();
        assert_eq!(found, widgets);
    }

    #[test]
    fn test_bare_miss_message() {
        let root = root_with(|_| {});
        let err = lookup(&root, "ghost").unwrap_err();
        assert_eq!(err.to_string(), "Cannot find module 'ghost'");
    }

    #[test]
    fn test_negative_entry_is_returned_verbatim() {
        let root = root_with(|host| {
            host.add_unit("./late.js", |_| Ok(()));
        });
        root.tree().cache.mark_missing("./late.js");
        // The host has the unit, but the negative entry wins.
        assert!(lookup(&root, "./late").is_err());
    }
}
