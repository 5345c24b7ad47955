// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end tests driving the full engine through an in-memory host.

use parking_lot::Mutex;
use skylab_core::{BundleHost, Loader, Module, ModuleContent, ModuleHost, Result, Value};
use std::sync::Arc;

/// Wraps a [`BundleHost`] and records every url the engine asks about.
struct CountingHost {
    inner: BundleHost,
    fetches: Mutex<Vec<String>>,
    compiles: Mutex<Vec<String>>,
}

impl CountingHost {
    fn new(setup: impl FnOnce(&BundleHost)) -> Self {
        let inner = BundleHost::new();
        setup(&inner);
        Self {
            inner,
            fetches: Mutex::new(Vec::new()),
            compiles: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> Vec<String> {
        let mut all = self.fetches.lock().clone();
        all.extend(self.compiles.lock().iter().cloned());
        all
    }
}

impl ModuleHost for CountingHost {
    fn fetch_text(&self, url: &str) -> Option<String> {
        self.fetches.lock().push(url.to_string());
        self.inner.fetch_text(url)
    }

    fn compile(&self, url: &str) -> Result<Option<Loader>> {
        self.compiles.lock().push(url.to_string());
        self.inner.compile(url)
    }
}

fn tree_with(setup: impl FnOnce(&BundleHost)) -> (Module, Arc<CountingHost>) {
    let host = Arc::new(CountingHost::new(setup));
    (Module::root(host.clone()), host)
}

#[test]
fn test_relative_ids_are_normalized_and_anchored() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./lib/util.js", |_| Ok(()));
    });
    let id = root.resolve("./lib/../lib/./util").unwrap();
    assert_eq!(id, "./lib/util.js");
    assert!(id.starts_with("./"));
}

#[test]
fn test_require_from_sibling_directory() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./baz.js", |scope| {
            scope.set_exports(Value::String("baz".to_string()));
            Ok(())
        });
    });
    let requester = Module::new("./foo/bar.js", &root, ModuleContent::None);
    assert_eq!(requester.resolve("../baz").unwrap(), "./baz.js");
}

#[test]
fn test_exports_identity_and_at_most_once_loading() {
    let (root, host) = tree_with(|host| {
        host.add_unit("./shared.js", |scope| {
            let obj = scope.exports().as_object().unwrap().clone();
            obj.set("loaded", Value::Boolean(true));
            Ok(())
        });
    });

    let first = root.require("./shared").unwrap();
    let compiles_after_first = host.compiles.lock().len();
    let second = root.require("./shared").unwrap();

    let (a, b) = (first.as_object().unwrap(), second.as_object().unwrap());
    assert!(a.ptr_eq(b));
    // Resolution of the second require is pure cache traffic.
    assert_eq!(host.compiles.lock().len(), compiles_after_first);
    assert_eq!(
        host.compiles
            .lock()
            .iter()
            .filter(|url| *url == "./shared.js")
            .count(),
        1
    );
}

#[test]
fn test_circular_requires_observe_partial_exports() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./a.js", |scope| {
            let exports = scope.exports().as_object().unwrap().clone();
            exports.set("x", Value::Number(1.0));
            let b = scope.require("./b")?;
            exports.set("echoed", b.as_object().unwrap().get("saw_x").unwrap());
            Ok(())
        });
        host.add_unit("./b.js", |scope| {
            // A is still mid-load here; we see its live exports object.
            let a = scope.require("./a")?;
            let x = a.as_object().unwrap().get("x").unwrap();
            assert_eq!(x, Value::Number(1.0));
            scope.exports().as_object().unwrap().set("saw_x", x);
            Ok(())
        });
    });

    let a = root.require("./a").unwrap();
    let a = a.as_object().unwrap();
    assert_eq!(a.get("x"), Some(Value::Number(1.0)));
    assert_eq!(a.get("echoed"), Some(Value::Number(1.0)));
}

#[test]
fn test_circular_partner_shares_the_same_object() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./ring.js", |scope| {
            let through = scope.require("./mirror")?;
            // The cycle must hand back our own exports object, not a copy.
            assert!(through
                .as_object()
                .unwrap()
                .ptr_eq(scope.exports().as_object().unwrap()));
            Ok(())
        });
        host.add_unit("./mirror.js", |scope| {
            let ring = scope.require("./ring")?;
            scope.set_exports(ring);
            Ok(())
        });
    });
    root.require("./ring").unwrap();
}

#[test]
fn test_nested_node_modules_is_never_attempted() {
    let (root, host) = tree_with(|_| {});
    let inner = Module::new("./node_modules/a/lib/x.js", &root, ModuleContent::None);
    assert!(inner.require("missing-dep").is_err());
    for url in host.attempts() {
        assert!(
            !url.contains("node_modules/node_modules"),
            "attempted nested package dir: {url}"
        );
    }
}

#[test]
fn test_bare_resolution_from_deep_module() {
    let (root, _) = tree_with(|host| {
        host.add_text(
            "./node_modules/config/package.json",
            r#"{"main": "./src/index"}"#,
        );
        host.add_unit("./node_modules/config/src/index.js", |scope| {
            scope.set_exports(Value::String("config".to_string()));
            Ok(())
        });
    });
    let requester = Module::new("./app/routes/users.js", &root, ModuleContent::None);
    assert_eq!(
        requester.require("config").unwrap(),
        Value::String("config".to_string())
    );
    assert_eq!(
        requester.resolve("config").unwrap(),
        "./node_modules/config/src/index.js"
    );
}

#[test]
fn test_package_descriptor_is_never_the_result() {
    let (root, _) = tree_with(|host| {
        host.add_text("./foo/package.json", r#"{"main": "./bar"}"#);
        host.add_unit("./foo/bar.js", |_| Ok(()));
    });
    assert_eq!(root.resolve("./foo").unwrap(), "./foo/bar.js");
}

#[test]
fn test_main_field_uses_full_file_postfix_list() {
    let (root, _) = tree_with(|host| {
        host.add_text("./pkg/package.json", r#"{"main": "./lib"}"#);
        host.add_text("./pkg/lib/index.json", r#"{"kind": "fallback"}"#);
    });
    // ./pkg/lib does not exist as a file; main falls through its own
    // postfix list down to /index.json.
    assert_eq!(root.resolve("./pkg").unwrap(), "./pkg/lib/index.json");
}

#[test]
fn test_missing_main_falls_back_to_index_at_same_level() {
    let (root, _) = tree_with(|host| {
        host.add_text("./plain/package.json", r#"{"name": "plain"}"#);
        host.add_unit("./plain/index.js", |scope| {
            scope.set_exports(Value::String("index".to_string()));
            Ok(())
        });
    });
    assert_eq!(root.resolve("./plain").unwrap(), "./plain/index.js");
}

#[test]
fn test_module_exporting_itself() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./foo.js", |scope| {
            scope.set_exports(Value::String(scope.module().id().to_string()));
            Ok(())
        });
    });
    assert_eq!(
        root.require("./foo").unwrap(),
        Value::String("./foo.js".to_string())
    );
}

#[test]
fn test_unresolved_bare_request_error_message() {
    let (root, _) = tree_with(|_| {});
    let err = root.require("foo").unwrap_err();
    assert_eq!(err.to_string(), "Cannot find module 'foo'");
}

#[test]
fn test_negative_cache_suppresses_retries() {
    let (root, host) = tree_with(|_| {});
    assert!(root.require("./absent").is_err());
    let attempts_after_first = host.attempts().len();
    assert!(root.require("./absent").is_err());
    assert_eq!(host.attempts().len(), attempts_after_first);
}

#[test]
fn test_json_module_exports_parsed_data() {
    let (root, host) = tree_with(|host| {
        host.add_text("./config.json", r#"{"port": 8080, "tags": ["a"]}"#);
    });
    let config = root.require("./config").unwrap();
    let config = config.as_object().unwrap();
    assert_eq!(config.get("port"), Some(Value::Number(8080.0)));
    assert_eq!(config.get("tags").unwrap().as_array().unwrap().len(), 1);

    // Same data object on a repeat require, one fetch in total.
    let again = root.require("./config").unwrap();
    assert!(config.ptr_eq(again.as_object().unwrap()));
    assert_eq!(
        host.fetches
            .lock()
            .iter()
            .filter(|url| *url == "./config.json")
            .count(),
        1
    );
}

#[test]
fn test_virtual_module_shared_flat_namespace() {
    let (root, host) = tree_with(|_| {});
    let exports = Value::String("native-widgets".to_string());
    root.define("/widgets", exports.clone()).unwrap();

    // Bare lookup short-circuits on the literal id... except the defined id
    // is "./widgets", so only the relative form finds it.
    assert_eq!(root.require("./widgets").unwrap(), exports);
    assert!(host.attempts().is_empty());

    // A plainly constructed flat-named module is hit by bare requests.
    Module::new(
        "timers",
        &root,
        ModuleContent::Exports(Value::String("timers".to_string())),
    );
    assert_eq!(
        root.require("timers").unwrap(),
        Value::String("timers".to_string())
    );
    assert!(host.attempts().is_empty());
}

#[test]
fn test_define_then_require_late_dependency() {
    let (root, _) = tree_with(|_| {});
    // ./tools/helper was never itself attempted, so defining it later works
    // even after unrelated resolution failures.
    assert!(root.require("./other").is_err());
    root.define("/tools/helper", Value::Number(5.0)).unwrap();
    assert_eq!(root.require("./tools/helper").unwrap(), Value::Number(5.0));
}

#[test]
fn test_loader_error_propagates() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./boom.js", |_| {
            Err(skylab_core::ModuleError::generic("boom"))
        });
        host.add_unit("./outer.js", |scope| {
            scope.require("./boom")?;
            Ok(())
        });
    });
    let err = root.require("./outer").unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn test_dependency_chain_loads_recursively() {
    let (root, _) = tree_with(|host| {
        host.add_unit("./a.js", |scope| {
            let b = scope.require("./nested/b")?;
            scope.set_exports(b);
            Ok(())
        });
        host.add_unit("./nested/b.js", |scope| {
            // dirname-relative resolution from inside ./nested.
            let c = scope.require("./c")?;
            scope.set_exports(c);
            Ok(())
        });
        host.add_unit("./nested/c.js", |scope| {
            scope.set_exports(Value::Number(3.0));
            Ok(())
        });
    });
    assert_eq!(root.require("./a").unwrap(), Value::Number(3.0));
    assert_eq!(
        root.cached_ids(),
        vec!["./a.js", "./nested/b.js", "./nested/c.js"]
    );
}
