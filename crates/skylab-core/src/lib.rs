// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # skylab-core
//!
//! A CommonJS-style module resolution and lazy loading engine over a
//! virtual, `/`-delimited path namespace.
//!
//! The engine resolves relative and bare specifiers, executes each module
//! body exactly once, and caches the result for every later reference,
//! including references made *during* that first execution (circular
//! dependencies). It performs no I/O of its own: all source fetching and
//! compilation goes through a [`ModuleHost`] injected at tree creation.
//!
//! ## Quick Start
//!
//! ```rust
//! use skylab_core::{BundleHost, Module, Value};
//! use std::sync::Arc;
//!
//! let host = BundleHost::new();
//! host.add_unit("./greet.js", |scope| {
//!     scope.set_exports(Value::String("hello".to_string()));
//!     Ok(())
//! });
//!
//! let root = Module::root(Arc::new(host));
//! let greeting = root.require("./greet").unwrap();
//! assert_eq!(greeting, Value::String("hello".to_string()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
pub mod error;
pub mod host;
pub mod module;
pub mod path;
mod resolver;
pub mod value;

pub use error::{ModuleError, Result};
pub use host::{BundleHost, ModuleHost};
pub use module::{Loader, Module, ModuleContent, ModuleScope, Require};
pub use value::{ArrayRef, FunctionRef, ObjectRef, Value};
