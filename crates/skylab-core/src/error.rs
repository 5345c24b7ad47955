// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module engine

use thiserror::Error;

/// Result type for module engine operations
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors that can occur while resolving or loading modules
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Module not found
    #[error("Cannot find module '{0}'")]
    NotFound(String),

    /// Module source failed to compile
    #[error("Failed to compile module '{url}': {reason}")]
    Compile {
        /// Module URL
        url: String,
        /// Reason for failure
        reason: String,
    },

    /// JSON module payload failed to parse
    #[error("Failed to parse JSON in module '{url}': {source}")]
    Json {
        /// Module URL
        url: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Path passed to `define` or `create_require` is not absolute
    #[error("Invalid module path '{0}': must start with '/'")]
    InvalidPath(String),

    /// A module is already registered under this path
    #[error("Module '{0}' already defined")]
    AlreadyDefined(String),

    /// The path was required (and missed) before being defined
    #[error("Module '{0}' was required before it was defined")]
    DefinedAfterRequire(String),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl ModuleError {
    /// Create a module not found error
    pub fn not_found(request: impl Into<String>) -> Self {
        Self::NotFound(request.into())
    }

    /// Create a compile error
    pub fn compile(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Compile {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error for the given module URL
    pub fn json(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            url: url.into(),
            source,
        }
    }

    /// Create a generic error
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ModuleError::not_found("./missing");
        assert_eq!(err.to_string(), "Cannot find module './missing'");
    }

    #[test]
    fn test_compile_message() {
        let err = ModuleError::compile("./lib/a.js", "unexpected token");
        assert_eq!(
            err.to_string(),
            "Failed to compile module './lib/a.js': unexpected token"
        );
    }
}
