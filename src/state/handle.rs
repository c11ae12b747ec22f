/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! File identity. A [`SourceFile`] is what clients send over the wire; a
//! [`Handle`] is the canonical, root-relative key every server-side map is
//! indexed by. Two handles are equal iff they denote the same repo-relative
//! path.

use std::fmt;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Canonical root-relative identifier for a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    pub fn new(relative: impl Into<String>) -> Self {
        Self(relative.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_stub(&self) -> bool {
        self.0.ends_with(".pyi")
    }

    /// Module identity derived from the relative path: `dir/mod.py` is
    /// `dir.mod`, and a package `__init__` collapses onto the package name.
    pub fn qualifier(&self) -> Qualifier {
        let path = self
            .0
            .strip_suffix(".pyi")
            .or_else(|| self.0.strip_suffix(".py"))
            .unwrap_or(&self.0);
        let path = path.strip_suffix("/__init__").unwrap_or(path);
        Qualifier(path.replace('/', "."))
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Module identity derived from a relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifier(String);

impl Qualifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source file named by a client request: a path plus an optional
/// in-memory content override (used by `didSave` with included text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }

    pub fn with_content(path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            path: path.into(),
            content: Some(content),
        }
    }

    /// Resolve this file to its canonical handle under `root`. Relative
    /// paths pass through; absolute paths must live under `root`.
    pub fn handle(&self, root: &Path) -> Option<Handle> {
        let relative = if self.path.is_absolute() {
            self.path.strip_prefix(root).ok()?
        } else {
            &self.path
        };
        Some(Handle::new(relative.to_str()?))
    }

    /// The file's text: the in-memory override when present, otherwise the
    /// on-disk content under `root`, otherwise empty.
    pub fn read(&self, root: &Path) -> String {
        if let Some(content) = &self.content {
            return content.clone();
        }
        let path = if self.path.is_absolute() {
            self.path.clone()
        } else {
            root.join(&self.path)
        };
        fs::read_to_string(path).unwrap_or_default()
    }

    pub fn is_stub(&self) -> bool {
        self.path.extension().is_some_and(|extension| extension == "pyi")
    }
}
