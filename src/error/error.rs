/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A single type error produced by the analyzer. The server treats errors as
//! opaque beyond the path they are keyed by.

use std::fmt;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::analysis::lookup::Span;
use crate::state::handle::Handle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeError {
    /// Root-relative path of the offending file.
    pub path: String,
    /// Analyzer error code.
    pub code: u16,
    pub location: Span,
    pub description: String,
}

impl TypeError {
    pub fn new(
        path: impl Into<String>,
        code: u16,
        location: Span,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            code,
            location,
            description: description.into(),
        }
    }

    /// The handle this error is stored under. Invariant: for every error in
    /// the store, `error.handle()` equals its key.
    pub fn handle(&self) -> Handle {
        Handle::new(self.path.as_str())
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}]: {}",
            self.path, self.location.start, self.code, self.description
        )
    }
}
