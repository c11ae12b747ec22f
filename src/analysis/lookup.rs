/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Position-indexed lookup tables: the map from a source position to the
//! resolved annotation or definition site at that position. Tables are built
//! by the environment from a stored AST and cached per open document.
//!
//! Lines are 1-based and columns 0-based everywhere in this crate; the LSP
//! adapter is the only place the wire's 0-based lines are converted.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::fmt::Display;

use crate::analysis::environment::Ty;

/// A point in a source file. `line` is 1-based, `column` is 0-based.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of positions within one file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub start: Position,
    pub stop: Position,
}

impl Span {
    pub fn new(start: Position, stop: Position) -> Self {
        Self { start, stop }
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position < self.stop
    }

    /// Lexicographic extent, used to pick the innermost of several spans
    /// covering the same position.
    fn extent(&self) -> (u32, u32) {
        let lines = self.stop.line.saturating_sub(self.start.line);
        let columns = if lines == 0 {
            self.stop.column.saturating_sub(self.start.column)
        } else {
            self.stop.column
        };
        (lines, columns)
    }
}

/// A span within a named file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: String,
    pub span: Span,
}

impl Location {
    pub fn new(path: impl Into<String>, span: Span) -> Self {
        Self {
            path: path.into(),
            span,
        }
    }
}

/// Position index over one file: resolved annotations and definition sites
/// keyed by the span they cover. Queries return the innermost covering entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    annotations: Vec<(Span, Ty)>,
    definitions: Vec<(Span, Location)>,
}

impl LookupTable {
    pub fn new(annotations: Vec<(Span, Ty)>, definitions: Vec<(Span, Location)>) -> Self {
        Self {
            annotations,
            definitions,
        }
    }

    pub fn annotation_at(&self, position: Position) -> Option<(Span, Ty)> {
        self.annotations
            .iter()
            .filter(|(span, _)| span.contains(position))
            .min_by_key(|(span, _)| span.extent())
            .cloned()
    }

    pub fn definition_at(&self, position: Position) -> Option<Location> {
        self.definitions
            .iter()
            .filter(|(span, _)| span.contains(position))
            .min_by_key(|(span, _)| span.extent())
            .map(|(_, location)| location.clone())
    }
}

/// Cache entry for one open document: the position index plus the raw source
/// snapshot it was built against.
#[derive(Debug, Clone)]
pub struct LookupEntry {
    pub table: LookupTable,
    pub source: String,
}
