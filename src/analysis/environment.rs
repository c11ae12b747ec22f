/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under the MIT license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The seam to the analysis engine: the in-memory semantic database of the
//! analyzed program, its type order, and the shared-memory stores the
//! incremental pipeline drives. The server only consumes the capabilities
//! below; the engine itself is linked in by the embedding binary.
//!
//! Mutating operations take `&self`: the real environment is backed by
//! shared memory and is internally synchronized. The server guarantees it is
//! single-writer for the duration of a type-check pipeline run.

use std::fmt;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::analysis::ast::Ast;
use crate::analysis::lookup::LookupTable;
use crate::analysis::scheduler::Scheduler;
use crate::error::error::TypeError;
use crate::state::handle::Handle;
use crate::state::handle::Qualifier;
use crate::state::handle::SourceFile;

/// A resolved type. `Top` is the unknown type; it displays as `unknown` and
/// is dropped from query payloads.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum Ty {
    Top,
    Primitive(String),
}

impl Ty {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => f.write_str("unknown"),
            Self::Primitive(name) => f.write_str(name),
        }
    }
}

impl From<String> for Ty {
    fn from(name: String) -> Self {
        if name == "unknown" {
            Self::Top
        } else {
            Self::Primitive(name)
        }
    }
}

impl From<Ty> for String {
    fn from(ty: Ty) -> Self {
        ty.to_string()
    }
}

/// Raised by type-order operations when an operand is not tracked. Carries
/// the name the client used so the failure can be reported verbatim.
#[derive(Debug, Clone, Error)]
#[error("type `{0}` is not tracked by the type order")]
pub struct Untracked(pub String);

/// An attribute of a class, as recorded in the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub name: String,
    pub annotation: Ty,
}

/// A method of a class. The first parameter is the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_annotation: Ty,
}

/// A callable parameter. Anonymous (`*`-consumed) parameters have no name;
/// unannotated parameters have no annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub annotation: Option<Ty>,
}

/// One overload of a resolved callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overload {
    pub return_annotation: Option<Ty>,
    pub parameters: Vec<Parameter>,
}

/// A class definition resolved from a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub name: Ty,
    pub attributes: Vec<AttributeDefinition>,
    pub methods: Vec<MethodDefinition>,
}

/// Capabilities of the semantic environment consumed by the server.
pub trait Environment: Send + Sync {
    // Annotations and the type order.

    /// Parse an annotation expression into a type. Fails with [`Untracked`]
    /// when the expression does not denote a known type.
    fn parse_annotation(&self, expression: &str) -> Result<Ty, Untracked>;

    /// Whether the type order tracks (has instantiated) this type.
    fn tracked(&self, ty: &Ty) -> bool;

    fn join(&self, left: &Ty, right: &Ty) -> Result<Ty, Untracked>;

    fn meet(&self, left: &Ty, right: &Ty) -> Result<Ty, Untracked>;

    fn less_or_equal(&self, left: &Ty, right: &Ty) -> Result<bool, Untracked>;

    // Semantic lookups.

    fn class_definition(&self, ty: &Ty) -> Option<ClassDefinition>;

    /// Superclasses of a class type, in method-resolution order.
    fn superclasses(&self, ty: &Ty) -> Vec<Ty>;

    /// Resolve a global name to the overloads of its callable value, or
    /// `None` when the name is unbound or not callable.
    fn resolve_callable(&self, name: &str) -> Option<Vec<Overload>>;

    // The module graph.

    /// Handles of the modules that depend on `qualifier`.
    fn dependents_of(&self, qualifier: &Qualifier) -> Vec<Handle>;

    /// The canonical handle a qualifier currently resolves to. A stub and
    /// its shadowed source share a qualifier; only one of them is canonical.
    fn module_handle(&self, qualifier: &Qualifier) -> Option<Handle>;

    // Shared-memory lifecycle, driven by the type-check pipeline.

    /// The stored AST header for a handle, if the module has been parsed.
    fn ast(&self, handle: &Handle) -> Option<Arc<Ast>>;

    fn remove_asts(&self, handles: &[Handle]);

    /// Drop every environment record keyed by the given handles.
    fn purge(&self, handles: &[Handle]);

    /// Parse the given files and store their ASTs, returning the handles
    /// that parsed successfully. Files that fail to parse are absorbed.
    fn parse_sources(
        &self,
        scheduler: &Scheduler,
        files: &[SourceFile],
        root: &Path,
    ) -> anyhow::Result<Vec<Handle>>;

    /// Feed the stored ASTs of the given handles back into the environment.
    fn populate(&self, handles: &[Handle]);

    /// Run protocol inference over classes keyed by the given handles.
    fn infer_protocols(&self, handles: &[Handle]);

    /// Register user-suppressed error markers for the given handles.
    fn register_ignores(&self, handles: &[Handle]);

    /// Clear the per-class attribute memoization tables.
    fn clear_attribute_caches(&self);

    /// Purge resolution memoization entries for the given define names.
    fn purge_resolution_memo(&self, defines: &[String]);

    /// Aggressively compact the shared-memory heap.
    fn collect_garbage(&self);

    // Analysis.

    /// Re-analyze the given handles, returning the full error list for them.
    fn analyze(&self, scheduler: &Scheduler, handles: &[Handle]) -> anyhow::Result<Vec<TypeError>>;

    /// Build the position index for a stored AST.
    fn lookup_table(&self, ast: &Ast) -> LookupTable;
}
